//! Audience queries

use crate::db::Audience;
use crate::Result;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::BIND_CHUNK;

const AUDIENCE_COLUMNS: &str = "guid, name, description, created_at, updated_at";

/// Audience to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAudience {
    pub name: String,
    pub description: String,
}

/// Audience with its member count
#[derive(Debug, Clone, Serialize)]
pub struct AudienceSummary {
    #[serde(flatten)]
    pub audience: Audience,
    pub members: i64,
}

pub async fn count_audiences(conn: &mut SqliteConnection) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM announcement_audience")
        .fetch_one(conn)
        .await?;

    Ok(count)
}

pub async fn find_audience_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Audience>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM announcement_audience WHERE name = ?",
        AUDIENCE_COLUMNS
    ))
    .bind(name)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(Audience::from_row).transpose()
}

/// Audiences matching the given names, in name order
pub async fn find_audiences_by_names(pool: &SqlitePool, names: &[String]) -> Result<Vec<Audience>> {
    let mut audiences = Vec::new();

    for chunk in names.chunks(BIND_CHUNK) {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM announcement_audience WHERE name IN (",
            AUDIENCE_COLUMNS
        ));
        let mut separated = query.separated(", ");
        for name in chunk {
            separated.push_bind(name);
        }
        separated.push_unseparated(")");

        for row in query.build().fetch_all(pool).await? {
            audiences.push(Audience::from_row(&row)?);
        }
    }

    audiences.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(audiences)
}

/// Subset of `names` that already exist as audiences
pub async fn existing_audience_names(pool: &SqlitePool, names: &[String]) -> Result<BTreeSet<String>> {
    Ok(find_audiences_by_names(pool, names)
        .await?
        .into_iter()
        .map(|a| a.name)
        .collect())
}

/// Insert audiences, skipping names that exist by the time the row lands
///
/// Returns only the rows actually inserted.
pub async fn insert_audiences(pool: &SqlitePool, audiences: &[NewAudience]) -> Result<Vec<Audience>> {
    let mut created = Vec::with_capacity(audiences.len());

    for chunk in audiences.chunks(BIND_CHUNK) {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO announcement_audience (guid, name, description) ");
        query.push_values(chunk, |mut row, audience| {
            row.push_bind(Uuid::new_v4().to_string())
                .push_bind(&audience.name)
                .push_bind(&audience.description);
        });
        query.push(" ON CONFLICT(name) DO NOTHING RETURNING ");
        query.push(AUDIENCE_COLUMNS);

        for row in query.build().fetch_all(pool).await? {
            created.push(Audience::from_row(&row)?);
        }
    }

    // RETURNING order is unspecified; keep the caller's order
    created.sort_by_key(|a| audiences.iter().position(|n| n.name == a.name));
    Ok(created)
}

/// All audiences by name, with the number of profiles in each
pub async fn list_audiences(pool: &SqlitePool) -> Result<Vec<AudienceSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT a.guid, a.name, a.description, a.created_at, a.updated_at,
               COUNT(ua.guid) AS members
        FROM announcement_audience a
        LEFT JOIN announcement_user_audience ua ON ua.audience_id = a.guid
        GROUP BY a.guid
        ORDER BY a.name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(AudienceSummary {
                audience: Audience::from_row(row)?,
                members: sqlx::Row::try_get(row, "members")?,
            })
        })
        .collect()
}
