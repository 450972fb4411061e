//! Announcement profile and membership queries

use crate::db::{Audience, AnnouncementProfile, UserAudience};
use crate::Result;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

use super::BIND_CHUNK;

/// Profile guid per user id, for the users that have one
pub async fn profile_ids_by_user(
    conn: &mut SqliteConnection,
    user_ids: &BTreeSet<String>,
) -> Result<HashMap<String, Uuid>> {
    let ids: Vec<&String> = user_ids.iter().collect();
    let mut profiles = HashMap::with_capacity(ids.len());

    for chunk in ids.chunks(BIND_CHUNK) {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT user_id, guid FROM announcement_profile WHERE user_id IN (");
        let mut separated = query.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        for row in query.build().fetch_all(&mut *conn).await? {
            let user_id: String = row.try_get("user_id")?;
            let guid: String = row.try_get("guid")?;
            profiles.insert(user_id, Uuid::parse_str(&guid)?);
        }
    }

    Ok(profiles)
}

/// Create one profile per user id; returns the number of rows inserted
///
/// Callers pass only users without a profile. The UNIQUE constraint on
/// `user_id` still guards against duplicates.
pub async fn insert_profiles(conn: &mut SqliteConnection, user_ids: &[String]) -> Result<u64> {
    let mut inserted = 0;

    for chunk in user_ids.chunks(BIND_CHUNK) {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO announcement_profile (guid, user_id) ");
        query.push_values(chunk, |mut row, user_id| {
            row.push_bind(Uuid::new_v4().to_string()).push_bind(user_id);
        });
        query.push(" ON CONFLICT(user_id) DO NOTHING");

        inserted += query.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

/// Existing memberships among the given profiles
pub async fn memberships_for_profiles(
    conn: &mut SqliteConnection,
    profile_ids: &[Uuid],
) -> Result<HashSet<UserAudience>> {
    let mut memberships = HashSet::new();

    for chunk in profile_ids.chunks(BIND_CHUNK) {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT profile_id, audience_id FROM announcement_user_audience WHERE profile_id IN (",
        );
        let mut separated = query.separated(", ");
        for id in chunk {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        for row in query.build().fetch_all(&mut *conn).await? {
            let profile_id: String = row.try_get("profile_id")?;
            let audience_id: String = row.try_get("audience_id")?;
            memberships.insert(UserAudience {
                profile_id: Uuid::parse_str(&profile_id)?,
                audience_id: Uuid::parse_str(&audience_id)?,
            });
        }
    }

    Ok(memberships)
}

/// Insert memberships; returns the number of rows inserted
pub async fn insert_memberships(
    conn: &mut SqliteConnection,
    memberships: &[UserAudience],
) -> Result<u64> {
    let mut inserted = 0;

    for chunk in memberships.chunks(BIND_CHUNK) {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO announcement_user_audience (guid, profile_id, audience_id) ",
        );
        query.push_values(chunk, |mut row, membership| {
            row.push_bind(Uuid::new_v4().to_string())
                .push_bind(membership.profile_id.to_string())
                .push_bind(membership.audience_id.to_string());
        });
        query.push(" ON CONFLICT(profile_id, audience_id) DO NOTHING");

        inserted += query.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}

pub async fn load_profile_by_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<AnnouncementProfile>> {
    let row = sqlx::query(
        "SELECT guid, user_id, created_at FROM announcement_profile WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(AnnouncementProfile::from_row).transpose()
}

/// Audiences a profile belongs to, by name
pub async fn profile_audiences(pool: &SqlitePool, profile_id: Uuid) -> Result<Vec<Audience>> {
    let rows = sqlx::query(
        r#"
        SELECT a.guid, a.name, a.description, a.created_at, a.updated_at
        FROM announcement_audience a
        JOIN announcement_user_audience ua ON ua.audience_id = a.guid
        WHERE ua.profile_id = ?
        ORDER BY a.name ASC
        "#,
    )
    .bind(profile_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(Audience::from_row).collect()
}
