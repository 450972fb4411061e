//! Announcement, category and targeting queries

use crate::db::{Announcement, AnnouncementCategory};
use crate::{Error, Result};
use chrono::NaiveDateTime;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

/// Announcement to be created
#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    /// Category name, created with the announcement when missing
    pub category: Option<String>,
    /// Defaults to the time of insertion
    pub published_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

/// Look up a category by name, creating it when missing
pub async fn get_or_create_category(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<AnnouncementCategory> {
    sqlx::query(
        "INSERT INTO announcement_category (guid, name) VALUES (?, ?) ON CONFLICT(name) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query("SELECT guid, name, description FROM announcement_category WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

    AnnouncementCategory::from_row(&row)
}

/// Insert an announcement and target it at the given audiences
///
/// Validation happens before any write; the category, the announcement and
/// its targets land in one transaction.
pub async fn create_announcement(
    pool: &SqlitePool,
    new: &NewAnnouncement,
    audience_ids: &[Uuid],
) -> Result<Announcement> {
    if new.title.trim().is_empty() {
        return Err(Error::InvalidInput("announcement title is empty".to_string()));
    }

    let published_at = new
        .published_at
        .unwrap_or_else(|| chrono::Utc::now().naive_utc());
    if new.expires_at.is_some_and(|expires| expires <= published_at) {
        return Err(Error::InvalidInput(
            "expiry must be after publication".to_string(),
        ));
    }

    let guid = Uuid::new_v4();

    let mut tx = pool.begin().await?;

    let category_id = match new.category.as_deref() {
        Some(name) => Some(get_or_create_category(&mut *tx, name).await?.guid),
        None => None,
    };

    sqlx::query(
        r#"
        INSERT INTO announcement_announcement (guid, title, content, category_id, published_at, expires_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(&new.title)
    .bind(&new.content)
    .bind(category_id.map(|id| id.to_string()))
    .bind(published_at)
    .bind(new.expires_at)
    .execute(&mut *tx)
    .await?;

    for audience_id in audience_ids {
        sqlx::query(
            r#"
            INSERT INTO announcement_audience_announcement (guid, audience_id, announcement_id)
            VALUES (?, ?, ?)
            ON CONFLICT(audience_id, announcement_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(audience_id.to_string())
        .bind(guid.to_string())
        .execute(&mut *tx)
        .await?;
    }

    let row = sqlx::query(
        r#"
        SELECT guid, title, content, category_id, published_at, expires_at
        FROM announcement_announcement
        WHERE guid = ?
        "#,
    )
    .bind(guid.to_string())
    .fetch_one(&mut *tx)
    .await?;
    let announcement = Announcement::from_row(&row)?;

    tx.commit().await?;

    debug!(
        "Created announcement {} for {} audience(s)",
        announcement.guid,
        audience_ids.len()
    );
    Ok(announcement)
}

/// Active announcements targeted at any audience of the user's profile
///
/// Newest publication first; each announcement appears once even when it
/// reaches the user through several audiences. A user without a profile has
/// an empty feed.
pub async fn announcements_for_user(
    pool: &SqlitePool,
    user_id: &str,
    now: NaiveDateTime,
) -> Result<Vec<Announcement>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT a.guid, a.title, a.content, a.category_id, a.published_at, a.expires_at
        FROM announcement_announcement a
        JOIN announcement_audience_announcement aa ON aa.announcement_id = a.guid
        JOIN announcement_user_audience ua ON ua.audience_id = aa.audience_id
        JOIN announcement_profile p ON p.guid = ua.profile_id
        WHERE p.user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut feed = rows
        .iter()
        .map(Announcement::from_row)
        .collect::<Result<Vec<_>>>()?;

    // Filtered on decoded timestamps; stored text may mix precisions
    feed.retain(|a| a.is_active(now));
    feed.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    Ok(feed)
}
