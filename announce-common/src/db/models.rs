//! Row models for the toolkit tables

use crate::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// Named group of users targeted by announcements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audience {
    pub guid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Audience {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            guid: parse_guid(row, "guid")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementCategory {
    pub guid: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl AnnouncementCategory {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            guid: parse_guid(row, "guid")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub guid: Uuid,
    pub title: String,
    pub content: String,
    pub category_id: Option<Uuid>,
    pub published_at: NaiveDateTime,
    /// `None` never expires
    pub expires_at: Option<NaiveDateTime>,
}

impl Announcement {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let category_id: Option<String> = row.try_get("category_id")?;

        Ok(Self {
            guid: parse_guid(row, "guid")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            category_id: category_id.as_deref().map(Uuid::parse_str).transpose()?,
            published_at: row.try_get("published_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }

    /// Published and not yet expired at `now`
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.published_at <= now && self.expires_at.map_or(true, |expires| expires > now)
    }
}

/// Per-user record owning audience memberships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementProfile {
    pub guid: Uuid,
    /// Host user primary key, rendered as text
    pub user_id: String,
    pub created_at: NaiveDateTime,
}

impl AnnouncementProfile {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            guid: parse_guid(row, "guid")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Membership of a profile in an audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserAudience {
    pub profile_id: Uuid,
    pub audience_id: Uuid,
}

fn parse_guid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let text: String = row.try_get(column)?;
    Ok(Uuid::parse_str(&text)?)
}
