//! `feed`: what a user currently sees

use crate::commands::Outcome;
use crate::Console;
use announce_common::store::announcements::announcements_for_user;
use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use std::io::{BufRead, Write};

pub async fn feed<R: BufRead, W: Write>(
    pool: &SqlitePool,
    user_id: &str,
    now: NaiveDateTime,
    json: bool,
    console: &mut Console<R, W>,
) -> Result<Outcome> {
    let announcements = announcements_for_user(pool, user_id, now).await?;

    if json {
        console.line(serde_json::to_string_pretty(&announcements)?)?;
        return Ok(Outcome::Completed);
    }

    if announcements.is_empty() {
        console.line(format!("No active announcements for user '{}'.", user_id))?;
        return Ok(Outcome::NothingToDo);
    }

    for announcement in &announcements {
        let expiry = match announcement.expires_at {
            Some(expires) => format!(" (until {})", expires.format("%Y-%m-%d %H:%M")),
            None => String::new(),
        };
        console.line(format!(
            "[{}] {}{}",
            announcement.published_at.format("%Y-%m-%d %H:%M"),
            announcement.title,
            expiry
        ))?;
        for line in announcement.content.lines() {
            console.line(format!("    {}", line))?;
        }
    }

    Ok(Outcome::Completed)
}
