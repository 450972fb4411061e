//! `post`: author an announcement for one or more audiences

use crate::commands::Outcome;
use crate::Console;
use announce_common::store::announcements::{create_announcement, NewAnnouncement};
use announce_common::store::audiences::find_audiences_by_names;
use announce_common::Error;
use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PostArgs {
    pub title: String,
    pub content: String,
    pub audiences: Vec<String>,
    pub category: Option<String>,
    pub published_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}

pub async fn post<R: BufRead, W: Write>(
    pool: &SqlitePool,
    args: PostArgs,
    console: &mut Console<R, W>,
) -> Result<Outcome> {
    let requested: BTreeSet<String> = args.audiences.iter().cloned().collect();
    let names: Vec<String> = requested.iter().cloned().collect();

    let audiences = find_audiences_by_names(pool, &names).await?;
    let found: BTreeSet<&str> = audiences.iter().map(|a| a.name.as_str()).collect();
    let unknown: Vec<&str> = requested
        .iter()
        .map(String::as_str)
        .filter(|name| !found.contains(name))
        .collect();

    if !unknown.is_empty() {
        console.line(format!("Unknown audience(s): {}", unknown.join(", ")))?;
        console.line("Run 'list-audiences' to see the available audiences.")?;
        return Ok(Outcome::Failed);
    }

    let audience_ids: Vec<Uuid> = audiences.iter().map(|a| a.guid).collect();
    let new = NewAnnouncement {
        title: args.title,
        content: args.content,
        category: args.category,
        published_at: args.published_at,
        expires_at: args.expires_at,
    };

    let announcement = match create_announcement(pool, &new, &audience_ids).await {
        Ok(announcement) => announcement,
        Err(Error::InvalidInput(reason)) => {
            console.line(format!("Invalid announcement: {}", reason))?;
            return Ok(Outcome::Failed);
        }
        Err(e) => return Err(e.into()),
    };

    console.line(format!(
        "Posted announcement '{}' ({}) to {} audience(s).",
        announcement.title,
        announcement.guid,
        audience_ids.len()
    ))?;
    Ok(Outcome::Completed)
}
