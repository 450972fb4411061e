//! `generate-audiences` and `list-audiences`

use crate::commands::Outcome;
use crate::Console;
use announce_common::config::{ENV_EXCLUDE_APPS, ENV_EXCLUDE_MODELS};
use announce_common::reconcile;
use announce_common::store::audiences as store;
use announce_common::{discover_related_entities, AnnouncementConfig};
use anyhow::Result;
use sqlx::SqlitePool;
use std::io::{BufRead, Write};

const CONFIRM_TARGETS: &str = "\nAre these the correct target models? \
Type 'y' to proceed or 'n' to return and modify the exclude list in settings: ";

/// Create one audience per discovered user-related table
pub async fn generate_audiences<R: BufRead, W: Write>(
    pool: &SqlitePool,
    config: &AnnouncementConfig,
    console: &mut Console<R, W>,
) -> Result<Outcome> {
    let related = discover_related_entities(pool, config).await?;

    if related.is_empty() {
        console.line("No related models found to create audiences.")?;
        return Ok(Outcome::NothingToDo);
    }

    console.line("The following related models were found:")?;
    for (i, entity) in related.iter().enumerate() {
        console.line(format!("{}. {}", i + 1, entity))?;
    }

    if !console.confirm(CONFIRM_TARGETS)? {
        console.line("To exclude certain apps or models, modify the settings:")?;
        console.line(format!(
            "1. Adjust 'generate_audiences.exclude_apps' and 'generate_audiences.exclude_models' \
             in config.toml (or {} / {}).",
            ENV_EXCLUDE_APPS, ENV_EXCLUDE_MODELS
        ))?;
        console.line("2. Re-run this command after adjusting the settings.")?;
        return Ok(Outcome::Cancelled);
    }

    let report = reconcile::generate_audiences(pool, &related).await?;

    if report.created.is_empty() {
        console.line("No new audiences needed to be created.")?;
    } else {
        for audience in &report.created {
            console.line(format!("Created audience: {}", audience.name))?;
        }
    }

    console.line("Finished creating audiences!")?;
    Ok(Outcome::Completed)
}

/// Print every audience with its member count, or the same as JSON
pub async fn list_audiences<R: BufRead, W: Write>(
    pool: &SqlitePool,
    json: bool,
    console: &mut Console<R, W>,
) -> Result<Outcome> {
    let audiences = store::list_audiences(pool).await?;

    if json {
        console.line(serde_json::to_string_pretty(&audiences)?)?;
        return Ok(Outcome::Completed);
    }

    if audiences.is_empty() {
        console.line("No audiences found.")?;
        return Ok(Outcome::NothingToDo);
    }

    let width = audiences
        .iter()
        .map(|a| a.audience.name.chars().count())
        .max()
        .unwrap_or(0);

    for summary in &audiences {
        console.line(format!(
            "{:<width$}  {:>5} member(s)  {}",
            summary.audience.name,
            summary.members,
            summary.audience.description.as_deref().unwrap_or(""),
            width = width
        ))?;
    }

    Ok(Outcome::Completed)
}
