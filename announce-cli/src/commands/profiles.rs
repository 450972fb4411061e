//! `generate-profiles` and `show-profile`

use crate::commands::Outcome;
use crate::Console;
use announce_common::db::{Audience, AnnouncementProfile};
use announce_common::reconcile::{self, ProfileOutcome};
use announce_common::store::audiences::count_audiences;
use announce_common::store::profiles::{load_profile_by_user, profile_audiences};
use announce_common::{discover_related_entities, AnnouncementConfig, Error};
use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::io::{BufRead, Write};

/// Attach every related user's profile to the audiences of their tables
pub async fn generate_profiles<R: BufRead, W: Write>(
    pool: &SqlitePool,
    config: &AnnouncementConfig,
    console: &mut Console<R, W>,
) -> Result<Outcome> {
    // Checked up front so the operator is not asked to confirm a run that cannot start
    let audience_count = {
        let mut conn = pool.acquire().await?;
        count_audiences(&mut *conn).await?
    };
    if audience_count == 0 {
        console.line(Error::MissingAudiences.to_string())?;
        return Ok(Outcome::Failed);
    }

    let related = discover_related_entities(pool, config).await?;

    console.line(format!(
        "Found {} related model(s) to assign users from.",
        related.len()
    ))?;
    for (i, entity) in related.iter().enumerate() {
        console.line(format!("{}. {}", i + 1, entity))?;
    }

    if !console.confirm("Assign the users of these models to their audiences? (y/n): ")? {
        console.line("No changes made.")?;
        return Ok(Outcome::Cancelled);
    }

    let outcome = match reconcile::generate_profiles(pool, &related, &config.user_table).await {
        Ok(outcome) => outcome,
        Err(Error::MissingAudiences) => {
            console.line(Error::MissingAudiences.to_string())?;
            return Ok(Outcome::Failed);
        }
        Err(e) => return Err(e.into()),
    };

    match outcome {
        ProfileOutcome::NoRelatedUsers { skipped_audiences } => {
            for name in &skipped_audiences {
                console.line(format!("Audience '{}' does not exist, skipping.", name))?;
            }
            console.line("No users found related to the provided models.")?;
            Ok(Outcome::NothingToDo)
        }
        ProfileOutcome::Reconciled(report) => {
            for name in &report.skipped_audiences {
                console.line(format!("Audience '{}' does not exist, skipping.", name))?;
            }
            console.line(format!(
                "Related users: {}, profiles created: {}, memberships added: {}",
                report.related_users, report.profiles_created, report.memberships_added
            ))?;
            console.line("All users have been assigned to audiences successfully.")?;
            Ok(Outcome::Completed)
        }
    }
}

#[derive(Serialize)]
struct ProfileView {
    #[serde(flatten)]
    profile: AnnouncementProfile,
    audiences: Vec<Audience>,
}

/// Print a user's profile and the audiences it belongs to
pub async fn show_profile<R: BufRead, W: Write>(
    pool: &SqlitePool,
    user_id: &str,
    json: bool,
    console: &mut Console<R, W>,
) -> Result<Outcome> {
    let Some(profile) = load_profile_by_user(pool, user_id).await? else {
        console.line(format!("No announcement profile for user '{}'.", user_id))?;
        return Ok(Outcome::Failed);
    };

    let audiences = profile_audiences(pool, profile.guid).await?;

    if json {
        let view = ProfileView { profile, audiences };
        console.line(serde_json::to_string_pretty(&view)?)?;
        return Ok(Outcome::Completed);
    }

    console.line(format!("User:     {}", profile.user_id))?;
    console.line(format!("Profile:  {}", profile.guid))?;
    console.line(format!("Created:  {}", profile.created_at))?;
    if audiences.is_empty() {
        console.line("Audiences: (none)")?;
    } else {
        console.line("Audiences:")?;
        for audience in &audiences {
            console.line(format!("  - {}", audience.name))?;
        }
    }

    Ok(Outcome::Completed)
}
