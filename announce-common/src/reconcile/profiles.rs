//! Profile reconciliation: give related users a profile and audience memberships
//!
//! The whole run is one transaction. Dropping the transaction on any error
//! rolls back every profile and membership written so far.

use crate::db::{quote_ident, Audience, UserAudience};
use crate::discovery::RelatedEntity;
use crate::store::audiences::{count_audiences, find_audience_by_name};
use crate::store::profiles::{
    insert_memberships, insert_profiles, memberships_for_profiles, profile_ids_by_user,
};
use crate::{Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeSet, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

/// Counts from a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileReport {
    /// Distinct users found through any related table
    pub related_users: usize,
    pub profiles_created: u64,
    pub memberships_added: u64,
    /// Audience names expected for a related table but not found
    pub skipped_audiences: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    /// No user has a row in any related table; nothing written
    NoRelatedUsers { skipped_audiences: Vec<String> },
    Reconciled(ProfileReport),
}

/// Ensure profiles and memberships for every user of the related tables
///
/// Fails with [`Error::MissingAudiences`] before writing anything when no
/// audience exists at all.
pub async fn generate_profiles(
    pool: &SqlitePool,
    related: &[RelatedEntity],
    user_table: &str,
) -> Result<ProfileOutcome> {
    let mut tx = pool.begin().await?;

    if count_audiences(&mut *tx).await? == 0 {
        return Err(Error::MissingAudiences);
    }

    let mut mapped: Vec<(&RelatedEntity, Audience)> = Vec::new();
    let mut skipped_audiences: Vec<String> = Vec::new();

    for entity in related {
        let name = entity.display_name();
        match find_audience_by_name(&mut *tx, &name).await? {
            Some(audience) => mapped.push((entity, audience)),
            None => {
                warn!("Audience '{}' does not exist, skipping.", name);
                if !skipped_audiences.contains(&name) {
                    skipped_audiences.push(name);
                }
            }
        }
    }

    // Users of skipped tables still get a profile, just no membership for that table
    let mut all_users: BTreeSet<String> = BTreeSet::new();
    let mut users_by_table: Vec<(&str, BTreeSet<String>)> = Vec::with_capacity(related.len());
    for entity in related {
        let users = related_user_ids(&mut *tx, entity, user_table).await?;
        all_users.extend(users.iter().cloned());
        users_by_table.push((entity.table.as_str(), users));
    }

    if all_users.is_empty() {
        warn!("No users found related to the provided models.");
        return Ok(ProfileOutcome::NoRelatedUsers { skipped_audiences });
    }

    let mut profiles = profile_ids_by_user(&mut *tx, &all_users).await?;
    let missing: Vec<String> = all_users
        .iter()
        .filter(|user| !profiles.contains_key(*user))
        .cloned()
        .collect();

    let profiles_created = if missing.is_empty() {
        0
    } else {
        let created = insert_profiles(&mut *tx, &missing).await?;
        profiles = profile_ids_by_user(&mut *tx, &all_users).await?;
        created
    };

    let profile_ids: Vec<Uuid> = profiles.values().copied().collect();
    let current = memberships_for_profiles(&mut *tx, &profile_ids).await?;

    let mut seen: HashSet<UserAudience> = HashSet::new();
    let mut to_add: Vec<UserAudience> = Vec::new();
    for (entity, audience) in &mapped {
        let Some((_, users)) = users_by_table.iter().find(|(t, _)| *t == entity.table) else {
            continue;
        };
        for user in users {
            let Some(profile_id) = profiles.get(user) else {
                return Err(Error::Internal(format!("profile for user {} was not created", user)));
            };
            let membership = UserAudience {
                profile_id: *profile_id,
                audience_id: audience.guid,
            };
            if !current.contains(&membership) && seen.insert(membership) {
                to_add.push(membership);
            }
        }
    }

    let memberships_added = if to_add.is_empty() {
        0
    } else {
        insert_memberships(&mut *tx, &to_add).await?
    };

    tx.commit().await?;

    info!(
        "Profile reconciliation: {} users, {} profiles created, {} memberships added",
        all_users.len(),
        profiles_created,
        memberships_added
    );

    Ok(ProfileOutcome::Reconciled(ProfileReport {
        related_users: all_users.len(),
        profiles_created,
        memberships_added,
        skipped_audiences,
    }))
}

/// Users with at least one row in the related table, through any of its user links
///
/// Only users present in the user table are returned, keyed by their primary
/// key rendered as text whichever column the link references.
async fn related_user_ids(
    conn: &mut SqliteConnection,
    entity: &RelatedEntity,
    user_table: &str,
) -> Result<BTreeSet<String>> {
    let mut users = BTreeSet::new();

    for link in &entity.links {
        let sql = format!(
            r#"
            SELECT DISTINCT CAST(u.{user_key} AS TEXT)
            FROM {users} u
            WHERE u.{user_key} IS NOT NULL
              AND EXISTS (SELECT 1 FROM {related} r WHERE r.{fk_col} = u.{user_col})
            "#,
            users = quote_ident(user_table),
            related = quote_ident(&entity.table),
            user_key = quote_ident(&entity.user_key),
            user_col = quote_ident(&link.user_column),
            fk_col = quote_ident(&link.column),
        );

        let ids: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&mut *conn).await?;
        users.extend(ids);
    }

    Ok(users)
}
