//! Versioned schema migrations for the toolkit tables
//!
//! Column additions are handled by schema sync; migrations cover the rest
//! (indexes, data fixes). Applied versions are recorded in
//! `announcement_schema_version`.
//!
//! Never modify a released migration; add a new one and bump
//! `CURRENT_SCHEMA_VERSION`. Every migration must be idempotent.

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

const CURRENT_SCHEMA_VERSION: i64 = 2;

/// Latest applied version, 0 for a fresh database
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i64> {
    let version: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(version) FROM announcement_schema_version",
    )
    .fetch_one(pool)
    .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO announcement_schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Announcement schema version ({}) is newer than this build ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running announcement migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    Ok(())
}

/// v1: reverse-lookup indexes on the join tables
///
/// The UNIQUE constraints already index (profile, audience) and
/// (audience, announcement); lookups from the other side need their own.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_user_audience_audience
         ON announcement_user_audience(audience_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_audience_announcement_announcement
         ON announcement_audience_announcement(announcement_id)",
    )
    .execute(pool)
    .await?;

    info!("Migration v1: join table indexes created");
    Ok(())
}

/// v2: feed ordering index
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_announcement_published
         ON announcement_announcement(published_at)",
    )
    .execute(pool)
    .await?;

    info!("Migration v2: published_at index created");
    Ok(())
}
