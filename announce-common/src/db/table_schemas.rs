//! Declared column sets for the toolkit's own tables
//!
//! Columns added here after a release are picked up by schema sync on the
//! next open; the `CREATE TABLE` statements in `init.rs` must list them too.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::debug;

fn timestamp_columns() -> [ColumnDefinition; 2] {
    [
        ColumnDefinition::new("created_at", "TIMESTAMP")
            .not_null()
            .default("CURRENT_TIMESTAMP"),
        ColumnDefinition::new("updated_at", "TIMESTAMP")
            .not_null()
            .default("CURRENT_TIMESTAMP"),
    ]
}

pub struct AudienceTableSchema;

impl TableSchema for AudienceTableSchema {
    fn table_name() -> &'static str {
        "announcement_audience"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        let mut columns = vec![
            ColumnDefinition::new("guid", "TEXT").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null().unique(),
            ColumnDefinition::new("description", "TEXT"),
        ];
        columns.extend(timestamp_columns());
        columns
    }
}

pub struct CategoryTableSchema;

impl TableSchema for CategoryTableSchema {
    fn table_name() -> &'static str {
        "announcement_category"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        let mut columns = vec![
            ColumnDefinition::new("guid", "TEXT").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null().unique(),
            ColumnDefinition::new("description", "TEXT"),
        ];
        columns.extend(timestamp_columns());
        columns
    }
}

pub struct AnnouncementTableSchema;

impl TableSchema for AnnouncementTableSchema {
    fn table_name() -> &'static str {
        "announcement_announcement"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        let mut columns = vec![
            ColumnDefinition::new("guid", "TEXT").primary_key(),
            ColumnDefinition::new("title", "TEXT").not_null(),
            ColumnDefinition::new("content", "TEXT").not_null(),
            ColumnDefinition::new("category_id", "TEXT"),
            ColumnDefinition::new("published_at", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
            ColumnDefinition::new("expires_at", "TIMESTAMP"),
        ];
        columns.extend(timestamp_columns());
        columns
    }
}

pub struct AudienceAnnouncementTableSchema;

impl TableSchema for AudienceAnnouncementTableSchema {
    fn table_name() -> &'static str {
        "announcement_audience_announcement"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("guid", "TEXT").primary_key(),
            ColumnDefinition::new("audience_id", "TEXT").not_null(),
            ColumnDefinition::new("announcement_id", "TEXT").not_null(),
            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        ]
    }
}

pub struct ProfileTableSchema;

impl TableSchema for ProfileTableSchema {
    fn table_name() -> &'static str {
        "announcement_profile"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        let mut columns = vec![
            ColumnDefinition::new("guid", "TEXT").primary_key(),
            ColumnDefinition::new("user_id", "TEXT").not_null().unique(),
        ];
        columns.extend(timestamp_columns());
        columns
    }
}

pub struct UserAudienceTableSchema;

impl TableSchema for UserAudienceTableSchema {
    fn table_name() -> &'static str {
        "announcement_user_audience"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("guid", "TEXT").primary_key(),
            ColumnDefinition::new("profile_id", "TEXT").not_null(),
            ColumnDefinition::new("audience_id", "TEXT").not_null(),
            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        ]
    }
}

/// Add missing columns to every toolkit table
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    debug!("Synchronizing announcement table schemas");

    SchemaSync::sync_table::<AudienceTableSchema>(pool).await?;
    SchemaSync::sync_table::<CategoryTableSchema>(pool).await?;
    SchemaSync::sync_table::<AnnouncementTableSchema>(pool).await?;
    SchemaSync::sync_table::<AudienceAnnouncementTableSchema>(pool).await?;
    SchemaSync::sync_table::<ProfileTableSchema>(pool).await?;
    SchemaSync::sync_table::<UserAudienceTableSchema>(pool).await?;

    Ok(())
}
