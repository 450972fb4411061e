//! Discovery of host tables related to users
//!
//! Every host table is an entity type. A table is related to users when it
//! declares a FOREIGN KEY whose parent is the configured user table. SQLite
//! internals, sqlx bookkeeping, the user table itself and the toolkit's own
//! `announcement_*` tables are never reported.

use crate::config::AnnouncementConfig;
use crate::db::{ForeignKey, SchemaIntrospector, OWN_TABLE_PREFIX};
use crate::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Table-name prefixes owned by SQLite or the database driver
const BUILTIN_PREFIXES: &[&str] = &["sqlite_", "_sqlx_"];

/// A foreign key column pointing at the user table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserLink {
    /// Column in the related table
    pub column: String,
    /// Referenced column in the user table
    pub user_column: String,
}

/// A host table with at least one foreign key to the user table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedEntity {
    pub table: String,
    pub app_label: String,
    pub model_name: String,
    pub links: Vec<UserLink>,
    /// Primary key column of the user table; profiles are keyed by its value
    pub user_key: String,
}

impl RelatedEntity {
    /// Human-readable title, also the name of the matching audience
    pub fn display_name(&self) -> String {
        title_case(&self.model_name)
    }
}

impl std::fmt::Display for RelatedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.table)
    }
}

/// Split a table name into (app label, model name)
///
/// `shop_order_item` -> (`shop`, `order_item`); `orders` -> (`orders`, `orders`).
pub fn split_table_name(table: &str) -> (&str, &str) {
    match table.split_once('_') {
        Some((app, model)) if !app.is_empty() && !model.is_empty() => (app, model),
        _ => (table, table),
    }
}

/// Title-case a model name, splitting on underscores and camelCase humps
pub fn title_case(model_name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for c in model_name.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else {
            let hump = c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            if hump && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(c);
        }
        prev = Some(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn is_builtin(table: &str, user_table: &str) -> bool {
    BUILTIN_PREFIXES.iter().any(|p| table.starts_with(p)) || table.eq_ignore_ascii_case(user_table)
}

fn is_own(table: &str) -> bool {
    table.starts_with(OWN_TABLE_PREFIX)
}

/// Find every non-excluded host table with a foreign key to the user table
///
/// Result is ordered by table name. No side effects.
pub async fn discover_related_entities(
    pool: &SqlitePool,
    config: &AnnouncementConfig,
) -> Result<Vec<RelatedEntity>> {
    let user_table = config.user_table.as_str();

    if !SchemaIntrospector::table_exists(pool, user_table).await? {
        warn!("User table '{}' does not exist; nothing to discover", user_table);
        return Ok(Vec::new());
    }

    let user_pk = SchemaIntrospector::primary_key_columns(pool, user_table).await?;
    let user_key = user_pk
        .first()
        .cloned()
        .unwrap_or_else(|| "rowid".to_string());

    let mut related = Vec::new();

    for table in SchemaIntrospector::list_tables(pool).await? {
        let (app_label, model_name) = split_table_name(&table);

        if config.is_app_excluded(app_label) || config.is_model_excluded(&table, model_name) {
            debug!("Skipping excluded table '{}'", table);
            continue;
        }

        if is_builtin(&table, user_table) || is_own(&table) {
            continue;
        }

        // Rows of one composite key share an id
        let mut keys: BTreeMap<i64, Vec<ForeignKey>> = BTreeMap::new();
        for fk in SchemaIntrospector::foreign_keys(pool, &table).await? {
            if fk.table.eq_ignore_ascii_case(user_table) {
                keys.entry(fk.id).or_default().push(fk);
            }
        }

        let mut links: Vec<UserLink> = Vec::with_capacity(keys.len());
        for (_, mut columns) in keys {
            if columns.len() != 1 {
                debug!(
                    "Skipping composite foreign key {}({}) to '{}'",
                    table,
                    columns.iter().map(|fk| fk.from.as_str()).collect::<Vec<_>>().join(", "),
                    user_table
                );
                continue;
            }
            if let Some(fk) = columns.pop() {
                links.push(UserLink {
                    column: fk.from,
                    user_column: fk.to.unwrap_or_else(|| user_key.clone()),
                });
            }
        }

        if links.is_empty() {
            continue;
        }

        related.push(RelatedEntity {
            app_label: app_label.to_string(),
            model_name: model_name.to_string(),
            table,
            links,
            user_key: user_key.clone(),
        });
    }

    debug!("Discovered {} user-related table(s)", related.len());
    Ok(related)
}
