//! Schema introspection and automatic column synchronization
//!
//! Two jobs share this module:
//! - reading the live schema (`sqlite_master`, `pragma_table_info`,
//!   `pragma_foreign_key_list`), which is how host tables related to users
//!   are discovered;
//! - keeping the toolkit's own tables in line with their declared columns.
//!
//! Initialization runs in three phases:
//! 1. **CREATE TABLE IF NOT EXISTS** - create missing tables
//! 2. **Auto-Sync** - add missing columns via ALTER TABLE (this module)
//! 3. **Migrations** - anything ALTER TABLE ADD COLUMN cannot express
//!
//! ```rust,ignore
//! pub struct AudienceTableSchema;
//!
//! impl TableSchema for AudienceTableSchema {
//!     fn table_name() -> &'static str { "announcement_audience" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("guid", "TEXT").primary_key(),
//!             ColumnDefinition::new("name", "TEXT").not_null().unique(),
//!         ]
//!     }
//! }
//!
//! SchemaSync::sync_table::<AudienceTableSchema>(&pool).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Quote an identifier for interpolation into SQL
///
/// Table and column names read from the live schema are not under our
/// control, so they are always quoted before use.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "TIMESTAMP")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// DEFAULT expression, already in SQL syntax
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Column as reported by `pragma_table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i64,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    /// Position within the primary key (1-based), 0 when not part of it
    pub pk: i64,
}

/// Foreign key as reported by `pragma_foreign_key_list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Constraint id; columns of a composite key share it
    pub id: i64,
    /// Column in the child table
    pub from: String,
    /// Parent table
    pub table: String,
    /// Parent column; `None` when the key implicitly targets the parent's primary key
    pub to: Option<String>,
}

/// Difference between declared and live schema
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Cannot be fixed automatically
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    /// Cannot be fixed automatically
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Declared schema of one toolkit table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected column definitions, in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Read-only queries against the live schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of a table, ordered by position
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let rows = sqlx::query(
            r#"
            SELECT cid, name, type, "notnull", dflt_value, pk
            FROM pragma_table_info(?)
            ORDER BY cid
            "#,
        )
        .bind(table_name)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i64, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get("pk"),
            })
            .collect())
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type = 'table' AND name = ? COLLATE NOCASE
            )
            "#,
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// All tables in the database, alphabetically, including SQLite internals
    pub async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>> {
        let tables = sqlx::query_scalar::<_, String>(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table'
            ORDER BY name ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(tables)
    }

    /// Foreign keys declared by a table
    pub async fn foreign_keys(pool: &SqlitePool, table_name: &str) -> Result<Vec<ForeignKey>> {
        let rows = sqlx::query(
            r#"
            SELECT id, "from", "table", "to"
            FROM pragma_foreign_key_list(?)
            ORDER BY id, seq
            "#,
        )
        .bind(table_name)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ForeignKey {
                id: row.get("id"),
                from: row.get("from"),
                table: row.get("table"),
                to: row.get("to"),
            })
            .collect())
    }

    /// Primary key columns in key order
    ///
    /// A table without a declared primary key reports `rowid`.
    pub async fn primary_key_columns(pool: &SqlitePool, table_name: &str) -> Result<Vec<String>> {
        let mut pk: Vec<ActualColumn> = Self::introspect_table(pool, table_name)
            .await?
            .into_iter()
            .filter(|c| c.pk > 0)
            .collect();
        pk.sort_by_key(|c| c.pk);

        if pk.is_empty() {
            return Ok(vec!["rowid".to_string()]);
        }

        Ok(pk.into_iter().map(|c| c.name).collect())
    }
}

/// Drift detection between declared and live columns
pub struct SchemaDiff;

impl SchemaDiff {
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual.iter().find(|c| c.name == expected_col.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                });
            }

            // PRIMARY KEY columns report notnull = 0 in SQLite
            if expected_col.not_null && !expected_col.primary_key && !actual_col.not_null {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && actual_col.pk == 0 {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// SQLite type affinity comparison
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        let integer = |t: &str| t.contains("INT");
        let text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        let real = |t: &str| t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB");

        (integer(&exp) && integer(&act)) || (text(&exp) && text(&act)) || (real(&exp) && real(&act))
    }
}

/// Applies column additions for declared tables
pub struct SchemaSync;

impl SchemaSync {
    /// Add any declared column missing from the live table
    ///
    /// Type and constraint drift is only reported: SQLite needs a table
    /// rebuild for those, which belongs in a migration.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
        let table_name = T::table_name();

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!("Schema sync: table '{}' does not exist yet", table_name);
            return Ok(());
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &T::expected_columns(), &actual);

        if drift.is_empty() {
            return Ok(());
        }

        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, &table, &column).await?;
                }
                SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::ConstraintMismatch { table, column, constraint } => {
                    warn!(
                        "Constraint mismatch in {}.{}: missing '{}'. Manual migration required.",
                        table, column, constraint
                    );
                }
            }
        }

        Ok(())
    }

    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_ident(table),
            quote_ident(&column.name),
            column.sql_type
        );

        if column.primary_key || column.unique {
            warn!(
                "Cannot add constrained column {}.{} via ALTER TABLE; adding it unconstrained",
                table, column.name
            );
        }

        // SQLite rejects non-constant defaults in ADD COLUMN; those are backfilled instead
        let mut backfill = None;
        match (&column.default_value, column.not_null) {
            (Some(default), _) if !is_constant_default(default) => {
                warn!(
                    "Column {}.{} has non-constant default {}; adding it nullable and backfilling",
                    table, column.name, default
                );
                backfill = Some(default.clone());
            }
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, true) => warn!(
                "Cannot add NOT NULL column {}.{} without DEFAULT; adding it nullable",
                table, column.name
            ),
            (None, false) => {}
        }

        info!("Adding column {}.{} ({})", table, column.name, column.sql_type);

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                info!("Column {}.{} already present", table, column.name);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(expr) = backfill {
            let update = format!(
                "UPDATE {table} SET {col} = {expr} WHERE {col} IS NULL",
                table = quote_ident(table),
                col = quote_ident(&column.name),
            );
            sqlx::query(&update).execute(pool).await?;
        }

        Ok(())
    }
}

fn is_constant_default(expr: &str) -> bool {
    let upper = expr.trim().to_uppercase();
    !(upper.starts_with("CURRENT_") || upper.contains('('))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_types_compatible() {
        assert!(SchemaDiff::types_compatible("text", "TEXT"));
        assert!(SchemaDiff::types_compatible("INTEGER", "BIGINT"));
        assert!(SchemaDiff::types_compatible("TEXT", "VARCHAR(150)"));
        assert!(SchemaDiff::types_compatible("REAL", "DOUBLE PRECISION"));
        assert!(!SchemaDiff::types_compatible("TEXT", "INTEGER"));
    }

    #[tokio::test]
    async fn test_foreign_keys_reports_implicit_parent_column() {
        let pool = setup_test_db().await;

        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            CREATE TABLE blog_post (
                id INTEGER PRIMARY KEY,
                author_id INTEGER REFERENCES users,
                editor_id INTEGER REFERENCES users(id)
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let fks = SchemaIntrospector::foreign_keys(&pool, "blog_post").await.unwrap();

        assert_eq!(fks.len(), 2);
        assert!(fks.iter().all(|fk| fk.table == "users"));
        let author = fks.iter().find(|fk| fk.from == "author_id").unwrap();
        assert_eq!(author.to, None);
        let editor = fks.iter().find(|fk| fk.from == "editor_id").unwrap();
        assert_eq!(editor.to.as_deref(), Some("id"));
    }

    #[tokio::test]
    async fn test_primary_key_columns() {
        let pool = setup_test_db().await;

        sqlx::query("CREATE TABLE accounts (uuid TEXT PRIMARY KEY, name TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE loose (name TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(
            SchemaIntrospector::primary_key_columns(&pool, "accounts").await.unwrap(),
            vec!["uuid"]
        );
        assert_eq!(
            SchemaIntrospector::primary_key_columns(&pool, "loose").await.unwrap(),
            vec!["rowid"]
        );
    }

    #[tokio::test]
    async fn test_detect_and_add_missing_column() {
        let pool = setup_test_db().await;

        sqlx::query("CREATE TABLE test_table (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();

        let expected = vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null(),
            ColumnDefinition::new("status", "TEXT").not_null().default("'pending'"),
        ];

        let actual = SchemaIntrospector::introspect_table(&pool, "test_table").await.unwrap();
        let drift = SchemaDiff::compare("test_table", &expected, &actual);
        assert_eq!(drift.len(), 1);
        let SchemaDrift::MissingColumn { column, .. } = &drift[0] else {
            panic!("Expected MissingColumn, got {:?}", drift[0]);
        };
        assert_eq!(column.name, "status");

        SchemaSync::add_column(&pool, "test_table", column).await.unwrap();

        let columns = SchemaIntrospector::introspect_table(&pool, "test_table").await.unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[2].name, "status");
        assert!(columns[2].not_null);
        assert_eq!(columns[2].default_value.as_deref(), Some("'pending'"));
    }

    #[tokio::test]
    async fn test_list_tables_and_exists() {
        let pool = setup_test_db().await;

        assert!(!SchemaIntrospector::table_exists(&pool, "users").await.unwrap());

        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE accounts (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        assert!(SchemaIntrospector::table_exists(&pool, "USERS").await.unwrap());
        assert_eq!(
            SchemaIntrospector::list_tables(&pool).await.unwrap(),
            vec!["accounts", "users"]
        );
    }
}
