//! Database access: opening, schema upkeep and row models

pub mod init;
pub mod migrations;
pub mod models;
pub mod schema_sync;
pub mod table_schemas;

pub use init::{init_database, init_schema};
pub use models::*;
pub use schema_sync::{quote_ident, ForeignKey, SchemaIntrospector};

/// Prefix shared by every table this toolkit owns
pub const OWN_TABLE_PREFIX: &str = "announcement_";
