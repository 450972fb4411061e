//! announce-cli library - operator commands for the announcement toolkit
//!
//! The binary in `main.rs` only parses arguments, loads settings and wires
//! stdin/stdout into a [`Console`]; everything else lives here so it can be
//! driven from tests with in-memory input and output.

use anyhow::{bail, Context, Result};
use announce_common::db::init_database;
use sqlx::SqlitePool;
use std::path::Path;

pub mod commands;
pub mod console;

pub use commands::Outcome;
pub use console::Console;

/// Open the host database and bring the toolkit tables up to date
///
/// The database belongs to the host application, so a missing file is an
/// error rather than a reason to create an empty one.
pub async fn open_database(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        bail!(
            "Database not found: {}\nSet `database` in config.toml, ANNOUNCE_DATABASE, or pass --database.",
            db_path.display()
        );
    }

    init_database(db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}
