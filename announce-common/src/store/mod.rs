//! Query functions per entity
//!
//! Functions that take `&mut SqliteConnection` are meant to run inside a
//! caller-owned transaction; the rest take the pool directly.

pub mod announcements;
pub mod audiences;
pub mod profiles;

/// Rows per multi-row statement, well below SQLite's bound-parameter limit
pub(crate) const BIND_CHUNK: usize = 500;
