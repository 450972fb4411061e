//! # Announcement toolkit common library
//!
//! Shared code for the `announce` command line:
//! - Database schema for audiences, profiles and announcements
//! - Discovery of host tables related to users
//! - Audience generation and profile reconciliation jobs
//! - Settings loading

pub mod config;
pub mod db;
pub mod discovery;
pub mod error;
pub mod reconcile;
pub mod store;

pub use config::AnnouncementConfig;
pub use discovery::{discover_related_entities, RelatedEntity};
pub use error::{Error, Result};
