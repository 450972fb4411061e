//! Common error types for the announcement toolkit

use thiserror::Error;

/// Common result type for announcement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the library and the command line
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid operator input or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Profile reconciliation needs audiences to exist first
    #[error("No audiences found. Please run the 'generate-audiences' command first.")]
    MissingAudiences,

    /// Stored data that cannot be interpreted (e.g. a malformed guid)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<uuid::Error> for Error {
    fn from(err: uuid::Error) -> Self {
        Error::Internal(format!("malformed guid: {}", err))
    }
}
