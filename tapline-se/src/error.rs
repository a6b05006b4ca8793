//! Error types for tapline-se
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Resolution and write failures are caught at the pipeline
//! boundary and converted into failure broadcasts; none may escape far
//! enough to kill the reader listeners.

use thiserror::Error;

/// Main error type for the tapline-se module
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Roster never finished loading within the warm-up wait
    #[error("Roster for site {0} is not available")]
    RosterUnavailable(String),

    /// Identifier resolved to no person in any tier of either roster
    #[error("unrecognized card")]
    UnrecognizedCard,

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using tapline-se Error
pub type Result<T> = std::result::Result<T, Error>;
