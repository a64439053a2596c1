// src/error.rs

//! Error types for Parcel
//!
//! Entity, conflict and precondition errors surface to HTTP clients through
//! the gateway. Executor and timeout errors only occur inside background
//! downloads and are logged there.

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness constraint violated
    #[error("conflict: {0}")]
    Conflict(String),

    /// Guarded transition precondition did not hold
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Missing or invalid token
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// External fetch command failed
    #[error("fetch failed: {0}")]
    Executor(String),

    /// External fetch command exceeded its time budget
    #[error("fetch timed out: {0}")]
    Timeout(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether this error is a UNIQUE/CHECK constraint violation from SQLite
    pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
