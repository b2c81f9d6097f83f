//! Common error types for MTQ

use thiserror::Error;

/// Common result type for MTQ operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the MTQ crates
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected input: unknown language, misaligned sentence counts, stale cursor
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested sentence set or sentence pair does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upload payload could not be decoded into a dataset shape
    #[error("Malformed payload: {0}")]
    Shape(String),

    /// Store read/write failure (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tabular export rendering error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
