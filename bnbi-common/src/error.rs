//! Common error types for bnbi

use thiserror::Error;

/// Common result type for bnbi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the bnbi crates
///
/// Data-integrity errors (`MalformedPrice`, `MissingColumn`, `UnmappedFlag`)
/// abort the pipeline run that raised them. Recoverable conditions are
/// reported as [`crate::pipeline::PipelineWarning`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON decoding error (document backend payloads)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record source could not be reached or returned an unusable payload
    #[error("Record source error: {0}")]
    Source(String),

    /// Price cell not parseable after currency stripping, negative, or non-finite
    #[error("Malformed price at row {row}: {value:?}")]
    MalformedPrice { row: usize, value: String },

    /// Required column absent from the raw table
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Boolean flag cell other than "t"/"f" under `FlagPolicy::Reject`
    #[error("Unmapped value {value:?} in flag column {column} at row {row}")]
    UnmappedFlag {
        column: String,
        row: usize,
        value: String,
    },
}
