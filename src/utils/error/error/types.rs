//! Error types for the batch engine

use thiserror::Error;

/// Result type alias for the batch engine
pub type Result<T> = std::result::Result<T, BatchError>;

/// Main error type for the batch engine
///
/// Only infrastructure-level failures ever surface to callers as `Err`.
/// Per-record and exhausted per-chunk failures are reported inside
/// [`BatchResult`](crate::core::batch::BatchResult) instead.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors raised by a pre-processing hook
    #[error("Validation error: {0}")]
    Validation(String),

    /// The collaborator failed for a whole chunk; eligible for retry
    #[error("Chunk execution error: {0}")]
    ChunkExecution(String),

    /// The backing store is unreachable; never retried
    #[error("Fatal infrastructure error: {0}")]
    FatalInfrastructure(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}
