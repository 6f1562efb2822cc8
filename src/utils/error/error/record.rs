//! Per-record error data reported inside batch results

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a record ended up in the failure list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordErrorKind {
    /// The collaborator rejected this record inside an otherwise-successful chunk
    Record,
    /// The record's chunk failed on every allowed attempt
    ChunkFailed,
    /// The record's chunk was never started (deadline reached)
    Abandoned,
    /// The collaborator returned no outcome for this record
    Missing,
}

/// Failure of a single record. Reported, never raised.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct RecordError {
    pub kind: RecordErrorKind,
    pub message: String,
}

impl RecordError {
    pub fn new<S: Into<String>>(kind: RecordErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error reported by the collaborator for one record
    pub fn record<S: Into<String>>(message: S) -> Self {
        Self::new(RecordErrorKind::Record, message)
    }

    pub fn chunk_failed<S: Into<String>>(message: S) -> Self {
        Self::new(RecordErrorKind::ChunkFailed, message)
    }

    pub fn abandoned<S: Into<String>>(message: S) -> Self {
        Self::new(RecordErrorKind::Abandoned, message)
    }

    pub fn missing() -> Self {
        Self::new(
            RecordErrorKind::Missing,
            "collaborator reported no outcome for record",
        )
    }
}

impl From<super::BatchError> for RecordError {
    fn from(err: super::BatchError) -> Self {
        Self::record(err.to_string())
    }
}
