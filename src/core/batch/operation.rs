//! Collaborator contract
//!
//! A collaborator is any `Fn(Vec<T>) -> Future<Output = Result<ChunkOutput<R>>>`.
//! It receives one chunk and reports one outcome per submitted record, in
//! submission order. An `Err` means the whole chunk failed: retryable errors
//! are retried, `BatchError::FatalInfrastructure` aborts the call.

use crate::utils::error::RecordError;
use serde::{Deserialize, Serialize};

/// Per-record outcomes of one collaborator call, aligned with the submitted chunk
///
/// Missing trailing outcomes are reported as failures; extra ones are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutput<R> {
    outcomes: Vec<std::result::Result<R, RecordError>>,
}

impl<R> ChunkOutput<R> {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
        }
    }

    /// Every record in the chunk succeeded with the given values
    pub fn all_ok<I: IntoIterator<Item = R>>(values: I) -> Self {
        Self {
            outcomes: values.into_iter().map(Ok).collect(),
        }
    }

    pub fn from_outcomes(outcomes: Vec<std::result::Result<R, RecordError>>) -> Self {
        Self { outcomes }
    }

    pub fn push_ok(&mut self, value: R) {
        self.outcomes.push(Ok(value));
    }

    pub fn push_err(&mut self, error: RecordError) {
        self.outcomes.push(Err(error));
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn outcomes(&self) -> &[std::result::Result<R, RecordError>] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<std::result::Result<R, RecordError>> {
        self.outcomes
    }
}

impl<R> Default for ChunkOutput<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> FromIterator<std::result::Result<R, RecordError>> for ChunkOutput<R> {
    fn from_iter<I: IntoIterator<Item = std::result::Result<R, RecordError>>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}
