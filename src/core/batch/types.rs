//! Batch execution types and data structures

use crate::utils::error::{BatchError, RecordError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Algorithm used to apply a record set to the collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// All records in one collaborator call
    SingleQuery,
    /// Consecutive chunks, one at a time
    #[default]
    Chunked,
    /// Chunks fanned out to at most `max_workers` concurrent calls
    Parallel,
    /// Chunks run through pre-process, operation and post-process stages
    Pipelined,
    /// One un-retried attempt on everything, chunked fallback on rejection
    Optimistic,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleQuery => "single_query",
            Self::Chunked => "chunked",
            Self::Parallel => "parallel",
            Self::Pipelined => "pipelined",
            Self::Optimistic => "optimistic",
        }
    }
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStrategy {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "single_query" | "single" => Ok(Self::SingleQuery),
            "chunked" => Ok(Self::Chunked),
            "parallel" => Ok(Self::Parallel),
            "pipelined" => Ok(Self::Pipelined),
            "optimistic" => Ok(Self::Optimistic),
            other => Err(BatchError::config(format!(
                "Unknown execution strategy: {}",
                other
            ))),
        }
    }
}

/// Named chunk-size presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchSize {
    Small,
    Medium,
    Large,
    XLarge,
}

impl BatchSize {
    pub const fn value(self) -> usize {
        match self {
            Self::Small => 100,
            Self::Medium => 500,
            Self::Large => 1000,
            Self::XLarge => 5000,
        }
    }
}

impl From<BatchSize> for usize {
    fn from(size: BatchSize) -> Self {
        size.value()
    }
}

/// Kind of storage effect a batch applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
    Upsert,
    Get,
    Compute,
    Import,
    /// Caller-supplied collaborator run through `BatchExecutor::execute`
    Custom,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Upsert => "upsert",
            Self::Get => "get",
            Self::Compute => "compute",
            Self::Import => "import",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque domain record tagged with the operation to apply to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord<T> {
    pub kind: OperationKind,
    pub payload: T,
    /// Fields to write for updates; `None` means the whole record
    pub changed_fields: Option<Vec<String>>,
}

impl<T> OperationRecord<T> {
    pub fn new(kind: OperationKind, payload: T) -> Self {
        Self {
            kind,
            payload,
            changed_fields: None,
        }
    }

    pub fn insert(payload: T) -> Self {
        Self::new(OperationKind::Insert, payload)
    }

    pub fn update(payload: T, changed_fields: Option<Vec<String>>) -> Self {
        Self {
            kind: OperationKind::Update,
            payload,
            changed_fields,
        }
    }
}

/// Canonical encoding of a record's values for a set of unique fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UniqueKey(String);

impl UniqueKey {
    /// Build the key from the record's serialized fields
    ///
    /// Returns `None` when the record is not a JSON object or lacks one of
    /// the fields (such records cannot be deduplicated).
    pub fn from_record<T: Serialize>(record: &T, fields: &[String]) -> Result<Option<Self>> {
        if fields.is_empty() {
            return Ok(None);
        }
        let value = serde_json::to_value(record)?;
        let Some(object) = value.as_object() else {
            return Ok(None);
        };

        let mut parts = Vec::with_capacity(fields.len());
        for field in fields {
            match object.get(field) {
                Some(v) if !v.is_null() => parts.push(v.clone()),
                _ => return Ok(None),
            }
        }

        Ok(Some(Self(serde_json::to_string(&parts)?)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Record paired with its position in the caller's input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord<T> {
    pub index: usize,
    pub record: T,
}

/// Successful record outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSuccess<R> {
    pub index: usize,
    pub value: R,
}

/// Failed record outcome, keeping the submitted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFailure<T> {
    pub index: usize,
    pub record: T,
    pub error: RecordError,
}

/// Why a record was never attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Dropped by a pre-processing hook
    Filtered,
    /// The pre-processing hook rejected the whole chunk
    Validation(String),
    /// Repeats a unique key seen earlier in the same input
    Duplicate,
    /// Unique key already stored and conflicts are not updated
    Conflict,
}

/// Record that was skipped without reaching the collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord<T> {
    pub index: usize,
    pub record: T,
    pub reason: SkipReason,
}

/// Final state of one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Succeeded,
    Partial,
    Failed,
    Skipped,
    Abandoned,
}

/// Per-chunk breakdown entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkReport {
    pub index: usize,
    pub offset: usize,
    pub size: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub retries: u32,
    pub duration: Duration,
    pub status: ChunkStatus,
}

/// One input position's outcome, borrowed from a [`BatchResult`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordOutcome<'a, T, R> {
    Succeeded(&'a R),
    Failed(&'a RecordFailure<T>),
    Skipped(&'a SkippedRecord<T>),
}

impl<T, R> RecordOutcome<'_, T, R> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Aggregated, order-preserving outcome of one batch call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult<T, R> {
    pub strategy: ExecutionStrategy,
    /// Records submitted by the caller
    pub total: usize,
    /// Successes sorted by input index
    pub successful: Vec<RecordSuccess<R>>,
    /// Failures sorted by input index
    pub failed: Vec<RecordFailure<T>>,
    /// Records never attempted, sorted by input index
    pub skipped: Vec<SkippedRecord<T>>,
    pub elapsed: Duration,
    pub chunks: Vec<ChunkReport>,
    /// Set when an optimistic attempt was rejected and chunking took over
    pub used_fallback: bool,
}

impl<T, R> BatchResult<T, R> {
    /// Result for an empty input
    pub fn empty(strategy: ExecutionStrategy) -> Self {
        Self {
            strategy,
            total: 0,
            successful: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            elapsed: Duration::ZERO,
            chunks: Vec::new(),
            used_fallback: false,
        }
    }

    pub fn success_count(&self) -> usize {
        self.successful.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Every submitted record succeeded
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Records per second; zero for an empty or instantaneous batch
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if self.total == 0 || secs <= 0.0 {
            0.0
        } else {
            self.total as f64 / secs
        }
    }

    /// Total retries spent across all chunks
    pub fn retries_used(&self) -> u32 {
        self.chunks.iter().map(|c| c.retries).sum()
    }

    /// Successful values in input order
    pub fn values(&self) -> impl Iterator<Item = &R> {
        self.successful.iter().map(|s| &s.value)
    }

    pub fn into_values(self) -> Vec<R> {
        self.successful.into_iter().map(|s| s.value).collect()
    }

    /// One outcome per input position, in input order
    pub fn outcomes(&self) -> Vec<(usize, RecordOutcome<'_, T, R>)> {
        let mut outcomes: Vec<(usize, RecordOutcome<'_, T, R>)> =
            Vec::with_capacity(self.total);
        outcomes.extend(
            self.successful
                .iter()
                .map(|s| (s.index, RecordOutcome::Succeeded(&s.value))),
        );
        outcomes.extend(self.failed.iter().map(|f| (f.index, RecordOutcome::Failed(f))));
        outcomes.extend(
            self.skipped
                .iter()
                .map(|s| (s.index, RecordOutcome::Skipped(s))),
        );
        outcomes.sort_by_key(|(index, _)| *index);
        outcomes
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            strategy: self.strategy,
            total: self.total,
            succeeded: self.successful.len(),
            failed: self.failed.len(),
            skipped: self.skipped.len(),
            chunks: self.chunks.len(),
            retries: self.retries_used(),
            elapsed_seconds: self.elapsed.as_secs_f64(),
            throughput: self.throughput(),
            used_fallback: self.used_fallback,
        }
    }

    /// Fold a result computed over a subset of this batch's input
    ///
    /// `index_map[i]` is the position in this batch of the subset's record `i`.
    pub(crate) fn absorb_mapped(&mut self, other: BatchResult<T, R>, index_map: &[usize]) {
        let remap = |index: usize| index_map.get(index).copied().unwrap_or(index);
        let chunk_base = self.chunks.len();

        self.successful
            .extend(other.successful.into_iter().map(|mut s| {
                s.index = remap(s.index);
                s
            }));
        self.failed.extend(other.failed.into_iter().map(|mut f| {
            f.index = remap(f.index);
            f
        }));
        self.skipped.extend(other.skipped.into_iter().map(|mut s| {
            s.index = remap(s.index);
            s
        }));
        self.chunks
            .extend(other.chunks.into_iter().enumerate().map(|(i, mut c)| {
                c.index = chunk_base + i;
                c
            }));
        self.used_fallback |= other.used_fallback;
    }

    pub(crate) fn sort_by_index(&mut self) {
        self.successful.sort_by_key(|s| s.index);
        self.failed.sort_by_key(|f| f.index);
        self.skipped.sort_by_key(|s| s.index);
    }
}

/// Type-erased statistics of a [`BatchResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub strategy: ExecutionStrategy,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub chunks: usize,
    pub retries: u32,
    pub elapsed_seconds: f64,
    pub throughput: f64,
    pub used_fallback: bool,
}
