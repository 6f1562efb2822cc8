//! Chunk partitioning, execution and result assembly shared by all strategies

use super::operation::ChunkOutput;
use super::strategies::ExecutionContext;
use super::types::{
    BatchResult, ChunkReport, ChunkStatus, ExecutionStrategy, IndexedRecord, RecordFailure,
    RecordSuccess, SkipReason, SkippedRecord,
};
use crate::utils::error::{BatchError, Bulkhead, RecordError, Result, RetryPolicy};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Consecutive slice of the input, tagged with original indices
#[derive(Debug, Clone)]
pub(crate) struct Chunk<T> {
    pub index: usize,
    pub offset: usize,
    pub items: Vec<IndexedRecord<T>>,
    /// Records removed by a pre-processing hook
    pub filtered: Vec<IndexedRecord<T>>,
}

impl<T> Chunk<T> {
    /// Whole input as a single chunk
    pub fn whole(records: Vec<T>) -> Self {
        let mut chunks = partition(records, usize::MAX);
        chunks.pop().unwrap_or(Self {
            index: 0,
            offset: 0,
            items: Vec::new(),
            filtered: Vec::new(),
        })
    }

    /// Records originally assigned to this chunk
    pub fn size(&self) -> usize {
        self.items.len() + self.filtered.len()
    }

    pub fn into_records(self) -> Vec<T> {
        let mut all: Vec<IndexedRecord<T>> = self.items;
        all.extend(self.filtered);
        all.sort_by_key(|item| item.index);
        all.into_iter().map(|item| item.record).collect()
    }
}

impl<T: Clone> Chunk<T> {
    fn payload(&self) -> Vec<T> {
        self.items.iter().map(|item| item.record.clone()).collect()
    }
}

/// Split records into consecutive chunks of at most `size` records
pub(crate) fn partition<T>(records: Vec<T>, size: usize) -> Vec<Chunk<T>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(records.len().div_ceil(size));
    let mut iter = records.into_iter().enumerate().peekable();

    while iter.peek().is_some() {
        let items: Vec<IndexedRecord<T>> = iter
            .by_ref()
            .take(size)
            .map(|(index, record)| IndexedRecord { index, record })
            .collect();
        let offset = items.first().map(|item| item.index).unwrap_or(0);
        chunks.push(Chunk {
            index: chunks.len(),
            offset,
            items,
            filtered: Vec::new(),
        });
    }

    chunks
}

/// How a chunk ended up
pub(crate) enum ChunkResolution<T, R> {
    Completed {
        chunk: Chunk<T>,
        output: ChunkOutput<R>,
        retries: u32,
        duration: Duration,
    },
    /// Every allowed attempt failed
    Exhausted {
        chunk: Chunk<T>,
        error: BatchError,
        attempts: u32,
        duration: Duration,
    },
    /// Never submitted because of a pre-processing decision
    Skipped { chunk: Chunk<T>, reason: SkipReason },
    /// Never started (deadline reached or call aborted)
    Abandoned { chunk: Chunk<T>, reason: String },
}

impl<T, R> ChunkResolution<T, R> {
    pub fn abandoned(chunk: Chunk<T>, reason: impl Into<String>) -> Self {
        Self::Abandoned {
            chunk,
            reason: reason.into(),
        }
    }

    fn chunk(&self) -> &Chunk<T> {
        match self {
            Self::Completed { chunk, .. }
            | Self::Exhausted { chunk, .. }
            | Self::Skipped { chunk, .. }
            | Self::Abandoned { chunk, .. } => chunk,
        }
    }

    /// Counts for this chunk, computed without consuming it
    pub fn report(&self) -> ChunkReport {
        let chunk = self.chunk();
        let filtered = chunk.filtered.len();
        let attempted = chunk.items.len();

        let (succeeded, failed, skipped, retries, duration, status) = match self {
            Self::Completed {
                output,
                retries,
                duration,
                ..
            } => {
                let succeeded = output
                    .outcomes()
                    .iter()
                    .take(attempted)
                    .filter(|o| o.is_ok())
                    .count();
                let failed = attempted - succeeded;
                let status = if failed == 0 {
                    ChunkStatus::Succeeded
                } else if succeeded == 0 {
                    ChunkStatus::Failed
                } else {
                    ChunkStatus::Partial
                };
                (succeeded, failed, filtered, *retries, *duration, status)
            }
            Self::Exhausted {
                attempts, duration, ..
            } => (
                0,
                attempted,
                filtered,
                attempts.saturating_sub(1),
                *duration,
                ChunkStatus::Failed,
            ),
            Self::Skipped { .. } => (
                0,
                0,
                attempted + filtered,
                0,
                Duration::ZERO,
                ChunkStatus::Skipped,
            ),
            Self::Abandoned { .. } => (
                0,
                attempted + filtered,
                0,
                0,
                Duration::ZERO,
                ChunkStatus::Abandoned,
            ),
        };

        ChunkReport {
            index: chunk.index,
            offset: chunk.offset,
            size: chunk.size(),
            attempted: match self {
                Self::Completed { .. } | Self::Exhausted { .. } => attempted,
                _ => 0,
            },
            succeeded,
            failed,
            skipped,
            retries,
            duration,
            status,
        }
    }
}

/// Run one chunk through the collaborator with the configured retry policy
///
/// Returns `Err` only for a fatal infrastructure error, which must abort the
/// whole call.
pub(crate) async fn run_chunk<T, R, F, Fut>(
    chunk: Chunk<T>,
    operation: &F,
    ctx: &ExecutionContext<'_, T, R>,
    policy: &RetryPolicy,
    bulkhead: Option<&Bulkhead>,
) -> Result<ChunkResolution<T, R>>
where
    T: Clone,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<ChunkOutput<R>>>,
{
    let started = Instant::now();
    let chunk_index = chunk.index;
    let offset = chunk.offset;
    let chunk_size = chunk.items.len();

    let outcome = policy
        .call_observed(
            |attempt| {
                let payload = chunk.payload();
                async move {
                    debug!(
                        chunk = chunk_index,
                        attempt,
                        size = payload.len(),
                        "Submitting chunk"
                    );
                    match bulkhead {
                        Some(bulkhead) => bulkhead
                            .call(operation(payload))
                            .await
                            .and_then(|result| result),
                        None => operation(payload).await,
                    }
                }
            },
            BatchError::is_retryable,
            |error, attempt| {
                ctx.notify_error(error, chunk_index, offset, chunk_size, attempt);
            },
        )
        .await;

    let duration = started.elapsed();
    let retries = outcome.retries();
    match outcome.result {
        Ok(output) => Ok(ChunkResolution::Completed {
            retries,
            chunk,
            output,
            duration,
        }),
        Err(error) if error.is_fatal() => Err(error),
        Err(error) => {
            warn!(
                chunk = chunk_index,
                attempts = outcome.attempts,
                error = %error,
                "Chunk failed on every attempt"
            );
            Ok(ChunkResolution::Exhausted {
                chunk,
                error,
                attempts: outcome.attempts,
                duration,
            })
        }
    }
}

/// Collects chunk resolutions into a [`BatchResult`]
pub(crate) struct ResultAssembler<T, R> {
    strategy: ExecutionStrategy,
    total: usize,
    started: Instant,
    successful: Vec<RecordSuccess<R>>,
    failed: Vec<RecordFailure<T>>,
    skipped: Vec<SkippedRecord<T>>,
    chunks: Vec<ChunkReport>,
}

impl<T, R> ResultAssembler<T, R> {
    pub fn new(strategy: ExecutionStrategy, total: usize) -> Self {
        Self {
            strategy,
            total,
            started: Instant::now(),
            successful: Vec::with_capacity(total),
            failed: Vec::new(),
            skipped: Vec::new(),
            chunks: Vec::new(),
        }
    }

    /// Fold a resolution in, applying the post-processing hook to its successes
    pub fn absorb(
        &mut self,
        resolution: ChunkResolution<T, R>,
        report: ChunkReport,
        post_process: Option<&(dyn Fn(&mut [RecordSuccess<R>]) + Send + Sync)>,
    ) {
        match resolution {
            ChunkResolution::Completed { chunk, output, .. } => {
                self.skip_all(chunk.filtered, SkipReason::Filtered);

                let mut outcomes = output.into_outcomes().into_iter();
                let mut chunk_successes = Vec::with_capacity(chunk.items.len());
                for item in chunk.items {
                    match outcomes.next() {
                        Some(Ok(value)) => chunk_successes.push(RecordSuccess {
                            index: item.index,
                            value,
                        }),
                        Some(Err(error)) => self.fail(item, error),
                        None => self.fail(item, RecordError::missing()),
                    }
                }

                if let Some(post) = post_process {
                    post(&mut chunk_successes);
                }
                self.successful.extend(chunk_successes);
            }
            ChunkResolution::Exhausted {
                chunk,
                error,
                attempts,
                ..
            } => {
                self.skip_all(chunk.filtered, SkipReason::Filtered);
                let message = format!("{} (after {} attempts)", error, attempts);
                for item in chunk.items {
                    self.fail(item, RecordError::chunk_failed(message.clone()));
                }
            }
            ChunkResolution::Skipped { chunk, reason } => {
                self.skip_all(chunk.filtered, SkipReason::Filtered);
                self.skip_all(chunk.items, reason);
            }
            ChunkResolution::Abandoned { chunk, reason } => {
                let mut items = chunk.items;
                items.extend(chunk.filtered);
                for item in items {
                    self.fail(item, RecordError::abandoned(reason.clone()));
                }
            }
        }
        self.chunks.push(report);
    }

    fn fail(&mut self, item: IndexedRecord<T>, error: RecordError) {
        self.failed.push(RecordFailure {
            index: item.index,
            record: item.record,
            error,
        });
    }

    fn skip_all(&mut self, items: Vec<IndexedRecord<T>>, reason: SkipReason) {
        self.skipped
            .extend(items.into_iter().map(|item| SkippedRecord {
                index: item.index,
                record: item.record,
                reason: reason.clone(),
            }));
    }

    pub fn finish(self, used_fallback: bool) -> BatchResult<T, R> {
        let mut result = BatchResult {
            strategy: self.strategy,
            total: self.total,
            successful: self.successful,
            failed: self.failed,
            skipped: self.skipped,
            elapsed: self.started.elapsed(),
            chunks: self.chunks,
            used_fallback,
        };
        result.sort_by_index();
        result.chunks.sort_by_key(|c| c.index);
        result
    }
}
