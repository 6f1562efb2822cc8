//! Batch configuration and pipeline hooks

use super::types::{ExecutionStrategy, IndexedRecord, RecordSuccess};
use crate::utils::error::{Backoff, BatchError, Result, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where a chunk failure happened, passed to the error callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub strategy: ExecutionStrategy,
    pub chunk_index: usize,
    /// Input index of the chunk's first record
    pub offset: usize,
    pub chunk_size: usize,
    /// 1-based attempt that failed
    pub attempt: u32,
}

/// Observer invoked on every failed chunk attempt
pub type ErrorCallback = Arc<dyn Fn(&BatchError, &ErrorContext) + Send + Sync>;

/// Configuration for batch operations
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub execution_strategy: ExecutionStrategy,
    /// Fixed chunk size; `None` lets the size heuristic decide
    pub batch_size: Option<usize>,
    /// Upper bound on concurrently running chunks (parallel strategy)
    pub max_workers: usize,
    /// Retries after the first failed attempt of a chunk
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub backoff: Backoff,
    pub retry_jitter: bool,
    /// Overall deadline; chunks not started before it are abandoned
    pub timeout: Option<Duration>,
    pub collect_metrics: bool,
    /// Derive chunk size from serialized record size even when `batch_size` is set
    pub optimize_for_size: bool,
    #[serde(skip)]
    pub error_callback: Option<ErrorCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            execution_strategy: ExecutionStrategy::Chunked,
            batch_size: None,
            max_workers: 4,
            retry_count: 3,
            retry_delay: Duration::from_millis(100),
            backoff: Backoff::Linear,
            retry_jitter: false,
            timeout: None,
            collect_metrics: true,
            optimize_for_size: false,
            error_callback: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("execution_strategy", &self.execution_strategy)
            .field("batch_size", &self.batch_size)
            .field("max_workers", &self.max_workers)
            .field("retry_count", &self.retry_count)
            .field("retry_delay", &self.retry_delay)
            .field("backoff", &self.backoff)
            .field("retry_jitter", &self.retry_jitter)
            .field("timeout", &self.timeout)
            .field("collect_metrics", &self.collect_metrics)
            .field("optimize_for_size", &self.optimize_for_size)
            .field("error_callback", &self.error_callback.is_some())
            .finish()
    }
}

impl BatchConfig {
    pub fn new(strategy: ExecutionStrategy) -> Self {
        Self {
            execution_strategy: strategy,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution_strategy = strategy;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_retry_count(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Retry delay in (possibly fractional) seconds; negative or non-finite means zero
    pub fn with_retry_delay_secs(mut self, secs: f64) -> Self {
        self.retry_delay = if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            Duration::ZERO
        };
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_retry_jitter(mut self, jitter: bool) -> Self {
        self.retry_jitter = jitter;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_collect_metrics(mut self, collect: bool) -> Self {
        self.collect_metrics = collect;
        self
    }

    pub fn with_optimize_for_size(mut self, optimize: bool) -> Self {
        self.optimize_for_size = optimize;
        self
    }

    pub fn with_error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&BatchError, &ErrorContext) + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(callback));
        self
    }

    /// Retry settings derived from this configuration
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry_count,
            base_delay: self.retry_delay,
            backoff: self.backoff,
            jitter: self.retry_jitter,
        }
    }

    /// Instant after which no new chunk of a call started now may begin
    pub(crate) fn deadline_from_now(&self) -> Option<Instant> {
        self.timeout.map(|timeout| Instant::now() + timeout)
    }
}

/// Pre-processing stage: receives a chunk, returns the records to submit
///
/// Returning `Err(BatchError::Validation(..))` skips the whole chunk.
pub type PreProcessFn<T> =
    Arc<dyn Fn(Vec<IndexedRecord<T>>) -> Result<Vec<IndexedRecord<T>>> + Send + Sync>;

/// Post-processing stage: may rewrite a chunk's successful values in place
pub type PostProcessFn<R> = Arc<dyn Fn(&mut [RecordSuccess<R>]) + Send + Sync>;

/// Hooks applied around each chunk by the pipelined strategy
pub struct PipelineHooks<T, R> {
    pub pre_process: Option<PreProcessFn<T>>,
    pub post_process: Option<PostProcessFn<R>>,
}

impl<T, R> PipelineHooks<T, R> {
    pub fn new() -> Self {
        Self {
            pre_process: None,
            post_process: None,
        }
    }

    pub fn with_pre_process<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<IndexedRecord<T>>) -> Result<Vec<IndexedRecord<T>>> + Send + Sync + 'static,
    {
        self.pre_process = Some(Arc::new(f));
        self
    }

    pub fn with_post_process<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut [RecordSuccess<R>]) + Send + Sync + 'static,
    {
        self.post_process = Some(Arc::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pre_process.is_none() && self.post_process.is_none()
    }
}

impl<T, R> Default for PipelineHooks<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> Clone for PipelineHooks<T, R> {
    fn clone(&self) -> Self {
        Self {
            pre_process: self.pre_process.clone(),
            post_process: self.post_process.clone(),
        }
    }
}

impl<T, R> fmt::Debug for PipelineHooks<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineHooks")
            .field("pre_process", &self.pre_process.is_some())
            .field("post_process", &self.post_process.is_some())
            .finish()
    }
}
