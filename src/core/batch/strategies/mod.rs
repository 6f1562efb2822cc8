//! Execution strategies
//!
//! Every strategy takes the full record set and a collaborator, and returns
//! an order-preserving [`BatchResult`]. Only a fatal infrastructure error is
//! returned as `Err`.

mod chunked;
mod optimistic;
mod parallel;
mod pipelined;
mod single_query;

use super::chunk::{ChunkResolution, ResultAssembler};
use super::config::{BatchConfig, ErrorContext, PipelineHooks};
use super::operation::ChunkOutput;
use super::sizing::BatchSizeAdvisor;
use super::types::{BatchResult, ExecutionStrategy, RecordSuccess};
use crate::monitoring::metrics::{BatchToken, MetricsCollector};
use crate::utils::error::{BatchError, Result, RetryPolicy};
use serde::Serialize;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;
use tracing::warn;

pub(crate) const DEADLINE_REASON: &str = "batch deadline reached before chunk started";
pub(crate) const ABORT_REASON: &str = "batch aborted by fatal infrastructure error";

/// Everything a strategy needs besides the records and the collaborator
pub(crate) struct ExecutionContext<'a, T, R> {
    pub config: &'a BatchConfig,
    pub hooks: &'a PipelineHooks<T, R>,
    pub advisor: &'a BatchSizeAdvisor,
    pub metrics: Option<(&'a MetricsCollector, &'a BatchToken)>,
    pub deadline: Option<Instant>,
}

impl<'a, T, R> ExecutionContext<'a, T, R> {
    pub fn new(
        config: &'a BatchConfig,
        hooks: &'a PipelineHooks<T, R>,
        advisor: &'a BatchSizeAdvisor,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            config,
            hooks,
            advisor,
            metrics: None,
            deadline,
        }
    }

    pub fn with_metrics(mut self, collector: &'a MetricsCollector, token: &'a BatchToken) -> Self {
        self.metrics = Some((collector, token));
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.retry_config())
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Invoke the error callback; a panicking callback is logged and ignored
    pub fn notify_error(
        &self,
        error: &BatchError,
        chunk_index: usize,
        offset: usize,
        chunk_size: usize,
        attempt: u32,
    ) {
        let Some(callback) = self.config.error_callback.as_ref() else {
            return;
        };
        let context = ErrorContext {
            strategy: self.config.execution_strategy,
            chunk_index,
            offset,
            chunk_size,
            attempt,
        };
        if catch_unwind(AssertUnwindSafe(|| callback(error, &context))).is_err() {
            warn!(chunk = chunk_index, attempt, "Error callback panicked; ignoring");
        }
    }

    /// Record a resolved chunk in metrics and fold it into the result
    pub fn settle(
        &self,
        assembler: &mut ResultAssembler<T, R>,
        resolution: ChunkResolution<T, R>,
        post_process: Option<&(dyn Fn(&mut [RecordSuccess<R>]) + Send + Sync)>,
    ) {
        let report = resolution.report();
        if let Some((collector, token)) = self.metrics {
            collector.record_chunk(token, &report);
        }
        assembler.absorb(resolution, report, post_process);
    }
}

/// Run `records` through `operation` using the configured strategy
pub(crate) async fn execute<T, R, F, Fut>(
    records: Vec<T>,
    operation: &F,
    ctx: &ExecutionContext<'_, T, R>,
) -> Result<BatchResult<T, R>>
where
    T: Clone + Serialize,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<ChunkOutput<R>>>,
{
    match ctx.config.execution_strategy {
        ExecutionStrategy::SingleQuery => single_query::execute(records, operation, ctx).await,
        ExecutionStrategy::Chunked => chunked::execute(records, operation, ctx).await,
        ExecutionStrategy::Parallel => parallel::execute(records, operation, ctx).await,
        ExecutionStrategy::Pipelined => pipelined::execute(records, operation, ctx).await,
        ExecutionStrategy::Optimistic => optimistic::execute(records, operation, ctx).await,
    }
}
