//! Strategy-agnostic batch executor

use super::config::{BatchConfig, PipelineHooks};
use super::operation::ChunkOutput;
use super::sizing::BatchSizeAdvisor;
use super::strategies::{self, ExecutionContext};
use super::types::{BatchResult, OperationKind};
use crate::config::validation::Validate;
use crate::monitoring::metrics::{BatchMetrics, BatchToken, MetricsCollector, MetricsSnapshot};
use crate::utils::error::Result;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Runs record sets through a collaborator with the configured strategy
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    config: BatchConfig,
    advisor: BatchSizeAdvisor,
    metrics: Arc<MetricsCollector>,
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

impl BatchExecutor {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            advisor: BatchSizeAdvisor::default(),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    pub fn with_advisor(mut self, advisor: BatchSizeAdvisor) -> Self {
        self.advisor = advisor;
        self
    }

    /// Share a collector with other executors
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn advisor(&self) -> &BatchSizeAdvisor {
        &self.advisor
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.get_metrics()
    }

    /// Per-call override if given, otherwise the executor's own config
    pub fn effective_config<'a>(&'a self, config: Option<&'a BatchConfig>) -> Result<&'a BatchConfig> {
        let config = config.unwrap_or(&self.config);
        config.validate()?;
        Ok(config)
    }

    /// Apply `operation` to `records` chunk by chunk
    pub async fn execute<T, R, F, Fut>(
        &self,
        kind: OperationKind,
        records: Vec<T>,
        operation: F,
        config: Option<&BatchConfig>,
    ) -> Result<BatchResult<T, R>>
    where
        T: Clone + Serialize,
        F: Fn(Vec<T>) -> Fut,
        Fut: Future<Output = Result<ChunkOutput<R>>>,
    {
        self.execute_with_hooks(kind, records, operation, &PipelineHooks::default(), config)
            .await
    }

    /// Like [`execute`](Self::execute), with hooks for the pipelined strategy
    pub async fn execute_with_hooks<T, R, F, Fut>(
        &self,
        kind: OperationKind,
        records: Vec<T>,
        operation: F,
        hooks: &PipelineHooks<T, R>,
        config: Option<&BatchConfig>,
    ) -> Result<BatchResult<T, R>>
    where
        T: Clone + Serialize,
        F: Fn(Vec<T>) -> Fut,
        Fut: Future<Output = Result<ChunkOutput<R>>>,
    {
        let config = self.effective_config(config)?;
        if records.is_empty() {
            return Ok(BatchResult::empty(config.execution_strategy));
        }

        let deadline = config.deadline_from_now();
        let token = self.begin(kind, config);
        let result = self
            .run(kind, records, &operation, hooks, config, token.as_ref(), deadline)
            .await;
        self.finish(token);
        result
    }

    pub(crate) fn begin(&self, kind: OperationKind, config: &BatchConfig) -> Option<BatchToken> {
        config
            .collect_metrics
            .then(|| self.metrics.start_batch(kind, config.execution_strategy))
    }

    pub(crate) fn finish(&self, token: Option<BatchToken>) -> Option<BatchMetrics> {
        token.and_then(|token| self.metrics.finish_batch(token))
    }

    /// Execute under an already started metrics token and call deadline
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn run<T, R, F, Fut>(
        &self,
        kind: OperationKind,
        records: Vec<T>,
        operation: &F,
        hooks: &PipelineHooks<T, R>,
        config: &BatchConfig,
        token: Option<&BatchToken>,
        deadline: Option<Instant>,
    ) -> Result<BatchResult<T, R>>
    where
        T: Clone + Serialize,
        F: Fn(Vec<T>) -> Fut,
        Fut: Future<Output = Result<ChunkOutput<R>>>,
    {
        if records.is_empty() {
            return Ok(BatchResult::empty(config.execution_strategy));
        }

        let mut ctx = ExecutionContext::new(config, hooks, &self.advisor, deadline);
        if let Some(token) = token {
            ctx = ctx.with_metrics(&self.metrics, token);
        }

        info!(
            operation = %kind,
            strategy = %config.execution_strategy,
            records = records.len(),
            "Executing batch"
        );

        let result = strategies::execute(records, operation, &ctx).await?;

        info!(
            operation = %kind,
            strategy = %result.strategy,
            succeeded = result.success_count(),
            failed = result.failure_count(),
            skipped = result.skipped_count(),
            chunks = result.chunks.len(),
            used_fallback = result.used_fallback,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Batch completed"
        );

        Ok(result)
    }
}
