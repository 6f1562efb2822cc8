//! Metrics collector implementation for recording batch metrics

use super::bounded::{BoundedPush, MAX_RECENT_BATCHES};
use super::types::{BatchMetrics, BatchToken, InFlightBatch, MetricsSnapshot, MetricsStorage};
use crate::core::batch::{ChunkReport, ChunkStatus, ExecutionStrategy, OperationKind};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Thread-safe batch metrics collector
///
/// Recording never fails: unknown tokens are logged and ignored.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    storage: RwLock<MetricsStorage>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking a batch
    pub fn start_batch(&self, operation: OperationKind, strategy: ExecutionStrategy) -> BatchToken {
        let token = BatchToken::new();
        let mut storage = self.storage.write();
        storage
            .in_flight
            .insert(token.id(), InFlightBatch::new(operation, strategy));
        storage.cumulative.batches_started += 1;
        debug!(batch_id = %token.id(), %operation, %strategy, "Batch started");
        token
    }

    /// Record one resolved chunk against an in-flight batch
    pub fn record_chunk(&self, token: &BatchToken, report: &ChunkReport) {
        let mut storage = self.storage.write();
        let storage = &mut *storage;

        let Some(batch) = storage.in_flight.get_mut(&token.id()) else {
            warn!(batch_id = %token.id(), "Chunk recorded for unknown batch");
            return;
        };

        let succeeded = report.succeeded as u64;
        let failed = report.failed as u64;
        let skipped = report.skipped as u64;
        let chunk_failed = matches!(report.status, ChunkStatus::Failed | ChunkStatus::Abandoned);

        batch.succeeded += succeeded;
        batch.failed += failed;
        batch.skipped += skipped;
        batch.chunks += 1;
        batch.retries += u64::from(report.retries);
        if chunk_failed {
            batch.failed_chunks += 1;
        }

        let cumulative = &mut storage.cumulative;
        cumulative.records_processed += succeeded + failed + skipped;
        cumulative.succeeded += succeeded;
        cumulative.failed += failed;
        cumulative.skipped += skipped;
        cumulative.chunks += 1;
        cumulative.retries += u64::from(report.retries);
        if chunk_failed {
            cumulative.failed_chunks += 1;
        }

        let totals = cumulative.by_operation.entry(batch.operation).or_default();
        totals.records += succeeded + failed + skipped;
        totals.succeeded += succeeded;
        totals.failed += failed;
    }

    /// Record records skipped outside any chunk (deduplication, conflicts)
    pub fn record_skipped(&self, token: &BatchToken, count: usize) {
        if count == 0 {
            return;
        }
        let mut storage = self.storage.write();
        let storage = &mut *storage;

        let Some(batch) = storage.in_flight.get_mut(&token.id()) else {
            warn!(batch_id = %token.id(), "Skips recorded for unknown batch");
            return;
        };
        batch.skipped += count as u64;
        storage.cumulative.skipped += count as u64;
        storage.cumulative.records_processed += count as u64;
        storage
            .cumulative
            .by_operation
            .entry(batch.operation)
            .or_default()
            .records += count as u64;
    }

    /// Record records failed outside any chunk (unresolved import keys)
    pub fn record_failed(&self, token: &BatchToken, count: usize) {
        if count == 0 {
            return;
        }
        let mut storage = self.storage.write();
        let storage = &mut *storage;

        let Some(batch) = storage.in_flight.get_mut(&token.id()) else {
            warn!(batch_id = %token.id(), "Failures recorded for unknown batch");
            return;
        };
        batch.failed += count as u64;
        storage.cumulative.failed += count as u64;
        storage.cumulative.records_processed += count as u64;
        let totals = storage
            .cumulative
            .by_operation
            .entry(batch.operation)
            .or_default();
        totals.records += count as u64;
        totals.failed += count as u64;
    }

    /// Close a batch and return its summary
    pub fn finish_batch(&self, token: BatchToken) -> Option<BatchMetrics> {
        let mut storage = self.storage.write();

        let Some(batch) = storage.in_flight.remove(&token.id()) else {
            warn!(batch_id = %token.id(), "Finish requested for unknown batch");
            return None;
        };

        let elapsed_seconds = batch.started.elapsed().as_secs_f64();
        let records = batch.succeeded + batch.failed + batch.skipped;
        let throughput = if elapsed_seconds > 0.0 {
            records as f64 / elapsed_seconds
        } else {
            0.0
        };

        let metrics = BatchMetrics {
            batch_id: token.id(),
            operation: batch.operation,
            strategy: batch.strategy,
            started_at: batch.started_at,
            records,
            succeeded: batch.succeeded,
            failed: batch.failed,
            skipped: batch.skipped,
            chunks: batch.chunks,
            failed_chunks: batch.failed_chunks,
            retries: batch.retries,
            elapsed_seconds,
            throughput,
        };

        storage.cumulative.batches_finished += 1;
        storage.cumulative.total_elapsed_seconds += elapsed_seconds;
        storage
            .cumulative
            .by_operation
            .entry(batch.operation)
            .or_default()
            .batches += 1;
        storage.recent.push_bounded(metrics.clone(), MAX_RECENT_BATCHES);

        debug!(
            batch_id = %metrics.batch_id,
            records = metrics.records,
            succeeded = metrics.succeeded,
            failed = metrics.failed,
            elapsed_seconds = metrics.elapsed_seconds,
            "Batch finished"
        );

        Some(metrics)
    }

    /// Snapshot of the last batch and cumulative totals
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let storage = self.storage.read();
        MetricsSnapshot {
            last_batch: storage.recent.back().cloned(),
            recent_batches: storage.recent.iter().cloned().collect(),
            in_flight: storage.in_flight.len(),
            cumulative: storage.cumulative.clone(),
        }
    }

    /// Snapshot as JSON for export to external sinks
    pub fn export(&self) -> serde_json::Value {
        serde_json::to_value(self.get_metrics()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize metrics snapshot");
            serde_json::Value::Null
        })
    }

    /// Drop all finished history and totals; in-flight batches are kept
    pub fn reset(&self) {
        let mut storage = self.storage.write();
        storage.recent.clear();
        storage.cumulative = Default::default();
    }
}
