//! Metrics data types

use crate::core::batch::{ExecutionStrategy, OperationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Instant;
use uuid::Uuid;

/// Handle for one in-flight batch, returned by `start_batch`
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct BatchToken {
    id: Uuid,
}

impl BatchToken {
    pub(super) fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Statistics for one finished batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetrics {
    pub batch_id: Uuid,
    pub operation: OperationKind,
    pub strategy: ExecutionStrategy,
    pub started_at: DateTime<Utc>,
    pub records: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub chunks: u64,
    pub failed_chunks: u64,
    pub retries: u64,
    pub elapsed_seconds: f64,
    /// Records per second
    pub throughput: f64,
}

/// Totals for one operation kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationTotals {
    pub batches: u64,
    pub records: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Totals across every batch seen by a collector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CumulativeMetrics {
    pub batches_started: u64,
    pub batches_finished: u64,
    pub records_processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub chunks: u64,
    pub failed_chunks: u64,
    pub retries: u64,
    pub total_elapsed_seconds: f64,
    pub by_operation: BTreeMap<OperationKind, OperationTotals>,
}

impl CumulativeMetrics {
    pub fn success_rate(&self) -> f64 {
        let attempted = self.succeeded + self.failed;
        if attempted == 0 {
            0.0
        } else {
            self.succeeded as f64 / attempted as f64
        }
    }
}

/// Point-in-time copy of a collector's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub last_batch: Option<BatchMetrics>,
    pub recent_batches: Vec<BatchMetrics>,
    pub in_flight: usize,
    pub cumulative: CumulativeMetrics,
}

/// Accumulator for a batch that has not finished yet
#[derive(Debug)]
pub(super) struct InFlightBatch {
    pub operation: OperationKind,
    pub strategy: ExecutionStrategy,
    pub started_at: DateTime<Utc>,
    pub started: Instant,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub chunks: u64,
    pub failed_chunks: u64,
    pub retries: u64,
}

impl InFlightBatch {
    pub fn new(operation: OperationKind, strategy: ExecutionStrategy) -> Self {
        Self {
            operation,
            strategy,
            started_at: Utc::now(),
            started: Instant::now(),
            succeeded: 0,
            failed: 0,
            skipped: 0,
            chunks: 0,
            failed_chunks: 0,
            retries: 0,
        }
    }
}

/// All collector state behind a single lock
#[derive(Debug, Default)]
pub(super) struct MetricsStorage {
    pub in_flight: HashMap<Uuid, InFlightBatch>,
    pub recent: VecDeque<BatchMetrics>,
    pub cumulative: CumulativeMetrics,
}
