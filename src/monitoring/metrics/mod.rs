//! Batch metrics collection and aggregation
//!
//! A [`MetricsCollector`] tracks in-flight batches by token, keeps the most
//! recent finished batches, and aggregates cumulative totals.

mod bounded;
mod collector;
mod types;


pub use collector::MetricsCollector;
pub use types::{BatchMetrics, BatchToken, CumulativeMetrics, MetricsSnapshot, OperationTotals};
