//! Monitoring for the batch engine
//!
//! Batch and chunk statistics are aggregated by [`MetricsCollector`];
//! structured logs come from `tracing` throughout the crate.

pub mod metrics;

pub use metrics::{BatchMetrics, BatchToken, CumulativeMetrics, MetricsCollector, MetricsSnapshot};
