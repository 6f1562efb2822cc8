//! Chunk size selection

use super::config::BatchConfig;
use super::types::BatchSize;
use serde::Serialize;

/// Serialized bytes a chunk should roughly occupy
pub const DEFAULT_TARGET_CHUNK_BYTES: usize = 1_048_576;
/// Records sampled to estimate the average record size
pub const DEFAULT_SAMPLE_SIZE: usize = 100;
/// Size assumed for a record that cannot be serialized
pub const FALLBACK_RECORD_BYTES: usize = 1024;

/// Serialized size of one record
pub fn estimate_record_size<T: Serialize>(record: &T) -> usize {
    serde_json::to_vec(record)
        .map(|bytes| bytes.len())
        .unwrap_or(FALLBACK_RECORD_BYTES)
}

/// Resolves the chunk size for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizeAdvisor {
    target_chunk_bytes: usize,
    sample_size: usize,
}

impl Default for BatchSizeAdvisor {
    fn default() -> Self {
        Self {
            target_chunk_bytes: DEFAULT_TARGET_CHUNK_BYTES,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl BatchSizeAdvisor {
    pub fn new(target_chunk_bytes: usize) -> Self {
        Self {
            target_chunk_bytes: target_chunk_bytes.max(1),
            ..Self::default()
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    pub fn target_chunk_bytes(&self) -> usize {
        self.target_chunk_bytes
    }

    /// An explicit `batch_size` wins unless `optimize_for_size` is set;
    /// otherwise the size is derived from sampled record sizes.
    pub fn resolve<T: Serialize>(&self, records: &[T], config: &BatchConfig) -> usize {
        match config.batch_size {
            Some(size) if !config.optimize_for_size => size.max(1),
            _ => self.size_aware(records),
        }
    }

    /// `target_chunk_bytes / avg_record_bytes`, clamped to `[Small, XLarge]`
    pub fn size_aware<T: Serialize>(&self, records: &[T]) -> usize {
        if records.is_empty() {
            return BatchSize::Medium.value();
        }

        let sample = &records[..records.len().min(self.sample_size)];
        let total: usize = sample.iter().map(estimate_record_size).sum();
        let average = total.div_ceil(sample.len()).max(1);

        (self.target_chunk_bytes / average).clamp(BatchSize::Small.value(), BatchSize::XLarge.value())
    }
}
