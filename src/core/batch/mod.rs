//! Batch operation execution
//!
//! Applies bulk insert/update/delete/upsert/get/compute operations to large
//! record sets through selectable strategies, with bounded concurrency,
//! per-chunk retries and metrics.

mod chunk;
mod config;
mod executor;
mod operation;
mod operations;
mod sizing;
mod strategies;
mod types;


// Re-export all public types
pub use config::{
    BatchConfig, ErrorCallback, ErrorContext, PipelineHooks, PostProcessFn, PreProcessFn,
};
pub use executor::BatchExecutor;
pub use operation::ChunkOutput;
pub use operations::{BatchOperations, FetchResult, ImportOptions, ImportOutcome, ImportStats};
pub use sizing::{
    BatchSizeAdvisor, DEFAULT_SAMPLE_SIZE, DEFAULT_TARGET_CHUNK_BYTES, FALLBACK_RECORD_BYTES,
    estimate_record_size,
};
pub use types::{
    BatchResult, BatchSize, BatchSummary, ChunkReport, ChunkStatus, ExecutionStrategy,
    IndexedRecord, OperationKind, OperationRecord, RecordFailure, RecordOutcome, RecordSuccess,
    SkipReason, SkippedRecord, UniqueKey,
};
