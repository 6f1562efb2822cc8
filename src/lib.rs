//! # batchops
//!
//! Batch operation execution engine: applies bulk insert, update, delete,
//! upsert, get and compute operations to large record sets through
//! selectable execution strategies.
//!
//! ## Features
//!
//! - **Strategies**: single query, chunked, parallel, pipelined and optimistic
//! - **Bounded concurrency**: parallel chunks never exceed `max_workers`
//! - **Retries**: per-chunk retry with linear or exponential backoff
//! - **Partial failure**: failed records are reported, not raised
//! - **Metrics**: per-batch and cumulative statistics, exportable as JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batchops::{BatchConfig, BatchOperations, Entity, ExecutionStrategy, InMemoryStore};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct User {
//!     id: u64,
//!     email: String,
//! }
//!
//! impl Entity for User {
//!     type Id = u64;
//!
//!     fn id(&self) -> u64 {
//!         self.id
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> batchops::Result<()> {
//!     batchops::init_logging(None);
//!
//!     let store = Arc::new(InMemoryStore::<User>::new());
//!     let config = BatchConfig::new(ExecutionStrategy::Parallel).with_max_workers(4);
//!     let ops = BatchOperations::new(store, config);
//!
//!     let users = (0..1_000)
//!         .map(|id| User {
//!             id,
//!             email: format!("user{}@example.com", id),
//!         })
//!         .collect();
//!     let result = ops.batch_insert(users, None).await?;
//!
//!     println!(
//!         "{} inserted, {} failed",
//!         result.success_count(),
//!         result.failure_count()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Custom collaborators
//!
//! Any async closure taking one chunk and returning a [`ChunkOutput`] can be
//! run through [`BatchExecutor::execute`].

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod monitoring;
pub mod storage;
pub mod utils;

pub use config::Validate;
pub use core::batch::{
    BatchConfig, BatchExecutor, BatchOperations, BatchResult, BatchSize, BatchSizeAdvisor,
    BatchSummary, ChunkOutput, ChunkReport, ChunkStatus, ErrorContext, ExecutionStrategy,
    FetchResult, ImportOptions, ImportOutcome, ImportStats, IndexedRecord, OperationKind,
    OperationRecord, PipelineHooks, RecordFailure, RecordOutcome, RecordSuccess, SkipReason,
    SkippedRecord, UniqueKey,
};
pub use monitoring::{BatchMetrics, MetricsCollector, MetricsSnapshot};
pub use storage::{BatchRepository, BatchStore, Entity, InMemoryStore};
pub use utils::error::{Backoff, BatchError, RecordError, RecordErrorKind, Result};
pub use utils::logging::{LogFormat, LogLevel, init_logging, init_logging_with};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Crate description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
