//! Common test utilities for batchops
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::common::{FaultyUserStore, UserFactory};
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let store = FaultyUserStore::new();
//!     let users = UserFactory::many(10);
//!     // ...
//! }
//! ```

pub mod fixtures;
pub mod store;

pub use fixtures::{User, UserFactory};
pub use store::FaultyUserStore;

use batchops::{BatchConfig, ExecutionStrategy};
use std::time::Duration;

/// Config with a fixed chunk size, no retries and no retry delay
pub fn fast_config(strategy: ExecutionStrategy, batch_size: usize) -> BatchConfig {
    BatchConfig::new(strategy)
        .with_batch_size(batch_size)
        .with_retry_count(0)
        .with_retry_delay(Duration::ZERO)
}
