//! Error recovery and resilience utilities
//!
//! This module provides retry with backoff and a semaphore bulkhead.

mod resilience;
mod retry;
mod types;

pub use resilience::Bulkhead;
pub use retry::{RetryOutcome, RetryPolicy};
pub use types::{Backoff, RetryConfig};
