//! Error handling utilities
//!
//! This module provides the engine's error types and the resilience
//! primitives (retry, bulkhead) used around collaborator calls.

pub mod error;
pub mod recovery;

// Re-export commonly used types
pub use error::*;
pub use recovery::*;
