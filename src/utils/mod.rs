//! Utility modules for the batch engine
//!
//! - **error**: error types, retry and bulkhead primitives
//! - **logging**: tracing subscriber setup

pub mod error;
pub mod logging;

pub use error::{BatchError, RecordError, RecordErrorKind, Result};
pub use logging::{LogFormat, LogLevel, init_logging, init_logging_with};
