//! Error handling for the batch engine
//!
//! This module defines all error types used throughout the engine.

mod helpers;
mod record;
mod types;

pub use record::{RecordError, RecordErrorKind};
pub use types::{BatchError, Result};
