//! Configuration validation

use crate::core::batch::BatchConfig;
use crate::utils::error::{Backoff, BatchError, Result, RetryConfig};
use tracing::debug;

/// Configuration validation trait
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for BatchConfig {
    fn validate(&self) -> Result<()> {
        debug!("Validating batch configuration");

        if self.batch_size == Some(0) {
            return Err(BatchError::config("batch_size must be greater than 0"));
        }
        if self.max_workers == 0 {
            return Err(BatchError::config("max_workers must be greater than 0"));
        }

        self.retry_config().validate()
    }
}

impl Validate for RetryConfig {
    fn validate(&self) -> Result<()> {
        if let Backoff::Exponential { multiplier, .. } = self.backoff {
            if !multiplier.is_finite() || multiplier < 1.0 {
                return Err(BatchError::config(
                    "exponential backoff multiplier must be at least 1.0",
                ));
            }
        }
        Ok(())
    }
}
