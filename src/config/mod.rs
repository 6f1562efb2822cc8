//! Configuration loading for the batch engine
//!
//! [`BatchConfig`] can be built in code, read from a JSON file, or read from
//! `BATCHOPS_*` environment variables on top of the defaults.

pub mod validation;

pub use crate::core::batch::BatchConfig;
pub use validation::Validate;

use crate::core::batch::ExecutionStrategy;
use crate::utils::error::{BatchError, Result};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_STRATEGY: &str = "BATCHOPS_STRATEGY";
pub const ENV_BATCH_SIZE: &str = "BATCHOPS_BATCH_SIZE";
pub const ENV_MAX_WORKERS: &str = "BATCHOPS_MAX_WORKERS";
pub const ENV_RETRY_COUNT: &str = "BATCHOPS_RETRY_COUNT";
pub const ENV_RETRY_DELAY_SECS: &str = "BATCHOPS_RETRY_DELAY_SECS";
pub const ENV_TIMEOUT_SECS: &str = "BATCHOPS_TIMEOUT_SECS";
pub const ENV_COLLECT_METRICS: &str = "BATCHOPS_COLLECT_METRICS";
pub const ENV_OPTIMIZE_FOR_SIZE: &str = "BATCHOPS_OPTIMIZE_FOR_SIZE";

fn env_value<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| BatchError::config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

fn env_flag(key: &str) -> Result<Option<bool>> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            other => Err(BatchError::config(format!("Invalid {}: {}", key, other))),
        },
        Err(_) => Ok(None),
    }
}

fn secs(key: &str, value: f64) -> Result<Duration> {
    if value.is_finite() && value >= 0.0 {
        Ok(Duration::from_secs_f64(value))
    } else {
        Err(BatchError::config(format!(
            "Invalid {}: must be a non-negative number of seconds",
            key
        )))
    }
}

impl BatchConfig {
    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        debug!("Loading batch configuration from environment variables");
        let mut config = Self::default();

        if let Some(strategy) = env_value::<ExecutionStrategy>(ENV_STRATEGY)? {
            config.execution_strategy = strategy;
        }
        if let Some(size) = env_value::<usize>(ENV_BATCH_SIZE)? {
            config.batch_size = Some(size);
        }
        if let Some(workers) = env_value::<usize>(ENV_MAX_WORKERS)? {
            config.max_workers = workers;
        }
        if let Some(retries) = env_value::<u32>(ENV_RETRY_COUNT)? {
            config.retry_count = retries;
        }
        if let Some(delay) = env_value::<f64>(ENV_RETRY_DELAY_SECS)? {
            config.retry_delay = secs(ENV_RETRY_DELAY_SECS, delay)?;
        }
        if let Some(timeout) = env_value::<f64>(ENV_TIMEOUT_SECS)? {
            config.timeout = Some(secs(ENV_TIMEOUT_SECS, timeout)?);
        }
        if let Some(collect) = env_flag(ENV_COLLECT_METRICS)? {
            config.collect_metrics = collect;
        }
        if let Some(optimize) = env_flag(ENV_OPTIMIZE_FOR_SIZE)? {
            config.optimize_for_size = optimize;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file; absent fields keep their defaults
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading batch configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BatchError::config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_json(&content)?;
        debug!("Batch configuration loaded successfully");
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| BatchError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}
