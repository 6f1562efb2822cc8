//! Logging utilities
//!
//! The engine logs through `tracing`; this module installs a subscriber for
//! binaries, benches and tests that want to see those events.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the default log level
pub const LOG_LEVEL_ENV: &str = "BATCHOPS_LOG_LEVEL";

/// Environment variable selecting `text` or `json` output
pub const LOG_FORMAT_ENV: &str = "BATCHOPS_LOG_FORMAT";

/// Log levels accepted by [`init_logging`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

impl LogLevel {
    fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Invalid log format: {}", other)),
        }
    }
}

/// Read the log format from `BATCHOPS_LOG_FORMAT`, defaulting to text
pub fn log_format_from_env() -> LogFormat {
    env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

/// Read the log level from `BATCHOPS_LOG_LEVEL`, defaulting to `info`
pub fn log_level_from_env() -> LogLevel {
    env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(LogLevel::Info)
}

/// Install a global fmt subscriber in the format named by `BATCHOPS_LOG_FORMAT`
///
/// `RUST_LOG` directives win over `level` when present. Returns false when
/// a global subscriber was already installed.
pub fn init_logging(level: Option<LogLevel>) -> bool {
    init_logging_with(level, log_format_from_env())
}

/// Install a global fmt subscriber with an explicit output format
pub fn init_logging_with(level: Option<LogLevel>, format: LogFormat) -> bool {
    let level = level.unwrap_or_else(log_level_from_env);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);
    match format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
