//! Retry mechanism with configurable backoff

use super::types::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of a retried call together with the number of attempts it took
#[derive(Debug)]
pub struct RetryOutcome<R, E> {
    pub result: std::result::Result<R, E>,
    pub attempts: u32,
}

impl<R, E> RetryOutcome<R, E> {
    /// Retries used beyond the first attempt
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Retry mechanism with linear or exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute a function with retry logic, reporting every failed attempt
    ///
    /// `f` receives the 1-based attempt number. Errors for which
    /// `is_retryable` returns false end the loop immediately.
    pub async fn call_observed<F, Fut, R, E, P, O>(
        &self,
        mut f: F,
        is_retryable: P,
        mut on_failure: O,
    ) -> RetryOutcome<R, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
        O: FnMut(&E, u32),
    {
        let max_attempts = self.config.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match f(attempt).await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("Retry succeeded on attempt {}", attempt);
                    }
                    return RetryOutcome {
                        result: Ok(result),
                        attempts: attempt,
                    };
                }
                Err(error) => {
                    on_failure(&error, attempt);

                    if !is_retryable(&error) {
                        debug!("Attempt {} failed with non-retryable error: {}", attempt, error);
                        return RetryOutcome {
                            result: Err(error),
                            attempts: attempt,
                        };
                    }

                    if attempt >= max_attempts {
                        warn!("Retry failed after {} attempts: {}", attempt, error);
                        return RetryOutcome {
                            result: Err(error),
                            attempts: attempt,
                        };
                    }

                    let delay = self.jittered(self.config.delay_for_attempt(attempt));
                    debug!(
                        "Attempt {} failed: {}, retrying in {:?}",
                        attempt, error, delay
                    );

                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.config.jitter || delay.is_zero() {
            return delay;
        }
        let jitter_factor = 0.1;
        let jitter =
            delay.as_millis() as f64 * jitter_factor * (rand::random::<f64>() - 0.5);
        Duration::from_millis((delay.as_millis() as f64 + jitter).max(0.0) as u64)
    }
}
