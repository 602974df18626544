// --- File: crates/meetsync_common/src/retry.rs ---
//! Bounded retry with exponential backoff for collaborator calls.
//!
//! Every attempt runs under its own timeout. The wait before attempt `n + 1`
//! is `base_delay * factor^(n - 1)`. Non-retryable errors stop immediately.

use meetsync_config::models::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Errors that can tell the retry loop whether another attempt is worthwhile.
pub trait Retryable: Sized {
    fn is_retryable(&self) -> bool;

    /// The error reported when one attempt exceeds its timeout.
    fn timed_out(after: Duration) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: u32,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            factor: config.factor.max(1),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(self.factor.saturating_pow(exponent))
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(self.attempt_timeout)),
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                error!(operation, attempt, error = %err, "Operation failed with non-retryable error");
                return Err(err);
            }
            if attempt >= self.max_attempts {
                error!(operation, attempt, error = %err, "Operation failed, retry budget exhausted");
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            warn!(operation, attempt, ?delay, error = %err, "Operation failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
