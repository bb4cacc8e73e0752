//! Bounded retry for repository calls.

use std::future::Future;
use std::time::Duration;

use cinesync_core::error::DomainError;
use tracing::warn;

/// Exponential backoff settings for transient repository failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based), doubling from the
    /// initial backoff and clamped to `[initial_backoff, max_backoff]`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let pow = attempt.min(16);
        let ms = self.initial_backoff.as_millis().saturating_mul(1u128 << pow);
        let delay = Duration::from_millis(u64::try_from(ms).unwrap_or(u64::MAX));
        delay.min(self.max_backoff).max(self.initial_backoff)
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or the
    /// attempts are exhausted.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `op`.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "transient repository failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
