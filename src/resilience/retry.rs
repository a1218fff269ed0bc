//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::classify::{classify, is_retryable};
use crate::error::{EngineError, ErrorCategory};

/// Largest backoff exponent; keeps the multiplier from overflowing.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Attempt budget and backoff base for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles on every retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Effective attempt budget.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt `attempt` (zero-based):
    /// `base_delay * 2^attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.min(MAX_BACKOFF_EXPONENT))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent.
///
/// BUSINESS and RESOURCE_LIMIT failures are never retried, even when an
/// adapter marked them retryable. The caller always receives either the
/// success value or the last underlying error.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0u32;

    loop {
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        attempt += 1;

        if !should_retry(&error) || attempt >= attempts {
            return Err(error);
        }

        let delay = policy.delay_for(attempt - 1);
        warn!(
            attempt,
            max_attempts = attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %error,
            "transient failure; retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

fn should_retry(error: &EngineError) -> bool {
    !matches!(
        classify(error),
        ErrorCategory::Business | ErrorCategory::ResourceLimit
    ) && is_retryable(error)
}
