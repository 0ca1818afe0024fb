//! Retry with exponential back-off and jitter for upstream calls.
//!
//! Only [`SourceError::is_retriable`] errors are retried. A rate limit waits
//! for the provider's reset time instead of the back-off schedule.

use std::future::Future;
use std::time::Duration;

use sento_core::{AppConfig, SourceError};

use crate::shutdown::Shutdown;

const MAX_BACKOFF_MS: u64 = 60_000;
/// Twitter rate-limit windows are 15 minutes.
const MAX_RATE_LIMIT_WAIT_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
        }
    }

    /// No retries at all.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// Back-off schedule with `backoff_base_ms = 1_000`:
    ///
    /// | Attempt | Sleep before next attempt    |
    /// |---------|------------------------------|
    /// | 1       | 1 000 ms × 2⁰ ± 25 % jitter |
    /// | 2       | 1 000 ms × 2¹ ± 25 % jitter |
    /// | 3       | 1 000 ms × 2² ± 25 % jitter |
    ///
    /// Capped at 60 s. Rate limits use the provider's delay, capped at one
    /// 15-minute window.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, err: &SourceError) -> Duration {
        if let SourceError::RateLimited { retry_after_secs } = err {
            return Duration::from_secs((*retry_after_secs).min(MAX_RATE_LIMIT_WAIT_SECS));
        }
        let computed = self
            .backoff_base_ms
            .saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
        let capped = computed.min(MAX_BACKOFF_MS);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
        Duration::from_millis(delay_ms)
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// retriable errors.
///
/// Non-retriable errors are returned immediately. If `shutdown` fires while
/// waiting between attempts, the last error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    shutdown: &Shutdown,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = policy.delay_for(attempt, &err);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "upstream error, retrying after back-off"
                );
                if !shutdown.sleep(delay).await {
                    return Err(err);
                }
            }
        }
    }
}
