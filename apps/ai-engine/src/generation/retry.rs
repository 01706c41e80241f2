//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::GenerationConfig;
use crate::errors::GenerationError;

/// Delay before retry number `attempt + 1`: `base × 2^attempt`, saturating.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

/// Runs `operation` up to `max_retries + 1` times.
///
/// Non-retryable failures (`CONTENT_FILTERED`) are returned immediately. Otherwise the
/// operation is retried after `retry_delay × 2^attempt` until the budget is spent, and the
/// last error is returned.
pub async fn with_retry<T, F, Fut>(
    config: &GenerationConfig,
    mut operation: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                warn!(
                    "Attempt {} failed with non-retryable {}: not retrying",
                    attempt.saturating_add(1),
                    e.code
                );
                return Err(e);
            }
            Err(e) if attempt < config.max_retries => {
                let delay = backoff_delay(config.retry_delay, attempt);
                warn!(
                    "Attempt {}/{} failed ({}), retrying after {}ms...",
                    attempt.saturating_add(1),
                    config.max_retries.saturating_add(1),
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
