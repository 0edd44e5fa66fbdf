//! Bounded exponential backoff for transient failures.

use chirp_core::{PipelineError, PipelineResult};
use std::future::Future;
use std::time::Duration;

/// First retry delay; doubles per attempt.
const BASE_BACKOFF_MS: u64 = 500;

/// Cap on a single backoff delay so high attempt counts stay bounded.
const MAX_BACKOFF_MS: u64 = 8_000;

/// Computes the backoff delay before retry number `attempt` (0-indexed).
#[inline]
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let ms = BASE_BACKOFF_MS
        .saturating_mul(2_u64.saturating_pow(attempt))
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(ms)
}

/// Run `op` up to `max_attempts` times with exponential backoff in between.
///
/// Only [`PipelineError::Transient`] outcomes are retried; every other error
/// is returned immediately.
pub async fn with_backoff<T, F, Fut>(
    what: &str,
    max_attempts: u32,
    mut op: F,
) -> PipelineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < max_attempts => {
                let delay = backoff_delay(attempt);
                tracing::debug!(
                    error = %err,
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "{} failed, retrying",
                    what
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
