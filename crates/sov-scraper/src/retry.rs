//! Retry utilities for plain HTTP fetches.
//!
//! Provides exponential backoff retry logic for transient failures such as
//! connection resets, 429 and 5xx responses. Everything else (403 blocks,
//! 404s, short pages) is propagated immediately so the extraction chain can
//! move on to its next stage.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::ScraperError;

/// Upper bound for the random jitter added to each backoff delay.
const MAX_JITTER_MS: u64 = 100;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ScraperError::Http`]: network-level failure (connection reset, etc.).
/// - [`ScraperError::UnexpectedStatus`] with 429 or any 5xx status.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a retriable error the function sleeps for
/// `backoff_base_ms * 2^attempt` milliseconds plus a small random jitter and
/// tries again, up to `max_retries` additional attempts after the first try.
/// If all retries are exhausted the last error is returned.
///
/// Non-retriable errors are returned immediately without sleeping.
///
/// With `max_retries = 2` the operation is attempted at most 3 times total.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;

    loop {
        let last_err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                err
            }
        };

        let base_ms = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
        let jitter_ms = if backoff_base_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=MAX_JITTER_MS)
        };
        let delay_ms = base_ms.saturating_add(jitter_ms);
        tracing::debug!(
            attempt,
            max_retries,
            delay_ms,
            error = %last_err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        attempt += 1;
    }
}
