//! Retry with exponential back-off and jitter for the search-API client.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 429, 5xx). Credential, decoding and
//! other 4xx errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::SearchAdError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 429 and 5xx responses.
///
/// **Not retriable:**
/// - Any other API status; retrying a bad signature or query won't fix it.
/// - [`SearchAdError::Deserialize`], [`SearchAdError::MissingCredentials`],
///   [`SearchAdError::NoResults`] and [`SearchAdError::InvalidBaseUrl`].
pub(crate) fn is_retriable(err: &SearchAdError) -> bool {
    match err {
        SearchAdError::Http(e) => e.is_timeout() || e.is_connect(),
        SearchAdError::Api { status, .. } => *status == 429 || *status >= 500,
        SearchAdError::Deserialize { .. }
        | SearchAdError::MissingCredentials(_)
        | SearchAdError::NoResults(_)
        | SearchAdError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The delay before attempt `n + 1` is `backoff_base_ms × 2ⁿ⁻¹ ± 25 %`,
/// capped at 30 s. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SearchAdError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SearchAdError>>,
{
    const MAX_DELAY_MS: u64 = 30_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "search API transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn api_error(status: u16) -> SearchAdError {
        SearchAdError::Api {
            api: "keywordstool",
            status,
            body: String::new(),
        }
    }

    #[test]
    fn server_errors_and_throttling_are_retriable() {
        assert!(is_retriable(&api_error(500)));
        assert!(is_retriable(&api_error(503)));
        assert!(is_retriable(&api_error(429)));
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!is_retriable(&api_error(401)));
        assert!(!is_retriable(&api_error(400)));
        assert!(!is_retriable(&SearchAdError::MissingCredentials("DataLab")));
        assert!(!is_retriable(&SearchAdError::NoResults("x".to_owned())));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(api_error(502))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<u32, _> = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(api_error(500))
            }
        })
        .await;
        assert!(matches!(result, Err(SearchAdError::Api { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_auth_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<u32, _> = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(api_error(403))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
