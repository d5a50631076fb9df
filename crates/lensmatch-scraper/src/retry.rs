//! Fixed-pause retry for the retail fetcher.
//!
//! Every failure inside a retail attempt (navigation error, selector
//! timeout, no eligible result) is transient from the fetcher's point of
//! view, so unlike an HTTP client retry there is no retriable/non-retriable
//! split here.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Runs `operation` up to `max_attempts` times, sleeping `pause` between
/// failed attempts. No pause follows the final attempt.
///
/// `max_attempts = 0` is treated as 1. Returns the last error once every
/// attempt has failed.
pub(crate) async fn retry_with_pause<T, F, Fut>(
    max_attempts: u32,
    pause: Duration,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => {
                tracing::warn!(attempt, max_attempts, error = %err, "final attempt failed");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    pause_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "attempt failed; retrying after pause"
                );
            }
        }

        tokio::time::sleep(pause).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn timeout() -> ScraperError {
        ScraperError::Timeout {
            stage: "wait_for_results",
            secs: 10,
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&calls);
        let result = retry_with_pause(3, Duration::ZERO, |_| {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ScraperError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds_on_third_attempt() {
        let result = retry_with_pause(3, Duration::ZERO, |attempt| async move {
            if attempt < 3 {
                Err(timeout())
            } else {
                Ok::<u32, ScraperError>(attempt)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn returns_last_error_after_exactly_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&calls);
        let result = retry_with_pause(3, Duration::ZERO, |_| {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(timeout())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(ScraperError::Timeout { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_attempts_only() {
        let started = tokio::time::Instant::now();
        let result = retry_with_pause(3, Duration::from_secs(2), |_| async {
            Err::<(), ScraperError>(timeout())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn success_skips_remaining_pauses() {
        let started = tokio::time::Instant::now();
        let result = retry_with_pause(3, Duration::from_secs(2), |attempt| async move {
            if attempt == 1 {
                Err(timeout())
            } else {
                Ok::<u32, ScraperError>(attempt)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&calls);
        let _ = retry_with_pause(0, Duration::ZERO, |_| {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<(), ScraperError>(timeout())
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
