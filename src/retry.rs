use std::future::Future;
use std::time::Duration;

use rand::Rng as _;

/// What to do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Backoff policy for outbound requests.
///
/// Many sibling tasks tend to fail together when the CDN throttles, so every
/// delay carries a random jitter of up to one `base_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-indexed):
    /// `min(base * 2^retry, max) + jitter(0..base)`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let exp_ms = base_ms.saturating_mul(1u64.checked_shl(retry).unwrap_or(u64::MAX));
        let capped_ms = exp_ms.min(self.max_delay.as_millis() as u64);
        let jitter_ms = if base_ms > 0 {
            rand::thread_rng().gen_range(0..base_ms)
        } else {
            0
        };
        Duration::from_millis(capped_ms + jitter_ms)
    }
}

/// Run `operation` until it succeeds, the classifier aborts, or the retry
/// budget is spent. The last error is returned in the failure cases.
pub async fn retry_with_backoff<F, Fut, T, E, C>(
    config: &RetryConfig,
    classifier: C,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let total_attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => e,
        };
        attempt += 1;
        if attempt >= total_attempts || classifier(&err) == RetryAction::Abort {
            return Err(err);
        }
        let delay = config.delay_for_retry(attempt - 1);
        tracing::warn!(
            attempt,
            total_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retryable request failure"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn instant_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
        };
        let d = config.delay_for_retry(0).as_millis();
        assert!((100..200).contains(&d));
        let d = config.delay_for_retry(2).as_millis();
        assert!((400..500).contains(&d));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(2),
        };
        let d = config.delay_for_retry(10).as_millis();
        assert!((2000..2500).contains(&d));
    }

    #[test]
    fn test_none_has_no_delay() {
        let config = RetryConfig::none();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.delay_for_retry(3), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_abort_stops_after_first_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), String> = retry_with_backoff(
            &instant_config(3),
            |_| RetryAction::Abort,
            || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("404".to_string())
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "404");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<&str, String> = retry_with_backoff(
            &instant_config(3),
            |_| RetryAction::Retry,
            || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("503".to_string())
                    } else {
                        Ok("body")
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), "body");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhausted_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), String> = retry_with_backoff(
            &instant_config(2),
            |_| RetryAction::Retry,
            || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    Err(format!("attempt {n}"))
                }
            },
        )
        .await;
        assert_eq!(result.unwrap_err(), "attempt 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
