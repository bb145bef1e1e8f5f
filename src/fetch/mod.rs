//! Rate-limited HTTP access shared by every outbound request.
//!
//! Data Dragon and the wiki both start failing when hit with many parallel
//! requests, so all traffic (version checks, JSON payloads, images, scraped
//! pages) goes through a single [`RateLimiter`]. The limiter is a FIFO-fair
//! semaphore: callers beyond the limit queue in submission order and are
//! released as permits free up.

pub mod error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::retry::{self, RetryAction, RetryConfig};

pub use error::FetchError;

/// Default cap on simultaneously in-flight requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 10;

/// Bounded-concurrency gate for outbound requests.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl RateLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held by a request.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a slot. The request counts as in flight until the permit drops.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, FetchError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| FetchError::LimiterClosed)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }
}

/// Settings for [`Fetcher::new`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub max_concurrent_requests: usize,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

/// HTTP client whose every attempt holds a [`RateLimiter`] permit.
///
/// The permit covers one attempt (send plus body read) and is released
/// before the backoff sleep, so a retrying task never starves its siblings.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    limiter: RateLimiter,
    retry: RetryConfig,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self::with_client(
            client,
            RateLimiter::new(config.max_concurrent_requests),
            config.retry,
        ))
    }

    pub fn with_client(client: Client, limiter: RateLimiter, retry: RetryConfig) -> Self {
        Self {
            client,
            limiter,
            retry,
        }
    }

    #[cfg(test)]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// GET `url` and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.get_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// GET `url` with retries on transient failures.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        retry::retry_with_backoff(
            &self.retry,
            |e: &FetchError| {
                if e.is_retryable() {
                    RetryAction::Retry
                } else {
                    RetryAction::Abort
                }
            },
            || self.attempt(url),
        )
        .await
    }

    async fn attempt(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let _permit = self.limiter.acquire().await?;
        let in_flight = self.limiter.limit() - self.limiter.available();
        tracing::trace!(url, in_flight, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(body.to_vec())
    }
}

/// Raw byte download, the one capability the high-res resolver needs from
/// the network layer.
#[async_trait]
pub trait ByteSource: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[async_trait]
impl ByteSource for Fetcher {
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.get_bytes(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_limit_is_raised_to_one() {
        let limiter = RateLimiter::new(0);
        assert_eq!(limiter.limit(), 1);
        assert_eq!(limiter.available(), 1);
    }

    #[test]
    fn test_default_limit_is_ten() {
        assert_eq!(RateLimiter::default().limit(), 10);
    }

    #[tokio::test]
    async fn test_never_more_than_ten_in_flight() {
        let limiter = RateLimiter::new(10);
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);

        let (limiter_ref, in_flight_ref, peak_ref, completed_ref) =
            (&limiter, &in_flight, &peak, &completed);
        let requests = (0..25).map(move |_| async move {
            let _permit = limiter_ref.acquire().await.unwrap();
            let now = in_flight_ref.fetch_add(1, Ordering::SeqCst) + 1;
            peak_ref.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_flight_ref.fetch_sub(1, Ordering::SeqCst);
            completed_ref.fetch_add(1, Ordering::SeqCst);
        });
        futures_util::future::join_all(requests).await;

        assert_eq!(completed.load(Ordering::SeqCst), 25);
        assert!(peak.load(Ordering::SeqCst) <= 10);
        assert_eq!(peak.load(Ordering::SeqCst), 10);
        assert_eq!(limiter.available(), 10);
    }

    #[tokio::test]
    async fn test_waiters_are_released_in_submission_order() {
        let limiter = RateLimiter::new(1);
        let order = std::sync::Mutex::new(Vec::new());
        let held = limiter.acquire().await.unwrap();

        let (limiter_ref, order_ref) = (&limiter, &order);
        let waiters = (0..5).map(move |i| async move {
            let _permit = limiter_ref.acquire().await.unwrap();
            order_ref.lock().unwrap().push(i);
        });
        let all = futures_util::future::join_all(waiters);
        let release = async {
            tokio::task::yield_now().await;
            drop(held);
        };
        tokio::join!(all, release);

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_permit_is_released_after_failed_attempt() {
        let fetcher = Fetcher::with_client(
            Client::new(),
            RateLimiter::new(2),
            RetryConfig::none(),
        );
        let err = fetcher.get_bytes("http://127.0.0.1:1/versions.json").await;
        assert!(matches!(err, Err(FetchError::Http { .. })));
        assert_eq!(fetcher.limiter().available(), 2);
    }
}
