// Retry logic with exponential backoff
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Backoff never grows past this multiple of the base delay.
const MAX_BACKOFF_MULTIPLE: u64 = 8;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_ms: 500,
        }
    }
}

impl RetryConfig {
    /// Delay after failed attempt `n` (1-based): `base * 2^(n-1)`, capped.
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let uncapped = self.backoff_base_ms.saturating_mul(1u64 << exponent);
        let cap = self.backoff_base_ms.saturating_mul(MAX_BACKOFF_MULTIPLE);
        Duration::from_millis(uncapped.min(cap))
    }
}

/// Run an operation with retry on transient failures.
///
/// Uses exponential backoff: each failed attempt waits progressively longer
/// before the next one. This is polite to APIs and rides out temporary
/// network trouble. Only errors the classifier considers retryable are
/// retried; rate limits and other client errors fail immediately.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, mut operation: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("request succeeded on attempt {}", attempt);
                }
                return Ok(result);
            }
            Err(err) if err.is_retryable() && attempt < config.max_attempts => {
                let delay = config.delay_after_attempt(attempt);
                warn!(
                    "request failed (attempt {}/{}): {}. retrying in {:?}",
                    attempt, config.max_attempts, err, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                warn!("giving up after {} attempt(s): {}", attempt, err);
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            backoff_base_ms: 1,
        }
    }

    fn server_error() -> ApiError {
        ApiError::UpstreamApi {
            status: 503,
            url: "https://api.github.com/search/repositories".into(),
            body: "upstream down".into(),
            headers: HashMap::new(),
        }
    }

    fn not_found() -> ApiError {
        ApiError::UpstreamApi {
            status: 404,
            url: "https://api.github.com/search/repositories".into(),
            body: "missing".into(),
            headers: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_without_retrying() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ApiError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(3), || async {
            let count = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if count < 3 {
                Err(server_error())
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<i32, _> = with_retry(&fast_config(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(server_error())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);

        let result: Result<i32, _> = with_retry(&fast_config(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(not_found())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_rate_limits() {
        let calls = AtomicU32::new(0);

        let result: Result<i32, _> = with_retry(&fast_config(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::RateLimitExceeded {
                reset_epoch_secs: 0,
                url: String::new(),
                body: "rate limit".into(),
                headers: HashMap::new(),
            })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RetryConfig {
            max_attempts: 10,
            backoff_base_ms: 100,
        };

        assert_eq!(config.delay_after_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_after_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_after_attempt(3), Duration::from_millis(400));
        assert_eq!(config.delay_after_attempt(4), Duration::from_millis(800));
        // capped at 8x the base from here on
        assert_eq!(config.delay_after_attempt(5), Duration::from_millis(800));
        assert_eq!(config.delay_after_attempt(9), Duration::from_millis(800));
    }
}
