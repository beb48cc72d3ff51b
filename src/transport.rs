//! Retrying HTTP Transport
//!
//! One pooled `reqwest::Client` shared by every outbound call, wrapped in a
//! retry policy with exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{error, warn};

use crate::error::{ConfigError, TransportError};

/// Statuses retried by default.
pub const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Upper bound on a server-supplied `Retry-After` delay.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

// == Retry Policy ==
/// Which failures are retried, how often, and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub total_retries: u32,
    /// Base delay in seconds, doubled for every retry
    pub backoff_factor: f64,
    /// HTTP statuses treated as transient
    pub retry_statuses: Vec<u16>,
}

impl RetryPolicy {
    pub fn new(total_retries: u32, backoff_factor: f64) -> Self {
        Self {
            total_retries,
            backoff_factor,
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
        }
    }

    /// Whether `err` is worth another attempt.
    ///
    /// Connection failures and timeouts always are; HTTP statuses only when in
    /// the configured set. Decode failures never are.
    pub fn is_retryable(&self, err: &TransportError) -> bool {
        match err {
            TransportError::Status { status, .. } => self.retry_statuses.contains(status),
            TransportError::Connection(_) | TransportError::Timeout(_) => true,
            TransportError::Decode(_) => false,
        }
    }

    // == Backoff ==
    /// Delay before retry number `attempt` (0-based): `backoff_factor * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = self.backoff_factor * 2f64.powi(attempt.min(30) as i32);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    // == Execute ==
    /// Runs `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// `op` receives the 0-based attempt number. The last error is returned
    /// once `total_retries` retries have been spent.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, TransportError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.total_retries && self.is_retryable(&err) => {
                    let delay = match err.retry_after() {
                        Some(requested) => {
                            self.backoff(attempt).max(requested.min(MAX_RETRY_AFTER))
                        }
                        None => self.backoff(attempt),
                    };
                    warn!(
                        "Attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if self.is_retryable(&err) {
                        error!("Giving up after {} attempts: {}", attempt + 1, err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 0.3)
    }
}

// == Retrying Transport ==
/// HTTP client shared across all facades.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RetryingTransport {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingTransport {
    // == Constructor ==
    /// Builds the pooled client with a per-attempt `timeout`.
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        policy: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    // == Get JSON ==
    /// Issues a GET with `query` and decodes the JSON body as `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        self.policy
            .execute(|_| self.get_json_once(url, query))
            .await
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);

            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                retry_after,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::assert_err;

    fn status(code: u16) -> TransportError {
        TransportError::Status {
            status: code,
            url: "http://upstream/".to_string(),
            retry_after: None,
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, 0.3);

        assert_eq!(policy.backoff(0), Duration::from_secs_f64(0.3));
        assert_eq!(policy.backoff(1), Duration::from_secs_f64(0.6));
        assert_eq!(policy.backoff(2), Duration::from_secs_f64(1.2));
    }

    #[test]
    fn test_retryable_classification() {
        let policy = RetryPolicy::default();

        for code in DEFAULT_RETRY_STATUSES {
            assert!(policy.is_retryable(&status(code)));
        }
        assert!(!policy.is_retryable(&status(401)));
        assert!(!policy.is_retryable(&status(404)));
        assert!(!policy.is_retryable(&status(400)));
        assert!(policy.is_retryable(&TransportError::Connection("reset".into())));
        assert!(policy.is_retryable(&TransportError::Timeout("slow".into())));
        assert!(!policy.is_retryable(&TransportError::Decode("bad json".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_retries_on_503() {
        let policy = RetryPolicy::new(3, 0.3);
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(|_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(status(503)) }
            })
            .await;

        assert_eq!(result, Err(status(503)));
        // first attempt plus three retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_slept_between_attempts() {
        let policy = RetryPolicy::new(3, 0.3);
        let start = tokio::time::Instant::now();

        let result: Result<(), _> = policy.execute(|_| async { Err(status(500)) }).await;
        assert_err!(result);

        // 0.3 + 0.6 + 1.2
        assert!(tokio::time::Instant::now() - start >= Duration::from_secs_f64(2.1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_second_attempt() {
        let policy = RetryPolicy::new(2, 0.3);
        let attempts = AtomicU32::new(0);

        let result = policy
            .execute(|attempt| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(status(502))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_surfaces_immediately() {
        let policy = RetryPolicy::new(3, 0.3);
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(|_| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(status(404)) }
            })
            .await;

        assert_eq!(result, Err(status(404)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_extends_delay() {
        let policy = RetryPolicy::new(1, 0.1);
        let start = tokio::time::Instant::now();

        let result = policy
            .execute(|attempt| async move {
                if attempt == 0 {
                    Err(TransportError::Status {
                        status: 429,
                        url: "http://upstream/".to_string(),
                        retry_after: Some(Duration::from_secs(2)),
                    })
                } else {
                    Ok(())
                }
            })
            .await;

        assert_eq!(result, Ok(()));
        assert!(tokio::time::Instant::now() - start >= Duration::from_secs(2));
    }

    #[test]
    fn test_transport_builds() {
        let transport = RetryingTransport::new(
            Duration::from_secs(10),
            "WeatherAgent/1.0",
            RetryPolicy::default(),
        );
        assert!(transport.is_ok());
    }
}
