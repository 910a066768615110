//! Shared HTTP plumbing for sources: client construction, retry and backoff.

use crate::error::SourceError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-request timeout for API sources.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The CDX endpoint is slow to start streaming on large domains.
pub const WAYBACK_TIMEOUT: Duration = Duration::from_secs(45);

/// Build the HTTP client a source uses for one run.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("urlsift/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Bounded retry with exponential backoff.
///
/// Transport errors and 5xx responses are retried up to `max_attempts`
/// times, sleeping `base_delay`, then twice that, and so on. A 429 gets a
/// single `rate_limit_backoff` pause and one more try. 401/403 and other
/// non-success statuses are returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub rate_limit_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            rate_limit_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `failures` (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << failures.saturating_sub(1).min(16))
    }
}

/// Send the request built by `make` under `policy`.
///
/// `make` is called once per attempt since a `RequestBuilder` is consumed by
/// sending it.
pub async fn send_with_retry<F>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    make: F,
) -> Result<Response, SourceError>
where
    F: Fn() -> RequestBuilder,
{
    let mut failures = 0u32;
    let mut rate_limited = false;

    loop {
        if cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            sent = make().send() => sent,
        };

        let transient = match sent {
            Ok(resp) if resp.status().is_success() => return Ok(resp),
            Ok(resp) => match resp.status() {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(SourceError::Unauthorized {
                        status: resp.status().as_u16(),
                    })
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    if rate_limited {
                        return Err(SourceError::RateLimited);
                    }
                    rate_limited = true;
                    debug!("rate limited, backing off {:?}", policy.rate_limit_backoff);
                    sleep_or_cancel(policy.rate_limit_backoff, cancel).await?;
                    continue;
                }
                status if status.is_server_error() => SourceError::Status(status.as_u16()),
                status => return Err(SourceError::Status(status.as_u16())),
            },
            Err(e) => SourceError::Transport(e),
        };

        failures += 1;
        if failures >= policy.max_attempts {
            return Err(SourceError::RetriesExhausted {
                attempts: failures,
                last: Box::new(transient),
            });
        }

        let delay = policy.delay_for(failures);
        debug!("attempt {failures} failed ({transient}), retrying in {delay:?}");
        sleep_or_cancel(delay, cancel).await?;
    }
}

/// Read a whole response body as JSON.
pub async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, SourceError> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Decode(e.to_string()))
}

/// Sleep for `duration`, returning early with `Cancelled` if the token fires.
pub async fn sleep_or_cancel(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), SourceError> {
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SourceError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
            rate_limit_backoff: Duration::from_millis(5),
        }
    }

    async fn send(server: &MockServer, policy: RetryPolicy) -> Result<Response, SourceError> {
        let client = build_client(Duration::from_secs(5)).unwrap();
        let url = format!("{}/data", server.uri());
        send_with_retry(&policy, &CancellationToken::new(), || client.get(&url)).await
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_transient_errors_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let resp = send(&server, fast()).await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let err = send(&server, fast()).await.unwrap_err();
        match err {
            SourceError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, SourceError::Status(500)));
            }
            other => panic!("unexpected error: {other}"),
        }
        server.verify().await;
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = send(&server, fast()).await.unwrap_err();
        assert!(matches!(err, SourceError::Unauthorized { status: 401 }));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_rate_limit_single_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let err = send(&server, fast()).await.unwrap_err();
        assert!(matches!(err, SourceError::RateLimited));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(send(&server, fast()).await.is_ok());
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = send(&server, fast()).await.unwrap_err();
        assert!(matches!(err, SourceError::Status(404)));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let url = format!("{}/data", server.uri());
        let err = send_with_retry(&fast(), &cancel, || client.get(&url))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Cancelled));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_sleep_interrupted_by_cancel() {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            child.cancel();
        });

        let started = std::time::Instant::now();
        let res = sleep_or_cancel(Duration::from_secs(30), &cancel).await;
        assert!(matches!(res, Err(SourceError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
