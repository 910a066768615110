//! HEAD-first liveness probe for canonical URLs.
//!
//! Checks that a URL answers with one of the accepted status codes without
//! downloading the body unless the server refuses HEAD.

use reqwest::{redirect, Client, Method, StatusCode};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use tracing::debug;

/// Redirect hops followed before the last response is taken as final.
pub const MAX_REDIRECTS: usize = 3;

/// Idle connections kept per host; probes for one origin arrive in bursts.
const MAX_IDLE_PER_HOST: usize = 30;

/// Result of probing one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    /// Whether the record may continue down the chain.
    pub passed: bool,
    /// Final HTTP status (0 if the gate is disabled or nothing answered).
    pub status: u16,
}

impl Probe {
    fn skipped() -> Self {
        Self {
            passed: true,
            status: 0,
        }
    }

    fn unreachable() -> Self {
        Self {
            passed: false,
            status: 0,
        }
    }
}

/// Status checker. Disabled when no accepted codes are configured.
#[derive(Debug, Clone)]
pub struct LivenessGate {
    client: Option<Client>,
    accept: HashSet<u16>,
}

impl LivenessGate {
    /// Build the gate. No HTTP client is created when `accept` is empty.
    pub fn new(accept: &BTreeSet<u16>, timeout: Duration) -> Result<Self, reqwest::Error> {
        if accept.is_empty() {
            return Ok(Self::disabled());
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::custom(|attempt| {
                if attempt.previous().len() > MAX_REDIRECTS {
                    attempt.stop()
                } else {
                    attempt.follow()
                }
            }))
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("urlsift/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client: Some(client),
            accept: accept.iter().copied().collect(),
        })
    }

    /// A gate that passes everything with status 0.
    pub fn disabled() -> Self {
        Self {
            client: None,
            accept: HashSet::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Probe `url`: HEAD first, GET when HEAD fails or answers 405.
    pub async fn check(&self, url: &str) -> Probe {
        let Some(client) = &self.client else {
            return Probe::skipped();
        };

        let status = match request_status(client, Method::HEAD, url).await {
            Some(code) if code != StatusCode::METHOD_NOT_ALLOWED => Some(code),
            _ => request_status(client, Method::GET, url).await,
        };

        let Some(status) = status else {
            debug!("probe failed for {url}");
            return Probe::unreachable();
        };

        let code = status.as_u16();
        Probe {
            passed: self.accept.contains(&code),
            status: code,
        }
    }
}

async fn request_status(client: &Client, method: Method, url: &str) -> Option<StatusCode> {
    match client.request(method.clone(), url).send().await {
        Ok(resp) => Some(resp.status()),
        Err(e) => {
            debug!("{method} {url}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn codes(list: &[u16]) -> BTreeSet<u16> {
        list.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_disabled_passes_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gate = LivenessGate::new(&BTreeSet::new(), Duration::from_secs(2)).unwrap();
        assert!(!gate.is_enabled());

        let probe = gate.check(&format!("{}/anything", server.uri())).await;
        assert_eq!(probe, Probe { passed: true, status: 0 });
        server.verify().await;
    }

    #[tokio::test]
    async fn test_head_success() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/live"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gate = LivenessGate::new(&codes(&[200]), Duration::from_secs(2)).unwrap();
        let probe = gate.check(&format!("{}/live", server.uri())).await;
        assert_eq!(probe, Probe { passed: true, status: 200 });
        server.verify().await;
    }

    #[tokio::test]
    async fn test_405_falls_back_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/nohead"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let gate = LivenessGate::new(&codes(&[200, 403]), Duration::from_secs(2)).unwrap();
        let probe = gate.check(&format!("{}/nohead", server.uri())).await;
        assert_eq!(probe, Probe { passed: true, status: 403 });
    }

    /// Plain TCP server that hangs up on HEAD and answers GET with 200.
    /// Returns its address and a counter of GETs served.
    async fn head_dropping_server() -> (std::net::SocketAddr, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let gets = Arc::new(AtomicUsize::new(0));
        let served = Arc::clone(&gets);

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let served = Arc::clone(&served);
                tokio::spawn(async move {
                    let mut request: Vec<u8> = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    if request.starts_with(b"HEAD") {
                        return;
                    }
                    served.fetch_add(1, Ordering::SeqCst);
                    let _ = stream
                        .write_all(
                            b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                        )
                        .await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        (addr, gets)
    }

    #[tokio::test]
    async fn test_head_connection_failure_falls_back_to_get() {
        let (addr, gets) = head_dropping_server().await;

        let gate = LivenessGate::new(&codes(&[200]), Duration::from_secs(2)).unwrap();
        let probe = gate.check(&format!("http://{addr}/page")).await;
        assert_eq!(probe, Probe { passed: true, status: 200 });
        assert_eq!(gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_status_outside_accept_set_fails_but_reports_code() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gate = LivenessGate::new(&codes(&[200]), Duration::from_secs(2)).unwrap();
        let probe = gate.check(&format!("{}/gone", server.uri())).await;
        assert_eq!(probe, Probe { passed: false, status: 404 });
    }

    #[tokio::test]
    async fn test_redirect_loop_uses_last_response() {
        let server = MockServer::start().await;
        let target = format!("{}/loop", server.uri());
        Mock::given(method("HEAD"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", target.as_str()))
            .mount(&server)
            .await;

        let gate = LivenessGate::new(&codes(&[302]), Duration::from_secs(2)).unwrap();
        let probe = gate.check(&target).await;
        assert_eq!(probe, Probe { passed: true, status: 302 });
    }

    #[tokio::test]
    async fn test_unreachable_host_fails_with_zero() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gate = LivenessGate::new(&codes(&[200]), Duration::from_secs(1)).unwrap();
        let probe = gate.check(&format!("http://{addr}/")).await;
        assert_eq!(probe, Probe { passed: false, status: 0 });
    }
}
