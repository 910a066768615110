//! AlienVault OTX URL list for the domain.

use super::http::{build_client, read_json, send_with_retry, RetryPolicy, DEFAULT_TIMEOUT};
use super::{RecordSender, Source};
use crate::error::SourceError;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_BASE: &str = "https://otx.alienvault.com";
const MAX_PAGES: u32 = 50;

#[derive(Debug, Deserialize)]
struct UrlListPage {
    #[serde(default)]
    url_list: Vec<UrlEntry>,
    #[serde(default)]
    has_next: bool,
}

#[derive(Debug, Deserialize)]
struct UrlEntry {
    url: String,
}

pub struct AlienVault {
    domain: String,
    key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl AlienVault {
    pub fn new(domain: &str, key: impl Into<String>) -> Self {
        Self {
            domain: domain.to_string(),
            key: key.into(),
            base_url: DEFAULT_BASE.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Source for AlienVault {
    fn name(&self) -> &'static str {
        "otx"
    }

    fn needs_key(&self) -> bool {
        true
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        out: &RecordSender,
    ) -> Result<(), SourceError> {
        let client = build_client(DEFAULT_TIMEOUT)?;
        let endpoint = format!(
            "{}/api/v1/indicators/domain/{}/url_list",
            self.base_url, self.domain
        );

        for page in 1..=MAX_PAGES {
            let page_str = page.to_string();
            let resp = send_with_retry(&self.retry, cancel, || {
                client
                    .get(&endpoint)
                    .query(&[("limit", "50"), ("page", page_str.as_str())])
                    .header("X-OTX-API-KEY", &self.key)
            })
            .await?;

            let data: UrlListPage = read_json(resp).await?;
            debug!(page, urls = data.url_list.len(), has_next = data.has_next, "otx page");
            if data.url_list.is_empty() {
                break;
            }
            for entry in data.url_list {
                out.emit(entry.url).await?;
            }
            if !data.has_next {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_follows_has_next() {
        let server = MockServer::start().await;
        let endpoint = "/api/v1/indicators/domain/example.com/url_list";
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", "1"))
            .and(header("X-OTX-API-KEY", "otx-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url_list": [{ "url": "http://example.com/1" }, { "url": "http://example.com/2" }],
                "has_next": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url_list": [{ "url": "http://example.com/3" }],
                "has_next": false
            })))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let out = RecordSender::new(tx, cancel.clone(), "otx");
        AlienVault::new("example.com", "otx-key")
            .with_base_url(server.uri())
            .run(&cancel, &out)
            .await
            .unwrap();
        drop(out);

        let mut urls = Vec::new();
        while let Some(r) = rx.recv().await {
            urls.push(r.url().to_string());
        }
        assert_eq!(
            urls,
            vec!["http://example.com/1", "http://example.com/2", "http://example.com/3"]
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let out = RecordSender::new(tx, cancel.clone(), "otx");
        let res = AlienVault::new("example.com", "k")
            .with_base_url(server.uri())
            .run(&cancel, &out)
            .await;
        assert!(matches!(res, Err(SourceError::Decode(_))));
    }
}
