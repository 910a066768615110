//! urlscan.io search results, paged with `search_after`.

use super::http::{build_client, read_json, send_with_retry, RetryPolicy, DEFAULT_TIMEOUT};
use super::{RecordSender, Source};
use crate::error::SourceError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_BASE: &str = "https://urlscan.io";
const MAX_PAGES: u32 = 10;

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchResult>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    page: ResultPage,
    #[serde(default)]
    sort: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ResultPage {
    #[serde(default)]
    url: Option<String>,
}

pub struct UrlScan {
    domain: String,
    key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl UrlScan {
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

/// Cursor value for the next page: the last hit's sort keys, comma-joined.
fn search_after(sort: &[Value]) -> Option<String> {
    if sort.is_empty() {
        return None;
    }
    let parts: Vec<String> = sort
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    Some(parts.join(","))
}

#[async_trait]
impl Source for UrlScan {
    fn name(&self) -> &'static str {
        "urlscan"
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
        let endpoint = format!("{}/api/v1/search/", self.base_url);
        let query = format!("domain:{}", self.domain);
        let mut cursor: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let resp = send_with_retry(&self.retry, cancel, || {
                let mut req = client
                    .get(&endpoint)
                    .query(&[("q", query.as_str()), ("size", "1000")])
                    .header("API-Key", &self.key);
                if let Some(after) = &cursor {
                    req = req.query(&[("search_after", after.as_str())]);
                }
                req
            })
            .await?;

            let data: SearchPage = read_json(resp).await?;
            debug!(page, results = data.results.len(), has_more = data.has_more, "urlscan page");

            let next = data.results.last().and_then(|r| search_after(&r.sort));
            for result in data.results {
                if let Some(url) = result.page.url.filter(|u| !u.is_empty()) {
                    out.emit(url).await?;
                }
            }

            match next {
                Some(after) if data.has_more => cursor = Some(after),
                _ => break,
            }
        }
        Ok(())
    }
}
