//! GitHub code search for files mentioning the domain.

use super::http::{
    build_client, read_json, send_with_retry, sleep_or_cancel, RetryPolicy, DEFAULT_TIMEOUT,
};
use super::{RecordSender, Source};
use crate::error::SourceError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_BASE: &str = "https://api.github.com";
const MAX_PAGES: u32 = 5;
const PER_PAGE: &str = "100";

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    html_url: String,
}

pub struct GitHub {
    domain: String,
    key: String,
    base_url: String,
    retry: RetryPolicy,
    page_pause: Duration,
}

impl GitHub {
    pub fn new(domain: &str, key: impl Into<String>) -> Self {
        Self {
            domain: domain.to_string(),
            key: key.into(),
            base_url: DEFAULT_BASE.to_string(),
            retry: RetryPolicy::default(),
            // Code search allows roughly 30 requests a minute.
            page_pause: Duration::from_secs(2),
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

    pub fn with_page_pause(mut self, pause: Duration) -> Self {
        self.page_pause = pause;
        self
    }
}

#[async_trait]
impl Source for GitHub {
    fn name(&self) -> &'static str {
        "github"
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
        let endpoint = format!("{}/search/code", self.base_url);
        let query = format!("\"{}\"", self.domain);

        for page in 1..=MAX_PAGES {
            let page_str = page.to_string();
            let resp = send_with_retry(&self.retry, cancel, || {
                client
                    .get(&endpoint)
                    .query(&[
                        ("q", query.as_str()),
                        ("per_page", PER_PAGE),
                        ("page", page_str.as_str()),
                    ])
                    .header("Authorization", format!("token {}", self.key))
                    .header("Accept", "application/vnd.github.v3+json")
            })
            .await?;

            let data: SearchPage = read_json(resp).await?;
            debug!(page, items = data.items.len(), "github page");
            if data.items.is_empty() {
                break;
            }
            for item in data.items {
                out.emit(item.html_url).await?;
            }

            if page < MAX_PAGES {
                sleep_or_cancel(self.page_pause, cancel).await?;
            }
        }
        Ok(())
    }
}
