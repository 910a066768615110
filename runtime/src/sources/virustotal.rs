//! VirusTotal subdomain listing, following `links.next`.

use super::http::{build_client, read_json, send_with_retry, RetryPolicy, DEFAULT_TIMEOUT};
use super::{RecordSender, Source};
use crate::error::SourceError;
use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_BASE: &str = "https://www.virustotal.com";
const MAX_PAGES: u32 = 50;

#[derive(Debug, Deserialize)]
struct SubdomainPage {
    #[serde(default)]
    data: Vec<Subdomain>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct Subdomain {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

pub struct VirusTotal {
    domain: String,
    key: String,
    base_url: String,
    retry: RetryPolicy,
}

impl VirusTotal {
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
impl Source for VirusTotal {
    fn name(&self) -> &'static str {
        "virustotal"
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
        // The next link is an absolute URL carrying its own cursor.
        let mut next_url = format!(
            "{}/api/v3/domains/{}/subdomains?limit=40",
            self.base_url, self.domain
        );

        for page in 1..=MAX_PAGES {
            let resp = send_with_retry(&self.retry, cancel, || {
                client.get(&next_url).header("x-apikey", &self.key)
            })
            .await?;

            let data: SubdomainPage = read_json(resp).await?;
            debug!(page, subdomains = data.data.len(), "virustotal page");
            for sub in data.data {
                out.emit(sub.id).await?;
            }

            match data.links.next.filter(|n| !n.is_empty()) {
                Some(next) => next_url = next,
                None => break,
            }
        }
        Ok(())
    }
}
