//! Wayback Machine CDX feed, streamed line by line.

use super::http::{build_client, send_with_retry, RetryPolicy, WAYBACK_TIMEOUT};
use super::{RecordSender, Source};
use crate::error::SourceError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_BASE: &str = "http://web.archive.org";

/// Longest CDX line kept; longer lines are dropped.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Archived URLs for every host under the domain.
pub struct Wayback {
    domain: String,
    base_url: String,
    retry: RetryPolicy,
}

impl Wayback {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
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
impl Source for Wayback {
    fn name(&self) -> &'static str {
        "wayback"
    }

    fn needs_key(&self) -> bool {
        false
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        out: &RecordSender,
    ) -> Result<(), SourceError> {
        let client = build_client(WAYBACK_TIMEOUT)?;
        let endpoint = format!("{}/cdx/search/cdx", self.base_url);
        let pattern = format!("*.{}/*", self.domain);

        let mut resp = send_with_retry(&self.retry, cancel, || {
            client.get(&endpoint).query(&[
                ("url", pattern.as_str()),
                ("output", "txt"),
                ("fl", "original"),
                ("collapse", "urlkey"),
            ])
        })
        .await?;

        let mut pending: Vec<u8> = Vec::new();
        // Set while discarding the rest of an overlong line.
        let mut overlong = false;
        let mut emitted = 0usize;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SourceError::Cancelled),
                chunk = resp.chunk() => chunk?,
            };
            let Some(chunk) = chunk else { break };
            pending.extend_from_slice(&chunk);

            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                if std::mem::take(&mut overlong) || line.len() > MAX_LINE_BYTES {
                    debug!("dropping CDX line over {MAX_LINE_BYTES} bytes");
                    continue;
                }
                if emit_line(out, &line).await? {
                    emitted += 1;
                }
            }
            if pending.len() > MAX_LINE_BYTES {
                pending.clear();
                overlong = true;
            }
        }
        if !overlong && emit_line(out, &pending).await? {
            emitted += 1;
        }

        debug!(emitted, "wayback stream finished");
        Ok(())
    }
}

/// Emit one CDX line if it holds anything. Returns whether it did.
async fn emit_line(out: &RecordSender, line: &[u8]) -> Result<bool, SourceError> {
    let text = String::from_utf8_lossy(line);
    let url = text.trim();
    if url.is_empty() {
        return Ok(false);
    }
    out.emit(url).await?;
    Ok(true)
}
