//! External URL feeds.
//!
//! Each [`Source`] owns its own paging and cursor logic and pushes raw
//! discoveries through a [`RecordSender`]. The [`manager::SourceManager`]
//! decides which sources run and merges their output into one stream.

pub mod file;
pub mod github;
pub mod http;
pub mod manager;
pub mod otx;
pub mod urlscan;
pub mod virustotal;
pub mod wayback;

pub use http::RetryPolicy;
pub use manager::SourceManager;

use crate::config::{ApiKeys, RunConfig};
use crate::error::SourceError;
use crate::types::ScanRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A feed of discovered URLs.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable name used in records, the allow-list and key lookup.
    fn name(&self) -> &'static str;

    /// Whether the source is skipped when no API key is configured.
    fn needs_key(&self) -> bool;

    /// Produce records until exhausted, failed or cancelled.
    async fn run(&self, cancel: &CancellationToken, out: &RecordSender)
        -> Result<(), SourceError>;
}

/// Sending half of the merged stream, bound to one source.
#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: mpsc::Sender<ScanRecord>,
    cancel: CancellationToken,
    source: &'static str,
}

impl RecordSender {
    pub fn new(
        tx: mpsc::Sender<ScanRecord>,
        cancel: CancellationToken,
        source: &'static str,
    ) -> Self {
        Self { tx, cancel, source }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Push one discovered URL.
    ///
    /// Waits for channel capacity, but gives up as soon as the run is
    /// cancelled.
    pub async fn emit(&self, url: impl Into<String>) -> Result<(), SourceError> {
        if self.cancel.is_cancelled() {
            return Err(SourceError::Cancelled);
        }
        let record = ScanRecord::discovered(url, self.source);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SourceError::Cancelled),
            sent = self.tx.send(record) => sent.map_err(|_| SourceError::Closed),
        }
    }
}

/// Every built-in source applicable to this run, keys wired in.
///
/// Domain sources are only built when a domain is set; the file source only
/// when an input file is set.
pub fn builtin_sources(config: &RunConfig, keys: &ApiKeys) -> Vec<Arc<dyn Source>> {
    let mut sources: Vec<Arc<dyn Source>> = Vec::new();

    if let Some(domain) = config.domain.as_deref() {
        let key = |name: &str| keys.get(name).unwrap_or_default().to_string();
        sources.push(Arc::new(wayback::Wayback::new(domain)));
        sources.push(Arc::new(github::GitHub::new(domain, key("github"))));
        sources.push(Arc::new(otx::AlienVault::new(domain, key("otx"))));
        sources.push(Arc::new(urlscan::UrlScan::new(domain, key("urlscan"))));
        sources.push(Arc::new(virustotal::VirusTotal::new(domain, key("virustotal"))));
    }

    if let Some(path) = config.input_file.as_deref() {
        sources.push(Arc::new(file::FileSource::new(path)));
    }

    sources
}
