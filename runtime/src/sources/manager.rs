//! Source manager: selects, starts and merges sources.
//!
//! Every enabled source runs as its own task and writes into one bounded
//! channel. The channel closes when the last source task returns.

use super::{RecordSender, Source};
use crate::config::{ApiKeys, RunConfig};
use crate::types::ScanRecord;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Capacity of the merged record stream.
pub const STREAM_CAPACITY: usize = 100;

/// Decrements the active-source count when a source task ends, however it ends.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            active: Arc::clone(active),
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns the registered sources for one run.
pub struct SourceManager {
    config: Arc<RunConfig>,
    keys: ApiKeys,
    sources: Vec<Arc<dyn Source>>,
    active: Arc<AtomicUsize>,
}

impl SourceManager {
    pub fn new(config: Arc<RunConfig>, keys: ApiKeys) -> Self {
        Self {
            config,
            keys,
            sources: Vec::new(),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.push(source);
    }

    /// Number of source tasks still running.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Shared handle to the live source count, for progress reporting.
    pub fn active_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active)
    }

    /// Why a registered source will not run, if it won't.
    fn skip_reason(&self, source: &dyn Source) -> Option<&'static str> {
        if !self.config.source_enabled(source.name()) {
            return Some("not in --sources");
        }
        if source.needs_key() && self.keys.get(source.name()).is_none() {
            return Some("missing API key");
        }
        None
    }

    /// Start every enabled source and return the merged stream.
    pub fn start_all(&self, cancel: &CancellationToken) -> mpsc::Receiver<ScanRecord> {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);

        for source in &self.sources {
            if let Some(reason) = self.skip_reason(source.as_ref()) {
                warn!(source = source.name(), "skipping source: {reason}");
                continue;
            }

            let guard = ActiveGuard::enter(&self.active);
            let source = Arc::clone(source);
            let token = cancel.child_token();
            let out = RecordSender::new(tx.clone(), token.clone(), source.name());

            tokio::spawn(async move {
                let name = source.name();
                info!(source = name, "source started");
                match source.run(&token, &out).await {
                    Ok(()) => info!(source = name, "source finished"),
                    Err(e) if e.is_shutdown() => debug!(source = name, "source stopped: {e}"),
                    Err(e) => warn!(source = name, "source failed: {e}"),
                }
                // Count down before the sender goes, so a closed stream
                // always reads zero active sources.
                drop(guard);
                drop(out);
            });
        }

        // Only the spawned tasks hold senders now; the stream ends with them.
        drop(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use async_trait::async_trait;

    struct Fixed {
        name: &'static str,
        needs_key: bool,
        urls: Vec<&'static str>,
    }

    #[async_trait]
    impl Source for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn needs_key(&self) -> bool {
            self.needs_key
        }

        async fn run(
            &self,
            _cancel: &CancellationToken,
            out: &RecordSender,
        ) -> Result<(), SourceError> {
            for url in &self.urls {
                out.emit(*url).await?;
            }
            Ok(())
        }
    }

    fn config(sources: &[&str]) -> Arc<RunConfig> {
        Arc::new(
            RunConfig::builder()
                .domain("example.com")
                .sources(sources.iter().copied())
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_merges_enabled_sources() {
        let mut manager = SourceManager::new(config(&[]), ApiKeys::default());
        manager.register(Arc::new(Fixed {
            name: "wayback",
            needs_key: false,
            urls: vec!["http://example.com/1", "http://example.com/2"],
        }));
        manager.register(Arc::new(Fixed {
            name: "file",
            needs_key: false,
            urls: vec!["http://example.com/3"],
        }));

        let mut rx = manager.start_all(&CancellationToken::new());
        let mut got = Vec::new();
        while let Some(r) = rx.recv().await {
            got.push(r.url().to_string());
        }
        got.sort();
        assert_eq!(
            got,
            vec!["http://example.com/1", "http://example.com/2", "http://example.com/3"]
        );
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_skips_disallowed_and_keyless() {
        let keys = ApiKeys {
            urlscan: Some("k".into()),
            ..Default::default()
        };
        let mut manager = SourceManager::new(config(&["wayback", "github", "urlscan"]), keys);
        for (name, needs_key) in [
            ("wayback", false),
            ("otx", true),
            ("github", true),
            ("urlscan", true),
        ] {
            manager.register(Arc::new(Fixed {
                name,
                needs_key,
                urls: vec!["http://example.com/"],
            }));
        }

        let mut rx = manager.start_all(&CancellationToken::new());
        let mut sources = Vec::new();
        while let Some(r) = rx.recv().await {
            sources.push(r.source().to_string());
        }
        sources.sort();
        assert_eq!(sources, vec!["urlscan", "wayback"]);
    }

    #[tokio::test]
    async fn test_no_sources_closes_immediately() {
        let manager = SourceManager::new(config(&[]), ApiKeys::default());
        let mut rx = manager.start_all(&CancellationToken::new());
        assert!(rx.recv().await.is_none());
    }
}
