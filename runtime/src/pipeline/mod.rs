//! Worker pool that drains the merged source stream through the gate chain.
//!
//! Per record: trim, delay, normalize, scope/dedup, liveness, classify,
//! notify, optional background scan, then the sink. The first gate that
//! rejects a record drops it.

pub mod stats;

pub use stats::{RunStats, StatsSnapshot};

use crate::config::RunConfig;
use crate::gates::{normalize, Classifier, LivenessGate, ScopeGate, Verdict};
use crate::notify::Notifier;
use crate::scan::SecondaryScanner;
use crate::sink::Sink;
use crate::types::{Category, ScanRecord};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

type SharedReceiver = Arc<Mutex<mpsc::Receiver<ScanRecord>>>;

/// Gate chain plus the collaborators records are handed to.
pub struct Pipeline {
    config: Arc<RunConfig>,
    scope: ScopeGate,
    liveness: LivenessGate,
    classifier: Classifier,
    sink: Arc<dyn Sink>,
    stats: Arc<RunStats>,
    notifier: Option<Arc<dyn Notifier>>,
    scanner: Option<Arc<dyn SecondaryScanner>>,
    scan_dir: Option<PathBuf>,
    tracker: TaskTracker,
}

impl Pipeline {
    /// Build the gates from `config`. Fails only if the probe client can't be built.
    pub fn new(config: Arc<RunConfig>, sink: Arc<dyn Sink>) -> Result<Self, reqwest::Error> {
        let liveness = LivenessGate::new(&config.accept_status, config.probe_timeout)?;
        Ok(Self {
            scope: ScopeGate::from_config(&config),
            liveness,
            classifier: Classifier::new(config.filters),
            config,
            sink,
            stats: Arc::new(RunStats::new()),
            notifier: None,
            scanner: None,
            scan_dir: None,
            tracker: TaskTracker::new(),
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run `scanner` in the background on every JS-classified record.
    pub fn with_scanner(
        mut self,
        scanner: Arc<dyn SecondaryScanner>,
        out_dir: Option<PathBuf>,
    ) -> Self {
        self.scanner = Some(scanner);
        self.scan_dir = out_dir;
        self
    }

    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    /// Spawn the workers. The handle resolves once every worker has stopped,
    /// every background scan has finished and the sink is closed.
    pub fn start(
        self: Arc<Self>,
        cancel: CancellationToken,
        rx: mpsc::Receiver<ScanRecord>,
    ) -> JoinHandle<()> {
        let rx: SharedReceiver = Arc::new(Mutex::new(rx));

        tokio::spawn(async move {
            let mut workers = JoinSet::new();
            for id in 0..self.config.workers.max(1) {
                let pipeline = Arc::clone(&self);
                let rx = Arc::clone(&rx);
                let cancel = cancel.clone();
                workers.spawn(async move { pipeline.worker(id, cancel, rx).await });
            }
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    warn!("pipeline worker aborted: {e}");
                }
            }

            self.tracker.close();
            self.tracker.wait().await;

            if let Err(e) = self.sink.close() {
                warn!("closing output: {e}");
            }
        })
    }

    async fn worker(&self, id: usize, cancel: CancellationToken, rx: SharedReceiver) {
        loop {
            // The lock is held only while waiting for the next record.
            let next = {
                let mut rx = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    rx = rx.lock() => rx,
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    next = rx.recv() => next,
                }
            };
            let Some(record) = next else { break };
            self.process(record, &cancel).await;
        }
        debug!(worker = id, "worker stopped");
    }

    async fn process(&self, mut record: ScanRecord, cancel: &CancellationToken) {
        let trimmed = record.url().trim();
        if trimmed.is_empty() {
            return;
        }
        let trimmed = trimmed.to_string();
        record.set_url(trimmed);

        if !self.config.delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.config.delay) => {}
            }
        }

        self.stats.inc_seen();

        let canonical = match normalize(record.url()) {
            Ok(url) => url,
            Err(e) => {
                debug!(source = record.source(), "dropping record: {e}");
                return;
            }
        };
        record.set_url(canonical);

        if self.scope.check(record.url()) == Verdict::Drop {
            return;
        }
        self.stats.inc_unique();

        if self.liveness.is_enabled() {
            let probe = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                probe = self.liveness.check(record.url()) => probe,
            };
            if !probe.passed {
                return;
            }
            record.set_status_code(probe.status);
        }
        self.stats.inc_live();

        let category = self.classifier.classify(record.url());
        record.set_category(category);

        // Nothing below awaits: a record past this check is notified,
        // scanned and written as one unit.
        if cancel.is_cancelled() {
            return;
        }

        if !category.is_none() {
            self.stats.inc_category(category);
            if let Some(notifier) = &self.notifier {
                notifier.notify(category);
            }
            if category == Category::Js {
                self.spawn_scan(record.url(), cancel);
            }
        }

        match self.sink.write(&record) {
            Ok(()) => self.stats.inc_delivered(),
            Err(e) => {
                warn!("writing {}: {e}", record.url());
                self.stats.inc_sink_failure();
            }
        }
    }

    fn spawn_scan(&self, url: &str, cancel: &CancellationToken) {
        let Some(scanner) = &self.scanner else {
            return;
        };
        let scanner = Arc::clone(scanner);
        let url = url.to_string();
        let dir = self.scan_dir.clone();
        let token = cancel.child_token();

        self.tracker.spawn(async move {
            if let Err(e) = scanner.scan(&token, &url, dir.as_deref()).await {
                warn!("secondary scan of {url} failed: {e:#}");
            }
        });
    }
}
