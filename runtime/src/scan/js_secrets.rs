//! JSSecretHunter integration: runs the external Python scanner on JS URLs.

use super::SecondaryScanner;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Reports are written here, under the run's output directory.
pub const REPORT_DIR: &str = "js_secrets";

/// Aggregated findings across all reports of a run.
pub const SUMMARY_FILE: &str = "SUMMARY.txt";

const EMPTY_MARKER: &str = "Total instances found: 0";

/// Runs `<python> <tool> -u URL [-o REPORT]` per JS URL.
pub struct ExternalJsScanner {
    tool: PathBuf,
    python: PathBuf,
    summary_lock: Mutex<()>,
}

impl ExternalJsScanner {
    pub fn new(tool: impl Into<PathBuf>, python: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            python: python.into(),
            summary_lock: Mutex::new(()),
        }
    }

    /// Locate the scanner under `~/tools/JSSecretHunter`, preferring its venv.
    pub fn discover() -> Option<Self> {
        let root = dirs::home_dir()?.join("tools").join("JSSecretHunter");
        let venv_python = root.join("venv").join("bin").join("python3");
        let python = if venv_python.exists() {
            venv_python
        } else {
            which::which("python3").ok()?
        };
        Some(Self::new(root.join("scanner_pro.py"), python))
    }

    pub fn tool(&self) -> &Path {
        &self.tool
    }

    async fn record_findings(&self, url: &str, report: &Path) -> Result<()> {
        let content = match tokio::fs::read_to_string(report).await {
            Ok(c) => c,
            // The tool writes nothing when it has nothing to say.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", report.display())),
        };

        if content.contains(EMPTY_MARKER) {
            debug!("no secrets in {url}, removing empty report");
            tokio::fs::remove_file(report)
                .await
                .with_context(|| format!("removing {}", report.display()))?;
            return Ok(());
        }

        let summary = report.with_file_name(SUMMARY_FILE);
        let entry = format!(
            "\n\n[{}] Found Secrets in {url}\n{content}\n",
            Utc::now().to_rfc3339()
        );

        let _guard = self.summary_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&summary)
            .await
            .with_context(|| format!("opening {}", summary.display()))?;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await?;
        info!("secrets found in {url}");
        Ok(())
    }
}

/// File-name-safe stem for a URL's report: its last path segment.
pub fn report_stem(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let last = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let stem: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "index".to_string()
    } else {
        stem
    }
}

#[async_trait]
impl SecondaryScanner for ExternalJsScanner {
    fn is_available(&self) -> bool {
        self.tool.is_file()
    }

    async fn scan(
        &self,
        cancel: &CancellationToken,
        url: &str,
        out_dir: Option<&Path>,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.python);
        cmd.arg(&self.tool).arg("-u").arg(url);

        let report = match out_dir {
            Some(dir) => {
                let reports = dir.join(REPORT_DIR);
                tokio::fs::create_dir_all(&reports)
                    .await
                    .with_context(|| format!("creating {}", reports.display()))?;
                let path = reports.join(format!("{}_secrets.txt", report_stem(url)));
                cmd.arg("-o").arg(&path);
                Some(path)
            }
            None => None,
        };

        // stdout carries results; keep the tool's chatter off it.
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("starting {}", self.python.display()))?;

        // On cancellation the child is dropped, and kill_on_drop reaps it.
        let status = tokio::select! {
            _ = cancel.cancelled() => bail!("scan of {url} cancelled"),
            status = child.wait() => status?,
        };
        if !status.success() {
            bail!("scanner exited with {status} for {url}");
        }

        if let Some(report) = report {
            self.record_findings(url, &report).await?;
        }
        Ok(())
    }
}
