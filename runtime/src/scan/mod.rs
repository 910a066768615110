//! Secondary scanners run in the background on selected records.

pub mod js_secrets;

pub use js_secrets::ExternalJsScanner;

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Follow-up analysis for a URL, e.g. searching a JS file for secrets.
#[async_trait]
pub trait SecondaryScanner: Send + Sync {
    /// Whether the scanner's tooling is installed.
    fn is_available(&self) -> bool;

    /// Scan one URL, writing any report under `out_dir`.
    async fn scan(
        &self,
        cancel: &CancellationToken,
        url: &str,
        out_dir: Option<&Path>,
    ) -> anyhow::Result<()>;
}
