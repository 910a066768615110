//! Run configuration: one immutable value resolved before the pipeline starts.

pub mod keys;
pub mod targets;

pub use keys::ApiKeys;

use crate::error::ConfigError;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Which classification rules are switched on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterFlags {
    /// Secret/config/backup/vcs/database/cloud/api/archive cascade, plus doc and sheet.
    pub sensitive: bool,
    pub params: bool,
    pub js: bool,
    /// Suppress well-known JS libraries when `js` is on.
    pub exclude_libs: bool,
    pub pdf: bool,
    pub log: bool,
    /// Config-file detection on its own, without the full sensitive cascade.
    pub config_files: bool,
}

/// Everything a single run needs to know. Never mutated after `build()`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Lower-cased target domain. `None` in file-only mode.
    pub domain: Option<String>,
    pub input_file: Option<PathBuf>,
    pub wildcard: bool,
    /// Enabled source names. Empty enables every source.
    pub sources: Vec<String>,
    pub workers: usize,
    pub delay: Duration,
    pub probe_timeout: Duration,
    pub no_dedup: bool,
    /// Status codes accepted by the liveness gate. Empty disables probing.
    pub accept_status: BTreeSet<u16>,
    pub filters: FilterFlags,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Whether the allow-list admits the named source.
    pub fn source_enabled(&self, name: &str) -> bool {
        self.sources.is_empty() || self.sources.iter().any(|s| s == name)
    }
}

/// Builder for [`RunConfig`]. Defaults match the CLI defaults.
#[derive(Debug, Clone)]
pub struct RunConfigBuilder {
    domain: Option<String>,
    input_file: Option<PathBuf>,
    wildcard: bool,
    sources: Vec<String>,
    workers: usize,
    delay: Duration,
    probe_timeout: Duration,
    no_dedup: bool,
    accept_status: BTreeSet<u16>,
    filters: FilterFlags,
}

impl Default for RunConfigBuilder {
    fn default() -> Self {
        Self {
            domain: None,
            input_file: None,
            wildcard: false,
            sources: Vec::new(),
            workers: 20,
            delay: Duration::ZERO,
            probe_timeout: Duration::from_secs(10),
            no_dedup: false,
            accept_status: BTreeSet::new(),
            filters: FilterFlags::default(),
        }
    }
}

impl RunConfigBuilder {
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        let trimmed = domain.trim();
        self.domain = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_file = Some(path.into());
        self
    }

    pub fn wildcard(mut self, wildcard: bool) -> Self {
        self.wildcard = wildcard;
        self
    }

    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn no_dedup(mut self, no_dedup: bool) -> Self {
        self.no_dedup = no_dedup;
        self
    }

    pub fn accept_status<I: IntoIterator<Item = u16>>(mut self, codes: I) -> Self {
        self.accept_status = codes.into_iter().collect();
        self
    }

    pub fn filters(mut self, filters: FilterFlags) -> Self {
        self.filters = filters;
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// A `*.` prefix on the domain turns on wildcard scope and is stripped.
    pub fn build(self) -> Result<RunConfig, ConfigError> {
        if self.domain.is_none() && self.input_file.is_none() {
            return Err(ConfigError::MissingTarget);
        }

        let mut wildcard = self.wildcard;
        let domain = self.domain.map(|d| {
            let lower = d.to_lowercase();
            match lower.strip_prefix("*.") {
                Some(rest) => {
                    wildcard = true;
                    rest.to_string()
                }
                None => lower,
            }
        });

        Ok(RunConfig {
            domain,
            input_file: self.input_file,
            wildcard,
            sources: self.sources,
            workers: self.workers.max(1),
            delay: self.delay,
            probe_timeout: self.probe_timeout,
            no_dedup: self.no_dedup,
            accept_status: self.accept_status,
            filters: self.filters,
        })
    }
}

/// Split a comma-separated flag value, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a comma-separated list of HTTP status codes such as `200,403`.
pub fn parse_status_codes(raw: &str) -> Result<BTreeSet<u16>, ConfigError> {
    parse_list(raw)
        .into_iter()
        .map(|code| match code.parse::<u16>() {
            Ok(c) if (100..=599).contains(&c) => Ok(c),
            _ => Err(ConfigError::InvalidStatusCode(code)),
        })
        .collect()
}
