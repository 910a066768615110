//! Error types for the library layer. The CLI wraps these in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// A raw URL that could not be turned into a canonical one.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid url {input:?}: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
}

/// Why a source stopped producing.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("authentication rejected (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("rate limited after backoff")]
    RateLimited,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<SourceError>,
    },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("output stream closed")]
    Closed,
}

impl SourceError {
    /// Cancellation and a closed stream are normal shutdown paths, not failures.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, SourceError::Cancelled | SourceError::Closed)
    }
}

/// Failures writing results out.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("creating {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sink lock poisoned")]
    Poisoned,
}

/// Invalid run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a target domain or an input file is required")]
    MissingTarget,

    #[error("invalid status code {0:?}")]
    InvalidStatusCode(String),

    #[error("target list {path}: {reason}")]
    TargetList { path: PathBuf, reason: String },

    #[error("key store {path}: {source}")]
    KeyStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key store {path} is not valid JSON: {source}")]
    KeyStoreFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine home directory")]
    NoHomeDir,
}
