//! urlsift: streaming passive URL reconnaissance.
//!
//! Sources (archives, threat-intel APIs, code search, input files) feed a
//! single bounded stream. A pool of workers drains it through normalization,
//! scope and dedup, an optional liveness probe and pattern classification,
//! and delivers survivors to the output writer.

pub mod cli;
pub mod config;
pub mod error;
pub mod gates;
pub mod notify;
pub mod pipeline;
pub mod scan;
pub mod sink;
pub mod sources;
pub mod types;

pub use config::{ApiKeys, FilterFlags, RunConfig};
pub use error::{ConfigError, NormalizeError, SinkError, SourceError};
pub use pipeline::{Pipeline, RunStats, StatsSnapshot};
pub use sink::{OutputWriter, Sink};
pub use sources::{Source, SourceManager};
pub use types::{Category, ScanRecord};
