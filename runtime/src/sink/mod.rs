//! Result sinks. The pipeline only sees the [`Sink`] trait.

pub mod writer;

pub use writer::{OutputOptions, OutputWriter};

use crate::error::SinkError;
use crate::types::ScanRecord;

/// Destination for records that survived every gate.
///
/// Called concurrently from pipeline workers; implementations serialize
/// internally.
pub trait Sink: Send + Sync {
    fn write(&self, record: &ScanRecord) -> Result<(), SinkError>;

    /// Flush everything buffered. Called once after the pipeline drains.
    fn close(&self) -> Result<(), SinkError>;
}
