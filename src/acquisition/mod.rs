//! Landmark frame acquisition
//!
//! Abstracts where landmark frames come from: a JSONL replay file, live
//! JSONL on stdin, or the built-in synthetic subject. Sources handle
//! format parsing and pacing internally; the runtime calls
//! [`FrameSource::next_frame`] in a select! with cancellation.

use crate::types::LandmarkFrame;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

mod jsonl;
mod synthetic;

pub use jsonl::JsonlSource;
pub use synthetic::SyntheticSubject;

/// Frame acquisition errors
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Failed to open frame file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Frame stream read failed: {0}")]
    Read(#[from] std::io::Error),
}

/// Events produced by a frame source.
pub enum FrameEvent {
    /// A landmark frame was read.
    Frame(LandmarkFrame),
    /// Source reached end of data.
    Eof,
}

/// Trait abstracting where landmark frames come from.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Read the next frame from the source.
    ///
    /// Returns `FrameEvent::Eof` when no more data is available and `Err`
    /// on unrecoverable stream errors. Malformed individual frames are a
    /// source-internal concern (skipped with a warning), not an error.
    async fn next_frame(&mut self) -> Result<FrameEvent, AcquisitionError>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}
