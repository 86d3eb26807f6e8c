//! Error types for the `flashscan` crate.
//!
//! [`FlashScanError`] is the single error type returned by every fallible
//! operation. Startup failures ([`InvalidInput`](FlashScanError::InvalidInput),
//! [`PipelineConstructionFailure`](FlashScanError::PipelineConstructionFailure))
//! abort before any frame is processed; runtime failures either recover per
//! frame ([`FrameUnavailable`](FlashScanError::FrameUnavailable)) or end the
//! run.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `flashscan` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlashScanError {
    /// The source location could not be resolved to an existing file.
    #[error("Invalid input {path}: {reason}")]
    InvalidInput {
        /// Location as it was given on the command line or to the API.
        path: PathBuf,
        /// Why resolution failed.
        reason: String,
    },

    /// The decode pipeline could not be built.
    #[error("Failed to construct decode pipeline: {0}")]
    PipelineConstructionFailure(String),

    /// A decoded frame could not be mapped for reading.
    ///
    /// Recovered locally: the frame is skipped and the run continues.
    #[error("Frame unavailable: {0}")]
    FrameUnavailable(String),

    /// The decode pipeline reported an asynchronous failure.
    #[error("Source error: {0}")]
    SourceError(String),

    /// A delivered frame carries no presentation timestamp.
    #[error("No PTS timestamp known for delivered frame")]
    MissingTimestamp,

    /// A lifecycle operation was called in the wrong state.
    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),

    /// An I/O error occurred while writing output.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl From<FfmpegError> for FlashScanError {
    fn from(error: FfmpegError) -> Self {
        FlashScanError::SourceError(error.to_string())
    }
}

impl FlashScanError {
    /// Returns `true` for errors raised before any frame is processed.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            FlashScanError::InvalidInput { .. } | FlashScanError::PipelineConstructionFailure(_)
        )
    }
}
