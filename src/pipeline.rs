//! The decode pipeline contract.
//!
//! A [`DecodePipeline`] produces grayscale frames and lifecycle
//! notifications. It publishes them on a [`PipelineBus`], an unbounded
//! single-consumer queue, so the controller receives exactly one
//! [`PipelineMessage`] at a time, in publication order, no matter how many
//! threads the pipeline uses internally.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::error::FlashScanError;
use crate::frame::VideoSample;

/// A notification from the pipeline to the controller.
pub enum PipelineMessage {
    /// A decoded frame is ready.
    Frame(Box<dyn VideoSample>),
    /// The source is exhausted.
    EndOfStream,
    /// Demuxing, decoding, or conversion failed.
    Error(String),
}

impl std::fmt::Debug for PipelineMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineMessage::Frame(sample) => f
                .debug_tuple("Frame")
                .field(&sample.pts())
                .finish(),
            PipelineMessage::EndOfStream => f.write_str("EndOfStream"),
            PipelineMessage::Error(message) => f.debug_tuple("Error").field(message).finish(),
        }
    }
}

/// Publishing side of the notification queue.
///
/// Every method returns `false` once the controller has gone away; the
/// pipeline should stop producing at that point.
#[derive(Debug, Clone)]
pub struct PipelineBus {
    sender: Sender<PipelineMessage>,
}

impl PipelineBus {
    pub(crate) fn channel() -> (Self, Receiver<PipelineMessage>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }

    /// Deliver a decoded frame.
    pub fn push_frame(&self, sample: Box<dyn VideoSample>) -> bool {
        self.post(PipelineMessage::Frame(sample))
    }

    /// Announce that no more frames will follow.
    pub fn end_of_stream(&self) -> bool {
        self.post(PipelineMessage::EndOfStream)
    }

    /// Announce a failure. The run ends after this message.
    pub fn error(&self, message: impl Into<String>) -> bool {
        self.post(PipelineMessage::Error(message.into()))
    }

    fn post(&self, message: PipelineMessage) -> bool {
        self.sender.send(message).is_ok()
    }
}

/// An external decode → grayscale conversion → sink pipeline.
pub trait DecodePipeline {
    /// Human-readable description of the pipeline graph.
    fn describe(&self) -> String;

    /// Begin producing notifications on `bus`.
    ///
    /// Must not block until the stream is exhausted; production happens in
    /// the background.
    ///
    /// # Errors
    ///
    /// Any error prevents the run from starting.
    fn start(&mut self, bus: PipelineBus) -> Result<(), FlashScanError>;

    /// Release all pipeline resources. Called exactly once per run.
    fn stop(&mut self);
}
