//! # flashscan
//!
//! Scan a video stream for lightning events: frames whose global average
//! luma jumps by more than a configured threshold relative to the previous
//! frame.
//!
//! Decoding is handled by FFmpeg through the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate. Every decoded
//! frame is converted to 8-bit grayscale and pushed, one at a time, through
//! [`FrameSampler`] → [`DeltaThresholdDetector`] → [`EventReporter`] by a
//! [`PipelineController`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use flashscan::{PipelineController, RunConfig, ScanOptions};
//!
//! let config = Arc::new(RunConfig::new(25.0, false));
//! let mut controller = PipelineController::start(
//!     "storm.mp4",
//!     Arc::clone(&config),
//!     ScanOptions::new(),
//!     std::io::stdout(),
//! )?;
//! let summary = controller.run()?;
//! println!("{} lightning events", summary.events);
//! # Ok::<(), flashscan::FlashScanError>(())
//! ```
//!
//! ## Custom decode pipelines
//!
//! Anything implementing [`DecodePipeline`] can feed the controller. The
//! pipeline publishes frames and lifecycle notifications on a
//! [`PipelineBus`]; the controller consumes them serially on the thread that
//! called [`PipelineController::run`].
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod config;
pub mod controller;
pub mod decode;
pub mod detector;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod sampler;
mod utilities;

pub use config::{BaselinePolicy, RunConfig, ScanOptions, SinkOptions};
pub use controller::{PipelineController, RunState, RunSummary};
pub use decode::FfmpegPipeline;
pub use detector::{DeltaThresholdDetector, Evaluation, LightningEvent};
pub use error::FlashScanError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::{Frame, GrayFrame, VideoSample};
pub use pipeline::{DecodePipeline, PipelineBus, PipelineMessage};
pub use progress::{CancellationToken, ProgressCallback, ProgressInfo};
pub use report::{EventReporter, OutputFormat, format_timestamp};
pub use sampler::{FrameSampler, IntensitySample};
pub use utilities::resolve_source;
