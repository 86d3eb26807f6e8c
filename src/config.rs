//! Run configuration.
//!
//! [`RunConfig`] holds the two values shared between argument parsing and
//! frame processing: the detection threshold and the verbosity flag. Both
//! are single atomic scalars, so a writer on any thread can change them and
//! the detector picks the new value up on the next frame.
//!
//! [`ScanOptions`] is a builder for everything else that is fixed once a run
//! has been constructed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use flashscan::{BaselinePolicy, OutputFormat, RunConfig, ScanOptions};
//!
//! let config = Arc::new(RunConfig::default());
//! config.set_threshold(42.5);
//! assert_eq!(config.threshold(), 42.5);
//!
//! let options = ScanOptions::new()
//!     .with_baseline(BaselinePolicy::FirstFrame)
//!     .with_output_format(OutputFormat::Json)
//!     .with_batch_size(100);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use crate::progress::{NoOpProgress, ProgressCallback};
use crate::report::OutputFormat;

/// Threshold and verbosity shared between configuration and processing.
///
/// The threshold is stored as the bit pattern of an `f64` inside an
/// [`AtomicU64`]; no validation is applied beyond what the caller does.
pub struct RunConfig {
    threshold_bits: AtomicU64,
    verbose: AtomicBool,
}

impl RunConfig {
    /// Threshold used when none is configured.
    pub const DEFAULT_THRESHOLD: f64 = 10.0;

    /// Create a configuration with the given threshold and verbosity.
    pub fn new(threshold: f64, verbose: bool) -> Self {
        Self {
            threshold_bits: AtomicU64::new(threshold.to_bits()),
            verbose: AtomicBool::new(verbose),
        }
    }

    /// Current threshold.
    pub fn threshold(&self) -> f64 {
        f64::from_bits(self.threshold_bits.load(Ordering::Acquire))
    }

    /// Replace the threshold. Visible to the detector from the next frame on.
    pub fn set_threshold(&self, threshold: f64) {
        self.threshold_bits
            .store(threshold.to_bits(), Ordering::Release);
    }

    /// Whether per-frame telemetry is emitted.
    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Acquire)
    }

    /// Toggle per-frame telemetry.
    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Release);
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD, false)
    }
}

impl Debug for RunConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RunConfig")
            .field("threshold", &self.threshold())
            .field("verbose", &self.is_verbose())
            .finish()
    }
}

/// Initial condition of the delta detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaselinePolicy {
    /// The first frame is compared against a zero sum, so its delta equals
    /// its own average intensity. This is the default.
    #[default]
    Zero,
    /// The first sampled frame only seeds the baseline; deltas are evaluated
    /// from the second sampled frame on.
    FirstFrame,
}

/// Construction-time behaviour of the decode sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkOptions {
    /// Deliver frames as fast as they are decoded instead of pacing them to
    /// their presentation timestamps.
    pub push_as_fast_as_possible: bool,
    /// Deliver every decoded frame to the controller. When `false` only
    /// lifecycle notifications are published.
    pub emit_per_frame_callback: bool,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            push_as_fast_as_possible: true,
            emit_per_frame_callback: true,
        }
    }
}

/// Options fixed for the lifetime of one run.
#[derive(Clone)]
pub struct ScanOptions {
    pub(crate) baseline: BaselinePolicy,
    pub(crate) output_format: OutputFormat,
    pub(crate) sink: SinkOptions,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Fire the progress callback every N dispatched frames.
    pub(crate) batch_size: u64,
}

impl Debug for ScanOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScanOptions")
            .field("baseline", &self.baseline)
            .field("output_format", &self.output_format)
            .field("sink", &self.sink)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanOptions {
    /// Defaults: zero baseline, text output, fast unsynchronised sink, no
    /// progress callback, batch size 1.
    pub fn new() -> Self {
        Self {
            baseline: BaselinePolicy::default(),
            output_format: OutputFormat::default(),
            sink: SinkOptions::default(),
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    #[must_use]
    pub fn with_baseline(mut self, baseline: BaselinePolicy) -> Self {
        self.baseline = baseline;
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_sink_options(mut self, sink: SinkOptions) -> Self {
        self.sink = sink;
        self
    }

    /// Attach a progress callback, invoked every
    /// [`batch_size`](ScanOptions::with_batch_size) dispatched frames.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn baseline(&self) -> BaselinePolicy {
        self.baseline
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    pub fn sink_options(&self) -> SinkOptions {
        self.sink
    }
}
