//! Progress reporting and cooperative cancellation.
//!
//! [`ProgressCallback`] observes a running scan; it cannot halt it.
//! [`CancellationToken`] is the flag a [`DecodePipeline`](crate::DecodePipeline)
//! polls to learn that it has been asked to stop.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use flashscan::{PipelineController, ProgressCallback, ProgressInfo, RunConfig, ScanOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         eprintln!("{} frames, {} events", info.frames_processed, info.events);
//!     }
//! }
//!
//! let options = ScanOptions::new()
//!     .with_progress(Arc::new(PrintProgress))
//!     .with_batch_size(250);
//! let mut controller = PipelineController::start(
//!     "storm.mp4",
//!     Arc::new(RunConfig::default()),
//!     options,
//!     std::io::stdout(),
//! )?;
//! controller.run()?;
//! # Ok::<(), flashscan::FlashScanError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A snapshot of scan progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames sampled and evaluated so far.
    pub frames_processed: u64,
    /// Frames skipped because they could not be mapped.
    pub frames_skipped: u64,
    /// Lightning events emitted so far.
    pub events: u64,
    /// Timestamp of the most recent frame, if any.
    pub current_timestamp: Option<Duration>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
}

/// Receives progress updates while a scan runs.
///
/// Callbacks are invoked on the thread running
/// [`PipelineController::run`](crate::PipelineController::run).
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. Used when nothing is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation flag backed by an [`AtomicBool`].
///
/// Clones share the flag.
///
/// ```
/// use flashscan::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_view = token.clone();
/// token.cancel();
/// assert!(worker_view.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts dispatched frames and fires the callback every `batch_size`.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
    frames_processed: u64,
    frames_skipped: u64,
    events: u64,
    current_timestamp: Option<Duration>,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, batch_size: u64) -> Self {
        Self {
            callback,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
            frames_processed: 0,
            frames_skipped: 0,
            events: 0,
            current_timestamp: None,
        }
    }

    pub(crate) fn frame_processed(&mut self, timestamp: Duration, raised_event: bool) {
        self.frames_processed += 1;
        if raised_event {
            self.events += 1;
        }
        self.current_timestamp = Some(timestamp);
        self.tick();
    }

    pub(crate) fn frame_skipped(&mut self) {
        self.frames_skipped += 1;
        self.tick();
    }

    pub(crate) fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub(crate) fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    pub(crate) fn events(&self) -> u64 {
        self.events
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report();
        self.since_last_report = 0;
    }

    fn tick(&mut self) {
        self.since_last_report += 1;
        if self.since_last_report >= self.batch_size {
            self.report();
            self.since_last_report = 0;
        }
    }

    fn report(&self) {
        let info = ProgressInfo {
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            events: self.events,
            current_timestamp: self.current_timestamp,
            elapsed: self.start_time.elapsed(),
        };
        self.callback.on_progress(&info);
    }
}
