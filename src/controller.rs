//! Run lifecycle.
//!
//! [`PipelineController`] owns a [`DecodePipeline`] for exactly one run:
//!
//! ```text
//! Init ──run()──▶ Running ──EndOfStream──▶ EndedEos
//!                    └─────Error / fatal──▶ EndedError
//! ```
//!
//! Frames are sampled, evaluated, and reported synchronously on the thread
//! that called [`run`](PipelineController::run), one at a time in delivery
//! order. A finished controller cannot be restarted; build a new one.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Receiver;

use crate::config::{RunConfig, ScanOptions, SinkOptions};
use crate::decode::FfmpegPipeline;
use crate::detector::DeltaThresholdDetector;
use crate::error::FlashScanError;
use crate::frame::VideoSample;
use crate::pipeline::{DecodePipeline, PipelineBus, PipelineMessage};
use crate::progress::ProgressTracker;
use crate::report::EventReporter;
use crate::sampler::FrameSampler;
use crate::utilities::resolve_source;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed, not yet running.
    Init,
    /// Frames are being dispatched.
    Running,
    /// The source reached end-of-stream.
    EndedEos,
    /// The pipeline reported an error, or a fatal frame was delivered.
    EndedError,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::EndedEos | RunState::EndedError)
    }
}

/// Totals of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub state: RunState,
    /// Frames sampled and evaluated.
    pub frames: u64,
    /// Frames skipped because they could not be mapped.
    pub skipped: u64,
    /// Lightning events emitted.
    pub events: u64,
}

/// Drives one decode pipeline through a single run.
pub struct PipelineController<P: DecodePipeline, W: Write> {
    source: PathBuf,
    pipeline: P,
    bus: Option<PipelineBus>,
    receiver: Receiver<PipelineMessage>,
    state: RunState,
    stopped: bool,
    sampler: FrameSampler,
    detector: DeltaThresholdDetector,
    reporter: EventReporter<W>,
    progress: ProgressTracker,
}

impl<W: Write> PipelineController<FfmpegPipeline, W> {
    /// Resolve `source` and build an FFmpeg pipeline for it.
    ///
    /// # Errors
    ///
    /// - [`FlashScanError::InvalidInput`] if `source` does not resolve to an
    ///   existing file. No pipeline is built in that case.
    /// - [`FlashScanError::PipelineConstructionFailure`] if FFmpeg cannot
    ///   open or decode the file.
    pub fn start<S: AsRef<Path>>(
        source: S,
        config: Arc<RunConfig>,
        options: ScanOptions,
        out: W,
    ) -> Result<Self, FlashScanError> {
        Self::start_with(source, config, options, out, FfmpegPipeline::build)
    }
}

impl<P: DecodePipeline, W: Write> PipelineController<P, W> {
    /// Resolve `source` and build a pipeline for it with `build`.
    ///
    /// `build` is only called once `source` has been resolved to an absolute,
    /// existing path.
    ///
    /// # Errors
    ///
    /// [`FlashScanError::InvalidInput`] if resolution fails, otherwise
    /// whatever `build` returns.
    pub fn start_with<S, B>(
        source: S,
        config: Arc<RunConfig>,
        options: ScanOptions,
        out: W,
        build: B,
    ) -> Result<Self, FlashScanError>
    where
        S: AsRef<Path>,
        B: FnOnce(&Path, &SinkOptions) -> Result<P, FlashScanError>,
    {
        let source = resolve_source(source)?;
        let pipeline = build(&source, &options.sink)?;
        log::debug!("Built pipeline for {}", source.display());

        let (bus, receiver) = PipelineBus::channel();
        Ok(Self {
            source,
            pipeline,
            bus: Some(bus),
            receiver,
            state: RunState::Init,
            stopped: false,
            sampler: FrameSampler::new(),
            detector: DeltaThresholdDetector::new(Arc::clone(&config), options.baseline),
            reporter: EventReporter::new(out, config, options.output_format),
            progress: ProgressTracker::new(options.progress, options.batch_size),
        })
    }

    /// Absolute path of the source being scanned.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn describe(&self) -> String {
        self.pipeline.describe()
    }

    /// The writer events are reported to.
    pub fn output(&self) -> &W {
        self.reporter.output()
    }

    /// Start the pipeline and dispatch notifications until a terminal one
    /// arrives. Pipeline resources are released before returning.
    ///
    /// A source error ends the run normally with
    /// [`RunState::EndedError`] in the summary.
    ///
    /// # Errors
    ///
    /// - [`FlashScanError::InvalidState`] if the controller has already run
    ///   or been stopped.
    /// - [`FlashScanError::MissingTimestamp`] if a frame without a PTS was
    ///   delivered; the run is ended first.
    /// - Any error from [`DecodePipeline::start`].
    pub fn run(&mut self) -> Result<RunSummary, FlashScanError> {
        if self.state != RunState::Init || self.stopped {
            return Err(FlashScanError::InvalidState(format!(
                "run() called in state {:?}",
                self.state
            )));
        }
        let bus = self.bus.take().ok_or_else(|| {
            FlashScanError::InvalidState("pipeline bus already handed out".to_string())
        })?;

        self.state = RunState::Running;
        self.reporter.started();
        log::info!("Running pipeline for {}", self.source.display());

        if let Err(error) = self.pipeline.start(bus) {
            log::error!("Pipeline failed to start: {error}");
            self.state = RunState::EndedError;
            self.stop();
            return Err(error);
        }

        let fatal = self.dispatch_until_terminal();

        self.stop();
        self.reporter.stopped();
        self.progress.finish();

        match fatal {
            Some(error) => Err(error),
            None => Ok(self.summary()),
        }
    }

    /// Release pipeline resources. Only the first call has an effect.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.pipeline.stop();
        log::debug!("Pipeline stopped in state {:?}", self.state);
    }

    /// Totals so far.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            state: self.state,
            frames: self.progress.frames_processed(),
            skipped: self.progress.frames_skipped(),
            events: self.progress.events(),
        }
    }

    fn dispatch_until_terminal(&mut self) -> Option<FlashScanError> {
        loop {
            match self.receiver.recv() {
                Ok(PipelineMessage::Frame(sample)) => {
                    if let Err(error) = self.dispatch(sample.as_ref()) {
                        log::error!("Ending run: {error}");
                        self.state = RunState::EndedError;
                        return Some(error);
                    }
                }
                Ok(PipelineMessage::EndOfStream) => {
                    log::info!("End of stream reached");
                    self.reporter.end_of_stream();
                    self.state = RunState::EndedEos;
                    return None;
                }
                Ok(PipelineMessage::Error(message)) => {
                    log::error!("Pipeline error: {message}");
                    self.reporter.source_error(&message);
                    self.state = RunState::EndedError;
                    return None;
                }
                Err(_) => {
                    let message = "pipeline closed without end-of-stream";
                    log::error!("Pipeline error: {message}");
                    self.reporter.source_error(message);
                    self.state = RunState::EndedError;
                    return None;
                }
            }
        }
    }

    /// Sample, evaluate, and report one frame.
    ///
    /// Unmappable frames are skipped and leave the detector baseline as it
    /// was.
    fn dispatch(&mut self, sample: &dyn VideoSample) -> Result<(), FlashScanError> {
        let frame = match sample.map() {
            Ok(frame) => frame,
            Err(error) => {
                log::warn!("Skipping frame: {error}");
                self.progress.frame_skipped();
                return Ok(());
            }
        };

        let intensity = self.sampler.sample(&frame)?;
        let evaluation = self.detector.evaluate(&intensity);
        self.reporter.report(&evaluation);
        self.progress
            .frame_processed(intensity.pts, evaluation.event.is_some());
        Ok(())
    }
}

impl<P: DecodePipeline, W: Write> Drop for PipelineController<P, W> {
    fn drop(&mut self) {
        self.stop();
    }
}
