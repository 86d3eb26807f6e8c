//! Shared helpers: a scripted decode pipeline and frame builders.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use flashscan::{
    DecodePipeline, FlashScanError, Frame, GrayFrame, PipelineBus, PipelineController, RunConfig,
    RunSummary, ScanOptions, VideoSample,
};
use serde_json::Value;

/// One notification published by [`ScriptedPipeline`].
#[derive(Clone)]
pub enum Step {
    Frame(GrayFrame),
    Unavailable(Duration),
    EndOfStream,
    Error(&'static str),
}

/// A frame whose pixels can never be mapped.
pub struct UnmappableFrame {
    pts: Duration,
}

impl VideoSample for UnmappableFrame {
    fn pts(&self) -> Option<Duration> {
        Some(self.pts)
    }

    fn map(&self) -> Result<Frame<'_>, FlashScanError> {
        Err(FlashScanError::FrameUnavailable("buffer could not be mapped".to_string()))
    }
}

/// Counters observed from outside the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineProbe {
    pub builds: Arc<AtomicUsize>,
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

impl PipelineProbe {
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Publishes a fixed list of notifications as soon as it is started.
pub struct ScriptedPipeline {
    steps: Vec<Step>,
    probe: PipelineProbe,
}

impl ScriptedPipeline {
    pub fn new(steps: Vec<Step>, probe: PipelineProbe) -> Self {
        probe.builds.fetch_add(1, Ordering::SeqCst);
        Self { steps, probe }
    }
}

impl DecodePipeline for ScriptedPipeline {
    fn describe(&self) -> String {
        format!("scripted ({} steps)", self.steps.len())
    }

    /// The bus is dropped on return, so a script without a terminal step
    /// looks like a pipeline that died.
    fn start(&mut self, bus: PipelineBus) -> Result<(), FlashScanError> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        for step in self.steps.drain(..) {
            match step {
                Step::Frame(frame) => bus.push_frame(Box::new(frame)),
                Step::Unavailable(pts) => bus.push_frame(Box::new(UnmappableFrame { pts })),
                Step::EndOfStream => bus.end_of_stream(),
                Step::Error(message) => bus.error(message),
            };
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A uniform 2×2 frame at `seconds`.
pub fn uniform(value: u8, seconds: f64) -> GrayFrame {
    GrayFrame::uniform(2, 2, value).with_pts(Duration::from_secs_f64(seconds))
}

/// Frames of the given intensities, 40 ms apart, followed by end-of-stream.
pub fn sequence(values: &[u8]) -> Vec<Step> {
    let mut steps: Vec<Step> = values
        .iter()
        .enumerate()
        .map(|(index, &value)| Step::Frame(uniform(value, index as f64 * 0.04)))
        .collect();
    steps.push(Step::EndOfStream);
    steps
}

pub type ScriptedController = PipelineController<ScriptedPipeline, Vec<u8>>;

/// Build a controller over `steps`, using a real temporary file as source.
pub fn controller(
    source: &Path,
    steps: Vec<Step>,
    config: Arc<RunConfig>,
    options: ScanOptions,
    probe: &PipelineProbe,
) -> ScriptedController {
    let probe = probe.clone();
    PipelineController::start_with(source, config, options, Vec::new(), move |_, _| {
        Ok(ScriptedPipeline::new(steps, probe))
    })
    .expect("Failed to start scripted controller")
}

/// Run `steps` to completion; returns the result, the output, and the probe.
pub fn scan(
    steps: Vec<Step>,
    config: Arc<RunConfig>,
    options: ScanOptions,
) -> (Result<RunSummary, FlashScanError>, String, PipelineProbe) {
    let source = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let probe = PipelineProbe::default();
    let mut controller = controller(source.path(), steps, config, options, &probe);
    let result = controller.run();
    let output = String::from_utf8(controller.output().clone()).expect("Output is not UTF-8");
    (result, output, probe)
}

/// Parse JSON-lines output.
pub fn json_lines(output: &str) -> Vec<Value> {
    output
        .lines()
        .map(|line| serde_json::from_str(line).expect("Output line is not JSON"))
        .collect()
}

/// Deltas of all lightning events in JSON-lines output.
pub fn event_deltas(output: &str) -> Vec<f64> {
    json_lines(output)
        .iter()
        .filter(|line| line["event"] == "lightning")
        .map(|line| line["delta"].as_f64().expect("delta is numeric"))
        .collect()
}
