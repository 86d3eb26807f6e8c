//! Line-oriented output of events, telemetry, and lifecycle messages.
//!
//! Text output:
//!
//! ```text
//! AVG:   87.412, AVG_DELTA:  61.003, pts(sec):  12.480
//! LIGHTNING: pts(sec)=  12.480 (0:00:12)
//! ```
//!
//! JSON output writes one object per line with the same information.

use std::fmt::Arguments;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::config::RunConfig;
use crate::detector::{Evaluation, LightningEvent};

/// Output encoding of an [`EventReporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human readable lines. This is the default.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Format a timestamp as `H:MM:SS`, truncating every component.
///
/// Hours are not padded and not bounded.
///
/// ```
/// use std::time::Duration;
///
/// use flashscan::format_timestamp;
///
/// assert_eq!(format_timestamp(Duration::from_secs(3661)), "1:01:01");
/// assert_eq!(format_timestamp(Duration::from_secs_f64(59.999)), "0:00:59");
/// ```
pub fn format_timestamp(pts: Duration) -> String {
    let total = pts.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

/// Writes detection results to any [`Write`] sink.
///
/// Write failures are logged and otherwise ignored; reporting never ends a
/// run.
pub struct EventReporter<W: Write> {
    out: W,
    config: Arc<RunConfig>,
    format: OutputFormat,
}

impl<W: Write> EventReporter<W> {
    pub fn new(out: W, config: Arc<RunConfig>, format: OutputFormat) -> Self {
        Self {
            out,
            config,
            format,
        }
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Report one processed frame: telemetry when verbose, then the event
    /// line if the frame crossed the threshold.
    pub fn report(&mut self, evaluation: &Evaluation) {
        if self.config.is_verbose() {
            self.telemetry(evaluation);
        }
        if let Some(event) = &evaluation.event {
            self.event(event);
        }
    }

    /// Emit a lightning event.
    pub fn event(&mut self, event: &LightningEvent) {
        let timestamp = format_timestamp(event.pts);
        match self.format {
            OutputFormat::Text => self.emit(format_args!(
                "LIGHTNING: pts(sec)={:8.3} ({timestamp})",
                event.pts_seconds()
            )),
            OutputFormat::Json => {
                let payload = json!({
                    "event": "lightning",
                    "pts_seconds": event.pts_seconds(),
                    "timestamp": timestamp,
                    "delta": event.delta,
                });
                self.emit(format_args!("{payload}"));
            }
        }
    }

    fn telemetry(&mut self, evaluation: &Evaluation) {
        let pts = evaluation.sample.pts_seconds();
        match self.format {
            OutputFormat::Text => self.emit(format_args!(
                "AVG: {:8.3}, AVG_DELTA:{:8.3}, pts(sec):{pts:8.3}",
                evaluation.sample.avg, evaluation.delta
            )),
            OutputFormat::Json => {
                let payload = json!({
                    "event": "frame",
                    "avg": evaluation.sample.avg,
                    "delta": evaluation.delta,
                    "pts_seconds": pts,
                });
                self.emit(format_args!("{payload}"));
            }
        }
    }

    /// Verbose-only notice that frame processing begins.
    pub fn started(&mut self) {
        if self.config.is_verbose() {
            self.lifecycle("started", "Starting to crunch frames");
        }
    }

    /// Verbose-only notice that frame processing has ended.
    pub fn stopped(&mut self) {
        if self.config.is_verbose() {
            self.lifecycle("stopped", "Stopped crunching frames");
        }
    }

    pub fn end_of_stream(&mut self) {
        self.lifecycle("end_of_stream", "The source got dry");
    }

    pub fn source_error(&mut self, message: &str) {
        match self.format {
            OutputFormat::Text => self.emit(format_args!("Received error")),
            OutputFormat::Json => {
                let payload = json!({ "event": "error", "message": message });
                self.emit(format_args!("{payload}"));
            }
        }
    }

    fn lifecycle(&mut self, kind: &str, text: &str) {
        match self.format {
            OutputFormat::Text => self.emit(format_args!("{text}")),
            OutputFormat::Json => {
                let payload = json!({ "event": kind });
                self.emit(format_args!("{payload}"));
            }
        }
    }

    fn emit(&mut self, line: Arguments<'_>) {
        if let Err(error) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            log::warn!("Failed to write report line: {error}");
        }
    }
}
