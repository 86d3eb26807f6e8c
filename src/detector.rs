//! Delta-threshold detection.
//!
//! [`DeltaThresholdDetector`] keeps the sum of the last sampled frame and
//! compares each new [`IntensitySample`] against it. The delta is the
//! difference of the sums normalised by the current frame's pixel count,
//! which equals `avg(current) - avg(previous)` for equally sized frames.
//!
//! The threshold is read from the shared [`RunConfig`] on every evaluation.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{BaselinePolicy, RunConfig};
use crate::sampler::IntensitySample;

/// A frame whose delta magnitude exceeded the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightningEvent {
    pub pts: Duration,
    /// Signed change of average intensity.
    pub delta: f64,
}

impl LightningEvent {
    pub fn pts_seconds(&self) -> f64 {
        self.pts.as_secs_f64()
    }
}

/// Outcome of evaluating one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub sample: IntensitySample,
    pub delta: f64,
    /// Set when `|delta| > threshold`.
    pub event: Option<LightningEvent>,
}

#[derive(Debug, Clone, Copy)]
struct DetectorState {
    previous_sum: u64,
    primed: bool,
}

/// Stateful comparator of consecutive frame sums.
#[derive(Debug)]
pub struct DeltaThresholdDetector {
    config: Arc<RunConfig>,
    policy: BaselinePolicy,
    state: DetectorState,
}

impl DeltaThresholdDetector {
    pub fn new(config: Arc<RunConfig>, policy: BaselinePolicy) -> Self {
        Self {
            config,
            policy,
            state: Self::initial_state(policy),
        }
    }

    fn initial_state(policy: BaselinePolicy) -> DetectorState {
        DetectorState {
            previous_sum: 0,
            primed: policy == BaselinePolicy::Zero,
        }
    }

    /// Sum of the last evaluated sample (0 before the first one).
    pub fn previous_sum(&self) -> u64 {
        self.state.previous_sum
    }

    pub fn policy(&self) -> BaselinePolicy {
        self.policy
    }

    /// Return to the state at run start.
    pub fn reset(&mut self) {
        self.state = Self::initial_state(self.policy);
    }

    /// Compare `sample` with the previous one and update the baseline.
    ///
    /// The baseline is replaced unconditionally, whether or not an event is
    /// raised.
    pub fn evaluate(&mut self, sample: &IntensitySample) -> Evaluation {
        let primed = self.state.primed;
        let previous = self.state.previous_sum;
        self.state = DetectorState {
            previous_sum: sample.sum,
            primed: true,
        };

        if !primed {
            log::debug!("Baseline seeded with sum {}", sample.sum);
            return Evaluation {
                sample: *sample,
                delta: 0.0,
                event: None,
            };
        }

        let delta =
            (i128::from(sample.sum) - i128::from(previous)) as f64 / sample.pixel_count as f64;
        let threshold = self.config.threshold();

        let event = (delta.abs() > threshold).then_some(LightningEvent {
            pts: sample.pts,
            delta,
        });

        Evaluation {
            sample: *sample,
            delta,
            event,
        }
    }
}
