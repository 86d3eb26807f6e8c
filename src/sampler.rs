//! Global luma sampling.

use std::time::Duration;

use crate::error::FlashScanError;
use crate::frame::Frame;

/// Sum and average intensity of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensitySample {
    /// Sum of all `width * height` samples.
    pub sum: u64,
    /// `width * height`.
    pub pixel_count: u64,
    /// `sum / pixel_count`.
    pub avg: f64,
    /// Presentation timestamp of the sampled frame.
    pub pts: Duration,
}

impl IntensitySample {
    pub fn pts_seconds(&self) -> f64 {
        self.pts.as_secs_f64()
    }
}

/// Computes [`IntensitySample`]s from grayscale frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameSampler;

impl FrameSampler {
    pub fn new() -> Self {
        Self
    }

    /// Sum every visible sample of `frame`. Row padding is skipped.
    ///
    /// # Errors
    ///
    /// [`FlashScanError::MissingTimestamp`] if the frame carries no PTS.
    pub fn sample(&self, frame: &Frame<'_>) -> Result<IntensitySample, FlashScanError> {
        let pts = frame.pts().ok_or(FlashScanError::MissingTimestamp)?;

        let sum: u64 = frame
            .rows()
            .map(|row| row.iter().map(|&value| u64::from(value)).sum::<u64>())
            .sum();
        let pixel_count = frame.pixel_count();

        Ok(IntensitySample {
            sum,
            pixel_count,
            avg: sum as f64 / pixel_count as f64,
            pts,
        })
    }
}
