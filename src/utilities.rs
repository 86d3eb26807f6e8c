//! Internal utility functions.
//!
//! Source path resolution and timestamp conversion shared by the controller
//! and the FFmpeg pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::Rational;
use ffmpeg_sys_next::AV_NOPTS_VALUE;

use crate::error::FlashScanError;

/// Resolve a source location to an absolute path of an existing file.
///
/// # Errors
///
/// [`FlashScanError::InvalidInput`] if the path does not exist, cannot be
/// canonicalised, or names a directory.
pub fn resolve_source<P: AsRef<Path>>(source: P) -> Result<PathBuf, FlashScanError> {
    let source = source.as_ref();
    let resolved = source
        .canonicalize()
        .map_err(|error| FlashScanError::InvalidInput {
            path: source.to_path_buf(),
            reason: error.to_string(),
        })?;

    if resolved.is_dir() {
        return Err(FlashScanError::InvalidInput {
            path: source.to_path_buf(),
            reason: "is a directory".to_string(),
        });
    }

    Ok(resolved)
}

/// Convert a PTS in stream time base to time since stream start.
///
/// `start_time` is the stream's first timestamp, or `AV_NOPTS_VALUE` when
/// unknown. Timestamps before the start clamp to zero.
pub(crate) fn pts_to_duration(pts: i64, start_time: i64, time_base: Rational) -> Duration {
    let origin = if start_time == AV_NOPTS_VALUE {
        0
    } else {
        start_time
    };

    let denominator = i128::from(time_base.denominator());
    if denominator == 0 {
        return Duration::ZERO;
    }

    let ticks = i128::from(pts) - i128::from(origin);
    let nanos = ticks * i128::from(time_base.numerator()) * 1_000_000_000 / denominator;
    Duration::from_nanos(u64::try_from(nanos.max(0)).unwrap_or(u64::MAX))
}

/// Build a `file://` location string for display.
pub(crate) fn file_location(path: &Path) -> String {
    format!("file://{}", path.display())
}
