//! FFmpeg-backed decode pipeline.
//!
//! [`FfmpegPipeline`] demuxes the best video stream of a file, decodes it,
//! converts every frame to `GRAY8` with the software scaler, and publishes
//! the result on a [`PipelineBus`] from a dedicated decode thread.
//!
//! [`build`](FfmpegPipeline::build) probes the whole chain once so that
//! construction failures surface before the run starts. The decode thread
//! then opens a fresh demuxer of its own; FFmpeg contexts never cross
//! threads, only finished frames do.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::config::SinkOptions;
use crate::error::FlashScanError;
use crate::frame::{Frame, VideoSample};
use crate::pipeline::{DecodePipeline, PipelineBus};
use crate::progress::CancellationToken;
use crate::utilities::{file_location, pts_to_duration};

/// Properties of the decoded video stream, captured at build time.
#[derive(Debug, Clone)]
struct StreamInfo {
    codec: String,
    width: u32,
    height: u32,
    frames_per_second: f64,
}

/// Decode → grayscale → sink pipeline over a local media file.
pub struct FfmpegPipeline {
    source: PathBuf,
    sink: SinkOptions,
    info: StreamInfo,
    cancellation: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl FfmpegPipeline {
    /// Open `source`, locate its video stream, and verify that a decoder and
    /// a `GRAY8` converter can be created for it.
    ///
    /// # Errors
    ///
    /// [`FlashScanError::PipelineConstructionFailure`] if any stage cannot be
    /// set up.
    pub fn build(source: &Path, sink: &SinkOptions) -> Result<Self, FlashScanError> {
        let construction = |error: ffmpeg_next::Error| {
            FlashScanError::PipelineConstructionFailure(format!("{}: {error}", source.display()))
        };

        ffmpeg_next::init().map_err(construction)?;
        let input = ffmpeg_next::format::input(&source).map_err(construction)?;
        let (decoder, _) = open_video_decoder(&input).map_err(|error| match error {
            FlashScanError::SourceError(reason) => FlashScanError::PipelineConstructionFailure(
                format!("{}: {reason}", source.display()),
            ),
            other => other,
        })?;
        let _scaler = gray_scaler(&decoder).map_err(construction)?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| construction(ffmpeg_next::Error::StreamNotFound))?;
        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            f64::from(frame_rate.numerator()) / f64::from(frame_rate.denominator())
        } else {
            0.0
        };

        let info = StreamInfo {
            codec: decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
        };
        log::debug!(
            "Video stream: {}x{}, {:.2} fps, codec={}",
            info.width,
            info.height,
            info.frames_per_second,
            info.codec
        );

        Ok(Self {
            source: source.to_path_buf(),
            sink: *sink,
            info,
            cancellation: CancellationToken::new(),
            worker: None,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl DecodePipeline for FfmpegPipeline {
    fn describe(&self) -> String {
        format!(
            "demux uri=\"{}\" ! decode codec={} {}x{} ! convert format=GRAY8 ! sink sync={} emit-frames={}",
            file_location(&self.source),
            self.info.codec,
            self.info.width,
            self.info.height,
            !self.sink.push_as_fast_as_possible,
            self.sink.emit_per_frame_callback,
        )
    }

    fn start(&mut self, bus: PipelineBus) -> Result<(), FlashScanError> {
        if self.worker.is_some() {
            return Err(FlashScanError::InvalidState(
                "decode thread already running".to_string(),
            ));
        }

        let source = self.source.clone();
        let sink = self.sink;
        let cancellation = self.cancellation.clone();

        let worker = thread::Builder::new()
            .name("flashscan-decode".to_string())
            .spawn(move || {
                match decode_to_bus(&source, sink, &cancellation, &bus) {
                    Ok(true) => {
                        let _ = bus.end_of_stream();
                    }
                    Ok(false) => log::debug!("Decode thread cancelled"),
                    Err(error) => {
                        let _ = bus.error(error.to_string());
                    }
                }
            })?;

        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        self.cancellation.cancel();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Decode thread panicked");
            }
        }
    }
}

impl Drop for FfmpegPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A `GRAY8` frame produced by the scaler.
struct GrayVideoFrame {
    frame: VideoFrame,
    pts: Option<Duration>,
}

impl VideoSample for GrayVideoFrame {
    fn pts(&self) -> Option<Duration> {
        self.pts
    }

    fn map(&self) -> Result<Frame<'_>, FlashScanError> {
        if self.frame.format() != Pixel::GRAY8 {
            return Err(FlashScanError::FrameUnavailable(format!(
                "expected GRAY8, got {:?}",
                self.frame.format()
            )));
        }
        if self.frame.planes() == 0 {
            return Err(FlashScanError::FrameUnavailable(
                "frame has no data plane".to_string(),
            ));
        }

        Frame::new(
            self.frame.data(0),
            self.frame.width(),
            self.frame.height(),
            self.frame.stride(0),
            self.pts,
        )
    }
}

/// Paces delivery to presentation timestamps when the sink is synchronised.
struct DeliveryClock {
    enabled: bool,
    anchor: Option<(Instant, Duration)>,
}

impl DeliveryClock {
    fn new(sink: SinkOptions) -> Self {
        Self {
            enabled: !sink.push_as_fast_as_possible,
            anchor: None,
        }
    }

    fn wait_for(&mut self, pts: Option<Duration>) {
        if let Some(delay) = self.delay_at(pts, Instant::now()) {
            thread::sleep(delay);
        }
    }

    /// Time left until `pts` is due, measured at `now`. The first timed
    /// frame anchors the clock and is due immediately.
    fn delay_at(&mut self, pts: Option<Duration>, now: Instant) -> Option<Duration> {
        let (true, Some(pts)) = (self.enabled, pts) else {
            return None;
        };
        let (started, first_pts) = *self.anchor.get_or_insert((now, pts));
        let due = started + pts.saturating_sub(first_pts);
        due.checked_duration_since(now).filter(|delay| !delay.is_zero())
    }
}

fn open_video_decoder(input: &Input) -> Result<(VideoDecoder, usize), FlashScanError> {
    let stream = input
        .streams()
        .best(Type::Video)
        .ok_or_else(|| FlashScanError::SourceError("no video stream found".to_string()))?;
    let index = stream.index();
    let decoder_context = CodecContext::from_parameters(stream.parameters())?;
    let decoder = decoder_context.decoder().video()?;
    Ok((decoder, index))
}

fn gray_scaler(decoder: &VideoDecoder) -> Result<ScalingContext, ffmpeg_next::Error> {
    ScalingContext::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        Pixel::GRAY8,
        decoder.width(),
        decoder.height(),
        ScalingFlags::BILINEAR,
    )
}

/// Decode loop run on the worker thread.
///
/// Returns `Ok(true)` when the stream was exhausted and `Ok(false)` when
/// decoding was cancelled or the controller went away.
fn decode_to_bus(
    source: &Path,
    sink: SinkOptions,
    cancellation: &CancellationToken,
    bus: &PipelineBus,
) -> Result<bool, FlashScanError> {
    let mut input = ffmpeg_next::format::input(&source)?;
    let (mut decoder, video_stream_index) = open_video_decoder(&input)?;
    let (time_base, start_time) = {
        let stream = input
            .stream(video_stream_index)
            .ok_or_else(|| FlashScanError::SourceError("video stream vanished".to_string()))?;
        (stream.time_base(), stream.start_time())
    };
    let mut scaler = gray_scaler(&decoder)?;

    let mut clock = DeliveryClock::new(sink);
    let mut decoded = VideoFrame::empty();
    let mut deliver = |decoder: &mut VideoDecoder| -> Result<bool, FlashScanError> {
        while decoder.receive_frame(&mut decoded).is_ok() {
            if cancellation.is_cancelled() {
                return Ok(false);
            }

            let mut gray = VideoFrame::empty();
            scaler.run(&decoded, &mut gray)?;
            let pts = decoded
                .pts()
                .map(|pts| pts_to_duration(pts, start_time, time_base));

            clock.wait_for(pts);
            if sink.emit_per_frame_callback
                && !bus.push_frame(Box::new(GrayVideoFrame { frame: gray, pts }))
            {
                return Ok(false);
            }
        }
        Ok(true)
    };

    for (stream, packet) in input.packets() {
        if cancellation.is_cancelled() {
            return Ok(false);
        }
        if stream.index() != video_stream_index {
            continue;
        }

        decoder.send_packet(&packet)?;
        if !deliver(&mut decoder)? {
            return Ok(false);
        }
    }

    decoder.send_eof()?;
    deliver(&mut decoder)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::DeliveryClock;
    use crate::config::SinkOptions;

    fn synchronised() -> DeliveryClock {
        DeliveryClock::new(SinkOptions {
            push_as_fast_as_possible: false,
            emit_per_frame_callback: true,
        })
    }

    #[test]
    fn unsynchronised_clock_never_waits() {
        let mut clock = DeliveryClock::new(SinkOptions::default());
        let now = Instant::now();
        assert_eq!(clock.delay_at(Some(Duration::ZERO), now), None);
        assert_eq!(clock.delay_at(Some(Duration::from_secs(5)), now), None);
        assert!(clock.anchor.is_none());

        let begin = Instant::now();
        clock.wait_for(Some(Duration::from_secs(10)));
        assert!(begin.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn synchronised_clock_paces_to_pts() {
        let mut clock = synchronised();
        let start = Instant::now();

        // First frame anchors the clock at 2 s.
        assert_eq!(clock.delay_at(Some(Duration::from_secs(2)), start), None);
        assert_eq!(clock.anchor, Some((start, Duration::from_secs(2))));

        let delay = clock.delay_at(
            Some(Duration::from_millis(2500)),
            start + Duration::from_millis(100),
        );
        assert_eq!(delay, Some(Duration::from_millis(400)));

        // Already late.
        let late = clock.delay_at(Some(Duration::from_secs(3)), start + Duration::from_secs(2));
        assert_eq!(late, None);
    }

    #[test]
    fn synchronised_clock_sleeps_until_due() {
        let mut clock = synchronised();
        let begin = Instant::now();
        clock.wait_for(Some(Duration::ZERO));
        clock.wait_for(Some(Duration::from_millis(30)));
        assert!(begin.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn synchronised_clock_ignores_missing_pts() {
        let mut clock = synchronised();
        assert_eq!(clock.delay_at(None, Instant::now()), None);
        assert!(clock.anchor.is_none());

        let begin = Instant::now();
        clock.wait_for(None);
        assert!(begin.elapsed() < Duration::from_secs(1));
    }
}
