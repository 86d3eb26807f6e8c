//! Grayscale frame views.
//!
//! A [`Frame`] is a borrowed, read-only view of one 8-bit luma plane. The
//! decode pipeline owns the buffer behind it and delivers it wrapped in a
//! [`VideoSample`], which the controller maps into a `Frame` for the
//! duration of one synchronous dispatch.

use std::time::Duration;

use image::GrayImage;

use crate::error::FlashScanError;

/// A borrowed 8-bit grayscale plane with its presentation timestamp.
///
/// Samples are addressed as `plane[x + y * stride]`. Bytes between `width`
/// and `stride` on each row are padding and never read.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    plane: &'a [u8],
    width: u32,
    height: u32,
    stride: usize,
    pts: Option<Duration>,
}

impl<'a> Frame<'a> {
    /// Wrap a plane.
    ///
    /// # Errors
    ///
    /// Returns [`FlashScanError::FrameUnavailable`] if the frame has no area,
    /// if `stride < width`, or if `plane` is too short to hold `height` rows.
    pub fn new(
        plane: &'a [u8],
        width: u32,
        height: u32,
        stride: usize,
        pts: Option<Duration>,
    ) -> Result<Self, FlashScanError> {
        if width == 0 || height == 0 {
            return Err(FlashScanError::FrameUnavailable(format!(
                "frame has no area ({width}x{height})"
            )));
        }

        let row_len = width as usize;
        if stride < row_len {
            return Err(FlashScanError::FrameUnavailable(format!(
                "stride {stride} is smaller than width {width}"
            )));
        }

        let required = stride
            .checked_mul(height as usize - 1)
            .and_then(|bytes| bytes.checked_add(row_len))
            .ok_or_else(|| {
                FlashScanError::FrameUnavailable(format!(
                    "stride {stride} overflows the address space for {width}x{height}"
                ))
            })?;
        if plane.len() < required {
            return Err(FlashScanError::FrameUnavailable(format!(
                "plane holds {} bytes, {required} needed for {width}x{height} at stride {stride}",
                plane.len()
            )));
        }

        Ok(Self {
            plane,
            width,
            height,
            stride,
            pts,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pts(&self) -> Option<Duration> {
        self.pts
    }

    /// Number of samples in the visible area, `width * height`.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Visible samples of each row, padding excluded.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let plane = self.plane;
        let stride = self.stride;
        let width = self.width as usize;
        (0..self.height as usize).map(move |y| {
            let start = y * stride;
            &plane[start..start + width]
        })
    }
}

/// A decoded unit handed over by a decode pipeline.
///
/// Implementations own their pixel buffer. [`map`](VideoSample::map) borrows
/// it as a [`Frame`]; it may fail when the buffer cannot be read, in which
/// case the frame is skipped.
pub trait VideoSample: Send {
    /// Presentation timestamp measured from stream start, if known.
    fn pts(&self) -> Option<Duration>;

    /// Borrow the luma plane for reading.
    ///
    /// # Errors
    ///
    /// [`FlashScanError::FrameUnavailable`] if the pixel data cannot be
    /// accessed.
    fn map(&self) -> Result<Frame<'_>, FlashScanError>;
}

/// An owned grayscale frame held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    pts: Option<Duration>,
}

impl GrayFrame {
    /// A tightly packed frame (`stride == width`) without a timestamp.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::with_stride(width, height, width as usize, data)
    }

    /// A frame whose rows are `stride` bytes apart.
    pub fn with_stride(width: u32, height: u32, stride: usize, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            stride,
            pts: None,
        }
    }

    /// A tightly packed frame where every sample equals `value`.
    pub fn uniform(width: u32, height: u32, value: u8) -> Self {
        let len = width as usize * height as usize;
        Self::new(width, height, vec![value; len])
    }

    #[must_use]
    pub fn with_pts(mut self, pts: Duration) -> Self {
        self.pts = Some(pts);
        self
    }
}

impl From<GrayImage> for GrayFrame {
    fn from(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }
}

impl VideoSample for GrayFrame {
    fn pts(&self) -> Option<Duration> {
        self.pts
    }

    fn map(&self) -> Result<Frame<'_>, FlashScanError> {
        Frame::new(&self.data, self.width, self.height, self.stride, self.pts)
    }
}
