//! FrameSampler and frame view tests.

use std::time::Duration;

use flashscan::{FlashScanError, Frame, FrameSampler, GrayFrame, VideoSample};
use image::{GrayImage, Luma};

#[test]
fn uniform_frame_average() {
    let frame = GrayFrame::uniform(4, 3, 17).with_pts(Duration::from_millis(40));
    let sample = FrameSampler::new().sample(&frame.map().unwrap()).unwrap();

    assert_eq!(sample.sum, 17 * 12);
    assert_eq!(sample.pixel_count, 12);
    assert_eq!(sample.avg, 17.0);
    assert_eq!(sample.pts, Duration::from_millis(40));
    assert!((sample.pts_seconds() - 0.04).abs() < 1e-12);
}

#[test]
fn stride_padding_is_not_summed() {
    // 3×2 visible samples, rows padded to 5 bytes with 255s.
    let data = vec![
        1, 2, 3, 255, 255, //
        4, 5, 6, 255, 255,
    ];
    let frame = GrayFrame::with_stride(3, 2, 5, data).with_pts(Duration::ZERO);
    let sample = FrameSampler::new().sample(&frame.map().unwrap()).unwrap();

    assert_eq!(sample.sum, 21);
    assert_eq!(sample.avg, 21.0 / 6.0);
}

#[test]
fn last_row_may_omit_padding() {
    let data = vec![
        10, 20, 0, 0, //
        30, 40,
    ];
    let frame = Frame::new(&data, 2, 2, 4, Some(Duration::ZERO)).unwrap();
    let sample = FrameSampler::new().sample(&frame).unwrap();
    assert_eq!(sample.sum, 100);
    assert_eq!(sample.avg, 25.0);
}

#[test]
fn average_matches_reference_sum_for_many_shapes() {
    for (width, height, stride) in [(1, 1, 1), (7, 3, 7), (7, 3, 16), (64, 48, 64), (5, 9, 8)] {
        let data: Vec<u8> = (0..stride * height as usize)
            .map(|index| (index * 31 % 251) as u8)
            .collect();
        let frame = Frame::new(&data, width, height, stride, Some(Duration::ZERO)).unwrap();
        let sample = FrameSampler::new().sample(&frame).unwrap();

        let mut expected = 0_u64;
        for y in 0..height as usize {
            for x in 0..width as usize {
                expected += u64::from(data[x + y * stride]);
            }
        }
        assert_eq!(sample.sum, expected, "{width}x{height} stride {stride}");
        let avg = expected as f64 / f64::from(width * height);
        assert!((sample.avg - avg).abs() < 1e-9);
    }
}

#[test]
fn missing_timestamp_is_reported() {
    let frame = GrayFrame::uniform(2, 2, 9);
    let result = FrameSampler::new().sample(&frame.map().unwrap());
    assert!(matches!(result, Err(FlashScanError::MissingTimestamp)));
}

#[test]
fn frame_from_gray_image() {
    let mut image = GrayImage::new(3, 2);
    image.put_pixel(0, 0, Luma([60]));
    image.put_pixel(2, 1, Luma([30]));

    let frame = GrayFrame::from(image).with_pts(Duration::from_secs(1));
    let view = frame.map().unwrap();
    assert_eq!(view.width(), 3);
    assert_eq!(view.height(), 2);
    assert_eq!(view.stride(), 3);

    let sample = FrameSampler::new().sample(&view).unwrap();
    assert_eq!(sample.sum, 90);
    assert_eq!(sample.avg, 15.0);
}

#[test]
fn short_plane_is_unavailable() {
    let data = vec![0_u8; 7];
    let result = Frame::new(&data, 4, 2, 4, None);
    assert!(matches!(result, Err(FlashScanError::FrameUnavailable(_))));
}

#[test]
fn stride_below_width_is_unavailable() {
    let data = vec![0_u8; 64];
    let result = Frame::new(&data, 8, 2, 4, None);
    assert!(matches!(result, Err(FlashScanError::FrameUnavailable(_))));
}

#[test]
fn oversized_stride_is_unavailable() {
    let frame = GrayFrame::with_stride(4, 3, usize::MAX / 2 + 1, vec![0; 16])
        .with_pts(Duration::ZERO);
    let result = frame.map();
    assert!(matches!(result, Err(FlashScanError::FrameUnavailable(_))));

    let data = vec![0_u8; 16];
    let result = Frame::new(&data, 4, 2, usize::MAX - 2, Some(Duration::ZERO));
    assert!(matches!(result, Err(FlashScanError::FrameUnavailable(_))));
}

#[test]
fn empty_frame_is_unavailable() {
    let frame = GrayFrame::new(0, 4, Vec::new()).with_pts(Duration::ZERO);
    let error = frame.map().unwrap_err();
    assert!(error.to_string().contains("no area"), "{error}");
}
