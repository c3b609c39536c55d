// SPDX-License-Identifier: MPL-2.0

//! Core types for frame analysis
//!
//! Frames handed to the detector are single-channel luma images. Capture
//! backends convert whatever the device produces (YUYV, RGBA, decoded image
//! files) into a [`GrayFrame`] before detection.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl FrameRegion {
    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            x: x as f32 / frame_width as f32,
            y: y as f32 / frame_height as f32,
            width: width as f32 / frame_width as f32,
            height: height as f32 / frame_height as f32,
        }
    }
}

/// A grayscale camera frame
#[derive(Debug, Clone)]
pub struct GrayFrame {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, may include padding
    pub stride: u32,
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl GrayFrame {
    /// Wrap tightly packed luma bytes
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width,
            data: Arc::from(data.into_boxed_slice()),
            captured_at: Instant::now(),
        }
    }

    /// Extract the luma plane of a packed YUYV (Y0 U Y1 V) buffer
    pub fn from_yuyv(data: &[u8], width: u32, height: u32, stride: u32) -> Self {
        let mut luma = Vec::with_capacity((width * height) as usize);
        for y in 0..height as usize {
            let row_start = y * stride as usize;
            let row_end = row_start + width as usize * 2;
            if row_end > data.len() {
                break;
            }
            luma.extend(data[row_start..row_end].iter().step_by(2));
        }
        luma.resize((width * height) as usize, 0);
        Self::new(width, height, luma)
    }

    /// Convert an RGBA buffer to luma (BT.601 weights)
    pub fn from_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Self {
        let mut luma = Vec::with_capacity((width * height) as usize);
        for y in 0..height as usize {
            let row_start = y * stride as usize;
            for x in 0..width as usize {
                let offset = row_start + x * 4;
                let Some(px) = data.get(offset..offset + 3) else {
                    luma.push(0);
                    continue;
                };
                let value = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                luma.push(value.round().clamp(0.0, 255.0) as u8);
            }
        }
        Self::new(width, height, luma)
    }

    /// Pixel value at (x, y), zero outside the frame
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data
            .get(y * self.stride as usize + x)
            .copied()
            .unwrap_or(0)
    }
}

impl From<image::GrayImage> for GrayFrame {
    fn from(img: image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yuyv_keeps_luma_and_skips_stride_padding() {
        // 2x2 YUYV with 2 bytes of padding per row
        let data: Vec<u8> = vec![
            10, 128, 20, 128, 0, 0, // row 0
            30, 128, 40, 128, 0, 0, // row 1
        ];
        let frame = GrayFrame::from_yuyv(&data, 2, 2, 6);
        assert_eq!(&*frame.data, &[10, 20, 30, 40]);
        assert_eq!(frame.stride, 2);
    }

    #[test]
    fn test_from_rgba_weights() {
        let data: Vec<u8> = vec![
            255, 255, 255, 255, // white
            0, 0, 0, 255, // black
        ];
        let frame = GrayFrame::from_rgba(&data, 2, 1, 8);
        assert_eq!(&*frame.data, &[255, 0]);
    }

    #[test]
    fn test_pixel_out_of_bounds_is_zero() {
        let frame = GrayFrame::new(1, 1, vec![42]);
        assert_eq!(frame.pixel(0, 0), 42);
        assert_eq!(frame.pixel(5, 5), 0);
    }

    #[test]
    fn test_frame_region_from_pixels() {
        let region = FrameRegion::from_pixels(50, 25, 100, 50, 200, 100);
        assert_eq!(region.x, 0.25);
        assert_eq!(region.y, 0.25);
        assert_eq!(region.width, 0.5);
        assert_eq!(region.height, 0.5);
    }
}
