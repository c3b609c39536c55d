// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection
//!
//! This is the decoder the Linux platforms delegate to. Frames are
//! optionally downscaled, searched for QR grids with `rqrr`, and every
//! grid that decodes becomes a [`MetadataObject`] in detection order.

use super::types::{FrameRegion, GrayFrame};
use crate::backends::{MachineReadableCode, MetadataObject, SymbolType};
use crate::constants::detector::DEFAULT_MAX_DIMENSION;
use tracing::{debug, trace};

/// QR code detector
///
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone)]
pub struct QrDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a new QR detector with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Detect and decode QR codes in a frame
    ///
    /// Runs synchronously; callers keep it off any latency-sensitive thread.
    pub fn detect(&self, frame: &GrayFrame) -> Vec<MetadataObject> {
        let start = std::time::Instant::now();

        if frame.width == 0 || frame.height == 0 {
            return Vec::new();
        }

        let (width, height) = (frame.width, frame.height);
        let scale = if width > self.max_dimension || height > self.max_dimension {
            let max = self.max_dimension as f32;
            (width as f32 / max).max(height as f32 / max)
        } else {
            1.0
        };
        let proc_width = ((width as f32 / scale) as usize).max(1);
        let proc_height = ((height as f32 / scale) as usize).max(1);

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(proc_width, proc_height, |x, y| {
                sample(frame, x, y, scale)
            });
        let grids = prepared.detect_grids();

        trace!(
            proc_width,
            proc_height,
            scale,
            grids = grids.len(),
            detection_ms = start.elapsed().as_millis(),
            "QR grid detection complete"
        );

        let mut objects = Vec::with_capacity(grids.len());
        for grid in grids {
            let content = match grid.decode() {
                Ok((_meta, content)) => content,
                Err(e) => {
                    debug!(error = ?e, "Failed to decode QR grid");
                    continue;
                }
            };

            let region = grid_region(&grid.bounds, scale, width, height);

            debug!(
                content = %content,
                x = region.x,
                y = region.y,
                width = region.width,
                height = region.height,
                "Detected QR code"
            );

            objects.push(MetadataObject::MachineReadableCode(MachineReadableCode {
                symbol_type: SymbolType::Qr,
                payload: Some(content),
                bounds: Some(region),
            }));
        }

        if !objects.is_empty() {
            debug!(
                count = objects.len(),
                total_ms = start.elapsed().as_millis(),
                "QR detection found codes"
            );
        }

        objects
    }
}

/// Nearest-neighbour sample of the source frame at processing coordinates
#[inline]
fn sample(frame: &GrayFrame, x: usize, y: usize, scale: f32) -> u8 {
    if scale == 1.0 {
        return frame.pixel(x, y);
    }
    let src_x = ((x as f32 * scale) as usize).min(frame.width as usize - 1);
    let src_y = ((y as f32 * scale) as usize).min(frame.height as usize - 1);
    frame.pixel(src_x, src_y)
}

/// Bounding box of the four grid corners in normalized frame coordinates
fn grid_region(corners: &[rqrr::Point; 4], scale: f32, width: u32, height: u32) -> FrameRegion {
    let min_x = corners.iter().map(|p| p.x).min().unwrap_or(0).max(0) as f32 * scale;
    let max_x = corners.iter().map(|p| p.x).max().unwrap_or(0).max(0) as f32 * scale;
    let min_y = corners.iter().map(|p| p.y).min().unwrap_or(0).max(0) as f32 * scale;
    let max_y = corners.iter().map(|p| p.y).max().unwrap_or(0).max(0) as f32 * scale;

    FrameRegion::from_pixels(
        min_x.min(width as f32) as u32,
        min_y.min(height as f32) as u32,
        (max_x - min_x).max(0.0) as u32,
        (max_y - min_y).max(0.0) as u32,
        width,
        height,
    )
}
