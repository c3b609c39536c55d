// SPDX-License-Identifier: MPL-2.0

//! Preview surface layout
//!
//! The preview surface is the layer the host composites the camera image
//! into. The controller only tracks where it sits and how video is fitted.

use super::geometry::{Rect, Size};

/// How video content is fitted into the preview bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoGravity {
    /// Scale to fit within bounds (letterbox)
    Contain,
    /// Fill the bounds, cropping the overflow
    #[default]
    Cover,
}

/// Layout of the camera preview within the host view
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSurface {
    pub bounds: Rect,
    pub gravity: VideoGravity,
}

impl PreviewSurface {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            gravity: VideoGravity::default(),
        }
    }

    /// Re-lay the surface to new bounds
    pub fn relayout(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    /// Where a frame of `frame_size` is drawn within the surface
    ///
    /// With `Cover` the result may extend past the bounds on one axis.
    pub fn content_rect(&self, frame_size: Size) -> Rect {
        let bounds = self.bounds;
        if frame_size.is_empty() || bounds.size().is_empty() {
            return bounds;
        }

        let frame_aspect = frame_size.width / frame_size.height;
        let container_aspect = bounds.width / bounds.height;

        let fit_width = match self.gravity {
            // Frame is wider - fit to width
            VideoGravity::Contain => frame_aspect > container_aspect,
            // Frame is wider - fit to height and crop the sides
            VideoGravity::Cover => frame_aspect <= container_aspect,
        };

        let (width, height) = if fit_width {
            (bounds.width, bounds.width / frame_aspect)
        } else {
            (bounds.height * frame_aspect, bounds.height)
        };

        bounds.centered(Size::new(width, height))
    }
}
