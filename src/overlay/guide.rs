// SPDX-License-Identifier: MPL-2.0

//! Scanning guide overlay
//!
//! The overlay is a dimmed frame with a rectangular cutout of the configured
//! guide size, a stroked border around the cutout, and a gradient bar that
//! sweeps up and down inside it. It is rebuilt from scratch on every layout
//! pass so a running animation never mixes old and new geometry.

use super::geometry::{Rect, Rgba, Size};
use crate::config::GuideConfig;
use crate::constants::guide::{BAR_END_FRACTION, BAR_START_FRACTION, GRADIENT_ALPHAS};
use std::time::Duration;

/// Stroke cap style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    Butt,
    #[default]
    Round,
    Square,
}

/// Border drawn around the guide cutout
#[derive(Debug, Clone, PartialEq)]
pub struct BorderStroke {
    pub rect: Rect,
    pub color: Rgba,
    pub width: f32,
    pub cap: LineCap,
}

/// Vertical sweep of the scanning bar
///
/// Repeats forever and reverses direction at each end.
#[derive(Debug, Clone, PartialEq)]
pub struct BarAnimation {
    /// Vertical position of the bar at the start of a sweep
    pub from_y: f32,
    /// Vertical position of the bar at the end of a sweep
    pub to_y: f32,
    /// Length of one sweep
    pub duration: Duration,
}

impl BarAnimation {
    /// Bar position after `elapsed` time since the animation started
    pub fn position_at(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return self.from_y;
        }
        let sweeps = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let progress = sweeps.fract() as f32;
        // Odd sweeps run backwards
        let t = if (sweeps as u64) % 2 == 0 {
            progress
        } else {
            1.0 - progress
        };
        self.from_y + (self.to_y - self.from_y) * t
    }
}

/// Gradient bar inside the cutout
#[derive(Debug, Clone, PartialEq)]
pub struct ScanBar {
    pub rect: Rect,
    /// Colors from top to bottom
    pub gradient: Vec<Rgba>,
    pub animation: BarAnimation,
}

/// A fully laid out guide overlay
#[derive(Debug, Clone, PartialEq)]
pub struct GuideOverlay {
    /// Increments on every rebuild
    pub generation: u64,
    /// Bounds of the view the overlay covers
    pub bounds: Rect,
    /// The cutout the user aligns a code within
    pub mask: Rect,
    pub border: BorderStroke,
    pub scan_bar: ScanBar,
}

impl GuideOverlay {
    /// Lay out a guide overlay for the given view bounds
    ///
    /// Returns `None` when the overlay is switched off or the guide size is
    /// empty.
    pub fn build(bounds: Rect, guide: &GuideConfig, generation: u64) -> Option<Self> {
        if !guide.show_overlay || guide.size.is_empty() {
            return None;
        }

        let mask = bounds.centered(guide.size);
        let color = guide.line_color;

        let border = BorderStroke {
            rect: mask,
            color,
            width: guide.line_width,
            cap: LineCap::Round,
        };

        let gradient = GRADIENT_ALPHAS
            .iter()
            .enumerate()
            .map(|(i, alpha)| {
                // The last stop is fully clear regardless of the line color
                if i == GRADIENT_ALPHAS.len() - 1 {
                    Rgba::CLEAR
                } else {
                    color.with_alpha(*alpha)
                }
            })
            .collect();

        let bar_rect = Rect::new(mask.min_x(), mask.min_y(), mask.width, mask.height / 2.0);
        let animation = BarAnimation {
            from_y: mask.min_y() + mask.height * BAR_START_FRACTION,
            to_y: mask.max_y() - mask.height * BAR_END_FRACTION,
            duration: Duration::try_from_secs_f64(guide.animation_duration)
                .unwrap_or(Duration::ZERO),
        };

        Some(Self {
            generation,
            bounds,
            mask,
            border,
            scan_bar: ScanBar {
                rect: bar_rect,
                gradient,
                animation,
            },
        })
    }

    /// Size of the guide cutout
    pub fn guide_size(&self) -> Size {
        self.mask.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guide(size: f32) -> GuideConfig {
        GuideConfig {
            size: Size::new(size, size),
            ..GuideConfig::default()
        }
    }

    #[test]
    fn test_zero_size_builds_nothing() {
        let bounds = Rect::new(0.0, 0.0, 400.0, 800.0);
        assert!(GuideOverlay::build(bounds, &GuideConfig::default(), 0).is_none());
    }

    #[test]
    fn test_hidden_overlay_builds_nothing() {
        let bounds = Rect::new(0.0, 0.0, 400.0, 800.0);
        let config = GuideConfig {
            show_overlay: false,
            ..guide(200.0)
        };
        assert!(GuideOverlay::build(bounds, &config, 0).is_none());
    }

    #[test]
    fn test_mask_is_centered_and_bar_spans_half() {
        let bounds = Rect::new(0.0, 0.0, 400.0, 800.0);
        let overlay = GuideOverlay::build(bounds, &guide(200.0), 3).unwrap();

        assert_eq!(overlay.generation, 3);
        assert_eq!(overlay.mask, Rect::new(100.0, 300.0, 200.0, 200.0));
        assert_eq!(overlay.scan_bar.rect.height, 100.0);
        assert_eq!(overlay.scan_bar.animation.from_y, 350.0);
        assert_eq!(overlay.scan_bar.animation.to_y, 487.5);
        assert_eq!(overlay.scan_bar.gradient.len(), 5);
        assert_eq!(overlay.scan_bar.gradient[0].a, 0.5);
        assert_eq!(overlay.scan_bar.gradient[4], Rgba::CLEAR);
    }

    #[test]
    fn test_unrepresentable_duration_stands_still() {
        let bounds = Rect::new(0.0, 0.0, 390.0, 844.0);
        for duration in [f64::INFINITY, f64::NAN, -1.0, 1e20] {
            let config = GuideConfig {
                animation_duration: duration,
                ..guide(200.0)
            };
            let overlay = GuideOverlay::build(bounds, &config, 0).unwrap();
            assert_eq!(overlay.scan_bar.animation.duration, Duration::ZERO);
        }
    }

    #[test]
    fn test_bar_animation_autoreverses() {
        let animation = BarAnimation {
            from_y: 0.0,
            to_y: 100.0,
            duration: Duration::from_secs(1),
        };
        assert_eq!(animation.position_at(Duration::ZERO), 0.0);
        assert_eq!(animation.position_at(Duration::from_millis(500)), 50.0);
        assert_eq!(animation.position_at(Duration::from_millis(1500)), 50.0);
        assert!((animation.position_at(Duration::from_millis(1750)) - 25.0).abs() < 0.01);
    }
}
