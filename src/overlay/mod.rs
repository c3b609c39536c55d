// SPDX-License-Identifier: MPL-2.0

//! Preview and guide overlay layout
//!
//! Nothing here draws pixels. The controller produces a [`PreviewSurface`]
//! and an optional [`GuideOverlay`] describing where things go; the host's
//! renderer draws them.

pub mod geometry;
pub mod guide;
pub mod preview;

pub use geometry::{Rect, Rgba, Size};
pub use guide::{BarAnimation, BorderStroke, GuideOverlay, LineCap, ScanBar};
pub use preview::{PreviewSurface, VideoGravity};
