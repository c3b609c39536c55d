// SPDX-License-Identifier: MPL-2.0

//! Frame analysis for the Linux platforms
//!
//! Converts captured frames to grayscale and runs QR detection, producing
//! the metadata batches a platform hands to the session controller.

pub mod qr_detector;
pub mod types;

pub use qr_detector::QrDetector;
pub use types::{FrameRegion, GrayFrame};
