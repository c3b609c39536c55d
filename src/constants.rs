// SPDX-License-Identifier: GPL-3.0-only

//! Library-wide constants

use crate::backends::SymbolType;

/// Symbol types accepted when the caller does not choose any
///
/// The retail barcodes plus QR, which every Linux platform can decode.
pub const DEFAULT_SYMBOL_TYPES: [SymbolType; 3] =
    [SymbolType::Ean8, SymbolType::Ean13, SymbolType::Qr];

/// Guide overlay defaults
pub mod guide {
    /// Width and height of the guide box; zero means no visible guide
    pub const DEFAULT_SIZE: f32 = 0.0;

    /// Stroke width of the guide rectangle
    pub const DEFAULT_LINE_WIDTH: f32 = 1.0;

    /// Seconds for one sweep of the scanning bar
    pub const DEFAULT_ANIMATION_DURATION: f64 = 0.5;

    /// Default guide color (opaque white) as RGBA
    pub const DEFAULT_LINE_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

    /// Alpha stops of the scanning bar gradient, top to bottom
    pub const GRADIENT_ALPHAS: [f32; 5] = [0.5, 0.2, 0.1, 0.05, 0.0];

    /// The bar starts this fraction of the box height below the top edge
    pub const BAR_START_FRACTION: f32 = 0.25;

    /// The bar stops this fraction of the box height above the bottom edge
    pub const BAR_END_FRACTION: f32 = 1.0 / 16.0;
}

/// QR detector tuning
pub mod detector {
    use std::time::Duration;

    /// Frames are downscaled so neither side exceeds this before detection
    pub const DEFAULT_MAX_DIMENSION: u32 = 640;

    /// Minimum time between two detection passes on live capture
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);
}

/// V4L2 capture parameters
pub mod v4l2 {
    /// Directory scanned for video nodes
    pub const DEVICE_DIR: &str = "/dev";

    /// Prefix of video capture device nodes
    pub const DEVICE_PREFIX: &str = "video";

    /// Memory-mapped buffers requested from the driver
    pub const BUFFER_COUNT: u32 = 4;

    /// Requested capture resolution; drivers pick the closest they support
    pub const REQUESTED_WIDTH: u32 = 640;
    pub const REQUESTED_HEIGHT: u32 = 480;

    /// Capture gives up after this many failed dequeues in a row
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 30;
}

/// Controller timing
pub mod timing {
    use std::time::Duration;

    /// How long the CLI waits for the session to confirm it started
    pub const START_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(5);

    /// Pause between images in the file source
    pub const FILE_SOURCE_FRAME_INTERVAL: Duration = Duration::from_millis(33);
}

/// Configuration file location
pub mod config_file {
    /// Directory name under the user's config dir
    pub const APP_DIR: &str = "codescanner";

    /// File name of the JSON configuration
    pub const FILE_NAME: &str = "config.json";
}
