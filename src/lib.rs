// SPDX-License-Identifier: MPL-2.0

//! codescanner - an embeddable camera scanner component
//!
//! A host view embeds a live camera preview; the library reports decoded
//! barcode and QR values as they are recognized.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`]: The session controller state machine and result sink
//! - [`backends`]: Capture platform abstraction (V4L2, image files, scripted)
//! - [`bridge`]: Props diffing and stable controllers for declarative hosts
//! - [`overlay`]: Preview and scanning-guide layout
//! - [`frame_processor`]: Grayscale conversion and QR detection
//! - [`config`]: Session and command-line configuration
//!
//! # Example
//!
//! ```ignore
//! let platform = Arc::new(V4l2Platform::new());
//! let mut controller = SessionController::new(platform);
//! let bindings = controller.bindings();
//!
//! controller.attach(SessionConfig::default())?;
//! controller.become_visible();
//! while controller.process_next().await {
//!     if let Some(code) = bindings.scan_result() {
//!         println!("{code}");
//!     }
//! }
//! ```

pub mod backends;
pub mod bridge;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod i18n;
pub mod overlay;
pub mod session;

// Re-export commonly used types
pub use backends::{CapturePlatform, MetadataObject, SymbolType};
pub use bridge::{ScannerHost, ScannerProps};
pub use config::{Config, ResultDiscipline, SessionConfig};
pub use errors::{AppError, AppResult, ConfigError, ScanFailure};
pub use session::{ScannerBindings, ScannerObserver, SessionController, SessionState};
