// SPDX-License-Identifier: MPL-2.0

//! Capture platform abstraction
//!
//! The session controller never touches hardware directly. Everything it
//! needs from the operating system (rear-camera capability, authorization,
//! device discovery, building and running a capture session) goes through
//! the [`CapturePlatform`] trait.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  SessionController   │  ← Lifecycle state machine
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ CapturePlatform Trait│  ← Capability provider
//! └──────────┬───────────┘
//!            │
//!     ┌──────┼──────────────┐
//!     ▼      ▼              ▼
//! ┌──────┐ ┌──────────┐ ┌────────┐
//! │ V4L2 │ │FileSource│ │Scripted│
//! └──────┘ └──────────┘ └────────┘
//! ```
//!
//! Platforms report asynchronous facts back through two handles handed to
//! the session when the pipeline is built: a [`SessionObserver`] for the
//! start confirmation and a [`MetadataDelegate`] for decoded frames. Both
//! only enqueue a message for the controller and never block.

pub mod file_source;
pub mod frame_loop;
pub mod scripted;
pub mod types;
pub mod v4l2;

pub use crate::session::{MetadataDelegate, SessionObserver};
pub use types::*;

use tokio::sync::oneshot;

/// Pending answer to a camera permission prompt
///
/// Resolves to `true` when access was granted. A dropped sender counts as a
/// refusal.
pub type AccessRequest = oneshot::Receiver<bool>;

/// Capability provider for camera capture
///
/// Implementations must be cheap to query: the controller calls these on the
/// host's thread.
pub trait CapturePlatform: Send + Sync {
    /// Whether the device class has a rear (scanning) camera at all
    fn has_rear_camera(&self) -> bool;

    /// Current camera authorization
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Prompt the user for camera access
    ///
    /// Only called while the status is `NotDetermined`, and never twice
    /// concurrently by the same controller.
    fn request_access(&self) -> AccessRequest;

    /// The default video capture device, if any
    fn default_video_device(&self) -> Option<CameraDevice>;

    /// Open an input for a capture device
    fn open_input(&self, device: &CameraDevice) -> BackendResult<Box<dyn CaptureInput>>;

    /// Create an empty capture session
    ///
    /// The observer must be used to confirm that the session started running.
    fn create_session(&self, observer: SessionObserver) -> Box<dyn CaptureSession>;

    /// Symbol types the platform decoder can report
    fn available_symbol_types(&self) -> SymbolSet {
        SymbolType::ALL.into_iter().collect()
    }

    /// Human readable backend name for logs
    fn name(&self) -> &'static str;
}

/// An opened capture device
pub trait CaptureInput: Send {
    /// The device this input reads from
    fn device(&self) -> &CameraDevice;
}

/// A capture session connecting one input to a metadata output
///
/// `start_running` and `stop_running` are synchronous and may be slow; the
/// controller calls `start_running` from its background worker.
pub trait CaptureSession: Send {
    /// Whether the session would accept this input
    fn can_add_input(&self, input: &dyn CaptureInput) -> bool;

    /// Attach the input. Callers check `can_add_input` first.
    fn add_input(&mut self, input: Box<dyn CaptureInput>);

    /// Whether the session would accept a metadata output
    fn can_add_metadata_output(&self) -> bool;

    /// Attach a metadata output reporting the given symbol types
    fn add_metadata_output(&mut self, symbol_types: &SymbolSet, delegate: MetadataDelegate);

    /// Start capture. Confirmation arrives through the session observer.
    fn start_running(&mut self) -> BackendResult<()>;

    /// Stop capture. Returns once no more frames are delivered.
    fn stop_running(&mut self);

    /// Whether the session is currently running
    fn is_running(&self) -> bool;
}
