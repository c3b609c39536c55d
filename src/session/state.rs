// SPDX-License-Identifier: GPL-3.0-only

//! Session state and the host-visible projection of it

use crate::backends::{BackendError, MetadataObject};

/// Lifecycle state of a capture session
///
/// Owned by the controller. Hosts only ever see [`SessionFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Attached or freshly created, nothing requested yet
    #[default]
    Idle,
    /// Waiting for the user to answer the camera permission prompt
    RequestingPermission,
    /// Camera access refused or restricted
    PermissionDenied,
    /// No usable camera, or the platform refused the pipeline
    Unsupported,
    /// Pipeline built, waiting for the platform to confirm the start
    Configuring,
    /// The platform confirmed the session is running
    Running,
    /// The view was hidden
    Stopped,
}

impl SessionState {
    /// States that only a new `attach` (or, for permission, a new
    /// visibility cycle) can leave
    pub fn is_failure(&self) -> bool {
        matches!(self, SessionState::PermissionDenied | SessionState::Unsupported)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::RequestingPermission => "requesting-permission",
            SessionState::PermissionDenied => "permission-denied",
            SessionState::Unsupported => "unsupported",
            SessionState::Configuring => "configuring",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Read-only booleans derived from [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFlags {
    pub is_session_started: bool,
    pub is_camera_supported: bool,
    pub has_camera_access: bool,
}

impl SessionFlags {
    /// Project a state onto the host-visible flags
    pub fn project(state: SessionState) -> Self {
        Self {
            is_session_started: state == SessionState::Running,
            is_camera_supported: state != SessionState::Unsupported,
            has_camera_access: state != SessionState::PermissionDenied,
        }
    }
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self::project(SessionState::default())
    }
}

/// Asynchronous facts delivered to the controller
///
/// Produced by the platform handles and the background worker, consumed on
/// the host's thread by [`SessionController::handle_event`]. Every event
/// carries the ticket or pipeline id it belongs to so superseded ones can be
/// dropped.
///
/// [`SessionController::handle_event`]: super::SessionController::handle_event
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// The platform confirmed that the session started running
    SessionStarted { ticket: u64 },
    /// The background start failed
    StartFailed { ticket: u64, error: BackendError },
    /// A running session stopped without being asked to
    Interrupted { ticket: u64, error: BackendError },
    /// A metadata batch from the frame-delivery path
    Metadata {
        pipeline: u64,
        /// Ticket the session was started under when the frame was delivered
        ticket: u64,
        objects: Vec<MetadataObject>,
    },
}
