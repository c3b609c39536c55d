// SPDX-License-Identifier: GPL-3.0-only

//! Scripted capture platform
//!
//! A platform whose every answer is set up front: camera presence,
//! authorization, the user's answer to the permission prompt, which pipeline
//! steps succeed, and when a started session confirms. Frames are injected
//! by hand with [`ScriptedPlatform::emit_metadata`]. It counts every call
//! the controller makes so lifecycle properties can be asserted exactly.
//!
//! Clones share state, so a test keeps one handle while the controller owns
//! another.

use super::{
    AccessRequest, AuthorizationStatus, BackendError, BackendResult, CameraDevice, CameraLocation,
    CaptureInput, CapturePlatform, CaptureSession, MetadataDelegate, MetadataObject,
    SessionObserver, SymbolSet, SymbolType,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::debug;

/// How the user answers the permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessAnswer {
    #[default]
    Grant,
    Deny,
    /// Keep the prompt open until [`ScriptedPlatform::resolve_access`]
    Hold,
}

/// When a started session confirms that it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartConfirmation {
    /// Inside `start_running`
    #[default]
    Immediate,
    /// On [`ScriptedPlatform::confirm_start`]
    Deferred,
}

/// Number of platform calls made so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptCounters {
    pub prompts: usize,
    pub inputs_opened: usize,
    pub sessions_created: usize,
    pub outputs_added: usize,
    pub starts: usize,
    pub stops: usize,
}

struct SessionRecord {
    observer: SessionObserver,
    delegate: Option<MetadataDelegate>,
    requested: SymbolSet,
    running: bool,
}

struct ScriptState {
    rear_camera: bool,
    status: AuthorizationStatus,
    answer: AccessAnswer,
    device: Option<CameraDevice>,
    accept_input: bool,
    accept_output: bool,
    start_error: Option<String>,
    confirmation: StartConfirmation,
    available: SymbolSet,
    held: Vec<oneshot::Sender<bool>>,
    sessions: Vec<SessionRecord>,
    counters: ScriptCounters,
}

/// Capture platform driven entirely by the caller
#[derive(Clone)]
pub struct ScriptedPlatform {
    state: Arc<Mutex<ScriptState>>,
}

impl Default for ScriptedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptedPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ScriptedPlatform")
            .field("status", &state.status)
            .field("sessions", &state.sessions.len())
            .field("counters", &state.counters)
            .finish()
    }
}

impl ScriptedPlatform {
    /// A device with an authorized rear camera where everything succeeds
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                rear_camera: true,
                status: AuthorizationStatus::Authorized,
                answer: AccessAnswer::Grant,
                device: Some(CameraDevice {
                    name: "Scripted Camera".into(),
                    path: "/dev/scripted0".into(),
                    location: CameraLocation::Back,
                }),
                accept_input: true,
                accept_output: true,
                start_error: None,
                confirmation: StartConfirmation::Immediate,
                available: SymbolType::ALL.into_iter().collect(),
                held: Vec::new(),
                sessions: Vec::new(),
                counters: ScriptCounters::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_rear_camera(self, present: bool) -> Self {
        self.lock().rear_camera = present;
        self
    }

    pub fn with_authorization(self, status: AuthorizationStatus) -> Self {
        self.lock().status = status;
        self
    }

    pub fn with_access_answer(self, answer: AccessAnswer) -> Self {
        self.lock().answer = answer;
        self
    }

    pub fn without_video_device(self) -> Self {
        self.lock().device = None;
        self
    }

    pub fn rejecting_input(self) -> Self {
        self.lock().accept_input = false;
        self
    }

    pub fn rejecting_output(self) -> Self {
        self.lock().accept_output = false;
        self
    }

    pub fn failing_start(self, message: impl Into<String>) -> Self {
        self.lock().start_error = Some(message.into());
        self
    }

    pub fn with_start_confirmation(self, confirmation: StartConfirmation) -> Self {
        self.lock().confirmation = confirmation;
        self
    }

    pub fn with_available_symbol_types(
        self,
        symbol_types: impl IntoIterator<Item = SymbolType>,
    ) -> Self {
        self.lock().available = symbol_types.into_iter().collect();
        self
    }

    /// Change the authorization seen by the next check
    pub fn set_authorization(&self, status: AuthorizationStatus) {
        self.lock().status = status;
    }

    /// Answer every held permission prompt
    ///
    /// Returns the number of prompts answered.
    pub fn resolve_access(&self, granted: bool) -> usize {
        let held = {
            let mut state = self.lock();
            state.status = if granted {
                AuthorizationStatus::Authorized
            } else {
                AuthorizationStatus::Denied
            };
            std::mem::take(&mut state.held)
        };
        let count = held.len();
        for sender in held {
            let _ = sender.send(granted);
        }
        count
    }

    /// Abandon every held permission prompt without answering
    pub fn drop_access_requests(&self) -> usize {
        let held = std::mem::take(&mut self.lock().held);
        held.len()
    }

    /// Confirm the most recent session if it is running
    pub fn confirm_start(&self) -> bool {
        let observer = {
            let state = self.lock();
            match state.sessions.last() {
                Some(record) if record.running => record.observer.clone(),
                _ => return false,
            }
        };
        observer.did_start_running();
        true
    }

    /// Stop the most recent session as if the device went away
    ///
    /// Returns false if that session was not running.
    pub fn interrupt(&self, message: impl Into<String>) -> bool {
        let observer = {
            let mut state = self.lock();
            match state.sessions.last_mut() {
                Some(record) if record.running => {
                    record.running = false;
                    record.observer.clone()
                }
                _ => return false,
            }
        };
        observer.was_interrupted(BackendError::Other(message.into()));
        true
    }

    /// Deliver a batch through the most recent session's metadata output
    ///
    /// Returns false if that session has no output or is not running.
    pub fn emit_metadata(&self, objects: Vec<MetadataObject>) -> bool {
        let delegate = {
            let state = self.lock();
            match state.sessions.last() {
                Some(SessionRecord {
                    delegate: Some(delegate),
                    running: true,
                    ..
                }) => delegate.clone(),
                _ => return false,
            }
        };
        delegate.metadata_output(objects);
        true
    }

    /// Deliver a batch through the output of session `index`, running or not
    ///
    /// Simulates a frame that was already in flight when the session stopped.
    pub fn emit_metadata_from(&self, index: usize, objects: Vec<MetadataObject>) -> bool {
        let delegate = self
            .lock()
            .sessions
            .get(index)
            .and_then(|record| record.delegate.clone());
        match delegate {
            Some(delegate) => {
                delegate.metadata_output(objects);
                true
            }
            None => false,
        }
    }

    pub fn counters(&self) -> ScriptCounters {
        self.lock().counters
    }

    /// Whether the most recent session is running
    pub fn is_running(&self) -> bool {
        self.lock().sessions.last().is_some_and(|record| record.running)
    }

    /// Symbol types requested by the most recent metadata output
    pub fn requested_symbol_types(&self) -> Option<SymbolSet> {
        self.lock()
            .sessions
            .iter()
            .rev()
            .find(|record| record.delegate.is_some())
            .map(|record| record.requested.clone())
    }

    pub fn pending_prompts(&self) -> usize {
        self.lock().held.len()
    }
}

impl CapturePlatform for ScriptedPlatform {
    fn has_rear_camera(&self) -> bool {
        self.lock().rear_camera
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        self.lock().status
    }

    fn request_access(&self) -> AccessRequest {
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock();
        state.counters.prompts += 1;
        match state.answer {
            AccessAnswer::Grant => {
                state.status = AuthorizationStatus::Authorized;
                let _ = tx.send(true);
            }
            AccessAnswer::Deny => {
                state.status = AuthorizationStatus::Denied;
                let _ = tx.send(false);
            }
            AccessAnswer::Hold => state.held.push(tx),
        }
        rx
    }

    fn default_video_device(&self) -> Option<CameraDevice> {
        self.lock().device.clone()
    }

    fn open_input(&self, device: &CameraDevice) -> BackendResult<Box<dyn CaptureInput>> {
        self.lock().counters.inputs_opened += 1;
        Ok(Box::new(ScriptedInput {
            device: device.clone(),
        }))
    }

    fn create_session(&self, observer: SessionObserver) -> Box<dyn CaptureSession> {
        let mut state = self.lock();
        state.counters.sessions_created += 1;
        let index = state.sessions.len();
        state.sessions.push(SessionRecord {
            observer,
            delegate: None,
            requested: SymbolSet::new(),
            running: false,
        });
        debug!(index, "Scripted session created");
        Box::new(ScriptedSession {
            platform: self.clone(),
            index,
            has_input: false,
        })
    }

    fn available_symbol_types(&self) -> SymbolSet {
        self.lock().available.clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedInput {
    device: CameraDevice,
}

impl CaptureInput for ScriptedInput {
    fn device(&self) -> &CameraDevice {
        &self.device
    }
}

struct ScriptedSession {
    platform: ScriptedPlatform,
    index: usize,
    has_input: bool,
}

impl ScriptedSession {
    fn record<R>(&self, f: impl FnOnce(&mut SessionRecord) -> R) -> R {
        let mut state = self.platform.lock();
        f(&mut state.sessions[self.index])
    }
}

impl CaptureSession for ScriptedSession {
    fn can_add_input(&self, _input: &dyn CaptureInput) -> bool {
        !self.has_input && self.platform.lock().accept_input
    }

    fn add_input(&mut self, _input: Box<dyn CaptureInput>) {
        self.has_input = true;
    }

    fn can_add_metadata_output(&self) -> bool {
        self.platform.lock().accept_output
    }

    fn add_metadata_output(&mut self, symbol_types: &SymbolSet, delegate: MetadataDelegate) {
        self.platform.lock().counters.outputs_added += 1;
        self.record(|record| {
            record.delegate = Some(delegate);
            record.requested = symbol_types.clone();
        });
    }

    fn start_running(&mut self) -> BackendResult<()> {
        let (error, confirmation) = {
            let mut state = self.platform.lock();
            state.counters.starts += 1;
            (state.start_error.clone(), state.confirmation)
        };
        if let Some(message) = error {
            return Err(BackendError::StartFailed(message));
        }

        let observer = self.record(|record| {
            record.running = true;
            record.observer.clone()
        });
        if confirmation == StartConfirmation::Immediate {
            observer.did_start_running();
        }
        Ok(())
    }

    fn stop_running(&mut self) {
        self.platform.lock().counters.stops += 1;
        self.record(|record| record.running = false);
    }

    fn is_running(&self) -> bool {
        self.record(|record| record.running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_prompt_resolves_on_demand() {
        let platform = ScriptedPlatform::new()
            .with_authorization(AuthorizationStatus::NotDetermined)
            .with_access_answer(AccessAnswer::Hold);

        let mut request = platform.request_access();
        assert!(request.try_recv().is_err());
        assert_eq!(platform.pending_prompts(), 1);

        assert_eq!(platform.resolve_access(true), 1);
        assert_eq!(request.try_recv(), Ok(true));
        assert_eq!(platform.authorization_status(), AuthorizationStatus::Authorized);
    }

    #[test]
    fn test_rejected_input_is_refused_by_session() {
        let platform = ScriptedPlatform::new().rejecting_input();
        let device = platform.default_video_device().unwrap();
        let input = platform.open_input(&device).unwrap();

        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let observer = SessionObserver::new(tx, Arc::default());
        let session = platform.create_session(observer);
        assert!(!session.can_add_input(input.as_ref()));
        assert_eq!(platform.counters().sessions_created, 1);
    }
}
