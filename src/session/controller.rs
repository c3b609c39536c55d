// SPDX-License-Identifier: GPL-3.0-only

//! Session controller
//!
//! Drives one capture session through its lifecycle:
//!
//! ```text
//! Idle ──visible──▶ RequestingPermission ──granted──▶ Configuring ──started──▶ Running
//!   │                      │                              │
//!   │                      └──refused──▶ PermissionDenied └──refused──▶ Unsupported
//!   └──authorized───────────────────────────────▶ Configuring
//!
//! any ──hidden──▶ Stopped   (PermissionDenied and Unsupported stay as they are)
//! ```
//!
//! All methods run on the host's thread. Slow platform calls happen on a
//! background worker and come back as [`ControllerEvent`]s, which the host
//! feeds in through [`SessionController::process_next`] or
//! [`SessionController::process_pending`].

use super::observer::{NoopObserver, ScannerObserver};
use super::pipeline::{Pipeline, lock_slot};
use super::sink::ScanResultSink;
use super::state::{ControllerEvent, SessionFlags, SessionState};
use super::worker::SessionWorker;
use crate::backends::{
    AccessRequest, AuthorizationStatus, CameraDevice, CapturePlatform, MetadataObject,
};
use crate::config::{FailureMessage, GuideStyle, ReconfigurePolicy, SessionConfig};
use crate::errors::{ConfigError, ConfigResult, ScanFailure, UnsupportedReason};
use crate::overlay::{GuideOverlay, PreviewSurface, Rect};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

const WORKER_THREAD_NAME: &str = "scanner-session";

/// Host-bound observable values
///
/// Each field is a read-only view; only the controller writes them.
#[derive(Debug, Clone)]
pub struct ScannerBindings {
    pub scan_result: watch::Receiver<Option<String>>,
    pub is_scanned: watch::Receiver<bool>,
    pub status: watch::Receiver<SessionFlags>,
}

impl ScannerBindings {
    pub fn scan_result(&self) -> Option<String> {
        self.scan_result.borrow().clone()
    }

    pub fn is_scanned(&self) -> bool {
        *self.is_scanned.borrow()
    }

    pub fn flags(&self) -> SessionFlags {
        *self.status.borrow()
    }
}

enum Incoming {
    Access(bool),
    Event(ControllerEvent),
}

/// Owns one capture session and its state machine
pub struct SessionController {
    id: Uuid,
    platform: Arc<dyn CapturePlatform>,
    observer: Box<dyn ScannerObserver>,
    config: Option<SessionConfig>,
    state: SessionState,
    visible: bool,
    /// Bumped on every visibility change; async results from older tickets
    /// are dropped
    ticket: u64,
    next_pipeline_id: u64,
    pipeline: Option<Pipeline>,
    pending_access: Option<AccessRequest>,
    is_scanner_supported: bool,
    last_failure: Option<ScanFailure>,
    preview: Option<PreviewSurface>,
    overlay: Option<GuideOverlay>,
    overlay_generation: u64,
    sink: ScanResultSink,
    status: watch::Sender<SessionFlags>,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    worker: Option<SessionWorker>,
}

impl SessionController {
    pub fn new(platform: Arc<dyn CapturePlatform>) -> Self {
        Self::with_id(Uuid::new_v4(), platform)
    }

    pub fn with_id(id: Uuid, platform: Arc<dyn CapturePlatform>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SessionFlags::default());
        debug!(controller = %id, backend = platform.name(), "Session controller created");

        Self {
            id,
            platform,
            observer: Box::new(NoopObserver),
            config: None,
            state: SessionState::Idle,
            visible: false,
            ticket: 0,
            next_pipeline_id: 0,
            pipeline: None,
            pending_access: None,
            is_scanner_supported: false,
            last_failure: None,
            preview: None,
            overlay: None,
            overlay_generation: 0,
            sink: ScanResultSink::default(),
            status,
            events_tx,
            events_rx,
            worker: None,
        }
    }

    pub fn with_observer(mut self, observer: impl ScannerObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn set_observer(&mut self, observer: impl ScannerObserver + 'static) {
        self.observer = Box::new(observer);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn flags(&self) -> SessionFlags {
        SessionFlags::project(self.state)
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether a pipeline was built successfully at least once since the
    /// last failure
    pub fn is_scanner_supported(&self) -> bool {
        self.is_scanner_supported
    }

    pub fn last_failure(&self) -> Option<&ScanFailure> {
        self.last_failure.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewSurface> {
        self.preview.as_ref()
    }

    pub fn guide_overlay(&self) -> Option<&GuideOverlay> {
        self.overlay.as_ref()
    }

    /// Id of the current pipeline, if one is built
    pub fn pipeline_id(&self) -> Option<u64> {
        self.pipeline.as_ref().map(|p| p.id)
    }

    /// Device the current pipeline captures from
    pub fn device(&self) -> Option<&CameraDevice> {
        self.pipeline.as_ref().map(|p| &p.device)
    }

    /// Whether the platform session itself reports running
    pub fn is_capture_running(&self) -> bool {
        self.pipeline.as_ref().is_some_and(Pipeline::is_running)
    }

    pub fn has_pending_access_request(&self) -> bool {
        self.pending_access.is_some()
    }

    /// Subscribe to the host-bound values
    pub fn bindings(&self) -> ScannerBindings {
        ScannerBindings {
            scan_result: self.sink.subscribe_result(),
            is_scanned: self.sink.subscribe_scanned(),
            status: self.status.subscribe(),
        }
    }

    /// Bind a configuration
    ///
    /// Attaching an identical configuration changes nothing, except that a
    /// closed one-shot sink is re-armed and a failed session becomes `Idle`
    /// again. Once a pipeline exists, changes to symbol types, guide size or
    /// discipline follow the configured [`ReconfigurePolicy`]; every other
    /// field is always applied.
    pub fn attach(&mut self, config: SessionConfig) -> ConfigResult<()> {
        config.validate()?;

        let Some(current) = self.config.as_mut() else {
            info!(
                controller = %self.id,
                symbols = config.symbol_types.len(),
                discipline = ?config.discipline,
                "Configuration attached"
            );
            if !config.scanning_enabled() {
                warn!(controller = %self.id, "No symbol types accepted, scanning disabled");
            }
            self.sink.reconfigure(&config);
            self.config = Some(config);
            return Ok(());
        };

        if *current == config {
            trace!(controller = %self.id, "Identical configuration attached");
            self.sink.rearm();
            self.clear_failure();
            return Ok(());
        }

        if self.pipeline.is_some()
            && let Some(field) = current.frozen_change(&config)
        {
            match current.reconfigure {
                ReconfigurePolicy::FrozenOnBuild => {
                    current.apply_display_fields(&config);
                    warn!(
                        controller = %self.id,
                        field,
                        "Rejected change to a field fixed at build time"
                    );
                    return Err(ConfigError::FrozenAfterBuild(field));
                }
                ReconfigurePolicy::RebuildPipeline => {
                    info!(controller = %self.id, field, "Rebuilding capture pipeline");
                    self.rebuild_with(config);
                    return Ok(());
                }
            }
        }

        *current = config;
        self.sink.reconfigure(current);
        self.sink.rearm();
        debug!(controller = %self.id, "Configuration updated");
        self.clear_failure();
        Ok(())
    }

    /// Change the display-only guide fields
    ///
    /// Takes effect on the next [`layout_changed`](Self::layout_changed).
    pub fn set_guide_style(&mut self, style: GuideStyle) -> ConfigResult<()> {
        style.validate()?;
        let config = self.config.as_mut().ok_or(ConfigError::NotAttached)?;
        config.guide.apply_style(&style);
        debug!(controller = %self.id, color = %style.line_color.to_hex(), "Guide style updated");
        Ok(())
    }

    /// The view appeared
    pub fn become_visible(&mut self) {
        if self.config.is_none() {
            warn!(controller = %self.id, "Became visible before a configuration was attached");
            return;
        }
        if self.visible {
            trace!(controller = %self.id, "Already visible");
            return;
        }

        self.visible = true;
        self.ticket += 1;
        debug!(controller = %self.id, ticket = self.ticket, state = %self.state, "Became visible");

        if self.state == SessionState::Unsupported {
            debug!(
                controller = %self.id,
                "Scanning unsupported until a configuration is attached again"
            );
            return;
        }

        if !self.platform.has_rear_camera() {
            self.scanning_unsupported_error(UnsupportedReason::NoRearCamera);
            return;
        }

        self.check_camera_access();
    }

    /// The view disappeared
    ///
    /// Stops the session synchronously. A start still queued on the worker
    /// will not run.
    pub fn become_hidden(&mut self) {
        if !self.visible {
            trace!(controller = %self.id, "Already hidden");
            return;
        }

        self.visible = false;
        self.ticket += 1;
        if let Some(pipeline) = &self.pipeline {
            pipeline.stop(self.ticket);
        }
        self.overlay = None;

        if !self.state.is_failure() {
            self.set_state(SessionState::Stopped);
        }
        debug!(controller = %self.id, ticket = self.ticket, "Became hidden");
    }

    /// The view bounds changed
    pub fn layout_changed(&mut self, bounds: Rect) {
        match &mut self.preview {
            Some(preview) => preview.relayout(bounds),
            None => self.preview = Some(PreviewSurface::new(bounds)),
        }

        if self.state == SessionState::Running {
            self.rebuild_overlay();
        }
    }

    /// Tear down the view for good
    pub fn dismantle(&mut self) {
        self.become_hidden();
        self.drop_pipeline();
        self.pending_access = None;
        self.preview = None;
        debug!(controller = %self.id, "Dismantled");
    }

    /// Report that scanning is not possible
    ///
    /// Tears down any pipeline, moves to `Unsupported` and notifies the
    /// observer once.
    pub fn scanning_unsupported_error(&mut self, reason: UnsupportedReason) {
        if self.state == SessionState::Unsupported {
            debug!(controller = %self.id, %reason, "Already unsupported");
            return;
        }

        warn!(controller = %self.id, %reason, "Scanning not supported");
        self.drop_pipeline();
        self.is_scanner_supported = false;
        self.overlay = None;
        self.last_failure = Some(ScanFailure::Unsupported(reason));
        self.set_state(SessionState::Unsupported);

        let message = self
            .config
            .as_ref()
            .map(SessionConfig::unsupported_message)
            .unwrap_or_else(FailureMessage::unsupported_default);
        self.observer.camera_not_supported(&message);
    }

    /// Apply one asynchronous event
    pub fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::SessionStarted { ticket } => {
                if ticket != self.ticket
                    || !self.visible
                    || self.state != SessionState::Configuring
                {
                    debug!(
                        controller = %self.id,
                        ticket,
                        current = self.ticket,
                        state = %self.state,
                        "Dropping stale start confirmation"
                    );
                    return;
                }
                self.set_state(SessionState::Running);
                info!(controller = %self.id, "Capture session running");
                self.rebuild_overlay();
                self.observer.session_started();
            }
            ControllerEvent::StartFailed { ticket, error } => {
                if ticket != self.ticket || !self.visible {
                    debug!(controller = %self.id, ticket, %error, "Dropping stale start failure");
                    return;
                }
                self.scanning_unsupported_error(UnsupportedReason::StartFailed(error.to_string()));
            }
            ControllerEvent::Interrupted { ticket, error } => {
                if ticket != self.ticket || !self.visible {
                    debug!(controller = %self.id, ticket, %error, "Dropping stale interruption");
                    return;
                }
                self.scanning_unsupported_error(UnsupportedReason::Interrupted(error.to_string()));
            }
            ControllerEvent::Metadata {
                pipeline,
                ticket,
                objects,
            } => {
                self.metadata_received(pipeline, ticket, &objects);
            }
        }
    }

    /// Apply everything that is ready without waiting
    ///
    /// Returns the number of events applied.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;

        if let Some(request) = self.pending_access.as_mut() {
            match request.try_recv() {
                Ok(granted) => {
                    self.access_resolved(granted);
                    handled += 1;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.access_resolved(false);
                    handled += 1;
                }
            }
        }

        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }

        handled
    }

    /// Wait for the next event or permission answer and apply it
    ///
    /// Returns `false` if the event channel closed.
    pub async fn process_next(&mut self) -> bool {
        let incoming = match self.pending_access.as_mut() {
            Some(request) => tokio::select! {
                answer = request => Incoming::Access(answer.unwrap_or(false)),
                event = self.events_rx.recv() => match event {
                    Some(event) => Incoming::Event(event),
                    None => return false,
                },
            },
            None => match self.events_rx.recv().await {
                Some(event) => Incoming::Event(event),
                None => return false,
            },
        };

        match incoming {
            Incoming::Access(granted) => self.access_resolved(granted),
            Incoming::Event(event) => self.handle_event(event),
        }
        true
    }

    fn check_camera_access(&mut self) {
        match self.platform.authorization_status() {
            AuthorizationStatus::Authorized => self.setup_scanner(),
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                self.camera_access_denied()
            }
            AuthorizationStatus::NotDetermined => {
                self.set_state(SessionState::RequestingPermission);
                if self.pending_access.is_some() {
                    debug!(controller = %self.id, "Camera access request already pending");
                    return;
                }
                info!(controller = %self.id, "Requesting camera access");
                self.pending_access = Some(self.platform.request_access());
            }
        }
    }

    fn access_resolved(&mut self, granted: bool) {
        self.pending_access = None;
        if !self.visible || self.state != SessionState::RequestingPermission {
            debug!(
                controller = %self.id,
                granted,
                state = %self.state,
                "Ignoring camera access answer for an inactive session"
            );
            return;
        }

        info!(controller = %self.id, granted, "Camera access answered");
        if granted {
            self.setup_scanner();
        } else {
            self.camera_access_denied();
        }
    }

    fn camera_access_denied(&mut self) {
        info!(controller = %self.id, "Camera access denied");
        self.last_failure = Some(ScanFailure::PermissionDenied);
        self.set_state(SessionState::PermissionDenied);
        self.observer.no_camera_access(&FailureMessage::access_denied_default());
    }

    fn setup_scanner(&mut self) {
        self.set_state(SessionState::Configuring);

        if self.pipeline.is_none() {
            let Some(config) = &self.config else {
                return;
            };
            self.next_pipeline_id += 1;
            let built = Pipeline::build(
                self.platform.as_ref(),
                self.next_pipeline_id,
                &config.symbol_types,
                &self.events_tx,
            );
            match built {
                Ok(pipeline) => {
                    self.pipeline = Some(pipeline);
                    self.is_scanner_supported = true;
                }
                Err(reason) => {
                    self.scanning_unsupported_error(reason);
                    return;
                }
            }
        }

        self.start_capture();
    }

    fn start_capture(&mut self) {
        if self.worker.is_none() {
            match SessionWorker::spawn(WORKER_THREAD_NAME) {
                Ok(worker) => self.worker = Some(worker),
                Err(e) => {
                    self.scanning_unsupported_error(UnsupportedReason::StartFailed(e.to_string()));
                    return;
                }
            }
        }

        let (Some(worker), Some(pipeline)) = (&self.worker, &self.pipeline) else {
            return;
        };

        let ticket = self.ticket;
        pipeline.arm(ticket);

        let pipeline_id = pipeline.id;
        let slot = Arc::clone(&pipeline.slot);
        let live_ticket = Arc::clone(&pipeline.live_ticket);
        let events = self.events_tx.clone();

        let queued = worker.dispatch(move || {
            let mut slot = lock_slot(&slot);
            if slot.ticket != ticket {
                debug!(pipeline = pipeline_id, ticket, "Skipping superseded session start");
                return;
            }
            live_ticket.store(ticket, Ordering::Release);
            if slot.session.is_running() {
                let _ = events.send(ControllerEvent::SessionStarted { ticket });
                return;
            }

            match slot.session.start_running() {
                Ok(()) => debug!(pipeline = pipeline_id, ticket, "Session start requested"),
                Err(error) => {
                    warn!(pipeline = pipeline_id, %error, "Session failed to start");
                    let _ = events.send(ControllerEvent::StartFailed { ticket, error });
                }
            }
        });

        if !queued {
            self.scanning_unsupported_error(UnsupportedReason::StartFailed(
                "session worker stopped".into(),
            ));
        }
    }

    fn metadata_received(&mut self, pipeline: u64, ticket: u64, objects: &[MetadataObject]) {
        let active = self.visible
            && ticket == self.ticket
            && self.pipeline_id() == Some(pipeline)
            && matches!(self.state, SessionState::Configuring | SessionState::Running);
        if !active {
            trace!(
                controller = %self.id,
                pipeline,
                ticket,
                current = self.ticket,
                "Dropping metadata from an inactive pipeline"
            );
            return;
        }

        if let Some(event) = self.sink.receive(objects) {
            self.observer.code_scanned(&event);
        }
    }

    fn rebuild_overlay(&mut self) {
        let (Some(config), Some(preview)) = (&self.config, &self.preview) else {
            self.overlay = None;
            return;
        };
        self.overlay_generation += 1;
        self.overlay = GuideOverlay::build(preview.bounds, &config.guide, self.overlay_generation);
        trace!(
            controller = %self.id,
            generation = self.overlay_generation,
            built = self.overlay.is_some(),
            "Guide overlay rebuilt"
        );
    }

    fn rebuild_with(&mut self, config: SessionConfig) {
        let was_visible = self.visible;
        self.become_hidden();
        self.drop_pipeline();

        self.sink.reconfigure(&config);
        self.sink.rearm();
        self.config = Some(config);
        self.clear_failure();

        if was_visible {
            self.become_visible();
        }
    }

    /// Leave a failure state after a new attach
    fn clear_failure(&mut self) {
        if !self.state.is_failure() {
            return;
        }
        info!(controller = %self.id, state = %self.state, "Clearing failure after attach");
        self.last_failure = None;
        self.set_state(SessionState::Idle);

        if self.visible {
            // Run the visibility checks again for the new configuration
            self.visible = false;
            self.become_visible();
        }
    }

    fn drop_pipeline(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            self.ticket += 1;
            pipeline.stop(self.ticket);
            debug!(controller = %self.id, pipeline = pipeline.id, "Capture pipeline released");
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(controller = %self.id, from = %self.state, to = %state, "Session state changed");
        }
        self.state = state;
        self.status.send_replace(SessionFlags::project(state));
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.drop_pipeline();
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.id)
            .field("backend", &self.platform.name())
            .field("state", &self.state)
            .field("visible", &self.visible)
            .field("pipeline", &self.pipeline_id())
            .finish()
    }
}
