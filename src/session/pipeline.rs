// SPDX-License-Identifier: GPL-3.0-only

//! Capture pipeline ownership
//!
//! A pipeline is one capture session with its input and metadata output.
//! The session sits behind a mutex together with the ticket it may run
//! under; the controller bumps that ticket whenever it stops the session, so
//! a start job queued earlier finds a stale ticket and does nothing.

use super::state::ControllerEvent;
use crate::backends::{
    BackendError, CameraDevice, CapturePlatform, CaptureSession, MetadataObject, SymbolSet,
};
use crate::errors::UnsupportedReason;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace};

/// Handle given to a metadata output for reporting decoded frames
///
/// Cheap to clone and safe to call from any thread. It only enqueues the
/// batch, stamped with the ticket of the current start; filtering happens on
/// the controller's side.
#[derive(Debug, Clone)]
pub struct MetadataDelegate {
    pipeline: u64,
    live_ticket: Arc<AtomicU64>,
    events: UnboundedSender<ControllerEvent>,
}

impl MetadataDelegate {
    pub(crate) fn new(
        pipeline: u64,
        live_ticket: Arc<AtomicU64>,
        events: UnboundedSender<ControllerEvent>,
    ) -> Self {
        Self {
            pipeline,
            live_ticket,
            events,
        }
    }

    /// Report the metadata objects found in one frame
    pub fn metadata_output(&self, objects: Vec<MetadataObject>) {
        let event = ControllerEvent::Metadata {
            pipeline: self.pipeline,
            ticket: self.live_ticket.load(Ordering::Acquire),
            objects,
        };
        if self.events.send(event).is_err() {
            trace!(pipeline = self.pipeline, "Controller gone, dropping metadata");
        }
    }

    pub fn pipeline_id(&self) -> u64 {
        self.pipeline
    }
}

/// Handle given to a capture session for confirming that it started
#[derive(Debug, Clone)]
pub struct SessionObserver {
    events: UnboundedSender<ControllerEvent>,
    live_ticket: Arc<AtomicU64>,
}

impl SessionObserver {
    pub(crate) fn new(
        events: UnboundedSender<ControllerEvent>,
        live_ticket: Arc<AtomicU64>,
    ) -> Self {
        Self { events, live_ticket }
    }

    /// Confirm that the most recent `start_running` took effect
    pub fn did_start_running(&self) {
        let ticket = self.live_ticket.load(Ordering::Acquire);
        if self
            .events
            .send(ControllerEvent::SessionStarted { ticket })
            .is_err()
        {
            trace!(ticket, "Controller gone, dropping start confirmation");
        }
    }

    /// Report that a running session stopped without a stop request
    pub fn was_interrupted(&self, error: BackendError) {
        let ticket = self.live_ticket.load(Ordering::Acquire);
        if self
            .events
            .send(ControllerEvent::Interrupted { ticket, error })
            .is_err()
        {
            trace!(ticket, "Controller gone, dropping interruption");
        }
    }
}

/// The session and the ticket it may start under
pub(crate) struct PipelineSlot {
    pub session: Box<dyn CaptureSession>,
    pub ticket: u64,
}

pub(crate) fn lock_slot(slot: &Mutex<PipelineSlot>) -> MutexGuard<'_, PipelineSlot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// A fully built capture pipeline
pub(crate) struct Pipeline {
    pub id: u64,
    pub device: CameraDevice,
    pub slot: Arc<Mutex<PipelineSlot>>,
    /// Ticket of the most recent start, read by the session observer
    pub live_ticket: Arc<AtomicU64>,
}

impl Pipeline {
    /// Build a pipeline: device, input, session, metadata output
    ///
    /// Any refusal aborts the build; nothing partial is kept.
    pub fn build(
        platform: &dyn CapturePlatform,
        id: u64,
        symbol_types: &SymbolSet,
        events: &UnboundedSender<ControllerEvent>,
    ) -> Result<Self, UnsupportedReason> {
        let device = platform
            .default_video_device()
            .ok_or(UnsupportedReason::NoVideoDevice)?;
        debug!(pipeline = id, device = %device.name, path = %device.path, "Using capture device");

        let input = platform
            .open_input(&device)
            .map_err(|e| UnsupportedReason::InputRejected(e.to_string()))?;

        let live_ticket = Arc::new(AtomicU64::new(0));
        let mut session =
            platform.create_session(SessionObserver::new(events.clone(), Arc::clone(&live_ticket)));

        if !session.can_add_input(input.as_ref()) {
            return Err(UnsupportedReason::InputRejected(format!(
                "session refused input {}",
                device.path
            )));
        }
        session.add_input(input);

        if !session.can_add_metadata_output() {
            return Err(UnsupportedReason::OutputRejected);
        }

        // Only request what the platform decoder can actually report
        let available = platform.available_symbol_types();
        let requested: SymbolSet = symbol_types.intersection(&available).copied().collect();
        if requested.len() < symbol_types.len() {
            debug!(
                pipeline = id,
                dropped = symbol_types.len() - requested.len(),
                "Platform cannot decode some requested symbol types"
            );
        }
        let delegate = MetadataDelegate::new(id, Arc::clone(&live_ticket), events.clone());
        session.add_metadata_output(&requested, delegate);

        info!(pipeline = id, backend = platform.name(), "Capture pipeline built");

        Ok(Self {
            id,
            device,
            slot: Arc::new(Mutex::new(PipelineSlot { session, ticket: 0 })),
            live_ticket,
        })
    }

    /// Stop the session and invalidate queued starts
    ///
    /// Synchronous: once this returns no start job can run under an older
    /// ticket and the session delivers no more frames.
    pub fn stop(&self, ticket: u64) {
        let mut slot = lock_slot(&self.slot);
        slot.ticket = ticket;
        if slot.session.is_running() {
            slot.session.stop_running();
            info!(pipeline = self.id, "Capture session stopped");
        }
    }

    /// Allow starting under `ticket`
    pub fn arm(&self, ticket: u64) {
        lock_slot(&self.slot).ticket = ticket;
    }

    pub fn is_running(&self) -> bool {
        lock_slot(&self.slot).session.is_running()
    }
}
