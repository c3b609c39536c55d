// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle
//!
//! The [`SessionController`] owns the capture pipeline, the permission flow
//! and the result sink for one scanner view. Platform callbacks never touch
//! controller state directly; they enqueue [`ControllerEvent`]s that the host
//! applies on its own thread.

mod controller;
mod observer;
mod pipeline;
mod sink;
mod state;
mod worker;

pub use controller::{ScannerBindings, SessionController};
pub use observer::{ChannelObserver, NoopObserver, ScannerNotification, ScannerObserver};
pub use pipeline::{MetadataDelegate, SessionObserver};
pub use sink::{ScanEvent, ScanResultSink};
pub use state::{ControllerEvent, SessionFlags, SessionState};
