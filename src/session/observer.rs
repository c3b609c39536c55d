// SPDX-License-Identifier: GPL-3.0-only

//! Host notifications
//!
//! Every terminal failure of a session is reported exactly once through
//! [`ScannerObserver`]. Hosts implement the methods they care about; the
//! rest default to doing nothing.

use super::sink::ScanEvent;
use crate::config::FailureMessage;
use tokio::sync::mpsc;
use tracing::trace;

/// Receives lifecycle notifications from a session controller
///
/// Called on the host's thread while the controller handles a lifecycle call
/// or an event.
pub trait ScannerObserver: Send {
    /// The platform confirmed the capture session is running
    fn session_started(&mut self) {}

    /// Scanning is unavailable on this device
    ///
    /// The host should present `message` with a single dismiss action.
    fn camera_not_supported(&mut self, _message: &FailureMessage) {}

    /// Camera access was refused or restricted
    fn no_camera_access(&mut self, _message: &FailureMessage) {}

    /// The result sink published a decoded value
    fn code_scanned(&mut self, _event: &ScanEvent) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScannerObserver for NoopObserver {}

/// A notification forwarded by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerNotification {
    SessionStarted,
    CameraNotSupported(FailureMessage),
    NoCameraAccess(FailureMessage),
    CodeScanned(ScanEvent),
}

/// Observer that forwards notifications into a channel
///
/// Useful for hosts that run their own message loop.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<ScannerNotification>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScannerNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, notification: ScannerNotification) {
        if self.sender.send(notification).is_err() {
            trace!("Notification receiver dropped");
        }
    }
}

impl ScannerObserver for ChannelObserver {
    fn session_started(&mut self) {
        self.forward(ScannerNotification::SessionStarted);
    }

    fn camera_not_supported(&mut self, message: &FailureMessage) {
        self.forward(ScannerNotification::CameraNotSupported(message.clone()));
    }

    fn no_camera_access(&mut self, message: &FailureMessage) {
        self.forward(ScannerNotification::NoCameraAccess(message.clone()));
    }

    fn code_scanned(&mut self, event: &ScanEvent) {
        self.forward(ScannerNotification::CodeScanned(event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SymbolType;

    #[test]
    fn test_channel_observer_forwards_in_order() {
        let (mut observer, mut rx) = ChannelObserver::new();
        observer.session_started();
        observer.code_scanned(&ScanEvent {
            payload: "ABC123".into(),
            symbol_type: SymbolType::Qr,
        });

        assert_eq!(rx.try_recv().unwrap(), ScannerNotification::SessionStarted);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ScannerNotification::CodeScanned(ScanEvent { ref payload, .. }) if payload == "ABC123"
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (mut observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.session_started();
    }
}
