// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture platform
//!
//! Linux has no camera permission prompt and no notion of a rear camera, so
//! both map onto what the kernel exposes:
//!
//! - every `/dev/video*` node with the video capture capability counts as a
//!   scanning camera
//! - authorization is read/write access to the device node; `Denied` when
//!   the user is not in the `video` group
//! - QR codes are decoded in-process with [`QrDetector`]

mod capture;

use super::frame_loop::FrameLoop;
use super::{
    AccessRequest, AuthorizationStatus, BackendError, BackendResult, CameraDevice, CameraLocation,
    CaptureInput, CapturePlatform, CaptureSession, MetadataDelegate, SessionObserver, SymbolSet,
    SymbolType,
};
use crate::config::Config;
use crate::constants::{detector, v4l2};
use crate::frame_processor::QrDetector;
use capture::CaptureParams;
use std::ffi::CString;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use v4l::capability::Flags;
use v4l::prelude::*;

/// List video capture devices, sorted by path
pub fn enumerate_devices() -> Vec<CameraDevice> {
    let mut devices: Vec<CameraDevice> = std::fs::read_dir(v4l2::DEVICE_DIR)
        .into_iter()
        .flatten()
        .flatten()
        .filter(|e| {
            e.path()
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(v4l2::DEVICE_PREFIX))
                .unwrap_or(false)
        })
        .filter_map(|entry| {
            let path = entry.path().to_string_lossy().to_string();
            probe_device(&path)
        })
        .collect();

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(count = devices.len(), "Enumerated V4L2 capture devices");
    devices
}

/// Query a node and keep it only if it can capture video
fn probe_device(path: &str) -> Option<CameraDevice> {
    let dev = Device::with_path(path).ok()?;
    let caps = dev.query_caps().ok()?;
    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return None;
    }
    Some(CameraDevice {
        name: caps.card,
        path: path.to_string(),
        location: CameraLocation::External,
    })
}

/// Whether the current user may open the node for capture
fn device_access(path: &str) -> AuthorizationStatus {
    let Ok(c_path) = CString::new(path) else {
        return AuthorizationStatus::Denied;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
    let result = unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) };
    if result == 0 {
        AuthorizationStatus::Authorized
    } else {
        AuthorizationStatus::Denied
    }
}

/// Capture platform backed by Video4Linux2
#[derive(Debug, Clone)]
pub struct V4l2Platform {
    /// Fixed device; the first capture device when unset
    device_path: Option<String>,
    detector: QrDetector,
    detection_interval: Duration,
}

impl Default for V4l2Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl V4l2Platform {
    pub fn new() -> Self {
        Self {
            device_path: None,
            detector: QrDetector::new(),
            detection_interval: detector::DEFAULT_INTERVAL,
        }
    }

    pub fn with_device(mut self, path: impl Into<String>) -> Self {
        self.device_path = Some(path.into());
        self
    }

    pub fn with_detection_interval(mut self, interval: Duration) -> Self {
        self.detection_interval = interval;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            device_path: config.device_path.clone(),
            detector: QrDetector::with_max_dimension(config.max_dimension),
            detection_interval: Duration::from_millis(config.detection_interval_ms),
        }
    }

    fn selected_device(&self) -> Option<CameraDevice> {
        match &self.device_path {
            Some(path) => probe_device(path),
            None => enumerate_devices().into_iter().next(),
        }
    }
}

impl CapturePlatform for V4l2Platform {
    fn has_rear_camera(&self) -> bool {
        self.selected_device().is_some()
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        match self.selected_device() {
            Some(device) => device_access(&device.path),
            // Nothing to be denied; the missing device is reported later
            None => AuthorizationStatus::Authorized,
        }
    }

    fn request_access(&self) -> AccessRequest {
        let (tx, rx) = oneshot::channel();
        let granted = self.authorization_status() == AuthorizationStatus::Authorized;
        let _ = tx.send(granted);
        rx
    }

    fn default_video_device(&self) -> Option<CameraDevice> {
        self.selected_device()
    }

    fn open_input(&self, device: &CameraDevice) -> BackendResult<Box<dyn CaptureInput>> {
        if device_access(&device.path) != AuthorizationStatus::Authorized {
            return Err(BackendError::InputRejected(format!(
                "no read/write access to {}",
                device.path
            )));
        }
        Device::with_path(&device.path)
            .map_err(|e| BackendError::DeviceNotFound(format!("{}: {}", device.path, e)))?;
        Ok(Box::new(V4l2Input {
            device: device.clone(),
        }))
    }

    fn create_session(&self, observer: SessionObserver) -> Box<dyn CaptureSession> {
        Box::new(V4l2Session {
            observer,
            device: None,
            output: None,
            frame_loop: None,
            detector: self.detector.clone(),
            detection_interval: self.detection_interval,
        })
    }

    fn available_symbol_types(&self) -> SymbolSet {
        SymbolSet::from([SymbolType::Qr])
    }

    fn name(&self) -> &'static str {
        "v4l2"
    }
}

struct V4l2Input {
    device: CameraDevice,
}

impl CaptureInput for V4l2Input {
    fn device(&self) -> &CameraDevice {
        &self.device
    }
}

struct V4l2Session {
    observer: SessionObserver,
    device: Option<CameraDevice>,
    output: Option<(SymbolSet, MetadataDelegate)>,
    frame_loop: Option<FrameLoop>,
    detector: QrDetector,
    detection_interval: Duration,
}

impl CaptureSession for V4l2Session {
    fn can_add_input(&self, _input: &dyn CaptureInput) -> bool {
        self.device.is_none()
    }

    fn add_input(&mut self, input: Box<dyn CaptureInput>) {
        self.device = Some(input.device().clone());
    }

    fn can_add_metadata_output(&self) -> bool {
        self.device.is_some() && self.output.is_none()
    }

    fn add_metadata_output(&mut self, symbol_types: &SymbolSet, delegate: MetadataDelegate) {
        self.output = Some((symbol_types.clone(), delegate));
    }

    fn start_running(&mut self) -> BackendResult<()> {
        if self.is_running() {
            return Ok(());
        }

        let device = self
            .device
            .clone()
            .ok_or_else(|| BackendError::StartFailed("no input attached".into()))?;
        let (symbol_types, delegate) = self
            .output
            .clone()
            .ok_or_else(|| BackendError::StartFailed("no metadata output attached".into()))?;

        let params = CaptureParams {
            path: device.path.clone(),
            delegate,
            observer: self.observer.clone(),
            detector: self.detector.clone(),
            detection_interval: self.detection_interval,
            decode: symbol_types.contains(&SymbolType::Qr),
        };

        let (init_tx, init_rx) = std::sync::mpsc::channel();
        let frame_loop = FrameLoop::spawn("v4l2-capture", move |stop| {
            capture::run(params, stop, init_tx);
        })?;

        // Wait for the device to be configured before reporting success
        match init_rx.recv() {
            Ok(Ok(())) => {
                info!(path = %device.path, "V4L2 capture started");
                self.frame_loop = Some(frame_loop);
                Ok(())
            }
            Ok(Err(msg)) => {
                warn!(path = %device.path, error = %msg, "V4L2 capture failed to start");
                Err(BackendError::StartFailed(msg))
            }
            Err(_) => Err(BackendError::StartFailed(
                "capture thread died during initialization".into(),
            )),
        }
    }

    fn stop_running(&mut self) {
        if let Some(mut frame_loop) = self.frame_loop.take() {
            frame_loop.stop();
            info!("V4L2 capture stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.frame_loop.as_ref().is_some_and(FrameLoop::is_running)
    }
}

impl Drop for V4l2Session {
    fn drop(&mut self) {
        self.stop_running();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_node_is_not_a_camera() {
        assert!(probe_device("/dev/definitely-not-a-video-node").is_none());
    }

    #[test]
    fn test_missing_node_is_denied() {
        assert_eq!(
            device_access("/dev/definitely-not-a-video-node"),
            AuthorizationStatus::Denied
        );
    }

    #[test]
    fn test_platform_only_decodes_qr() {
        let platform = V4l2Platform::new();
        assert_eq!(platform.available_symbol_types(), SymbolSet::from([SymbolType::Qr]));
        assert_eq!(platform.name(), "v4l2");
    }

    #[test]
    fn test_fixed_missing_device_has_no_camera() {
        let platform = V4l2Platform::new().with_device("/dev/definitely-not-a-video-node");
        assert!(!platform.has_rear_camera());
        assert!(platform.default_video_device().is_none());
        assert_eq!(platform.authorization_status(), AuthorizationStatus::Authorized);
    }
}
