// SPDX-License-Identifier: GPL-3.0-only

//! Still-image capture platform
//!
//! Plays a list of image files as if they were camera frames: each image is
//! decoded to luma, run through the QR detector and reported as one metadata
//! batch. Useful on machines without a camera and for reproducible runs.

use super::frame_loop::{FrameLoop, LoopAction};
use super::{
    AccessRequest, AuthorizationStatus, BackendError, BackendResult, CameraDevice, CameraLocation,
    CaptureInput, CapturePlatform, CaptureSession, MetadataDelegate, MetadataObject,
    SessionObserver, SymbolSet, SymbolType,
};
use crate::constants::timing::FILE_SOURCE_FRAME_INTERVAL;
use crate::frame_processor::{GrayFrame, QrDetector};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Decode all QR codes in one image file
pub fn decode_image(path: &Path, detector: &QrDetector) -> BackendResult<Vec<MetadataObject>> {
    let image = image::open(path)
        .map_err(|e| BackendError::IoError(format!("{}: {}", path.display(), e)))?;
    let frame = GrayFrame::from(image.to_luma8());
    debug!(path = %path.display(), width = frame.width, height = frame.height, "Decoding image");
    Ok(detector.detect(&frame))
}

/// Capture platform that reads frames from image files
#[derive(Debug, Clone)]
pub struct FileSourcePlatform {
    images: Vec<PathBuf>,
    detector: QrDetector,
    frame_interval: Duration,
}

impl FileSourcePlatform {
    pub fn new(images: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            images: images.into_iter().collect(),
            detector: QrDetector::new(),
            frame_interval: FILE_SOURCE_FRAME_INTERVAL,
        }
    }

    pub fn with_detector(mut self, detector: QrDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }
}

impl CapturePlatform for FileSourcePlatform {
    fn has_rear_camera(&self) -> bool {
        !self.images.is_empty()
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        AuthorizationStatus::Authorized
    }

    fn request_access(&self) -> AccessRequest {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(true);
        rx
    }

    fn default_video_device(&self) -> Option<CameraDevice> {
        let first = self.images.first()?;
        Some(CameraDevice {
            name: format!("{} image file(s)", self.images.len()),
            path: first.display().to_string(),
            location: CameraLocation::External,
        })
    }

    fn open_input(&self, device: &CameraDevice) -> BackendResult<Box<dyn CaptureInput>> {
        if let Some(missing) = self.images.iter().find(|path| !path.is_file()) {
            return Err(BackendError::DeviceNotFound(missing.display().to_string()));
        }
        Ok(Box::new(FileInput {
            device: device.clone(),
        }))
    }

    fn create_session(&self, observer: SessionObserver) -> Box<dyn CaptureSession> {
        Box::new(FileSession {
            observer,
            images: self.images.clone(),
            has_input: false,
            delegate: None,
            frame_loop: None,
            detector: self.detector.clone(),
            frame_interval: self.frame_interval,
        })
    }

    fn available_symbol_types(&self) -> SymbolSet {
        SymbolSet::from([SymbolType::Qr])
    }

    fn name(&self) -> &'static str {
        "file-source"
    }
}

struct FileInput {
    device: CameraDevice,
}

impl CaptureInput for FileInput {
    fn device(&self) -> &CameraDevice {
        &self.device
    }
}

struct FileSession {
    observer: SessionObserver,
    images: Vec<PathBuf>,
    has_input: bool,
    delegate: Option<MetadataDelegate>,
    frame_loop: Option<FrameLoop>,
    detector: QrDetector,
    frame_interval: Duration,
}

impl CaptureSession for FileSession {
    fn can_add_input(&self, _input: &dyn CaptureInput) -> bool {
        !self.has_input
    }

    fn add_input(&mut self, input: Box<dyn CaptureInput>) {
        debug!(device = %input.device().name, "File source input attached");
        self.has_input = true;
    }

    fn can_add_metadata_output(&self) -> bool {
        self.has_input && self.delegate.is_none()
    }

    fn add_metadata_output(&mut self, _symbol_types: &SymbolSet, delegate: MetadataDelegate) {
        self.delegate = Some(delegate);
    }

    fn start_running(&mut self) -> BackendResult<()> {
        if self.is_running() {
            return Ok(());
        }
        let delegate = self
            .delegate
            .clone()
            .ok_or_else(|| BackendError::StartFailed("no metadata output attached".into()))?;

        let images = self.images.clone();
        let detector = self.detector.clone();
        let interval = self.frame_interval;
        let observer = self.observer.clone();
        let count = images.len();

        let frame_loop = FrameLoop::start_with_init(
            "file-source",
            move || {
                observer.did_start_running();
                Ok(images.into_iter())
            },
            move |remaining| {
                let Some(path) = remaining.next() else {
                    return LoopAction::Stop;
                };
                match decode_image(&path, &detector) {
                    Ok(objects) => delegate.metadata_output(objects),
                    Err(e) => warn!(error = %e, "Skipping unreadable image"),
                }
                std::thread::sleep(interval);
                LoopAction::Continue
            },
        )?;

        info!(images = count, "File source started");
        self.frame_loop = Some(frame_loop);
        Ok(())
    }

    fn stop_running(&mut self) {
        if let Some(mut frame_loop) = self.frame_loop.take() {
            frame_loop.stop();
            debug!("File source stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.frame_loop.as_ref().is_some_and(FrameLoop::is_running)
    }
}

impl Drop for FileSession {
    fn drop(&mut self) {
        self.stop_running();
    }
}
