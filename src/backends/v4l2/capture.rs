// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture loop
//!
//! Runs on the session's frame thread. The device is opened and configured
//! first and the outcome reported through `init_tx`; after that, frames are
//! dequeued until the stop signal is set, and at most one frame per
//! detection interval is decoded. A device that keeps failing ends the loop
//! and is reported as an interruption.

use crate::backends::{BackendError, MetadataDelegate, SessionObserver};
use crate::constants::v4l2::{
    BUFFER_COUNT, MAX_CONSECUTIVE_ERRORS, REQUESTED_HEIGHT, REQUESTED_WIDTH,
};
use crate::frame_processor::{GrayFrame, QrDetector};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

pub(super) struct CaptureParams {
    pub path: String,
    pub delegate: MetadataDelegate,
    pub observer: SessionObserver,
    pub detector: QrDetector,
    pub detection_interval: Duration,
    /// False when no decodable symbol type was requested
    pub decode: bool,
}

fn open_device(path: &str) -> Result<(Device, Format), String> {
    let dev = Device::with_path(path).map_err(|e| format!("Failed to open device: {}", e))?;

    let requested = Format::new(REQUESTED_WIDTH, REQUESTED_HEIGHT, FourCC::new(b"YUYV"));
    let format = dev
        .set_format(&requested)
        .map_err(|e| format!("Failed to set capture format: {}", e))?;

    if format.fourcc != FourCC::new(b"YUYV") {
        return Err(format!("Device does not support YUYV (got {:?})", format.fourcc));
    }

    info!(
        width = format.width,
        height = format.height,
        stride = format.stride,
        "V4L2 capture format configured"
    );
    Ok((dev, format))
}

pub(super) fn run(
    params: CaptureParams,
    stop: Arc<AtomicBool>,
    init_tx: mpsc::Sender<Result<(), String>>,
) {
    let (dev, format) = match open_device(&params.path) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };

    let mut stream = match Stream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = init_tx.send(Err(format!("Failed to create capture stream: {}", e)));
            return;
        }
    };

    if init_tx.send(Ok(())).is_err() {
        return;
    }
    params.observer.did_start_running();

    let mut last_detection: Option<Instant> = None;
    let mut consecutive_errors = 0;

    while !stop.load(Ordering::SeqCst) {
        let (buf, _meta) = match stream.next() {
            Ok(frame) => frame,
            Err(e) => {
                consecutive_errors += 1;
                warn!(error = %e, consecutive_errors, "Failed to dequeue frame");
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    warn!(path = %params.path, "Giving up on capture device");
                    params.observer.was_interrupted(BackendError::IoError(format!(
                        "{} failed {} frames in a row: {}",
                        params.path, consecutive_errors, e
                    )));
                    break;
                }
                continue;
            }
        };
        consecutive_errors = 0;

        if !params.decode {
            continue;
        }
        if last_detection.is_some_and(|t| t.elapsed() < params.detection_interval) {
            trace!("Skipping frame, detection interval not elapsed");
            continue;
        }
        last_detection = Some(Instant::now());

        let frame = GrayFrame::from_yuyv(buf, format.width, format.height, format.stride);
        params.delegate.metadata_output(params.detector.detect(&frame));
    }

    debug!(path = %params.path, "V4L2 capture loop stopped");
}
