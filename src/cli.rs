// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanning
//!
//! This module provides command-line functionality for:
//! - Listing capture devices
//! - Scanning live from a camera or from a sequence of images
//! - Decoding still images
//! - Writing a default configuration file

use codescanner::backends::file_source::{FileSourcePlatform, decode_image};
use codescanner::backends::v4l2::{V4l2Platform, enumerate_devices};
use codescanner::backends::{CapturePlatform, MetadataObject, SymbolType};
use codescanner::config::{Config, ResultDiscipline};
use codescanner::constants::timing::START_CONFIRMATION_TIMEOUT;
use codescanner::errors::{AppError, AppResult, ConfigError};
use codescanner::frame_processor::{FrameRegion, QrDetector};
use codescanner::session::{ChannelObserver, ScannerNotification, SessionController, SessionState};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Options shared by the scan command
pub struct ScanOptions {
    pub config_path: Option<PathBuf>,
    pub device: Option<String>,
    pub types: Option<Vec<SymbolType>>,
    pub one_shot: bool,
    pub images: Vec<PathBuf>,
    pub json: bool,
}

#[derive(Serialize)]
struct DecodedCode<'a> {
    source: String,
    symbol: SymbolType,
    payload: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<&'a FrameRegion>,
}

/// Load the configuration file, or defaults when there is none
fn load_config(path: Option<&Path>) -> AppResult<Config> {
    let default_path = Config::default_path();
    let path = path.or(default_path.as_deref());
    let config = Config::load_or_default(path)?;
    config.validate()?;
    Ok(config)
}

/// List all video capture devices
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let devices = enumerate_devices();

    if devices.is_empty() {
        println!("No capture devices found.");
        return Ok(());
    }

    println!("Available capture devices:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        let access = V4l2Platform::new()
            .with_device(device.path.clone())
            .authorization_status();
        println!("  [{}] {}", index, device.name);
        println!("      Path:   {}", device.path);
        println!("      Access: {}", access);
        println!();
    }

    Ok(())
}

/// Decode codes in still images
pub fn decode_images(
    images: &[PathBuf],
    config_path: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if images.is_empty() {
        return Err("No images given".into());
    }

    let config = load_config(config_path.as_deref())?;
    let detector = QrDetector::with_max_dimension(config.max_dimension);
    let mut found = 0;

    for path in images {
        let objects = decode_image(path, &detector).map_err(AppError::from)?;
        let source = path.display().to_string();
        for object in &objects {
            let MetadataObject::MachineReadableCode(code) = object else {
                continue;
            };
            found += 1;
            if json {
                let line = serde_json::to_string(&DecodedCode {
                    source: source.clone(),
                    symbol: code.symbol_type,
                    payload: code.payload.as_deref(),
                    bounds: code.bounds.as_ref(),
                })?;
                println!("{}", line);
            } else {
                println!(
                    "{}: [{}] {}",
                    source,
                    code.symbol_type,
                    code.payload.as_deref().unwrap_or("<binary>")
                );
            }
        }
    }

    if found == 0 && !json {
        println!("No codes found.");
    }
    Ok(())
}

/// Write the default configuration file
pub fn init_config(path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = path
        .or_else(Config::default_path)
        .ok_or_else(|| AppError::from(ConfigError::InvalidValue("no config directory".into())))?;

    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }

    Config::default().save(&path)?;
    println!("Configuration written: {}", path.display());
    Ok(())
}

/// Scan from a camera or image sequence until a code is found or Ctrl+C
pub fn scan(options: ScanOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(options.config_path.as_deref())?;
    if let Some(device) = options.device {
        config.device_path = Some(device);
    }
    if let Some(types) = options.types {
        config.session.symbol_types = types.into_iter().collect();
    }
    if options.one_shot {
        config.session.discipline = ResultDiscipline::OneShot;
    }

    let platform: Arc<dyn CapturePlatform> = if options.images.is_empty() {
        Arc::new(V4l2Platform::from_config(&config))
    } else {
        Arc::new(
            FileSourcePlatform::new(options.images)
                .with_detector(QrDetector::with_max_dimension(config.max_dimension)),
        )
    };
    let from_images = platform.name() == "file-source";

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_scan(platform, config, from_images, options.json))?;
    Ok(())
}

async fn run_scan(
    platform: Arc<dyn CapturePlatform>,
    config: Config,
    from_images: bool,
    json: bool,
) -> AppResult<()> {
    let (observer, mut notifications) = ChannelObserver::new();
    let mut controller = SessionController::new(platform).with_observer(observer);
    let one_shot = config.session.discipline == ResultDiscipline::OneShot;

    // Set up Ctrl+C handler
    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .map_err(|e| AppError::Other(format!("Failed to install Ctrl+C handler: {}", e)))?;

    controller.attach(config.session)?;
    controller.become_visible();

    let started = Instant::now();
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    println!("Scanning... Press Ctrl+C to stop");

    let result = loop {
        let step = tokio::select! {
            _ = stop_rx.recv() => Step::Stop,
            _ = controller.process_next() => Step::Progress,
            _ = tick.tick() => Step::Tick,
        };

        match step {
            Step::Stop => {
                println!();
                println!("Stopping...");
                break Ok(());
            }
            Step::Progress => {}
            Step::Tick => {
                if controller.state() == SessionState::Configuring
                    && started.elapsed() > START_CONFIRMATION_TIMEOUT
                {
                    break Err(AppError::Other("Capture session did not start in time".into()));
                }
                // The image sequence ends on its own
                if from_images
                    && controller.state() == SessionState::Running
                    && !controller.is_capture_running()
                {
                    controller.process_pending();
                    drain(&mut notifications, json);
                    break Ok(());
                }
            }
        }

        match drain(&mut notifications, json) {
            Drained::Failed => {
                let failure = controller
                    .last_failure()
                    .cloned()
                    .map(AppError::Scan)
                    .unwrap_or_else(|| AppError::Other("Scanning failed".into()));
                break Err(failure);
            }
            Drained::Scanned if one_shot => break Ok(()),
            _ => {}
        }
    };

    controller.dismantle();
    debug!(state = %controller.state(), "Scan finished");
    result
}

enum Step {
    Stop,
    Progress,
    Tick,
}

enum Drained {
    Nothing,
    Scanned,
    Failed,
}

/// Print pending notifications; stops at the first failure
fn drain(
    notifications: &mut tokio::sync::mpsc::UnboundedReceiver<ScannerNotification>,
    json: bool,
) -> Drained {
    let mut outcome = Drained::Nothing;
    while let Ok(notification) = notifications.try_recv() {
        match notification {
            ScannerNotification::SessionStarted => info!("Capture session started"),
            ScannerNotification::CodeScanned(event) => {
                if json {
                    let line = serde_json::json!({
                        "symbol": event.symbol_type,
                        "payload": event.payload,
                    });
                    println!("{}", line);
                } else {
                    println!("[{}] {}", event.symbol_type, event.payload);
                }
                outcome = Drained::Scanned;
            }
            ScannerNotification::CameraNotSupported(message) => {
                eprintln!("{}", message.title);
                eprintln!("{}", message.description);
                return Drained::Failed;
            }
            ScannerNotification::NoCameraAccess(message) => {
                eprintln!("{}", message.title);
                eprintln!("{}", message.description);
                return Drained::Failed;
            }
        }
    }
    outcome
}
