// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner
//!
//! Runtime failures of a capture session never escape the controller: they
//! are converted into a terminal [`SessionState`](crate::session::SessionState)
//! plus a single observer notification, and are described here by
//! [`ScanFailure`]. Caller mistakes are returned as [`ConfigError`], and
//! [`AppError`] aggregates everything for the command-line front end.

use crate::backends::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Terminal failure of a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFailure {
    /// The device cannot scan; every hardware or pipeline refusal lands here
    Unsupported(UnsupportedReason),
    /// Camera access was refused, restricted, or declined at the prompt
    PermissionDenied,
}

/// Why scanning is unsupported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// The device class has no rear camera
    NoRearCamera,
    /// No default video capture device
    NoVideoDevice,
    /// The device input could not be created or was rejected by the session
    InputRejected(String),
    /// The session refused the metadata output
    OutputRejected,
    /// The platform failed to start the session
    StartFailed(String),
    /// A running session stopped on its own (device lost, capture errors)
    Interrupted(String),
}

/// Caller-side configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The controller has no configuration bound yet
    NotAttached,
    /// A field that is frozen once the pipeline exists was changed
    FrozenAfterBuild(&'static str),
    /// The configuration file could not be parsed
    Parse(String),
    /// The configuration file could not be read or written
    Io(String),
    /// A value given on the command line or in a file is invalid
    InvalidValue(String),
}

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Session failure reported by the controller
    Scan(ScanFailure),
    /// Platform backend error
    Backend(BackendError),
    /// Configuration errors
    Config(ConfigError),
    /// Generic error with message
    Other(String),
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanFailure::Unsupported(reason) => write!(f, "Scanning not supported: {}", reason),
            ScanFailure::PermissionDenied => write!(f, "Camera access denied"),
        }
    }
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsupportedReason::NoRearCamera => write!(f, "no rear camera"),
            UnsupportedReason::NoVideoDevice => write!(f, "no video capture device"),
            UnsupportedReason::InputRejected(msg) => write!(f, "input rejected: {}", msg),
            UnsupportedReason::OutputRejected => write!(f, "metadata output rejected"),
            UnsupportedReason::StartFailed(msg) => write!(f, "session failed to start: {}", msg),
            UnsupportedReason::Interrupted(msg) => write!(f, "session interrupted: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotAttached => write!(f, "No configuration attached"),
            ConfigError::FrozenAfterBuild(field) => {
                write!(f, "'{}' cannot change after the capture pipeline is built", field)
            }
            ConfigError::Parse(msg) => write!(f, "Failed to parse configuration: {}", msg),
            ConfigError::Io(msg) => write!(f, "Configuration I/O error: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Scan(e) => write!(f, "Scan error: {}", e),
            AppError::Backend(e) => write!(f, "Backend error: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ScanFailure {}
impl std::error::Error for ConfigError {}
impl std::error::Error for AppError {}

impl From<ScanFailure> for AppError {
    fn from(err: ScanFailure) -> Self {
        AppError::Scan(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<BackendError> for UnsupportedReason {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DeviceNotFound(_) => UnsupportedReason::NoVideoDevice,
            BackendError::OutputRejected(_) => UnsupportedReason::OutputRejected,
            other => UnsupportedReason::InputRejected(other.to_string()),
        }
    }
}
