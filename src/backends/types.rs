// SPDX-License-Identifier: GPL-3.0-only
// Shared types for capture platform abstraction

//! Shared types for capture platforms

use crate::frame_processor::FrameRegion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Barcode / QR encoding family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolType {
    Aztec,
    Codabar,
    Code39,
    Code39Mod43,
    Code93,
    Code128,
    DataMatrix,
    Ean8,
    Ean13,
    Interleaved2of5,
    Itf14,
    Pdf417,
    Qr,
    Upce,
}

impl SymbolType {
    /// Every symbol type, in declaration order
    pub const ALL: [SymbolType; 14] = [
        SymbolType::Aztec,
        SymbolType::Codabar,
        SymbolType::Code39,
        SymbolType::Code39Mod43,
        SymbolType::Code93,
        SymbolType::Code128,
        SymbolType::DataMatrix,
        SymbolType::Ean8,
        SymbolType::Ean13,
        SymbolType::Interleaved2of5,
        SymbolType::Itf14,
        SymbolType::Pdf417,
        SymbolType::Qr,
        SymbolType::Upce,
    ];

    /// Stable identifier used in config files and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            SymbolType::Aztec => "aztec",
            SymbolType::Codabar => "codabar",
            SymbolType::Code39 => "code39",
            SymbolType::Code39Mod43 => "code39-mod43",
            SymbolType::Code93 => "code93",
            SymbolType::Code128 => "code128",
            SymbolType::DataMatrix => "data-matrix",
            SymbolType::Ean8 => "ean8",
            SymbolType::Ean13 => "ean13",
            SymbolType::Interleaved2of5 => "interleaved2of5",
            SymbolType::Itf14 => "itf14",
            SymbolType::Pdf417 => "pdf417",
            SymbolType::Qr => "qr",
            SymbolType::Upce => "upce",
        }
    }

    /// True for matrix (2D) symbologies
    pub fn is_two_dimensional(&self) -> bool {
        matches!(
            self,
            SymbolType::Aztec | SymbolType::DataMatrix | SymbolType::Pdf417 | SymbolType::Qr
        )
    }
}

impl std::fmt::Display for SymbolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SymbolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "qrcode" | "qr-code" => return Ok(SymbolType::Qr),
            "ean-8" => return Ok(SymbolType::Ean8),
            "ean-13" => return Ok(SymbolType::Ean13),
            "upc-e" => return Ok(SymbolType::Upce),
            _ => {}
        }
        SymbolType::ALL
            .into_iter()
            .find(|symbol| symbol.name() == normalized)
            .ok_or_else(|| format!("unknown symbol type '{}'", s))
    }
}

/// Set of symbol types a metadata output reports
pub type SymbolSet = BTreeSet<SymbolType>;

/// A decoded machine-readable code reported by the platform
#[derive(Debug, Clone, PartialEq)]
pub struct MachineReadableCode {
    pub symbol_type: SymbolType,
    /// Decoded string payload; binary-only codes have none
    pub payload: Option<String>,
    /// Location within the frame, if the platform reports one
    pub bounds: Option<FrameRegion>,
}

/// One object in a metadata batch
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataObject {
    /// A barcode or QR code
    MachineReadableCode(MachineReadableCode),
    /// Any other metadata the platform reports (faces, bodies, ...)
    Other(String),
}

impl MetadataObject {
    /// Shorthand for a code with a payload and no bounds
    pub fn code(symbol_type: SymbolType, payload: impl Into<String>) -> Self {
        MetadataObject::MachineReadableCode(MachineReadableCode {
            symbol_type,
            payload: Some(payload.into()),
            bounds: None,
        })
    }
}

/// Camera authorization as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationStatus {
    /// The user has not been asked yet
    #[default]
    NotDetermined,
    /// Access is restricted by policy
    Restricted,
    /// The user refused access
    Denied,
    /// Access granted
    Authorized,
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizationStatus::NotDetermined => write!(f, "not determined"),
            AuthorizationStatus::Restricted => write!(f, "restricted"),
            AuthorizationStatus::Denied => write!(f, "denied"),
            AuthorizationStatus::Authorized => write!(f, "authorized"),
        }
    }
}

/// Physical placement of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraLocation {
    Front,
    Back,
    /// USB and other detachable cameras
    #[default]
    External,
}

/// Represents a video capture device
#[derive(Debug, Clone, PartialEq)]
pub struct CameraDevice {
    pub name: String,
    /// Platform path or identifier (e.g. /dev/video0)
    pub path: String,
    pub location: CameraLocation,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// The device input could not be opened or attached
    InputRejected(String),
    /// The session refused the metadata output
    OutputRejected(String),
    /// The session could not be started
    StartFailed(String),
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::InputRejected(msg) => write!(f, "Input rejected: {}", msg),
            BackendError::OutputRejected(msg) => write!(f, "Output rejected: {}", msg),
            BackendError::StartFailed(msg) => write!(f, "Start failed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_type_parse_aliases() {
        assert_eq!("QR".parse::<SymbolType>(), Ok(SymbolType::Qr));
        assert_eq!("qr_code".parse::<SymbolType>(), Ok(SymbolType::Qr));
        assert_eq!("EAN-13".parse::<SymbolType>(), Ok(SymbolType::Ean13));
        assert_eq!("data_matrix".parse::<SymbolType>(), Ok(SymbolType::DataMatrix));
        assert!("morse".parse::<SymbolType>().is_err());
    }

    #[test]
    fn test_symbol_type_names_round_trip() {
        for symbol in SymbolType::ALL {
            assert_eq!(symbol.name().parse::<SymbolType>(), Ok(symbol));
        }
    }

    #[test]
    fn test_symbol_type_serde_matches_name() {
        for symbol in SymbolType::ALL {
            let json = serde_json::to_string(&symbol).unwrap();
            assert_eq!(json, format!("\"{}\"", symbol.name()));
        }
    }
}
