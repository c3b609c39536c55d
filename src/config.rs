// SPDX-License-Identifier: GPL-3.0-only

//! Scanner configuration
//!
//! [`SessionConfig`] is what a host hands to a controller on `attach`.
//! [`Config`] is the on-disk file used by the command-line front end, which
//! wraps a `SessionConfig` together with device and detector settings.

use crate::backends::{SymbolSet, SymbolType};
use crate::constants::{self, config_file, detector, guide};
use crate::errors::{ConfigError, ConfigResult};
use crate::fl;
use crate::overlay::{Rgba, Size};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// How decoded results are published to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultDiscipline {
    /// Every accepted decode updates the result; an empty batch clears it.
    /// The session stays open until the host hides the view.
    #[default]
    Continuous,
    /// The first accepted decode sets the result and the scanned flag, then
    /// the sink ignores everything until re-attached. The host is expected
    /// to hide the view when the flag flips.
    OneShot,
}

/// What happens when frozen fields change after the pipeline exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconfigurePolicy {
    /// Symbol types, guide size and discipline are fixed once the capture
    /// pipeline is built; changing them is rejected
    #[default]
    FrozenOnBuild,
    /// Changing a frozen field tears the pipeline down and builds a new one
    RebuildPipeline,
}

/// Failure text shown when scanning is unavailable
///
/// The only action offered to the user is to acknowledge and dismiss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessage {
    pub title: String,
    pub description: String,
    pub dismiss_label: String,
}

impl FailureMessage {
    /// Localized text for an unsupported device
    pub fn unsupported_default() -> Self {
        Self {
            title: fl!("scanning-unsupported-title"),
            description: fl!("scanning-unsupported-description"),
            dismiss_label: fl!("scanning-unsupported-dismiss"),
        }
    }

    /// Localized text for refused camera access
    pub fn access_denied_default() -> Self {
        Self {
            title: fl!("camera-access-denied-title"),
            description: fl!("camera-access-denied-description"),
            dismiss_label: fl!("scanning-unsupported-dismiss"),
        }
    }
}

/// Caller-provided failure text; unset fields fall back to platform text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureText {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl FailureText {
    /// Fill unset fields from a platform default
    pub fn resolve(&self, default: FailureMessage) -> FailureMessage {
        FailureMessage {
            title: self.title.clone().unwrap_or(default.title),
            description: self.description.clone().unwrap_or(default.description),
            dismiss_label: default.dismiss_label,
        }
    }
}

/// Guide overlay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    /// Guide box size; zero hides the guide. Frozen once the pipeline exists.
    pub size: Size,
    pub line_color: Rgba,
    pub line_width: f32,
    /// Seconds for one sweep of the scanning bar
    pub animation_duration: f64,
    pub show_overlay: bool,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            size: Size::new(guide::DEFAULT_SIZE, guide::DEFAULT_SIZE),
            line_color: Rgba::from_array(guide::DEFAULT_LINE_COLOR),
            line_width: guide::DEFAULT_LINE_WIDTH,
            animation_duration: guide::DEFAULT_ANIMATION_DURATION,
            show_overlay: true,
        }
    }
}

/// Display-only guide fields, changeable at any time
///
/// Changes take effect on the next layout pass, never on an overlay that is
/// already built.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideStyle {
    pub line_color: Rgba,
    pub line_width: f32,
    pub animation_duration: f64,
    pub show_overlay: bool,
}

impl GuideConfig {
    /// The display-only part of this config
    pub fn style(&self) -> GuideStyle {
        GuideStyle {
            line_color: self.line_color,
            line_width: self.line_width,
            animation_duration: self.animation_duration,
            show_overlay: self.show_overlay,
        }
    }

    /// Overwrite the display-only fields
    pub fn apply_style(&mut self, style: &GuideStyle) {
        self.line_color = style.line_color;
        self.line_width = style.line_width;
        self.animation_duration = style.animation_duration;
        self.show_overlay = style.show_overlay;
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let size = self.size;
        if !(size.width.is_finite() && size.height.is_finite())
            || size.width < 0.0
            || size.height < 0.0
        {
            return Err(ConfigError::InvalidValue(
                "guide size must be finite and not negative".into(),
            ));
        }
        self.style().validate()
    }
}

impl GuideStyle {
    /// Reject values the overlay cannot lay out
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.line_width.is_finite() || self.line_width < 0.0 {
            return Err(ConfigError::InvalidValue(
                "guide line width must be finite and not negative".into(),
            ));
        }
        if self.animation_duration < 0.0
            || Duration::try_from_secs_f64(self.animation_duration).is_err()
        {
            return Err(ConfigError::InvalidValue(
                "guide animation duration must be a non-negative number of seconds".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration bound to a session controller
///
/// An empty `symbol_types` set disables scanning: the preview still runs
/// but nothing is ever published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Accepted symbol types. Frozen once the pipeline exists.
    pub symbol_types: SymbolSet,
    pub guide: GuideConfig,
    /// Custom failure text
    pub failure_text: FailureText,
    /// Result publishing discipline. Frozen once the pipeline exists.
    pub discipline: ResultDiscipline,
    pub reconfigure: ReconfigurePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            symbol_types: constants::DEFAULT_SYMBOL_TYPES.into_iter().collect(),
            guide: GuideConfig::default(),
            failure_text: FailureText::default(),
            discipline: ResultDiscipline::default(),
            reconfigure: ReconfigurePolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Config accepting only the given symbol types
    pub fn with_symbol_types(mut self, symbol_types: impl IntoIterator<Item = SymbolType>) -> Self {
        self.symbol_types = symbol_types.into_iter().collect();
        self
    }

    pub fn with_guide_size(mut self, size: Size) -> Self {
        self.guide.size = size;
        self
    }

    pub fn with_discipline(mut self, discipline: ResultDiscipline) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn with_reconfigure(mut self, policy: ReconfigurePolicy) -> Self {
        self.reconfigure = policy;
        self
    }

    pub fn with_failure_text(
        mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.failure_text = FailureText {
            title: Some(title.into()),
            description: Some(description.into()),
        };
        self
    }

    /// Check the values serde and the type system cannot
    pub fn validate(&self) -> ConfigResult<()> {
        self.guide.validate()
    }

    /// Whether any symbol type is accepted
    pub fn scanning_enabled(&self) -> bool {
        !self.symbol_types.is_empty()
    }

    /// Failure text for an unsupported device
    pub fn unsupported_message(&self) -> FailureMessage {
        self.failure_text.resolve(FailureMessage::unsupported_default())
    }

    /// First field frozen on build that differs from `other`
    pub fn frozen_change(&self, other: &SessionConfig) -> Option<&'static str> {
        if self.symbol_types != other.symbol_types {
            Some("symbol_types")
        } else if self.guide.size != other.guide.size {
            Some("guide.size")
        } else if self.discipline != other.discipline {
            Some("discipline")
        } else {
            None
        }
    }

    /// Copy every field that may change after the pipeline exists
    pub fn apply_display_fields(&mut self, other: &SessionConfig) {
        self.guide.apply_style(&other.guide.style());
        self.failure_text = other.failure_text.clone();
        self.reconfigure = other.reconfigure;
    }
}

/// Command-line configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    /// Capture device path; the first capture device when unset
    pub device_path: Option<String>,
    /// Frames are downscaled to this before detection
    pub max_dimension: u32,
    /// Minimum milliseconds between detection passes on live capture
    pub detection_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            device_path: None,
            max_dimension: detector::DEFAULT_MAX_DIMENSION,
            detection_interval_ms: detector::DEFAULT_INTERVAL.as_millis() as u64,
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/codescanner/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(config_file::APP_DIR).join(config_file::FILE_NAME))
    }

    /// Read a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Read a configuration file, falling back to defaults if it does not exist
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                info!(path = %path.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Validate values that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_dimension == 0 {
            return Err(ConfigError::InvalidValue("max_dimension must be positive".into()));
        }
        self.session.validate()
    }
}
