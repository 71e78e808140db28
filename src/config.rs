//! Configuration file handling for photobooth.
//!
//! Loads configuration from `<config dir>/photobooth/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::Resolution;
use crate::capture::SequenceTiming;
use crate::strip::{Color, StripLayout};

/// Configuration file structure for photobooth.
/// Loaded from the default path (or a custom path via --config).
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub strip: StripConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub photo_count: usize,
    pub countdown_secs: u32,
    pub flash_ms: u64,
    pub settle_ms: u64,
    pub retry_ms: u64,
    pub max_capture_attempts: u32,
    pub shutter_sound: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            photo_count: 3,
            countdown_secs: 1,
            flash_ms: 200,
            settle_ms: 1000,
            retry_ms: 250,
            max_capture_attempts: 3,
            shutter_sound: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device id from list-cameras; first available when unset
    pub device: Option<String>,
    pub resolution: Resolution,
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: None,
            resolution: Resolution::FULL_HD,
            mirror: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub gap: u32,
    pub background: Color,
    pub output_dir: PathBuf,
}

impl Default for StripConfig {
    fn default() -> Self {
        let layout = StripLayout::default();
        Self {
            width: layout.width,
            height: layout.height,
            padding: layout.padding,
            gap: layout.gap,
            background: Color::WHITE,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            Self::load_from_explicit(&path)
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Load configuration from a path that must exist.
    pub fn load_from_explicit(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject values the booth cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.session.photo_count == 0 {
            return Err("session.photo_count must be at least 1".to_string());
        }
        if self.session.max_capture_attempts == 0 {
            return Err("session.max_capture_attempts must be at least 1".to_string());
        }
        self.layout().validate()
    }

    pub fn timing(&self) -> SequenceTiming {
        let s = &self.session;
        SequenceTiming {
            countdown_secs: s.countdown_secs,
            step: Duration::from_secs(1),
            flash: Duration::from_millis(s.flash_ms),
            settle: Duration::from_millis(s.settle_ms),
            retry: Duration::from_millis(s.retry_ms),
            max_attempts: s.max_capture_attempts,
            shutter_sound: s.shutter_sound,
        }
    }

    pub fn layout(&self) -> StripLayout {
        StripLayout {
            width: self.strip.width,
            height: self.strip.height,
            padding: self.strip.padding,
            gap: self.strip.gap,
            count: self.session.photo_count,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid config file '{}': {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("photobooth").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/photobooth/config.toml")
        })
}

/// Contents written by `config init`.
pub const DEFAULT_CONFIG: &str = r##"# photobooth configuration

[session]
# Photos per strip
photo_count = 3
# Countdown before each photo, in seconds
countdown_secs = 1
# Flash overlay duration
flash_ms = 200
# Time from one photo to the next countdown, flash included
settle_ms = 1000
# Delay before retrying a failed capture
retry_ms = 250
# Failed captures in a row before the sequence stops
max_capture_attempts = 3
# Play a shutter sound with every photo
shutter_sound = true

[camera]
# Camera id (from list-cameras); first available when unset
# device = "0"
# Preferred resolution (16:9)
resolution = "1920x1080"
# Mirror horizontally (selfie mode)
mirror = false

[strip]
width = 1080
height = 1920
padding = 40
gap = 20
# #RRGGBB, #RGB, or one of: white, black, pink
background = "#FFFFFF"
# Where photo-strip.png is saved
output_dir = "."
"##;
