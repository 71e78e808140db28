//! Camera types and data structures.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A selectable camera input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Stable identifier used to open the device
    pub id: String,
    /// Human-readable device name (may be empty before permission is granted)
    pub label: String,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Label to show in a device picker.
    ///
    /// Platforms hide labels until camera access is granted, so an empty
    /// label falls back to the device's position in the list.
    pub fn display_label(&self, position: usize) -> String {
        if self.label.trim().is_empty() {
            format!("Camera {}", position + 1)
        } else {
            self.label.clone()
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.label)
    }
}

/// Camera resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 1920x1080, the preferred capture size
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };

    /// 1280x720, for cameras or machines that struggle with 1080p
    pub const HD: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('x').collect();
        if parts.len() != 2 {
            return Err(format!(
                "Invalid resolution format '{}'. Use WIDTHxHEIGHT (e.g., 1920x1080)",
                s
            ));
        }
        let width: u32 = parts[0]
            .parse()
            .map_err(|_| format!("Invalid width '{}' in resolution", parts[0]))?;
        let height: u32 = parts[1]
            .parse()
            .map_err(|_| format!("Invalid height '{}' in resolution", parts[1]))?;
        if width == 0 || height == 0 {
            return Err("Resolution width and height must be greater than 0".to_string());
        }
        if width > 7680 || height > 4320 {
            return Err("Resolution exceeds maximum supported (7680x4320)".to_string());
        }
        Ok(Resolution { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What to ask of a camera when opening a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConstraints {
    /// Device to open; `None` lets the provider choose
    pub device_id: Option<String>,
    /// Preferred size; the device may deliver something else
    pub ideal: Option<Resolution>,
    /// Required width/height ratio, if any
    pub exact_aspect_ratio: Option<f64>,
}

impl StreamConstraints {
    /// Ideal resolution plus an exact aspect ratio matching it.
    pub fn preferred(device_id: &str, ideal: Resolution) -> Self {
        Self {
            device_id: Some(device_id.to_string()),
            ideal: Some(ideal),
            exact_aspect_ratio: Some(ideal.aspect_ratio()),
        }
    }

    /// Same device, no size or shape requirements.
    pub fn relaxed(&self) -> Self {
        Self {
            device_id: self.device_id.clone(),
            ideal: None,
            exact_aspect_ratio: None,
        }
    }

    /// Whether a device of the given native size satisfies the exact
    /// aspect-ratio requirement.
    pub fn accepts(&self, native: Resolution) -> bool {
        match self.exact_aspect_ratio {
            Some(ratio) => (native.aspect_ratio() - ratio).abs() < 0.01,
            None => true,
        }
    }
}

/// What a running track reports it can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCapabilities {
    pub max_resolution: Resolution,
}

/// Errors that can occur during camera operations.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// No cameras found on the system
    #[error("No cameras found")]
    NoDevices,
    /// Failed to query camera devices
    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),
    /// Failed to open camera
    #[error("Failed to open camera: {0}")]
    OpenFailed(String),
    /// Camera permission denied
    #[error("Camera permission denied")]
    PermissionDenied,
    /// Camera device not found
    #[error("Camera device '{0}' not found. Run 'list-cameras' to see available devices")]
    DeviceNotFound(String),
    /// Failed to start video stream
    #[error("Failed to start camera stream: {0}")]
    StreamFailed(String),
    /// The device cannot deliver what the constraints demand
    #[error("Camera cannot satisfy the requested constraints: {0}")]
    ConstraintsUnsatisfiable(String),
}
