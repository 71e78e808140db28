//! Video input enumeration and device selection.

use super::provider::CameraProvider;
use super::types::{CameraError, DeviceDescriptor};

/// List video input devices, swallowing failures.
///
/// Permission and platform errors are logged and produce an empty list so a
/// missing camera never takes the booth down.
pub fn list_video_input_devices(provider: &dyn CameraProvider) -> Vec<DeviceDescriptor> {
    match provider.enumerate_devices() {
        Ok(devices) => devices,
        Err(e) => {
            log::warn!("Error getting cameras: {}", e);
            Vec::new()
        }
    }
}

/// Outcome of a re-enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<String>,
    pub current: Option<String>,
}

impl SelectionChange {
    /// Whether the selected device is different after the refresh.
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Current device list plus the user's selection.
#[derive(Debug, Default)]
pub struct DeviceEnumerator {
    devices: Vec<DeviceDescriptor>,
    selected: Option<String>,
}

impl DeviceEnumerator {
    /// Create an enumerator that will prefer `preferred` if it shows up.
    pub fn new(preferred: Option<String>) -> Self {
        Self {
            devices: Vec::new(),
            selected: preferred,
        }
    }

    /// Re-run enumeration.
    ///
    /// Keeps the selected device when it is still connected, otherwise falls
    /// back to the first device, or to no selection when none are left.
    pub fn refresh(&mut self, provider: &dyn CameraProvider) -> SelectionChange {
        let previous = self.selected.clone();
        self.devices = list_video_input_devices(provider);

        let still_present = self
            .selected
            .as_deref()
            .is_some_and(|id| self.devices.iter().any(|d| d.id == id));
        if !still_present {
            self.selected = self.devices.first().map(|d| d.id.clone());
        }

        let change = SelectionChange {
            previous,
            current: self.selected.clone(),
        };
        if change.changed() {
            log::info!(
                "Camera selection changed: {:?} -> {:?} ({} device(s))",
                change.previous,
                change.current,
                self.devices.len()
            );
        }
        change
    }

    /// Select a device from the current list.
    ///
    /// # Errors
    /// * `CameraError::DeviceNotFound` - If `id` is not in the last enumeration
    pub fn select(&mut self, id: &str) -> Result<SelectionChange, CameraError> {
        if !self.devices.iter().any(|d| d.id == id) {
            return Err(CameraError::DeviceNotFound(id.to_string()));
        }
        let previous = self.selected.replace(id.to_string());
        Ok(SelectionChange {
            previous,
            current: self.selected.clone(),
        })
    }

    /// Forget every device, e.g. after permission was refused.
    pub fn clear(&mut self) {
        self.devices.clear();
        self.selected = None;
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// The selected device, if it is in the current list.
    pub fn selected(&self) -> Option<&DeviceDescriptor> {
        let id = self.selected.as_deref()?;
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}
