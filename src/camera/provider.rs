//! Platform camera boundary.
//!
//! Everything the booth needs from a camera stack goes through these two
//! traits, so the pipeline runs the same against real webcams, the built-in
//! test pattern, or a test double.

use image::RgbImage;
use tokio::sync::broadcast;

use super::types::{CameraError, DeviceDescriptor, Resolution, StreamCapabilities, StreamConstraints};
use crate::permissions::PermissionState;

/// Notification that the set of connected cameras changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceChange;

/// Source of camera devices and streams.
pub trait CameraProvider {
    /// Current permission state. Must not prompt the user.
    fn permission_state(&self) -> PermissionState;

    /// Explicitly ask for camera access.
    ///
    /// # Errors
    /// * `CameraError::PermissionDenied` - If access is refused
    fn request_permission(&mut self) -> Result<(), CameraError>;

    /// List video input devices. Must not request permission.
    fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>, CameraError>;

    /// Open a live stream for the device named in `constraints`.
    ///
    /// # Errors
    /// * `CameraError::ConstraintsUnsatisfiable` - If the device cannot meet the exact constraints
    /// * `CameraError::DeviceNotFound` - If the device is not connected
    /// * `CameraError::PermissionDenied` - If access has not been granted
    fn open_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn LiveStream>, CameraError>;

    /// Subscribe to hot-plug notifications.
    ///
    /// Returns `None` when the platform cannot signal changes; callers then
    /// poll [`CameraProvider::enumerate_devices`] instead.
    fn device_changes(&self) -> Option<broadcast::Receiver<DeviceChange>> {
        None
    }
}

/// An open camera feed.
pub trait LiveStream {
    /// Device this stream was opened on.
    fn device_id(&self) -> &str;

    /// Native video size, once known.
    fn resolution(&self) -> Option<Resolution>;

    /// Track capabilities, where the platform reports them.
    fn capabilities(&self) -> Option<StreamCapabilities>;

    /// Re-apply constraints to the running track.
    fn apply_constraints(&mut self, constraints: &StreamConstraints) -> Result<(), CameraError>;

    /// The frame currently shown by the stream.
    ///
    /// Returns `None` when no frame is available (stream stopped, surface not
    /// ready yet).
    fn snapshot(&self) -> Option<RgbImage>;

    /// Stop every underlying track. Idempotent.
    fn stop(&mut self);

    /// Whether the stream is still delivering frames.
    fn is_live(&self) -> bool;
}
