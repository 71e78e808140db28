//! Camera access: device enumeration, stream ownership and backends.
//!
//! - Device listing and selection via [`DeviceEnumerator`]
//! - The single open stream via [`CameraController`]
//! - Backends behind [`CameraProvider`]: [`TestPatternProvider`] always,
//!   `NativeProvider` with the `native-camera` feature

mod controller;
mod enumerator;
#[cfg(feature = "native-camera")]
mod native;
mod provider;
pub mod test_pattern;
mod types;

pub use controller::CameraController;
pub use enumerator::{list_video_input_devices, DeviceEnumerator, SelectionChange};
#[cfg(feature = "native-camera")]
pub use native::NativeProvider;
pub use provider::{CameraProvider, DeviceChange, LiveStream};
pub use test_pattern::{TestPatternDevice, TestPatternHandle, TestPatternProvider};
pub use types::{
    CameraError, DeviceDescriptor, Resolution, StreamCapabilities, StreamConstraints,
};
