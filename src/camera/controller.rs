//! Ownership of the single open camera stream.

use super::provider::{CameraProvider, LiveStream};
use super::types::{CameraError, Resolution, StreamConstraints};

/// Holds at most one live stream and releases it before opening another.
pub struct CameraController {
    stream: Option<Box<dyn LiveStream>>,
    preferred: Resolution,
}

impl std::fmt::Debug for CameraController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraController")
            .field("preferred", &self.preferred)
            .field("device", &self.active_device())
            .finish_non_exhaustive()
    }
}

impl CameraController {
    pub fn new(preferred: Resolution) -> Self {
        Self {
            stream: None,
            preferred,
        }
    }

    /// Open `device_id`, stopping the current stream first.
    ///
    /// Asks for the preferred resolution at an exact matching aspect ratio.
    /// If the device cannot satisfy that, retries with the device alone and
    /// takes whatever it delivers. When the running track reports
    /// capabilities the constraints are re-applied to it.
    ///
    /// # Errors
    /// Any provider error other than unsatisfiable constraints, or the error
    /// from the relaxed retry.
    pub fn open(
        &mut self,
        provider: &mut dyn CameraProvider,
        device_id: &str,
    ) -> Result<(), CameraError> {
        self.release();

        let constraints = StreamConstraints::preferred(device_id, self.preferred);
        let mut stream = match provider.open_stream(&constraints) {
            Ok(stream) => stream,
            Err(CameraError::ConstraintsUnsatisfiable(reason)) => {
                log::warn!(
                    "Camera {} cannot deliver {} ({}); using device defaults",
                    device_id,
                    self.preferred,
                    reason
                );
                provider.open_stream(&constraints.relaxed())?
            }
            Err(e) => return Err(e),
        };

        if stream.capabilities().is_some() {
            if let Err(e) = stream.apply_constraints(&constraints) {
                log::debug!("Keeping stream settings for {}: {}", device_id, e);
            }
        }

        log::info!(
            "Opened camera {} at {}",
            device_id,
            stream
                .resolution()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown resolution".to_string())
        );
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop every track of the current stream, if any.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            log::info!("Released camera {}", stream.device_id());
        }
    }

    pub fn stream(&self) -> Option<&dyn LiveStream> {
        self.stream.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Device of the open stream.
    pub fn active_device(&self) -> Option<&str> {
        self.stream.as_deref().map(|s| s.device_id())
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.release();
    }
}
