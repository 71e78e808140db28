//! Error types for frame capture.

/// Errors that can occur while capturing a frame into a session.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// No camera stream is open
    #[error("No camera is open. Select a camera before starting the countdown")]
    NoLiveStream,
    /// The stream had no frame to read at the moment of capture
    #[error("Camera '{device}' had no frame available")]
    SurfaceUnavailable { device: String },
    /// The snapshot could not be encoded
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
    /// The session already holds every frame it can
    #[error("Session is complete ({capacity} of {capacity} frames)")]
    SessionFull { capacity: usize },
}
