//! Reading one still out of the live stream.

use image::imageops;
use std::time::Instant;

use super::errors::CaptureError;
use crate::camera::LiveStream;
use crate::frame::Frame;

/// Copy the stream's current frame at its native resolution and encode it.
///
/// A missing stream or an empty surface is an error rather than a silent
/// skip, so the caller can decide whether to retry.
pub fn capture_frame(
    stream: Option<&dyn LiveStream>,
    mirror: bool,
    at: Instant,
) -> Result<Frame, CaptureError> {
    let stream = stream.ok_or(CaptureError::NoLiveStream)?;
    let mut image = stream
        .snapshot()
        .ok_or_else(|| CaptureError::SurfaceUnavailable {
            device: stream.device_id().to_string(),
        })?;

    if mirror {
        imageops::flip_horizontal_in_place(&mut image);
    }

    Ok(Frame::encode(&image, at)?)
}
