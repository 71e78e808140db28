//! Captured still frames.

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;
use std::time::Instant;

/// A single captured still, PNG-encoded at the video's native resolution.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    png: Vec<u8>,
    width: u32,
    height: u32,
    captured_at: Instant,
}

impl Frame {
    /// Encode a raster snapshot.
    pub fn encode(image: &RgbImage, captured_at: Instant) -> Result<Self, image::ImageError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self {
            png,
            width: image.width(),
            height: image.height(),
            captured_at,
        })
    }

    /// Wrap already-encoded image bytes, e.g. a file picked from disk.
    ///
    /// The bytes are decoded once to learn the dimensions and re-encoded as
    /// PNG so every frame has the same encoding.
    pub fn from_encoded(bytes: &[u8], captured_at: Instant) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(bytes)?;
        Self::encode(&decoded.to_rgb8(), captured_at)
    }

    /// Decode back to a raster.
    pub fn decode(&self) -> Result<RgbaImage, image::ImageError> {
        let decoded: DynamicImage = image::load_from_memory_with_format(&self.png, ImageFormat::Png)?;
        Ok(decoded.to_rgba8())
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }
}
