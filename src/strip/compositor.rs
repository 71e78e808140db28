//! Lay captured frames out on one vertical strip.

use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::thread;

use super::color::Color;
use super::layout::StripLayout;
use crate::frame::Frame;

/// Name the strip is saved under.
pub const DOWNLOAD_FILE_NAME: &str = "photo-strip.png";

/// Errors that can occur while building or saving a strip.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// Wrong number of frames for the layout
    #[error("Expected {expected} photos but got {actual}. Retake the photos to build a strip")]
    IncompleteSession { expected: usize, actual: usize },
    /// Geometry with no room for the photos
    #[error("Invalid strip layout: {0}")]
    InvalidLayout(String),
    /// A frame could not be decoded
    #[error("Failed to decode photo {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: image::ImageError,
    },
    /// The finished strip could not be encoded
    #[error("Failed to encode photo strip: {0}")]
    Encode(#[source] image::ImageError),
    /// The strip could not be written
    #[error("Failed to save photo strip to '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A finished strip: the raster and its PNG encoding.
#[derive(Debug, Clone)]
pub struct CompositeImage {
    image: RgbaImage,
    png: Vec<u8>,
}

impl CompositeImage {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Save as `photo-strip.png` in `dir`.
    ///
    /// Existing files are never overwritten; like a browser download the
    /// name gains a ` (1)`, ` (2)`, ... suffix instead.
    pub fn download(&self, dir: &Path) -> Result<PathBuf, ComposeError> {
        let path = unique_download_path(dir);
        std::fs::write(&path, &self.png).map_err(|source| ComposeError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("Saved photo strip to {}", path.display());
        Ok(path)
    }
}

/// Render `frames` onto a strip.
///
/// All frames are decoded before anything is drawn, and frame `i` always
/// lands in slot `i` (top to bottom) regardless of which decode finished
/// first. The output depends only on the arguments.
///
/// # Errors
/// * `ComposeError::IncompleteSession` - If `frames.len()` differs from `layout.count`
/// * `ComposeError::InvalidLayout` - If the layout leaves no room for the photos
pub fn compose(
    frames: &[Frame],
    background: Color,
    layout: &StripLayout,
) -> Result<CompositeImage, ComposeError> {
    layout.validate().map_err(ComposeError::InvalidLayout)?;
    if frames.len() != layout.count {
        return Err(ComposeError::IncompleteSession {
            expected: layout.count,
            actual: frames.len(),
        });
    }

    let decoded = decode_all(frames)?;

    let mut canvas = RgbaImage::from_pixel(layout.width, layout.height, background.to_rgba());
    for (photo, slot) in decoded.iter().zip(layout.slots()) {
        if slot.width == 0 || slot.height == 0 {
            continue;
        }
        let scaled = imageops::resize(photo, slot.width, slot.height, FilterType::Triangle);
        imageops::overlay(&mut canvas, &scaled, i64::from(slot.x), i64::from(slot.y));
    }

    let mut png = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(ComposeError::Encode)?;

    log::debug!(
        "Composed {} photo(s) on a {}x{} strip, background {}",
        frames.len(),
        layout.width,
        layout.height,
        background
    );
    Ok(CompositeImage { image: canvas, png })
}

/// Decode every frame on its own thread and return them in input order.
fn decode_all(frames: &[Frame]) -> Result<Vec<RgbaImage>, ComposeError> {
    thread::scope(|scope| {
        let handles: Vec<_> = frames
            .iter()
            .map(|frame| scope.spawn(move || frame.decode()))
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| {
                let decoded = handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                decoded.map_err(|source| ComposeError::Decode { index, source })
            })
            .collect()
    })
}

fn unique_download_path(dir: &Path) -> PathBuf {
    let first = dir.join(DOWNLOAD_FILE_NAME);
    if !first.exists() {
        return first;
    }
    let stem = DOWNLOAD_FILE_NAME.trim_end_matches(".png");
    (1..)
        .map(|n| dir.join(format!("{} ({}).png", stem, n)))
        .find(|p| !p.exists())
        .unwrap_or(first)
}
