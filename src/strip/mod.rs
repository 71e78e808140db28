//! Building the final photo strip.

mod color;
mod compositor;
mod layout;

pub use color::Color;
pub use compositor::{compose, ComposeError, CompositeImage, DOWNLOAD_FILE_NAME};
pub use layout::{SlotRect, StripLayout, MAX_STRIP_DIMENSION};
