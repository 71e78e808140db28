//! photobooth library crate.
//!
//! Webcam capture with a timed countdown, composited into one vertical
//! photo strip. The binary in `main.rs` is a thin CLI over these modules.

pub mod booth;
pub mod camera;
pub mod capture;
pub mod cli;
pub mod config;
pub mod event_loop;
pub mod frame;
pub mod permissions;
pub mod strip;
