//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ComposeArgs, ConfigAction, ShootArgs};
pub use commands::{compose_files, handle_config_action, list_cameras, shoot, CliResult};
pub use enums::ResolutionPreset;
