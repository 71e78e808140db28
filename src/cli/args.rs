//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::ResolutionPreset;
use crate::config::Config;
use crate::strip::Color;

/// Webcam photo booth that builds a vertical photo strip
#[derive(Parser, Debug)]
#[command(name = "photobooth")]
#[command(version, about = "Webcam photo booth that builds a vertical photo strip", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub shoot: ShootArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Take the photos and save the strip (default)
    Shoot(ShootArgs),
    /// List available cameras
    ListCameras {
        /// List the built-in test-pattern cameras instead of real ones
        #[arg(long)]
        test_pattern: bool,
    },
    /// Build a strip from existing image files
    Compose(ComposeArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Config file path
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Create default config file
    Init,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ShootArgs {
    /// Camera id (from list-cameras)
    #[arg(long)]
    pub camera: Option<String>,

    /// Number of photos on the strip
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub count: Option<usize>,

    /// Countdown before each photo, in seconds
    #[arg(long)]
    pub countdown: Option<u32>,

    /// Strip background: #RRGGBB, #RGB, white, black or pink
    #[arg(long)]
    pub background: Option<Color>,

    /// Preferred camera resolution
    #[arg(long)]
    pub resolution: Option<ResolutionPreset>,

    /// Directory the strip is saved in
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Mirror photos horizontally (selfie mode)
    #[arg(long)]
    pub mirror: bool,

    /// Use the built-in test-pattern camera
    #[arg(long)]
    pub test_pattern: bool,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl ShootArgs {
    /// Apply flags on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(camera) = &self.camera {
            config.camera.device = Some(camera.clone());
        }
        if let Some(count) = self.count {
            config.session.photo_count = count;
        }
        if let Some(countdown) = self.countdown {
            config.session.countdown_secs = countdown;
        }
        if let Some(background) = self.background {
            config.strip.background = background;
        }
        if let Some(resolution) = self.resolution {
            config.camera.resolution = resolution.into();
        }
        if let Some(output) = &self.output {
            config.strip.output_dir = output.clone();
        }
        if self.mirror {
            config.camera.mirror = true;
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ComposeArgs {
    /// Image files, top to bottom
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Strip background: #RRGGBB, #RGB, white, black or pink
    #[arg(long)]
    pub background: Option<Color>,

    /// Directory the strip is saved in
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Flags for the shoot pipeline, whether given bare or after `shoot`.
    pub fn shoot_args(&self) -> Option<&ShootArgs> {
        match &self.command {
            None => Some(&self.shoot),
            Some(Command::Shoot(args)) => Some(args),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Resolution;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["photobooth"]);
        assert!(args.command.is_none());
        let shoot = args.shoot_args().unwrap();
        assert!(shoot.camera.is_none());
        assert!(shoot.count.is_none());
        assert!(shoot.background.is_none());
        assert!(!shoot.mirror);
        assert!(!shoot.test_pattern);
        assert!(shoot.config.is_none());
    }

    #[test]
    fn test_args_bare_and_subcommand_agree() {
        let bare = Args::parse_from(["photobooth", "--count", "4", "--test-pattern"]);
        let sub = Args::parse_from(["photobooth", "shoot", "--count", "4", "--test-pattern"]);
        for args in [&bare, &sub] {
            let shoot = args.shoot_args().unwrap();
            assert_eq!(shoot.count, Some(4));
            assert!(shoot.test_pattern);
        }
    }

    #[test]
    fn test_args_zero_count_rejected() {
        assert!(Args::try_parse_from(["photobooth", "--count", "0"]).is_err());
    }

    #[test]
    fn test_args_background_parsing() {
        let args = Args::parse_from(["photobooth", "--background", "#ffe4e1"]);
        assert_eq!(args.shoot.background, Some(Color::PINK));

        let args = Args::parse_from(["photobooth", "--background", "black"]);
        assert_eq!(args.shoot.background, Some(Color::BLACK));

        assert!(Args::try_parse_from(["photobooth", "--background", "nope"]).is_err());
    }

    #[test]
    fn test_args_resolution_values() {
        let args = Args::parse_from(["photobooth", "--resolution", "hd"]);
        assert_eq!(args.shoot.resolution, Some(ResolutionPreset::Hd));

        let args = Args::parse_from(["photobooth", "--resolution", "full-hd"]);
        assert_eq!(args.shoot.resolution, Some(ResolutionPreset::FullHd));
    }

    #[test]
    fn test_args_apply_overrides_config() {
        let args = Args::parse_from([
            "photobooth",
            "--camera",
            "1",
            "--count",
            "2",
            "--countdown",
            "3",
            "--background",
            "pink",
            "--resolution",
            "hd",
            "--output",
            "/tmp/strips",
            "--mirror",
        ]);
        let mut config = Config::default();
        args.shoot.apply(&mut config);

        assert_eq!(config.camera.device.as_deref(), Some("1"));
        assert_eq!(config.session.photo_count, 2);
        assert_eq!(config.session.countdown_secs, 3);
        assert_eq!(config.strip.background, Color::PINK);
        assert_eq!(config.camera.resolution, Resolution::HD);
        assert_eq!(config.strip.output_dir, PathBuf::from("/tmp/strips"));
        assert!(config.camera.mirror);
    }

    #[test]
    fn test_args_apply_keeps_config_when_unset() {
        let mut config = Config::default();
        config.session.photo_count = 5;
        config.camera.mirror = true;
        ShootArgs::default().apply(&mut config);
        assert_eq!(config.session.photo_count, 5);
        assert!(config.camera.mirror);
    }

    #[test]
    fn test_args_list_cameras_subcommand() {
        let args = Args::parse_from(["photobooth", "list-cameras", "--test-pattern"]);
        assert!(matches!(
            args.command,
            Some(Command::ListCameras { test_pattern: true })
        ));
        assert!(args.shoot_args().is_none());
    }

    #[test]
    fn test_args_compose_subcommand() {
        let args = Args::parse_from(["photobooth", "compose", "a.png", "b.png", "-o", "out"]);
        match args.command {
            Some(Command::Compose(compose)) => {
                assert_eq!(compose.images, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
                assert_eq!(compose.output, Some(PathBuf::from("out")));
            }
            _ => panic!("Expected Compose subcommand"),
        }
        assert!(Args::try_parse_from(["photobooth", "compose"]).is_err());
    }

    #[test]
    fn test_args_config_subcommands() {
        let args = Args::parse_from(["photobooth", "config", "show"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Show { config: None }
            })
        ));

        let args = Args::parse_from(["photobooth", "config", "init"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Init
            })
        ));
    }
}
