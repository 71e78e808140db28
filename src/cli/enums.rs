//! CLI enum types.

use clap::ValueEnum;

use crate::camera::Resolution;

/// Preferred camera resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResolutionPreset {
    /// 1920x1080
    #[default]
    FullHd,
    /// 1280x720
    Hd,
}

impl From<ResolutionPreset> for Resolution {
    fn from(preset: ResolutionPreset) -> Self {
        match preset {
            ResolutionPreset::FullHd => Resolution::FULL_HD,
            ResolutionPreset::Hd => Resolution::HD,
        }
    }
}
