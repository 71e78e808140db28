//! Strip background colors.

use image::Rgba;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const PINK: Color = Color::rgb(0xFF, 0xE4, 0xE1);

    /// Named choices offered next to the strip preview.
    pub const PRESETS: [(&'static str, Color); 3] = [
        ("white", Color::WHITE),
        ("black", Color::BLACK),
        ("pink", Color::PINK),
    ];

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 0xFF])
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    /// Accepts `#RRGGBB`, `#RGB` (with or without `#`) and preset names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((_, color)) = Color::PRESETS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
        {
            return Ok(*color);
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        let invalid = || {
            format!(
                "Invalid color '{}'. Use #RRGGBB, #RGB, or one of: white, black, pink",
                s
            )
        };
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());

        match hex.len() {
            6 => Ok(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Color::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_hex() {
        assert_eq!("#FFE4E1".parse::<Color>(), Ok(Color::PINK));
        assert_eq!("ffe4e1".parse::<Color>(), Ok(Color::PINK));
        assert_eq!("#000000".parse::<Color>(), Ok(Color::BLACK));
    }

    #[test]
    fn test_parse_short_hex() {
        assert_eq!("#fff".parse::<Color>(), Ok(Color::WHITE));
        assert_eq!("#f80".parse::<Color>(), Ok(Color::rgb(0xFF, 0x88, 0x00)));
    }

    #[test]
    fn test_parse_presets_case_insensitive() {
        assert_eq!("Black".parse::<Color>(), Ok(Color::BLACK));
        assert_eq!(" pink ".parse::<Color>(), Ok(Color::PINK));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("#12345".parse::<Color>().is_err());
        assert!("#GGGGGG".parse::<Color>().is_err());
        assert!("teal".parse::<Color>().is_err());
        assert!("".parse::<Color>().is_err());
    }

    #[test]
    fn test_display_is_upper_hex() {
        assert_eq!(Color::PINK.to_string(), "#FFE4E1");
        assert_eq!(Color::rgb(1, 2, 3).to_string(), "#010203");
    }

    #[test]
    fn test_to_rgba_is_opaque() {
        assert_eq!(Color::PINK.to_rgba(), Rgba([0xFF, 0xE4, 0xE1, 0xFF]));
    }
}
