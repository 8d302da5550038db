//! RGB colors as used for task fills.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An opaque RGB color, serialized as `#RRGGBB`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid color '{0}': expected #RGB or #RRGGBB")]
pub struct ColorParseError(pub String);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Blend towards white (positive `percent`) or black (negative `percent`).
    ///
    /// `percent` is a fraction in `[-1, 1]`; each channel moves by
    /// `round((target - channel) * |percent|)`.
    pub fn shade(self, percent: f64) -> Self {
        let target = if percent < 0.0 { 0.0 } else { 255.0 };
        let amount = percent.abs().min(1.0);
        let blend = |channel: u8| {
            let c = f64::from(channel);
            (((target - c) * amount).round() + c).clamp(0.0, 255.0) as u8
        };
        Self::rgb(blend(self.r), blend(self.g), blend(self.b))
    }
}

impl Default for Color {
    fn default() -> Self {
        // #00B099
        Self::rgb(0x00, 0xB0, 0x99)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() {
            return Err(err());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| err());
        match hex.len() {
            6 => Ok(Self::rgb(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let expand = |i: usize| channel(&hex[i..=i].repeat(2));
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!("#00B099".parse::<Color>().unwrap(), Color::default());
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::rgb(255, 255, 255));
        assert!("00B099".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#GG0000".parse::<Color>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let c = Color::rgb(1, 176, 170);
        assert_eq!(c.to_string(), "#01B0AA");
        assert_eq!(c.to_string().parse::<Color>().unwrap(), c);
    }

    #[test]
    fn shade_lightens_and_darkens() {
        let base = Color::rgb(100, 0, 200);
        assert_eq!(base.shade(0.0), base);
        assert_eq!(base.shade(0.5), Color::rgb(178, 128, 228));
        assert_eq!(base.shade(-0.5), Color::rgb(50, 0, 100));
        assert_eq!(base.shade(1.0), Color::rgb(255, 255, 255));
    }

    #[test]
    fn serde_uses_hex_strings() {
        let json = serde_json::to_string(&Color::default()).unwrap();
        assert_eq!(json, "\"#00B099\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::default());
    }
}
