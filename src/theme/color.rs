use anyhow::{anyhow, Result};
use std::fmt;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` (the `#` is optional).
    pub fn from_hex(value: &str) -> Result<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("Invalid color '{value}'"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| anyhow!("Invalid color '{value}'"))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Moves each channel `percent` of the way towards white.
    pub fn lighten(self, percent: u8) -> Self {
        let percent = u16::from(percent.min(100));
        let up = |c: u8| c.saturating_add(((u16::from(255 - c) * percent) / 100) as u8);
        Self::rgb(up(self.r), up(self.g), up(self.b))
    }

    /// Moves each channel `percent` of the way towards black.
    pub fn darken(self, percent: u8) -> Self {
        let percent = u16::from(percent.min(100));
        let down = |c: u8| c.saturating_sub(((u16::from(c) * percent) / 100) as u8);
        Self::rgb(down(self.r), down(self.g), down(self.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}
