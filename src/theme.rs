//! Colour tokens shared by the workbook and vector encoders

use std::collections::BTreeMap;

use crate::config::ThemeConfig;

/// An sRGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `RRGGBB` or `#RRGGBB`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// `0xRRGGBB`, the form spreadsheet libraries take
    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Channels scaled to `0.0..=1.0`, the form PDF colour operators take
    pub fn to_unit(self) -> (f64, f64, f64) {
        (
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }

    /// Blend towards white by `amount` (0 keeps the colour, 1 gives white)
    pub fn lighten(self, amount: f64) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let mix = |c: u8| (f64::from(c) + (255.0 - f64::from(c)) * amount).round() as u8;
        Self::new(mix(self.r), mix(self.g), mix(self.b))
    }
}

pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
pub const TEXT: Rgb = Rgb::new(0x21, 0x21, 0x21);
pub const MUTED: Rgb = Rgb::new(0x75, 0x75, 0x75);
pub const GRID: Rgb = Rgb::new(0xE0, 0xE0, 0xE0);
pub const PRIMARY: Rgb = Rgb::new(0x1F, 0x4E, 0x78);
pub const BAND: Rgb = Rgb::new(0xF2, 0xF6, 0xFA);
pub const METADATA: Rgb = Rgb::new(0xF5, 0xF5, 0xF5);

/// Series colours cycled by charts
pub const SERIES: [Rgb; 6] = [
    Rgb::new(0x1F, 0x4E, 0x78),
    Rgb::new(0x2E, 0x7D, 0x32),
    Rgb::new(0xF9, 0xA8, 0x25),
    Rgb::new(0x6A, 0x1B, 0x9A),
    Rgb::new(0x00, 0x83, 0x8F),
    Rgb::new(0xC6, 0x28, 0x28),
];

/// Colour for the `index`-th series entry
pub fn series_color(index: usize) -> Rgb {
    SERIES[index % SERIES.len()]
}

/// Status value to colour mapping
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPalette {
    colors: BTreeMap<String, Rgb>,
    fallback: Rgb,
}

impl StatusPalette {
    /// Build the palette from settings, skipping unparsable entries
    pub fn from_config(config: &ThemeConfig) -> Self {
        let colors = config
            .status_colors
            .iter()
            .filter_map(|(status, hex)| Some((status.to_lowercase(), Rgb::from_hex(hex)?)))
            .collect();
        Self {
            colors,
            fallback: TEXT,
        }
    }

    /// Colour for a status value; unknown statuses use the body text colour
    pub fn color_for(&self, status: &str) -> Rgb {
        self.colors
            .get(&status.trim().to_lowercase())
            .copied()
            .unwrap_or(self.fallback)
    }
}

impl Default for StatusPalette {
    fn default() -> Self {
        Self::from_config(&ThemeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgb::from_hex("#1F4E78"), Some(PRIMARY));
        assert_eq!(Rgb::from_hex("1f4e78"), Some(PRIMARY));
        assert_eq!(Rgb::from_hex("12345"), None);
        assert_eq!(Rgb::from_hex("zzzzzz"), None);
        assert_eq!(PRIMARY.to_u32(), 0x1F4E78);
    }

    #[test]
    fn test_completed_and_error_are_distinct() {
        let palette = StatusPalette::default();
        let completed = palette.color_for("completed");
        let error = palette.color_for("Error");
        assert_ne!(completed, error);
        assert_ne!(completed, TEXT);
        assert_ne!(error, TEXT);
    }

    #[test]
    fn test_unknown_status_falls_back() {
        let palette = StatusPalette::default();
        assert_eq!(palette.color_for("refunded"), TEXT);
    }

    #[test]
    fn test_lighten() {
        assert_eq!(PRIMARY.lighten(0.0), PRIMARY);
        assert_eq!(PRIMARY.lighten(1.0), WHITE);
    }
}
