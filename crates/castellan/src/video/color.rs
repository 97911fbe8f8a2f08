//! 8-bit RGBA colour value

use std::fmt;

use serde::{Deserialize, Serialize};

/// An RGBA colour with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel, `0xFF` is opaque
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::rgb(0xFF, 0xFF, 0xFF);
    /// Opaque black
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque red
    pub const RED: Self = Self::rgb(0xFF, 0, 0);
    /// Opaque green
    pub const GREEN: Self = Self::rgb(0, 0x80, 0);
    /// Opaque blue
    pub const BLUE: Self = Self::rgb(0, 0, 0xFF);
    /// Fully transparent black
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Create a colour from all four channels
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque colour
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xFF)
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`. Returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return None;
        }
        let channel = |index: usize| u8::from_str_radix(&digits[index..index + 2], 16).ok();
        let alpha = if digits.len() == 8 { channel(6)? } else { 0xFF };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, alpha))
    }

    /// `#RRGGBBAA` notation.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Create an opaque colour from hue (degrees), saturation and value (percent).
    ///
    /// Inputs are clamped to `[0, 360]` and `[0, 100]`.
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let hue = hue.clamp(0.0, 360.0);
        let value = value.clamp(0.0, 100.0) / 100.0;
        let chroma = value * (saturation.clamp(0.0, 100.0) / 100.0);
        Self::from_chroma(hue, chroma, value - chroma)
    }

    /// Create an opaque colour from hue (degrees), saturation and lightness (percent).
    ///
    /// Inputs are clamped to `[0, 360]` and `[0, 100]`.
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let hue = hue.clamp(0.0, 360.0);
        let lightness = lightness.clamp(0.0, 100.0) / 100.0;
        let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * (saturation.clamp(0.0, 100.0) / 100.0);
        Self::from_chroma(hue, chroma, lightness - chroma / 2.0)
    }

    fn from_chroma(hue: f64, chroma: f64, offset: f64) -> Self {
        let sector = hue / 60.0;
        let x = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
        let (r, g, b) = match sector {
            s if s < 1.0 => (chroma, x, 0.0),
            s if s < 2.0 => (x, chroma, 0.0),
            s if s < 3.0 => (0.0, chroma, x),
            s if s < 4.0 => (0.0, x, chroma),
            s if s < 5.0 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        Self::rgb(unit_to_byte(r + offset), unit_to_byte(g + offset), unit_to_byte(b + offset))
    }

    /// The same colour with another alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Linear interpolation between `self` and `other`.
    ///
    /// `bias` is clamped to `[0, 1]`; `0` yields `self`, `1` yields `other`.
    pub fn blend(self, other: Self, bias: f64) -> Self {
        let bias = bias.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| {
            unit_to_byte((f64::from(a) * (1.0 - bias) + f64::from(b) * bias) / 255.0)
        };
        Self::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b), mix(self.a, other.a))
    }

    /// Channels as `[r, g, b, a]`.
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Channels scaled to `[0, 1]`.
    pub fn normalized(self) -> [f32; 4] {
        self.to_array().map(|channel| f32::from(channel) / 255.0)
    }
}

fn unit_to_byte(value: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let byte = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    byte
}

impl From<[u8; 4]> for Color {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self::new(r, g, b, a)
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "color{{r: {}, g: {}, b: {}, a: {}}}", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#FF8000"), Some(Color::rgb(0xFF, 0x80, 0)));
        assert_eq!(Color::from_hex("#12345678"), Some(Color::new(0x12, 0x34, 0x56, 0x78)));
        assert_eq!(Color::from_hex("#abcdef").map(Color::to_hex).as_deref(), Some("#ABCDEFFF"));
        assert_eq!(Color::from_hex("FF8000"), None);
        assert_eq!(Color::from_hex("#FF80"), None);
        assert_eq!(Color::from_hex("#GG0000"), None);
        assert_eq!(Color::from_hex("#ÿÿÿ"), None);
    }

    #[test]
    fn test_from_hsv() {
        assert_eq!(Color::from_hsv(0.0, 0.0, 0.0), Color::BLACK);
        assert_eq!(Color::from_hsv(0.0, 0.0, 100.0), Color::WHITE);
        assert_eq!(Color::from_hsv(0.0, 100.0, 100.0), Color::RED);
        assert_eq!(Color::from_hsv(120.0, 100.0, 100.0), Color::rgb(0, 0xFF, 0));
        assert_eq!(Color::from_hsv(240.0, 100.0, 100.0), Color::BLUE);
        assert_eq!(Color::from_hsv(360.0, 100.0, 100.0), Color::RED);
    }

    #[test]
    fn test_from_hsl() {
        assert_eq!(Color::from_hsl(0.0, 0.0, 0.0), Color::BLACK);
        assert_eq!(Color::from_hsl(0.0, 0.0, 100.0), Color::WHITE);
        assert_eq!(Color::from_hsl(0.0, 100.0, 50.0), Color::RED);
        assert_eq!(Color::from_hsl(240.0, 100.0, 50.0), Color::BLUE);
    }

    #[test]
    fn test_blend() {
        assert_eq!(Color::BLACK.blend(Color::WHITE, 0.0), Color::BLACK);
        assert_eq!(Color::BLACK.blend(Color::WHITE, 1.0), Color::WHITE);
        assert_eq!(Color::BLACK.blend(Color::WHITE, 0.5), Color::rgb(0x80, 0x80, 0x80));
        assert_eq!(Color::BLACK.blend(Color::WHITE, 7.0), Color::WHITE);
    }

    #[test]
    fn test_normalized() {
        let [r, g, b, a] = Color::new(0xFF, 0, 0x33, 0x80).normalized();
        assert_relative_eq!(r, 1.0);
        assert_relative_eq!(g, 0.0);
        assert_relative_eq!(b, 0.2);
        assert_relative_eq!(a, 0.501_960_8, epsilon = 1e-6);
    }

    #[test]
    fn test_display() {
        assert_eq!(Color::new(1, 2, 3, 4).to_string(), "color{r: 1, g: 2, b: 3, a: 4}");
        assert_eq!(Color::default(), Color::BLACK);
        assert_eq!(Color::RED.with_alpha(0).to_array(), [0xFF, 0, 0, 0]);
    }
}
