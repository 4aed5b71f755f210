use palette::{FromColor, Hsl, IntoColor, Lab, Oklch, Srgb};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a hex color string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseColorError {
    #[error("invalid hex color '{input}': expected 3 or 6 hex digits, got {len}")]
    Length { input: String, len: usize },

    #[error("invalid hex color '{input}': non-hex digit")]
    Digit { input: String },
}

/// Core color type used throughout the pipeline.
/// Wraps sRGB u8 components and provides conversions to perceptual color spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex color string like `#ff8800`, `FF8800` or the short `#f80`.
    pub fn from_hex(hex: &str) -> Result<Self, ParseColorError> {
        let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
        let expanded: String = match digits.len() {
            6 => digits.to_string(),
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            len => {
                return Err(ParseColorError::Length {
                    input: hex.to_string(),
                    len,
                })
            }
        };
        let channel = |range: std::ops::Range<usize>| {
            expanded
                .get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| ParseColorError::Digit {
                    input: hex.to_string(),
                })
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Serialize to lowercase hex `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Packed `0xrrggbb` value.
    pub fn to_u32(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Convert to `palette::Srgb<u8>`.
    pub fn to_srgb_u8(self) -> Srgb<u8> {
        Srgb::new(self.r, self.g, self.b)
    }

    /// Create from `palette::Srgb<u8>`.
    pub fn from_srgb_u8(srgb: Srgb<u8>) -> Self {
        Self {
            r: srgb.red,
            g: srgb.green,
            b: srgb.blue,
        }
    }

    /// Convert to CIELAB (for K-means clustering and deduplication).
    pub fn to_lab(self) -> Lab {
        let srgb_f32: Srgb<f32> = self.to_srgb_u8().into_format();
        srgb_f32.into_color()
    }

    /// Create from CIELAB.
    pub fn from_lab(lab: Lab) -> Self {
        let srgb_f32: Srgb<f32> = Srgb::from_color(lab);
        Self::from_srgb_f32_clamped(srgb_f32)
    }

    /// Convert to Oklch (for lightness adjustments).
    pub fn to_oklch(self) -> Oklch {
        let srgb_f32: Srgb<f32> = self.to_srgb_u8().into_format();
        srgb_f32.into_color()
    }

    /// Create from Oklch.
    pub fn from_oklch(oklch: Oklch) -> Self {
        let srgb_f32: Srgb<f32> = Srgb::from_color(oklch);
        Self::from_srgb_f32_clamped(srgb_f32)
    }

    /// Clamp an Srgb<f32> to [0, 1] and convert to Color.
    fn from_srgb_f32_clamped(srgb: Srgb<f32>) -> Self {
        let r = (srgb.red.clamp(0.0, 1.0) * 255.0).round() as u8;
        let g = (srgb.green.clamp(0.0, 1.0) * 255.0).round() as u8;
        let b = (srgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self { r, g, b }
    }

    /// WCAG 2.0 relative luminance.
    ///
    /// Linearizes each sRGB channel, then computes the weighted sum.
    pub fn relative_luminance(self) -> f32 {
        fn linearize(c: u8) -> f32 {
            let c = c as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        let r = linearize(self.r);
        let g = linearize(self.g);
        let b = linearize(self.b);
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }

    /// WCAG 2.0 contrast ratio between two colors.
    ///
    /// Returns a value in [1, 21]. Higher means more contrast.
    pub fn contrast_ratio(c1: &Color, c2: &Color) -> f32 {
        let l1 = c1.relative_luminance();
        let l2 = c2.relative_luminance();
        let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };
        (lighter + 0.05) / (darker + 0.05)
    }

    /// Adjust Oklch lightness by `delta`. Positive = lighter, negative = darker.
    /// Lightness is clamped to [0, 1].
    pub fn adjust_lightness(self, delta: f32) -> Color {
        let mut oklch = self.to_oklch();
        oklch.l = (oklch.l + delta).clamp(0.0, 1.0);
        Color::from_oklch(oklch)
    }

    /// Move each channel towards white by `amount` (0-1).
    pub fn lighten(self, amount: f32) -> Color {
        let amount = amount.clamp(0.0, 1.0);
        let up = |c: u8| (c as f32 + (255.0 - c as f32) * amount) as u8;
        Color::new(up(self.r), up(self.g), up(self.b))
    }

    /// Scale each channel towards black by `amount` (0-1).
    pub fn darken(self, amount: f32) -> Color {
        let amount = amount.clamp(0.0, 1.0);
        let down = |c: u8| (c as f32 * (1.0 - amount)) as u8;
        Color::new(down(self.r), down(self.g), down(self.b))
    }

    /// Channel-wise midpoint of two colors.
    pub fn blend(self, other: Color) -> Color {
        let mid = |a: u8, b: u8| ((u16::from(a) + u16::from(b)) / 2) as u8;
        Color::new(
            mid(self.r, other.r),
            mid(self.g, other.g),
            mid(self.b, other.b),
        )
    }

    /// Replace HSL saturation with `amount` (0-1), keeping hue and lightness.
    pub fn with_saturation(self, amount: f32) -> Color {
        let srgb_f32: Srgb<f32> = self.to_srgb_u8().into_format();
        let mut hsl: Hsl = Hsl::from_color(srgb_f32);
        hsl.saturation = amount.clamp(0.0, 1.0);
        Self::from_srgb_f32_clamped(Srgb::from_color(hsl))
    }

    /// `r,g,b` in decimal.
    pub fn to_rgb_triplet(self) -> String {
        format!("{},{},{}", self.r, self.g, self.b)
    }

    /// `rr/gg/bb/ff` as understood by xrdb.
    pub fn to_xrgba(self) -> String {
        format!("{:02x}/{:02x}/{:02x}/ff", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::str::FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Color::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}
