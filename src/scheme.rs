use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cli::ThemeMode;
use crate::color::Color;
use crate::error::SchemeError;
use crate::storage::write_atomic;

/// Number of ANSI colors in a palette and a scheme.
pub const PALETTE_LEN: usize = 16;

/// Exactly 16 colors, most dominant first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette([Color; PALETTE_LEN]);

impl Palette {
    pub fn new(colors: [Color; PALETTE_LEN]) -> Self {
        Self(colors)
    }

    /// Build from colors ranked by dominance: keeps the 16 most dominant and
    /// pads short input with copies of the first. `None` for empty input.
    pub fn from_ranked(ranked: &[Color]) -> Option<Self> {
        let dominant = *ranked.first()?;
        let mut colors = [dominant; PALETTE_LEN];
        for (slot, color) in colors.iter_mut().zip(ranked) {
            *slot = *color;
        }
        Some(Self(colors))
    }

    pub fn colors(&self) -> &[Color; PALETTE_LEN] {
        &self.0
    }

    /// Read a pinned palette: one hex color per line. Blank lines and lines
    /// starting with `//` are ignored.
    pub fn load(path: &Path) -> Result<Self, SchemeError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut colors = Vec::with_capacity(PALETTE_LEN);
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let color = Color::from_hex(line).map_err(|source| SchemeError::PaletteEntry {
                path: path.to_path_buf(),
                line: idx + 1,
                source,
            })?;
            colors.push(color);
        }

        let found = colors.len();
        let colors: [Color; PALETTE_LEN] =
            colors
                .try_into()
                .map_err(|_| SchemeError::PaletteLength {
                    path: path.to_path_buf(),
                    found,
                })?;
        Ok(Self(colors))
    }
}

/// A named color slot of a [`ColorScheme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Background,
    Foreground,
    Cursor,
    /// `color0` .. `color15`
    Ansi(u8),
}

impl Slot {
    /// Every slot in canonical order: specials, then color0..color15.
    pub fn all() -> impl Iterator<Item = Slot> {
        [Slot::Background, Slot::Foreground, Slot::Cursor]
            .into_iter()
            .chain((0..PALETTE_LEN as u8).map(Slot::Ansi))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Background => f.write_str("background"),
            Slot::Foreground => f.write_str("foreground"),
            Slot::Cursor => f.write_str("cursor"),
            Slot::Ansi(i) => write!(f, "color{i}"),
        }
    }
}

impl FromStr for Slot {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "background" => Ok(Slot::Background),
            "foreground" => Ok(Slot::Foreground),
            "cursor" => Ok(Slot::Cursor),
            _ => {
                let digits = s.strip_prefix("color").ok_or(())?;
                // Reject "color01" and "color+1" so every slot has one spelling.
                if digits.is_empty()
                    || (digits.len() > 1 && digits.starts_with('0'))
                    || !digits.bytes().all(|b| b.is_ascii_digit())
                {
                    return Err(());
                }
                let idx: u8 = digits.parse().map_err(|_| ())?;
                if usize::from(idx) < PALETTE_LEN {
                    Ok(Slot::Ansi(idx))
                } else {
                    Err(())
                }
            }
        }
    }
}

/// The fixed-slot color assignment of one run.
///
/// Fields are private; the consuming `with_*` methods return a new scheme
/// rather than mutating a published one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "SchemeFile", try_from = "SchemeFile")]
pub struct ColorScheme {
    background: Color,
    foreground: Color,
    cursor: Color,
    colors: [Color; PALETTE_LEN],
    wallpaper: Option<String>,
    alpha: u8,
}

impl ColorScheme {
    pub fn new(
        colors: [Color; PALETTE_LEN],
        background: Color,
        foreground: Color,
        cursor: Color,
    ) -> Self {
        Self {
            background,
            foreground,
            cursor,
            colors,
            wallpaper: None,
            alpha: 100,
        }
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    pub fn cursor(&self) -> Color {
        self.cursor
    }

    pub fn colors(&self) -> &[Color; PALETTE_LEN] {
        &self.colors
    }

    /// Resolve any slot. Every slot always has a color.
    pub fn slot(&self, slot: Slot) -> Color {
        match slot {
            Slot::Background => self.background,
            Slot::Foreground => self.foreground,
            Slot::Cursor => self.cursor,
            Slot::Ansi(i) => self.colors[usize::from(i) % PALETTE_LEN],
        }
    }

    pub fn wallpaper(&self) -> Option<&str> {
        self.wallpaper.as_deref()
    }

    /// Background opacity in percent (0-100).
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    /// Dark when the background is darker than the foreground.
    pub fn mode(&self) -> ThemeMode {
        if self.background.relative_luminance() <= self.foreground.relative_luminance() {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        }
    }

    pub fn with_wallpaper(self, wallpaper: impl Into<String>) -> Self {
        Self {
            wallpaper: Some(wallpaper.into()),
            ..self
        }
    }

    /// Alpha is clamped to 100.
    pub fn with_alpha(self, alpha: u8) -> Self {
        Self {
            alpha: alpha.min(100),
            ..self
        }
    }

    /// Replace the background (and color0, which mirrors it).
    pub fn with_background(self, background: Color) -> Self {
        let mut colors = self.colors;
        colors[0] = background;
        Self {
            background,
            colors,
            ..self
        }
    }

    /// Apply `f` to the listed ANSI slots.
    pub fn map_ansi(self, slots: &[usize], f: impl Fn(Color) -> Color) -> Self {
        let mut colors = self.colors;
        for &i in slots.iter().filter(|&&i| i < PALETTE_LEN) {
            colors[i] = f(colors[i]);
        }
        Self { colors, ..self }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a serialized scheme (`colors.json` format).
    pub fn load(path: &Path) -> Result<Self, SchemeError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| SchemeError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the serialized scheme atomically.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut json = self.to_json().map_err(std::io::Error::other)?;
        json.push('\n');
        write_atomic(path, json.as_bytes())
    }
}

/// On-disk layout shared with other tools reading the cached colors.
#[derive(Serialize, Deserialize)]
struct SchemeFile {
    wallpaper: String,
    alpha: String,
    special: Special,
    colors: AnsiColors,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Special {
    background: Color,
    foreground: Color,
    cursor: Color,
}

struct AnsiColors([Color; PALETTE_LEN]);

const NO_WALLPAPER: &str = "None";

impl From<ColorScheme> for SchemeFile {
    fn from(scheme: ColorScheme) -> Self {
        Self {
            wallpaper: scheme
                .wallpaper
                .unwrap_or_else(|| NO_WALLPAPER.to_string()),
            alpha: scheme.alpha.to_string(),
            special: Special {
                background: scheme.background,
                foreground: scheme.foreground,
                cursor: scheme.cursor,
            },
            colors: AnsiColors(scheme.colors),
        }
    }
}

impl TryFrom<SchemeFile> for ColorScheme {
    type Error = String;

    fn try_from(file: SchemeFile) -> Result<Self, Self::Error> {
        let alpha: u8 = file
            .alpha
            .trim()
            .parse()
            .ok()
            .filter(|a| *a <= 100)
            .ok_or_else(|| format!("alpha must be 0-100, got '{}'", file.alpha))?;
        let wallpaper = (file.wallpaper != NO_WALLPAPER).then_some(file.wallpaper);
        Ok(Self {
            background: file.special.background,
            foreground: file.special.foreground,
            cursor: file.special.cursor,
            colors: file.colors.0,
            wallpaper,
            alpha,
        })
    }
}

impl Serialize for AnsiColors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PALETTE_LEN))?;
        for (i, color) in self.0.iter().enumerate() {
            map.serialize_entry(&format!("color{i}"), color)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnsiColors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let raw = BTreeMap::<String, Color>::deserialize(deserializer)?;
        let mut colors = [None; PALETTE_LEN];
        for (key, color) in raw {
            match key.parse::<Slot>() {
                Ok(Slot::Ansi(i)) => colors[usize::from(i)] = Some(color),
                _ => return Err(D::Error::custom(format!("unknown color key '{key}'"))),
            }
        }

        let mut out = [Color::BLACK; PALETTE_LEN];
        for (i, color) in colors.into_iter().enumerate() {
            out[i] = color.ok_or_else(|| D::Error::custom(format!("missing color{i}")))?;
        }
        Ok(Self(out))
    }
}

/// Default location of the published scheme inside the cache directory.
pub fn published_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("colors.json")
}
