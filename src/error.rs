//! Error types for every pipeline stage.

use std::path::PathBuf;
use std::time::Duration;

use crate::color::ParseColorError;

/// The input image could not be turned into pixels. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error(
        "unsupported or corrupt image: {}. Supported formats: PNG, JPEG, WebP, BMP, TIFF, GIF",
        path.display()
    )]
    Unsupported {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image has no pixels: {}", path.display())]
    Empty { path: PathBuf },

    #[error("no images found in {}", dir.display())]
    NoImages { dir: PathBuf },
}

/// Palette extraction problems.
///
/// `Degenerate` is recoverable: the extractor pads the palette and carries
/// the error along as a warning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("palette size must be between 1 and {max}, got {requested}")]
    InvalidCount { requested: usize, max: usize },

    #[error("no pixels to extract colors from")]
    NoPixels,

    #[error(
        "image has {distinct} distinct colors but {requested} were requested; padded with the dominant color"
    )]
    Degenerate { distinct: usize, requested: usize },
}

/// Reading a pinned palette or a serialized scheme failed.
#[derive(Debug, thiserror::Error)]
pub enum SchemeError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid color scheme in {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}:{line}: bad palette entry", path.display())]
    PaletteEntry {
        path: PathBuf,
        line: usize,
        #[source]
        source: ParseColorError,
    },

    #[error("{} holds {found} colors, a palette needs exactly 16", path.display())]
    PaletteLength { path: PathBuf, found: usize },
}

/// A template could not be rendered. Fatal for that template only.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template '{template}': {message} at byte {offset}")]
    Syntax {
        template: String,
        offset: usize,
        message: &'static str,
    },

    #[error("template '{template}': unresolved placeholders: {}", placeholders.join(", "))]
    Unresolved {
        template: String,
        placeholders: Vec<String>,
    },

    #[error("template '{template}': failed to access {}", path.display())]
    Io {
        template: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    /// Target name of the template that failed.
    pub fn template(&self) -> &str {
        match self {
            Self::Syntax { template, .. }
            | Self::Unresolved { template, .. }
            | Self::Io { template, .. } => template,
        }
    }
}

/// A reload action failed. Never fatal; reported in the run summary.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("reload '{target}': failed to start: {source}")]
    Spawn {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("reload '{target}' failed: {message}")]
    Failed { target: String, message: String },

    #[error("reload '{target}' timed out after {:.1}s", timeout.as_secs_f32())]
    TimedOut { target: String, timeout: Duration },
}

impl ReloadError {
    pub fn target(&self) -> &str {
        match self {
            Self::Spawn { target, .. }
            | Self::Failed { target, .. }
            | Self::TimedOut { target, .. } => target,
        }
    }
}

/// Configuration file problems.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not determine the {0} directory; pass it explicitly")]
    NoDirectory(&'static str),
}

/// Umbrella error for a whole run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Scheme(#[from] SchemeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid scheme name '{0}': use a plain file name")]
    InvalidName(String),

    #[error("no saved theme named '{name}' in {}", dir.display())]
    UnknownTheme { name: String, dir: PathBuf },

    #[error("the last scheme records no wallpaper; pass an image instead")]
    NoWallpaper,

    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
