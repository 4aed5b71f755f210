use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Generate color schemes from images and apply them to terminals and desktop tools.
#[derive(Parser, Debug)]
#[command(name = "nuwal", version, about)]
pub struct Args {
    /// Input image, or a directory to pick one from
    #[arg(conflicts_with_all = ["palette", "theme", "restore", "last_wallpaper"])]
    pub image: Option<PathBuf>,

    /// With a directory IMAGE: take the next image in order instead of a random one
    #[arg(long)]
    pub iterative: bool,

    /// With a directory IMAGE: also search subdirectories
    #[arg(long)]
    pub recursive: bool,

    /// Regenerate from the wallpaper of the last run
    #[arg(short = 'w', long, conflicts_with_all = ["palette", "theme", "restore"])]
    pub last_wallpaper: bool,

    /// Number of palette colors to extract
    #[arg(short = 'k', long = "colors")]
    pub colors: Option<usize>,

    /// Force dark or light mode (auto-detected if omitted)
    #[arg(short, long, value_enum)]
    pub mode: Option<ThemeMode>,

    /// Use a pinned palette file (16 hex colors, one per line) instead of an image
    #[arg(long, conflicts_with_all = ["theme", "restore"])]
    pub palette: Option<PathBuf>,

    /// Use a saved theme by name, or a colors.json file; without a value, list saved themes
    #[arg(short = 'f', long, value_name = "NAME|FILE", conflicts_with = "restore")]
    pub theme: Option<Option<String>>,

    /// Restore the previously generated color scheme
    #[arg(short = 'R', long)]
    pub restore: bool,

    /// Custom background color
    #[arg(short, long)]
    pub background: Option<Color>,

    /// Set accent saturation (0.0-1.0)
    #[arg(long)]
    pub saturate: Option<f32>,

    /// Background alpha in percent, exposed to templates
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub alpha: Option<u8>,

    /// Directory for rendered output (defaults to ~/.cache/wal)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Directory with config.toml, templates/ and colorschemes/ (defaults to ~/.config/wal)
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Skip sending color sequences to open terminals
    #[arg(short = 's', long)]
    pub skip_sequences: bool,

    /// Skip all reload actions
    #[arg(short = 'e', long)]
    pub skip_reload: bool,

    /// Command to run after the colors are applied (repeatable)
    #[arg(short = 'x', long = "exec", value_name = "CMD")]
    pub exec: Vec<String>,

    /// Seconds each reload action may take before it is abandoned
    #[arg(long, value_name = "SECS")]
    pub reload_timeout: Option<f64>,

    /// Do not read or write the extracted scheme cache
    #[arg(long)]
    pub no_cache: bool,

    /// Save the generated scheme under this name in colorschemes/
    #[arg(long, value_name = "NAME")]
    pub save: Option<String>,

    /// Print a colored terminal preview of the scheme
    #[arg(long)]
    pub preview: bool,

    /// Delete all cached schemes and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Evict old cached schemes per the [cache] limits and exit
    #[arg(long)]
    pub cache_cleanup: bool,

    /// Print scheme cache statistics and exit
    #[arg(long)]
    pub cache_info: bool,

    /// Validate config.toml and user templates, then exit
    #[arg(long)]
    pub validate_config: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug details
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Dark,
    Light,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Dark => "dark",
            ThemeMode::Light => "light",
        }
    }
}
