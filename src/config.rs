//! `config.toml` handling and directory layout.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::CleanupPolicy;
use crate::cli::ThemeMode;
use crate::color::Color;
use crate::error::ConfigError;
use crate::pipeline::extract::MAX_COLORS;
use crate::reload::DEFAULT_TIMEOUT;

/// Defaults for a run, overridden by command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Palette size
    pub colors: Option<usize>,
    pub mode: Option<ThemeMode>,
    /// Background alpha in percent
    pub alpha: Option<u8>,
    /// Accent saturation, 0.0-1.0
    pub saturate: Option<f32>,
    pub background: Option<Color>,
    pub reload: ReloadConfig,
    pub cache: CacheConfig,
    pub hooks: Vec<HookConfig>,
}

/// `[reload]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReloadConfig {
    /// Per-action time limit in seconds
    pub timeout_secs: f64,
    /// Targets never reloaded, e.g. `["polybar"]`
    pub disabled: Vec<String>,
    pub skip_sequences: bool,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs_f64(),
            disabled: Vec::new(),
            skip_sequences: false,
        }
    }
}

/// `[cache]`: limits applied by `--cache-cleanup`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub max_age_days: u64,
    pub max_size_mb: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let policy = CleanupPolicy::default();
        Self {
            max_age_days: policy.max_age.as_secs() / (24 * 60 * 60),
            max_size_mb: policy.max_bytes / (1024 * 1024),
        }
    }
}

impl CacheConfig {
    pub fn policy(&self) -> CleanupPolicy {
        CleanupPolicy {
            max_age: Duration::from_secs(self.max_age_days.saturating_mul(24 * 60 * 60)),
            max_bytes: self.max_size_mb.saturating_mul(1024 * 1024),
        }
    }
}

/// `[[hooks]]`: an extra command run as a reload action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    pub target: String,
    pub command: Vec<String>,
}

impl Config {
    /// Read `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Semantic problems the TOML parser cannot catch. Empty when valid.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Some(colors) = self.colors {
            if colors == 0 || colors > MAX_COLORS {
                problems.push(format!("colors must be between 1 and {MAX_COLORS}, got {colors}"));
            }
        }
        if let Some(alpha) = self.alpha {
            if alpha > 100 {
                problems.push(format!("alpha must be between 0 and 100, got {alpha}"));
            }
        }
        if let Some(saturate) = self.saturate {
            if !(0.0..=1.0).contains(&saturate) {
                problems.push(format!("saturate must be between 0.0 and 1.0, got {saturate}"));
            }
        }
        let timeout = self.reload.timeout_secs;
        if !timeout.is_finite() || timeout <= 0.0 {
            problems.push(format!("reload.timeout_secs must be positive, got {timeout}"));
        }

        let mut seen = BTreeSet::new();
        for hook in &self.hooks {
            if hook.target.trim().is_empty() {
                problems.push("hook with an empty target".to_string());
            } else if !seen.insert(hook.target.as_str()) {
                problems.push(format!("duplicate hook target '{}'", hook.target));
            }
            if hook.command.is_empty() {
                problems.push(format!("hook '{}' has an empty command", hook.target));
            }
        }
        problems
    }
}

/// Where a run reads and writes files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirs {
    /// Rendered outputs, `colors.json`, `sequences` and `schemes/`
    pub cache: PathBuf,
    /// `config.toml`, `templates/` and `colorschemes/`
    pub config: PathBuf,
}

impl Dirs {
    /// Explicit paths win; otherwise `<platform cache>/wal` and
    /// `<platform config>/wal`.
    pub fn resolve(cache: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self, ConfigError> {
        let cache = match cache {
            Some(dir) => dir,
            None => dirs::cache_dir()
                .ok_or(ConfigError::NoDirectory("cache"))?
                .join("wal"),
        };
        let config = match config {
            Some(dir) => dir,
            None => dirs::config_dir()
                .ok_or(ConfigError::NoDirectory("config"))?
                .join("wal"),
        };
        Ok(Self { cache, config })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    pub fn templates(&self) -> PathBuf {
        self.config.join("templates")
    }

    /// Saved schemes, one subdirectory per mode.
    pub fn colorschemes(&self) -> PathBuf {
        self.config.join("colorschemes")
    }

    /// `colorschemes/<mode>/<name>.json`
    pub fn saved_scheme(&self, mode: ThemeMode, name: &str) -> PathBuf {
        self.colorschemes()
            .join(mode.as_str())
            .join(format!("{name}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reload.timeout_secs, 3.0);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn parses_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
colors = 8
mode = "light"
alpha = 90
background = "#101010"

[reload]
timeout_secs = 1.5
disabled = ["polybar"]

[cache]
max_age_days = 7

[[hooks]]
target = "dunst"
command = ["pkill", "dunst"]
"##,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.colors, Some(8));
        assert_eq!(config.mode, Some(ThemeMode::Light));
        assert_eq!(config.alpha, Some(90));
        assert_eq!(config.background, Some(Color::new(16, 16, 16)));
        assert_eq!(config.reload.timeout_secs, 1.5);
        assert_eq!(config.reload.disabled, vec!["polybar"]);
        assert!(!config.reload.skip_sequences);
        assert_eq!(config.hooks[0].command, vec!["pkill", "dunst"]);
        assert_eq!(config.cache.max_age_days, 7);
        assert_eq!(config.cache.max_size_mb, 100);
        assert_eq!(
            config.cache.policy().max_age,
            Duration::from_secs(7 * 24 * 60 * 60)
        );
    }

    #[test]
    fn unknown_keys_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "colour = 8\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn validation_reports_each_problem() {
        let config = Config {
            colors: Some(0),
            saturate: Some(1.5),
            reload: ReloadConfig {
                timeout_secs: 0.0,
                ..ReloadConfig::default()
            },
            hooks: vec![
                HookConfig {
                    target: "a".into(),
                    command: vec![],
                },
                HookConfig {
                    target: "a".into(),
                    command: vec!["true".into()],
                },
            ],
            ..Config::default()
        };
        let problems = config.validate();
        assert_eq!(problems.len(), 5, "{problems:?}");
    }

    #[test]
    fn explicit_dirs_win() {
        let dirs = Dirs::resolve(Some("/c".into()), Some("/k".into())).unwrap();
        assert_eq!(dirs.cache, PathBuf::from("/c"));
        assert_eq!(dirs.config_file(), PathBuf::from("/k/config.toml"));
        assert_eq!(dirs.templates(), PathBuf::from("/k/templates"));
        assert_eq!(
            dirs.saved_scheme(ThemeMode::Dark, "forest"),
            PathBuf::from("/k/colorschemes/dark/forest.json")
        );
    }
}
