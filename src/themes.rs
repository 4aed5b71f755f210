//! Saved color schemes under `<config>/colorschemes/{dark,light}/`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cli::ThemeMode;
use crate::config::Dirs;
use crate::error::{Error, Result};

const MODES: [ThemeMode; 2] = [ThemeMode::Dark, ThemeMode::Light];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTheme {
    pub name: String,
    pub mode: ThemeMode,
    pub path: PathBuf,
}

/// Saved themes, dark ones first, each group sorted by name.
pub fn list_saved(dirs: &Dirs) -> Vec<SavedTheme> {
    let mut themes = Vec::new();
    for mode in MODES {
        let dir = dirs.colorschemes().join(mode.as_str());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %dir.display(), "no saved themes: {err}");
                continue;
            }
        };
        let mut group: Vec<SavedTheme> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|path| {
                let name = path.file_stem()?.to_string_lossy().into_owned();
                Some(SavedTheme { name, mode, path })
            })
            .collect();
        group.sort_by(|a, b| a.name.cmp(&b.name));
        themes.extend(group);
    }
    themes
}

/// Turn a `--theme` argument into a file. An existing path is used as is;
/// otherwise `name` (with or without `.json`) is looked up among the saved
/// themes of `mode`, or of both modes, dark first, when no mode is given.
pub fn resolve_theme(dirs: &Dirs, name: &str, mode: Option<ThemeMode>) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    let stem = name.strip_suffix(".json").unwrap_or(name);
    check_name(stem)?;
    let modes = match mode {
        Some(mode) => vec![mode],
        None => MODES.to_vec(),
    };
    modes
        .into_iter()
        .map(|mode| dirs.saved_scheme(mode, stem))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| Error::UnknownTheme {
            name: name.to_string(),
            dir: dirs.colorschemes(),
        })
}

/// Where `--save NAME` writes a scheme of `mode`.
pub fn save_path(dirs: &Dirs, mode: ThemeMode, name: &str) -> Result<PathBuf> {
    check_name(name)?;
    Ok(dirs.saved_scheme(mode, name))
}

/// Theme names are plain file names.
fn check_name(name: &str) -> Result<()> {
    let plain = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some();
    if plain {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs(root: &Path) -> Dirs {
        Dirs {
            cache: root.join("cache"),
            config: root.join("config"),
        }
    }

    fn save(dirs: &Dirs, mode: ThemeMode, name: &str) -> PathBuf {
        let path = dirs.saved_scheme(mode, name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn lists_dark_then_light_sorted() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(root.path());
        save(&dirs, ThemeMode::Light, "paper");
        save(&dirs, ThemeMode::Dark, "ocean");
        save(&dirs, ThemeMode::Dark, "forest");

        let listed: Vec<(ThemeMode, String)> = list_saved(&dirs)
            .into_iter()
            .map(|t| (t.mode, t.name))
            .collect();
        assert_eq!(
            listed,
            vec![
                (ThemeMode::Dark, "forest".to_string()),
                (ThemeMode::Dark, "ocean".to_string()),
                (ThemeMode::Light, "paper".to_string()),
            ]
        );
    }

    #[test]
    fn nothing_saved_lists_nothing() {
        let root = tempfile::tempdir().unwrap();
        assert!(list_saved(&dirs(root.path())).is_empty());
    }

    #[test]
    fn resolves_names_by_mode() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(root.path());
        let dark = save(&dirs, ThemeMode::Dark, "forest");
        let light = save(&dirs, ThemeMode::Light, "forest");

        assert_eq!(resolve_theme(&dirs, "forest", None).unwrap(), dark);
        assert_eq!(resolve_theme(&dirs, "forest.json", None).unwrap(), dark);
        assert_eq!(
            resolve_theme(&dirs, "forest", Some(ThemeMode::Light)).unwrap(),
            light
        );
    }

    #[test]
    fn explicit_paths_win() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("mine.json");
        fs::write(&file, "{}").unwrap();
        let path = file.display().to_string();
        assert_eq!(resolve_theme(&dirs(root.path()), &path, None).unwrap(), file);
    }

    #[test]
    fn unknown_and_invalid_names() {
        let root = tempfile::tempdir().unwrap();
        let dirs = dirs(root.path());
        assert!(matches!(
            resolve_theme(&dirs, "missing", None),
            Err(Error::UnknownTheme { .. })
        ));
        assert!(matches!(
            save_path(&dirs, ThemeMode::Dark, "../escape"),
            Err(Error::InvalidName(_))
        ));
        assert_eq!(
            save_path(&dirs, ThemeMode::Light, "ocean").unwrap(),
            root.path().join("config/colorschemes/light/ocean.json")
        );
    }
}
