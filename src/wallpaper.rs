//! Picking an image when the input is a directory.

use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::debug;

use crate::error::DecodeError;

const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "jpe", "gif", "webp", "bmp", "tiff"];

/// How to choose among the images of a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    /// Step through the images in sorted order instead of picking at random.
    pub iterative: bool,
    /// Also search subdirectories.
    pub recursive: bool,
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Every image under `dir`, sorted. Hidden files and directories are skipped.
pub fn list_images(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, DecodeError> {
    let mut images = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) if current == dir && err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DecodeError::NotFound {
                    path: dir.to_path_buf(),
                })
            }
            Err(err) => {
                debug!(dir = %current.display(), "skipping unreadable directory: {err}");
                continue;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if is_image(&path) {
                images.push(path);
            }
        }
    }
    images.sort();
    Ok(images)
}

/// Choose an image from `dir`. `current` is the wallpaper of the previous
/// run: iterative selection continues after it, random selection avoids it
/// whenever there is another image to pick.
pub fn pick_image<R: Rng + ?Sized>(
    dir: &Path,
    current: Option<&Path>,
    selection: Selection,
    rng: &mut R,
) -> Result<PathBuf, DecodeError> {
    let dir = fs::canonicalize(dir).map_err(|_| DecodeError::NotFound {
        path: dir.to_path_buf(),
    })?;
    let images = list_images(&dir, selection.recursive)?;
    let position = current.and_then(|c| images.iter().position(|p| p == c));

    let picked = if selection.iterative {
        let next = position.map_or(0, |i| (i + 1) % images.len().max(1));
        images.get(next)
    } else {
        let candidates: Vec<&PathBuf> = images
            .iter()
            .enumerate()
            .filter(|(i, _)| images.len() == 1 || Some(*i) != position)
            .map(|(_, p)| p)
            .collect();
        candidates.choose(rng).copied()
    };

    let picked = picked.cloned().ok_or(DecodeError::NoImages { dir })?;
    debug!(
        image = %picked.display(),
        iterative = selection.iterative,
        "picked image from directory"
    );
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn gallery() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        for name in ["b.png", "a.JPG", "c.webp", "notes.txt", ".hidden.png"] {
            fs::write(root.join(name), "").unwrap();
        }
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("nested").join("d.png"), "").unwrap();
        (dir, root)
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn lists_only_visible_images() {
        let (_guard, root) = gallery();
        assert_eq!(
            names(&list_images(&root, false).unwrap()),
            ["a.JPG", "b.png", "c.webp"]
        );
        assert_eq!(
            names(&list_images(&root, true).unwrap()),
            ["a.JPG", "b.png", "c.webp", "d.png"]
        );
    }

    #[test]
    fn iterative_continues_after_current_and_wraps() {
        let (_guard, root) = gallery();
        let mut rng = SmallRng::seed_from_u64(7);
        let iterative = Selection {
            iterative: true,
            recursive: false,
        };

        let first = pick_image(&root, None, iterative, &mut rng).unwrap();
        assert_eq!(first, root.join("a.JPG"));
        let second = pick_image(&root, Some(&first), iterative, &mut rng).unwrap();
        assert_eq!(second, root.join("b.png"));
        let wrapped = pick_image(&root, Some(&root.join("c.webp")), iterative, &mut rng).unwrap();
        assert_eq!(wrapped, root.join("a.JPG"));
    }

    #[test]
    fn random_never_repeats_the_current_wallpaper() {
        let (_guard, root) = gallery();
        let mut rng = SmallRng::seed_from_u64(1);
        let current = root.join("b.png");
        for _ in 0..50 {
            let picked = pick_image(&root, Some(&current), Selection::default(), &mut rng).unwrap();
            assert_ne!(picked, current);
            assert!(is_image(&picked));
        }
    }

    #[test]
    fn single_image_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        fs::write(root.join("only.png"), "").unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        let current = root.join("only.png");
        let picked = pick_image(&root, Some(&current), Selection::default(), &mut rng).unwrap();
        assert_eq!(picked, current);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        assert!(matches!(
            pick_image(dir.path(), None, Selection::default(), &mut rng),
            Err(DecodeError::NoImages { .. })
        ));
    }
}
