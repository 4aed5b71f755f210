use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `payload` to `path` so readers only ever see the old or the new
/// content: write a sibling temp file, flush it, then rename over `path`.
pub fn write_atomic(path: &Path, payload: &[u8]) -> io::Result<()> {
    let tmp_path = temp_sibling(path)?;
    if let Some(dir) = tmp_path.parent() {
        fs::create_dir_all(dir)?;
    }

    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(payload)?;
        file.sync_all()
    });
    if let Err(err) = written.and_then(|()| fs::rename(&tmp_path, path)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

/// `dir/.name.<pid>.tmp` next to `path`; unique per target and per process.
fn temp_sibling(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        )
    })?;
    let tmp_name = format!(".{}.{}.tmp", name.to_string_lossy(), std::process::id());
    Ok(path.with_file_name(tmp_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parent_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("colors.sh");

        write_atomic(&path, b"export color0='#000000'\n").unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "export color0='#000000'\n"
        );
    }

    #[test]
    fn replaces_existing_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colors");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn rejects_path_without_file_name() {
        let err = write_atomic(Path::new("/"), b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
