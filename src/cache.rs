//! Cache of extracted schemes, keyed by image content and extraction settings.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cli::ThemeMode;
use crate::scheme::ColorScheme;
use crate::storage::write_atomic;

/// Bumped whenever extraction, slot assignment or the entry layout changes.
const CACHE_VERSION: u8 = 2;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// One cached extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub scheme: ColorScheme,
    /// Distinct colors in the image, set only when the palette was padded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_colors: Option<usize>,
}

/// When `--cache-cleanup` evicts entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Entries not used for longer than this are removed.
    pub max_age: Duration,
    /// Oldest entries are removed until the cache fits.
    pub max_bytes: u64,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            max_age: 30 * DAY,
            max_bytes: 100 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
    pub oldest: Option<SystemTime>,
    pub newest: Option<SystemTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub freed: u64,
}

struct EntryFile {
    path: PathBuf,
    bytes: u64,
    modified: SystemTime,
}

/// `<cache>/schemes/<key>.json`
pub struct SchemeCache {
    dir: PathBuf,
}

impl SchemeCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            dir: cache_dir.join("schemes"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hash of everything that determines the extracted scheme.
    pub fn key(
        image: &[u8],
        mode: Option<ThemeMode>,
        colors: usize,
        saturate: Option<f32>,
    ) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[CACHE_VERSION]);
        hasher.update(&(image.len() as u64).to_le_bytes());
        hasher.update(image);
        hasher.update(mode.map(ThemeMode::as_str).unwrap_or("auto").as_bytes());
        hasher.update(&(colors as u64).to_le_bytes());
        match saturate {
            Some(amount) => {
                hasher.update(&[1u8]);
                hasher.update(&amount.to_bits().to_le_bytes());
            }
            None => {
                hasher.update(&[0u8]);
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Cached entry for `key`. Missing or unreadable entries are a miss.
    /// A hit refreshes the entry's mtime so cleanup keeps it.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.path(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("ignoring unreadable cache entry {}: {err}", path.display());
                return None;
            }
        };
        match serde_json::from_str::<CacheEntry>(&text) {
            Ok(entry) => {
                debug!(path = %path.display(), "scheme cache hit");
                if let Ok(file) = File::options().write(true).open(&path) {
                    let _ = file.set_modified(SystemTime::now());
                }
                Some(entry)
            }
            Err(err) => {
                warn!("ignoring corrupt cache entry {}: {err}", path.display());
                None
            }
        }
    }

    pub fn put(&self, key: &str, entry: &CacheEntry) -> io::Result<()> {
        let json = serde_json::to_string_pretty(entry).map_err(io::Error::other)?;
        write_atomic(&self.path(key), json.as_bytes())
    }

    /// Remove every cached scheme. Returns how many entries were deleted.
    pub fn clear(&self) -> io::Result<usize> {
        let count = match fs::read_dir(&self.dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).count(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err),
        };
        fs::remove_dir_all(&self.dir)?;
        Ok(count)
    }

    pub fn stats(&self) -> io::Result<CacheStats> {
        let files = self.entry_files()?;
        Ok(CacheStats {
            entries: files.len(),
            bytes: files.iter().map(|f| f.bytes).sum(),
            oldest: files.iter().map(|f| f.modified).min(),
            newest: files.iter().map(|f| f.modified).max(),
        })
    }

    /// Drop entries older than `policy.max_age`, then the oldest remaining
    /// ones until the cache fits in `policy.max_bytes`.
    pub fn cleanup(&self, policy: &CleanupPolicy) -> io::Result<CleanupReport> {
        let mut files = self.entry_files()?;
        files.sort_by_key(|f| f.modified);

        let now = SystemTime::now();
        let mut remaining: u64 = files.iter().map(|f| f.bytes).sum();
        let mut report = CleanupReport::default();
        for file in files {
            let age = now.duration_since(file.modified).unwrap_or_default();
            if age <= policy.max_age && remaining <= policy.max_bytes {
                continue;
            }
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    debug!(path = %file.path.display(), age_secs = age.as_secs(), "evicted");
                    remaining -= file.bytes;
                    report.removed += 1;
                    report.freed += file.bytes;
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    fn entry_files(&self) -> io::Result<Vec<EntryFile>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let mut files = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            files.push(EntryFile {
                path,
                bytes: meta.len(),
                modified: meta.modified()?,
            });
        }
        Ok(files)
    }
}
