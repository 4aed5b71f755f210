//! One end-to-end run: obtain a scheme, render templates, publish, reload.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, SchemeCache};
use crate::cli::ThemeMode;
use crate::color::Color;
use crate::config::{Dirs, HookConfig};
use crate::error::{DecodeError, Error, ExtractionError, Result, TemplateError};
use crate::pipeline::assign::{build_scheme, saturate_accents};
use crate::pipeline::detect::detect_mode;
use crate::pipeline::extract::{extract_palette, load_and_prepare};
use crate::reload::{build_sequences, CommandReload, ReloadRegistry, ReloadReport};
use crate::render::{render_all, RenderedOutput};
use crate::scheme::{published_path, ColorScheme, Palette};
use crate::storage::write_atomic;
use crate::template::load_templates;
use crate::themes::{resolve_theme, save_path};
use crate::wallpaper::{pick_image, Selection};

/// Where the scheme of a run comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// An image file, or a directory to pick one from.
    Image(PathBuf),
    /// The wallpaper recorded by the previous run.
    LastWallpaper,
    /// 16 pinned colors; skips extraction.
    Palette(PathBuf),
    /// A saved theme name or a scheme file; skips extraction and slot
    /// assignment.
    Theme(String),
    /// The scheme published by the previous run.
    Restore,
}

#[derive(Debug, Clone)]
pub struct ReloadOptions {
    pub enabled: bool,
    pub skip_sequences: bool,
    /// Targets removed from the registry.
    pub disabled: Vec<String>,
    pub hooks: Vec<HookConfig>,
    pub timeout: Duration,
}

impl Default for ReloadOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            skip_sequences: false,
            disabled: Vec::new(),
            hooks: Vec::new(),
            timeout: crate::reload::DEFAULT_TIMEOUT,
        }
    }
}

/// Everything a run needs, already merged from config and flags.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: Source,
    pub dirs: Dirs,
    /// Used when `source` is a directory.
    pub selection: Selection,
    pub colors: usize,
    pub mode: Option<ThemeMode>,
    pub background: Option<Color>,
    pub saturate: Option<f32>,
    pub alpha: Option<u8>,
    pub use_cache: bool,
    pub save_as: Option<String>,
    pub reload: ReloadOptions,
    /// `--exec` command lines, started detached through `sh -c` at the end.
    pub exec: Vec<String>,
}

/// What happened during a run. Suppressed errors end up here.
#[derive(Debug)]
pub struct RunSummary {
    pub scheme: ColorScheme,
    pub rendered: Vec<RenderedOutput>,
    pub warnings: Vec<String>,
    pub template_failures: Vec<TemplateError>,
    pub reload: ReloadReport,
}

impl RunSummary {
    /// False when any template failed.
    pub fn is_success(&self) -> bool {
        self.template_failures.is_empty()
    }

    pub fn log(&self) {
        for warning in &self.warnings {
            warn!("{warning}");
        }
        for failure in &self.template_failures {
            warn!("{failure}");
        }
        for failure in &self.reload.failures {
            warn!("{failure}");
        }
        info!(
            rendered = self.rendered.len(),
            failed = self.template_failures.len(),
            reloaded = self.reload.succeeded.len(),
            reload_failures = self.reload.failures.len(),
            "done"
        );
    }
}

pub fn run(opts: &RunOptions) -> Result<RunSummary> {
    let mut warnings = Vec::new();

    let mut scheme = resolve_scheme(opts, &mut warnings)?;
    if let Some(background) = opts.background {
        scheme = scheme.with_background(background);
    }
    if let Some(alpha) = opts.alpha {
        scheme = scheme.with_alpha(alpha);
    }
    info!(
        mode = scheme.mode().as_str(),
        background = %scheme.background(),
        foreground = %scheme.foreground(),
        "color scheme ready"
    );

    let user_templates = opts.dirs.templates();
    let (templates, mut template_failures) = load_templates(Some(user_templates.as_path()));
    let report = render_all(&scheme, &templates, &opts.dirs.cache);
    template_failures.extend(report.failures);

    let sequences = build_sequences(&scheme);
    write_file(&opts.dirs.cache.join("sequences"), sequences.as_bytes())?;

    let published = published_path(&opts.dirs.cache);
    scheme.save(&published).map_err(|source| Error::Io {
        path: published.clone(),
        source,
    })?;
    debug!(path = %published.display(), "published scheme");

    if let Some(name) = &opts.save_as {
        let path = save_path(&opts.dirs, scheme.mode(), name)?;
        scheme.save(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "saved scheme");
    }

    let reload = if opts.reload.enabled {
        let registry = reload_registry(&opts.dirs.cache, sequences, &opts.reload, &mut warnings);
        if registry.is_empty() {
            debug!("no reload actions left");
            ReloadReport::default()
        } else {
            debug!(targets = ?registry.targets(), "running reload actions");
            registry.run_all(opts.reload.timeout)
        }
    } else {
        debug!("reload actions skipped");
        ReloadReport::default()
    };

    for line in &opts.exec {
        match spawn_detached(line) {
            Ok(pid) => info!(pid, command = %line, "started"),
            Err(err) => warnings.push(format!("could not start '{line}': {err}")),
        }
    }

    Ok(RunSummary {
        scheme,
        rendered: report.rendered,
        warnings,
        template_failures,
        reload,
    })
}

fn resolve_scheme(opts: &RunOptions, warnings: &mut Vec<String>) -> Result<ColorScheme> {
    match &opts.source {
        Source::Image(path) if path.is_dir() => {
            let current = previous_wallpaper(&opts.dirs).ok();
            let image = pick_image(
                path,
                current.as_deref(),
                opts.selection,
                &mut rand::rng(),
            )?;
            scheme_from_image(opts, &image, warnings)
        }
        Source::Image(path) => scheme_from_image(opts, path, warnings),
        Source::LastWallpaper => {
            let image = previous_wallpaper(&opts.dirs)?;
            scheme_from_image(opts, &image, warnings)
        }
        Source::Palette(path) => {
            let palette = Palette::load(path)?;
            let mode = opts.mode.unwrap_or_else(|| detect_mode(palette.colors()));
            let scheme = build_scheme(&palette, mode);
            Ok(match opts.saturate {
                Some(amount) => saturate_accents(scheme, amount),
                None => scheme,
            })
        }
        Source::Theme(name) => {
            let path = resolve_theme(&opts.dirs, name, opts.mode)?;
            debug!(theme = %name, path = %path.display(), "using theme");
            Ok(ColorScheme::load(&path)?)
        }
        Source::Restore => Ok(ColorScheme::load(&published_path(&opts.dirs.cache))?),
    }
}

/// The wallpaper recorded in the published scheme.
fn previous_wallpaper(dirs: &Dirs) -> Result<PathBuf> {
    let scheme = ColorScheme::load(&published_path(&dirs.cache))?;
    scheme.wallpaper().map(PathBuf::from).ok_or(Error::NoWallpaper)
}

fn scheme_from_image(
    opts: &RunOptions,
    path: &Path,
    warnings: &mut Vec<String>,
) -> Result<ColorScheme> {
    let wallpaper = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    let cache = SchemeCache::new(&opts.dirs.cache);
    let key = if opts.use_cache {
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                Error::Decode(DecodeError::NotFound {
                    path: path.to_path_buf(),
                })
            } else {
                Error::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Some(SchemeCache::key(&bytes, opts.mode, opts.colors, opts.saturate))
    } else {
        None
    };

    if let Some(entry) = key.as_deref().and_then(|k| cache.get(k)) {
        if let Some(distinct) = entry.distinct_colors {
            let degenerate = ExtractionError::Degenerate {
                distinct,
                requested: opts.colors,
            };
            warnings.push(degenerate.to_string());
        }
        return Ok(entry.scheme.with_wallpaper(wallpaper.display().to_string()));
    }

    let pixels = load_and_prepare(path)?;
    let extraction = extract_palette(&pixels, opts.colors)?;
    let distinct_colors = match &extraction.degenerate {
        Some(degenerate @ ExtractionError::Degenerate { distinct, .. }) => {
            warnings.push(degenerate.to_string());
            Some(*distinct)
        }
        _ => None,
    };
    let mode = opts.mode.unwrap_or_else(|| detect_mode(&pixels));
    debug!(mode = mode.as_str(), explicit = opts.mode.is_some(), "scheme mode");

    let mut scheme = build_scheme(extraction.palette(), mode);
    if let Some(amount) = opts.saturate {
        scheme = saturate_accents(scheme, amount);
    }

    if let Some(key) = &key {
        let entry = CacheEntry {
            scheme: scheme.clone(),
            distinct_colors,
        };
        if let Err(err) = cache.put(key, &entry) {
            warnings.push(format!("could not cache scheme: {err}"));
        }
    }
    Ok(scheme.with_wallpaper(wallpaper.display().to_string()))
}

fn write_file(path: &Path, payload: &[u8]) -> Result<()> {
    write_atomic(path, payload).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Start `line` through `sh -c` without waiting for it or bounding its
/// runtime. Returns the child's pid.
fn spawn_detached(line: &str) -> std::io::Result<u32> {
    let child = Command::new("sh")
        .arg("-c")
        .arg(line)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(child.id())
}

fn reload_registry(
    cache_dir: &Path,
    sequences: String,
    opts: &ReloadOptions,
    warnings: &mut Vec<String>,
) -> ReloadRegistry {
    let mut registry = ReloadRegistry::builtin(cache_dir, sequences);
    if opts.skip_sequences {
        registry.remove("sequences");
    }
    for hook in &opts.hooks {
        match CommandReload::from_argv(hook.target.clone(), &hook.command) {
            Some(action) => registry.register(Arc::new(action)),
            None => warnings.push(format!("hook '{}' has no command, ignored", hook.target)),
        }
    }
    for target in &opts.disabled {
        if !registry.remove(target) {
            debug!(action = %target, "disabled reload target was not registered");
        }
    }
    registry
}
