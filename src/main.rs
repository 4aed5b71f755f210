use std::io::{IsTerminal, Write};
use std::process::ExitCode;
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nuwal::cache::SchemeCache;
use nuwal::cli::Args;
use nuwal::color::Color;
use nuwal::config::{Config, Dirs};
use nuwal::pipeline::extract::DEFAULT_COLORS;
use nuwal::preview::print_preview;
use nuwal::reload::DEFAULT_TIMEOUT;
use nuwal::run::{run, ReloadOptions, RunOptions, Source};
use nuwal::scheme::{published_path, ColorScheme};
use nuwal::template::{load_templates, TemplateOrigin};
use nuwal::themes::list_saved;
use nuwal::wallpaper::Selection;

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(&args);

    let dirs = Dirs::resolve(args.cache_dir.clone(), args.config_dir.clone())?;

    if args.clear_cache {
        let cache = SchemeCache::new(&dirs.cache);
        let removed = cache
            .clear()
            .with_context(|| format!("failed to clear {}", cache.dir().display()))?;
        info!(removed, "cleared scheme cache");
        return Ok(ExitCode::SUCCESS);
    }

    if args.cache_info {
        print_cache_info(&SchemeCache::new(&dirs.cache))?;
        return Ok(ExitCode::SUCCESS);
    }

    if args.theme == Some(None) {
        print_saved_themes(&dirs)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load(&dirs.config_file())?;

    if args.validate_config {
        return Ok(validate(&config, &dirs));
    }

    if args.cache_cleanup {
        let cache = SchemeCache::new(&dirs.cache);
        let report = cache
            .cleanup(&config.cache.policy())
            .with_context(|| format!("failed to clean up {}", cache.dir().display()))?;
        info!(
            removed = report.removed,
            freed = %humansize::format_size(report.freed, humansize::BINARY),
            "cleaned up scheme cache"
        );
        return Ok(ExitCode::SUCCESS);
    }

    let problems = config.validate();
    if !problems.is_empty() {
        bail!(
            "invalid {}:\n  {}",
            dirs.config_file().display(),
            problems.join("\n  ")
        );
    }

    let source = match (&args.image, &args.palette, &args.theme) {
        (Some(image), ..) => Source::Image(image.clone()),
        _ if args.last_wallpaper => Source::LastWallpaper,
        (_, Some(palette), _) => Source::Palette(palette.clone()),
        (_, _, Some(Some(theme))) => Source::Theme(theme.clone()),
        _ if args.restore => Source::Restore,
        _ if args.preview => {
            let path = published_path(&dirs.cache);
            let scheme = ColorScheme::load(&path)
                .context("no scheme to preview; generate one first")?;
            print_preview(&mut std::io::stdout().lock(), &scheme)?;
            return Ok(ExitCode::SUCCESS);
        }
        _ => bail!("nothing to do: pass an IMAGE, -w, --palette, --theme or --restore"),
    };

    let saturate = args.saturate.or(config.saturate);
    if let Some(amount) = saturate {
        if !(0.0..=1.0).contains(&amount) {
            bail!("--saturate must be between 0.0 and 1.0, got {amount}");
        }
    }
    let timeout = match args.reload_timeout {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|d| !d.is_zero())
            .with_context(|| format!("invalid --reload-timeout {secs}"))?,
        None => {
            Duration::try_from_secs_f64(config.reload.timeout_secs).unwrap_or(DEFAULT_TIMEOUT)
        }
    };

    let opts = RunOptions {
        source,
        dirs,
        selection: Selection {
            iterative: args.iterative,
            recursive: args.recursive,
        },
        colors: args.colors.or(config.colors).unwrap_or(DEFAULT_COLORS),
        mode: args.mode.or(config.mode),
        background: args.background.or(config.background),
        saturate,
        alpha: args.alpha.or(config.alpha),
        use_cache: !args.no_cache,
        save_as: args.save.clone(),
        reload: ReloadOptions {
            enabled: !args.skip_reload,
            skip_sequences: args.skip_sequences || config.reload.skip_sequences,
            disabled: config.reload.disabled.clone(),
            hooks: config.hooks.clone(),
            timeout,
        },
        exec: args.exec.clone(),
    };

    let summary = run(&opts).context("color scheme generation failed")?;
    summary.log();

    if args.preview {
        print_preview(&mut std::io::stdout().lock(), &summary.scheme)?;
    }

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            failed = summary.template_failures.len(),
            "some templates could not be rendered"
        );
        Ok(ExitCode::FAILURE)
    }
}

fn print_saved_themes(dirs: &Dirs) -> Result<()> {
    let themes = list_saved(dirs);
    if themes.is_empty() {
        info!(dir = %dirs.colorschemes().display(), "no saved themes");
        return Ok(());
    }
    let mut out = std::io::stdout().lock();
    for theme in themes {
        writeln!(out, "{:<6} {}", theme.mode.as_str(), theme.name)?;
    }
    Ok(())
}

fn print_cache_info(cache: &SchemeCache) -> Result<()> {
    let stats = cache
        .stats()
        .with_context(|| format!("failed to read {}", cache.dir().display()))?;
    let age = |time: Option<SystemTime>| match time {
        Some(time) => {
            let secs = time.elapsed().unwrap_or_default().as_secs();
            format!("{}d {}h ago", secs / 86_400, secs % 86_400 / 3600)
        }
        None => "-".to_string(),
    };

    let mut out = std::io::stdout().lock();
    writeln!(out, "location: {}", cache.dir().display())?;
    writeln!(out, "entries:  {}", stats.entries)?;
    writeln!(
        out,
        "size:     {}",
        humansize::format_size(stats.bytes, humansize::BINARY)
    )?;
    writeln!(out, "oldest:   {}", age(stats.oldest))?;
    writeln!(out, "newest:   {}", age(stats.newest))?;
    Ok(())
}

fn init_logging(args: &Args) {
    let filter = if args.quiet {
        EnvFilter::new("error")
    } else if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Check `config.toml` and every user template. Templates are test-rendered
/// against a placeholder scheme so unknown placeholders show up too.
fn validate(config: &Config, dirs: &Dirs) -> ExitCode {
    let mut problems = config.validate();

    let (templates, errors) = load_templates(Some(dirs.templates().as_path()));
    problems.extend(errors.iter().map(ToString::to_string));

    let sample = ColorScheme::new([Color::BLACK; 16], Color::BLACK, Color::WHITE, Color::WHITE);
    let user_templates = templates
        .iter()
        .filter(|t| matches!(t.origin(), TemplateOrigin::User(_)));
    let mut checked = 0;
    for template in user_templates {
        checked += 1;
        if let Err(err) = template.render(&sample) {
            problems.push(err.to_string());
        }
    }

    if problems.is_empty() {
        info!(
            config = %dirs.config_file().display(),
            templates = checked,
            "configuration is valid"
        );
        ExitCode::SUCCESS
    } else {
        for problem in &problems {
            warn!("{problem}");
        }
        error!(problems = problems.len(), "configuration has problems");
        ExitCode::FAILURE
    }
}
