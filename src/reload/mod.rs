//! Reload actions that tell running programs to pick up the new colors.

mod command;
mod sequences;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::ReloadError;

pub use command::CommandReload;
pub use sequences::{build_sequences, TerminalSequences};

/// Default per-action time limit.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Extra time the registry waits past the timeout before abandoning an action.
const GRACE: Duration = Duration::from_millis(250);

/// Something that can be told to reload its colors.
///
/// Implementations must bound their own work by `timeout` where they can
/// (e.g. kill a child process); the registry abandons any that don't.
pub trait ReloadAction: Send + Sync {
    /// Identifier used in logs, config and reports.
    fn target(&self) -> &str;

    /// Whether the action applies on this system. Unavailable actions are
    /// skipped, not failed.
    fn is_available(&self) -> bool {
        true
    }

    fn attempt(&self, timeout: Duration) -> Result<(), ReloadError>;
}

/// Outcome of [`ReloadRegistry::run_all`]. Every list is sorted by target.
#[derive(Debug, Default)]
pub struct ReloadReport {
    pub succeeded: Vec<String>,
    pub skipped: Vec<String>,
    pub failures: Vec<ReloadError>,
}

/// Reload actions keyed by target identifier.
#[derive(Default)]
pub struct ReloadRegistry {
    actions: BTreeMap<String, Arc<dyn ReloadAction>>,
}

impl ReloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in actions: xrdb, kitty, i3, sway, polybar and terminal
    /// sequences. `cache_dir` holds the rendered files they read.
    pub fn builtin(cache_dir: &Path, sequences: String) -> Self {
        let mut registry = Self::new();

        let xresources = cache_dir.join("colors.Xresources");
        registry.register(Arc::new(
            CommandReload::new(
                "xrdb",
                "xrdb",
                vec!["-merge".into(), "-quiet".into(), xresources.display().to_string()],
            )
            .require_env("DISPLAY"),
        ));

        let kitty_conf = cache_dir.join("colors-kitty.conf");
        registry.register(Arc::new(
            CommandReload::new(
                "kitty",
                "kitty",
                vec![
                    "@".into(),
                    "set-colors".into(),
                    "--all".into(),
                    kitty_conf.display().to_string(),
                ],
            )
            .require_env("KITTY_WINDOW_ID"),
        ));

        registry.register(Arc::new(
            CommandReload::new("i3", "i3-msg", vec!["reload".into()]).require_env("I3SOCK"),
        ));
        registry.register(Arc::new(
            CommandReload::new("sway", "swaymsg", vec!["reload".into()]).require_env("SWAYSOCK"),
        ));
        registry.register(Arc::new(
            CommandReload::new(
                "polybar",
                "polybar-msg",
                vec!["cmd".into(), "restart".into()],
            )
            .require_env("DISPLAY"),
        ));

        registry.register(Arc::new(TerminalSequences::new(sequences)));
        registry
    }

    /// Add an action, replacing any with the same target.
    pub fn register(&mut self, action: Arc<dyn ReloadAction>) {
        let target = action.target().to_string();
        if self.actions.insert(target.clone(), action).is_some() {
            debug!(action = %target, "replaced reload action");
        }
    }

    /// Drop an action. Returns whether it was registered.
    pub fn remove(&mut self, target: &str) -> bool {
        self.actions.remove(target).is_some()
    }

    pub fn targets(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every available action on its own thread.
    ///
    /// Waits at most `timeout` (plus a short grace period) in total. Actions
    /// still running after that are abandoned and reported as timed out.
    pub fn run_all(&self, timeout: Duration) -> ReloadReport {
        let mut report = ReloadReport::default();
        let (tx, rx) = mpsc::channel::<(String, Result<(), ReloadError>)>();
        let mut pending = BTreeSet::new();

        for (target, action) in &self.actions {
            if !action.is_available() {
                debug!(action = %target, "reload action not available, skipping");
                report.skipped.push(target.clone());
                continue;
            }
            let action = Arc::clone(action);
            let tx = tx.clone();
            let name = target.clone();
            let spawned = thread::Builder::new()
                .name(format!("reload-{target}"))
                .spawn(move || {
                    let result = action.attempt(timeout);
                    // The registry may have stopped listening.
                    let _ = tx.send((name, result));
                });
            match spawned {
                Ok(_) => {
                    pending.insert(target.clone());
                }
                Err(source) => report.failures.push(ReloadError::Spawn {
                    target: target.clone(),
                    source,
                }),
            }
        }
        drop(tx);

        let deadline = Instant::now() + timeout + GRACE;
        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((target, result)) => {
                    pending.remove(&target);
                    match result {
                        Ok(()) => {
                            info!(action = %target, "reloaded");
                            report.succeeded.push(target);
                        }
                        Err(err) => {
                            warn!("{err}");
                            report.failures.push(err);
                        }
                    }
                }
                Err(_) => break,
            }
        }
        for target in pending {
            let err = ReloadError::TimedOut { target, timeout };
            warn!("{err}");
            report.failures.push(err);
        }

        report.succeeded.sort();
        report.failures.sort_by(|a, b| a.target().cmp(b.target()));
        report
    }
}
