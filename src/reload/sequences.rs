use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use super::ReloadAction;
use crate::color::Color;
use crate::error::ReloadError;
use crate::scheme::ColorScheme;

/// Directory of pseudo-terminal slaves on Unix.
const PTS_DIR: &str = "/dev/pts";

fn set_color(out: &mut String, index: u16, color: Color) {
    out.push_str(&format!("\x1b]4;{index};{color}\x1b\\"));
}

fn set_special(out: &mut String, code: u16, color: Color, alpha: Option<u8>) {
    match alpha {
        Some(alpha) if alpha < 100 => {
            out.push_str(&format!("\x1b]{code};[{alpha}]{color}\x1b\\"))
        }
        _ => out.push_str(&format!("\x1b]{code};{color}\x1b\\")),
    }
}

/// OSC escape sequences that recolor a running terminal.
///
/// Sets the 16 palette entries (OSC 4), foreground/background/cursor
/// (OSC 10/11/12) plus the extra indices some terminals read, and the URxvt
/// border (OSC 708). Background sequences carry the alpha when it is below 100.
pub fn build_sequences(scheme: &ColorScheme) -> String {
    let mut out = String::new();
    for (i, color) in scheme.colors().iter().enumerate() {
        set_color(&mut out, i as u16, *color);
    }

    let alpha = Some(scheme.alpha());
    set_special(&mut out, 10, scheme.foreground(), None);
    set_special(&mut out, 11, scheme.background(), alpha);
    set_special(&mut out, 12, scheme.cursor(), None);
    set_special(&mut out, 13, scheme.foreground(), None);
    set_special(&mut out, 17, scheme.foreground(), None);
    set_special(&mut out, 19, scheme.background(), None);
    set_color(&mut out, 232, scheme.background());
    set_color(&mut out, 256, scheme.foreground());
    set_color(&mut out, 257, scheme.background());
    set_special(&mut out, 708, scheme.background(), alpha);
    out
}

/// Writes prebuilt sequences to every open pseudo-terminal.
pub struct TerminalSequences {
    sequences: String,
    tty_dir: PathBuf,
}

impl TerminalSequences {
    pub fn new(sequences: String) -> Self {
        Self {
            sequences,
            tty_dir: PathBuf::from(PTS_DIR),
        }
    }

    /// Broadcast into another directory instead of `/dev/pts`.
    pub fn with_tty_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tty_dir = dir.into();
        self
    }

    fn terminals(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut ttys: Vec<PathBuf> = fs::read_dir(&self.tty_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
            })
            .map(|e| e.path())
            .collect();
        ttys.sort();
        Ok(ttys)
    }
}

impl ReloadAction for TerminalSequences {
    fn target(&self) -> &str {
        "sequences"
    }

    fn is_available(&self) -> bool {
        cfg!(unix) && self.tty_dir.is_dir()
    }

    fn attempt(&self, _timeout: Duration) -> Result<(), ReloadError> {
        let ttys = self.terminals().map_err(|err| ReloadError::Failed {
            target: self.target().to_string(),
            message: format!("cannot list {}: {err}", self.tty_dir.display()),
        })?;

        let mut written = 0;
        for tty in &ttys {
            // Terminals owned by other users are not writable; skip them.
            let result = OpenOptions::new()
                .write(true)
                .open(tty)
                .and_then(|mut f| f.write_all(self.sequences.as_bytes()));
            match result {
                Ok(()) => written += 1,
                Err(err) => debug!(tty = %tty.display(), "skipping terminal: {err}"),
            }
        }
        debug!(written, total = ttys.len(), "sent color sequences");
        Ok(())
    }
}
