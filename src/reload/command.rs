use std::io::Read;
use std::process::{ChildStderr, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::debug;
use wait_timeout::ChildExt;

use super::ReloadAction;
use crate::error::ReloadError;

/// Bytes of stderr kept for the failure message.
const STDERR_TAIL: usize = 4096;

/// How long a failed command's stderr reader may take to reach EOF.
const STDERR_GRACE: Duration = Duration::from_millis(250);

/// Runs an external program to reload a target.
#[derive(Debug, Clone)]
pub struct CommandReload {
    target: String,
    program: String,
    args: Vec<String>,
    required_env: Vec<&'static str>,
}

impl CommandReload {
    pub fn new(target: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            target: target.into(),
            program: program.into(),
            args,
            required_env: Vec::new(),
        }
    }

    /// Build from an argv list such as a config hook. `None` when empty.
    pub fn from_argv(target: impl Into<String>, argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(target, program.clone(), args.to_vec()))
    }

    /// Run `line` through `sh -c`.
    pub fn shell(target: impl Into<String>, line: &str) -> Self {
        Self::new(target, "sh", vec!["-c".into(), line.to_string()])
    }

    /// Only run when `var` is set, e.g. `DISPLAY` for X11 tools.
    pub fn require_env(mut self, var: &'static str) -> Self {
        self.required_env.push(var);
        self
    }
}

impl ReloadAction for CommandReload {
    fn target(&self) -> &str {
        &self.target
    }

    fn is_available(&self) -> bool {
        if let Some(var) = self
            .required_env
            .iter()
            .find(|var| std::env::var_os(var).is_none())
        {
            debug!(action = %self.target, "{var} is not set");
            return false;
        }
        match which::which(&self.program) {
            Ok(_) => true,
            Err(err) => {
                debug!(action = %self.target, program = %self.program, "not found: {err}");
                false
            }
        }
    }

    fn attempt(&self, timeout: Duration) -> Result<(), ReloadError> {
        debug!(action = %self.target, program = %self.program, args = ?self.args, "running");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ReloadError::Spawn {
                target: self.target.clone(),
                source,
            })?;
        let stderr = child.stderr.take().map(spawn_stderr_pump);

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ReloadError::TimedOut {
                    target: self.target.clone(),
                    timeout,
                });
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ReloadError::Failed {
                    target: self.target.clone(),
                    message: err.to_string(),
                });
            }
        };

        if status.success() {
            return Ok(());
        }
        // A background grandchild may hold the pipe open; don't wait on it.
        let stderr = stderr
            .and_then(|rx| rx.recv_timeout(STDERR_GRACE).ok())
            .unwrap_or_default();
        let stderr = stderr.trim();
        let message = if stderr.is_empty() {
            format!("{} exited with {status}", self.program)
        } else {
            format!("{} exited with {status}: {stderr}", self.program)
        };
        Err(ReloadError::Failed {
            target: self.target.clone(),
            message,
        })
    }
}

/// Drain the child's stderr on its own thread so a chatty command never
/// blocks on a full pipe. Sends the last [`STDERR_TAIL`] bytes at EOF.
fn spawn_stderr_pump(mut pipe: ChildStderr) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut tail: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    tail.extend_from_slice(&chunk[..n]);
                    if tail.len() > STDERR_TAIL {
                        tail.drain(..tail.len() - STDERR_TAIL);
                    }
                }
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&tail).into_owned());
    });
    rx
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn successful_command() {
        let action = CommandReload::shell("ok", "exit 0");
        assert!(action.is_available());
        assert!(action.attempt(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn failure_carries_stderr() {
        let action = CommandReload::shell("bad", "echo nope >&2; exit 3");
        match action.attempt(Duration::from_secs(5)) {
            Err(ReloadError::Failed { target, message }) => {
                assert_eq!(target, "bad");
                assert!(message.contains("nope"), "{message}");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn chatty_stderr_does_not_stall_the_command() {
        let action = CommandReload::shell("noisy", "head -c 200000 /dev/zero >&2; exit 0");
        let start = Instant::now();
        assert!(action.attempt(Duration::from_secs(5)).is_ok());
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn failure_message_keeps_only_the_stderr_tail() {
        let action = CommandReload::shell(
            "loud",
            "head -c 100000 /dev/zero | tr '\\0' x >&2; exit 1",
        );
        match action.attempt(Duration::from_secs(5)) {
            Err(ReloadError::Failed { message, .. }) => {
                assert!(message.len() < STDERR_TAIL + 100, "{}", message.len());
                assert!(message.ends_with('x'));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn slow_command_is_killed() {
        let action = CommandReload::shell("slow", "sleep 5");
        let start = Instant::now();
        let result = action.attempt(Duration::from_millis(200));
        assert!(matches!(result, Err(ReloadError::TimedOut { .. })));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn missing_program_is_unavailable() {
        let action = CommandReload::new("ghost", "definitely-not-a-real-program-1234", vec![]);
        assert!(!action.is_available());
    }

    #[test]
    fn required_env_gates_availability() {
        let action =
            CommandReload::shell("gated", "true").require_env("NUWAL_TEST_UNSET_VARIABLE");
        assert!(!action.is_available());
    }

    #[test]
    fn argv_hooks() {
        let argv = vec!["notify-send".to_string(), "wal".to_string()];
        let action = CommandReload::from_argv("hook", &argv).unwrap();
        assert_eq!(action.program, "notify-send");
        assert_eq!(action.args, ["wal"]);
        assert!(CommandReload::from_argv("empty", &[]).is_none());
    }
}
