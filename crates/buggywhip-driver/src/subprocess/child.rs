//! Debuggee shell process handle.
//!
//! The `tokio::process::Child` is moved into a waiter task right after spawn.
//! The waiter reaps the process and publishes its exit on a watch channel,
//! so the handle can answer liveness queries without `&mut` access and no
//! exited shell is ever left as a zombie.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::DriverError;

/// How a shell process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// The process was reaped with this status.
    Exited(ExitStatus),
    /// Waiting for the process failed; its status is unknown.
    Lost(&'static str),
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(status) => write!(f, "{status}"),
            Self::Lost(reason) => write!(f, "status unknown: {reason}"),
        }
    }
}

/// Handle to a running shell.
#[derive(Debug)]
pub struct ChildHandle {
    executable: PathBuf,
    pid: Option<u32>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    exit_rx: watch::Receiver<Option<ChildExit>>,
}

impl ChildHandle {
    /// Spawn `executable` with `args`.
    ///
    /// Stdout/stderr are piped when the matching `capture_*` flag is set and
    /// sent to `/dev/null` otherwise. Stdin is always piped so it can be
    /// closed explicitly with [`ChildHandle::close_input`].
    pub fn spawn<I, S>(
        executable: &Path,
        args: I,
        capture_stdout: bool,
        capture_stderr: bool,
    ) -> Result<Self, DriverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(executable);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(if capture_stdout { Stdio::piped() } else { Stdio::null() })
            .stderr(if capture_stderr { Stdio::piped() } else { Stdio::null() });

        let mut child = cmd.spawn().map_err(|e| DriverError::Spawn {
            executable: executable.to_path_buf(),
            source: e,
        })?;

        let pid = child.id();
        info!(pid, executable = %executable.display(), "Spawned shell");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(async move {
            let exit = match child.wait().await {
                Ok(status) => {
                    info!(pid, %status, "Shell exited");
                    ChildExit::Exited(status)
                }
                Err(e) => {
                    warn!(pid, error = %e, "Failed to wait for shell");
                    ChildExit::Lost("wait failed")
                }
            };
            exit_tx.send_replace(Some(exit));
        });

        Ok(Self {
            executable: executable.to_path_buf(),
            pid,
            stdin,
            stdout,
            stderr,
            exit_rx,
        })
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Take the shell's stdout for relaying. `None` if not captured or taken.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Take the shell's stderr for relaying. `None` if not captured or taken.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Close the shell's stdin. Idempotent.
    pub fn close_input(&mut self) {
        if self.stdin.take().is_some() {
            debug!(pid = self.pid, "Closed shell stdin");
        }
    }

    /// The exit of the shell, if it has already happened.
    pub fn try_exit(&self) -> Option<ChildExit> {
        *self.exit_rx.borrow()
    }

    /// Wait until the shell exits. Returns the cached exit once it has.
    pub async fn wait(&self) -> ChildExit {
        let mut exit_rx = self.exit_rx.clone();
        let exit = exit_rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|exit| *exit);
        exit.unwrap_or(ChildExit::Lost("exit watcher dropped"))
    }

    /// Send `SIGKILL` to the shell unless it has already exited.
    pub fn kill(&self) {
        if self.try_exit().is_some() {
            return;
        }
        let Some(pid) = self.pid.and_then(|pid| i32::try_from(pid).ok()) else {
            return;
        };
        match kill(Pid::from_raw(pid), Signal::SIGKILL) {
            Ok(()) => info!(pid, "Killed shell"),
            Err(e) => warn!(pid, error = %e, "Failed to kill shell"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn missing_executable_is_spawn_error() {
        let err = ChildHandle::spawn(
            Path::new("/nonexistent/buggywhip-shell"),
            ["script"],
            true,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, DriverError::Spawn { .. }));
    }

    #[tokio::test]
    async fn wait_returns_cached_status() {
        let child = ChildHandle::spawn(Path::new("/bin/sh"), ["-c", "exit 3"], false, false)
            .unwrap();
        let first = child.wait().await;
        let ChildExit::Exited(status) = first else {
            panic!("unexpected exit: {first:?}");
        };
        assert_eq!(status.code(), Some(3));
        assert_eq!(child.wait().await, first);
        assert_eq!(child.try_exit(), Some(first));
    }

    #[tokio::test]
    async fn close_input_ends_stdin_reader() {
        let mut child = ChildHandle::spawn(Path::new("/bin/cat"), [] as [&str; 0], true, false)
            .unwrap();
        let mut stdout = child.take_stdout().unwrap();
        assert!(child.take_stdout().is_none());
        assert!(child.take_stderr().is_none());
        assert!(child.try_exit().is_none());

        child.close_input();
        child.close_input();

        let mut out = Vec::new();
        stdout.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
        assert!(matches!(child.wait().await, ChildExit::Exited(s) if s.success()));
    }

    #[tokio::test]
    async fn kill_terminates_a_busy_shell() {
        let child = ChildHandle::spawn(Path::new("/bin/sh"), ["-c", "sleep 30"], false, false)
            .unwrap();
        child.kill();
        let exit = child.wait().await;
        assert!(matches!(exit, ChildExit::Exited(s) if !s.success()));
    }
}
