//! Session driver types.

use std::path::PathBuf;
use std::time::Duration;

use buggywhip_core::config::ShellConfig;

use crate::subprocess::{ChildExit, OutputSink};

/// Configuration for the session driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Shell executable, started as `<shell> <pipe>`.
    pub shell: PathBuf,
    /// Directory the script pipes are created in.
    pub pipe_dir: PathBuf,
    /// Capacity of each session's feed queue.
    pub feed_queue_capacity: usize,
    /// How long to wait for the shell to open its script pipe.
    pub pipe_open_timeout: Duration,
    /// Kill the shell if teardown has waited this long. `None` waits forever.
    pub terminate_timeout: Option<Duration>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            shell: PathBuf::from("/bin/sh"),
            pipe_dir: std::env::temp_dir(),
            feed_queue_capacity: 1024,
            pipe_open_timeout: Duration::from_secs(10),
            terminate_timeout: None,
        }
    }
}

impl From<&ShellConfig> for DriverConfig {
    fn from(shell: &ShellConfig) -> Self {
        Self {
            shell: shell.executable.clone(),
            feed_queue_capacity: shell.feed_queue_capacity,
            pipe_open_timeout: shell.pipe_open_timeout(),
            terminate_timeout: shell.terminate_timeout(),
            ..Self::default()
        }
    }
}

/// Where the shell's output goes. A stream without a sink is discarded.
#[derive(Debug, Clone, Default)]
pub struct OutputSinks {
    pub stdout: Option<OutputSink>,
    pub stderr: Option<OutputSink>,
}

/// Observable state of a session driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No source and no shell.
    Unloaded,
    /// A source is recorded but no shell runs.
    Loaded,
    /// A shell is running with relays and feeder active.
    Running,
    /// The shell exited on its own; the session awaits teardown.
    Exited(ChildExit),
    /// The driver was closed and accepts no new sessions.
    Closed,
}
