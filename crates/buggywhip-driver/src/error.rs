//! Session driver error types.

use std::io;
use std::path::PathBuf;

use crate::subprocess::ChildExit;

/// Errors from session driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to create script pipe {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn {}: {source}", executable.display())]
    Spawn {
        executable: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open script pipe {}: {reason}", path.display())]
    PipeOpen { path: PathBuf, reason: String },

    #[error("{}: no such file", .0.display())]
    NotFound(PathBuf),

    #[error("cannot load {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("shell not started")]
    NotRunning,

    #[error("shell has exited ({0})")]
    ShellExited(ChildExit),

    #[error("failed to start shell: {0}")]
    Start(#[source] Box<DriverError>),

    #[error("session driver is closed")]
    Closed,
}

impl DriverError {
    /// The innermost error, looking through [`DriverError::Start`].
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Start(inner) => inner.root_cause(),
            other => other,
        }
    }

    /// Whether the error means there is no live shell to talk to.
    pub const fn is_not_running(&self) -> bool {
        matches!(self, Self::NotRunning | Self::ShellExited(_))
    }

    /// Whether the shell executable could not be started.
    pub fn is_spawn(&self) -> bool {
        matches!(self.root_cause(), Self::Spawn { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_unwraps_start() {
        let err = DriverError::Start(Box::new(DriverError::Spawn {
            executable: PathBuf::from("/nope"),
            source: io::Error::from(io::ErrorKind::NotFound),
        }));
        assert!(err.is_spawn());
        assert!(!err.is_not_running());
        assert!(err.to_string().starts_with("failed to start shell: failed to spawn /nope"));
    }

    #[test]
    fn exited_counts_as_not_running() {
        let err = DriverError::ShellExited(ChildExit::Lost("gone"));
        assert!(err.is_not_running());
        assert!(DriverError::NotRunning.is_not_running());
        assert!(!DriverError::Closed.is_not_running());
    }
}
