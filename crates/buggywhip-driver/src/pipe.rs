//! Named pipe that hands the script to the shell.
//!
//! The shell is started as `<shell> <fifo>` and reads its commands from the
//! FIFO; the session feeder holds the only write end. One pipe per session.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tokio::net::unix::pipe;
use tracing::{debug, warn};

use crate::error::DriverError;

/// Distinguishes pipes created by this process; combined with the pid.
static PIPE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Names skipped on `EEXIST` before giving up.
const MAX_CREATE_ATTEMPTS: usize = 16;

/// Owns the FIFO file on disk. Removes it on drop.
#[derive(Debug)]
pub struct ScriptPipe {
    path: PathBuf,
    removed: bool,
}

impl ScriptPipe {
    /// Create a new FIFO in `dir`, named `buggywhip-<pid>-<n>`.
    ///
    /// A stale file left behind by an earlier process with the same pid is
    /// skipped by moving on to the next counter value.
    pub fn create_in(dir: &Path) -> Result<Self, DriverError> {
        let pid = std::process::id();
        let mut path = PathBuf::new();

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let n = PIPE_COUNTER.fetch_add(1, Ordering::Relaxed);
            path = dir.join(format!("buggywhip-{pid}-{n}"));

            match mkfifo(path.as_path(), Mode::S_IRUSR | Mode::S_IWUSR) {
                Ok(()) => {
                    debug!(path = %path.display(), "Created script pipe");
                    return Ok(Self {
                        path,
                        removed: false,
                    });
                }
                Err(Errno::EEXIST) => {
                    warn!(path = %path.display(), "Script pipe name taken, trying next");
                }
                Err(errno) => {
                    return Err(DriverError::Resource {
                        path,
                        source: io::Error::from(errno),
                    });
                }
            }
        }

        Err(DriverError::Resource {
            path,
            source: io::Error::from(Errno::EEXIST),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to open the write end without blocking.
    ///
    /// Returns `Ok(None)` while nobody has the FIFO open for reading yet.
    pub fn try_open_writer(&self) -> io::Result<Option<pipe::Sender>> {
        match pipe::OpenOptions::new().open_sender(&self.path) {
            Ok(sender) => Ok(Some(sender)),
            Err(e) if e.raw_os_error() == Some(Errno::ENXIO as i32) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove the FIFO from disk. Failures are logged, not returned.
    pub fn remove(mut self) {
        self.remove_file();
    }

    fn remove_file(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed script pipe"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove script pipe"),
        }
    }
}

impl Drop for ScriptPipe {
    fn drop(&mut self) {
        self.remove_file();
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::os::unix::fs::FileTypeExt;

    use super::*;

    #[test]
    fn creates_fifo_and_removes_it() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipe = ScriptPipe::create_in(dir.path()).unwrap();
        let path = pipe.path().to_path_buf();

        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.file_type().is_fifo());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(&format!("buggywhip-{}-", std::process::id())));

        pipe.remove();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_fifo() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = {
            let pipe = ScriptPipe::create_in(dir.path()).unwrap();
            pipe.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn names_are_unique() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = ScriptPipe::create_in(dir.path()).unwrap();
        let b = ScriptPipe::create_in(dir.path()).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn missing_directory_is_resource_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ScriptPipe::create_in(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, DriverError::Resource { .. }));
    }

    #[tokio::test]
    async fn writer_needs_a_reader() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipe = ScriptPipe::create_in(dir.path()).unwrap();
        assert!(pipe.try_open_writer().unwrap().is_none());

        let _reader = pipe::OpenOptions::new().open_receiver(pipe.path()).unwrap();
        assert!(pipe.try_open_writer().unwrap().is_some());
    }
}
