//! Session driver.
//!
//! Owns at most one live session: the script pipe, the shell reading it, the
//! two output relays and the feeder. `start`/`reload`/`close` serialize
//! through one async mutex, so a reload can never race another reload.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::unix::pipe;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::feeder::{self, FeedQueue};
use super::types::{DriverConfig, OutputSinks, SessionState};
use crate::error::DriverError;
use crate::pipe::ScriptPipe;
use crate::subprocess::{ChildHandle, relay};

/// Poll interval while waiting for the shell to open its script.
const PIPE_OPEN_POLL: Duration = Duration::from_millis(10);

/// How long teardown waits for the relays after the shell has exited.
/// Output held open by a leftover background job is cut off after this.
const RELAY_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// One live shell and everything attached to it.
struct Session {
    pipe: ScriptPipe,
    child: ChildHandle,
    feed_tx: FeedQueue,
    feeder: JoinHandle<usize>,
    relays: Vec<(&'static str, JoinHandle<usize>)>,
}

#[derive(Default)]
struct DriverState {
    source: Option<PathBuf>,
    session: Option<Session>,
    closed: bool,
}

/// Drives a shell as a debuggee.
pub struct SessionDriver {
    config: DriverConfig,
    sinks: OutputSinks,
    state: Mutex<DriverState>,
}

impl SessionDriver {
    /// Create a driver. No shell is started until [`SessionDriver::start`].
    pub fn new(config: DriverConfig, sinks: OutputSinks) -> Self {
        Self {
            config,
            sinks,
            state: Mutex::new(DriverState::default()),
        }
    }

    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Check that `path` can serve as a source without recording it.
    ///
    /// A missing file is `NotFound`; any other failure to inspect it, or a
    /// path that is a directory, is reported as `Source`.
    pub async fn check_source(path: &Path) -> Result<(), DriverError> {
        let source_error = |source: io::Error| DriverError::Source {
            path: path.to_path_buf(),
            source,
        };
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Err(source_error(io::ErrorKind::IsADirectory.into())),
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DriverError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(source_error(e)),
        }
    }

    /// Record `path` as the source for the next session.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<(), DriverError> {
        let path = path.as_ref();
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(DriverError::Closed);
        }
        Self::check_source(path).await?;
        state.source = Some(path.to_path_buf());
        drop(state);

        info!(path = %path.display(), "Loaded source");
        Ok(())
    }

    /// The recorded source path.
    pub async fn source(&self) -> Option<PathBuf> {
        self.state.lock().await.source.clone()
    }

    /// Start a fresh session, tearing down the current one first.
    pub async fn start(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(DriverError::Closed);
        }
        if let Some(session) = state.session.take() {
            self.teardown(session).await;
        }

        let session = self
            .start_session()
            .await
            .map_err(|e| DriverError::Start(Box::new(e)))?;
        state.session = Some(session);
        drop(state);
        Ok(())
    }

    /// Restart the shell, e.g. after a new source was loaded.
    pub async fn reload(&self) -> Result<(), DriverError> {
        debug!("Reloading session");
        self.start().await
    }

    /// Tear down the current session and refuse new ones. Idempotent.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        if let Some(session) = state.session.take() {
            self.teardown(session).await;
        }
    }

    /// Send one command line made of `words` joined by single spaces.
    ///
    /// An empty `words` is a no-op.
    pub async fn submit<S: AsRef<str>>(&self, words: &[S]) -> Result<(), DriverError> {
        if words.is_empty() {
            return Ok(());
        }
        let mut line = words
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        line.push('\n');
        self.enqueue(line).await
    }

    /// Send one already formed line, adding the terminator if missing.
    pub async fn submit_line(&self, line: &str) -> Result<(), DriverError> {
        let mut line = line.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.enqueue(line).await
    }

    /// Current state, probing the shell for liveness.
    pub async fn status(&self) -> SessionState {
        let state = self.state.lock().await;
        if state.closed {
            SessionState::Closed
        } else if let Some(session) = &state.session {
            session
                .child
                .try_exit()
                .map_or(SessionState::Running, SessionState::Exited)
        } else if state.source.is_some() {
            SessionState::Loaded
        } else {
            SessionState::Unloaded
        }
    }

    /// Pid of the running shell, if any.
    pub async fn pid(&self) -> Option<u32> {
        self.state
            .lock()
            .await
            .session
            .as_ref()
            .and_then(|session| session.child.pid())
    }

    async fn enqueue(&self, line: String) -> Result<(), DriverError> {
        // Clone the sender and release the lock before waiting on backpressure,
        // so a full queue cannot hold up teardown.
        let feed_tx = {
            let state = self.state.lock().await;
            let session = state.session.as_ref().ok_or(DriverError::NotRunning)?;
            if let Some(exit) = session.child.try_exit() {
                return Err(DriverError::ShellExited(exit));
            }
            session.feed_tx.clone()
        };

        feed_tx
            .send(line)
            .await
            .map_err(|_| DriverError::NotRunning)
    }

    async fn start_session(&self) -> Result<Session, DriverError> {
        let pipe = ScriptPipe::create_in(&self.config.pipe_dir)?;
        let mut child = ChildHandle::spawn(
            &self.config.shell,
            [pipe.path()],
            self.sinks.stdout.is_some(),
            self.sinks.stderr.is_some(),
        )?;

        // Relays start before the pipe is opened so a shell that fails early
        // still gets its complaints delivered.
        let mut relays = Vec::with_capacity(2);
        if let (Some(sink), Some(stdout)) = (self.sinks.stdout.clone(), child.take_stdout()) {
            relays.push(("stdout", relay::start("stdout", stdout, sink)));
        }
        if let (Some(sink), Some(stderr)) = (self.sinks.stderr.clone(), child.take_stderr()) {
            relays.push(("stderr", relay::start("stderr", stderr, sink)));
        }

        let writer = match self.open_pipe_writer(&pipe, &child).await {
            Ok(writer) => writer,
            Err(e) => {
                child.close_input();
                child.kill();
                let exit = child.wait().await;
                Self::join_relays(relays).await;
                warn!(pid = child.pid(), %exit, error = %e, "Shell never opened its script");
                return Err(e);
            }
        };

        let (feed_tx, feeder) = feeder::start(writer, self.config.feed_queue_capacity);

        info!(
            pid = child.pid(),
            shell = %child.executable().display(),
            pipe = %pipe.path().display(),
            "Session started"
        );

        Ok(Session {
            pipe,
            child,
            feed_tx,
            feeder,
            relays,
        })
    }

    /// Open the pipe's write end once the shell has opened the read end.
    async fn open_pipe_writer(
        &self,
        pipe: &ScriptPipe,
        child: &ChildHandle,
    ) -> Result<pipe::Sender, DriverError> {
        let deadline = Instant::now() + self.config.pipe_open_timeout;
        let fail = |reason: String| DriverError::PipeOpen {
            path: pipe.path().to_path_buf(),
            reason,
        };

        loop {
            if let Some(writer) = pipe.try_open_writer().map_err(|e| fail(e.to_string()))? {
                return Ok(writer);
            }
            if let Some(exit) = child.try_exit() {
                return Err(fail(format!("shell exited before reading its script ({exit})")));
            }
            if Instant::now() >= deadline {
                return Err(fail(format!(
                    "shell did not open its script within {:?}",
                    self.config.pipe_open_timeout
                )));
            }
            tokio::time::sleep(PIPE_OPEN_POLL).await;
        }
    }

    /// Close the feed queue, let the feeder close the pipe, then reap the
    /// shell, drain the relays and remove the pipe, in that order.
    async fn teardown(&self, session: Session) {
        let Session {
            pipe,
            mut child,
            feed_tx,
            feeder,
            relays,
        } = session;

        drop(feed_tx);
        match self.bounded(feeder, &child).await {
            Ok(lines) => debug!(lines, "Feeder finished"),
            Err(e) => warn!(error = %e, "Feeder task failed"),
        }

        child.close_input();
        let exit = self.bounded(child.wait(), &child).await;

        Self::join_relays(relays).await;
        let path = pipe.path().to_path_buf();
        pipe.remove();

        info!(pid = child.pid(), %exit, pipe = %path.display(), "Session closed");
    }

    /// Await `fut`; if a terminate timeout is configured and elapses first,
    /// kill the shell and keep waiting.
    async fn bounded<F: Future>(&self, fut: F, child: &ChildHandle) -> F::Output {
        tokio::pin!(fut);
        if let Some(limit) = self.config.terminate_timeout {
            if let Ok(out) = tokio::time::timeout(limit, &mut fut).await {
                return out;
            }
            warn!(pid = child.pid(), ?limit, "Shell still busy after its input closed, killing");
            child.kill();
        }
        fut.await
    }

    async fn join_relays(relays: Vec<(&'static str, JoinHandle<usize>)>) {
        for (stream, mut relay) in relays {
            match tokio::time::timeout(RELAY_DRAIN_GRACE, &mut relay).await {
                Ok(Ok(bytes)) => debug!(stream, bytes, "Relay finished"),
                Ok(Err(e)) => warn!(stream, error = %e, "Relay task failed"),
                Err(_) => {
                    warn!(stream, "Relay still open after shell exit, abandoning it");
                    relay.abort();
                }
            }
        }
    }
}
