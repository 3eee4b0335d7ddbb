//! Application state: the session driver plus the source navigator.

use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use buggywhip_core::SourceNavigator;
use buggywhip_core::source::read_lines;
use buggywhip_driver::SessionDriver;

use crate::commands::{Command, CommandError, HELP_TEXT};

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The debugger: one driver, one navigator over the loaded source.
pub struct App {
    driver: SessionDriver,
    navigator: SourceNavigator,
}

impl App {
    pub const fn new(driver: SessionDriver, list_count: usize) -> Self {
        Self {
            driver,
            navigator: SourceNavigator::new(list_count),
        }
    }

    pub const fn driver(&self) -> &SessionDriver {
        &self.driver
    }

    pub const fn navigator(&self) -> &SourceNavigator {
        &self.navigator
    }

    /// Load `source` if given and start the first shell.
    pub async fn open(&mut self, source: Option<&Path>) -> Result<(), CommandError> {
        if let Some(source) = source {
            self.load_source(source).await?;
        }
        self.driver.start().await?;
        Ok(())
    }

    /// Execute one command. Listings go to `out`, help text to `diag`.
    pub async fn execute<W, E>(
        &mut self,
        command: Command,
        out: &mut W,
        diag: &mut E,
    ) -> Result<Flow, CommandError>
    where
        W: Write,
        E: Write,
    {
        debug!(?command, "Executing command");
        match command {
            Command::Help => {
                diag.write_all(HELP_TEXT.as_bytes())?;
            }
            Command::Exit => return Ok(Flow::Exit),
            Command::Load(None) => return Err(CommandError::NoFile),
            Command::Load(Some(path)) => {
                self.load_source(&path).await?;
                self.driver.reload().await?;
            }
            Command::List(args) => {
                self.navigator.list(&args, out)?;
                out.flush()?;
            }
            Command::Run => self.run_source().await?,
            Command::Do(words) => self.driver.submit(&words).await?,
            Command::NotImplemented(name) => return Err(CommandError::NotImplemented(name)),
            Command::Unknown(name) => return Err(CommandError::Unknown(name)),
        }
        Ok(Flow::Continue)
    }

    /// Close the running session.
    pub async fn shutdown(&self) {
        self.driver.close().await;
    }

    /// Point both the driver and the navigator at `path`, or neither.
    async fn load_source(&mut self, path: &Path) -> Result<(), CommandError> {
        SessionDriver::check_source(path).await?;
        let mut navigator = self.navigator.clone();
        navigator.load(path)?;
        self.driver.load(path).await?;
        self.navigator = navigator;
        Ok(())
    }

    /// Feed every line of the loaded source to the shell, in order.
    async fn run_source(&self) -> Result<(), CommandError> {
        let source = self
            .driver
            .source()
            .await
            .ok_or(buggywhip_core::Error::NotLoaded)?;
        let lines = read_lines(&source)?;
        info!(source = %source.display(), lines = lines.len(), "Running source");
        for line in &lines {
            self.driver.submit_line(line).await?;
        }
        Ok(())
    }
}
