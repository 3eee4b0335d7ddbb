//! Debugger command table.

mod help;

use std::path::PathBuf;

use buggywhip_driver::DriverError;

pub use help::{COMMAND_NAMES, HELP_TEXT};

/// One parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    Load(Option<PathBuf>),
    List(Vec<String>),
    Run,
    Do(Vec<String>),
    /// Reserved for stepping and breakpoints, which do not exist yet.
    NotImplemented(String),
    Unknown(String),
}

impl Command {
    /// Parse a command line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let name = fields.next()?;
        let args: Vec<String> = fields.map(ToString::to_string).collect();

        let command = match name {
            "help" => Self::Help,
            "exit" | "quit" => Self::Exit,
            "load" => Self::Load(args.into_iter().next().map(PathBuf::from)),
            "list" => Self::List(args),
            "run" => Self::Run,
            "do" => Self::Do(args),
            "step" | "next" | "breakpoint" => Self::NotImplemented(name.to_string()),
            other => Self::Unknown(other.to_string()),
        };
        Some(command)
    }
}

/// Errors reported back to the operator, one line each.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("no files specified")]
    NoFile,

    #[error("command not implemented: {0}")]
    NotImplemented(String),

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error(transparent)]
    Source(#[from] buggywhip_core::Error),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
