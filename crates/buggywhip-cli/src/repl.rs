//! Readline loop.
//!
//! `rustyline` blocks, so the editor lives on its own thread. The async side
//! asks for one line at a time; the prompt is only redrawn after the previous
//! command has been handled.

use std::io::{self, Write};
use std::thread;

use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Context, Editor, Helper, Highlighter, Hinter, Validator};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::{App, Flow};
use crate::commands::{COMMAND_NAMES, Command};

pub const PROMPT: &str = "(bgw) ";

/// Result of one prompt.
#[derive(Debug)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C: drop the line and prompt again.
    Interrupted,
    /// Ctrl-D or closed input.
    Eof,
    Failed(String),
}

/// Completes command names, and file names after `load`.
#[derive(Helper, Hinter, Highlighter, Validator)]
struct BgwHelper {
    files: FilenameCompleter,
}

impl Completer for BgwHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        let trimmed = head.trim_start();
        let start = head.len() - trimmed.len();

        match trimmed.split_once(char::is_whitespace) {
            None => {
                let candidates = complete_command(trimmed)
                    .into_iter()
                    .map(|name| Pair {
                        display: name.to_string(),
                        replacement: format!("{name} "),
                    })
                    .collect();
                Ok((start, candidates))
            }
            Some(("load", _)) => self.files.complete(line, pos, ctx),
            Some(_) => Ok((pos, Vec::new())),
        }
    }
}

/// Command names starting with `prefix`.
pub fn complete_command(prefix: &str) -> Vec<&'static str> {
    COMMAND_NAMES
        .iter()
        .copied()
        .filter(|name| name.starts_with(prefix))
        .collect()
}

/// Handle to the editor thread.
pub struct LineReader {
    requests: std::sync::mpsc::Sender<()>,
    lines: mpsc::Receiver<ReadOutcome>,
}

impl LineReader {
    pub fn spawn() -> Self {
        let (requests, request_rx) = std::sync::mpsc::channel::<()>();
        let (line_tx, lines) = mpsc::channel(1);

        thread::spawn(move || {
            let mut editor = match build_editor() {
                Ok(editor) => editor,
                Err(e) => {
                    line_tx.blocking_send(ReadOutcome::Failed(e.to_string())).ok();
                    return;
                }
            };

            while request_rx.recv().is_ok() {
                let outcome = match editor.readline(PROMPT) {
                    Ok(line) => ReadOutcome::Line(line),
                    Err(ReadlineError::Interrupted) => ReadOutcome::Interrupted,
                    Err(ReadlineError::Eof) => ReadOutcome::Eof,
                    Err(e) => ReadOutcome::Failed(e.to_string()),
                };
                if line_tx.blocking_send(outcome).is_err() {
                    break;
                }
            }
            debug!("Line reader stopped");
        });

        Self { requests, lines }
    }

    /// Prompt for the next line.
    pub async fn read_line(&mut self) -> ReadOutcome {
        if self.requests.send(()).is_err() {
            return ReadOutcome::Eof;
        }
        self.lines.recv().await.unwrap_or(ReadOutcome::Eof)
    }
}

fn build_editor() -> rustyline::Result<Editor<BgwHelper, DefaultHistory>> {
    let config = Config::builder()
        .auto_add_history(true)
        .history_ignore_dups(true)?
        .completion_type(CompletionType::List)
        .build();
    let mut editor = Editor::with_config(config)?;
    editor.set_helper(Some(BgwHelper {
        files: FilenameCompleter::new(),
    }));
    Ok(editor)
}

/// Read and execute commands until `exit` or end of input.
pub async fn run(app: &mut App) -> anyhow::Result<()> {
    let mut reader = LineReader::spawn();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    loop {
        match reader.read_line().await {
            ReadOutcome::Line(line) => {
                let Some(command) = Command::parse(&line) else {
                    continue;
                };
                match app.execute(command, &mut stdout, &mut stderr).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Exit) => break,
                    Err(e) => {
                        warn!(error = %e, "Command failed");
                        writeln!(stderr, "{e}")?;
                    }
                }
            }
            ReadOutcome::Interrupted => {}
            ReadOutcome::Eof => {
                writeln!(stdout, "exit")?;
                break;
            }
            ReadOutcome::Failed(reason) => anyhow::bail!("readline failed: {reason}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_command_prefixes() {
        assert_eq!(complete_command("l"), ["load", "list"]);
        assert_eq!(complete_command("br"), ["breakpoint"]);
        assert!(complete_command("z").is_empty());
        assert_eq!(complete_command("").len(), COMMAND_NAMES.len());
    }
}
