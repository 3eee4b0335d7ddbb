#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Drives the command layer end to end against `/bin/cat` and `/bin/sh`.

use std::path::PathBuf;

use tokio::sync::mpsc;

use buggywhip_cli::app::{App, Flow};
use buggywhip_cli::commands::{Command, CommandError};
use buggywhip_cli::output::spawn_printer;
use buggywhip_driver::{DriverConfig, DriverError, OutputSinks, SessionDriver};

struct Fixture {
    app: App,
    dir: tempfile::TempDir,
    stdout: tokio::io::DuplexStream,
    printer: tokio::task::JoinHandle<()>,
}

fn fixture(shell: &str) -> Fixture {
    let dir = tempfile::TempDir::new().unwrap();
    let (stdout_tx, stdout_rx) = mpsc::channel(64);
    let (writer, stdout) = tokio::io::duplex(64 * 1024);
    let printer = spawn_printer("stdout", stdout_rx, writer);

    let config = DriverConfig {
        shell: PathBuf::from(shell),
        pipe_dir: dir.path().to_path_buf(),
        ..DriverConfig::default()
    };
    let sinks = OutputSinks {
        stdout: Some(stdout_tx),
        stderr: None,
    };
    Fixture {
        app: App::new(SessionDriver::new(config, sinks), 10),
        dir,
        stdout,
        printer,
    }
}

impl Fixture {
    async fn exec(&mut self, line: &str) -> Result<(Flow, String, String), CommandError> {
        let mut out = Vec::new();
        let mut diag = Vec::new();
        let command = Command::parse(line).unwrap();
        let flow = self.app.execute(command, &mut out, &mut diag).await?;
        Ok((
            flow,
            String::from_utf8(out).unwrap(),
            String::from_utf8(diag).unwrap(),
        ))
    }

    async fn shell_output(self) -> String {
        use tokio::io::AsyncReadExt;

        let Self {
            app,
            mut stdout,
            printer,
            dir: _dir,
        } = self;
        app.shutdown().await;
        drop(app);
        printer.await.unwrap();
        let mut out = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        out
    }
}

#[tokio::test]
async fn run_feeds_the_loaded_script() {
    let mut f = fixture("/bin/cat");
    let script = f.dir.path().join("bgw-testscript");
    std::fs::write(&script, "hello world\ngood morning\n").unwrap();

    f.app.open(Some(&script)).await.unwrap();
    let (flow, _, _) = f.exec("run").await.unwrap();
    assert_eq!(flow, Flow::Continue);

    assert_eq!(f.shell_output().await, "hello world\ngood morning\n");
}

#[tokio::test]
async fn do_sends_joined_words() {
    let mut f = fixture("/bin/cat");
    f.app.open(None).await.unwrap();

    f.exec("do").await.unwrap();
    f.exec("do hello   world").await.unwrap();
    f.exec("do good morning").await.unwrap();

    assert_eq!(f.shell_output().await, "hello world\ngood morning\n");
}

#[tokio::test]
async fn run_without_source_is_rejected() {
    let mut f = fixture("/bin/cat");
    f.app.open(None).await.unwrap();
    let err = f.exec("run").await.unwrap_err();
    assert_eq!(err.to_string(), "file not loaded");
}

#[tokio::test]
async fn load_restarts_the_shell_on_the_new_source() {
    let mut f = fixture("/bin/sh");
    f.app.open(None).await.unwrap();
    let before = f.app.driver().pid().await.unwrap();

    let script = f.dir.path().join("greet.sh");
    std::fs::write(&script, "echo one\necho two\n").unwrap();
    let (flow, _, _) = f.exec(&format!("load {}", script.display())).await.unwrap();
    assert_eq!(flow, Flow::Continue);
    assert_ne!(f.app.driver().pid().await.unwrap(), before);
    assert_eq!(f.app.navigator().path(), Some(script.as_path()));

    let (_, listing, _) = f.exec("list").await.unwrap();
    assert_eq!(listing, "1 echo one\n2 echo two\n");

    f.exec("run").await.unwrap();
    assert_eq!(f.shell_output().await, "one\ntwo\n");
}

#[tokio::test]
async fn load_reports_usage_and_missing_files() {
    let mut f = fixture("/bin/cat");
    f.app.open(None).await.unwrap();

    let err = f.exec("load").await.unwrap_err();
    assert!(matches!(err, CommandError::NoFile));

    let err = f.exec("load /nonexistent/script.sh").await.unwrap_err();
    assert!(matches!(err, CommandError::Driver(DriverError::NotFound(_))));
}

#[tokio::test]
async fn help_exit_and_unknown_commands() {
    let mut f = fixture("/bin/cat");
    f.app.open(None).await.unwrap();

    let (flow, out, diag) = f.exec("help").await.unwrap();
    assert_eq!(flow, Flow::Continue);
    assert!(out.is_empty());
    assert!(diag.starts_with("List of classes of commands:"));

    let err = f.exec("step").await.unwrap_err();
    assert_eq!(err.to_string(), "command not implemented: step");
    let err = f.exec("jump 3").await.unwrap_err();
    assert_eq!(err.to_string(), "unknown command: jump");

    let (flow, _, _) = f.exec("exit").await.unwrap();
    assert_eq!(flow, Flow::Exit);
}

#[tokio::test]
async fn open_with_missing_shell_fails() {
    let mut f = fixture("/nonexistent/buggywhip-shell");
    let err = f.app.open(None).await.unwrap_err();
    let CommandError::Driver(err) = err else {
        panic!("unexpected error: {err}");
    };
    assert!(err.is_spawn());
    assert_eq!(std::fs::read_dir(f.dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn failed_load_keeps_the_previous_source() {
    let mut f = fixture("/bin/cat");
    let script = f.dir.path().join("a.sh");
    std::fs::write(&script, "hello world\n").unwrap();
    let subdir = f.dir.path().join("subdir");
    std::fs::create_dir(&subdir).unwrap();

    f.app.open(Some(&script)).await.unwrap();
    let pid = f.app.driver().pid().await.unwrap();

    let err = f.exec(&format!("load {}", subdir.display())).await.unwrap_err();
    assert!(matches!(err, CommandError::Driver(DriverError::Source { .. })));
    assert_eq!(f.app.driver().source().await, Some(script.clone()));
    assert_eq!(f.app.navigator().path(), Some(script.as_path()));
    assert_eq!(f.app.driver().pid().await, Some(pid));

    let (_, listing, _) = f.exec("list").await.unwrap();
    assert_eq!(listing, "1 hello world\n");
    f.exec("run").await.unwrap();
    assert_eq!(f.shell_output().await, "hello world\n");
}
