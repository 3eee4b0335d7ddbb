//! buggywhip CLI
//!
//! Debugger-style front end for shell scripts: load a script, list it, run
//! it or feed it line by line, and watch the shell's output.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use buggywhip_cli::app::App;
use buggywhip_cli::{output, repl};
use buggywhip_core::config::load_config;
use buggywhip_core::tracing_init::{default_filter, init_tracing};
use buggywhip_driver::{DriverConfig, SessionDriver};

#[derive(Parser, Debug)]
#[command(name = "bgw")]
#[command(version, about = "buggywhip - a debugger for shell scripts", long_about = None)]
struct Cli {
    /// Script to load at startup
    source: Option<PathBuf>,

    /// Shell that runs the script (started as `<shell> <script-pipe>`)
    #[arg(long, env = "BUGGYWHIP_SHELL")]
    shell: Option<PathBuf>,

    /// Lines printed per `list`
    #[arg(long, env = "BUGGYWHIP_LIST_COUNT")]
    list_count: Option<usize>,

    /// Kill the shell if it is still busy this many seconds after its
    /// script ends on reload or exit
    #[arg(long, env = "BUGGYWHIP_TERMINATE_TIMEOUT")]
    terminate_timeout: Option<u64>,

    /// Log level filter (e.g. "info", "debug", "warn")
    #[arg(long, env = "BUGGYWHIP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long, env = "BUGGYWHIP_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().ok();
    let mut config = load_config(cwd.as_deref())?;
    if let Some(shell) = cli.shell {
        config.shell.executable = shell;
    }
    if let Some(count) = cli.list_count {
        config.list.count = count;
    }
    if cli.terminate_timeout.is_some() {
        config.shell.terminate_timeout_secs = cli.terminate_timeout;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_tracing(&default_filter(&config.log_level), cli.log_json);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        shell = %config.shell.executable.display(),
        source = ?cli.source,
        "Starting bgw"
    );

    let (sinks, printers) = output::spawn_printers(config.shell.output_buffer_chunks);
    let driver = SessionDriver::new(DriverConfig::from(&config.shell), sinks);
    let mut app = App::new(driver, config.list.count);

    if let Err(e) = app.open(cli.source.as_deref()).await {
        writeln!(std::io::stderr(), "{e}")?;
        app.shutdown().await;
        std::process::exit(1);
    }

    let result = repl::run(&mut app).await;

    app.shutdown().await;
    drop(app);
    printers.join().await;

    result
}
