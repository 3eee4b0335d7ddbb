//! Printers for relayed shell output.
//!
//! The driver's relays push raw chunks into bounded channels; one printer
//! task per stream writes them to the terminal as they arrive.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use buggywhip_driver::OutputSinks;

/// Running printer tasks. They end once every sink sender is dropped.
pub struct Printers {
    stdout: JoinHandle<()>,
    stderr: JoinHandle<()>,
}

impl Printers {
    /// Wait for both printers to flush their remaining output.
    pub async fn join(self) {
        for (stream, printer) in [("stdout", self.stdout), ("stderr", self.stderr)] {
            if let Err(e) = printer.await {
                warn!(stream, error = %e, "Printer task failed");
            }
        }
    }
}

/// Create sinks wired to this process's stdout and stderr.
pub fn spawn_printers(capacity: usize) -> (OutputSinks, Printers) {
    let (stdout_tx, stdout_rx) = mpsc::channel(capacity.max(1));
    let (stderr_tx, stderr_rx) = mpsc::channel(capacity.max(1));

    let printers = Printers {
        stdout: spawn_printer("stdout", stdout_rx, tokio::io::stdout()),
        stderr: spawn_printer("stderr", stderr_rx, tokio::io::stderr()),
    };
    let sinks = OutputSinks {
        stdout: Some(stdout_tx),
        stderr: Some(stderr_tx),
    };
    (sinks, printers)
}

/// Spawn a task writing every chunk from `rx` to `writer`.
pub fn spawn_printer<W>(
    stream: &'static str,
    mut rx: mpsc::Receiver<Vec<u8>>,
    mut writer: W,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(chunk) = rx.recv().await {
            if let Err(e) = writer.write_all(&chunk).await {
                warn!(stream, error = %e, "Failed to print shell output");
                return;
            }
            if let Err(e) = writer.flush().await {
                warn!(stream, error = %e, "Failed to flush shell output");
                return;
            }
        }
    })
}
