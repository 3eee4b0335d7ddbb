//! Output relays from the shell's stdout/stderr to caller sinks.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Destination for one of the shell's output streams.
///
/// Chunks arrive exactly as read from the shell, with no line buffering.
pub type OutputSink = mpsc::Sender<Vec<u8>>;

/// Read size per chunk.
const RELAY_READ_BUFFER: usize = 8192;

/// Spawn a task copying `source` into `sink` until end of stream.
///
/// The task stops early, without retrying, when a read fails or the sink's
/// receiver is gone. The join handle yields the number of bytes relayed.
pub fn start<R>(stream: &'static str, source: R, sink: OutputSink) -> JoinHandle<usize>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut source = source;
        let mut buf = vec![0u8; RELAY_READ_BUFFER];
        let mut relayed = 0usize;

        loop {
            match source.read(&mut buf).await {
                Ok(0) => {
                    debug!(stream, relayed, "Relay reached end of stream");
                    break;
                }
                Ok(n) => {
                    if sink.send(buf[..n].to_vec()).await.is_err() {
                        warn!(stream, relayed, "Output sink closed, dropping remaining output");
                        break;
                    }
                    relayed += n;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(stream, relayed, error = %e, "Relay read failed");
                    break;
                }
            }
        }

        relayed
    })
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn copies_every_byte_until_eof() {
        let (mut writer, reader) = tokio::io::duplex(16);
        let (tx, mut rx) = mpsc::channel(1024);
        let relay = start("stdout", reader, tx);

        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        writer.write_all(&payload).await.unwrap();
        drop(writer);

        assert_eq!(relay.await.unwrap(), payload.len());
        let mut received = Vec::new();
        while let Some(chunk) = rx.recv().await {
            received.extend(chunk);
        }
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn stops_when_sink_is_dropped() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let relay = start("stderr", reader, tx);

        writer.write_all(b"lost\n").await.unwrap();
        assert_eq!(relay.await.unwrap(), 0);
    }
}
