//! Single-writer input feeder.
//!
//! One task owns both the receiving end of the feed queue and the write end
//! of the script pipe. Nothing else writes to the pipe, so lines submitted
//! from different callers are never interleaved.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Sending half of a session's feed queue.
pub type FeedQueue = mpsc::Sender<String>;

/// Spawn the feeder task draining a fresh queue of `capacity` lines into
/// `writer`.
///
/// Lines are written as given; callers supply the terminators. The task
/// ends when every sender is dropped and the queue is drained, or on the
/// first write failure. Either way `writer` is dropped on exit, which closes
/// the pipe. The join handle yields the number of lines written.
pub fn start<W>(writer: W, capacity: usize) -> (FeedQueue, JoinHandle<usize>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));

    let handle = tokio::spawn(async move {
        let mut writer = writer;
        let mut written = 0usize;

        while let Some(line) = rx.recv().await {
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                warn!(written, error = %e, "Failed to write to script pipe");
                return written;
            }
            if let Err(e) = writer.flush().await {
                warn!(written, error = %e, "Failed to flush script pipe");
                return written;
            }
            written += 1;
        }

        debug!(written, "Feed queue closed");
        written
    });

    (tx, handle)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn delivers_lines_in_order_then_closes() {
        let (writer, mut reader) = tokio::io::duplex(64 * 1024);
        let (queue, feeder) = start(writer, 8);

        let producers: Vec<_> = (0..4)
            .map(|i| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    for j in 0..25 {
                        queue.send(format!("echo {i}-{j}\n")).await.unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        drop(queue);

        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(feeder.await.unwrap(), 100);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 100);
        for i in 0..4 {
            let own: Vec<String> = lines
                .iter()
                .filter(|l| l.starts_with(&format!("echo {i}-")))
                .map(ToString::to_string)
                .collect();
            let expected: Vec<String> = (0..25).map(|j| format!("echo {i}-{j}")).collect();
            assert_eq!(own, expected);
        }
    }

    #[tokio::test]
    async fn stops_on_broken_writer() {
        let (writer, reader) = tokio::io::duplex(64);
        drop(reader);
        let (queue, feeder) = start(writer, 8);

        queue.send("echo lost\n".to_string()).await.unwrap();
        assert_eq!(feeder.await.unwrap(), 0);
        assert!(queue.send("echo late\n".to_string()).await.is_err());
    }
}
