//! Drains the server's stderr into the log.

use tokio::io::{AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::read_lossy_line;

/// Log every stderr line of the server from `cycle` until the pipe closes.
///
/// Not part of the join barrier: stderr is diagnostic only.
pub fn spawn_stderr_drain(
    stream: impl AsyncRead + Unpin + Send + 'static,
    cycle: usize,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::with_capacity(1024);
        let mut count = 0;

        loop {
            match read_lossy_line(&mut reader, &mut buf).await {
                Ok(Some(line)) => {
                    count += 1;
                    warn!(cycle, "stderr: {}", line);
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(cycle, error = %e, "stderr reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(cycle, lines = count, "stderr reader finished");
        count
    })
}
