//! The controlling terminal: line input and line output.

use std::io::{self, BufRead};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::relay::decode_line;

/// Lines buffered between the terminal reader thread and the input relay.
pub const LINE_BUFFER: usize = 64;

/// Read terminal lines on a dedicated OS thread for the rest of the run.
///
/// A blocking thread is used instead of `tokio::io::stdin` so that a pending
/// read never holds up runtime shutdown. The channel closes at end of input.
/// Bytes that are not valid UTF-8 are replaced rather than ending input.
pub fn spawn_line_reader<R>(mut reader: R) -> io::Result<mpsc::Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::Builder::new()
        .name("terminal-input".into())
        .spawn(move || {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.blocking_send(decode_line(&mut buf)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "terminal read failed");
                        break;
                    }
                }
            }
            debug!("terminal input closed");
        })?;
    Ok(rx)
}

/// Line-oriented terminal output shared by the output relay and the supervisor.
pub struct Terminal {
    out: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl Terminal {
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }

    /// Print `line` followed by a newline and flush.
    pub async fn print_line(&self, line: &str) -> io::Result<()> {
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await
    }
}
