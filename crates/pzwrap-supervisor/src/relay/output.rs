//! Server -> terminal output relay.

use std::sync::Arc;

use tokio::io::{AsyncRead, BufReader};
use tracing::debug;

use crate::coordination::Coordination;
use crate::terminal::Terminal;

use super::read_lossy_line;

/// Why the output relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRelayExit {
    /// The server closed its stdout.
    EndOfStream,
    /// A termination request was observed.
    Killed,
    ReadFailed,
    TerminalFailed,
}

/// Print each server stdout line, trailing whitespace trimmed, until the
/// stream ends or a termination request is observed.
pub async fn run_output_relay(
    stream: impl AsyncRead + Unpin,
    terminal: Arc<Terminal>,
    coordination: Arc<Coordination>,
) -> OutputRelayExit {
    let _guard = coordination.enter_relay();
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::with_capacity(1024);

    let exit = loop {
        let line = match read_lossy_line(&mut reader, &mut buf).await {
            Ok(Some(line)) => line,
            Ok(None) => break OutputRelayExit::EndOfStream,
            Err(e) => {
                debug!(error = %e, "server stdout read failed");
                break OutputRelayExit::ReadFailed;
            }
        };
        if coordination.is_killed() {
            break OutputRelayExit::Killed;
        }
        if let Err(e) = terminal.print_line(line.trim_end()).await {
            debug!(error = %e, "terminal write failed");
            break OutputRelayExit::TerminalFailed;
        }
    };
    debug!(?exit, "output relay finished");
    exit
}
