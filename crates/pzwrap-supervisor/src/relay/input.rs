//! Terminal -> server input relay.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use pzwrap_core::control::{Classification, Interception, classify};

use crate::coordination::Coordination;
use crate::input::{ChildInput, WriteOutcome};

/// Why the input relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRelayExit {
    /// A `restart` or `quit` command was forwarded.
    Command(Classification),
    /// A termination request was observed.
    Killed,
    /// The terminal reached end of input.
    TerminalClosed,
    /// The server exited while the relay was waiting for input.
    ServerExited,
    /// Writing to the server failed.
    WriteFailed,
}

/// Classify one terminal line and apply its effect on the shared flags.
pub fn intercept(line: &str, coordination: &Coordination) -> Interception {
    let interception = classify(line, coordination.is_killed());
    if interception.classification == Classification::Restart {
        coordination.request_restart();
        info!("Restart requested, asking server to quit");
    }
    interception
}

/// Relay terminal lines to the server for one launch cycle.
///
/// The line receiver is handed back so the next cycle continues from the
/// same terminal stream without losing buffered lines.
pub async fn run_input_relay(
    mut lines: mpsc::Receiver<String>,
    input: Arc<ChildInput>,
    coordination: Arc<Coordination>,
    mut server_exited: watch::Receiver<bool>,
) -> (mpsc::Receiver<String>, InputRelayExit) {
    let _guard = coordination.enter_relay();
    let exit = relay_lines(&mut lines, &input, &coordination, &mut server_exited).await;
    debug!(?exit, "input relay finished");
    (lines, exit)
}

async fn relay_lines(
    lines: &mut mpsc::Receiver<String>,
    input: &ChildInput,
    coordination: &Coordination,
    server_exited: &mut watch::Receiver<bool>,
) -> InputRelayExit {
    loop {
        let line = tokio::select! {
            biased;
            () = wait_for_exit(server_exited) => return InputRelayExit::ServerExited,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            return InputRelayExit::TerminalClosed;
        };

        let Interception {
            classification,
            payload,
        } = intercept(&line, coordination);
        let Some(payload) = payload else {
            return InputRelayExit::Killed;
        };

        match input.write_line(&payload, coordination).await {
            Ok(WriteOutcome::Written) => {}
            Ok(WriteOutcome::Suppressed) => return InputRelayExit::Killed,
            Err(e) => {
                debug!(error = %e, "failed to write to server stdin");
                return InputRelayExit::WriteFailed;
            }
        }

        if classification.ends_relay() {
            return InputRelayExit::Command(classification);
        }
    }
}

/// Resolves once the server has exited or the cycle's sender is gone.
async fn wait_for_exit(server_exited: &mut watch::Receiver<bool>) {
    let _ = server_exited.wait_for(|exited| *exited).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, DuplexStream, duplex};

    struct Harness {
        lines_tx: mpsc::Sender<String>,
        lines_rx: mpsc::Receiver<String>,
        input: Arc<ChildInput>,
        coordination: Arc<Coordination>,
        exited_tx: watch::Sender<bool>,
        exited_rx: watch::Receiver<bool>,
        server_stdin: DuplexStream,
    }

    async fn harness() -> Harness {
        let (lines_tx, lines_rx) = mpsc::channel(16);
        let (writer, server_stdin) = duplex(4096);
        let input = Arc::new(ChildInput::new());
        input.attach(writer).await;
        let coordination = Arc::new(Coordination::new());
        coordination.take_restart_request();
        let (exited_tx, exited_rx) = watch::channel(false);
        Harness {
            lines_tx,
            lines_rx,
            input,
            coordination,
            exited_tx,
            exited_rx,
            server_stdin,
        }
    }

    async fn received(input: &ChildInput, mut server_stdin: DuplexStream) -> String {
        input.detach().await;
        let mut out = String::new();
        server_stdin.read_to_string(&mut out).await.unwrap();
        out
    }

    #[test]
    fn intercept_restart_sets_flag() {
        let coordination = Coordination::new();
        coordination.take_restart_request();

        let interception = intercept(" ReStart  ", &coordination);
        assert_eq!(interception.classification, Classification::Restart);
        assert_eq!(interception.payload.as_deref(), Some("quit\n"));
        assert!(coordination.is_restart_requested());
        assert!(!coordination.is_killed());
    }

    #[test]
    fn intercept_quit_leaves_restart_flag_alone() {
        let coordination = Coordination::new();
        coordination.take_restart_request();

        let interception = intercept("QUIT", &coordination);
        assert_eq!(interception.classification, Classification::Quit);
        assert_eq!(interception.payload.as_deref(), Some("QUIT\n"));
        assert!(!coordination.is_restart_requested());
    }

    #[test]
    fn intercept_after_kill_does_not_request_restart() {
        let coordination = Coordination::new();
        coordination.take_restart_request();
        coordination.kill();

        let interception = intercept("restart", &coordination);
        assert_eq!(interception.classification, Classification::Suppressed);
        assert!(!coordination.is_restart_requested());
    }

    #[tokio::test]
    async fn passthrough_lines_then_quit() {
        let h = harness().await;
        for line in ["players", "  save  ", "quit"] {
            h.lines_tx.send(line.to_string()).await.unwrap();
        }

        let (_lines, exit) =
            run_input_relay(h.lines_rx, Arc::clone(&h.input), Arc::clone(&h.coordination), h.exited_rx)
                .await;

        assert_eq!(exit, InputRelayExit::Command(Classification::Quit));
        assert_eq!(received(&h.input, h.server_stdin).await, "players\n  save  \nquit\n");
        assert!(!h.coordination.is_restart_requested());
        assert_eq!(h.coordination.live_relays(), 0);
    }

    #[tokio::test]
    async fn restart_forwards_quit_and_hands_back_remaining_lines() {
        let h = harness().await;
        for line in ["Restart", "after-restart"] {
            h.lines_tx.send(line.to_string()).await.unwrap();
        }

        let (mut lines, exit) =
            run_input_relay(h.lines_rx, Arc::clone(&h.input), Arc::clone(&h.coordination), h.exited_rx)
                .await;

        assert_eq!(exit, InputRelayExit::Command(Classification::Restart));
        assert!(h.coordination.is_restart_requested());
        assert_eq!(lines.recv().await.as_deref(), Some("after-restart"));
        assert_eq!(received(&h.input, h.server_stdin).await, "quit\n");
    }

    #[tokio::test]
    async fn killed_suppresses_all_further_input() {
        let h = harness().await;
        h.coordination.kill();
        h.lines_tx.send("restart".to_string()).await.unwrap();
        h.lines_tx.send("players".to_string()).await.unwrap();

        let (_lines, exit) =
            run_input_relay(h.lines_rx, Arc::clone(&h.input), Arc::clone(&h.coordination), h.exited_rx)
                .await;

        assert_eq!(exit, InputRelayExit::Killed);
        assert!(!h.coordination.is_restart_requested());
        assert_eq!(received(&h.input, h.server_stdin).await, "");
    }

    #[tokio::test]
    async fn terminal_end_of_input_stops_relay() {
        let h = harness().await;
        h.lines_tx.send("players".to_string()).await.unwrap();
        drop(h.lines_tx);

        let (_lines, exit) =
            run_input_relay(h.lines_rx, Arc::clone(&h.input), Arc::clone(&h.coordination), h.exited_rx)
                .await;

        assert_eq!(exit, InputRelayExit::TerminalClosed);
        assert_eq!(received(&h.input, h.server_stdin).await, "players\n");
    }

    #[tokio::test]
    async fn server_exit_wakes_idle_relay() {
        let h = harness().await;
        let relay = tokio::spawn(run_input_relay(
            h.lines_rx,
            Arc::clone(&h.input),
            Arc::clone(&h.coordination),
            h.exited_rx,
        ));

        h.exited_tx.send(true).unwrap();
        let (_lines, exit) = relay.await.unwrap();

        assert_eq!(exit, InputRelayExit::ServerExited);
        // The terminal stream is still usable by the next cycle.
        assert!(!h.lines_tx.is_closed());
    }

    #[tokio::test]
    async fn write_failure_stops_relay() {
        let h = harness().await;
        h.input.detach().await;
        h.lines_tx.send("players".to_string()).await.unwrap();

        let (_lines, exit) =
            run_input_relay(h.lines_rx, Arc::clone(&h.input), Arc::clone(&h.coordination), h.exited_rx)
                .await;

        assert_eq!(exit, InputRelayExit::WriteFailed);
    }
}
