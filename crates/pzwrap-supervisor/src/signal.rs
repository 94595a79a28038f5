//! Termination signal handling.
//!
//! SIGINT and SIGTERM are received through `tokio::signal` on an ordinary
//! task, so the handler may await the stdin lock like any other writer.

use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordination::Coordination;
use crate::input::ChildInput;

const SIGNAL_BUFFER: usize = 4;

/// React to one termination request: stop the relays and ask the server to
/// quit directly, without going through the input relay.
///
/// Idempotent; a repeated request re-sends `quit`, which the server ignores
/// once it is already shutting down.
pub async fn handle_termination_request(coordination: &Coordination, input: &ChildInput) {
    let first = coordination.kill();
    match input.inject_shutdown().await {
        Ok(true) => info!(first, "Termination requested, asked server to quit"),
        Ok(false) => debug!(first, "Termination requested with no server running"),
        Err(e) => warn!(first, error = %e, "Failed to send quit to server"),
    }
}

/// Which termination signal arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

/// Handle every request received on `requests` until all listeners are gone.
pub async fn serve_termination_requests(
    mut requests: mpsc::Receiver<TerminationSignal>,
    coordination: Arc<Coordination>,
    input: Arc<ChildInput>,
) {
    while let Some(signal) = requests.recv().await {
        info!(?signal, "Received shutdown signal");
        handle_termination_request(&coordination, &input).await;
    }
    debug!("signal listeners stopped");
}

/// Listen for Ctrl+C (and SIGTERM on Unix) for the rest of the run.
///
/// Each signal has its own listener, so losing one never stops the other.
pub fn spawn_signal_handler(
    coordination: Arc<Coordination>,
    input: Arc<ChildInput>,
) -> io::Result<JoinHandle<()>> {
    let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while sigterm.recv().await.is_some() {
                if tx.send(TerminationSignal::Terminate).await.is_err() {
                    break;
                }
            }
        });
    }

    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            if tx.send(TerminationSignal::Interrupt).await.is_err() {
                return;
            }
        }
    });

    Ok(tokio::spawn(serve_termination_requests(rx, coordination, input)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, duplex};

    #[tokio::test]
    async fn termination_sets_killed_and_injects_quit() {
        let (writer, mut server_stdin) = duplex(1024);
        let coordination = Coordination::new();
        let input = ChildInput::new();
        input.attach(writer).await;

        handle_termination_request(&coordination, &input).await;
        assert!(coordination.is_killed());

        input.detach().await;
        let mut out = String::new();
        server_stdin.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "quit\n");
    }

    #[tokio::test]
    async fn repeated_termination_is_idempotent() {
        let (writer, mut server_stdin) = duplex(1024);
        let coordination = Coordination::new();
        let input = ChildInput::new();
        input.attach(writer).await;

        for _ in 0..3 {
            handle_termination_request(&coordination, &input).await;
        }
        assert!(coordination.is_killed());
        assert!(coordination.is_restart_requested());

        input.detach().await;
        let mut out = String::new();
        server_stdin.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "quit\nquit\nquit\n");
    }

    #[tokio::test]
    async fn termination_between_cycles_only_sets_flag() {
        let coordination = Coordination::new();
        let input = ChildInput::new();

        handle_termination_request(&coordination, &input).await;
        assert!(coordination.is_killed());
    }

    #[tokio::test]
    async fn terminate_still_served_after_interrupt_listener_is_gone() {
        let (writer, mut server_stdin) = duplex(1024);
        let coordination = Arc::new(Coordination::new());
        let input = Arc::new(ChildInput::new());
        input.attach(writer).await;

        let (terminate_tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        let interrupt_tx = terminate_tx.clone();
        let served = tokio::spawn(serve_termination_requests(
            rx,
            Arc::clone(&coordination),
            Arc::clone(&input),
        ));

        // The Ctrl+C listener gave up.
        drop(interrupt_tx);
        terminate_tx.send(TerminationSignal::Terminate).await.unwrap();
        drop(terminate_tx);
        served.await.unwrap();

        assert!(coordination.is_killed());
        input.detach().await;
        let mut out = String::new();
        server_stdin.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "quit\n");
    }
}
