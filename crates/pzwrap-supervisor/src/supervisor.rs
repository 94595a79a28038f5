//! The launch/relaunch loop.
//!
//! ```text
//! IDLE -> LAUNCHING -> RUNNING -> EXITED -> (RELAUNCH | DONE)
//! ```
//!
//! Each cycle launches the server, runs both relays next to it, waits for the
//! server to exit and then joins both relays before deciding what comes next.
//! A new server is never spawned while a relay from the previous one is alive.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::coordination::Coordination;
use crate::error::SupervisorError;
use crate::input::ChildInput;
use crate::process::Launcher;
use crate::relay::{run_input_relay, run_output_relay, spawn_stderr_drain};
use crate::terminal::Terminal;

/// Printed to the terminal when the wrapper stops for good.
pub const CLEAN_EXIT_NOTICE: &str = "Exited cleanly.";

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of servers launched.
    pub launches: usize,
    /// Whether the run ended because of a termination request.
    pub killed: bool,
}

/// Supervises one server at a time for the lifetime of the wrapper.
pub struct Supervisor<L> {
    launcher: L,
    coordination: Arc<Coordination>,
    input: Arc<ChildInput>,
    terminal: Arc<Terminal>,
}

impl<L: Launcher> Supervisor<L> {
    pub const fn new(
        launcher: L,
        coordination: Arc<Coordination>,
        input: Arc<ChildInput>,
        terminal: Arc<Terminal>,
    ) -> Self {
        Self {
            launcher,
            coordination,
            input,
            terminal,
        }
    }

    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run launch cycles until no restart is pending.
    ///
    /// `lines` is the terminal input stream; it is lent to each cycle's input
    /// relay in turn. Only launch failures and relay panics are returned as
    /// errors.
    pub async fn run(&self, mut lines: mpsc::Receiver<String>) -> Result<RunSummary, SupervisorError> {
        let mut launches = 0;
        loop {
            if self.coordination.is_killed() {
                info!("Termination requested, not relaunching");
                break;
            }
            if !self.coordination.take_restart_request() {
                break;
            }
            launches += 1;
            lines = self.run_cycle(launches, lines).await?;
        }

        if let Err(e) = self.terminal.print_line(CLEAN_EXIT_NOTICE).await {
            debug!(error = %e, "failed to print exit notice");
        }
        Ok(RunSummary {
            launches,
            killed: self.coordination.is_killed(),
        })
    }

    async fn run_cycle(
        &self,
        cycle: usize,
        lines: mpsc::Receiver<String>,
    ) -> Result<mpsc::Receiver<String>, SupervisorError> {
        let mut process = self.launcher.launch()?;
        let streams = process.take_streams()?;
        info!(cycle, pid = ?process.pid(), "Server launched");
        if cycle == 1 {
            notify_ready();
        }

        self.input.attach(streams.stdin).await;
        // A request that arrived while launching found no stdin to write to.
        if self.coordination.is_killed() {
            match self.input.inject_shutdown().await {
                Ok(_) => info!(cycle, "Termination requested during launch, asked server to quit"),
                Err(e) => warn!(cycle, error = %e, "Failed to send quit to server"),
            }
        }
        let (exited_tx, exited_rx) = watch::channel(false);

        let input_relay = tokio::spawn(run_input_relay(
            lines,
            Arc::clone(&self.input),
            Arc::clone(&self.coordination),
            exited_rx,
        ));
        let output_relay = tokio::spawn(run_output_relay(
            streams.stdout,
            Arc::clone(&self.terminal),
            Arc::clone(&self.coordination),
        ));
        if let Some(stderr) = streams.stderr {
            spawn_stderr_drain(stderr, cycle);
        }

        match process.wait().await {
            Ok(status) => info!(cycle, %status, "Server exited"),
            Err(e) => {
                warn!(cycle, error = %e, "Failed to wait for server, killing it");
                // Closes the server's pipes so both relays can finish.
                if let Err(e) = process.start_kill() {
                    warn!(cycle, error = %e, "Failed to kill server");
                }
            }
        }
        let _ = exited_tx.send(true);

        let (input_result, output_result) = tokio::join!(input_relay, output_relay);
        self.input.detach().await;

        let output_exit = output_result?;
        let (lines, input_exit) = input_result?;
        debug!(cycle, ?input_exit, ?output_exit, "Relays joined");

        Ok(lines)
    }
}

/// Tell a service manager the server is up. No-op outside systemd.
#[cfg(unix)]
fn notify_ready() {
    // `true` unsets $NOTIFY_SOCKET so later servers don't inherit it.
    if let Err(e) = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]) {
        debug!(error = %e, "sd_notify failed");
    }
}

#[cfg(not(unix))]
const fn notify_ready() {}
