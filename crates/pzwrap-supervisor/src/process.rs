//! Server process spawning.

use std::io;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::info;

use pzwrap_core::LaunchPlan;

use crate::error::SupervisorError;

/// Starts a fresh server process for each launch cycle.
pub trait Launcher: Send + Sync {
    fn launch(&self) -> Result<ServerProcess, SupervisorError>;
}

/// Launches the server described by a [`LaunchPlan`].
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    plan: LaunchPlan,
}

impl ProcessLauncher {
    pub const fn new(plan: LaunchPlan) -> Self {
        Self { plan }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self) -> Result<ServerProcess, SupervisorError> {
        let mut cmd = Command::new(&self.plan.program);
        cmd.args(&self.plan.args)
            .envs(self.plan.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.plan.working_dir {
            cmd.current_dir(dir);
        }

        info!(command = %self.plan, "Spawning server");
        let child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            program: self.plan.program.display().to_string(),
            source,
        })?;
        Ok(ServerProcess::new(child))
    }
}

/// The pipes of a running server, split off for the relays.
#[derive(Debug)]
pub struct ServerStreams {
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: Option<ChildStderr>,
}

/// Handle to one launched server.
#[derive(Debug)]
pub struct ServerProcess {
    child: Child,
}

impl ServerProcess {
    pub const fn new(child: Child) -> Self {
        Self { child }
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take the server's pipes. Can only succeed once per process.
    pub fn take_streams(&mut self) -> Result<ServerStreams, SupervisorError> {
        let stdin = self
            .child
            .stdin
            .take()
            .ok_or(SupervisorError::MissingStream("stdin"))?;
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or(SupervisorError::MissingStream("stdout"))?;
        Ok(ServerStreams {
            stdin,
            stdout,
            stderr: self.child.stderr.take(),
        })
    }

    /// Wait for the server to exit. No timeout.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Send SIGKILL without waiting. Used only when the server can no longer
    /// be waited on.
    pub fn start_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }
}
