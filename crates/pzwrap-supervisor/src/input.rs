//! Serialized access to the server's stdin.
//!
//! Two paths write to the server: the input relay and the signal handler.
//! Both go through [`ChildInput`], whose lock guarantees that one line is
//! written and flushed completely before the next one starts.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use pzwrap_core::control::QUIT_COMMAND;

use crate::coordination::Coordination;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Result of a relay write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// A termination request was observed; nothing was written.
    Suppressed,
}

/// The current server's stdin, if one is running.
///
/// Lives for the whole run; the supervisor attaches each new server's stdin
/// at launch and detaches it after the cycle ends.
#[derive(Default)]
pub struct ChildInput {
    stream: Mutex<Option<BoxedWriter>>,
}

impl ChildInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the stdin of a freshly launched server.
    pub async fn attach(&self, writer: impl AsyncWrite + Send + Unpin + 'static) {
        *self.stream.lock().await = Some(Box::new(writer));
    }

    /// Drop the current stdin, closing it. Returns whether one was attached.
    pub async fn detach(&self) -> bool {
        self.stream.lock().await.take().is_some()
    }

    pub async fn is_attached(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// Write one relayed line unless a termination request has been seen.
    ///
    /// `killed` is checked while holding the lock, so a relay write can never
    /// start after the signal handler has injected its shutdown command.
    pub async fn write_line(
        &self,
        payload: &str,
        coordination: &Coordination,
    ) -> io::Result<WriteOutcome> {
        let mut guard = self.stream.lock().await;
        if coordination.is_killed() {
            return Ok(WriteOutcome::Suppressed);
        }
        let stream = guard
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "server stdin is closed"))?;
        stream.write_all(payload.as_bytes()).await?;
        stream.flush().await?;
        Ok(WriteOutcome::Written)
    }

    /// Ask the running server to quit, bypassing the input relay.
    ///
    /// Safe to call from any task at any time, repeatedly. Returns `false`
    /// when no server is attached.
    pub async fn inject_shutdown(&self) -> io::Result<bool> {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            debug!("no server stdin attached, shutdown not injected");
            return Ok(false);
        };
        stream
            .write_all(format!("{QUIT_COMMAND}\n").as_bytes())
            .await?;
        stream.flush().await?;
        Ok(true)
    }
}
