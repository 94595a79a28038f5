//! Errors surfaced by the supervisor.

use std::io;

/// Errors that end a supervised run.
///
/// Relay I/O failures never appear here: a relay that cannot read or write
/// simply stops, and the supervisor keeps waiting for the server to exit.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Server {0} was not captured")]
    MissingStream(&'static str),

    #[error("Relay task failed: {0}")]
    RelayJoin(#[from] tokio::task::JoinError),
}
