//! Error types for the `pzwrap` core library.

use thiserror::Error;

/// Result type alias using the core `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for wrapper setup.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The server binary to launch could not be resolved
    #[error("Platform detection failed: {0}")]
    Platform(String),
}
