//! pzwrap Supervisor Library
//!
//! Runs one server process at a time and sits between it and the terminal:
//! - Shared coordination flags (restart requested, killed)
//! - Guarded access to the server's stdin
//! - Input and output relays between terminal and server
//! - Termination signal handling
//! - The launch/relaunch loop

pub mod coordination;
pub mod error;
pub mod input;
pub mod process;
pub mod relay;
pub mod signal;
pub mod supervisor;
pub mod terminal;

pub use coordination::Coordination;
pub use error::SupervisorError;
pub use input::ChildInput;
pub use process::{Launcher, ProcessLauncher, ServerProcess};
pub use supervisor::{RunSummary, Supervisor};
pub use terminal::Terminal;
