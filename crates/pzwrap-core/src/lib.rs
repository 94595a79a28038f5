//! `pzwrap` Core Library
//!
//! Shared functionality for the server wrapper:
//! - Control-command vocabulary and input classification
//! - Configuration resolution and hierarchy
//! - Java/platform detection and launch plans
//! - Common error types

pub mod config;
pub mod control;
pub mod error;
pub mod platform;
pub mod tracing_init;

pub use config::Config;
pub use control::{Classification, Interception, classify};
pub use error::{Error, Result};
pub use platform::{JavaArch, LaunchPlan};
