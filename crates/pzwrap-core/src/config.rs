//! Configuration resolution for the wrapper.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Settings file (`<install_dir>/pzwrap.json`)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// File name of the optional settings file inside the install directory.
pub const SETTINGS_FILE: &str = "pzwrap.json";

/// Complete wrapper configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the server is located and started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// JVM used to decide between the 64-bit and 32-bit server builds.
    pub java_bin: PathBuf,
    /// Launch this program instead of the detected server build.
    pub executable: Option<PathBuf>,
    /// Arguments passed to the server on every launch.
    pub args: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            java_bin: PathBuf::from("java"),
            executable: None,
            args: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Load configuration for a server installed in `install_dir`.
pub fn load_config(install_dir: &Path) -> Result<Config> {
    load_config_with_env(install_dir, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with_env(
    install_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let settings_path = install_dir.join(SETTINGS_FILE);
    let mut config = if settings_path.exists() {
        load_config_file(&settings_path)?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, env);
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
    if let Some(val) = env("PZWRAP_JAVA_BIN") {
        config.server.java_bin = PathBuf::from(val);
    }
    if let Some(val) = env("PZWRAP_EXECUTABLE") {
        config.server.executable = Some(PathBuf::from(val));
    }
    if let Some(val) = env("PZWRAP_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = env("PZWRAP_LOG_JSON") {
        if let Ok(json) = val.parse() {
            config.logging.json = json;
        }
    }
}
