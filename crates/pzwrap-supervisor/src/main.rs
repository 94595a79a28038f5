//! pzwrap
//!
//! Console wrapper for the Project Zomboid dedicated server: relays the
//! server console to the terminal, adds a `restart` command and turns
//! SIGINT/SIGTERM into a clean `quit`.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use pzwrap_core::config::{Config, load_config};
use pzwrap_core::platform::{LaunchPlan, detect_java_arch};
use pzwrap_core::tracing_init::{default_filter, init_tracing};
use pzwrap_supervisor::signal::spawn_signal_handler;
use pzwrap_supervisor::terminal::spawn_line_reader;
use pzwrap_supervisor::{ChildInput, Coordination, ProcessLauncher, Supervisor, Terminal};

#[derive(Parser, Debug)]
#[command(name = "pzwrap")]
#[command(version, about = "Project Zomboid dedicated server console wrapper")]
struct Args {
    /// Server installation directory. Defaults to the directory of this executable.
    #[arg(long, env = "PZWRAP_INSTALL_DIR")]
    install_dir: Option<PathBuf>,

    /// Java binary used to pick the 64-bit or 32-bit server build.
    #[arg(long)]
    java_bin: Option<PathBuf>,

    /// Launch this program instead of the detected server build.
    #[arg(long)]
    executable: Option<PathBuf>,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// Arguments passed through to the server.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    server_args: Vec<String>,
}

impl Args {
    /// CLI flags take priority over the settings file and environment.
    fn apply(self, config: &mut Config) {
        if let Some(java_bin) = self.java_bin {
            config.server.java_bin = java_bin;
        }
        if self.executable.is_some() {
            config.server.executable = self.executable;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if self.log_json {
            config.logging.json = true;
        }
        if !self.server_args.is_empty() {
            config.server.args = self.server_args;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    let install_dir = match args.install_dir.take() {
        Some(dir) => dir,
        None => default_install_dir()?,
    };
    let mut config = load_config(&install_dir)?;
    args.apply(&mut config);

    init_tracing(&default_filter(&config.logging.level), config.logging.json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        install_dir = %install_dir.display(),
        "Starting pzwrap"
    );

    let terminal = Arc::new(Terminal::stdout());
    let plan = resolve_launch_plan(&config, &install_dir, &terminal).await?;
    info!(command = %plan, "Resolved server command");

    let lines = spawn_line_reader(BufReader::new(std::io::stdin()))?;
    let coordination = Arc::new(Coordination::new());
    let input = Arc::new(ChildInput::new());
    let _signals = spawn_signal_handler(Arc::clone(&coordination), Arc::clone(&input))?;

    let supervisor = Supervisor::new(ProcessLauncher::new(plan), coordination, input, terminal);
    let summary = supervisor.run(lines).await?;

    info!(
        launches = summary.launches,
        killed = summary.killed,
        "pzwrap stopped"
    );
    Ok(())
}

/// Pick the server build, unless an explicit executable was configured.
async fn resolve_launch_plan(
    config: &Config,
    install_dir: &Path,
    terminal: &Terminal,
) -> anyhow::Result<LaunchPlan> {
    if let Some(executable) = &config.server.executable {
        let mut plan = LaunchPlan::direct(executable.clone(), config.server.args.clone());
        plan.working_dir = Some(install_dir.to_path_buf());
        return Ok(plan);
    }

    let Some(arch) = detect_java_arch(&config.server.java_bin).await? else {
        anyhow::bail!(pzwrap_core::Error::Platform(
            "Couldn't determine 32/64 bit of java".to_string()
        ));
    };
    terminal
        .print_line(&format!("{arch}-bit java detected"))
        .await?;

    Ok(LaunchPlan::for_arch(
        install_dir,
        arch,
        config.server.args.clone(),
        |key| std::env::var(key).ok(),
    ))
}

/// Directory containing the running executable.
fn default_install_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow::anyhow!("Cannot determine install directory"))
}
