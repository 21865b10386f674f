mod codec;
mod config;
mod console;
mod diagnostics;
mod dispatch;
mod gateway;
#[cfg(test)]
mod gateway_fake;
mod gateway_shell;
mod poll;
mod schedule;
mod session;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{ConsoleConfig, load_console_config};
use crate::gateway_shell::ShellGateway;

#[derive(Parser, Debug)]
#[command(
    name = "rtc-console",
    version,
    about = "Console for a Witty Pi real-time-clock and power-schedule board"
)]
struct Cli {
    /// JSON configuration file; built-in defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding utilities.sh and the helper scripts.
    #[arg(long)]
    dir: Option<PathBuf>,

    #[arg(long = "poll-ms")]
    poll_ms: Option<u64>,

    /// Poll the board once, print a report and exit.
    #[arg(long)]
    diagnostics: bool,
}

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    info!(
        utility_dir = %config.utility_dir.display(),
        poll_ms = config.poll_interval.as_millis() as u64,
        "configuration loaded"
    );
    let gateway = ShellGateway::new(&config);

    if cli.diagnostics {
        diagnostics::run_diagnostics(&gateway, &config)?;
        return Ok(());
    }

    ui::app::run_gui(Box::new(gateway), config)
}

fn resolve_config(cli: &Cli) -> Result<ConsoleConfig> {
    let mut config = match &cli.config {
        Some(path) => load_console_config(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ConsoleConfig::default(),
    };
    if let Some(dir) = &cli.dir {
        config = config.with_utility_dir(dir);
    }
    if let Some(ms) = cli.poll_ms {
        if ms == 0 {
            bail!("--poll-ms must be greater than zero");
        }
        config.poll_interval = Duration::from_millis(ms);
    }
    Ok(config)
}
