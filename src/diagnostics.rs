use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::Local;
use tracing::warn;

use crate::codec;
use crate::config::ConsoleConfig;
use crate::gateway::CommandGateway;
use crate::schedule::model::{ScheduleEntry, ScheduleKind, ScriptCatalog};
use crate::schedule::reader::{PollSnapshot, StateReader};

pub fn run_diagnostics(gateway: &dyn CommandGateway, config: &ConsoleConfig) -> Result<()> {
    let utilities = config.utility_dir.join(&config.utilities);
    if !utilities.is_file() {
        bail!("utility file not found at {}", utilities.display());
    }

    let snapshot = StateReader::new(gateway, &config.schedule_file).poll(Local::now(), None);
    let scripts = match ScriptCatalog::list(&config.schedules_dir, &config.script_extension) {
        Ok(scripts) => scripts,
        Err(err) => {
            warn!(
                "cannot list schedule scripts in {}: {err}",
                config.schedules_dir.display()
            );
            Vec::new()
        }
    };

    println!("Witty Pi console diagnostics");
    println!("Utility directory: {}", config.utility_dir.display());
    for line in report_lines(&snapshot, &scripts) {
        println!("{line}");
    }
    Ok(())
}

fn report_lines(snapshot: &PollSnapshot, scripts: &[PathBuf]) -> Vec<String> {
    let mut lines = vec![
        format!("Host clock: {}", codec::format_clock(&snapshot.host_clock)),
        format!(
            "Device clock: {}",
            snapshot
                .device_clock
                .as_ref()
                .map(codec::format_clock)
                .unwrap_or_else(|| "unavailable".to_string())
        ),
        format!(
            "Temperature: {}",
            snapshot.temperature.as_deref().unwrap_or("unavailable")
        ),
        format!("Shutdown time: {}", describe(snapshot.schedule(ScheduleKind::Shutdown))),
        format!("Startup time: {}", describe(snapshot.schedule(ScheduleKind::Startup))),
        format!(
            "Schedule script: {} ({})",
            snapshot.script.status_text(),
            snapshot.script.installed_path.display()
        ),
        format!(
            "Internet: {}",
            if snapshot.internet_reachable {
                "reachable"
            } else {
                "unreachable"
            }
        ),
        format!("Available schedule scripts: {}", scripts.len()),
    ];
    lines.extend(scripts.iter().map(|path| format!("  {}", path.display())));
    lines
}

fn describe(entry: &ScheduleEntry) -> String {
    match (entry.armed, &entry.sample) {
        (false, _) => "not set".to_string(),
        (true, Some(sample)) => sample.to_string(),
        (true, None) => "set (unreadable)".to_string(),
    }
}
