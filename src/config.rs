use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub utility_dir: PathBuf,
    pub utilities: String,
    pub sync_script: String,
    pub reload_script: String,
    pub schedule_file: PathBuf,
    pub schedules_dir: PathBuf,
    pub script_extension: String,
    pub poll_interval: Duration,
    pub elevate_with: Option<String>,
    pub shell: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::from_file(ConsoleConfigFile::default())
    }
}

impl ConsoleConfig {
    fn from_file(raw: ConsoleConfigFile) -> Self {
        let utility_dir = raw.utility_dir;
        Self {
            schedule_file: utility_dir.join(&raw.schedule_file),
            schedules_dir: utility_dir.join(&raw.schedules_dir),
            utilities: raw.utilities,
            sync_script: raw.sync_script,
            reload_script: raw.reload_script,
            script_extension: raw.script_extension.trim_start_matches('.').to_string(),
            poll_interval: Duration::from_millis(raw.poll_interval_ms),
            elevate_with: raw.elevate_with.filter(|value| !value.trim().is_empty()),
            shell: raw.shell,
            utility_dir,
        }
    }

    pub fn with_utility_dir(self, dir: &Path) -> Self {
        let rebase = |path: &Path, old_root: &Path| {
            let relative = path.strip_prefix(old_root).unwrap_or(path);
            dir.join(relative)
        };
        Self {
            schedule_file: rebase(&self.schedule_file, &self.utility_dir),
            schedules_dir: rebase(&self.schedules_dir, &self.utility_dir),
            utility_dir: dir.to_path_buf(),
            ..self
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConsoleConfigFile {
    version: u32,
    utility_dir: PathBuf,
    utilities: String,
    sync_script: String,
    reload_script: String,
    schedule_file: PathBuf,
    schedules_dir: PathBuf,
    script_extension: String,
    poll_interval_ms: u64,
    elevate_with: Option<String>,
    shell: String,
}

impl Default for ConsoleConfigFile {
    fn default() -> Self {
        Self {
            version: 1,
            utility_dir: PathBuf::from("."),
            utilities: "utilities.sh".to_string(),
            sync_script: "syncTime.sh".to_string(),
            reload_script: "runScript.sh".to_string(),
            schedule_file: PathBuf::from("schedule.wpi"),
            schedules_dir: PathBuf::from("schedules"),
            script_extension: "wpi".to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            elevate_with: Some("sudo".to_string()),
            shell: "bash".to_string(),
        }
    }
}

pub fn load_console_config(path: &Path) -> Result<ConsoleConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    parse_console_config_text(&content)
}

pub fn parse_console_config_text(content: &str) -> Result<ConsoleConfig> {
    let raw = serde_json::from_str::<ConsoleConfigFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != 1 {
        bail!(
            "unsupported config version {}; expected version 1",
            raw.version
        );
    }
    if raw.poll_interval_ms == 0 {
        bail!("poll_interval_ms must be greater than zero");
    }
    if raw.utilities.trim().is_empty() {
        bail!("utilities must name the shared utility file");
    }
    if raw.shell.trim().is_empty() {
        bail!("shell must not be empty");
    }

    Ok(ConsoleConfig::from_file(raw))
}
