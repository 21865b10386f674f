use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use tracing::{info, warn};

use crate::codec::{self, Grammar};
use crate::config::ConsoleConfig;
use crate::gateway::{
    CommandGateway, CommandResult, FUNC_RTC_TO_SYS, FUNC_SET_RTC_TIME, FUNC_SYS_TO_RTC,
    GatewayError, quote_arg,
};
use crate::schedule::model::{ScheduleFields, ScheduleKind, has_extension};
use crate::session::{FieldGroup, FieldValues};

pub const TXT_PLEASE_CONFIRM: &str = "Please Confirm";
pub const TXT_ARE_YOU_SURE: &str = "Are you sure to proceed?";

pub trait OperatorPrompt {
    fn confirm(&mut self, title: &str, question: &str) -> bool;
}

pub struct FixedAnswer(pub bool);

impl OperatorPrompt for FixedAnswer {
    fn confirm(&mut self, _title: &str, _question: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DispatchOutcome {
    Applied { exit_code: i32 },
    Skipped { reason: String },
    Declined,
    Failed { reason: String },
}

impl DispatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DispatchOutcome::Applied { .. })
    }

    pub fn summary(&self, action: &str) -> String {
        match self {
            DispatchOutcome::Applied { exit_code: 0 } => format!("{action}: done"),
            DispatchOutcome::Applied { exit_code } => {
                format!("{action}: done (exit code {exit_code})")
            }
            DispatchOutcome::Skipped { reason } => format!("{action}: skipped ({reason})"),
            DispatchOutcome::Declined => format!("{action}: cancelled"),
            DispatchOutcome::Failed { reason } => format!("{action}: failed ({reason})"),
        }
    }
}

pub struct ActionDispatcher<'a> {
    gateway: &'a dyn CommandGateway,
    config: &'a ConsoleConfig,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(gateway: &'a dyn CommandGateway, config: &'a ConsoleConfig) -> Self {
        Self { gateway, config }
    }

    pub fn commit(&self, group: FieldGroup, values: &FieldValues) -> DispatchOutcome {
        match (group, values) {
            (FieldGroup::HostClock, FieldValues::Clock(text)) => self.sync_host_clock(text),
            (FieldGroup::DeviceClock, FieldValues::Clock(text)) => self.write_device_clock(text),
            (FieldGroup::Shutdown, FieldValues::Schedule(fields)) => {
                self.commit_schedule(ScheduleKind::Shutdown, fields)
            }
            (FieldGroup::Startup, FieldValues::Schedule(fields)) => {
                self.commit_schedule(ScheduleKind::Startup, fields)
            }
            _ => skipped(format!("values do not belong to the {}", group.label())),
        }
    }

    pub fn sync_host_clock(&self, text: &str) -> DispatchOutcome {
        let Some(naive) = codec::parse_clock(text) else {
            return skipped(format!("invalid host clock value '{text}'"));
        };
        let Some(local) = Local.from_local_datetime(&naive).earliest() else {
            return skipped(format!("'{text}' does not exist in the local timezone"));
        };
        logged("set host clock", self.gateway.set_host_clock(local.timestamp()))
    }

    pub fn write_device_clock(&self, text: &str) -> DispatchOutcome {
        let Some(naive) = codec::parse_clock(text) else {
            return skipped(format!("invalid device clock value '{text}'"));
        };
        let args = quote_arg(&codec::format_clock(&naive));
        logged(
            FUNC_SET_RTC_TIME,
            self.gateway.invoke(FUNC_SET_RTC_TIME, Some(&args)),
        )
    }

    pub fn copy_host_to_device(&self) -> DispatchOutcome {
        logged(FUNC_SYS_TO_RTC, self.gateway.invoke(FUNC_SYS_TO_RTC, None))
    }

    pub fn copy_device_to_host(&self) -> DispatchOutcome {
        logged(FUNC_RTC_TO_SYS, self.gateway.invoke(FUNC_RTC_TO_SYS, None))
    }

    pub fn network_time_sync(&self) -> DispatchOutcome {
        let script = &self.config.sync_script;
        logged(script, self.gateway.run_script(script))
    }

    pub fn commit_schedule(&self, kind: ScheduleKind, fields: &ScheduleFields) -> DispatchOutcome {
        let text = fields.to_space_text(kind);
        if codec::parse(&text, Grammar::Space).is_none() {
            return skipped(format!("invalid {} time '{text}'", kind.label()));
        }
        let Some(args) = codec::to_utc(self.gateway, &text)
            .and_then(|utc| kind.set_arguments(&utc))
        else {
            return skipped(format!("could not convert {} time '{text}' to UTC", kind.label()));
        };
        logged(
            kind.set_function(),
            self.gateway.invoke(kind.set_function(), Some(&args)),
        )
    }

    pub fn clear_schedule(
        &self,
        kind: ScheduleKind,
        prompt: &mut dyn OperatorPrompt,
    ) -> DispatchOutcome {
        if !prompt.confirm(TXT_PLEASE_CONFIRM, TXT_ARE_YOU_SURE) {
            return DispatchOutcome::Declined;
        }
        logged(
            kind.clear_function(),
            self.gateway.invoke(kind.clear_function(), None),
        )
    }

    /// Copies `source` over the installed schedule file and reloads the
    /// board's scheduler. A failed copy keeps the previous script in place.
    pub fn install_script(&self, source: &Path) -> DispatchOutcome {
        if !has_extension(source, &self.config.script_extension) {
            return skipped(format!(
                "{} is not a .{} schedule script",
                source.display(),
                self.config.script_extension
            ));
        }
        if let Err(err) = replace_file(source, &self.config.schedule_file) {
            warn!(
                "schedule script file copy failed: {}: {err}",
                source.display()
            );
            return DispatchOutcome::Failed {
                reason: format!("copy of {} failed: {err}", source.display()),
            };
        }
        info!(
            source = %source.display(),
            installed = %self.config.schedule_file.display(),
            "schedule script installed"
        );
        let script = &self.config.reload_script;
        logged(script, self.gateway.run_script(script))
    }

    pub fn clear_script(&self, prompt: &mut dyn OperatorPrompt) -> DispatchOutcome {
        if !prompt.confirm(TXT_PLEASE_CONFIRM, TXT_ARE_YOU_SURE) {
            return DispatchOutcome::Declined;
        }
        let installed = &self.config.schedule_file;
        match fs::remove_file(installed) {
            Ok(()) => {
                info!(installed = %installed.display(), "schedule script removed");
                DispatchOutcome::Applied { exit_code: 0 }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(installed = %installed.display(), "no schedule script to remove");
                DispatchOutcome::Applied { exit_code: 0 }
            }
            Err(err) => {
                warn!("failed to remove {}: {err}", installed.display());
                DispatchOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

fn skipped(reason: String) -> DispatchOutcome {
    warn!("{reason}; nothing sent");
    DispatchOutcome::Skipped { reason }
}

fn logged(action: &str, result: Result<CommandResult, GatewayError>) -> DispatchOutcome {
    match result {
        Ok(result) => {
            info!(
                action,
                exit_code = result.exit_code,
                output = result.trimmed(),
                "privileged action finished"
            );
            DispatchOutcome::Applied {
                exit_code: result.exit_code,
            }
        }
        Err(err) => {
            warn!(action, "privileged action failed: {err}");
            DispatchOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}

fn replace_file(source: &Path, target: &Path) -> io::Result<()> {
    let staging = staging_path(target);
    if let Err(err) = fs::copy(source, &staging) {
        let _ = fs::remove_file(&staging);
        return Err(err);
    }
    fs::rename(&staging, target).inspect_err(|_| {
        let _ = fs::remove_file(&staging);
    })
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schedule".to_string());
    target.with_file_name(format!(".{name}.partial"))
}
