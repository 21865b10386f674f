use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info};

use crate::codec;
use crate::config::ConsoleConfig;
use crate::dispatch::{ActionDispatcher, DispatchOutcome, OperatorPrompt};
use crate::gateway::CommandGateway;
use crate::poll::PollLoop;
use crate::schedule::model::{ScheduleFields, ScheduleKind, ScriptBinding};
use crate::schedule::reader::{PollSnapshot, StateReader};
use crate::session::{FieldGroup, FieldValues, SessionController, SessionError};

pub const TXT_CUR_TEMPERATURE: &str = "Current Temperature: ";

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConsoleError {
    #[error("finish or cancel the current edit first")]
    EditInProgress,
    #[error("network time sync needs internet access")]
    Offline,
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ConsoleDisplay {
    pub host_clock: String,
    pub device_clock: String,
    pub temperature: String,
    pub shutdown: ScheduleFields,
    pub startup: ScheduleFields,
    pub shutdown_clear_enabled: bool,
    pub startup_clear_enabled: bool,
    pub script_status: String,
    pub script_detail: Option<String>,
    pub script_source: Option<String>,
    pub script_clear_enabled: bool,
    pub network_sync_offered: bool,
}

impl ConsoleDisplay {
    pub fn values(&self, group: FieldGroup) -> FieldValues {
        match group {
            FieldGroup::HostClock => FieldValues::Clock(self.host_clock.clone()),
            FieldGroup::DeviceClock => FieldValues::Clock(self.device_clock.clone()),
            FieldGroup::Shutdown => FieldValues::Schedule(self.shutdown.clone()),
            FieldGroup::Startup => FieldValues::Schedule(self.startup.clone()),
        }
    }

    pub fn schedule(&self, kind: ScheduleKind) -> &ScheduleFields {
        match kind {
            ScheduleKind::Shutdown => &self.shutdown,
            ScheduleKind::Startup => &self.startup,
        }
    }

    pub fn clear_enabled(&self, kind: ScheduleKind) -> bool {
        match kind {
            ScheduleKind::Shutdown => self.shutdown_clear_enabled,
            ScheduleKind::Startup => self.startup_clear_enabled,
        }
    }

    fn schedule_mut(&mut self, kind: ScheduleKind) -> &mut ScheduleFields {
        match kind {
            ScheduleKind::Shutdown => &mut self.shutdown,
            ScheduleKind::Startup => &mut self.startup,
        }
    }

    fn clock_mut(&mut self, group: FieldGroup) -> Option<&mut String> {
        match group {
            FieldGroup::HostClock => Some(&mut self.host_clock),
            FieldGroup::DeviceClock => Some(&mut self.device_clock),
            FieldGroup::Shutdown | FieldGroup::Startup => None,
        }
    }

    fn restore(&mut self, group: FieldGroup, values: FieldValues) {
        match (group.schedule_kind(), values) {
            (Some(kind), FieldValues::Schedule(fields)) => *self.schedule_mut(kind) = fields,
            (None, FieldValues::Clock(text)) => {
                if let Some(slot) = self.clock_mut(group) {
                    *slot = text;
                }
            }
            _ => debug!("ignoring values of the wrong shape for {}", group.label()),
        }
    }

    fn apply(&mut self, snapshot: &PollSnapshot) {
        self.host_clock = codec::format_clock(&snapshot.host_clock);
        self.device_clock = snapshot
            .device_clock
            .as_ref()
            .map(codec::format_clock)
            .unwrap_or_default();
        self.temperature = format!(
            "{TXT_CUR_TEMPERATURE}{}",
            snapshot.temperature.as_deref().unwrap_or_default()
        );

        for entry in [&snapshot.shutdown, &snapshot.startup] {
            let kind = entry.kind;
            if entry.armed {
                if let Some(sample) = &entry.sample {
                    *self.schedule_mut(kind) = ScheduleFields::from_sample(sample);
                }
            } else {
                *self.schedule_mut(kind) = ScheduleFields::default();
            }
            match kind {
                ScheduleKind::Shutdown => self.shutdown_clear_enabled = entry.armed,
                ScheduleKind::Startup => self.startup_clear_enabled = entry.armed,
            }
        }

        self.apply_script(&snapshot.script);
        self.network_sync_offered = snapshot.internet_reachable;
    }

    fn apply_script(&mut self, script: &ScriptBinding) {
        self.script_status = script.status_text().to_string();
        self.script_detail = script.contents.clone();
        self.script_source = script
            .source_path
            .as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned());
        self.script_clear_enabled = script.active;
    }
}

pub struct Console {
    gateway: Box<dyn CommandGateway>,
    config: ConsoleConfig,
    display: ConsoleDisplay,
    sessions: SessionController,
    poll: PollLoop,
    script_source: Option<PathBuf>,
}

impl Console {
    pub fn new(gateway: Box<dyn CommandGateway>, config: ConsoleConfig, now: Instant) -> Self {
        let poll = PollLoop::new(config.poll_interval, now);
        Self {
            gateway,
            config,
            display: ConsoleDisplay::default(),
            sessions: SessionController::default(),
            poll,
            script_source: None,
        }
    }

    pub fn display(&self) -> &ConsoleDisplay {
        &self.display
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionController {
        &self.sessions
    }

    pub fn until_next_poll(&self, now: Instant) -> Duration {
        self.poll.until_due(now)
    }

    /// Timer entry point. Polls only when the interval elapsed and no edit
    /// session is open; returns whether a poll ran.
    pub fn tick(&mut self, now: Instant, local_now: DateTime<Local>) -> bool {
        if !self.sessions.poll_allowed() {
            debug!(
                open_sessions = self.sessions.gate().open_sessions(),
                "poll held while editing"
            );
            return false;
        }
        if !self.poll.due(now) {
            return false;
        }
        self.refresh(local_now);
        true
    }

    fn refresh(&mut self, local_now: DateTime<Local>) {
        let snapshot = StateReader::new(self.gateway.as_ref(), &self.config.schedule_file)
            .poll(local_now, self.script_source.clone());
        self.display.apply(&snapshot);
        if !snapshot.script.active {
            self.script_source = None;
        }
    }

    pub fn begin_edit(&mut self, group: FieldGroup) -> Result<(), ConsoleError> {
        let snapshot = self.display.values(group);
        self.sessions.begin_edit(group, snapshot)?;
        debug!("editing {}", group.label());
        Ok(())
    }

    pub fn edit_clock(&mut self, group: FieldGroup) -> Option<&mut String> {
        if !self.sessions.is_editing(group) {
            return None;
        }
        self.display.clock_mut(group)
    }

    pub fn edit_schedule(&mut self, kind: ScheduleKind) -> Option<&mut ScheduleFields> {
        if !self.sessions.is_editing(kind.into()) {
            return None;
        }
        Some(self.display.schedule_mut(kind))
    }

    pub fn cancel(&mut self, group: FieldGroup) -> bool {
        match self.sessions.cancel(group) {
            Some(previous) => {
                self.display.restore(group, previous);
                debug!("cancelled editing {}", group.label());
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) -> usize {
        let restored = self.sessions.cancel_all();
        let count = restored.len();
        for (group, previous) in restored {
            self.display.restore(group, previous);
        }
        count
    }

    pub fn commit(
        &mut self,
        group: FieldGroup,
        values: FieldValues,
    ) -> Result<DispatchOutcome, ConsoleError> {
        self.sessions.begin_commit(group)?;
        self.display.restore(group, values.clone());
        let outcome = ActionDispatcher::new(self.gateway.as_ref(), &self.config).commit(group, &values);
        self.sessions.finish_commit(group);
        self.poll.expedite();
        info!("{}", outcome.summary(group.label()));
        Ok(outcome)
    }

    pub fn commit_displayed(&mut self, group: FieldGroup) -> Result<DispatchOutcome, ConsoleError> {
        let values = self.display.values(group);
        self.commit(group, values)
    }

    fn ensure_idle(&self) -> Result<(), ConsoleError> {
        if self.sessions.any_active() {
            return Err(ConsoleError::EditInProgress);
        }
        Ok(())
    }

    fn standalone(
        &mut self,
        action: impl FnOnce(&ActionDispatcher<'_>) -> DispatchOutcome,
    ) -> Result<DispatchOutcome, ConsoleError> {
        self.ensure_idle()?;
        let outcome = action(&ActionDispatcher::new(self.gateway.as_ref(), &self.config));
        self.poll.expedite();
        Ok(outcome)
    }

    pub fn copy_host_to_device(&mut self) -> Result<DispatchOutcome, ConsoleError> {
        self.standalone(|dispatcher| dispatcher.copy_host_to_device())
    }

    pub fn copy_device_to_host(&mut self) -> Result<DispatchOutcome, ConsoleError> {
        self.standalone(|dispatcher| dispatcher.copy_device_to_host())
    }

    pub fn network_time_sync(&mut self) -> Result<DispatchOutcome, ConsoleError> {
        if !self.display.network_sync_offered {
            return Err(ConsoleError::Offline);
        }
        self.standalone(|dispatcher| dispatcher.network_time_sync())
    }

    pub fn clear_schedule(
        &mut self,
        kind: ScheduleKind,
        prompt: &mut dyn OperatorPrompt,
    ) -> Result<DispatchOutcome, ConsoleError> {
        self.standalone(|dispatcher| dispatcher.clear_schedule(kind, prompt))
    }

    pub fn install_script(&mut self, source: &Path) -> Result<DispatchOutcome, ConsoleError> {
        let outcome = self.standalone(|dispatcher| dispatcher.install_script(source))?;
        if outcome.is_applied() {
            self.script_source = Some(source.to_path_buf());
        }
        Ok(outcome)
    }

    pub fn clear_script(
        &mut self,
        prompt: &mut dyn OperatorPrompt,
    ) -> Result<DispatchOutcome, ConsoleError> {
        self.standalone(|dispatcher| dispatcher.clear_script(prompt))
    }
}
