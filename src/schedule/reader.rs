use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use tracing::warn;

use crate::codec;
use crate::gateway::{CommandGateway, FUNC_GET_RTC_TIMESTAMP, FUNC_GET_TEMPERATURE, FUNC_HAS_INTERNET};
use crate::schedule::model::{ScheduleEntry, ScheduleKind, ScriptBinding};

#[derive(Debug, Clone)]
pub struct PollSnapshot {
    pub host_clock: NaiveDateTime,
    pub device_clock: Option<NaiveDateTime>,
    pub temperature: Option<String>,
    pub shutdown: ScheduleEntry,
    pub startup: ScheduleEntry,
    pub script: ScriptBinding,
    pub internet_reachable: bool,
}

impl PollSnapshot {
    pub fn schedule(&self, kind: ScheduleKind) -> &ScheduleEntry {
        match kind {
            ScheduleKind::Shutdown => &self.shutdown,
            ScheduleKind::Startup => &self.startup,
        }
    }
}

pub struct StateReader<'a> {
    gateway: &'a dyn CommandGateway,
    schedule_file: &'a Path,
}

impl<'a> StateReader<'a> {
    pub fn new(gateway: &'a dyn CommandGateway, schedule_file: &'a Path) -> Self {
        Self {
            gateway,
            schedule_file,
        }
    }

    pub fn poll(&self, now: DateTime<Local>, script_source: Option<PathBuf>) -> PollSnapshot {
        PollSnapshot {
            host_clock: now.naive_local(),
            device_clock: self.device_clock(),
            temperature: self.temperature(),
            shutdown: self.schedule(ScheduleKind::Shutdown),
            startup: self.schedule(ScheduleKind::Startup),
            script: ScriptBinding::read(self.schedule_file, script_source),
            internet_reachable: self.internet_reachable(),
        }
    }

    pub fn device_clock(&self) -> Option<NaiveDateTime> {
        let reply = match self.gateway.invoke(FUNC_GET_RTC_TIMESTAMP, None) {
            Ok(result) => result,
            Err(err) => {
                warn!("device clock unavailable: {err}");
                return None;
            }
        };
        let Ok(seconds) = reply.trimmed().parse::<i64>() else {
            warn!(output = reply.trimmed(), "device clock reply is not an epoch timestamp");
            return None;
        };
        Local
            .timestamp_opt(seconds, 0)
            .single()
            .map(|value| value.naive_local())
    }

    pub fn temperature(&self) -> Option<String> {
        match self.gateway.invoke(FUNC_GET_TEMPERATURE, None) {
            Ok(result) => Some(result.trimmed().to_string()),
            Err(err) => {
                warn!("temperature unavailable: {err}");
                None
            }
        }
    }

    pub fn schedule(&self, kind: ScheduleKind) -> ScheduleEntry {
        let reply = match self.gateway.invoke(kind.get_function(), None) {
            Ok(result) => result.trimmed().to_string(),
            Err(err) => {
                warn!("{} time unavailable: {err}", kind.label());
                String::new()
            }
        };
        if !kind.is_armed_reply(&reply) {
            return ScheduleEntry::disarmed(kind);
        }

        ScheduleEntry {
            kind,
            armed: true,
            sample: codec::to_local(self.gateway, &reply),
        }
    }

    pub fn internet_reachable(&self) -> bool {
        match self.gateway.invoke(FUNC_HAS_INTERNET, None) {
            Ok(result) => result.succeeded(),
            Err(err) => {
                warn!("internet check failed: {err}");
                false
            }
        }
    }
}
