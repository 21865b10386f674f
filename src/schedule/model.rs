use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::codec::{self, DeviceTimeSample, Grammar};
use crate::gateway::{
    FUNC_CLEAR_SHUTDOWN_TIME, FUNC_CLEAR_STARTUP_TIME, FUNC_GET_SHUTDOWN_TIME,
    FUNC_GET_STARTUP_TIME, FUNC_SET_SHUTDOWN_TIME, FUNC_SET_STARTUP_TIME,
};

// The two sentinels differ in padding on the wire; compare them verbatim.
pub const SHUTDOWN_SENTINEL: &str = "0 0:0:00";
pub const STARTUP_SENTINEL: &str = "0 0:0:0";

pub const TXT_IN_USE: &str = "in use";
pub const TXT_NOT_IN_USE: &str = "not in use";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ScheduleKind {
    Shutdown,
    Startup,
}

impl ScheduleKind {
    pub fn label(self) -> &'static str {
        match self {
            ScheduleKind::Shutdown => "shutdown",
            ScheduleKind::Startup => "startup",
        }
    }

    pub fn sentinel(self) -> &'static str {
        match self {
            ScheduleKind::Shutdown => SHUTDOWN_SENTINEL,
            ScheduleKind::Startup => STARTUP_SENTINEL,
        }
    }

    pub fn get_function(self) -> &'static str {
        match self {
            ScheduleKind::Shutdown => FUNC_GET_SHUTDOWN_TIME,
            ScheduleKind::Startup => FUNC_GET_STARTUP_TIME,
        }
    }

    pub fn set_function(self) -> &'static str {
        match self {
            ScheduleKind::Shutdown => FUNC_SET_SHUTDOWN_TIME,
            ScheduleKind::Startup => FUNC_SET_STARTUP_TIME,
        }
    }

    pub fn clear_function(self) -> &'static str {
        match self {
            ScheduleKind::Shutdown => FUNC_CLEAR_SHUTDOWN_TIME,
            ScheduleKind::Startup => FUNC_CLEAR_STARTUP_TIME,
        }
    }

    pub fn has_seconds(self) -> bool {
        matches!(self, ScheduleKind::Startup)
    }

    pub fn is_armed_reply(self, reply: &str) -> bool {
        let reply = reply.trim();
        reply.len() > 2 && reply != self.sentinel()
    }

    pub fn set_arguments(self, utc_reply: &str) -> Option<String> {
        let [day, hour, minute, second] = codec::tokens(utc_reply, Grammar::Colon)?;
        Some(match self {
            ScheduleKind::Shutdown => format!("{day} {hour} {minute}"),
            ScheduleKind::Startup => format!("{day} {hour} {minute} {second}"),
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScheduleEntry {
    pub kind: ScheduleKind,
    pub armed: bool,
    pub sample: Option<DeviceTimeSample>,
}

impl ScheduleEntry {
    pub fn disarmed(kind: ScheduleKind) -> Self {
        Self {
            kind,
            armed: false,
            sample: None,
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ScheduleFields {
    pub date: String,
    pub hour: String,
    pub minute: String,
    pub second: String,
}

impl ScheduleFields {
    pub fn from_sample(sample: &DeviceTimeSample) -> Self {
        Self {
            date: sample.day.to_string(),
            hour: format!("{:02}", sample.hour),
            minute: format!("{:02}", sample.minute),
            second: format!("{:02}", sample.second),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_empty() && self.hour.is_empty() && self.minute.is_empty() && self.second.is_empty()
    }

    pub fn to_space_text(&self, kind: ScheduleKind) -> String {
        let second = if kind.has_seconds() {
            self.second.trim()
        } else {
            "00"
        };
        format!(
            "{} {} {} {}",
            self.date.trim(),
            self.hour.trim(),
            self.minute.trim(),
            second
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScriptBinding {
    pub active: bool,
    pub source_path: Option<PathBuf>,
    pub installed_path: PathBuf,
    pub contents: Option<String>,
}

impl ScriptBinding {
    pub fn read(installed_path: &Path, source_path: Option<PathBuf>) -> Self {
        let active = installed_path.is_file();
        let contents = if active {
            fs::read(installed_path)
                .ok()
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        } else {
            None
        };
        Self {
            active,
            source_path: if active { source_path } else { None },
            installed_path: installed_path.to_path_buf(),
            contents,
        }
    }

    pub fn status_text(&self) -> &'static str {
        if self.active { TXT_IN_USE } else { TXT_NOT_IN_USE }
    }
}

pub struct ScriptCatalog;

impl ScriptCatalog {
    pub fn list(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
        let mut scripts = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && has_extension(&path, extension) {
                scripts.push(path);
            }
        }
        scripts.sort();
        Ok(scripts)
    }
}

pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
