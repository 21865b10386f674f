use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::rc::Rc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::codec::{DeviceTimeSample, Grammar, parse};
use crate::gateway::{CommandGateway, CommandResult, GatewayError};
use crate::schedule::model::{SHUTDOWN_SENTINEL, STARTUP_SENTINEL};

#[derive(Debug, Clone, Copy)]
enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
}

struct DeviceState {
    zone: Zone,
    anchor_year: i32,
    anchor_month: u32,
    rtc_epoch: i64,
    host_epoch: i64,
    temperature: String,
    shutdown: String,
    startup: String,
    internet: bool,
    calls: Vec<String>,
    overrides: HashMap<String, CommandResult>,
    unreachable: HashSet<String>,
}

#[derive(Clone)]
pub struct FakeDevice {
    state: Rc<RefCell<DeviceState>>,
}

impl FakeDevice {
    pub fn with_offset_hours(hours: i32) -> Self {
        let offset = FixedOffset::east_opt(hours * 3_600).expect("offset within one day");
        Self::with_zone(Zone::Fixed(offset))
    }

    pub fn with_timezone(tz: Tz) -> Self {
        Self::with_zone(Zone::Named(tz))
    }

    fn with_zone(zone: Zone) -> Self {
        Self {
            state: Rc::new(RefCell::new(DeviceState {
                zone,
                anchor_year: 2026,
                anchor_month: 1,
                rtc_epoch: 1_768_478_400,
                host_epoch: 1_768_478_400,
                temperature: "27.25'C / 81.05'F".to_string(),
                shutdown: SHUTDOWN_SENTINEL.to_string(),
                startup: STARTUP_SENTINEL.to_string(),
                internet: true,
                calls: Vec::new(),
                overrides: HashMap::new(),
                unreachable: HashSet::new(),
            })),
        }
    }

    pub fn anchored_at(self, year: i32, month: u32) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.anchor_year = year;
            state.anchor_month = month;
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn count_calls(&self, function: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.split(' ').next() == Some(function))
            .count()
    }

    pub fn override_reply(&self, function: &str, output: &str) {
        self.state
            .borrow_mut()
            .overrides
            .insert(function.to_string(), CommandResult::new(output, "", 0));
    }

    pub fn make_unreachable(&self, function: &str) {
        self.state
            .borrow_mut()
            .unreachable
            .insert(function.to_string());
    }

    pub fn set_internet(&self, reachable: bool) {
        self.state.borrow_mut().internet = reachable;
    }

    pub fn set_temperature(&self, text: &str) {
        self.state.borrow_mut().temperature = text.to_string();
    }

    pub fn set_shutdown_raw(&self, text: &str) {
        self.state.borrow_mut().shutdown = text.to_string();
    }

    pub fn set_startup_raw(&self, text: &str) {
        self.state.borrow_mut().startup = text.to_string();
    }

    pub fn shutdown_raw(&self) -> String {
        self.state.borrow().shutdown.clone()
    }

    pub fn startup_raw(&self) -> String {
        self.state.borrow().startup.clone()
    }

    pub fn set_rtc_epoch(&self, epoch: i64) {
        self.state.borrow_mut().rtc_epoch = epoch;
    }

    pub fn rtc_epoch(&self) -> i64 {
        self.state.borrow().rtc_epoch
    }

    pub fn host_epoch(&self) -> i64 {
        self.state.borrow().host_epoch
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }

    fn check_reachable(&self, name: &str) -> Result<(), GatewayError> {
        if self.state.borrow().unreachable.contains(name) {
            return Err(GatewayError::Spawn {
                command: name.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "simulated spawn failure"),
            });
        }
        Ok(())
    }

    fn anchored(&self, sample: &DeviceTimeSample) -> Option<NaiveDateTime> {
        let state = self.state.borrow();
        NaiveDate::from_ymd_opt(state.anchor_year, state.anchor_month, sample.day)?
            .and_hms_opt(sample.hour, sample.minute, sample.second)
    }

    fn utc_to_local(&self, args: &str) -> Option<String> {
        let utc = parse(args.trim_matches('\''), Grammar::Colon)?;
        let naive = self.anchored(&utc)?;
        let instant = Utc.from_utc_datetime(&naive);
        let text = match self.state.borrow().zone {
            Zone::Fixed(offset) => format_day_time(&instant.with_timezone(&offset)),
            Zone::Named(tz) => format_day_time(&instant.with_timezone(&tz)),
        };
        Some(text)
    }

    fn local_to_utc(&self, args: &str) -> Option<String> {
        let local = parse(args, Grammar::Space)?;
        let naive = self.anchored(&local)?;
        let instant = match self.state.borrow().zone {
            Zone::Fixed(offset) => offset.from_local_datetime(&naive).earliest()?.with_timezone(&Utc),
            Zone::Named(tz) => tz.from_local_datetime(&naive).earliest()?.with_timezone(&Utc),
        };
        Some(format_day_time(&instant))
    }

    fn local_clock_to_epoch(&self, args: &str) -> Option<i64> {
        let naive =
            NaiveDateTime::parse_from_str(args.trim_matches('\''), "%Y-%m-%d %H:%M:%S").ok()?;
        let epoch = match self.state.borrow().zone {
            Zone::Fixed(offset) => offset.from_local_datetime(&naive).earliest()?.timestamp(),
            Zone::Named(tz) => tz.from_local_datetime(&naive).earliest()?.timestamp(),
        };
        Some(epoch)
    }

    fn reply(&self, function: &str, args: &str) -> CommandResult {
        if let Some(fixed) = self.state.borrow().overrides.get(function) {
            return fixed.clone();
        }
        let ok = |text: String| CommandResult::new(&text, "", 0);
        let converted = |text: Option<String>| match text {
            Some(text) => ok(text),
            None => CommandResult::new("", "date: invalid date", 1),
        };
        match function {
            "get_rtc_timestamp" => ok(self.rtc_epoch().to_string()),
            "get_temperature" => ok(self.state.borrow().temperature.clone()),
            "get_shutdown_time" => ok(self.shutdown_raw()),
            "get_startup_time" => ok(self.startup_raw()),
            "get_local_date_time" => converted(self.utc_to_local(args)),
            "get_utc_date_time" => converted(self.local_to_utc(args)),
            "has_internet" => {
                let code = if self.state.borrow().internet { 0 } else { 1 };
                CommandResult::new("", "", code)
            }
            "set_shutdown_time" => {
                let parts: Vec<&str> = args.split(' ').collect();
                if let [day, hour, minute] = parts.as_slice() {
                    self.state.borrow_mut().shutdown = format!("{day} {hour}:{minute}:00");
                    ok(format!("shutdown scheduled at {args}"))
                } else {
                    CommandResult::new("", "bad shutdown arguments", 2)
                }
            }
            "set_startup_time" => {
                let parts: Vec<&str> = args.split(' ').collect();
                if let [day, hour, minute, second] = parts.as_slice() {
                    self.state.borrow_mut().startup = format!("{day} {hour}:{minute}:{second}");
                    ok(format!("startup scheduled at {args}"))
                } else {
                    CommandResult::new("", "bad startup arguments", 2)
                }
            }
            "clear_shutdown_time" => {
                self.state.borrow_mut().shutdown = SHUTDOWN_SENTINEL.to_string();
                ok(String::new())
            }
            "clear_startup_time" => {
                self.state.borrow_mut().startup = STARTUP_SENTINEL.to_string();
                ok(String::new())
            }
            "set_rtc_time" => match self.local_clock_to_epoch(args) {
                Some(epoch) => {
                    self.state.borrow_mut().rtc_epoch = epoch;
                    ok(String::new())
                }
                None => CommandResult::new("", "bad rtc time", 2),
            },
            "system_to_rtc" => {
                let mut state = self.state.borrow_mut();
                state.rtc_epoch = state.host_epoch;
                ok("Writing system time to RTC...".to_string())
            }
            "rtc_to_system" => {
                let mut state = self.state.borrow_mut();
                state.host_epoch = state.rtc_epoch;
                ok("Writing RTC time to system...".to_string())
            }
            _ => CommandResult::new("", &format!("{function}: command not found"), 127),
        }
    }
}

fn format_day_time<Z: TimeZone>(value: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    value.format("%d %H:%M:%S").to_string()
}

impl CommandGateway for FakeDevice {
    fn invoke(&self, function: &str, args: Option<&str>) -> Result<CommandResult, GatewayError> {
        let args = args.unwrap_or_default();
        self.record(if args.is_empty() {
            function.to_string()
        } else {
            format!("{function} {args}")
        });
        self.check_reachable(function)?;
        Ok(self.reply(function, args))
    }

    fn run_script(&self, script: &str) -> Result<CommandResult, GatewayError> {
        self.record(format!("script {script}"));
        self.check_reachable(script)?;
        Ok(CommandResult::new(&format!("{script} done"), "", 0))
    }

    fn set_host_clock(&self, unix_seconds: i64) -> Result<CommandResult, GatewayError> {
        self.record(format!("date -s @{unix_seconds}"));
        self.check_reachable("date")?;
        self.state.borrow_mut().host_epoch = unix_seconds;
        Ok(CommandResult::new("", "", 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_zone_conversion_follows_the_anchor_month() {
        let winter = FakeDevice::with_timezone(chrono_tz::Europe::Berlin);
        assert_eq!(
            winter.invoke("get_local_date_time", Some("'05 14:30:00'")).expect("call").trimmed(),
            "05 15:30:00"
        );

        let summer = FakeDevice::with_timezone(chrono_tz::Europe::Berlin).anchored_at(2026, 7);
        assert_eq!(
            summer.invoke("get_local_date_time", Some("'05 14:30:00'")).expect("call").trimmed(),
            "05 16:30:00"
        );
        assert_eq!(
            summer.invoke("get_utc_date_time", Some("05 16 30 00")).expect("call").trimmed(),
            "05 14:30:00"
        );
    }
}
