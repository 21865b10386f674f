use std::fmt;

use chrono::NaiveDateTime;
use tracing::warn;

use crate::gateway::{
    CommandGateway, FUNC_GET_LOCAL_DATETIME, FUNC_GET_UTC_DATETIME, quote_arg,
};

pub const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Grammar {
    Colon,
    Space,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct DeviceTimeSample {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DeviceTimeSample {
    pub fn new(day: u32, hour: u32, minute: u32, second: u32) -> Option<Self> {
        (hour < 24 && minute < 60 && second < 60).then_some(Self {
            day,
            hour,
            minute,
            second,
        })
    }

    pub fn to_colon_form(&self) -> String {
        format!(
            "{:02} {:02}:{:02}:{:02}",
            self.day, self.hour, self.minute, self.second
        )
    }
}

impl fmt::Display for DeviceTimeSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_colon_form())
    }
}

pub fn tokens(text: &str, grammar: Grammar) -> Option<[&str; 4]> {
    let text = text.trim();
    let parts: Vec<&str> = text.split(' ').collect();
    match grammar {
        Grammar::Colon => {
            let [day, hhmmss] = parts.as_slice() else {
                warn!(input = text, "date time string parsing error: expected `dd HH:mm:ss`");
                return None;
            };
            let hms: Vec<&str> = hhmmss.split(':').collect();
            let [hour, minute, second] = hms.as_slice() else {
                warn!(input = text, "date time string parsing error: expected `HH:mm:ss`");
                return None;
            };
            Some([*day, *hour, *minute, *second])
        }
        Grammar::Space => {
            let [day, hour, minute, second] = parts.as_slice() else {
                warn!(input = text, "date time string parsing error: expected `dd HH mm ss`");
                return None;
            };
            Some([*day, *hour, *minute, *second])
        }
    }
}

pub fn parse(text: &str, grammar: Grammar) -> Option<DeviceTimeSample> {
    let text = text.trim();
    let tokens = tokens(text, grammar)?;

    let mut values = [0_u32; 4];
    for (slot, token) in values.iter_mut().zip(tokens) {
        let digits = !token.is_empty() && token.bytes().all(|byte| byte.is_ascii_digit());
        match token.parse::<u32>() {
            Ok(value) if digits => *slot = value,
            _ => {
                warn!(input = text, token, "date time component is not a number");
                return None;
            }
        }
    }

    let [day, hour, minute, second] = values;
    let sample = DeviceTimeSample::new(day, hour, minute, second);
    if sample.is_none() {
        warn!(input = text, "date time component out of range");
    }
    sample
}

/// Converts a raw device (UTC) reply to local time. The reply is checked
/// against the colon grammar and then forwarded as-is, single-quoted.
pub fn to_local(gateway: &dyn CommandGateway, utc_reply: &str) -> Option<DeviceTimeSample> {
    let utc_reply = utc_reply.trim();
    parse(utc_reply, Grammar::Colon)?;
    let reply = convert(gateway, FUNC_GET_LOCAL_DATETIME, &quote_arg(utc_reply))?;
    parse(&reply, Grammar::Colon)
}

/// Converts operator text in the space grammar to UTC, forwarding it as typed.
/// Returns the validated reply text in the colon grammar.
pub fn to_utc(gateway: &dyn CommandGateway, local_text: &str) -> Option<String> {
    let local_text = local_text.trim();
    parse(local_text, Grammar::Space)?;
    let reply = convert(gateway, FUNC_GET_UTC_DATETIME, local_text)?;
    parse(&reply, Grammar::Colon).map(|_| reply)
}

fn convert(gateway: &dyn CommandGateway, function: &str, args: &str) -> Option<String> {
    match gateway.invoke(function, Some(args)) {
        Ok(result) => Some(result.trimmed().to_string()),
        Err(err) => {
            warn!("{function} failed: {err}");
            None
        }
    }
}

pub fn parse_clock(text: &str) -> Option<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(text.trim(), CLOCK_FORMAT) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(input = text, "clock value is not `yyyy-MM-dd HH:mm:ss`: {err}");
            None
        }
    }
}

pub fn format_clock(value: &NaiveDateTime) -> String {
    value.format(CLOCK_FORMAT).to_string()
}
