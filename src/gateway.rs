use thiserror::Error;

pub const FUNC_GET_RTC_TIMESTAMP: &str = "get_rtc_timestamp";
pub const FUNC_GET_TEMPERATURE: &str = "get_temperature";
pub const FUNC_SET_RTC_TIME: &str = "set_rtc_time";
pub const FUNC_SYS_TO_RTC: &str = "system_to_rtc";
pub const FUNC_RTC_TO_SYS: &str = "rtc_to_system";
pub const FUNC_GET_LOCAL_DATETIME: &str = "get_local_date_time";
pub const FUNC_GET_UTC_DATETIME: &str = "get_utc_date_time";
pub const FUNC_GET_SHUTDOWN_TIME: &str = "get_shutdown_time";
pub const FUNC_SET_SHUTDOWN_TIME: &str = "set_shutdown_time";
pub const FUNC_CLEAR_SHUTDOWN_TIME: &str = "clear_shutdown_time";
pub const FUNC_GET_STARTUP_TIME: &str = "get_startup_time";
pub const FUNC_SET_STARTUP_TIME: &str = "set_startup_time";
pub const FUNC_CLEAR_STARTUP_TIME: &str = "clear_startup_time";
pub const FUNC_HAS_INTERNET: &str = "has_internet";

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommandResult {
    pub output: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn new(stdout: &str, stderr: &str, exit_code: i32) -> Self {
        Self {
            output: format!("{stdout}\n{stderr}"),
            exit_code,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    pub fn trimmed(&self) -> &str {
        self.output.trim()
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Blocking access to the privileged utility layer.
///
/// Implementations run exactly one external process per call and return only
/// after it exits. A non-zero exit code is reported in the result, never as an
/// error; `Err` means the process could not be started at all.
pub trait CommandGateway {
    fn invoke(&self, function: &str, args: Option<&str>) -> Result<CommandResult, GatewayError>;

    fn run_script(&self, script: &str) -> Result<CommandResult, GatewayError>;

    fn set_host_clock(&self, unix_seconds: i64) -> Result<CommandResult, GatewayError>;
}

pub fn quote_arg(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
