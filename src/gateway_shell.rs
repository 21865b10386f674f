use std::path::PathBuf;
use std::process::{Command, Output};

use tracing::debug;

use crate::config::ConsoleConfig;
use crate::gateway::{CommandGateway, CommandResult, GatewayError};

pub struct ShellGateway {
    working_dir: PathBuf,
    utilities: String,
    elevate_with: Option<String>,
    shell: String,
}

impl ShellGateway {
    pub fn new(config: &ConsoleConfig) -> Self {
        Self {
            working_dir: config.utility_dir.clone(),
            utilities: config.utilities.clone(),
            elevate_with: config.elevate_with.clone(),
            shell: config.shell.clone(),
        }
    }

    fn utility_line(&self, function: &str, args: Option<&str>) -> String {
        let mut line = format!(". ./{}; {function}", self.utilities);
        if let Some(args) = args.filter(|args| !args.is_empty()) {
            line.push(' ');
            line.push_str(args);
        }
        line
    }

    fn command(&self, program: &str) -> Command {
        let mut command = match &self.elevate_with {
            Some(elevate) => {
                let mut command = Command::new(elevate);
                command.arg(program);
                command
            }
            None => Command::new(program),
        };
        command.current_dir(&self.working_dir);
        command
    }

    fn execute(&self, mut command: Command, label: &str) -> Result<CommandResult, GatewayError> {
        let output = command.output().map_err(|source| GatewayError::Spawn {
            command: label.to_string(),
            source,
        })?;
        let result = to_command_result(&output);
        debug!(command = label, exit_code = result.exit_code, "privileged call finished");
        Ok(result)
    }
}

impl CommandGateway for ShellGateway {
    fn invoke(&self, function: &str, args: Option<&str>) -> Result<CommandResult, GatewayError> {
        let mut command = self.command(&self.shell);
        command.arg("-c").arg(self.utility_line(function, args));
        self.execute(command, function)
    }

    fn run_script(&self, script: &str) -> Result<CommandResult, GatewayError> {
        let command = self.command(&format!("./{script}"));
        self.execute(command, script)
    }

    fn set_host_clock(&self, unix_seconds: i64) -> Result<CommandResult, GatewayError> {
        let mut command = self.command("date");
        command.arg("-s").arg(format!("@{unix_seconds}"));
        self.execute(command, "date -s")
    }
}

fn to_command_result(output: &Output) -> CommandResult {
    CommandResult::new(
        &String::from_utf8_lossy(&output.stdout),
        &String::from_utf8_lossy(&output.stderr),
        output.status.code().unwrap_or(-1),
    )
}
