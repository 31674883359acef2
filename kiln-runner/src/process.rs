//! External command execution
//!
//! Thin wrapper over `tokio::process::Command` used by every pipeline step
//! that shells out (git, python, pip, pytest). Commands run to completion;
//! there is no timeout at this layer.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::ProcessError;

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or -1 when the process was killed by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Standard output followed by standard error
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Runs `command` to completion and captures its output
///
/// Standard input is closed so that a command waiting for input fails
/// instead of hanging. A non-zero exit is not an error; only failing to
/// spawn the process is.
pub async fn run(command: &mut Command) -> Result<CommandOutput, ProcessError> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();

    debug!(
        "Running {} {:?}",
        program,
        command.as_std().get_args().collect::<Vec<_>>()
    );

    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| ProcessError {
            program: program.clone(),
            source,
        })?;

    let result = CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if result.success() {
        debug!(
            "{} completed: stdout_len={}, stderr_len={}",
            program,
            result.stdout.len(),
            result.stderr.len()
        );
    } else {
        debug!(
            "{} failed: exit_code={} stderr='{}'",
            program,
            result.exit_code,
            result.stderr.trim()
        );
    }

    Ok(result)
}

/// Returns true when `program --version` can be executed successfully
pub async fn is_available(program: &str) -> bool {
    match run(Command::new(program).arg("--version")).await {
        Ok(output) => output.success(),
        Err(_) => false,
    }
}
