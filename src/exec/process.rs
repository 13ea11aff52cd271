// src/exec/process.rs

//! Production command runner built on `tokio::process::Command`.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::process::Command;
use tracing::{debug, error, info};

use crate::errors::ExecutionError;

use super::command::{
    EnvPolicy, ExecOptions, ExecutionResult, build_command_line, display_name,
};

/// Runs external commands through the platform shell and captures their
/// output.
///
/// Cloning is cheap; clones share the same last-error marker.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    last_error: Arc<Mutex<Option<String>>>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Description of the most recent failed command, if the last call failed.
    pub fn last_error(&self) -> Option<String> {
        self.marker().clone()
    }

    fn set_last_error(&self, message: Option<String>) {
        *self.marker() = message;
    }

    fn marker(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `program args...` to completion.
    ///
    /// Returns `Ok` when the command succeeds or when `options.ignore_error`
    /// is set; otherwise a non-zero exit becomes `ExecutionError::Failed`.
    pub async fn execute(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<ExecutionResult, ExecutionError> {
        let command_line = build_command_line(program, args);
        self.set_last_error(None);

        if options.verbose {
            info!(cmd = %command_line, "=> shell");
        }
        let started = Instant::now();

        let mut cmd = shell_command(&command_line);
        if let Some(dir) = &options.working_dir {
            cmd.current_dir(dir);
        }
        match &options.env {
            EnvPolicy::Inherit => {}
            EnvPolicy::Extend(vars) => {
                cmd.envs(vars);
            }
            EnvPolicy::Replace(vars) => {
                cmd.env_clear().envs(vars);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        if options.child_slot.is_some() {
            cmd.process_group(0);
        }

        let output = match cmd.spawn() {
            Ok(child) => {
                if let Some(slot) = &options.child_slot {
                    slot.set(child.id());
                }
                let output = child.wait_with_output().await;
                if let Some(slot) = &options.child_slot {
                    slot.set(None);
                }
                output
            }
            Err(e) => Err(e),
        }
        .map_err(|source| {
            self.set_last_error(Some(format!("{command_line}: {source}")));
            error!(cmd = %command_line, error = %source, "failed to run command");
            ExecutionError::Spawn {
                command_line: command_line.clone(),
                source,
            }
        })?;

        let result = ExecutionResult {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            error: termination_note(output.status),
        };

        if options.verbose {
            info!(
                program = %display_name(program),
                seconds = format_args!("{:.2}", started.elapsed().as_secs_f64()),
                exit_code = result.code,
                "<= finished"
            );
        }

        if result.code != 0 {
            self.set_last_error(Some(format!(
                "{command_line} exited with code {}",
                result.code
            )));

            if !options.ignore_error {
                error!(
                    cmd = %command_line,
                    code = result.code,
                    stderr = %result.stderr,
                    "command failed"
                );
                return Err(ExecutionError::Failed {
                    command_line,
                    code: result.code,
                    stderr: result.stderr,
                    stdout: result.stdout,
                });
            }

            debug!(cmd = %command_line, code = result.code, "non-zero exit ignored by caller");
        }

        Ok(result)
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    }
}

fn termination_note(status: ExitStatus) -> Option<String> {
    if status.code().is_some() {
        None
    } else {
        Some(format!("process terminated without an exit code ({status})"))
    }
}
