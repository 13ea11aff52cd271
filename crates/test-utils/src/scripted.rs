//! Test doubles for the command runner and the halt action.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildwarden::errors::ExecutionError;
use buildwarden::exec::{CommandRunner, ExecutionResult, Invocation, RunFuture};
use buildwarden::watchdog::Halt;
use tokio::sync::Notify;

/// What one scripted call does before it returns.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCall {
    /// Lines appended to the invocation's `-logFile` target.
    pub log_lines: Vec<String>,
    /// How long the "process" keeps running after writing its lines.
    pub linger: Duration,
    pub code: i32,
}

impl ScriptedCall {
    pub fn exit(code: i32) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    pub fn logging<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            log_lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn linger(mut self, duration: Duration) -> Self {
        self.linger = duration;
        self
    }

    pub fn code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }
}

/// A runner that replays scripted calls in order and records every
/// invocation it receives. Once the script runs out every call exits 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    script: Arc<Mutex<VecDeque<ScriptedCall>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedRunner {
    pub fn new<I>(calls: I) -> Self
    where
        I: IntoIterator<Item = ScriptedCall>,
    {
        Self {
            script: Arc::new(Mutex::new(calls.into_iter().collect())),
            invocations: Arc::default(),
        }
    }

    /// Shorthand for a script of plain exit codes.
    pub fn exit_codes<I>(codes: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        Self::new(codes.into_iter().map(ScriptedCall::exit))
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    /// The `-executeMethod` value of every engine call, in order.
    pub fn executed_methods(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .filter_map(|inv| flag_value(inv, "-executeMethod"))
            .collect()
    }
}

fn flag_value(invocation: &Invocation, flag: &str) -> Option<String> {
    let pos = invocation.args.iter().position(|a| a == flag)?;
    invocation.args.get(pos + 1).cloned()
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> RunFuture<'a> {
        Box::pin(async move {
            self.invocations.lock().unwrap().push(invocation.clone());
            let call = self.script.lock().unwrap().pop_front().unwrap_or_default();

            if !call.log_lines.is_empty() {
                let log = flag_value(invocation, "-logFile")
                    .map(PathBuf::from)
                    .expect("scripted log lines need a -logFile argument");
                let lines: Vec<&str> = call.log_lines.iter().map(String::as_str).collect();
                crate::append_lines(&log, &lines).await;
            }
            if !call.linger.is_zero() {
                tokio::time::sleep(call.linger).await;
            }

            let command_line = invocation.command_line();
            if call.code != 0 && !invocation.options.ignore_error {
                return Err(ExecutionError::Failed {
                    command_line,
                    code: call.code,
                    stderr: String::new(),
                    stdout: String::new(),
                });
            }
            Ok(ExecutionResult {
                code: call.code,
                stdout: String::new(),
                stderr: String::new(),
                error: None,
            })
        })
    }
}

/// Halt action that only records its reasons.
#[derive(Debug, Default)]
pub struct RecordingHalt {
    reasons: Mutex<Vec<String>>,
    notify: Notify,
}

impl RecordingHalt {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reasons(&self) -> Vec<String> {
        self.reasons.lock().unwrap().clone()
    }

    /// Wait until `halt` has been called at least once.
    pub async fn halted(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.reasons.lock().unwrap().is_empty() {
                return;
            }
            notified.await;
        }
    }
}

impl Halt for RecordingHalt {
    fn halt(&self, reason: &str) {
        self.reasons.lock().unwrap().push(reason.to_string());
        self.notify.notify_waiters();
    }
}

/// In-memory writer whose contents stay readable after it is handed away.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
