// src/watchdog/halt.rs

//! Halt action: forced termination of the supervised engine.

use std::fmt::Debug;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::exec::ChildSlot;

/// Forcibly stop the supervised process.
///
/// Implementations must return promptly: fire the kill and move on, never
/// wait for the process to actually exit. A missing process is not an error.
pub trait Halt: Send + Sync + Debug {
    fn halt(&self, reason: &str);
}

/// Kill every process with the given name.
///
/// Uses `pkill -x` on Unix and `taskkill /F /IM` on Windows.
#[derive(Debug, Clone)]
pub struct KillByName {
    process_name: String,
}

impl KillByName {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
        }
    }

    fn kill_command(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("taskkill");
            c.args(["/F", "/IM", self.process_name.as_str()]);
            c
        } else {
            let mut c = Command::new("pkill");
            c.args(["-x", self.process_name.as_str()]);
            c
        }
    }
}

impl Halt for KillByName {
    fn halt(&self, reason: &str) {
        warn!(process = %self.process_name, reason, "halting supervised process");
        launch_kill(self.kill_command(), self.process_name.clone());
    }
}

/// Kill the process tree of a child started by the executor.
///
/// The executor publishes the child's pid in the shared [`ChildSlot`]; on
/// Unix that child leads its own process group, so interpreters and the
/// processes they started go down with it. Uses `kill -KILL -- -<pgid>` on
/// Unix and `taskkill /F /T /PID` on Windows.
#[derive(Debug, Clone)]
pub struct KillProcessTree {
    slot: ChildSlot,
}

impl KillProcessTree {
    pub fn new(slot: ChildSlot) -> Self {
        Self { slot }
    }

    fn kill_command(pid: u32) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("taskkill");
            c.args(["/F", "/T", "/PID", pid.to_string().as_str()]);
            c
        } else {
            let mut c = Command::new("kill");
            c.args(["-KILL", "--", format!("-{pid}").as_str()]);
            c
        }
    }
}

impl Halt for KillProcessTree {
    fn halt(&self, reason: &str) {
        let Some(pid) = self.slot.pid() else {
            warn!(reason, "halt requested but no supervised child is running");
            return;
        };
        warn!(pid, reason, "halting supervised process tree");
        launch_kill(Self::kill_command(pid), format!("pid {pid}"));
    }
}

/// Spawn a kill helper and reap it in the background; its exit code only
/// says whether anything matched.
fn launch_kill(mut cmd: Command, target: String) {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    match cmd.spawn() {
        Ok(mut child) => {
            tokio::spawn(async move {
                match child.wait().await {
                    Ok(status) => debug!(%target, %status, "kill helper finished"),
                    Err(e) => debug!(%target, error = %e, "kill helper wait failed"),
                }
            });
        }
        Err(e) => warn!(%target, error = %e, "failed to launch kill helper"),
    }
}
