// src/watchdog/mod.rs

//! Log watchdog for the supervised build engine.
//!
//! While the engine runs, a background monitor tails its log file and looks
//! for two failure conditions:
//! - a line containing one of the configured crash signatures,
//! - no new output for longer than the active hang window.
//!
//! Either condition halts the engine (see [`halt`]) and is reported back to
//! the owner when it stops the monitor.
//!
//! The pure scan state machine lives in [`core`]; [`tail`] follows the file
//! on disk and [`monitor`] is the async shell that wires them together.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub mod core;
pub mod halt;
pub mod monitor;
pub mod tail;

pub use core::{ScanCore, ScanVerdict};
pub use halt::{Halt, KillByName, KillProcessTree};
pub use monitor::LogWatchdog;

/// Full hang budget when nothing else is configured.
pub const DEFAULT_HANG_TIMEOUT: Duration = Duration::from_secs(3600);

/// How often the monitor checks for new output.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Log phrases the engine prints when it has failed irrecoverably.
pub const DEFAULT_CRASH_SIGNATURES: [&str; 4] = [
    "Receiving unhandled NULL exception",
    "Launching bug reporter",
    "Aborting batchmode due to failure",
    "Assertion failed on expression",
];

/// Log lines that mark the start of a new build phase.
pub const DEFAULT_RESET_MARKERS: [&str; 2] = [
    "=== Build Resource Begin ===",
    "=== Build Player Begin ===",
];

/// Lifecycle of a [`LogWatchdog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WatchState {
    NotMonitoring = 0,
    Monitoring = 1,
    Halted = 2,
}

impl WatchState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => WatchState::Monitoring,
            2 => WatchState::Halted,
            _ => WatchState::NotMonitoring,
        }
    }
}

/// Final verdict of one monitor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Ok,
    Crashed,
    Hung,
}

impl WatchOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, WatchOutcome::Ok)
    }
}

impl fmt::Display for WatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WatchOutcome::Ok => "ok",
            WatchOutcome::Crashed => "crashed",
            WatchOutcome::Hung => "hung",
        })
    }
}

/// What the monitor observed, handed back by [`LogWatchdog::stop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchReport {
    pub outcome: WatchOutcome,
    /// Failure message for `Crashed` / `Hung`.
    pub message: Option<String>,
    /// Number of log lines inspected.
    pub lines_seen: u64,
}

/// Immutable settings for one monitor lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub log_path: PathBuf,
    /// Full hang budget, restored whenever a reset marker is seen.
    pub hang_timeout: Duration,
    /// Shorter window in force until the first reset marker.
    pub initial_timeout: Option<Duration>,
    pub poll_interval: Duration,
    pub crash_signatures: Vec<String>,
    pub reset_markers: Vec<String>,
}

impl WatchConfig {
    /// Config with the engine's default signatures, markers and timings.
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            hang_timeout: DEFAULT_HANG_TIMEOUT,
            initial_timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            crash_signatures: DEFAULT_CRASH_SIGNATURES.iter().map(|s| s.to_string()).collect(),
            reset_markers: DEFAULT_RESET_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn hang_timeout(mut self, timeout: Duration) -> Self {
        self.hang_timeout = timeout;
        self
    }

    pub fn initial_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.initial_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn crash_signatures<I, S>(mut self, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crash_signatures = signatures.into_iter().map(Into::into).collect();
        self
    }

    pub fn reset_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reset_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Window in force when the monitor starts.
    pub fn starting_window(&self) -> Duration {
        self.initial_timeout.unwrap_or(self.hang_timeout)
    }
}
