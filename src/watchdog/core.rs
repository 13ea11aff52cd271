// src/watchdog/core.rs

//! Pure scan state machine.
//!
//! `ScanCore` consumes two kinds of input:
//! - a log line that was appended to the file,
//! - a poll interval that elapsed without any new line,
//!
//! and answers whether monitoring should continue. It owns no channels,
//! timers, or files, so every timing rule can be tested with synthetic time.

use std::time::Duration;

use tracing::debug;

use super::{WatchConfig, WatchOutcome, WatchReport};

/// Decision after feeding one input into the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    Continue,
    Crashed(String),
    Hung(String),
}

impl ScanVerdict {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanVerdict::Continue)
    }
}

#[derive(Debug, Clone)]
pub struct ScanCore {
    crash_signatures: Vec<String>,
    reset_markers: Vec<String>,
    full_budget: Duration,
    window: Duration,
    idle: Duration,
    lines_seen: u64,
}

impl ScanCore {
    pub fn new(config: &WatchConfig) -> Self {
        let non_empty = |items: &[String]| -> Vec<String> {
            items.iter().filter(|s| !s.is_empty()).cloned().collect()
        };

        Self {
            crash_signatures: non_empty(&config.crash_signatures),
            reset_markers: non_empty(&config.reset_markers),
            full_budget: config.hang_timeout,
            window: config.starting_window(),
            idle: Duration::ZERO,
            lines_seen: 0,
        }
    }

    /// Idle time accumulated since the last line.
    pub fn idle(&self) -> Duration {
        self.idle
    }

    /// Hang window currently in force.
    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    /// A new line was read from the log.
    ///
    /// Crash signatures win over reset markers when a line carries both.
    pub fn on_line(&mut self, line: &str) -> ScanVerdict {
        self.lines_seen += 1;
        self.idle = Duration::ZERO;

        if let Some(signature) = self.crash_signatures.iter().find(|s| line.contains(s.as_str())) {
            return ScanVerdict::Crashed(format!(
                "engine crashed or failed (matched \"{signature}\")"
            ));
        }

        if self.reset_markers.iter().any(|m| line.contains(m.as_str())) {
            debug!(
                window_secs = self.full_budget.as_secs_f64(),
                "reset marker seen; widening hang window to the full budget"
            );
            self.window = self.window.max(self.full_budget);
        }

        ScanVerdict::Continue
    }

    /// `elapsed` passed without a new line.
    pub fn on_idle(&mut self, elapsed: Duration) -> ScanVerdict {
        self.idle += elapsed;
        if self.idle >= self.window {
            ScanVerdict::Hung(format!(
                "engine hung for a long time ({:.0} seconds without log output)",
                self.idle.as_secs_f64()
            ))
        } else {
            ScanVerdict::Continue
        }
    }

    pub fn report(&self, verdict: ScanVerdict) -> WatchReport {
        let (outcome, message) = match verdict {
            ScanVerdict::Continue => (WatchOutcome::Ok, None),
            ScanVerdict::Crashed(msg) => (WatchOutcome::Crashed, Some(msg)),
            ScanVerdict::Hung(msg) => (WatchOutcome::Hung, Some(msg)),
        };
        WatchReport {
            outcome,
            message,
            lines_seen: self.lines_seen,
        }
    }
}
