// src/watchdog/monitor.rs

//! Async shell around [`ScanCore`]: owns the background tasks of one
//! monitor lifecycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::errors::WatchdogError;

use super::core::{ScanCore, ScanVerdict};
use super::halt::Halt;
use super::tail::{LogTail, ensure_log_file, spawn_tail};
use super::{WatchConfig, WatchOutcome, WatchReport, WatchState};

/// Lines buffered between the tail task and the scanner.
const LINE_CHANNEL_CAPACITY: usize = 256;

/// Upper bound on how long the tail task sleeps at end of file, so crash
/// lines are picked up quickly even with a long poll interval.
const MAX_TAIL_INTERVAL: Duration = Duration::from_millis(250);

/// Background tasks of the monitor currently running.
struct ActiveMonitor {
    path: PathBuf,
    stop_tx: oneshot::Sender<()>,
    scan: JoinHandle<WatchReport>,
    tail: JoinHandle<()>,
}

/// Supervises one engine log at a time.
///
/// `start` and `stop` must be paired: a second `start` before `stop` is
/// rejected with [`WatchdogError::AlreadyMonitoring`].
pub struct LogWatchdog {
    halt: Arc<dyn Halt>,
    state: Arc<AtomicU8>,
    active: Option<ActiveMonitor>,
}

impl std::fmt::Debug for LogWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWatchdog")
            .field("state", &self.state())
            .field("path", &self.active.as_ref().map(|a| &a.path))
            .finish_non_exhaustive()
    }
}

impl LogWatchdog {
    pub fn new(halt: Arc<dyn Halt>) -> Self {
        Self {
            halt,
            state: Arc::new(AtomicU8::new(WatchState::NotMonitoring as u8)),
            active: None,
        }
    }

    pub fn state(&self) -> WatchState {
        WatchState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Begin monitoring `config.log_path`.
    ///
    /// When this returns `Ok`, the log file exists and the read position is
    /// fixed at its current end, so the engine may be launched right away.
    pub async fn start(&mut self, config: WatchConfig) -> Result<(), WatchdogError> {
        if let Some(active) = &self.active {
            warn!(path = %active.path.display(), "log watchdog is already monitoring");
            return Err(WatchdogError::AlreadyMonitoring(active.path.clone()));
        }

        let path = config.log_path.clone();
        let log_file_error = |source| WatchdogError::LogFile {
            path: path.clone(),
            source,
        };
        ensure_log_file(&path).await.map_err(log_file_error)?;
        let tail = LogTail::open_at_end(&path).await.map_err(log_file_error)?;

        let (line_tx, line_rx) = mpsc::channel::<String>(LINE_CHANNEL_CAPACITY);
        let tail = spawn_tail(tail, line_tx, config.poll_interval.min(MAX_TAIL_INTERVAL));

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        self.state
            .store(WatchState::Monitoring as u8, Ordering::Release);

        info!(
            path = %path.display(),
            hang_timeout_secs = config.hang_timeout.as_secs_f64(),
            window_secs = config.starting_window().as_secs_f64(),
            "log watchdog started"
        );

        let scan = tokio::spawn(scan_loop(
            ScanCore::new(&config),
            config.poll_interval,
            line_rx,
            stop_rx,
            Arc::clone(&self.halt),
            Arc::clone(&self.state),
        ));

        self.active = Some(ActiveMonitor {
            path,
            stop_tx,
            scan,
            tail,
        });
        Ok(())
    }

    /// Stop monitoring and collect the report.
    ///
    /// Returns `None` if no monitor was running. The scanner notices the
    /// request within one poll interval.
    pub async fn stop(&mut self) -> Option<WatchReport> {
        let active = self.active.take()?;

        // The scanner may already have halted on its own.
        let _ = active.stop_tx.send(());

        let report = match active.scan.await {
            Ok(report) => report,
            Err(e) => {
                warn!(path = %active.path.display(), error = %e, "log monitor task failed");
                WatchReport {
                    outcome: WatchOutcome::Ok,
                    message: Some(format!("monitor task failed: {e}")),
                    lines_seen: 0,
                }
            }
        };

        if let Err(e) = active.tail.await {
            debug!(path = %active.path.display(), error = %e, "log tail task ended abnormally");
        }

        self.state
            .store(WatchState::NotMonitoring as u8, Ordering::Release);
        info!(
            path = %active.path.display(),
            outcome = %report.outcome,
            lines = report.lines_seen,
            "log watchdog stopped"
        );
        Some(report)
    }
}

enum ScanEvent {
    Line(String),
    Idle,
    TailClosed,
}

async fn next_event(
    lines: &mut mpsc::Receiver<String>,
    tail_open: bool,
    poll: Duration,
) -> ScanEvent {
    if !tail_open {
        sleep(poll).await;
        return ScanEvent::Idle;
    }

    match timeout(poll, lines.recv()).await {
        Ok(Some(line)) => ScanEvent::Line(line),
        Ok(None) => ScanEvent::TailClosed,
        Err(_elapsed) => ScanEvent::Idle,
    }
}

async fn scan_loop(
    mut core: ScanCore,
    poll: Duration,
    mut lines: mpsc::Receiver<String>,
    mut stop_rx: oneshot::Receiver<()>,
    halt: Arc<dyn Halt>,
    state: Arc<AtomicU8>,
) -> WatchReport {
    let mut tail_open = true;

    loop {
        let verdict = tokio::select! {
            biased;

            // An explicit stop and a dropped watchdog both end monitoring.
            _ = &mut stop_rx => {
                debug!(lines = core.lines_seen(), "stop requested; log monitor exiting");
                return core.report(ScanVerdict::Continue);
            }

            event = next_event(&mut lines, tail_open, poll) => match event {
                ScanEvent::Line(line) => core.on_line(&line),
                ScanEvent::Idle => core.on_idle(poll),
                ScanEvent::TailClosed => {
                    warn!("log tail closed; only hang detection remains active");
                    tail_open = false;
                    ScanVerdict::Continue
                }
            },
        };

        if let ScanVerdict::Crashed(message) | ScanVerdict::Hung(message) = &verdict {
            state.store(WatchState::Halted as u8, Ordering::Release);
            error!(idle_secs = core.idle().as_secs_f64(), "{message}");
            halt.halt(message);
            return core.report(verdict);
        }
    }
}
