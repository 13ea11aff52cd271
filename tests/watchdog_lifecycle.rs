// tests/watchdog_lifecycle.rs

mod common;

use std::time::{Duration, Instant};

use buildwarden::errors::WatchdogError;
use buildwarden::watchdog::{LogWatchdog, WatchOutcome, WatchState};
use buildwarden_test_utils::scripted::RecordingHalt;
use common::{POLL, append_lines, init_tracing, watch_config, with_timeout};

/// Allowance for task scheduling on a busy test machine.
const SLACK: Duration = Duration::from_millis(200);

#[tokio::test]
async fn crash_line_in_a_fresh_log_halts_the_engine() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("nested").join("engine.log");

    let halt = RecordingHalt::new();
    let mut watchdog = LogWatchdog::new(halt.clone());
    watchdog
        .start(watch_config(&log, Duration::from_secs(5)))
        .await
        .unwrap();

    assert!(log.exists(), "start must create the log file");
    assert_eq!(watchdog.state(), WatchState::Monitoring);

    let writer_log = log.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        append_lines(&writer_log, &["Loading assets", "Launching bug reporter"]).await;
    });

    with_timeout(halt.halted()).await;
    assert_eq!(watchdog.state(), WatchState::Halted);

    let report = watchdog.stop().await.unwrap();
    assert_eq!(report.outcome, WatchOutcome::Crashed);
    assert!(report.message.unwrap().contains("Launching bug reporter"));
    assert_eq!(report.lines_seen, 2);
    assert_eq!(halt.reasons().len(), 1);
    assert_eq!(watchdog.state(), WatchState::NotMonitoring);
}

#[tokio::test]
async fn silent_log_is_reported_as_hung_after_the_window() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("engine.log");
    let timeout = Duration::from_millis(400);

    let halt = RecordingHalt::new();
    let mut watchdog = LogWatchdog::new(halt.clone());
    let started = Instant::now();
    watchdog.start(watch_config(&log, timeout)).await.unwrap();

    with_timeout(halt.halted()).await;
    let elapsed = started.elapsed();
    assert!(
        elapsed >= timeout,
        "halted after {elapsed:?}, before the {timeout:?} window"
    );
    assert!(
        elapsed <= timeout + POLL + SLACK,
        "halted after {elapsed:?}, more than one poll past the {timeout:?} window"
    );

    let report = watchdog.stop().await.unwrap();
    assert_eq!(report.outcome, WatchOutcome::Hung);
    assert!(report.message.unwrap().contains("without log output"));
}

#[tokio::test]
async fn steady_output_keeps_the_engine_alive() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("engine.log");

    let halt = RecordingHalt::new();
    let mut watchdog = LogWatchdog::new(halt.clone());
    watchdog
        .start(watch_config(&log, Duration::from_millis(400)))
        .await
        .unwrap();

    for i in 0..10 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        append_lines(&log, &[&format!("compiling shader {i}")]).await;
    }
    // Let the tail pick up the last line.
    tokio::time::sleep(Duration::from_millis(150)).await;

    let report = watchdog.stop().await.unwrap();
    assert_eq!(report.outcome, WatchOutcome::Ok);
    assert_eq!(report.lines_seen, 10);
    assert!(halt.reasons().is_empty());
}

#[tokio::test]
async fn reset_marker_extends_a_short_initial_window() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("engine.log");

    let halt = RecordingHalt::new();
    let mut watchdog = LogWatchdog::new(halt.clone());
    let config = watch_config(&log, Duration::from_millis(900))
        .initial_timeout(Some(Duration::from_millis(300)));
    let started = Instant::now();
    watchdog.start(config).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    append_lines(&log, &["=== Build Resource Begin ==="]).await;

    with_timeout(halt.halted()).await;
    assert!(
        started.elapsed() >= Duration::from_millis(900),
        "full budget was not restored; halted after {:?}",
        started.elapsed()
    );

    let report = watchdog.stop().await.unwrap();
    assert_eq!(report.outcome, WatchOutcome::Hung);
}

#[tokio::test]
async fn content_written_before_start_is_ignored() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("engine.log");
    std::fs::write(&log, "Launching bug reporter\n").unwrap();

    let halt = RecordingHalt::new();
    let mut watchdog = LogWatchdog::new(halt.clone());
    watchdog
        .start(watch_config(&log, Duration::from_secs(5)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let report = watchdog.stop().await.unwrap();
    assert_eq!(report.outcome, WatchOutcome::Ok);
    assert_eq!(report.lines_seen, 0);
    assert!(halt.reasons().is_empty());
}

#[tokio::test]
async fn second_start_is_rejected_until_stopped() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("engine.log");

    let mut watchdog = LogWatchdog::new(RecordingHalt::new());
    watchdog
        .start(watch_config(&log, Duration::from_secs(5)))
        .await
        .unwrap();

    match watchdog
        .start(watch_config(&log, Duration::from_secs(5)))
        .await
    {
        Err(WatchdogError::AlreadyMonitoring(path)) => assert_eq!(path, log),
        other => panic!("expected AlreadyMonitoring, got {other:?}"),
    }
    assert_eq!(watchdog.state(), WatchState::Monitoring);

    assert!(watchdog.stop().await.is_some());
    assert_eq!(watchdog.state(), WatchState::NotMonitoring);

    // The same watchdog can supervise the next engine call.
    watchdog
        .start(watch_config(&log, Duration::from_secs(5)))
        .await
        .unwrap();
    let report = watchdog.stop().await.unwrap();
    assert_eq!(report.outcome, WatchOutcome::Ok);
}

#[tokio::test]
async fn stop_without_start_returns_nothing() {
    let mut watchdog = LogWatchdog::new(RecordingHalt::new());
    assert!(watchdog.stop().await.is_none());
    assert_eq!(watchdog.state(), WatchState::NotMonitoring);
}

#[tokio::test]
async fn stop_ends_a_running_monitor_within_one_poll() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("engine.log");

    let mut watchdog = LogWatchdog::new(RecordingHalt::new());
    watchdog
        .start(watch_config(&log, Duration::from_secs(5)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(220)).await;

    let requested = Instant::now();
    let report = watchdog.stop().await.unwrap();
    let latency = requested.elapsed();

    assert_eq!(report.outcome, WatchOutcome::Ok);
    assert_eq!(watchdog.state(), WatchState::NotMonitoring);
    assert!(
        latency <= POLL + SLACK,
        "stop took {latency:?}, longer than one {POLL:?} poll"
    );
}
