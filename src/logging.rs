// src/logging.rs

//! Logging setup for `buildwarden` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `BUILDWARDEN_LOG`, in `EnvFilter` directive syntax
//!    (e.g. "debug" or "buildwarden::watchdog=trace,info")
//! 3. `info`
//!
//! Logs go to STDERR so that stdout carries only command output and the
//! engine log dump.

use anyhow::Result;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

const LOG_ENV: &str = "BUILDWARDEN_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    if let Some(err) = rejected {
        warn!(error = %err, "ignoring invalid {LOG_ENV}; logging at {DEFAULT_DIRECTIVE}");
    }
    Ok(())
}

/// Pick the filter; the second value carries the parse error of a rejected
/// `BUILDWARDEN_LOG` so it can be reported once logging is up.
fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> (EnvFilter, Option<String>) {
    if let Some(lvl) = cli_level {
        return (EnvFilter::new(directive(lvl)), None);
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => match EnvFilter::try_new(value) {
            Ok(filter) => (filter, None),
            Err(e) => (EnvFilter::new(DEFAULT_DIRECTIVE), Some(e.to_string())),
        },
        None => (EnvFilter::new(DEFAULT_DIRECTIVE), None),
    }
}

fn directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
