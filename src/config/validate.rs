// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ConfigFile, EngineSettings, RawConfigFile, WatchdogSection, WatchdogSettings,
    process_name_for,
};
use crate::errors::{BuildwardenError, Result};

/// Log file used when neither the config nor the loader supplied one.
const FALLBACK_LOG_NAME: &str = "engine_build.log";

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BuildwardenError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_engine(&raw)?;
        let watchdog = validate_watchdog(&raw.watchdog)?;

        let engine = raw.engine;
        let process_name = engine
            .process_name
            .unwrap_or_else(|| process_name_for(engine.binary.as_deref()));

        Ok(ConfigFile {
            engine: EngineSettings {
                binary: engine.binary,
                project_path: engine.project_path,
                method_prefix: engine.method_prefix,
                platform: engine.platform,
                log_file: engine
                    .log_file
                    .unwrap_or_else(|| std::env::temp_dir().join(FALLBACK_LOG_NAME)),
                process_name,
                extra_args: engine.extra_args,
            },
            watchdog,
            build: raw.build,
        })
    }
}

fn config_error(msg: impl Into<String>) -> BuildwardenError {
    BuildwardenError::ConfigError(msg.into())
}

fn validate_engine(cfg: &RawConfigFile) -> Result<()> {
    if let Some(binary) = &cfg.engine.binary {
        if binary.trim().is_empty() {
            return Err(config_error("[engine].binary must not be empty"));
        }
    }
    if let Some(name) = &cfg.engine.process_name {
        if name.trim().is_empty() {
            return Err(config_error("[engine].process_name must not be empty"));
        }
    }
    Ok(())
}

fn positive_duration(field: &str, value: &str) -> Result<Duration> {
    let dur = parse_duration(value)
        .map_err(|e| config_error(format!("[watchdog].{field}: {e}")))?;
    if dur.is_zero() {
        return Err(config_error(format!(
            "[watchdog].{field} must be greater than zero (got \"{value}\")"
        )));
    }
    Ok(dur)
}

fn no_empty_entries(field: &str, items: &[String]) -> Result<()> {
    if items.iter().any(|s| s.is_empty()) {
        return Err(config_error(format!(
            "[watchdog].{field} must not contain empty strings"
        )));
    }
    Ok(())
}

fn validate_watchdog(section: &WatchdogSection) -> Result<WatchdogSettings> {
    let hang_timeout = positive_duration("hang_timeout", &section.hang_timeout)?;
    let poll_interval = positive_duration("poll_interval", &section.poll_interval)?;
    let initial_timeout = section
        .initial_timeout
        .as_deref()
        .map(|s| positive_duration("initial_timeout", s))
        .transpose()?;

    if let Some(initial) = initial_timeout.filter(|i| *i > hang_timeout) {
        return Err(config_error(format!(
            "[watchdog].initial_timeout ({initial:?}) must not exceed \
             hang_timeout ({hang_timeout:?})"
        )));
    }

    let shortest_window = initial_timeout.unwrap_or(hang_timeout);
    if poll_interval > shortest_window {
        return Err(config_error(format!(
            "[watchdog].poll_interval ({poll_interval:?}) must not exceed \
             the hang timeout ({shortest_window:?})"
        )));
    }

    no_empty_entries("crash_signatures", &section.crash_signatures)?;
    no_empty_entries("reset_markers", &section.reset_markers)?;

    Ok(WatchdogSettings {
        hang_timeout,
        initial_timeout,
        poll_interval,
        crash_signatures: section.crash_signatures.clone(),
        reset_markers: section.reset_markers.clone(),
    })
}
