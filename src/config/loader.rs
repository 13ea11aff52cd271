// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BuildwardenError, Result};
use crate::types::Platform;

/// Any value skips the engine build.
pub const ENV_SKIP_BUILD: &str = "BUILDWARDEN_SKIP_BUILD";
/// Directory to clear before building.
pub const ENV_CLEAN_BUILD: &str = "BUILDWARDEN_CLEAN_BUILD";
pub const ENV_PLATFORM: &str = "BUILDWARDEN_PLATFORM";
/// Initial hang window (e.g. `"600s"`). The first reset marker widens it
/// to the full budget; a longer value raises the budget as well.
pub const ENV_HANG_TIMEOUT: &str = "BUILDWARDEN_HANG_TIMEOUT";
pub const ENV_RETRY: &str = "BUILDWARDEN_RETRY";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** apply
/// environment overrides or validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file, apply `BUILDWARDEN_*` overrides from the
/// process environment, and validate the result.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw = load_from_path(path)?;
    finish(raw, |key| std::env::var(key).ok())
}

/// Same as [`load_and_validate`], but a missing file yields the built-in
/// defaults instead of an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw = if path.exists() {
        load_from_path(path)?
    } else {
        debug!(path = %path.display(), "config file not found; using defaults");
        RawConfigFile::default()
    };
    finish(raw, |key| std::env::var(key).ok())
}

/// Apply overrides from `lookup`, fill in the default log path, validate.
pub fn finish<F>(mut raw: RawConfigFile, lookup: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(&mut raw, &lookup)?;
    if raw.engine.log_file.is_none() {
        raw.engine.log_file = Some(default_log_path(&lookup));
    }
    ConfigFile::try_from(raw)
}

/// Overlay environment-provided settings onto the file configuration.
pub fn apply_env_overrides<F>(raw: &mut RawConfigFile, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if lookup(ENV_SKIP_BUILD).is_some() {
        raw.build.skip = true;
    }

    if let Some(dir) = lookup(ENV_CLEAN_BUILD).filter(|s| !s.trim().is_empty()) {
        raw.build.clean_output = Some(PathBuf::from(dir));
    }

    if let Some(platform) = lookup(ENV_PLATFORM) {
        let platform: Platform = platform
            .parse()
            .map_err(|e: String| BuildwardenError::ConfigError(format!("{ENV_PLATFORM}: {e}")))?;
        raw.engine.platform = Some(platform);
    }

    if let Some(timeout) = lookup(ENV_HANG_TIMEOUT) {
        let window = parse_duration(&timeout)
            .map_err(|e| BuildwardenError::ConfigError(format!("{ENV_HANG_TIMEOUT}: {e}")))?;
        // A window longer than the file's budget raises the budget too, so
        // a reset marker never cuts it back.
        let budget = parse_duration(&raw.watchdog.hang_timeout).ok();
        if budget.is_none_or(|b| window > b) {
            raw.watchdog.hang_timeout = timeout.clone();
        }
        raw.watchdog.initial_timeout = Some(timeout);
    }

    if let Some(retry) = lookup(ENV_RETRY) {
        raw.build.retry = retry.trim().parse().map_err(|e| {
            let msg = format!("{ENV_RETRY}: invalid retry count '{retry}': {e}");
            BuildwardenError::ConfigError(msg)
        })?;
    }

    Ok(())
}

/// Per-user, per-job engine log location under the system temp dir.
pub fn default_log_path<F>(lookup: &F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let user = lookup("USER")
        .or_else(|| lookup("USERNAME"))
        .unwrap_or_else(|| "user".to_string());
    let job = lookup("JOB_NAME").unwrap_or_default();
    let job_dir = if job.is_empty() { "local" } else { job.as_str() };

    std::env::temp_dir()
        .join(format!("{user}_{job_dir}"))
        .join(format!("engine_build{job}.log"))
}
