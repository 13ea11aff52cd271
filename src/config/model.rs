// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::Platform;
use crate::watchdog::{
    DEFAULT_CRASH_SIGNATURES, DEFAULT_RESET_MARKERS, WatchConfig,
};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [engine]
/// binary = "/Applications/Engine/Engine.app/Contents/MacOS/Engine"
/// project_path = ".."
/// method_prefix = "Studio.Build.ContinuousIntegration."
/// platform = "ios"
///
/// [watchdog]
/// hang_timeout = "3600s"
///
/// [build]
/// retry = 2
/// ```
///
/// All sections are optional; `run` additionally needs `engine.binary` and
/// `engine.platform` (the latter may come from `BUILDWARDEN_PLATFORM`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub watchdog: WatchdogSection,

    #[serde(default)]
    pub build: BuildSection,
}

/// `[engine]` section: how to launch the build engine in batch mode.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Path to the engine executable.
    #[serde(default)]
    pub binary: Option<String>,

    /// Project directory passed as `-projectPath`.
    #[serde(default = "default_project_path")]
    pub project_path: PathBuf,

    /// Prepended to every method name passed as `-executeMethod`.
    #[serde(default)]
    pub method_prefix: String,

    #[serde(default)]
    pub platform: Option<Platform>,

    /// Engine log file (`-logFile`); defaults to a per-job temp path.
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Process name used by the halt action; defaults to the binary's
    /// file name.
    #[serde(default)]
    pub process_name: Option<String>,

    /// Extra `key value` pairs appended to the engine command line.
    #[serde(default)]
    pub extra_args: BTreeMap<String, String>,
}

fn default_project_path() -> PathBuf {
    PathBuf::from(".")
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            binary: None,
            project_path: default_project_path(),
            method_prefix: String::new(),
            platform: None,
            log_file: None,
            process_name: None,
            extra_args: BTreeMap::new(),
        }
    }
}

/// `[watchdog]` section. Durations are strings such as `"5s"` or `"1h"`.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogSection {
    #[serde(default = "default_hang_timeout")]
    pub hang_timeout: String,

    /// Shorter hang window in force until the first reset marker.
    #[serde(default)]
    pub initial_timeout: Option<String>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_crash_signatures")]
    pub crash_signatures: Vec<String>,

    #[serde(default = "default_reset_markers")]
    pub reset_markers: Vec<String>,
}

fn default_hang_timeout() -> String {
    "3600s".to_string()
}

fn default_poll_interval() -> String {
    "5s".to_string()
}

fn default_crash_signatures() -> Vec<String> {
    DEFAULT_CRASH_SIGNATURES.iter().map(|s| s.to_string()).collect()
}

fn default_reset_markers() -> Vec<String> {
    DEFAULT_RESET_MARKERS.iter().map(|s| s.to_string()).collect()
}

impl Default for WatchdogSection {
    fn default() -> Self {
        Self {
            hang_timeout: default_hang_timeout(),
            initial_timeout: None,
            poll_interval: default_poll_interval(),
            crash_signatures: default_crash_signatures(),
            reset_markers: default_reset_markers(),
        }
    }
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct BuildSection {
    /// Extra attempts for a failing step.
    #[serde(default)]
    pub retry: u32,

    /// Skip the engine build entirely and report success.
    #[serde(default)]
    pub skip: bool,

    /// Directory whose contents are removed before the step runs.
    #[serde(default)]
    pub clean_output: Option<PathBuf>,

    /// Shell commands run after a successful resource build.
    #[serde(default)]
    pub resource_hooks: Vec<String>,
}

/// Validated configuration.
///
/// Obtain one through [`crate::config::load_and_validate`] or
/// `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub engine: EngineSettings,
    pub watchdog: WatchdogSettings,
    pub build: BuildSection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub binary: Option<String>,
    pub project_path: PathBuf,
    pub method_prefix: String,
    pub platform: Option<Platform>,
    pub log_file: PathBuf,
    pub process_name: String,
    pub extra_args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogSettings {
    pub hang_timeout: Duration,
    pub initial_timeout: Option<Duration>,
    pub poll_interval: Duration,
    pub crash_signatures: Vec<String>,
    pub reset_markers: Vec<String>,
}

impl WatchdogSettings {
    /// Monitor settings for the given log file.
    pub fn watch_config(&self, log_path: impl Into<PathBuf>) -> WatchConfig {
        WatchConfig::new(log_path)
            .hang_timeout(self.hang_timeout)
            .initial_timeout(self.initial_timeout)
            .poll_interval(self.poll_interval)
            .crash_signatures(self.crash_signatures.iter().cloned())
            .reset_markers(self.reset_markers.iter().cloned())
    }
}

/// Process name the halt action targets when none is configured.
pub(crate) fn process_name_for(binary: Option<&str>) -> String {
    binary
        .and_then(|b| Path::new(b).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("Unity")
        .to_string()
}
