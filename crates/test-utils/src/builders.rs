#![allow(dead_code)]

use std::path::Path;

use buildwarden::build::EngineCommand;
use buildwarden::config::{ConfigFile, RawConfigFile};
use buildwarden::types::Platform;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from an engine that is fully configured for `run`, with watchdog
/// timings short enough for real-time tests.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(log_file: &Path) -> Self {
        let mut config = RawConfigFile::default();
        config.engine.binary = Some("/opt/engine/Engine".to_string());
        config.engine.project_path = "project".into();
        config.engine.method_prefix = "CI.Build.".to_string();
        config.engine.platform = Some(Platform::Android);
        config.engine.log_file = Some(log_file.to_path_buf());
        config.watchdog.hang_timeout = "3s".to_string();
        config.watchdog.poll_interval = "50ms".to_string();
        Self { config }
    }

    pub fn with_hang_timeout(mut self, value: &str) -> Self {
        self.config.watchdog.hang_timeout = value.to_string();
        self
    }

    pub fn with_initial_timeout(mut self, value: &str) -> Self {
        self.config.watchdog.initial_timeout = Some(value.to_string());
        self
    }

    pub fn with_poll_interval(mut self, value: &str) -> Self {
        self.config.watchdog.poll_interval = value.to_string();
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.config.build.retry = retry;
        self
    }

    pub fn with_skip(mut self) -> Self {
        self.config.build.skip = true;
        self
    }

    pub fn with_clean_output(mut self, dir: &Path) -> Self {
        self.config.build.clean_output = Some(dir.to_path_buf());
        self
    }

    pub fn with_resource_hook(mut self, cmd: &str) -> Self {
        self.config.build.resource_hooks.push(cmd.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Engine command for a config produced by [`ConfigFileBuilder`].
pub fn engine_for(cfg: &ConfigFile) -> EngineCommand {
    EngineCommand::from_settings(&cfg.engine).expect("builder config has a runnable engine")
}
