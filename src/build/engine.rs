// src/build/engine.rs

//! Batch-mode command line of the build engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::EngineSettings;
use crate::errors::{BuildwardenError, Result};
use crate::exec::{ExecOptions, Invocation};

/// Everything needed to launch one engine method in batch mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub binary: String,
    pub project_path: PathBuf,
    pub method_prefix: String,
    pub build_target: String,
    pub log_file: PathBuf,
    pub extra_args: BTreeMap<String, String>,
}

impl EngineCommand {
    /// Requires `binary` and `platform` to be configured.
    pub fn from_settings(settings: &EngineSettings) -> Result<Self> {
        let binary = settings.binary.clone().ok_or_else(|| {
            BuildwardenError::ConfigError("[engine].binary is required to run a build".to_string())
        })?;
        let platform = settings.platform.ok_or_else(|| {
            BuildwardenError::ConfigError(
                "[engine].platform (or BUILDWARDEN_PLATFORM) is required to run a build"
                    .to_string(),
            )
        })?;

        Ok(Self {
            binary,
            project_path: settings.project_path.clone(),
            method_prefix: settings.method_prefix.clone(),
            build_target: platform.build_target().to_string(),
            log_file: settings.log_file.clone(),
            extra_args: settings.extra_args.clone(),
        })
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Invocation of `method`. Non-zero exits are returned to the caller,
    /// which owns the retry decision.
    pub fn invocation(&self, method: &str) -> Invocation {
        let mut args = vec![
            "-batchmode".to_string(),
            "-quit".to_string(),
            "-projectPath".to_string(),
            self.project_path.display().to_string(),
            "-executeMethod".to_string(),
            format!("{}{}", self.method_prefix, method),
            "-buildTarget".to_string(),
            self.build_target.clone(),
            "-nographics".to_string(),
            "-logFile".to_string(),
            self.log_file.display().to_string(),
        ];
        for (key, value) in &self.extra_args {
            args.push(key.clone());
            args.push(value.clone());
        }

        Invocation::new(self.binary.clone())
            .args(args)
            .options(ExecOptions::default().ignore_error(true))
    }
}
