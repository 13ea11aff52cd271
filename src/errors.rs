// src/errors.rs

//! Crate-wide error aliases and the typed errors of each subsystem.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::BuildStep;
use crate::watchdog::WatchOutcome;

#[derive(Error, Debug)]
pub enum BuildwardenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BuildwardenError>;

/// Failure of a single external command invocation.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The process could not be spawned or waited on.
    #[error("failed to run '{command_line}': {source}")]
    Spawn {
        command_line: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but exited non-zero and the caller did not opt into
    /// `ignore_error`.
    #[error("command failed: {command_line} code: {code} message: {stderr}")]
    Failed {
        command_line: String,
        code: i32,
        stderr: String,
        stdout: String,
    },
}

impl ExecutionError {
    /// Exit code to report for this failure (`-1` when the process never ran).
    pub fn code(&self) -> i32 {
        match self {
            ExecutionError::Spawn { .. } => -1,
            ExecutionError::Failed { code, .. } => *code,
        }
    }
}

/// Misuse or setup failure of the log watchdog.
#[derive(Error, Debug)]
pub enum WatchdogError {
    #[error("watchdog is already monitoring {0:?}; stop it before starting again")]
    AlreadyMonitoring(PathBuf),

    #[error("failed to prepare log file {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal outcome of a pipeline step.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("step {step} failed with exit code {code} after {attempts} attempt(s)")]
    StepFailed {
        step: BuildStep,
        code: i32,
        attempts: u32,
    },

    #[error("engine {outcome}: {message}")]
    Supervision {
        outcome: WatchOutcome,
        message: String,
    },

    #[error("failed to clean output directory {path:?}: {source}")]
    CleanOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Watchdog(#[from] WatchdogError),
}
