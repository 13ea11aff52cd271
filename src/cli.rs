// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::parse_duration;
use crate::types::BuildStep;

/// Command-line arguments for `buildwarden`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildwarden",
    version,
    about = "Drive a batch-mode build engine with crash/hang supervision and retries.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Buildwarden.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Buildwarden.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDWARDEN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Load config and print what would run, but don't execute anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a named build step (RebuildAll, RebuildResource, RefreshUIAtlas,
    /// RecreateRolePrefab).
    Run {
        #[arg(value_name = "STEP")]
        step: BuildStep,

        /// Extra attempts when the step fails; overrides `[build].retry`.
        #[arg(long, value_name = "N")]
        retry: Option<u32>,
    },

    /// Run an arbitrary command with the log watchdog attached.
    Supervise {
        /// Log file the command writes to; defaults to the engine log path.
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,

        /// Process name to kill on crash/hang; by default the process tree
        /// of the supervised command is killed.
        #[arg(long, value_name = "NAME")]
        process_name: Option<String>,

        /// Hang timeout (e.g. "90s", "20m"); overrides `[watchdog]`.
        #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
        hang_timeout: Option<Duration>,

        /// Command and arguments, after `--`.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
