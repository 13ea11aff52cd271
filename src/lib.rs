// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;
pub mod watchdog;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::build::{BuildOrchestrator, EngineCommand, StepAction, actions_for};
use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, load_and_validate, load_or_default};
use crate::errors::BuildError;
use crate::exec::command::display_name;
use crate::exec::{ChildSlot, ExecOptions, ProcessExecutor};
use crate::types::BuildStep;
use crate::watchdog::{Halt, KillByName, KillProcessTree, LogWatchdog, WatchConfig};

/// Exit status reported when the run is interrupted with Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code on success. Any error means the build run
/// has to end; `main` turns it into a non-zero exit.
///
/// Ctrl-C drops the in-flight work, which kills the supervised child and
/// stops the watchdog.
pub async fn run(args: CliArgs) -> Result<i32> {
    tokio::select! {
        res = dispatch(args) => res,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => warn!("interrupted; stopping"),
                Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
            }
            Ok(INTERRUPTED_EXIT_CODE)
        }
    }
}

async fn dispatch(args: CliArgs) -> Result<i32> {
    match args.command {
        Command::Run { step, retry } => run_step(&args.config, step, retry, args.dry_run).await,
        Command::Supervise {
            log_file,
            process_name,
            hang_timeout,
            command,
        } => {
            let opts = SuperviseOptions {
                log_file,
                process_name,
                hang_timeout,
                command,
            };
            supervise(&args.config, opts, args.dry_run).await
        }
    }
}

async fn run_step(
    config_path: &str,
    step: BuildStep,
    retry: Option<u32>,
    dry_run: bool,
) -> Result<i32> {
    let cfg = load_and_validate(config_path)?;
    let retry = retry.unwrap_or(cfg.build.retry);

    if cfg.build.skip {
        info!(%step, "BUILDWARDEN_SKIP_BUILD / [build].skip set; nothing to do");
        return Ok(0);
    }

    if dry_run {
        print_dry_run(&cfg, step, retry)?;
        return Ok(0);
    }

    let mut orchestrator = BuildOrchestrator::from_config(ProcessExecutor::new(), &cfg)?;
    let report = orchestrator.run(step, retry).await?;
    info!(%step, attempts = report.attempts, "done");
    Ok(0)
}

struct SuperviseOptions {
    log_file: Option<PathBuf>,
    process_name: Option<String>,
    hang_timeout: Option<Duration>,
    command: Vec<String>,
}

/// Run one arbitrary command under the watchdog and report its exit code.
async fn supervise(config_path: &str, opts: SuperviseOptions, dry_run: bool) -> Result<i32> {
    let cfg = load_or_default(config_path)?;
    let (program, args) = opts
        .command
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("supervise needs a command to run"))?;

    let log_file = opts.log_file.unwrap_or_else(|| cfg.engine.log_file.clone());

    let mut watch: WatchConfig = cfg.watchdog.watch_config(log_file);
    if let Some(timeout) = opts.hang_timeout {
        let poll = watch.poll_interval.min(timeout);
        watch = watch
            .hang_timeout(timeout)
            .initial_timeout(None)
            .poll_interval(poll);
    }

    if dry_run {
        println!("buildwarden dry-run");
        println!("  command: {}", exec::command::build_command_line(program, args));
        println!("  log_file: {}", watch.log_path.display());
        match &opts.process_name {
            Some(name) => println!("  halt: kill processes named {name}"),
            None => println!("  halt: kill the process tree of {}", display_name(program)),
        }
        println!("  hang_timeout: {:?}", watch.starting_window());
        println!("  poll_interval: {:?}", watch.poll_interval);
        return Ok(0);
    }

    // Without an explicit name the halt targets the child we spawn, which
    // also covers scripts running under an interpreter.
    let slot = ChildSlot::new();
    let halt: Arc<dyn Halt> = match opts.process_name {
        Some(name) => Arc::new(KillByName::new(name)),
        None => Arc::new(KillProcessTree::new(slot.clone())),
    };
    let mut watchdog = LogWatchdog::new(halt);
    watchdog.start(watch).await?;

    let executor = ProcessExecutor::new();
    let options = ExecOptions::default().ignore_error(true).child_slot(slot);
    let result = executor.execute(program, args, &options).await;
    let report = watchdog.stop().await;

    if let Some(report) = report.filter(|r| !r.outcome.is_ok()) {
        return Err(BuildError::Supervision {
            outcome: report.outcome,
            message: report.message.unwrap_or_default(),
        }
        .into());
    }

    let result = result?;
    if !result.stdout.is_empty() {
        println!("{}", result.stdout);
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", result.stderr);
    }
    Ok(result.code)
}

/// Simple dry-run output: print the step's actions and engine command lines.
fn print_dry_run(cfg: &ConfigFile, step: BuildStep, retry: u32) -> Result<()> {
    let engine = EngineCommand::from_settings(&cfg.engine)?;

    println!("buildwarden dry-run");
    println!("  step = {step}");
    println!("  retry = {retry}");
    println!("  log_file = {}", engine.log_file().display());
    println!("  process_name = {}", cfg.engine.process_name);
    println!(
        "  hang_timeout = {:?} (initial {:?})",
        cfg.watchdog.hang_timeout,
        cfg.watchdog.initial_timeout.unwrap_or(cfg.watchdog.hang_timeout)
    );
    if let Some(ref dir) = cfg.build.clean_output {
        println!("  clean_output = {}", dir.display());
    }
    println!();

    for action in actions_for(step) {
        match action {
            StepAction::Engine(method) => {
                println!("  - {method}");
                println!("      cmd: {}", engine.invocation(method).command_line());
            }
            StepAction::ResourceHooks => {
                for hook in &cfg.build.resource_hooks {
                    println!("  - hook: {hook}");
                }
            }
        }
    }

    Ok(())
}
