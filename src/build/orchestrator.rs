// src/build/orchestrator.rs

//! Runs named pipeline steps with watchdog supervision and a retry budget.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::{BuildSection, ConfigFile, WatchdogSettings};
use crate::errors::{BuildError, Result};
use crate::exec::{CommandRunner, ExecOptions, Invocation};
use crate::types::BuildStep;
use crate::watchdog::{Halt, KillByName, LogWatchdog};

use super::engine::EngineCommand;
use super::steps::{StepAction, actions_for};

/// Summary of a successful `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub step: BuildStep,
    /// Number of times the step was started (0 when skipped).
    pub attempts: u32,
    pub skipped: bool,
}

/// Sequences engine calls for a step and decides between retrying,
/// continuing, and giving up.
///
/// The orchestrator owns the single [`LogWatchdog`]; it is started right
/// before every engine call and stopped right after it returns.
pub struct BuildOrchestrator<R: CommandRunner> {
    runner: R,
    engine: EngineCommand,
    watch: WatchdogSettings,
    build: BuildSection,
    watchdog: LogWatchdog,
    /// Receives the engine log when a step fails for good; stdout by default.
    log_dump: Box<dyn Write + Send + Sync>,
}

impl<R: CommandRunner> BuildOrchestrator<R> {
    pub fn new(
        runner: R,
        engine: EngineCommand,
        watch: WatchdogSettings,
        build: BuildSection,
        halt: Arc<dyn Halt>,
    ) -> Self {
        Self {
            runner,
            engine,
            watch,
            build,
            watchdog: LogWatchdog::new(halt),
            log_dump: Box::new(std::io::stdout()),
        }
    }

    /// Send the failure log dump to `sink` instead of stdout.
    pub fn with_log_dump(mut self, sink: impl Write + Send + Sync + 'static) -> Self {
        self.log_dump = Box::new(sink);
        self
    }

    /// Build an orchestrator whose halt action kills the configured engine
    /// process by name.
    pub fn from_config(runner: R, cfg: &ConfigFile) -> Result<Self> {
        let engine = EngineCommand::from_settings(&cfg.engine)?;
        let halt: Arc<dyn Halt> = Arc::new(KillByName::new(cfg.engine.process_name.clone()));
        Ok(Self::new(
            runner,
            engine,
            cfg.watchdog.clone(),
            cfg.build.clone(),
            halt,
        ))
    }

    pub fn engine(&self) -> &EngineCommand {
        &self.engine
    }

    /// Run `step`, re-running the whole step up to `retry` more times while
    /// it exits non-zero.
    ///
    /// Crashes, hangs, and hook failures are not retried. On any terminal
    /// failure the engine log is printed before the error is returned.
    pub async fn run(
        &mut self,
        step: BuildStep,
        retry: u32,
    ) -> std::result::Result<StepReport, BuildError> {
        if self.build.skip {
            info!(%step, "engine build skipped by configuration");
            return Ok(StepReport {
                step,
                attempts: 0,
                skipped: true,
            });
        }

        if let Some(dir) = self.build.clean_output.clone() {
            clear_dir(&dir).await?;
        }

        let mut budget = retry;
        let mut attempts = 0;

        let code = loop {
            attempts += 1;
            info!(%step, attempt = attempts, "running build step");

            let code = match self.run_step_once(step).await {
                Ok(code) => code,
                Err(e) => {
                    error!(%step, error = %e, "build step aborted");
                    self.dump_log().await;
                    return Err(e);
                }
            };

            if code == 0 || budget == 0 {
                break code;
            }
            budget -= 1;
            warn!(%step, code, remaining = budget, "build step failed; retrying");
        };

        if code != 0 {
            error!(%step, code, attempts, "build step failed; retries exhausted");
            self.dump_log().await;
            return Err(BuildError::StepFailed {
                step,
                code,
                attempts,
            });
        }

        info!(%step, attempts, "build step succeeded");
        Ok(StepReport {
            step,
            attempts,
            skipped: false,
        })
    }

    /// One pass over the step's actions; returns the first non-zero code.
    async fn run_step_once(&mut self, step: BuildStep) -> std::result::Result<i32, BuildError> {
        for action in actions_for(step) {
            let code = match action {
                StepAction::Engine(method) => self.execute_engine(method).await?,
                StepAction::ResourceHooks => {
                    self.run_resource_hooks().await?;
                    0
                }
            };

            if code != 0 {
                debug!(%step, ?action, code, "action failed; skipping the rest of the step");
                return Ok(code);
            }
        }
        Ok(0)
    }

    /// Invoke one engine method with the watchdog attached to its log.
    pub async fn execute_engine(&mut self, method: &str) -> std::result::Result<i32, BuildError> {
        let invocation = self.engine.invocation(method);
        let watch = self.watch.watch_config(self.engine.log_file());

        self.watchdog.start(watch).await?;
        let result = self.runner.run(&invocation).await;
        let report = self.watchdog.stop().await;

        if let Some(report) = report {
            if !report.outcome.is_ok() {
                return Err(BuildError::Supervision {
                    outcome: report.outcome,
                    message: report.message.unwrap_or_default(),
                });
            }
        }

        let result = result?;
        debug!(method, code = result.code, "engine method finished");
        Ok(result.code)
    }

    async fn run_resource_hooks(&self) -> std::result::Result<(), BuildError> {
        for hook in &self.build.resource_hooks {
            let invocation = Invocation::new(hook.clone()).options(
                ExecOptions::default().working_dir(self.engine.project_path.clone()),
            );
            self.runner.run(&invocation).await?;
        }
        Ok(())
    }

    /// Print the engine log so the operator gets the raw diagnostic trail.
    async fn dump_log(&mut self) {
        let path = self.engine.log_file();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read engine log");
                return;
            }
        };

        let out = &mut self.log_dump;
        let written = writeln!(out, "----- engine log: {} -----", path.display())
            .and_then(|()| writeln!(out, "{}", String::from_utf8_lossy(&bytes)))
            .and_then(|()| writeln!(out, "----- end of engine log -----"))
            .and_then(|()| out.flush());
        if let Err(e) = written {
            warn!(error = %e, "could not write engine log dump");
        }
    }
}

/// Remove and recreate `dir`.
async fn clear_dir(dir: &Path) -> std::result::Result<(), BuildError> {
    let wrap = |source| BuildError::CleanOutput {
        path: dir.to_path_buf(),
        source,
    };

    if tokio::fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
        tokio::fs::remove_dir_all(dir).await.map_err(wrap)?;
        info!(path = %dir.display(), "removed output directory");
    }
    tokio::fs::create_dir_all(dir).await.map_err(wrap)?;
    Ok(())
}
