// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The orchestrator talks to a `CommandRunner` instead of spawning processes
//! itself. Production code uses [`ProcessExecutor`]; tests can provide their
//! own runner that, for example, replays scripted exit codes and writes
//! synthetic lines into the engine log.

use std::future::Future;
use std::pin::Pin;

use crate::errors::ExecutionError;

use super::command::{ExecutionResult, Invocation};
use super::process::ProcessExecutor;

/// Boxed future returned by [`CommandRunner::run`].
pub type RunFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExecutionResult, ExecutionError>> + Send + 'a>>;

/// Trait abstracting how external commands are executed.
pub trait CommandRunner: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// Must honour `invocation.options.ignore_error`: a non-zero exit is an
    /// `Err(ExecutionError::Failed)` unless the caller opted out.
    fn run<'a>(&'a self, invocation: &'a Invocation) -> RunFuture<'a>;
}

impl CommandRunner for ProcessExecutor {
    fn run<'a>(&'a self, invocation: &'a Invocation) -> RunFuture<'a> {
        Box::pin(async move {
            self.execute(&invocation.program, &invocation.args, &invocation.options)
                .await
        })
    }
}
