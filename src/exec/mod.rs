// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running external commands, using
//! `tokio::process::Command` behind the platform shell, and returning a typed
//! result to the caller.
//!
//! - [`command`] builds the shell line (interpreter prefix, launcher
//!   substitution, parenthesis escaping) and defines the invocation types.
//! - [`process`] contains [`ProcessExecutor`], the production runner.
//! - [`backend`] provides the `CommandRunner` trait that the orchestrator
//!   depends on, and which tests can replace with a scripted implementation.

pub mod backend;
pub mod command;
pub mod process;

pub use backend::{CommandRunner, RunFuture};
pub use command::{ChildSlot, EnvPolicy, ExecOptions, ExecutionResult, Invocation};
pub use process::ProcessExecutor;
