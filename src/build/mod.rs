// src/build/mod.rs

//! Build pipeline.
//!
//! - [`steps`] defines which engine methods (and hooks) make up each named
//!   [`BuildStep`](crate::types::BuildStep).
//! - [`engine`] turns engine settings into a batch-mode command line.
//! - [`orchestrator`] runs a step under the log watchdog and applies the
//!   retry budget.

pub mod engine;
pub mod orchestrator;
pub mod steps;

pub use engine::EngineCommand;
pub use orchestrator::{BuildOrchestrator, StepReport};
pub use steps::{StepAction, actions_for, engine_methods};
