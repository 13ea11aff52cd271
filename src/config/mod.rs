// src/config/mod.rs

//! Configuration loading and validation for buildwarden.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk and overlay `BUILDWARDEN_*` environment
//!   overrides (`loader.rs`).
//! - Validate durations and pattern lists (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    BuildSection, ConfigFile, EngineSection, EngineSettings, RawConfigFile, WatchdogSection,
    WatchdogSettings,
};
