// tests/error_handling.rs

use std::io::Write;

use buildwarden::build::EngineCommand;
use buildwarden::config::{load_and_validate, load_or_default};
use buildwarden::errors::BuildwardenError;
use tempfile::NamedTempFile;

#[test]
fn test_negative_retry_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[build]
retry = -1
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(BuildwardenError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_bad_duration_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[watchdog]
hang_timeout = "ten minutes"
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(BuildwardenError::ConfigError(msg)) => {
            assert!(msg.contains("hang_timeout"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_missing_file_is_an_io_error_only_when_required() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Buildwarden.toml");

    match load_and_validate(&path) {
        Err(BuildwardenError::IoError(_)) => {}
        Err(e) => panic!("Expected IoError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    let cfg = load_or_default(&path).unwrap();
    assert_eq!(cfg.build.retry, 0);
    assert!(cfg.engine.binary.is_none());
}

#[test]
fn test_engine_without_binary_cannot_run() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[engine]
platform = "win"
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    match EngineCommand::from_settings(&cfg.engine) {
        Err(BuildwardenError::ConfigError(msg)) => assert!(msg.contains("binary")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_full_config_round_trips_into_an_engine_command() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[engine]
binary = "/Applications/Engine/Engine.app/Contents/MacOS/Engine"
project_path = "client"
method_prefix = "Studio.CI."
platform = "osx"
log_file = "/tmp/bw/engine.log"

[engine.extra_args]
-cacheServerIPAddress = "10.0.0.5"

[watchdog]
hang_timeout = "20m"
initial_timeout = "5m"
poll_interval = "2s"

[build]
retry = 2
resource_hooks = ["tools/pack_atlas.sh"]
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.engine.process_name, "Engine");
    assert_eq!(cfg.build.retry, 2);

    let engine = EngineCommand::from_settings(&cfg.engine).unwrap();
    assert_eq!(engine.build_target, "OSXUniversal");
    let line = engine.invocation("BuildCode").command_line();
    assert!(line.contains("-executeMethod Studio.CI.BuildCode"));
    assert!(line.ends_with("-cacheServerIPAddress 10.0.0.5"));
}
