// tests/process_executor.rs
#![cfg(unix)]

mod common;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use buildwarden::errors::ExecutionError;
use buildwarden::exec::{
    ChildSlot, CommandRunner, EnvPolicy, ExecOptions, Invocation, ProcessExecutor,
};
use buildwarden::watchdog::{Halt, KillProcessTree};
use common::{init_tracing, with_timeout};

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn captures_and_trims_output() {
    init_tracing();
    let exec = ProcessExecutor::new();

    let result = exec
        .execute("printf", &args(&["'  hello\\n\\n'"]), &ExecOptions::default())
        .await
        .unwrap();

    assert_eq!(result.code, 0);
    assert!(result.success());
    assert_eq!(result.stdout, "hello");
    assert_eq!(result.stderr, "");
    assert_eq!(exec.last_error(), None);
}

#[tokio::test]
async fn non_zero_exit_is_an_error_unless_ignored() {
    init_tracing();
    let exec = ProcessExecutor::new();

    let err = exec
        .execute("echo", &args(&["boom", "1>&2;", "exit", "3"]), &ExecOptions::default())
        .await
        .unwrap_err();
    match err {
        ExecutionError::Failed { code, stderr, .. } => {
            assert_eq!(code, 3);
            assert_eq!(stderr, "boom");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(exec.last_error().unwrap().contains("exited with code 3"));

    let result = exec
        .execute(
            "echo",
            &args(&["boom", "1>&2;", "exit", "3"]),
            &ExecOptions::default().ignore_error(true),
        )
        .await
        .unwrap();
    assert_eq!(result.code, 3);
    assert_eq!(result.stderr, "boom");
    assert!(exec.last_error().is_some());

    // A later success clears the marker.
    exec.execute("true", &[], &ExecOptions::default()).await.unwrap();
    assert_eq!(exec.last_error(), None);
}

#[tokio::test]
async fn working_dir_applies_to_the_child_only() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let before = std::env::current_dir().unwrap();
    let exec = ProcessExecutor::new();

    let result = exec
        .execute("pwd", &[], &ExecOptions::default().working_dir(dir.path()))
        .await
        .unwrap();

    let reported = std::fs::canonicalize(&result.stdout).unwrap();
    assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[tokio::test]
async fn env_policy_extends_or_replaces_the_environment() {
    init_tracing();
    let exec = ProcessExecutor::new();
    let vars = BTreeMap::from([("BW_MARKER".to_string(), "42".to_string())]);

    let extended = exec
        .execute(
            "echo",
            &args(&["${BW_MARKER}-${PATH:+has_path}"]),
            &ExecOptions::default().env(EnvPolicy::Extend(vars.clone())),
        )
        .await
        .unwrap();
    assert_eq!(extended.stdout, "42-has_path");

    let replaced = exec
        .execute(
            "echo",
            &args(&["${BW_MARKER}-${HOME:-no_home}"]),
            &ExecOptions::default().env(EnvPolicy::Replace(vars)),
        )
        .await
        .unwrap();
    assert_eq!(replaced.stdout, "42-no_home");
}

#[tokio::test]
async fn shell_scripts_run_through_bash() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("hook.sh");
    std::fs::write(&script, "echo from-script \"$1\"\n").unwrap();

    let invocation = Invocation::new(script.display().to_string()).arg("done");
    let result = ProcessExecutor::new().run(&invocation).await.unwrap();

    assert_eq!(result.stdout, "from-script done");
}

#[tokio::test]
async fn missing_program_fails_with_a_shell_error() {
    init_tracing();
    let exec = ProcessExecutor::new();

    let err = exec
        .execute("buildwarden-no-such-program", &[], &ExecOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.code(), 127);
}

#[tokio::test]
async fn child_slot_holds_the_pid_only_while_running() {
    init_tracing();
    let exec = ProcessExecutor::new();
    let slot = ChildSlot::new();
    let options = ExecOptions::default().child_slot(slot.clone());

    let watcher = slot.clone();
    let seen = tokio::spawn(async move {
        for _ in 0..40 {
            if let Some(pid) = watcher.pid() {
                return Some(pid);
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        None
    });

    exec.execute("sleep", &args(&["0.5"]), &options).await.unwrap();

    assert!(seen.await.unwrap().is_some());
    assert_eq!(slot.pid(), None);
}

#[tokio::test]
async fn process_tree_halt_reaches_the_interpreter_children() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("engine.sh");
    std::fs::write(&script, "sleep 20\necho survived\n").unwrap();

    let exec = ProcessExecutor::new();
    let slot = ChildSlot::new();
    let halt = KillProcessTree::new(slot.clone());
    let options = ExecOptions::default().ignore_error(true).child_slot(slot.clone());

    let started = Instant::now();
    let killer = tokio::spawn(async move {
        while slot.pid().is_none() {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        halt.halt("test");
    });

    let result = with_timeout(exec.execute(&script.display().to_string(), &[], &options))
        .await
        .unwrap();
    killer.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(8));
    assert!(!result.success());
    assert!(!result.stdout.contains("survived"));
}

#[test]
fn halting_an_empty_slot_does_nothing() {
    KillProcessTree::new(ChildSlot::new()).halt("nothing to stop");
}
