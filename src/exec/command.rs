// src/exec/command.rs

//! Command-line construction and the plain data types of an invocation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// How the child's environment is derived from ours.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EnvPolicy {
    /// Child inherits the parent environment unchanged.
    #[default]
    Inherit,
    /// Parent environment plus these variables (overriding on conflict).
    Extend(BTreeMap<String, String>),
    /// Only these variables.
    Replace(BTreeMap<String, String>),
}

/// Shared record of the pid of a running child.
///
/// The executor fills it in while the child runs (on Unix the child also
/// leads its own process group) so that another task can terminate the
/// whole process tree. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct ChildSlot(Arc<Mutex<Option<u32>>>);

impl ChildSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pid of the running child, if any.
    pub fn pid(&self) -> Option<u32> {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set(&self, pid: Option<u32>) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = pid;
    }
}

impl PartialEq for ChildSlot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ChildSlot {}

/// Per-call execution options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Return `Ok` even when the command exits non-zero.
    pub ignore_error: bool,
    /// Working directory for the child only.
    pub working_dir: Option<PathBuf>,
    pub env: EnvPolicy,
    /// Log "starting" / "finished" lines at info level.
    pub verbose: bool,
    /// Publish the child's pid here while it runs.
    pub child_slot: Option<ChildSlot>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            ignore_error: false,
            working_dir: None,
            env: EnvPolicy::Inherit,
            verbose: true,
            child_slot: None,
        }
    }
}

impl ExecOptions {
    pub fn ignore_error(mut self, value: bool) -> Self {
        self.ignore_error = value;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, env: EnvPolicy) -> Self {
        self.env = env;
        self
    }

    pub fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    pub fn child_slot(mut self, slot: ChildSlot) -> Self {
        self.child_slot = Some(slot);
        self
    }
}

/// A fully described external command, ready to hand to a
/// [`CommandRunner`](super::CommandRunner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub options: ExecOptions,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            options: ExecOptions::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    /// The shell line this invocation runs as.
    pub fn command_line(&self) -> String {
        build_command_line(&self.program, &self.args)
    }
}

/// Captured outcome of one finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Extra diagnostic text (e.g. termination by signal).
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Interpreter to prefix for script files that are not directly executable.
pub fn interpreter_for(program: &str) -> Option<&'static str> {
    if program.ends_with(".sh") {
        Some("bash")
    } else if program.ends_with(".py") {
        Some("python")
    } else {
        None
    }
}

/// Substitute platform-specific launcher names.
pub fn platform_program(program: &str) -> &str {
    platform_program_for(program, cfg!(windows))
}

fn platform_program_for(program: &str, windows: bool) -> &str {
    if windows && program == "open" {
        "start"
    } else {
        program
    }
}

/// Escape parentheses so the shell passes them through literally.
pub fn escape_arg(arg: &str) -> String {
    arg.replace('(', "\\(").replace(')', "\\)")
}

/// Join program and arguments into the single line handed to the shell.
///
/// Empty arguments are dropped.
pub fn build_command_line(program: &str, args: &[String]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(args.len() + 2);
    if let Some(interpreter) = interpreter_for(program) {
        parts.push(interpreter.to_string());
    }
    parts.push(platform_program(program).to_string());
    parts.extend(args.iter().filter(|a| !a.is_empty()).map(|a| escape_arg(a)));
    parts.join(" ")
}

/// Short name of the program used in "finished" log lines.
pub fn display_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scripts_get_an_interpreter_prefix() {
        assert_eq!(
            build_command_line("tools/pack.sh", &strings(&["a"])),
            "bash tools/pack.sh a"
        );
        assert_eq!(build_command_line("gen.py", &[]), "python gen.py");
        assert_eq!(build_command_line("make", &strings(&["all"])), "make all");
    }

    #[test]
    fn parentheses_are_escaped_and_empty_args_dropped() {
        let line = build_command_line("echo", &strings(&["f(x)", "", "y"]));
        assert_eq!(line, "echo f\\(x\\) y");
    }

    #[test]
    fn open_maps_to_start_only_on_windows() {
        assert_eq!(platform_program_for("open", true), "start");
        assert_eq!(platform_program_for("open", false), "open");
        assert_eq!(platform_program_for("ls", true), "ls");
    }

    #[test]
    fn display_name_strips_directories() {
        assert_eq!(display_name("/opt/engine/Engine"), "Engine");
        assert_eq!(display_name("make"), "make");
    }
}
