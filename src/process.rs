//! External tool invocation
//!
//! Every tool the pipeline drives (git, meson, ninja, patchelf, zip, unzip,
//! pip) goes through the `CommandRunner` trait. The system implementation
//! spawns real processes; tests substitute a scripted runner.

use crate::error::{BuilderError, BuilderResult};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Max number of output lines to include in tool failure messages.
const ERROR_TAIL_LINES: usize = 50;

/// A single external command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Combined stdout+stderr is written here when set
    pub log: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            cwd: None,
            log: None,
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

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log = Some(path.into());
        self
    }

    /// The first argument, which names the subcommand for most tools
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout with surrounding whitespace removed
    pub fn trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Runs external tools
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion and capture its output
    async fn run(&self, invocation: &Invocation) -> BuilderResult<CommandOutput>;

    /// Whether `tool` resolves to an executable on the search path
    async fn probe(&self, tool: &str) -> bool;

    /// Run a command and turn a non-zero exit into `ToolFailed`
    async fn run_checked(&self, invocation: &Invocation) -> BuilderResult<CommandOutput> {
        let output = self.run(invocation).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(BuilderError::ToolFailed {
                command: invocation.to_string(),
                code: output.code,
                output: output_tail(&output.stdout, &output.stderr),
            })
        }
    }
}

/// Runner that spawns real processes
pub struct SystemRunner {
    search_path: Option<std::ffi::OsString>,
}

impl SystemRunner {
    /// Create a runner probing the given search path (normally `$PATH`)
    pub fn new(search_path: Option<std::ffi::OsString>) -> Self {
        Self { search_path }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> BuilderResult<CommandOutput> {
        debug!("Executing: {}", invocation);

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = invocation.cwd {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|e| BuilderError::command_failed(invocation.to_string(), e))?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if let Some(ref log) = invocation.log {
            let mut content = result.stdout.clone();
            content.push_str(&result.stderr);
            tokio::fs::write(log, content)
                .await
                .map_err(|e| BuilderError::io(format!("writing log {}", log.display()), e))?;
        }

        if !result.success() {
            warn!("{} exited with {:?}", invocation, result.code);
        }

        Ok(result)
    }

    async fn probe(&self, tool: &str) -> bool {
        find_in_path(tool, self.search_path.as_deref()).is_some()
    }
}

/// Locate an executable the way `command -v` does
pub fn find_in_path(tool: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if tool.contains(std::path::MAIN_SEPARATOR) {
        let candidate = PathBuf::from(tool);
        return is_executable(&candidate).then_some(candidate);
    }

    std::env::split_paths(search_path?)
        .map(|dir| dir.join(tool))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Extract the useful tail of tool output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `ERROR_TAIL_LINES`
/// lines.
pub fn output_tail(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}
