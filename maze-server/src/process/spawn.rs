//! Maze generator invocation.
//!
//! Runs the external generator once per request:
//! - the size is passed as the last positional argument
//! - stdout is captured as raw bytes and handed back verbatim
//! - stderr is kept only to explain failures
//! - an optional timeout kills the child

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Default generator executable, resolved relative to the working directory.
#[cfg(windows)]
pub const DEFAULT_GENERATOR: &str = "maze_logic.exe";
#[cfg(not(windows))]
pub const DEFAULT_GENERATOR: &str = "./maze_logic";

/// How to launch the generator.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// The program to execute.
    pub program: String,

    /// Arguments placed before the size argument.
    pub leading_args: Vec<String>,

    /// Working directory for the process.
    pub working_dir: Option<PathBuf>,

    /// Kill the process if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self::new(DEFAULT_GENERATOR)
    }
}

impl GeneratorOptions {
    /// Create new options for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Add an argument placed before the size.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    /// Add multiple leading arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        args.into_iter().fold(self, |opts, arg| opts.arg(arg))
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set a timeout for each invocation.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// The command line for a given size, for diagnostics.
    pub fn command_line(&self, size: u32) -> String {
        let mut parts = Vec::with_capacity(self.leading_args.len() + 2);
        parts.push(self.program.as_str());
        parts.extend(self.leading_args.iter().map(String::as_str));
        let size = size.to_string();
        parts.push(&size);
        parts.join(" ")
    }
}

/// Why an invocation produced no usable output.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The executable could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child or reading its pipes failed.
    #[error("failed to wait for {command}: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The child exited with a non-zero status (or was killed by a signal).
    #[error("Command failed: {command} ({}){}", describe_code(.code), describe_stderr(.stderr))]
    Exit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The child ran past the configured timeout and was killed.
    #[error("Command timed out after {}ms: {command}", .after.as_millis())]
    TimedOut { command: String, after: Duration },
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(
        || "terminated by signal".to_string(),
        |code| format!("exit code {code}"),
    )
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Successful generator run.
#[derive(Debug, Clone)]
pub struct Completed {
    /// Raw stdout bytes.
    pub stdout: Vec<u8>,

    /// Wall-clock time from before spawn until exit.
    pub elapsed: Duration,
}

/// Run the generator for `size` and wait for it to exit.
///
/// Each call owns its child process; concurrent calls share nothing.
pub async fn invoke(options: &GeneratorOptions, size: u32) -> Result<Completed, InvokeError> {
    let command = options.command_line(size);
    let started = Instant::now();

    let mut cmd = Command::new(&options.program);
    cmd.args(&options.leading_args);
    cmd.arg(size.to_string());

    if let Some(ref dir) = options.working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    // Dropping the wait future on timeout must not leave the child running.
    cmd.kill_on_drop(true);

    let child = cmd.spawn().map_err(|source| InvokeError::Spawn {
        program: options.program.clone(),
        source,
    })?;

    let output = if let Some(limit) = options.timeout {
        match timeout(limit, child.wait_with_output()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(InvokeError::TimedOut {
                    command,
                    after: limit,
                })
            }
        }
    } else {
        child.wait_with_output().await
    }
    .map_err(|source| InvokeError::Wait {
        command: command.clone(),
        source,
    })?;

    let elapsed = started.elapsed();

    if !output.status.success() {
        return Err(InvokeError::Exit {
            command,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(Completed {
        stdout: output.stdout,
        elapsed,
    })
}
