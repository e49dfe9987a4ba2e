//! Test runner process handling
//!
//! Spawns the external test runner for one test file, forwards its output
//! live, and reports how it ended.

use std::io::Write;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use colored::control::SHOULD_COLORIZE;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::common::config::RunnerConfig;
use crate::common::{Error, Result};

use super::flags::build_args;

/// Read buffer size for the child's output pipes
const CHUNK_SIZE: usize = 8192;

/// Escape sequences around forwarded stderr output
const YELLOW: &[u8] = b"\x1b[33m";
const RESET: &[u8] = b"\x1b[0m";

/// How a single test runner invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Whether anything arrived on the child's stderr
    pub had_stderr: bool,
    /// Whether the process was killed for exceeding the file timeout
    pub timed_out: bool,
}

impl ProcessOutcome {
    /// Outcome of a process that exited with `code`
    pub fn exited(code: i32, had_stderr: bool) -> Self {
        Self {
            exit_code: Some(code),
            had_stderr,
            timed_out: false,
        }
    }

    /// Outcome of a process terminated by a signal
    pub fn signaled(had_stderr: bool) -> Self {
        Self {
            exit_code: None,
            had_stderr,
            timed_out: false,
        }
    }

    /// A run fails on a non-zero (or missing) exit code, or on stderr
    /// output when `fail_on_stderr` is set
    pub fn is_failure(&self, fail_on_stderr: bool) -> bool {
        (self.had_stderr && fail_on_stderr) || self.exit_code != Some(0)
    }
}

/// Runs one test file to completion
///
/// Output is written to `sink` as it arrives. A test failure is an `Ok`
/// outcome; `Err` means the file could not be run at all.
#[async_trait]
pub trait TestProcess: Send + Sync {
    async fn run(
        &self,
        file: &str,
        bail: bool,
        flags: &[String],
        sink: &mut (dyn Write + Send),
    ) -> Result<ProcessOutcome>;
}

#[async_trait]
impl<'a, T: TestProcess + ?Sized> TestProcess for &'a T {
    async fn run(
        &self,
        file: &str,
        bail: bool,
        flags: &[String],
        sink: &mut (dyn Write + Send),
    ) -> Result<ProcessOutcome> {
        (**self).run(file, bail, flags, sink).await
    }
}

/// The executable used to launch the test runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    /// Runner executable or script
    pub program: PathBuf,
    /// Interpreter that runs `program`, if it is not directly executable
    pub interpreter: Option<PathBuf>,
}

impl RunnerCommand {
    /// Launch `program` directly
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            interpreter: None,
        }
    }

    /// Launch `program` through an interpreter
    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = Some(interpreter.into());
        self
    }

    /// Build the runner command from configuration
    ///
    /// With `dir` set the program is taken from that directory, otherwise it
    /// is looked up on PATH. An unresolved name is kept as-is so that the
    /// spawn itself reports the failure.
    pub fn from_config(config: &RunnerConfig) -> Self {
        let program = match &config.dir {
            Some(dir) => dir.join(&config.program),
            None => {
                which::which(&config.program).unwrap_or_else(|_| PathBuf::from(&config.program))
            }
        };

        Self {
            program,
            interpreter: config.interpreter.clone(),
        }
    }

    /// Name of the executable actually spawned
    pub fn executable(&self) -> String {
        self.interpreter
            .as_ref()
            .unwrap_or(&self.program)
            .display()
            .to_string()
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = match &self.interpreter {
            Some(interpreter) => {
                let mut cmd = Command::new(interpreter);
                cmd.arg(&self.program);
                cmd
            }
            None => Command::new(&self.program),
        };
        cmd.args(args);
        cmd
    }
}

/// Spawns the external test runner, one process per call
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    command: RunnerCommand,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(command: RunnerCommand) -> Self {
        Self {
            command,
            timeout: None,
        }
    }

    /// Kill a test file's process once it has run for `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &RunnerCommand {
        &self.command
    }
}

#[async_trait]
impl TestProcess for ProcessRunner {
    async fn run(
        &self,
        file: &str,
        bail: bool,
        flags: &[String],
        sink: &mut (dyn Write + Send),
    ) -> Result<ProcessOutcome> {
        let args = build_args(file, bail, flags);
        let mut cmd = self.command.command(&args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %self.command.program.display(),
            ?args,
            "Spawning test runner"
        );

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::spawn_failed(&self.command.executable(), e))?;

        let mut had_stderr = false;
        let status = match self.timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, pump(&mut child, &mut had_stderr, sink)).await {
                    Ok(status) => Some(status?),
                    Err(_) => None,
                }
            }
            None => Some(pump(&mut child, &mut had_stderr, sink).await?),
        };

        // A runner that exited while a leftover child still holds its pipes
        // is judged by its own exit status, not as a timeout.
        let status = match status {
            Some(status) => Some(status),
            None => child.try_wait()?,
        };

        let outcome = match status {
            Some(status) => ProcessOutcome {
                exit_code: status.code(),
                had_stderr,
                timed_out: false,
            },
            None => {
                tracing::warn!(file, "Test runner timed out, killing it");
                let _ = child.kill().await;
                ProcessOutcome {
                    exit_code: None,
                    had_stderr,
                    timed_out: true,
                }
            }
        };

        tracing::debug!(
            file,
            exit_code = ?outcome.exit_code,
            had_stderr = outcome.had_stderr,
            "Test runner finished"
        );

        Ok(outcome)
    }
}

/// Forward both output pipes to `sink` until EOF, then reap the child
async fn pump(
    child: &mut Child,
    had_stderr: &mut bool,
    sink: &mut (dyn Write + Send),
) -> Result<ExitStatus> {
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Internal("Failed to get test runner stdout".to_string()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Internal("Failed to get test runner stderr".to_string()))?;

    let mut out_buf = vec![0u8; CHUNK_SIZE];
    let mut err_buf = vec![0u8; CHUNK_SIZE];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => match read? {
                0 => out_open = false,
                n => {
                    sink.write_all(&out_buf[..n])?;
                    sink.flush()?;
                }
            },
            read = stderr.read(&mut err_buf), if err_open => match read? {
                0 => err_open = false,
                n => {
                    *had_stderr = true;
                    forward_stderr(sink, &err_buf[..n])?;
                }
            },
        }
    }

    Ok(child.wait().await?)
}

/// Write a stderr chunk to `sink` in yellow, bytes untouched
fn forward_stderr(sink: &mut (dyn Write + Send), chunk: &[u8]) -> std::io::Result<()> {
    if SHOULD_COLORIZE.should_colorize() {
        sink.write_all(YELLOW)?;
        sink.write_all(chunk)?;
        sink.write_all(RESET)?;
    } else {
        sink.write_all(chunk)?;
    }
    sink.flush()
}
