//! Child processes as retryable operations.
//!
//! A command run is one attempt: [`CommandSpec::output`] for single-shot use,
//! [`ChildLines`] for streaming its stdout. Every child is killed when its
//! attempt is dropped, so attempts cut short by the deadline don't linger.

use std::io;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use ferry_core::config::CommandConfig;
use ferry_core::retry::{AttemptStream, RetryPredicate};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start `{program}`")]
    Spawn { program: String, source: io::Error },

    #[error("`{program}` {}{}", describe(.code), stderr_suffix(.stderr))]
    Exit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error talking to `{program}`")]
    Io { program: String, source: io::Error },
}

fn describe(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was killed by a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.lines().last() {
        Some(line) if !line.trim().is_empty() => format!(": {}", line.trim()),
        _ => String::new(),
    }
}

/// Program plus arguments, as given after `--`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// `None` for an empty argument list.
    pub fn from_argv(argv: Vec<String>) -> Option<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next()?;
        Some(Self {
            program,
            args: argv.collect(),
        })
    }

    fn command(&self, stderr: Stdio) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .kill_on_drop(true);
        cmd
    }

    fn spawn(&self, stderr: Stdio) -> Result<Child, CommandError> {
        self.command(stderr).spawn().map_err(|source| CommandError::Spawn {
            program: self.program.clone(),
            source,
        })
    }

    fn exit_error(&self, status: ExitStatus, stderr: String) -> CommandError {
        CommandError::Exit {
            program: self.program.clone(),
            code: status.code(),
            stderr,
        }
    }

    fn io_error(&self, source: io::Error) -> CommandError {
        CommandError::Io {
            program: self.program.clone(),
            source,
        }
    }

    /// Run to completion and return stdout; a non-zero exit is an error.
    pub async fn output(&self) -> Result<String, CommandError> {
        let child = self.spawn(Stdio::piped())?;
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.io_error(e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(self.exit_error(output.status, stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Decides which command failures are worth another run.
///
/// A program that cannot be started is never retried; exits follow the
/// `[command]` config; broken pipes are always retried.
#[derive(Debug, Clone, Default)]
pub struct ExitCodePredicate {
    config: CommandConfig,
}

impl ExitCodePredicate {
    pub fn new(config: CommandConfig) -> Self {
        Self { config }
    }
}

impl RetryPredicate<CommandError> for ExitCodePredicate {
    fn should_retry(&self, error: &CommandError) -> bool {
        match error {
            CommandError::Spawn { .. } => false,
            CommandError::Exit { code, .. } => self.config.is_retryable(*code),
            CommandError::Io { .. } => true,
        }
    }
}

/// Stdout of one child process, line by line. The child is started on the
/// first pull; reaching EOF waits for it and turns a failed exit into an error.
/// The command runs at most once: after EOF or `close` every pull is `None`.
pub struct ChildLines {
    spec: CommandSpec,
    child: Option<Child>,
    lines: Option<Lines<BufReader<ChildStdout>>>,
    done: bool,
}

impl ChildLines {
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            child: None,
            lines: None,
            done: false,
        }
    }

    fn start(&mut self) -> Result<(), CommandError> {
        let mut child = self.spec.spawn(Stdio::inherit())?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.spec.io_error(io::Error::other("stdout was not captured")))?;
        tracing::debug!(program = %self.spec.program, pid = ?child.id(), "child started");
        self.lines = Some(BufReader::new(stdout).lines());
        self.child = Some(child);
        Ok(())
    }

    async fn finish(&mut self) -> Option<Result<String, CommandError>> {
        self.done = true;
        self.lines = None;
        let mut child = self.child.take()?;
        match child.wait().await {
            Ok(status) if status.success() => None,
            Ok(status) => Some(Err(self.spec.exit_error(status, String::new()))),
            Err(e) => Some(Err(self.spec.io_error(e))),
        }
    }
}

#[async_trait]
impl AttemptStream for ChildLines {
    type Item = String;
    type Error = CommandError;

    async fn next(&mut self) -> Option<Result<String, CommandError>> {
        if self.done {
            return None;
        }
        if self.child.is_none() {
            if let Err(e) = self.start() {
                self.done = true;
                return Some(Err(e));
            }
        }
        let lines = self.lines.as_mut()?;
        match lines.next_line().await {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => self.finish().await,
            Err(e) => Some(Err(self.spec.io_error(e))),
        }
    }

    async fn close(&mut self) {
        self.done = true;
        self.lines = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!(program = %self.spec.program, "failed to kill child: {}", e);
            }
        }
    }
}
