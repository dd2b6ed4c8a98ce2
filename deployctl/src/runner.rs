//! External tool execution
//!
//! Every docker/kubectl/helm call goes through [`ToolRunner`] so the workflow
//! can be driven against a scripted fake in tests.

use crate::error::{CommandFailedSnafu, Result, SpawnSnafu};
use snafu::{ResultExt, ensure};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// A single external command: program, arguments and optional stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    stdin: Option<Vec<u8>>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `bytes` to the command's stdin (the `... | kubectl apply -f -` half of a pipe).
    #[must_use]
    pub fn stdin(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(bytes.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn stdin_bytes(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Handle to a process left running in the background (port-forwards).
pub trait BackgroundProcess {
    fn kill(&mut self) -> std::io::Result<()>;
}

pub trait ToolRunner {
    /// Resolve `program` on PATH.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Run to completion with inherited stdio. Non-zero exit is an error.
    fn run(&self, invocation: &Invocation) -> Result<()>;

    /// Run to completion and return captured stdout. Non-zero exit is an error.
    fn read(&self, invocation: &Invocation) -> Result<String>;

    /// Best-effort query: trimmed stdout when the command succeeds with output.
    fn probe(&self, invocation: &Invocation) -> Option<String>;

    fn spawn(&self, invocation: &Invocation) -> Result<Box<dyn BackgroundProcess>>;
}

/// Runs tools for real via `duct`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuctRunner;

impl DuctRunner {
    fn expression(invocation: &Invocation) -> duct::Expression {
        let expression = duct::cmd(invocation.program(), invocation.arguments());
        match invocation.stdin_bytes() {
            Some(bytes) => expression.stdin_bytes(bytes.to_vec()),
            None => expression,
        }
    }
}

impl ToolRunner for DuctRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        duct::cmd("which", [program])
            .stdout_capture()
            .stderr_null()
            .unchecked()
            .run()
            .ok()
            .filter(|output| output.status.success())
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }

    fn run(&self, invocation: &Invocation) -> Result<()> {
        let command = invocation.to_string();
        debug!(%command, "running");
        let output = Self::expression(invocation)
            .unchecked()
            .run()
            .context(SpawnSnafu { command: &command })?;
        ensure!(
            output.status.success(),
            CommandFailedSnafu {
                command,
                code: output.status.code(),
            }
        );
        Ok(())
    }

    fn read(&self, invocation: &Invocation) -> Result<String> {
        let command = invocation.to_string();
        debug!(%command, "running (captured)");
        let output = Self::expression(invocation)
            .stdout_capture()
            .unchecked()
            .run()
            .context(SpawnSnafu { command: &command })?;
        ensure!(
            output.status.success(),
            CommandFailedSnafu {
                command,
                code: output.status.code(),
            }
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn probe(&self, invocation: &Invocation) -> Option<String> {
        debug!(command = %invocation, "probing");
        Self::expression(invocation)
            .stdout_capture()
            .stderr_null()
            .unchecked()
            .run()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn spawn(&self, invocation: &Invocation) -> Result<Box<dyn BackgroundProcess>> {
        let command = invocation.to_string();
        debug!(%command, "spawning in background");
        let handle = Self::expression(invocation)
            .stdout_null()
            .stderr_null()
            .unchecked()
            .start()
            .context(SpawnSnafu { command })?;
        Ok(Box::new(DuctProcess(handle)))
    }
}

struct DuctProcess(duct::Handle);

impl BackgroundProcess for DuctProcess {
    fn kill(&mut self) -> std::io::Result<()> {
        self.0.kill()
    }
}
