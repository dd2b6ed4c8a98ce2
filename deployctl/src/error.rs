//! Error taxonomy for a deployment run
//!
//! Input errors are caught before any tool runs, environment errors before any
//! mutating step, and external-command errors abort the remaining workflow.
//! Best-effort steps (endpoints, health) never surface here.

use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T, E = DeployError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DeployError {
    #[snafu(display("Unknown option: {option}"))]
    UnknownOption { option: String },

    #[snafu(display("Option {flag} requires a value"))]
    MissingValue { flag: String },

    #[snafu(display("{tool} is not installed or not on PATH ({hint})"))]
    MissingTool { tool: String, hint: String },

    #[snafu(display(
        "Cannot reach a Kubernetes cluster, check your kubeconfig (`{command}` failed)"
    ))]
    ClusterUnreachable { command: String },

    #[snafu(display("Failed to launch `{command}`: {source}"))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("`{command}` failed with {}", describe_code(*code)))]
    CommandFailed { command: String, code: Option<i32> },

    #[snafu(display("Rollout of deployment/{deployment} did not complete: {source}"))]
    Rollout {
        deployment: String,
        #[snafu(source(from(DeployError, Box::new)))]
        source: Box<DeployError>,
    },

    #[snafu(display("Failed to read settings from {}: {source}", path.display()))]
    ReadSettings {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Invalid settings in {}: {source}", path.display()))]
    ParseSettings {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[snafu(display("Failed to render deployment report: {source}"))]
    RenderReport { source: toml::ser::Error },

    #[snafu(display("Failed to write deployment report to {}: {source}", path.display()))]
    WriteReport {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl DeployError {
    /// Process exit code for this error.
    ///
    /// External-command failures pass the tool's own exit code through, the
    /// same way a `set -e` shell script would.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::CommandFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            DeployError::Rollout { source, .. } => source.exit_code(),
            _ => 1,
        }
    }
}
