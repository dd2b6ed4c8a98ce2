//! Command-line flags
//!
//! Parsing happens before anything touches the cluster: an unknown token or a
//! value flag without its value ends the run here.

use crate::error::DeployError;
use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(name = "deployctl", version)]
#[command(about = "Build, push and roll out the biosim backend to Kubernetes", long_about = None)]
pub struct Cli {
    /// Build the backend image before deploying
    #[arg(long)]
    pub build: bool,

    /// Push the backend image to the registry
    #[arg(long)]
    pub push: bool,

    /// Deploy with Helm (falls back to kubectl apply if helm is missing)
    #[arg(long)]
    pub helm: bool,

    /// Deploy the kustomize overlay
    #[arg(long)]
    pub kustomize: bool,

    /// Target cluster flavour: gke, eks, aks or generic
    #[arg(
        long,
        env = "CLUSTER_TYPE",
        value_name = "TYPE",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub cluster_type: Option<String>,

    /// Container registry host (and optional path)
    #[arg(
        long,
        env = "REGISTRY",
        value_name = "HOST",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub registry: Option<String>,

    /// Image tag to build, push and deploy
    #[arg(long, env = "IMAGE_TAG", value_parser = NonEmptyStringValueParser::new())]
    pub tag: Option<String>,

    /// Kubernetes namespace to deploy into
    #[arg(long, env = "NAMESPACE", value_parser = NonEmptyStringValueParser::new())]
    pub namespace: Option<String>,

    /// Backend image name
    #[arg(long, env = "IMAGE_NAME", value_parser = NonEmptyStringValueParser::new())]
    pub image_name: Option<String>,

    /// Settings file (default: ./deployctl.toml when present)
    #[arg(long, env = "DEPLOYCTL_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write the deployment report to this TOML file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Settings path with `~` expanded.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.as_deref().map(expand_tilde)
    }

    pub fn report_path(&self) -> Option<PathBuf> {
        self.report.as_deref().map(expand_tilde)
    }
}

fn expand_tilde(path: &std::path::Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).as_ref())
}

/// Why parsing stopped.
#[derive(Debug)]
pub enum ParseFailure {
    /// Malformed input we report ourselves (unknown option, missing value).
    Input(DeployError),
    /// Left to clap's own rendering: `--help`, `--version` and other usage errors.
    Clap(clap::Error),
}

pub fn parse<I, T>(args: I) -> Result<Cli, ParseFailure>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|err| match classify(&err) {
        Some(input) => ParseFailure::Input(input),
        None => ParseFailure::Clap(err),
    })
}

fn classify(err: &clap::Error) -> Option<DeployError> {
    let invalid_arg = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => arg.clone(),
        _ => return None,
    };

    match err.kind() {
        ErrorKind::UnknownArgument => Some(DeployError::UnknownOption {
            option: invalid_arg,
        }),
        // clap reports "--tag <TAG>"; keep only the flag itself
        ErrorKind::InvalidValue if is_empty_value(err) => Some(DeployError::MissingValue {
            flag: invalid_arg
                .split_whitespace()
                .next()
                .unwrap_or(&invalid_arg)
                .to_string(),
        }),
        _ => None,
    }
}

fn is_empty_value(err: &clap::Error) -> bool {
    match err.get(ContextKind::InvalidValue) {
        Some(ContextValue::String(value)) => value.is_empty(),
        None => true,
        _ => false,
    }
}
