//! deployctl: take the biosim backend from a source tree to a verified
//! Kubernetes rollout.
//!
//! The binary is a thin shell over [`workflow::Orchestrator`]; every external
//! tool call goes through [`runner::ToolRunner`].

pub mod cli;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod health;
pub mod image;
pub mod namespace;
pub mod prereq;
pub mod provider;
pub mod report;
pub mod rollout;
pub mod runner;
pub mod strategy;
pub mod workflow;

pub use config::{ClusterType, DeployMethod, DeploymentConfig, Settings};
pub use error::{DeployError, Result};
pub use report::{DeploymentReport, print_report, write_report};
pub use runner::{DuctRunner, Invocation, ToolRunner};
pub use workflow::Orchestrator;
