//! Prerequisite checker
//!
//! Fail-fast gate run before anything mutates the cluster: a container build
//! tool, kubectl, and a reachable cluster. Versions are only reported.

use crate::config::DeployMethod;
use crate::error::{DeployError, Result};
use crate::runner::{Invocation, ToolRunner};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// `kubectl kustomize` is built into kubectl from this release on.
const KUSTOMIZE_KUBECTL_REQUIREMENT: &str = ">=1.14.0";

/// Result of looking up a single binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryCheck {
    pub name: String,
    pub path: PathBuf,
    pub installed_version: Option<String>,
}

/// Tools resolved for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// docker, or podman standing in for it
    pub container: BinaryCheck,
    pub kubectl: BinaryCheck,
}

impl Toolchain {
    /// Program name to invoke for image builds and pushes.
    pub fn container_tool(&self) -> &str {
        &self.container.name
    }
}

/// Run the checks in order, stopping at the first failure.
pub fn check_prerequisites(runner: &dyn ToolRunner, method: DeployMethod) -> Result<Toolchain> {
    let container = find_container_tool(runner)?;
    info!(
        tool = %container.name,
        version = container.installed_version.as_deref().unwrap_or("unknown"),
        "container tool found"
    );

    let kubectl = runner
        .locate("kubectl")
        .map(|path| BinaryCheck {
            name: "kubectl".to_string(),
            path,
            installed_version: runner
                .probe(&Invocation::new("kubectl").args(["version", "--client"]))
                .and_then(|out| extract_version(&out)),
        })
        .ok_or_else(|| DeployError::MissingTool {
            tool: "kubectl".to_string(),
            hint: "see https://kubernetes.io/docs/tasks/tools/".to_string(),
        })?;
    info!(
        version = kubectl.installed_version.as_deref().unwrap_or("unknown"),
        "kubectl found"
    );

    let cluster_info = Invocation::new("kubectl").arg("cluster-info");
    if let Err(err) = runner.read(&cluster_info) {
        debug!(error = %err, "cluster-info failed");
        return Err(DeployError::ClusterUnreachable {
            command: cluster_info.to_string(),
        });
    }
    info!("cluster reachable");

    if method == DeployMethod::Kustomize {
        if let Some(version) = &kubectl.installed_version {
            if !version_meets_requirement(version, KUSTOMIZE_KUBECTL_REQUIREMENT).unwrap_or(true) {
                warn!(
                    version = %version,
                    required = KUSTOMIZE_KUBECTL_REQUIREMENT,
                    "kubectl may be too old for `kubectl kustomize`"
                );
            }
        }
    }

    Ok(Toolchain { container, kubectl })
}

/// docker first, podman as a drop-in alternative.
fn find_container_tool(runner: &dyn ToolRunner) -> Result<BinaryCheck> {
    for name in ["docker", "podman"] {
        if let Some(path) = runner.locate(name) {
            if name == "podman" {
                info!("docker not found, using podman as the container tool");
            }
            let installed_version = runner
                .probe(&Invocation::new(name).arg("--version"))
                .and_then(|out| extract_version(&out));
            return Ok(BinaryCheck {
                name: name.to_string(),
                path,
                installed_version,
            });
        }
    }

    Err(DeployError::MissingTool {
        tool: "docker".to_string(),
        hint: "install Docker, or Podman as an alternative".to_string(),
    })
}

/// Extract semantic version from version output
/// Handles various formats:
///   "Docker version 24.0.7, build afdd53b" -> "24.0.7"
///   "Client Version: v1.29.2" -> "1.29.2"
///   "podman version 4.9.3" -> "4.9.3"
fn extract_version(output: &str) -> Option<String> {
    let re = regex::Regex::new(r"v?(\d+\.\d+\.\d+)").ok()?;
    re.captures(output)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check if installed version meets a requirement such as ">=1.14.0"
fn version_meets_requirement(installed: &str, requirement: &str) -> Result<bool, semver::Error> {
    let installed = semver::Version::parse(installed.trim())?;
    let requirement = semver::VersionReq::parse(requirement.trim())?;
    Ok(requirement.matches(&installed))
}
