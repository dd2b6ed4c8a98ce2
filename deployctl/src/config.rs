//! Deployment configuration
//!
//! [`Settings`] come from an optional `deployctl.toml` and describe the
//! project layout (paths, workload names, pinned add-on URLs). The
//! per-invocation [`DeploymentConfig`] is resolved once from settings,
//! environment and flags, and is never mutated afterwards.

use crate::cli::Cli;
use crate::error::{ParseSettingsSnafu, ReadSettingsSnafu, Result};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Settings file picked up from the working directory when none is given.
pub const DEFAULT_SETTINGS_FILE: &str = "deployctl.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ClusterType {
    Gke,
    Eks,
    Aks,
    Generic,
    /// Anything else; treated like `Generic`.
    Other(String),
}

impl FromStr for ClusterType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "gke" => ClusterType::Gke,
            "eks" => ClusterType::Eks,
            "aks" => ClusterType::Aks,
            "generic" | "" => ClusterType::Generic,
            _ => ClusterType::Other(s.trim().to_string()),
        })
    }
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterType::Gke => f.write_str("gke"),
            ClusterType::Eks => f.write_str("eks"),
            ClusterType::Aks => f.write_str("aks"),
            ClusterType::Generic => f.write_str("generic"),
            ClusterType::Other(raw) => f.write_str(raw),
        }
    }
}

impl From<ClusterType> for String {
    fn from(value: ClusterType) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMethod {
    /// Plain `kubectl apply` of a single manifest.
    Kubectl,
    Helm,
    Kustomize,
}

impl DeployMethod {
    /// Helm wins over Kustomize; neither means a plain apply.
    pub fn from_flags(helm: bool, kustomize: bool) -> Self {
        if helm {
            DeployMethod::Helm
        } else if kustomize {
            DeployMethod::Kustomize
        } else {
            DeployMethod::Kubectl
        }
    }
}

impl fmt::Display for DeployMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeployMethod::Kubectl => "kubectl",
            DeployMethod::Helm => "helm",
            DeployMethod::Kustomize => "kustomize",
        })
    }
}

/// Everything one run needs to know; built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub namespace: String,
    pub registry: String,
    pub image_name: String,
    pub image_tag: String,
    pub cluster_type: ClusterType,
    pub deploy_method: DeployMethod,
    pub do_build: bool,
    pub do_push: bool,
}

impl DeploymentConfig {
    /// Layer flags (and the env vars clap already folded into them) over the settings file.
    pub fn resolve(cli: &Cli, settings: &Settings) -> Self {
        let defaults = &settings.defaults;
        let pick = |flag: &Option<String>, fallback: &str| {
            flag.clone().unwrap_or_else(|| fallback.to_string())
        };

        let cluster_type = cli
            .cluster_type
            .as_deref()
            .unwrap_or(&defaults.cluster_type)
            .parse()
            .unwrap_or(ClusterType::Generic);

        Self {
            namespace: pick(&cli.namespace, &defaults.namespace),
            registry: pick(&cli.registry, &defaults.registry),
            image_name: pick(&cli.image_name, &defaults.image_name),
            image_tag: pick(&cli.tag, &defaults.image_tag),
            cluster_type,
            deploy_method: DeployMethod::from_flags(cli.helm, cli.kustomize),
            do_build: cli.build,
            do_push: cli.push,
        }
    }

    /// `<registry>/<image>`, or just the image name when no registry is set.
    pub fn image_repository(&self) -> String {
        let registry = self.registry.trim_end_matches('/');
        if registry.is_empty() {
            self.image_name.clone()
        } else {
            format!("{registry}/{}", self.image_name)
        }
    }

    /// Full `<registry>/<image>:<tag>` reference.
    pub fn image_reference(&self) -> String {
        format!("{}:{}", self.image_repository(), self.image_tag)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub defaults: ProjectDefaults,
    pub build: BuildSettings,
    pub manifests: ManifestSettings,
    pub workloads: WorkloadSettings,
    pub ingress_controllers: IngressControllers,
    pub health: HealthSettings,
}

/// Values used when neither a flag nor its environment variable is set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectDefaults {
    pub namespace: String,
    pub registry: String,
    pub image_name: String,
    pub image_tag: String,
    pub cluster_type: String,
}

impl Default for ProjectDefaults {
    fn default() -> Self {
        Self {
            namespace: "biosim".to_string(),
            registry: "localhost:5000".to_string(),
            image_name: "biosim-backend".to_string(),
            image_tag: "latest".to_string(),
            cluster_type: "generic".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    pub context: PathBuf,
    pub dockerfile: String,
    /// Checked in order; the first one present in the context wins over `dockerfile`.
    pub alternate_dockerfiles: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            context: PathBuf::from("."),
            dockerfile: "Dockerfile".to_string(),
            alternate_dockerfiles: vec!["Dockerfile.fixed".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestSettings {
    pub direct: PathBuf,
    pub chart: PathBuf,
    pub release: String,
    /// Helm value keys receiving the backend image repository and tag.
    pub image_repository_key: String,
    pub image_tag_key: String,
    pub kustomize: PathBuf,
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            direct: PathBuf::from("k8s/deployment.yaml"),
            chart: PathBuf::from("helm/biosim"),
            release: "biosim".to_string(),
            image_repository_key: "backend.image.repository".to_string(),
            image_tag_key: "backend.image.tag".to_string(),
            kustomize: PathBuf::from("k8s/kustomize"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadSettings {
    pub backend_deployment: String,
    pub frontend_deployment: String,
    pub backend_service: String,
    pub frontend_service: String,
    pub ingress: String,
    pub rollout_timeout_secs: u64,
}

impl Default for WorkloadSettings {
    fn default() -> Self {
        Self {
            backend_deployment: "biosim-backend".to_string(),
            frontend_deployment: "biosim-frontend".to_string(),
            backend_service: "biosim-backend".to_string(),
            frontend_service: "biosim-frontend".to_string(),
            ingress: "biosim-ingress".to_string(),
            rollout_timeout_secs: 300,
        }
    }
}

/// Version-pinned ingress-nginx manifests per provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngressControllers {
    pub gke: String,
    pub aks: String,
    pub eks: String,
}

const INGRESS_NGINX_CLOUD: &str = "https://raw.githubusercontent.com/kubernetes/ingress-nginx/controller-v1.8.1/deploy/static/provider/cloud/deploy.yaml";
const INGRESS_NGINX_AWS: &str = "https://raw.githubusercontent.com/kubernetes/ingress-nginx/controller-v1.8.1/deploy/static/provider/aws/deploy.yaml";

impl Default for IngressControllers {
    fn default() -> Self {
        Self {
            gke: INGRESS_NGINX_CLOUD.to_string(),
            aks: INGRESS_NGINX_CLOUD.to_string(),
            eks: INGRESS_NGINX_AWS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthSettings {
    pub path: String,
    pub success_marker: String,
    pub local_port: u16,
    pub service_port: u16,
    pub settle_delay_secs: u64,
    pub request_timeout_secs: u64,
    /// Only used for the printed port-forward hint.
    pub frontend_local_port: u16,
    pub frontend_service_port: u16,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            success_marker: "healthy".to_string(),
            local_port: 8000,
            service_port: 8000,
            settle_delay_secs: 5,
            request_timeout_secs: 10,
            frontend_local_port: 3000,
            frontend_service_port: 80,
        }
    }
}

impl HealthSettings {
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.local_port, self.path)
    }
}

impl Settings {
    /// Load settings. An explicit path must exist; otherwise `deployctl.toml`
    /// in the working directory is used if present, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if !fallback.is_file() {
                    debug!("no {DEFAULT_SETTINGS_FILE} found, using built-in defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let content = std::fs::read_to_string(&path).context(ReadSettingsSnafu { path: &path })?;
        let settings = toml::from_str(&content).context(ParseSettingsSnafu { path: &path })?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("deployctl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cluster_type_parsing() {
        assert_eq!("GKE".parse::<ClusterType>().unwrap(), ClusterType::Gke);
        assert_eq!("eks".parse::<ClusterType>().unwrap(), ClusterType::Eks);
        assert_eq!("".parse::<ClusterType>().unwrap(), ClusterType::Generic);
        assert_eq!(
            "openshift".parse::<ClusterType>().unwrap(),
            ClusterType::Other("openshift".to_string())
        );
        assert_eq!(ClusterType::Other("k3s".to_string()).to_string(), "k3s");
    }

    #[test]
    fn test_helm_takes_precedence() {
        assert_eq!(DeployMethod::from_flags(true, true), DeployMethod::Helm);
        assert_eq!(DeployMethod::from_flags(false, true), DeployMethod::Kustomize);
        assert_eq!(DeployMethod::from_flags(false, false), DeployMethod::Kubectl);
    }

    #[test]
    fn test_flags_override_settings() {
        let mut settings = Settings::default();
        settings.defaults.registry = "registry.example.com".to_string();
        settings.defaults.namespace = "staging".to_string();

        let config = DeploymentConfig::resolve(
            &cli(&["--build", "--tag", "v3.0-fixed", "--kustomize"]),
            &settings,
        );
        assert_eq!(config.registry, "registry.example.com");
        assert_eq!(config.namespace, "staging");
        assert_eq!(config.image_tag, "v3.0-fixed");
        assert_eq!(config.deploy_method, DeployMethod::Kustomize);
        assert!(config.do_build);
        assert!(!config.do_push);
        assert_eq!(
            config.image_reference(),
            "registry.example.com/biosim-backend:v3.0-fixed"
        );

        let config = DeploymentConfig::resolve(
            &cli(&["--registry", "ghcr.io/lab/", "--cluster-type", "aks"]),
            &settings,
        );
        assert_eq!(config.image_repository(), "ghcr.io/lab/biosim-backend");
        assert_eq!(config.cluster_type, ClusterType::Aks);
    }

    #[test]
    fn test_empty_registry_uses_bare_image() {
        let mut settings = Settings::default();
        settings.defaults.registry = String::new();
        let config = DeploymentConfig::resolve(&cli(&[]), &settings);
        assert_eq!(config.image_reference(), "biosim-backend:latest");
    }

    #[test]
    fn test_load_partial_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployctl.toml");
        std::fs::write(
            &path,
            r#"
[defaults]
namespace = "docking"

[workloads]
rollout_timeout_secs = 120

[ingress_controllers]
eks = "https://example.com/aws/deploy.yaml"
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.defaults.namespace, "docking");
        assert_eq!(settings.defaults.image_name, "biosim-backend");
        assert_eq!(settings.workloads.rollout_timeout_secs, 120);
        assert_eq!(settings.workloads.backend_deployment, "biosim-backend");
        assert_eq!(settings.ingress_controllers.eks, "https://example.com/aws/deploy.yaml");
        assert_eq!(settings.ingress_controllers.gke, INGRESS_NGINX_CLOUD);
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let example =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("../deployctl.example.toml");
        assert_eq!(Settings::load(Some(&example)).unwrap(), Settings::default());
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployctl.toml");
        std::fs::write(&path, "[workloads]\nrollout_timeout = 5\n").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)),
            Err(crate::error::DeployError::ParseSettings { .. })
        ));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Settings::load(Some(&missing)),
            Err(crate::error::DeployError::ReadSettings { .. })
        ));
    }
}
