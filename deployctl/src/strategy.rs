//! Deployment strategy dispatch
//!
//! Exactly one strategy runs per invocation. Helm degrades to a plain
//! `kubectl apply` when the helm binary is not installed.

use crate::config::{DeployMethod, DeploymentConfig, Settings};
use crate::error::Result;
use crate::runner::{Invocation, ToolRunner};
use regex::{Captures, Regex};
use tracing::{info, warn};

/// Apply the workload and return the strategy that actually ran.
pub fn deploy(
    runner: &dyn ToolRunner,
    config: &DeploymentConfig,
    settings: &Settings,
) -> Result<DeployMethod> {
    let method = match config.deploy_method {
        DeployMethod::Helm if runner.locate("helm").is_none() => {
            warn!("helm requested but not installed, falling back to kubectl apply");
            DeployMethod::Kubectl
        }
        method => method,
    };

    match method {
        DeployMethod::Kubectl => apply_direct(runner, config, settings)?,
        DeployMethod::Helm => upgrade_release(runner, config, settings)?,
        DeployMethod::Kustomize => apply_overlay(runner, config, settings)?,
    }
    info!(strategy = %method, namespace = %config.namespace, "workload applied");
    Ok(method)
}

fn apply_direct(
    runner: &dyn ToolRunner,
    config: &DeploymentConfig,
    settings: &Settings,
) -> Result<()> {
    let manifest = settings.manifests.direct.to_string_lossy();
    println!("📦 Applying {manifest}");
    runner.run(
        &Invocation::new("kubectl")
            .args(["apply", "-f"])
            .arg(manifest)
            .args(["-n", config.namespace.as_str()]),
    )
}

fn upgrade_release(
    runner: &dyn ToolRunner,
    config: &DeploymentConfig,
    settings: &Settings,
) -> Result<()> {
    let manifests = &settings.manifests;
    println!(
        "⎈ Upgrading Helm release {} from {}",
        manifests.release,
        manifests.chart.display()
    );
    runner.run(
        &Invocation::new("helm")
            .args(["upgrade", "--install", manifests.release.as_str()])
            .arg(manifests.chart.to_string_lossy())
            .args(["--namespace", config.namespace.as_str()])
            .arg("--set")
            .arg(format!(
                "{}={}",
                manifests.image_repository_key,
                config.image_repository()
            ))
            .arg("--set")
            .arg(format!("{}={}", manifests.image_tag_key, config.image_tag))
            .arg("--wait")
            .arg("--timeout")
            .arg(format!("{}s", settings.workloads.rollout_timeout_secs)),
    )
}

fn apply_overlay(
    runner: &dyn ToolRunner,
    config: &DeploymentConfig,
    settings: &Settings,
) -> Result<()> {
    let overlay = settings.manifests.kustomize.to_string_lossy();
    println!("🧩 Applying kustomize overlay {overlay}");
    let rendered = runner.read(&Invocation::new("kubectl").arg("kustomize").arg(overlay))?;
    let patched = substitute_image(&rendered, &config.image_name, &config.image_reference());

    runner.run(
        &Invocation::new("kubectl")
            .args(["apply", "-n", config.namespace.as_str(), "-f", "-"])
            .stdin(patched),
    )
}

/// Point every `image:` line that names `image_name` at `reference`.
///
/// Plain text substitution on the rendered output: indentation, list dashes
/// and trailing comments are kept, every other line is left untouched.
/// An empty `image_name` matches nothing.
pub fn substitute_image(rendered: &str, image_name: &str, reference: &str) -> String {
    if image_name.is_empty() {
        warn!("empty image name, leaving manifests unchanged");
        return rendered.to_string();
    }
    let pattern = format!(
        r#"(?m)^(?P<key>[ \t]*(?:-[ \t]*)?image:[ \t]*)["']?[^\s"'#]*{}[^\s"'#]*["']?"#,
        regex::escape(image_name)
    );
    let Ok(re) = Regex::new(&pattern) else {
        warn!(%image_name, "could not build image pattern, leaving manifests unchanged");
        return rendered.to_string();
    };

    re.replace_all(rendered, |caps: &Captures<'_>| {
        format!("{}{reference}", &caps["key"])
    })
    .into_owned()
}
