//! Rollout waits
//!
//! Backend then frontend, each bounded by the configured timeout. A stalled or
//! failed rollout ends the run.

use crate::config::WorkloadSettings;
use crate::error::{Result, RolloutSnafu};
use crate::runner::{Invocation, ToolRunner};
use snafu::ResultExt;
use tracing::info;

pub fn wait_for_rollouts(
    runner: &dyn ToolRunner,
    namespace: &str,
    workloads: &WorkloadSettings,
) -> Result<()> {
    for deployment in [&workloads.backend_deployment, &workloads.frontend_deployment] {
        println!("⏳ Waiting for deployment/{deployment}");
        runner
            .run(&rollout_status(namespace, deployment, workloads.rollout_timeout_secs))
            .context(RolloutSnafu { deployment })?;
        info!(%deployment, "rollout complete");
    }
    Ok(())
}

fn rollout_status(namespace: &str, deployment: &str, timeout_secs: u64) -> Invocation {
    Invocation::new("kubectl")
        .args(["rollout", "status"])
        .arg(format!("deployment/{deployment}"))
        .args(["-n", namespace])
        .arg(format!("--timeout={timeout_secs}s"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;
    use crate::runner::fake::FakeRunner;

    #[test]
    fn test_waits_on_both_deployments() {
        let runner = FakeRunner::with_tools(&["kubectl"]);
        wait_for_rollouts(&runner, "biosim", &WorkloadSettings::default()).unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "kubectl rollout status deployment/biosim-backend -n biosim --timeout=300s",
                "kubectl rollout status deployment/biosim-frontend -n biosim --timeout=300s",
            ]
        );
    }

    #[test]
    fn test_backend_timeout_skips_frontend() {
        let runner = FakeRunner::with_tools(&["kubectl"])
            .fail_on("kubectl rollout status deployment/biosim-backend", 1);
        let err = wait_for_rollouts(&runner, "biosim", &WorkloadSettings::default()).unwrap_err();

        assert!(matches!(err, DeployError::Rollout { ref deployment, .. } if deployment == "biosim-backend"));
        assert_eq!(err.exit_code(), 1);
        assert!(!runner.ran("kubectl rollout status deployment/biosim-frontend"));
    }

    #[test]
    fn test_frontend_failure_is_fatal() {
        let runner = FakeRunner::with_tools(&["kubectl"])
            .fail_on("kubectl rollout status deployment/biosim-frontend", 1);
        let err = wait_for_rollouts(&runner, "biosim", &WorkloadSettings::default()).unwrap_err();
        assert!(err.to_string().contains("deployment/biosim-frontend"));
    }
}
