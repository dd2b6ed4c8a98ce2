//! Service endpoint lookup
//!
//! Purely diagnostic: lookups that fail or come back empty are reported as
//! placeholders instead of failing the run.

use crate::config::{HealthSettings, WorkloadSettings};
use crate::runner::{Invocation, ToolRunner};
use serde::Serialize;

pub const PENDING: &str = "pending";
pub const NOT_CONFIGURED: &str = "not configured";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEndpoints {
    pub backend_address: String,
    pub frontend_address: String,
    pub ingress_host: String,
    pub ingress_address: String,
}

pub fn collect_endpoints(
    runner: &dyn ToolRunner,
    namespace: &str,
    workloads: &WorkloadSettings,
) -> ServiceEndpoints {
    ServiceEndpoints {
        backend_address: load_balancer_address(runner, "svc", &workloads.backend_service, namespace)
            .unwrap_or_else(|| PENDING.to_string()),
        frontend_address: load_balancer_address(
            runner,
            "svc",
            &workloads.frontend_service,
            namespace,
        )
        .unwrap_or_else(|| PENDING.to_string()),
        ingress_host: jsonpath(
            runner,
            "ingress",
            &workloads.ingress,
            namespace,
            "{.spec.rules[0].host}",
        )
        .unwrap_or_else(|| NOT_CONFIGURED.to_string()),
        ingress_address: load_balancer_address(runner, "ingress", &workloads.ingress, namespace)
            .unwrap_or_else(|| PENDING.to_string()),
    }
}

/// Load-balancer IP, or hostname for providers that hand out DNS names (EKS).
fn load_balancer_address(
    runner: &dyn ToolRunner,
    kind: &str,
    name: &str,
    namespace: &str,
) -> Option<String> {
    jsonpath(runner, kind, name, namespace, "{.status.loadBalancer.ingress[0].ip}").or_else(|| {
        jsonpath(
            runner,
            kind,
            name,
            namespace,
            "{.status.loadBalancer.ingress[0].hostname}",
        )
    })
}

fn jsonpath(
    runner: &dyn ToolRunner,
    kind: &str,
    name: &str,
    namespace: &str,
    expression: &str,
) -> Option<String> {
    runner.probe(
        &Invocation::new("kubectl")
            .args(["get", kind, name, "-n", namespace, "-o"])
            .arg(format!("jsonpath={expression}")),
    )
}

/// Fallback access instructions, printed whether or not a load balancer exists.
pub fn port_forward_hints(
    namespace: &str,
    workloads: &WorkloadSettings,
    health: &HealthSettings,
) -> Vec<String> {
    vec![
        format!(
            "kubectl port-forward svc/{} {}:{} -n {namespace}",
            workloads.backend_service, health.local_port, health.service_port
        ),
        format!(
            "kubectl port-forward svc/{} {}:{} -n {namespace}",
            workloads.frontend_service, health.frontend_local_port, health.frontend_service_port
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::FakeRunner;

    #[test]
    fn test_placeholders_when_nothing_resolves() {
        let runner = FakeRunner::with_tools(&["kubectl"]);
        let endpoints = collect_endpoints(&runner, "biosim", &WorkloadSettings::default());
        assert_eq!(
            endpoints,
            ServiceEndpoints {
                backend_address: PENDING.to_string(),
                frontend_address: PENDING.to_string(),
                ingress_host: NOT_CONFIGURED.to_string(),
                ingress_address: PENDING.to_string(),
            }
        );
    }

    #[test]
    fn test_failed_lookups_are_not_fatal() {
        let runner = FakeRunner::with_tools(&["kubectl"]).fail_on("kubectl get", 1);
        let endpoints = collect_endpoints(&runner, "biosim", &WorkloadSettings::default());
        assert_eq!(endpoints.backend_address, PENDING);
        assert_eq!(endpoints.ingress_host, NOT_CONFIGURED);
    }

    #[test]
    fn test_resolved_addresses() {
        let runner = FakeRunner::with_tools(&["kubectl"])
            .respond(
                "kubectl get svc biosim-backend -n biosim -o jsonpath={.status.loadBalancer.ingress[0].ip}",
                "34.120.8.1\n",
            )
            .respond(
                "kubectl get svc biosim-frontend -n biosim -o jsonpath={.status.loadBalancer.ingress[0].hostname}",
                "a1b2.elb.amazonaws.com",
            )
            .respond(
                "kubectl get ingress biosim-ingress -n biosim -o jsonpath={.spec.rules[0].host}",
                "biosim.example.org",
            );

        let endpoints = collect_endpoints(&runner, "biosim", &WorkloadSettings::default());
        assert_eq!(endpoints.backend_address, "34.120.8.1");
        assert_eq!(endpoints.frontend_address, "a1b2.elb.amazonaws.com");
        assert_eq!(endpoints.ingress_host, "biosim.example.org");
        assert_eq!(endpoints.ingress_address, PENDING);
    }

    #[test]
    fn test_port_forward_hints() {
        let hints = port_forward_hints(
            "biosim",
            &WorkloadSettings::default(),
            &HealthSettings::default(),
        );
        assert_eq!(
            hints,
            vec![
                "kubectl port-forward svc/biosim-backend 8000:8000 -n biosim",
                "kubectl port-forward svc/biosim-frontend 3000:80 -n biosim",
            ]
        );
    }
}
