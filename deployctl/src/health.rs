//! Post-deploy smoke test
//!
//! Advisory only: the outcome is printed and recorded in the report but never
//! changes the exit code.

use crate::config::{HealthSettings, WorkloadSettings};
use crate::error::Result;
use crate::runner::{BackgroundProcess, Invocation, ToolRunner};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Recorded in the report as a `[health]` table with a `status` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthOutcome {
    Healthy,
    Unhealthy { reason: String },
}

impl HealthOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthOutcome::Healthy)
    }
}

impl fmt::Display for HealthOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthOutcome::Healthy => f.write_str("healthy"),
            HealthOutcome::Unhealthy { reason } => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// A running `kubectl port-forward`, torn down when dropped.
///
/// Dropping covers every way out of the probe: normal return, `?`, and
/// unwinding.
pub struct PortForward {
    process: Box<dyn BackgroundProcess>,
    target: String,
}

impl PortForward {
    pub fn open(
        runner: &dyn ToolRunner,
        namespace: &str,
        service: &str,
        local_port: u16,
        service_port: u16,
    ) -> Result<Self> {
        let target = format!("svc/{service}");
        let process = runner.spawn(
            &Invocation::new("kubectl")
                .arg("port-forward")
                .arg(&target)
                .arg(format!("{local_port}:{service_port}"))
                .args(["-n", namespace]),
        )?;
        debug!(forward = %target, local_port, "port-forward started");
        Ok(Self { process, target })
    }
}

impl Drop for PortForward {
    fn drop(&mut self) {
        match self.process.kill() {
            Ok(()) => debug!(forward = %self.target, "port-forward stopped"),
            Err(err) => warn!(forward = %self.target, error = %err, "failed to stop port-forward"),
        }
    }
}

pub async fn check_health(
    runner: &dyn ToolRunner,
    namespace: &str,
    workloads: &WorkloadSettings,
    health: &HealthSettings,
) -> HealthOutcome {
    println!("🩺 Checking backend health");
    let _forward = match PortForward::open(
        runner,
        namespace,
        &workloads.backend_service,
        health.local_port,
        health.service_port,
    ) {
        Ok(forward) => forward,
        Err(err) => {
            return HealthOutcome::Unhealthy {
                reason: format!("port-forward failed: {err}"),
            };
        }
    };

    tokio::time::sleep(Duration::from_secs(health.settle_delay_secs)).await;

    let url = health.url();
    match fetch_body(&url, Duration::from_secs(health.request_timeout_secs)).await {
        Ok(body) if body.contains(&health.success_marker) => HealthOutcome::Healthy,
        Ok(body) => {
            debug!(%url, %body, "health response without success marker");
            HealthOutcome::Unhealthy {
                reason: format!("{url} did not report {:?}", health.success_marker),
            }
        }
        Err(err) => HealthOutcome::Unhealthy {
            reason: format!("request to {url} failed: {err}"),
        },
    }
}

async fn fetch_body(url: &str, timeout: Duration) -> reqwest::Result<String> {
    // The probe only ever targets the local port-forward.
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .no_proxy()
        .build()?;
    client.get(url).send().await?.text().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::FakeRunner;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response with `body` and return the bound port.
    async fn serve_once(body: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        port
    }

    fn settings(port: u16) -> HealthSettings {
        HealthSettings {
            local_port: port,
            settle_delay_secs: 0,
            request_timeout_secs: 5,
            ..HealthSettings::default()
        }
    }

    #[tokio::test]
    async fn test_healthy_response() {
        let port = serve_once(r#"{"status":"healthy"}"#).await;
        let runner = FakeRunner::with_tools(&["kubectl"]);

        let outcome =
            check_health(&runner, "biosim", &WorkloadSettings::default(), &settings(port)).await;

        assert_eq!(outcome, HealthOutcome::Healthy);
        assert_eq!(
            runner.commands(),
            vec![format!(
                "kubectl port-forward svc/biosim-backend {port}:8000 -n biosim"
            )]
        );
        assert_eq!(runner.kills(), 1);
    }

    #[tokio::test]
    async fn test_proxy_environment_is_ignored() {
        // Nothing listens on the discard port, so a proxied request could not succeed.
        // SAFETY: only the reqwest clients in this module read these, and all bypass proxies.
        unsafe {
            std::env::set_var("HTTP_PROXY", "http://127.0.0.1:9");
            std::env::set_var("http_proxy", "http://127.0.0.1:9");
        }
        let port = serve_once(r#"{"status":"healthy"}"#).await;
        let runner = FakeRunner::with_tools(&["kubectl"]);

        let outcome =
            check_health(&runner, "biosim", &WorkloadSettings::default(), &settings(port)).await;

        assert_eq!(outcome, HealthOutcome::Healthy);
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let healthy = toml::to_string(&HealthOutcome::Healthy).unwrap();
        assert_eq!(healthy.trim(), "status = \"healthy\"");

        let unhealthy = toml::to_string(&HealthOutcome::Unhealthy {
            reason: "connection refused".to_string(),
        })
        .unwrap();
        assert!(unhealthy.contains("status = \"unhealthy\""));
        assert!(unhealthy.contains("reason = \"connection refused\""));
    }

    #[tokio::test]
    async fn test_missing_marker_is_unhealthy() {
        let port = serve_once(r#"{"status":"degraded"}"#).await;
        let runner = FakeRunner::with_tools(&["kubectl"]);

        let outcome =
            check_health(&runner, "biosim", &WorkloadSettings::default(), &settings(port)).await;

        assert!(!outcome.is_healthy());
        assert_eq!(runner.kills(), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_still_releases_forward() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let runner = FakeRunner::with_tools(&["kubectl"]);

        let outcome =
            check_health(&runner, "biosim", &WorkloadSettings::default(), &settings(port)).await;

        assert!(matches!(outcome, HealthOutcome::Unhealthy { .. }));
        assert_eq!(runner.kills(), 1);
    }

    #[tokio::test]
    async fn test_port_forward_failure() {
        let runner =
            FakeRunner::with_tools(&["kubectl"]).fail_on("kubectl port-forward", 1);

        let outcome =
            check_health(&runner, "biosim", &WorkloadSettings::default(), &settings(1)).await;

        match outcome {
            HealthOutcome::Unhealthy { reason } => assert!(reason.contains("port-forward failed")),
            HealthOutcome::Healthy => panic!("expected unhealthy"),
        }
        assert_eq!(runner.kills(), 0);
    }

    #[test]
    fn test_guard_kills_on_drop() {
        let runner = FakeRunner::with_tools(&["kubectl"]);
        {
            let _forward = PortForward::open(&runner, "biosim", "biosim-backend", 8000, 8000).unwrap();
            assert_eq!(runner.kills(), 0);
        }
        assert_eq!(runner.kills(), 1);
    }
}
