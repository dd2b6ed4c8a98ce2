//! Deployment report
//!
//! Printed for humans at the end of every successful run, and optionally
//! written as TOML for CI jobs that want to pick up the endpoints.

use crate::config::{ClusterType, DeployMethod};
use crate::endpoints::ServiceEndpoints;
use crate::error::{RenderReportSnafu, Result, WriteReportSnafu};
use crate::health::HealthOutcome;
use serde::Serialize;
use snafu::ResultExt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub timestamp: String,
    pub namespace: String,
    pub image: String,
    pub cluster_type: ClusterType,
    /// Strategy that actually ran, after any Helm fallback
    pub strategy: DeployMethod,
    pub port_forward: Vec<String>,
    pub health: HealthOutcome,
    pub endpoints: ServiceEndpoints,
}

/// Write the report as TOML, creating parent directories as needed.
pub fn write_report(report: &DeploymentReport, output_path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(report).context(RenderReportSnafu)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(WriteReportSnafu { path: parent })?;
    }

    fs::write(output_path, content).context(WriteReportSnafu { path: output_path })?;
    Ok(())
}

/// Print report to stdout in human-readable format
pub fn print_report(report: &DeploymentReport) {
    println!();
    println!("🧬 Deployment Report");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Generated: {}", report.timestamp);
    println!("Namespace: {}", report.namespace);
    println!("Image:     {}", report.image);
    println!("Cluster:   {}", report.cluster_type);
    println!("Strategy:  {}", report.strategy);
    println!();

    println!("🌐 Endpoints:");
    println!("  Backend:         {}", report.endpoints.backend_address);
    println!("  Frontend:        {}", report.endpoints.frontend_address);
    println!("  Ingress host:    {}", report.endpoints.ingress_host);
    println!("  Ingress address: {}", report.endpoints.ingress_address);
    println!();

    println!("🔌 Local access:");
    for hint in &report.port_forward {
        println!("  {hint}");
    }
    println!();

    match &report.health {
        HealthOutcome::Healthy => println!("✅ Backend health check passed"),
        HealthOutcome::Unhealthy { reason } => {
            println!("⚠️  Backend health check failed: {reason}");
            println!("   The deployment itself completed; check the backend logs.");
        }
    }
}
