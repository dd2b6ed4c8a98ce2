//! Cloud-provider add-ons
//!
//! Managed clusters get an ingress controller before the workload lands.
//! Generic or unrecognised cluster types are left alone.

use crate::config::{ClusterType, IngressControllers};
use crate::error::Result;
use crate::runner::{Invocation, ToolRunner};
use tracing::{debug, info};

/// Ingress controller manifest to apply for `cluster_type`, if any.
pub fn ingress_manifest<'a>(
    cluster_type: &ClusterType,
    controllers: &'a IngressControllers,
) -> Option<&'a str> {
    match cluster_type {
        ClusterType::Gke => Some(&controllers.gke),
        ClusterType::Aks => Some(&controllers.aks),
        ClusterType::Eks => Some(&controllers.eks),
        ClusterType::Generic | ClusterType::Other(_) => None,
    }
}

pub fn configure_cluster(
    runner: &dyn ToolRunner,
    cluster_type: &ClusterType,
    controllers: &IngressControllers,
) -> Result<()> {
    let Some(url) = ingress_manifest(cluster_type, controllers) else {
        debug!(%cluster_type, "no provider add-ons for this cluster type");
        return Ok(());
    };

    println!("☁️  Configuring {cluster_type} cluster: applying ingress controller");
    runner.run(&Invocation::new("kubectl").args(["apply", "-f", url]))?;
    info!(%cluster_type, manifest = %url, "ingress controller applied");
    Ok(())
}
