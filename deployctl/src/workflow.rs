//! Deployment orchestrator
//!
//! Runs the steps in order: prerequisites, image build/push, namespace,
//! provider add-ons, strategy, rollouts, then the best-effort endpoint lookup
//! and health probe. Any fatal step stops the run with nothing rolled back.

use crate::config::{DeploymentConfig, Settings};
use crate::endpoints::{collect_endpoints, port_forward_hints};
use crate::error::Result;
use crate::health::check_health;
use crate::report::DeploymentReport;
use crate::runner::ToolRunner;
use crate::{image, namespace, prereq, provider, rollout, strategy};
use chrono::Utc;
use tracing::info;

pub struct Orchestrator<'a> {
    runner: &'a dyn ToolRunner,
    config: DeploymentConfig,
    settings: Settings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(runner: &'a dyn ToolRunner, config: DeploymentConfig, settings: Settings) -> Self {
        Self {
            runner,
            config,
            settings,
        }
    }

    pub async fn run(&self) -> Result<DeploymentReport> {
        let config = &self.config;
        let settings = &self.settings;
        println!(
            "🚀 Deploying {} to namespace {} ({} cluster, {} strategy)",
            config.image_reference(),
            config.namespace,
            config.cluster_type,
            config.deploy_method
        );

        println!("📋 Checking prerequisites...");
        let toolchain = prereq::check_prerequisites(self.runner, config.deploy_method)?;

        if config.do_build {
            image::build_image(
                self.runner,
                toolchain.container_tool(),
                config,
                &settings.build,
            )?;
        }
        if config.do_push {
            image::push_image(self.runner, toolchain.container_tool(), config)?;
        }

        namespace::ensure_namespace(self.runner, &config.namespace)?;
        provider::configure_cluster(
            self.runner,
            &config.cluster_type,
            &settings.ingress_controllers,
        )?;
        let strategy = strategy::deploy(self.runner, config, settings)?;
        rollout::wait_for_rollouts(self.runner, &config.namespace, &settings.workloads)?;
        info!("rollouts complete, deployment applied");

        let endpoints = collect_endpoints(self.runner, &config.namespace, &settings.workloads);
        let health = check_health(
            self.runner,
            &config.namespace,
            &settings.workloads,
            &settings.health,
        )
        .await;

        Ok(DeploymentReport {
            timestamp: Utc::now().to_rfc3339(),
            namespace: config.namespace.clone(),
            image: config.image_reference(),
            cluster_type: config.cluster_type.clone(),
            strategy,
            port_forward: port_forward_hints(
                &config.namespace,
                &settings.workloads,
                &settings.health,
            ),
            health,
            endpoints,
        })
    }
}
