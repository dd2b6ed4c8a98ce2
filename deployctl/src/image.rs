//! Backend image build and push

use crate::config::{BuildSettings, DeploymentConfig};
use crate::error::Result;
use crate::runner::{Invocation, ToolRunner};
use std::path::PathBuf;
use tracing::info;

/// First alternate build file present in the context, else the default one.
pub fn select_build_file(build: &BuildSettings) -> PathBuf {
    build
        .alternate_dockerfiles
        .iter()
        .map(|name| build.context.join(name))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| build.context.join(&build.dockerfile))
}

pub fn build_image(
    runner: &dyn ToolRunner,
    tool: &str,
    config: &DeploymentConfig,
    build: &BuildSettings,
) -> Result<()> {
    let build_file = select_build_file(build);
    let reference = config.image_reference();
    println!("🔨 Building {reference} from {}", build_file.display());

    runner.run(
        &Invocation::new(tool)
            .arg("build")
            .arg("-f")
            .arg(build_file.to_string_lossy())
            .arg("-t")
            .arg(&reference)
            .arg(build.context.to_string_lossy()),
    )?;
    info!(image = %reference, "image built");
    Ok(())
}

/// Push whatever is tagged locally; a missing image is the tool's error to report.
pub fn push_image(runner: &dyn ToolRunner, tool: &str, config: &DeploymentConfig) -> Result<()> {
    let reference = config.image_reference();
    println!("📤 Pushing {reference}");
    runner.run(&Invocation::new(tool).arg("push").arg(&reference))?;
    info!(image = %reference, "image pushed");
    Ok(())
}
