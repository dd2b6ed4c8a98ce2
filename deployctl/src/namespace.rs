//! Idempotent namespace creation

use crate::error::Result;
use crate::runner::{Invocation, ToolRunner};
use tracing::info;

/// Render the namespace client-side and apply it, so an existing namespace
/// is left as it is and repeated runs never fail on "already exists".
pub fn ensure_namespace(runner: &dyn ToolRunner, namespace: &str) -> Result<()> {
    println!("📁 Ensuring namespace {namespace}");
    let manifest = runner.read(&Invocation::new("kubectl").args([
        "create",
        "namespace",
        namespace,
        "--dry-run=client",
        "-o",
        "yaml",
    ]))?;

    runner.run(
        &Invocation::new("kubectl")
            .args(["apply", "-f", "-"])
            .stdin(manifest),
    )?;
    info!(%namespace, "namespace ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::FakeRunner;

    const RENDERED: &str = "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: biosim\n";

    #[test]
    fn test_render_then_apply() {
        let runner = FakeRunner::with_tools(&["kubectl"]).respond("kubectl create namespace", RENDERED);
        ensure_namespace(&runner, "biosim").unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                "kubectl create namespace biosim --dry-run=client -o yaml",
                "kubectl apply -f -",
            ]
        );
        assert_eq!(runner.stdin_of("kubectl apply").as_deref(), Some(RENDERED));
    }

    #[test]
    fn test_repeated_runs_never_create_directly() {
        let runner = FakeRunner::with_tools(&["kubectl"]).respond("kubectl create namespace", RENDERED);
        ensure_namespace(&runner, "biosim").unwrap();
        ensure_namespace(&runner, "biosim").unwrap();

        let commands = runner.commands();
        assert_eq!(commands.len(), 4);
        assert!(
            commands
                .iter()
                .filter(|c| c.starts_with("kubectl create"))
                .all(|c| c.contains("--dry-run=client"))
        );
    }

    #[test]
    fn test_apply_failure_is_fatal() {
        let runner = FakeRunner::with_tools(&["kubectl"])
            .respond("kubectl create namespace", RENDERED)
            .fail_on("kubectl apply", 1);
        assert!(ensure_namespace(&runner, "biosim").is_err());
    }
}
