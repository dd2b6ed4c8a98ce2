//! deployctl entry point
//!
//! Exit codes: 0 on success (even if the health probe fails) and for
//! `--help`/`--version`, 1 for input (including any other usage error) and
//! environment errors, otherwise the failing tool's own exit code.

use anyhow::{Context, Result};
use deployctl::cli::{self, Cli, ParseFailure};
use deployctl::{
    DeployError, DeploymentConfig, DuctRunner, Orchestrator, Settings, print_report, write_report,
};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match cli::parse(std::env::args_os()) {
        Ok(cli) => cli,
        Err(ParseFailure::Input(err)) => {
            eprintln!("❌ {err}");
            eprintln!("Run `deployctl --help` for the list of options");
            return ExitCode::from(1);
        }
        Err(ParseFailure::Clap(err)) if err.use_stderr() => {
            let _ = err.print();
            return ExitCode::from(1);
        }
        Err(ParseFailure::Clap(err)) => err.exit(),
    };

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "deployctl=debug" } else { "deployctl=info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings =
        Settings::load(cli.config_path().as_deref()).context("Failed to load settings")?;
    let config = DeploymentConfig::resolve(&cli, &settings);

    let runner = DuctRunner;
    let report = Orchestrator::new(&runner, config, settings).run().await?;
    print_report(&report);

    if let Some(path) = cli.report_path() {
        write_report(&report, &path).context("Failed to write deployment report")?;
        println!();
        println!("📄 Report written to: {}", path.display());
    }

    println!();
    println!("✅ Deployment complete!");
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<DeployError>()
        .map(DeployError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}
