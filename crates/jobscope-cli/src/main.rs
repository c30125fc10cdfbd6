//! jobscope CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobscope_cli::cli::{Cli, Commands};
use jobscope_cli::commands::{
    CommandContext, ContextCommand, DashboardCommand, ExperimentCommand, JobCommand,
    ProjectCommand,
};
use jobscope_cli::error::EXIT_REMOTE;
use jobscope_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::from(EXIT_REMOTE);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), jobscope_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let ctx = CommandContext::from_cli(&cli)?;
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Project(args) => {
            let cmd = ProjectCommand::new(&ctx);
            cmd.execute(&mut stdout, &format, args).await?;
        }
        Commands::Experiment(args) => {
            let cmd = ExperimentCommand::new(&ctx);
            cmd.execute(&mut stdout, &format, args).await?;
        }
        Commands::Job(args) => {
            let cmd = JobCommand::new(&ctx);
            cmd.execute(&mut stdout, &format, args).await?;
        }
        Commands::Context { command } => {
            let cmd = ContextCommand::new(&ctx);
            cmd.execute(&mut stdout, &format, *command)?;
        }
        Commands::Dashboard(args) => {
            let cmd = DashboardCommand::new(&ctx);
            cmd.execute(&mut stdout, &format, *args)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobscope_cli::error::EXIT_USAGE;

    fn cli(state_dir: &std::path::Path, args: &[&str]) -> Cli {
        let config = state_dir.join("absent-config.toml");
        std::fs::write(&config, "").expect("write empty config");
        let mut full = vec![
            "jobscope",
            "--state-dir",
            state_dir.to_str().expect("utf8 path"),
            "--config",
            config.to_str().expect("utf8 path"),
        ];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[tokio::test]
    async fn run_context_show_without_gateway() {
        let dir = tempfile::tempdir().expect("tempdir");
        run(cli(dir.path(), &["context", "show"]))
            .await
            .expect("context show is local");
    }

    #[tokio::test]
    async fn run_job_get_without_context_fails_locally() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = run(cli(dir.path(), &["-g", "ws://127.0.0.1:1", "job", "get"]))
            .await
            .expect_err("unresolved");
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[tokio::test]
    async fn run_with_invalid_gateway_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = run(cli(
            dir.path(),
            &["-g", "http://invalid", "project", "-p", "adam/mnist", "get"],
        ))
        .await
        .expect_err("invalid gateway");
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[tokio::test]
    async fn run_project_get_no_gateway() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = run(cli(
            dir.path(),
            &["-g", "ws://127.0.0.1:1", "project", "-p", "adam/mnist", "get"],
        ))
        .await
        .expect_err("no gateway");
        assert_eq!(err.exit_code(), EXIT_REMOTE);
    }
}
