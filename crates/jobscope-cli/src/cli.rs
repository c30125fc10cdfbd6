//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use jobscope_proto::JobRef;
use uuid::Uuid;

/// jobscope - inspect remote projects, experiments and jobs.
///
/// Identifiers left out of a command are taken from the last command that
/// successfully addressed them.
#[derive(Parser, Debug, Clone)]
#[command(name = "jobscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Gateway URL to connect to. Overrides the config file.
    #[arg(short, long, env = "JOBSCOPE_GATEWAY", global = true)]
    pub gateway: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    pub format: Format,

    /// Config file. Defaults to ~/.jobscope/config.toml.
    #[arg(long, env = "JOBSCOPE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for cached context. Defaults to ~/.jobscope.
    #[arg(long, env = "JOBSCOPE_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Project commands.
    Project(ProjectArgs),

    /// Experiment commands.
    Experiment(ExperimentArgs),

    /// Job commands.
    Job(JobArgs),

    /// Inspect or reset the cached context.
    Context {
        /// Context subcommand to execute.
        #[command(subcommand)]
        command: ContextCommands,
    },

    /// Show the dashboard location.
    Dashboard(DashboardArgs),
}

/// Project selection and subcommand.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project name, e.g. `mnist` or `adam/mnist`.
    #[arg(short, long)]
    pub project: Option<String>,

    /// Project subcommand to execute.
    #[command(subcommand)]
    pub command: ProjectCommands,
}

/// Project subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectCommands {
    /// Show project details.
    Get,
}

/// Experiment selection and subcommand.
#[derive(Args, Debug, Clone)]
pub struct ExperimentArgs {
    /// Project name, e.g. `mnist` or `adam/mnist`.
    #[arg(short, long)]
    pub project: Option<String>,

    /// Experiment sequence number.
    #[arg(short = 'x', long)]
    pub experiment: Option<u64>,

    /// Experiment subcommand to execute.
    #[command(subcommand)]
    pub command: ExperimentCommands,
}

/// Experiment subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentCommands {
    /// Show experiment details.
    Get,

    /// List experiment statuses.
    Statuses(StatusesArgs),
}

/// Job selection and subcommand.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Project name, e.g. `mnist` or `adam/mnist`.
    #[arg(short, long)]
    pub project: Option<String>,

    /// Experiment sequence number.
    #[arg(short = 'x', long)]
    pub experiment: Option<u64>,

    /// Job sequence number or UUID.
    #[arg(short, long)]
    pub job: Option<JobRef>,

    /// Address the job by UUID alone, without project or experiment.
    #[arg(long, value_name = "UUID", conflicts_with_all = ["project", "experiment", "job"])]
    pub flat: Option<Uuid>,

    /// Job subcommand to execute.
    #[command(subcommand)]
    pub command: JobCommands,
}

/// Job subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobCommands {
    /// Show job details.
    Get,

    /// List job statuses.
    Statuses(StatusesArgs),

    /// Follow resource usage until the job ends or Ctrl-C.
    Resources,

    /// Follow log output until the job ends or Ctrl-C.
    Logs,
}

/// Options for status listings.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusesArgs {
    /// Fetch every page instead of the first one.
    #[arg(short, long)]
    pub all: bool,
}

/// Context subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextCommands {
    /// Show the cached project, experiment and job.
    Show,

    /// Forget the cached project, experiment and job.
    Clear,
}

/// Dashboard options.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardArgs {
    /// Print only the URL.
    #[arg(long)]
    pub url: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_job_logs_with_parts() {
        let cli = Cli::parse_from(["jobscope", "job", "-p", "adam/mnist", "-x", "3", "-j", "7", "logs"]);
        let Commands::Job(args) = cli.command else {
            panic!("expected job command");
        };
        assert_eq!(args.project.as_deref(), Some("adam/mnist"));
        assert_eq!(args.experiment, Some(3));
        assert_eq!(args.job, Some(JobRef::Sequence(7)));
        assert_eq!(args.command, JobCommands::Logs);
    }

    #[test]
    fn parses_job_uuid() {
        let uuid = Uuid::new_v4();
        let cli = Cli::parse_from(["jobscope", "job", "-j", &uuid.to_string(), "get"]);
        let Commands::Job(args) = cli.command else {
            panic!("expected job command");
        };
        assert_eq!(args.job, Some(JobRef::Uuid(uuid)));
    }

    #[test]
    fn parses_flat_job() {
        let uuid = Uuid::new_v4();
        let cli = Cli::parse_from(["jobscope", "job", "--flat", &uuid.to_string(), "resources"]);
        let Commands::Job(args) = cli.command else {
            panic!("expected job command");
        };
        assert_eq!(args.flat, Some(uuid));
        assert_eq!(args.command, JobCommands::Resources);
    }

    #[test]
    fn flat_conflicts_with_hierarchy() {
        let uuid = Uuid::new_v4().to_string();
        let result = Cli::try_parse_from(["jobscope", "job", "--flat", &uuid, "-x", "1", "get"]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_bad_job_ref() {
        let result = Cli::try_parse_from(["jobscope", "job", "-j", "not-a-job", "get"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_statuses_all() {
        let cli = Cli::parse_from(["jobscope", "experiment", "-x", "2", "statuses", "--all"]);
        let Commands::Experiment(args) = cli.command else {
            panic!("expected experiment command");
        };
        assert_eq!(
            args.command,
            ExperimentCommands::Statuses(StatusesArgs { all: true })
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["jobscope", "context", "show", "--format", "json"]);
        assert_eq!(cli.format, Format::Json);
        assert!(matches!(
            cli.command,
            Commands::Context {
                command: ContextCommands::Show
            }
        ));
    }

    #[test]
    fn gateway_flag() {
        let cli = Cli::parse_from(["jobscope", "-g", "ws://custom:9000", "project", "get"]);
        assert_eq!(cli.gateway.as_deref(), Some("ws://custom:9000"));
    }

    #[test]
    fn dashboard_url_flag() {
        let cli = Cli::parse_from(["jobscope", "dashboard", "--url"]);
        assert!(matches!(cli.command, Commands::Dashboard(DashboardArgs { url: true })));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
