use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubectl-hoggers",
    version,
    about = "Shed a light on the most resource intensive applications in a Kubernetes cluster."
)]
pub struct CliArgs {
    /// Path to the kubeconfig file (`:`-separated list allowed)
    #[arg(long, global = true, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// kubeconfig context to use instead of the current one
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// YAML settings file (default: $HOGGERS_CONFIG or ./hoggers.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_filter: String,

    /// Append logs to this file; they are discarded otherwise
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check CPU and RAM reservations/limits for each node in a cluster
    Report {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Watch pods consuming most CPU along with their nodes (requires metrics-server)
    #[command(visible_alias = "status")]
    Top(TopArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TopArgs {
    /// Refresh interval in seconds
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Number of pods to show
    #[arg(short = 'n', long)]
    pub rows: Option<usize>,

    /// Keep refreshing after a failed cycle instead of exiting
    #[arg(long)]
    pub keep_going: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Terminal table, quit with q
    #[default]
    Table,
    /// JSON array on stdout
    Json,
}
