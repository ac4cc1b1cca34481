//! CLI argument definitions for the client file processor.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use zoomos_model::StrategyKind;

#[derive(Parser)]
#[command(
    name = "zoomos",
    version,
    about = "Process client data files through per-client strategy chains",
    long_about = "Process client data files through per-client strategy chains.\n\n\
                  Each file is read as CSV, routed to the chain registered for the\n\
                  client and tracked through PENDING, PROCESSING and a terminal status."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow row values to appear in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process one or more CSV files for a client.
    Process(ProcessArgs),

    /// List registered strategy chains and strategy kinds.
    Strategies(StrategiesArgs),

    /// Show delimiter, headers and a preview of a CSV file.
    Inspect(InspectArgs),
}

#[derive(Parser)]
pub struct ProcessArgs {
    /// CSV files to process.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// JSON configuration file with competitors, parameters and reference data.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Client the files belong to.
    #[arg(long = "client-id", default_value_t = 0)]
    pub client_id: u64,

    /// Client display name.
    #[arg(long = "client-name")]
    pub client_name: Option<String>,

    /// Strategy kind selected for the client.
    #[arg(long = "strategy", value_parser = parse_strategy)]
    pub strategy: Option<StrategyKind>,

    /// Strategy parameter as key=value; may be repeated.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Competitor domain to redact; may be repeated.
    #[arg(long = "competitor", value_name = "DOMAIN")]
    pub competitors: Vec<String>,

    /// Worker threads (default: number of CPUs).
    #[arg(long = "workers")]
    pub workers: Option<usize>,

    /// Queued jobs before submissions run on the calling thread.
    #[arg(long = "queue-capacity")]
    pub queue_capacity: Option<usize>,

    /// Write CSV exports of processed rows into this directory.
    #[arg(long = "export", value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct StrategiesArgs {
    /// JSON configuration file supplying reference data for the task filter.
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct InspectArgs {
    /// CSV file to inspect.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Number of rows to preview.
    #[arg(long = "rows", default_value_t = 5)]
    pub rows: usize,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_strategy(value: &str) -> Result<StrategyKind, String> {
    value.parse().map_err(|error| format!("{error}"))
}
