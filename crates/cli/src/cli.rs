//! CLI argument definitions using clap.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{builder::BoolishValueParser, ArgAction, Args, Parser, Subcommand, ValueEnum};
use contracts::DecodeFailurePolicy;

/// Ride Dispatch - ride duration prediction dispatcher
#[derive(Parser, Debug)]
#[command(
    name = "ride-dispatch",
    author,
    version,
    about = "Ride duration prediction dispatcher",
    long_about = "Decodes ride events, predicts trip duration and fans every prediction \n\
                  out to the configured sinks (output stream, analysis store, drift \n\
                  monitoring). Runs as an HTTP service or over a single stream batch."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true, env = "RIDE_DISPATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RIDE_DISPATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP trigger (`/predict`, `/invocations`)
    Serve(ServeArgs),

    /// Process one stream batch envelope and print the stream response
    Process(ProcessArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Service configuration and its environment overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when absent
    #[arg(short, long, env = "RIDE_DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip network sinks (republish, monitoring)
    #[arg(
        long,
        env = "TEST_RUN",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub test_run: bool,

    /// Model version reported in predictions
    #[arg(long, env = "MODEL_VERSION")]
    pub model_version: Option<String>,

    /// Training run id, used as version when none is set
    #[arg(long, env = "RUN_ID")]
    pub run_id: Option<String>,

    /// Linear model artifact (JSON)
    #[arg(long, env = "MODEL_ARTIFACT")]
    pub model_artifact: Option<PathBuf>,

    /// Output stream for republished predictions
    #[arg(long, env = "PREDICTIONS_STREAM_NAME")]
    pub stream_name: Option<String>,

    /// Address of the output stream endpoint
    #[arg(long, env = "PREDICTIONS_STREAM_ADDR")]
    pub stream_addr: Option<String>,

    /// Drift monitoring service base URL
    #[arg(long, env = "EVIDENTLY_SERVICE")]
    pub monitoring_url: Option<String>,

    /// Directory of the analysis store
    #[arg(long, env = "PERSISTENCE_PATH")]
    pub persistence_path: Option<PathBuf>,
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Listen address (overrides `server.address`)
    #[arg(long, env = "RIDE_DISPATCH_ADDRESS")]
    pub address: Option<SocketAddr>,

    /// Standalone metrics port (0 = disabled, overrides `server.metrics_port`)
    #[arg(long, env = "RIDE_DISPATCH_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Arguments for the `process` command
#[derive(Parser, Debug, Clone)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Stream batch envelope (`{"Records": [...]}`); `-` reads stdin
    #[arg(short, long, required_unless_present = "mock")]
    pub input: Option<PathBuf>,

    /// Generate N synthetic rides instead of reading input
    #[arg(long, conflicts_with = "input")]
    pub mock: Option<usize>,

    /// Override the decode failure policy
    #[arg(long, value_enum)]
    pub decode_failure: Option<DecodePolicyArg>,

    /// Do not print run statistics
    #[arg(long)]
    pub no_stats: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Decode failure policy
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DecodePolicyArg {
    /// Fail the batch
    Abort,
    /// Leave the record out
    Skip,
}

impl From<DecodePolicyArg> for DecodeFailurePolicy {
    fn from(policy: DecodePolicyArg) -> Self {
        match policy {
            DecodePolicyArg::Abort => Self::Abort,
            DecodePolicyArg::Skip => Self::Skip,
        }
    }
}
