//! Command-line argument parsing.

use clap::Parser;
use defender_common::LogFormat;
use defender_metrics::Format;

/// Defender Agent - periodic network metrics reporter
#[derive(Parser, Debug)]
#[command(name = "defender-agent")]
#[command(about = "Defender Agent - periodic network metrics reporter")]
#[command(version)]
pub struct Args {
    /// Path to configuration file (optional, defaults used if not found)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DEFENDER_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Client id, used as thing name unless one is given (defaults to host name)
    #[arg(long)]
    pub client_id: Option<String>,

    /// Thing to publish metrics for
    #[arg(short, long)]
    pub thing_name: Option<String>,

    /// Seconds between metric reports
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Report serialization format (json, cbor)
    #[arg(short, long)]
    pub format: Option<Format>,

    /// Use compact field names in metric reports
    #[arg(short, long)]
    pub short_tags: bool,

    /// Lists larger than this are randomly downsampled (0 = unbounded)
    #[arg(long)]
    pub max_list_size: Option<usize>,

    /// Print reports to the console instead of handing them to the transport
    #[arg(short, long)]
    pub dry_run: bool,

    /// Number of samples to collect before exiting (0 = run forever)
    #[arg(short = 'n', long)]
    pub samples: Option<u64>,

    /// File receiving CBOR reports in dry-run mode
    #[arg(long)]
    pub cbor_output: Option<String>,
}
