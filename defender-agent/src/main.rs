//! # Defender Agent
//!
//! Publishes Device Defender network metrics for one thing.
//!
//! ## Usage
//! ```bash
//! defender-agent --config /etc/defender-agent/agent.yaml
//! defender-agent --dry-run --short-tags --interval 5 --samples 3
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use defender_agent::cli::Args;
use defender_agent::{Agent, AgentConfig, DryRunSink, PipeSink};
use defender_metrics::HostProbe;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AgentConfig::from_args(&args)?;
    config.validate().context("Invalid configuration")?;

    defender_common::init_logging_with_format(&config.log_level, config.log_format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Defender Agent"
    );
    config.log_summary();

    let probe = HostProbe::new();

    let result = if config.dry_run {
        let sink = DryRunSink::new(std::io::stdout(), config.format, &config.cbor_output);
        Agent::new(&config, probe, sink).run().await
    } else {
        let sink = PipeSink::new(std::io::stdout(), config.format);
        Agent::new(&config, probe, sink).run().await
    };

    if let Err(e) = result {
        error!(error = %e, "Agent failed");
        return Err(e);
    }

    info!("Defender Agent stopped");
    Ok(())
}
