//! # Defender Agent
//!
//! Samples host network state on an interval, builds Device Defender metrics
//! reports and delivers them through a [`sink::ReportSink`].

pub mod agent;
pub mod cli;
pub mod config;
pub mod sink;

pub use agent::Agent;
pub use config::{AgentConfig, ConfigError};
pub use sink::{DryRunSink, PipeSink, ReportSink, Topic};
