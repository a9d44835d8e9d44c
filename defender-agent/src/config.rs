//! Configuration management for the Defender agent.
//!
//! Configuration is read from a YAML file with sensible defaults for every
//! field; command-line flags override file values.

use std::path::Path;

use anyhow::{Context, Result};
use defender_common::{LogFormat, LOG_LEVELS};
use defender_metrics::{Format, DEFAULT_MAX_LIST_SIZE};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cli::Args;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/defender-agent/agent.yaml";

/// Default file receiving CBOR reports in dry-run mode.
pub const DEFAULT_CBOR_OUTPUT: &str = "cbor_metrics";

/// Agent configuration loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Client identifier; defaults to the host name
    pub client_id: Option<String>,

    /// Thing to report metrics for; defaults to the client id
    pub thing_name: Option<String>,

    /// Seconds between collection cycles
    pub interval_secs: u64,

    /// Report serialization format
    pub format: Format,

    /// Use compact field names in reports
    pub short_names: bool,

    /// Lists larger than this are randomly downsampled (0 = unbounded)
    pub max_list_size: usize,

    /// Print reports instead of handing them to the transport
    pub dry_run: bool,

    /// File receiving the binary report in dry-run CBOR mode
    pub cbor_output: String,

    /// Number of cycles to run before exiting (0 = run forever)
    pub samples: u64,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log format (pretty, json)
    pub log_format: LogFormat,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            thing_name: None,
            interval_secs: 300,
            format: Format::Json,
            short_names: false,
            max_list_size: DEFAULT_MAX_LIST_SIZE,
            dry_run: false,
            cbor_output: DEFAULT_CBOR_OUTPUT.to_string(),
            samples: 0,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl AgentConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AgentConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `args.config`, or from the default path if present, then apply CLI overrides.
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };
        Ok(config.with_cli_overrides(args))
    }

    /// Apply CLI argument overrides to the configuration.
    pub fn with_cli_overrides(mut self, args: &Args) -> Self {
        if let Some(ref client_id) = args.client_id {
            self.client_id = Some(client_id.clone());
        }

        if let Some(ref thing_name) = args.thing_name {
            self.thing_name = Some(thing_name.clone());
        }

        if let Some(interval) = args.interval {
            self.interval_secs = interval;
        }

        if let Some(format) = args.format {
            self.format = format;
        }

        if args.short_tags {
            self.short_names = true;
        }

        if let Some(max_list_size) = args.max_list_size {
            self.max_list_size = max_list_size;
        }

        if args.dry_run {
            self.dry_run = true;
        }

        if let Some(ref path) = args.cbor_output {
            self.cbor_output = path.clone();
        }

        if let Some(samples) = args.samples {
            self.samples = samples;
        }

        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
        }

        if let Some(format) = args.log_format {
            self.log_format = format;
        }

        self
    }

    /// Client id, falling back to the host name.
    pub fn client_id(&self) -> String {
        self.client_id.clone().unwrap_or_else(|| {
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string())
        })
    }

    /// Thing name, falling back to the client id.
    pub fn thing_name(&self) -> String {
        self.thing_name.clone().unwrap_or_else(|| self.client_id())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interval_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_string(),
                message: format!("must be one of: {:?}", LOG_LEVELS),
            });
        }

        // The thing name becomes an MQTT topic level.
        if let Some(ref name) = self.thing_name {
            if name.is_empty() || name.contains(|c: char| matches!(c, '/' | '#' | '+')) {
                return Err(ConfigError::InvalidValue {
                    field: "thing_name".to_string(),
                    message: "must be non-empty and free of '/', '#' and '+'".to_string(),
                });
            }
        }

        if self.dry_run && self.format == Format::Cbor && self.cbor_output.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cbor_output".to_string(),
                message: "required for CBOR dry runs".to_string(),
            });
        }

        Ok(())
    }

    /// Log the effective settings.
    pub fn log_summary(&self) {
        info!(
            thing = %self.thing_name(),
            interval_secs = self.interval_secs,
            format = %self.format,
            short_names = self.short_names,
            max_list_size = self.max_list_size,
            dry_run = self.dry_run,
            "Agent configured"
        );
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.max_list_size, 50);
        assert_eq!(config.format, Format::Json);
        assert!(!config.short_names);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AgentConfig::default();

        config.interval_secs = 0;
        assert!(config.validate().is_err());
        config.interval_secs = 60;

        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
        config.log_level = "debug".to_string();

        config.thing_name = Some("bad/name".to_string());
        assert!(config.validate().is_err());
        config.thing_name = Some("sensor-01".to_string());

        config.dry_run = true;
        config.format = Format::Cbor;
        config.cbor_output = String::new();
        assert!(config.validate().is_err());
        config.cbor_output = "out.cbor".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "defender-agent",
            "--thing-name",
            "gateway-7",
            "--interval",
            "30",
            "--format",
            "cbor",
            "--short-tags",
            "--max-list-size",
            "10",
            "--dry-run",
        ]);

        let config = AgentConfig::default().with_cli_overrides(&args);
        assert_eq!(config.thing_name(), "gateway-7");
        assert_eq!(config.interval_secs, 30);
        assert_eq!(config.format, Format::Cbor);
        assert!(config.short_names);
        assert_eq!(config.max_list_size, 10);
        assert!(config.dry_run);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_thing_name_falls_back_to_client_id() {
        let config = AgentConfig {
            client_id: Some("client-1".to_string()),
            ..Default::default()
        };
        assert_eq!(config.thing_name(), "client-1");
    }

    #[test]
    fn test_yaml_serialization() {
        let config = AgentConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: AgentConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.interval_secs, parsed.interval_secs);
        assert_eq!(config.format, parsed.format);
    }
}
