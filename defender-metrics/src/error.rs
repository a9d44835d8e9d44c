//! Error types for metrics collection and report encoding.

use thiserror::Error;

/// Errors that can occur while building or encoding a metrics report.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Protocol name other than TCP or UDP.
    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),

    /// Report could not be serialized.
    #[error("Failed to encode report: {0}")]
    Encode(String),

    /// Report payload could not be deserialized.
    #[error("Failed to decode report: {0}")]
    Decode(String),
}

/// Errors raised by the OS probe layer.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The probe is not available on this platform.
    #[error("Probe not supported on this platform: {0}")]
    Unsupported(&'static str),

    /// A kernel table could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be parsed.
    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Result type alias for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;
