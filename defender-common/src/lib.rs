//! # defender-common
//!
//! Shared utilities for the Defender agent components.
//!
//! ## Logging
//!
//! ```no_run
//! use defender_common::{init_logging_with_format, LogFormat};
//!
//! init_logging_with_format("info", LogFormat::Pretty).unwrap();
//! tracing::info!("Agent starting");
//! ```
//!
//! Logs go to stderr so stdout stays free for report output.

pub mod logging;

pub use logging::{
    init_logging,
    init_logging_json,
    init_logging_with_format,
    LogFormat,
    LOG_LEVELS,
};
