//! # defender-metrics
//!
//! Network metrics collection and report encoding for the Device Defender agent.
//!
//! One [`Sample`] is built per collection cycle. It records host-wide traffic
//! counters, established connections and listening ports, then renders a
//! versioned report as JSON or CBOR.
//!
//! ## Delta metrics
//!
//! Traffic counters are cumulative on the host. A sample created with the
//! previous cycle's [`Baseline`] reports the difference, so the first cycle
//! carries absolute values and later cycles carry traffic since the last one.
//!
//! ```
//! use defender_metrics::{FieldNames, Sample};
//!
//! let mut first = Sample::at(FieldNames::verbose(), 0, None);
//! first.record_interface_totals(100, 200, 50, 150);
//!
//! let mut second = Sample::at(FieldNames::verbose(), 300, Some(first.baseline()));
//! second.record_interface_totals(125, 225, 75, 175);
//! assert_eq!(second.interface_stats()["bytes_in"], 25);
//!
//! let json = second.to_json_string(false).unwrap();
//! assert!(json.contains("\"network_stats\""));
//! ```

pub mod collector;
pub mod error;
pub mod network;
pub mod probe;
pub mod procfs;
pub mod report;
pub mod sample;
pub mod sampling;
pub mod tags;

pub use collector::Collector;
pub use error::{MetricsError, ProbeError, Result};
pub use probe::{HostProbe, NetworkProbe, SocketEntry, SocketKind, SocketState};
pub use report::{decode_cbor, Format, Payload, Report, REPORT_VERSION};
pub use sample::{
    Baseline, Connection, InterfaceCounters, InterfaceStats, ListeningPort, Protocol, Sample,
    DEFAULT_MAX_LIST_SIZE,
};
pub use sampling::{downsample, FirstSelector, RandomSelector, Selector};
pub use tags::{FieldNames, Tag};
