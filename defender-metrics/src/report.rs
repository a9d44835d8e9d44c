//! Versioned report assembly and serialization.
//!
//! A report has two sections: `header` (capture time and version) and
//! `metrics`. Each metrics block is included only when it has content, and
//! list blocks carry the true element count next to a possibly downsampled
//! list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{MetricsError, Result};
use crate::sample::{Connection, ListeningPort, Protocol, Sample};
use crate::sampling::{downsample, RandomSelector, Selector};
use crate::tags::{FieldNames, Tag};

/// Report schema version understood by the endpoint.
pub const REPORT_VERSION: &str = "1.0";

/// Serialization format of a published report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Cbor,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Cbor => "cbor",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "cbor" => Ok(Format::Cbor),
            other => Err(format!("unknown report format '{}' (expected json or cbor)", other)),
        }
    }
}

/// An encoded report ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn format(&self) -> Format {
        match self {
            Payload::Text(_) => Format::Json,
            Payload::Binary(_) => Format::Cbor,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// A fully assembled metrics report.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    names: FieldNames,
    header: Map<String, Value>,
    metrics: Map<String, Value>,
}

impl Report {
    pub fn names(&self) -> FieldNames {
        self.names
    }

    /// The `header` section.
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// The `metrics` section.
    pub fn metrics(&self) -> &Map<String, Value> {
        &self.metrics
    }

    /// The complete nested report structure.
    pub fn to_value(&self) -> Value {
        let t = self.names;
        json!({
            t.resolve(Tag::Header): self.header,
            t.resolve(Tag::Metrics): self.metrics,
        })
    }

    /// JSON text with sorted keys; `pretty` indents by four spaces.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        if !pretty {
            return serde_json::to_string(&self.to_value())
                .map_err(|e| MetricsError::Encode(e.to_string()));
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.to_value()
            .serialize(&mut ser)
            .map_err(|e| MetricsError::Encode(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| MetricsError::Encode(e.to_string()))
    }

    /// CBOR encoding of the same structure.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&self.to_value(), &mut buf)
            .map_err(|e| MetricsError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Encode for the wire. JSON payloads are compact.
    pub fn encode(&self, format: Format) -> Result<Payload> {
        match format {
            Format::Json => self.to_json(false).map(Payload::Text),
            Format::Cbor => self.to_cbor().map(Payload::Binary),
        }
    }
}

/// Decode a CBOR report back into its nested structure.
pub fn decode_cbor(bytes: &[u8]) -> Result<Value> {
    ciborium::de::from_reader(bytes).map_err(|e| MetricsError::Decode(e.to_string()))
}

impl Sample {
    /// Build a report, downsampling oversized lists at random.
    pub fn build_report(&self) -> Report {
        self.build_report_with(&mut RandomSelector)
    }

    /// Build a report using `selector` to downsample oversized lists.
    pub fn build_report_with(&self, selector: &mut dyn Selector) -> Report {
        let t = self.names();

        let mut header = Map::new();
        header.insert(t.resolve(Tag::ReportId).to_string(), Value::from(self.timestamp()));
        header.insert(t.resolve(Tag::Version).to_string(), Value::from(REPORT_VERSION));

        let mut metrics = Map::new();

        let stats = self.interface_stats();
        if !stats.is_empty() {
            let block: Map<String, Value> = stats
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::from(v)))
                .collect();
            metrics.insert(t.resolve(Tag::NetworkStats).to_string(), Value::Object(block));
        }

        let connections = self.connections();
        if !connections.is_empty() {
            let sampled: Vec<Value> = downsample(connections, self.max_list_size, selector)
                .iter()
                .map(|c| connection_value(&t, c))
                .collect();
            metrics.insert(
                t.resolve(Tag::TcpConnections).to_string(),
                json!({
                    t.resolve(Tag::EstablishedConnections): {
                        t.resolve(Tag::Connections): sampled,
                        t.resolve(Tag::Total): connections.len(),
                    }
                }),
            );
        }

        for (protocol, tag) in [
            (Protocol::Tcp, Tag::ListeningTcpPorts),
            (Protocol::Udp, Tag::ListeningUdpPorts),
        ] {
            let ports = self.ports(protocol);
            if ports.is_empty() {
                continue;
            }
            let sampled: Vec<Value> = downsample(ports, self.max_list_size, selector)
                .iter()
                .map(|p| port_value(&t, p))
                .collect();
            metrics.insert(
                t.resolve(tag).to_string(),
                json!({
                    t.resolve(Tag::Ports): sampled,
                    t.resolve(Tag::Total): ports.len(),
                }),
            );
        }

        Report {
            names: t,
            header,
            metrics,
        }
    }

    /// Shorthand for building a report and rendering it as JSON.
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        self.build_report().to_json(pretty)
    }

    /// Shorthand for building a report and rendering it as CBOR.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        self.build_report().to_cbor()
    }
}

fn connection_value(t: &FieldNames, conn: &Connection) -> Value {
    json!({
        t.resolve(Tag::RemoteAddr): conn.remote_addr,
        t.resolve(Tag::LocalInterface): conn.local_interface,
        t.resolve(Tag::LocalPort): conn.local_port,
    })
}

fn port_value(t: &FieldNames, port: &ListeningPort) -> Value {
    let mut entry = Map::new();
    entry.insert(t.resolve(Tag::Port).to_string(), Value::from(port.port));
    if let Some(iface) = &port.interface {
        entry.insert(t.resolve(Tag::Interface).to_string(), Value::from(iface.as_str()));
    }
    Value::Object(entry)
}
