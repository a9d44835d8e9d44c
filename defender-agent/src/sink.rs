//! Report delivery.
//!
//! The MQTT session itself lives outside this process. A sink receives each
//! finished report together with the topic it belongs on and either prints it
//! for inspection or hands it to the transport as one line per message.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::Engine;
use defender_metrics::{Format, Payload, Report};
use tracing::{debug, info};

/// Device Defender topics for one thing and payload format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    base: String,
}

impl Topic {
    pub fn new(thing_name: &str, format: Format) -> Self {
        Self {
            base: format!("$aws/things/{}/defender/metrics/{}", thing_name, format),
        }
    }

    /// Topic reports are published to.
    pub fn metrics(&self) -> &str {
        &self.base
    }

    /// Topic the service acknowledges accepted reports on.
    pub fn accepted(&self) -> String {
        format!("{}/accepted", self.base)
    }

    /// Topic the service reports rejected reports on.
    pub fn rejected(&self) -> String {
        format!("{}/rejected", self.base)
    }
}

/// Destination for finished reports.
pub trait ReportSink {
    /// Deliver `report` for publication on `topic`.
    fn deliver(&mut self, topic: &Topic, report: &Report) -> Result<()>;

    /// Whether the first sample of a run is delivered.
    ///
    /// The first sample has no baseline, so its traffic counters are totals
    /// since boot rather than per-interval values.
    fn publishes_first_sample(&self) -> bool {
        false
    }
}

/// Prints reports instead of publishing them.
///
/// Every report goes to the writer as pretty JSON. In CBOR mode the binary
/// encoding is also written to `cbor_path`, replacing the previous report.
pub struct DryRunSink<W: Write> {
    out: W,
    format: Format,
    cbor_path: PathBuf,
}

impl<W: Write> DryRunSink<W> {
    pub fn new(out: W, format: Format, cbor_path: impl Into<PathBuf>) -> Self {
        Self {
            out,
            format,
            cbor_path: cbor_path.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for DryRunSink<W> {
    fn deliver(&mut self, topic: &Topic, report: &Report) -> Result<()> {
        let text = report.to_json(true).context("Failed to encode JSON report")?;
        writeln!(self.out, "{}", text)?;
        self.out.flush()?;

        if self.format == Format::Cbor {
            let bytes = report.to_cbor().context("Failed to encode CBOR report")?;
            fs::write(&self.cbor_path, &bytes).with_context(|| {
                format!("Failed to write CBOR report: {}", self.cbor_path.display())
            })?;
            info!(
                path = %self.cbor_path.display(),
                bytes = bytes.len(),
                "Wrote CBOR report"
            );
        }
        debug!(topic = topic.metrics(), "Dry run, report not published");
        Ok(())
    }

    fn publishes_first_sample(&self) -> bool {
        true
    }
}

/// Writes `<topic> <payload>` lines for an external MQTT publisher.
///
/// Binary payloads are base64 encoded so every message stays on one line.
pub struct PipeSink<W: Write> {
    out: W,
    format: Format,
}

impl<W: Write> PipeSink<W> {
    pub fn new(out: W, format: Format) -> Self {
        Self { out, format }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for PipeSink<W> {
    fn deliver(&mut self, topic: &Topic, report: &Report) -> Result<()> {
        let payload = report
            .encode(self.format)
            .with_context(|| format!("Failed to encode {} report", self.format))?;

        let size = payload.len();
        let line = match payload {
            Payload::Text(text) => text,
            Payload::Binary(bytes) => base64::engine::general_purpose::STANDARD.encode(bytes),
        };

        writeln!(self.out, "{} {}", topic.metrics(), line)?;
        self.out.flush()?;

        info!(topic = topic.metrics(), bytes = size, "Report handed to transport");
        Ok(())
    }
}
