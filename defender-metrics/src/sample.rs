//! Per-cycle metric accumulation.
//!
//! A [`Sample`] collects one cycle's worth of network facts: host-wide
//! interface counters, established connections, and listening ports per
//! protocol. Counter deltas are computed against the [`Baseline`] carried
//! over from the previous cycle.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use tracing::{trace, warn};

use crate::error::MetricsError;
use crate::tags::{FieldNames, Tag};

/// Default bound applied to every list when a report is built.
pub const DEFAULT_MAX_LIST_SIZE: usize = 50;

/// Cumulative host-wide traffic counters as reported by the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub packets_in: u64,
    pub packets_out: u64,
}

/// Per-cycle traffic figures.
///
/// Either the raw counters (first cycle) or the difference against the
/// previous cycle. A counter reset on the host shows up as a negative value.
/// Counters are read as `i64`, so totals above `i64::MAX` wrap negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceStats {
    pub bytes_in: i64,
    pub bytes_out: i64,
    pub packets_in: i64,
    pub packets_out: i64,
}

impl InterfaceStats {
    fn absolute(totals: &InterfaceCounters) -> Self {
        Self {
            bytes_in: totals.bytes_in as i64,
            bytes_out: totals.bytes_out as i64,
            packets_in: totals.packets_in as i64,
            packets_out: totals.packets_out as i64,
        }
    }

    fn between(previous: &InterfaceCounters, current: &InterfaceCounters) -> Self {
        let diff = |cur: u64, prev: u64| (cur as i64).wrapping_sub(prev as i64);
        Self {
            bytes_in: diff(current.bytes_in, previous.bytes_in),
            bytes_out: diff(current.bytes_out, previous.bytes_out),
            packets_in: diff(current.packets_in, previous.packets_in),
            packets_out: diff(current.packets_out, previous.packets_out),
        }
    }
}

/// What a new sample keeps from its predecessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Baseline {
    /// Capture time of the previous sample.
    pub timestamp: i64,
    /// Counters recorded by the previous sample, if any.
    pub totals: Option<InterfaceCounters>,
}

/// An established connection observed on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Remote peer as `"{addr}:{port}"`.
    pub remote_addr: String,
    /// Interface owning the local address, when known.
    pub local_interface: Option<String>,
    pub local_port: u16,
}

/// A socket accepting connections or datagrams.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListeningPort {
    pub port: u16,
    pub interface: Option<String>,
}

impl ListeningPort {
    pub fn new(port: u16) -> Self {
        Self { port, interface: None }
    }

    pub fn on_interface(port: u16, interface: impl Into<String>) -> Self {
        Self {
            port,
            interface: Some(interface.into()),
        }
    }
}

/// Transport protocol of a listening port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

impl FromStr for Protocol {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("tcp") {
            Ok(Protocol::Tcp)
        } else if s.eq_ignore_ascii_case("udp") {
            Ok(Protocol::Udp)
        } else {
            Err(MetricsError::InvalidProtocol(s.to_string()))
        }
    }
}

/// One collection cycle's network metrics.
#[derive(Debug, Clone)]
pub struct Sample {
    names: FieldNames,
    timestamp: i64,
    interval: i64,
    previous_totals: Option<InterfaceCounters>,
    totals: Option<InterfaceCounters>,
    stats: Option<InterfaceStats>,
    connections: Vec<Connection>,
    tcp_ports: Vec<ListeningPort>,
    udp_ports: Vec<ListeningPort>,
    /// Lists longer than this are downsampled when a report is built (0 = unbounded).
    pub max_list_size: usize,
}

impl Sample {
    /// Start a sample captured now, with no predecessor.
    pub fn new(names: FieldNames) -> Self {
        Self::with_baseline(names, None)
    }

    /// Start a sample captured now, computing deltas against `baseline`.
    pub fn with_baseline(names: FieldNames, baseline: Option<Baseline>) -> Self {
        Self::at(names, Utc::now().timestamp(), baseline)
    }

    /// Start a sample with an explicit capture time.
    pub fn at(names: FieldNames, timestamp: i64, baseline: Option<Baseline>) -> Self {
        let interval = baseline.map(|b| timestamp - b.timestamp).unwrap_or(0);
        Self {
            names,
            timestamp,
            interval,
            previous_totals: baseline.and_then(|b| b.totals),
            totals: None,
            stats: None,
            connections: Vec::new(),
            tcp_ports: Vec::new(),
            udp_ports: Vec::new(),
            max_list_size: DEFAULT_MAX_LIST_SIZE,
        }
    }

    /// What the next cycle needs from this one.
    pub fn baseline(&self) -> Baseline {
        Baseline {
            timestamp: self.timestamp,
            totals: self.totals,
        }
    }

    pub fn names(&self) -> FieldNames {
        self.names
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Seconds since the previous sample, 0 for the first one.
    pub fn interval(&self) -> i64 {
        self.interval
    }

    /// Store cumulative counters and derive this cycle's figures from them.
    pub fn record_interface_totals(
        &mut self,
        bytes_in: u64,
        bytes_out: u64,
        packets_in: u64,
        packets_out: u64,
    ) {
        let totals = InterfaceCounters {
            bytes_in,
            bytes_out,
            packets_in,
            packets_out,
        };

        let stats = match &self.previous_totals {
            Some(previous) => InterfaceStats::between(previous, &totals),
            None => InterfaceStats::absolute(&totals),
        };

        trace!(?totals, ?stats, "Recorded interface totals");
        self.totals = Some(totals);
        self.stats = Some(stats);
    }

    /// Record an established connection unless an identical one is already present.
    pub fn record_connection(
        &mut self,
        remote_addr: &str,
        remote_port: u16,
        local_interface: Option<&str>,
        local_port: u16,
    ) {
        let conn = Connection {
            remote_addr: format!("{}:{}", remote_addr, remote_port),
            local_interface: local_interface.map(str::to_string),
            local_port,
        };

        if !self.connections.contains(&conn) {
            self.connections.push(conn);
        }
    }

    /// Record listening ports for `protocol` ("TCP" or "UDP", any case).
    ///
    /// Each port is added only if the same record is not already listed for
    /// that protocol. Any other protocol name is logged and ignored.
    pub fn record_listening_ports<I>(&mut self, protocol: &str, ports: I)
    where
        I: IntoIterator<Item = ListeningPort>,
    {
        match protocol.parse::<Protocol>() {
            Ok(protocol) => self.record_ports(protocol, ports),
            Err(e) => warn!(error = %e, "Dropping listening ports"),
        }
    }

    /// Typed variant of [`Sample::record_listening_ports`].
    pub fn record_ports<I>(&mut self, protocol: Protocol, ports: I)
    where
        I: IntoIterator<Item = ListeningPort>,
    {
        let list = match protocol {
            Protocol::Tcp => &mut self.tcp_ports,
            Protocol::Udp => &mut self.udp_ports,
        };

        for port in ports {
            if !list.contains(&port) {
                list.push(port);
            }
        }
    }

    /// This cycle's traffic figures keyed by resolved field names.
    ///
    /// Empty until totals have been recorded.
    pub fn interface_stats(&self) -> BTreeMap<&'static str, i64> {
        let mut out = BTreeMap::new();
        if let Some(stats) = &self.stats {
            out.insert(self.names.resolve(Tag::BytesIn), stats.bytes_in);
            out.insert(self.names.resolve(Tag::BytesOut), stats.bytes_out);
            out.insert(self.names.resolve(Tag::PacketsIn), stats.packets_in);
            out.insert(self.names.resolve(Tag::PacketsOut), stats.packets_out);
        }
        out
    }

    /// Typed view of this cycle's traffic figures.
    pub fn stats(&self) -> Option<&InterfaceStats> {
        self.stats.as_ref()
    }

    /// Raw counters as recorded.
    pub fn totals(&self) -> Option<&InterfaceCounters> {
        self.totals.as_ref()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Listening ports for `protocol`; empty (with a warning) for an unknown protocol.
    pub fn listening_ports(&self, protocol: &str) -> &[ListeningPort] {
        match protocol.parse::<Protocol>() {
            Ok(protocol) => self.ports(protocol),
            Err(e) => {
                warn!(error = %e, "No listening ports for protocol");
                &[]
            }
        }
    }

    pub fn ports(&self, protocol: Protocol) -> &[ListeningPort] {
        match protocol {
            Protocol::Tcp => &self.tcp_ports,
            Protocol::Udp => &self.udp_ports,
        }
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.stats.is_none()
            && self.connections.is_empty()
            && self.tcp_ports.is_empty()
            && self.udp_ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        Sample::at(FieldNames::verbose(), 1_000, None)
    }

    #[test]
    fn test_first_sample_reports_absolute_values() {
        let mut s = sample();
        s.record_interface_totals(100, 200, 50, 150);

        let stats = s.interface_stats();
        assert_eq!(stats.len(), 4);
        assert_eq!(stats["bytes_in"], 100);
        assert_eq!(stats["bytes_out"], 200);
        assert_eq!(stats["packets_in"], 50);
        assert_eq!(stats["packets_out"], 150);
        assert_eq!(s.interval(), 0);
    }

    #[test]
    fn test_delta_against_previous_sample() {
        let mut m1 = Sample::at(FieldNames::verbose(), 0, None);
        m1.record_interface_totals(100, 200, 50, 150);

        let mut m2 = Sample::at(FieldNames::verbose(), 10, Some(m1.baseline()));
        m2.record_interface_totals(125, 225, 75, 175);

        let mut m3 = Sample::at(FieldNames::verbose(), 20, Some(m2.baseline()));
        m3.record_interface_totals(150, 250, 100, 200);

        for s in [&m2, &m3] {
            let stats = s.interface_stats();
            assert_eq!(stats["bytes_in"], 25);
            assert_eq!(stats["bytes_out"], 25);
            assert_eq!(stats["packets_in"], 25);
            assert_eq!(stats["packets_out"], 25);
            assert_eq!(s.interval(), 10);
        }
    }

    #[test]
    fn test_counter_reset_gives_negative_delta() {
        let mut m1 = sample();
        m1.record_interface_totals(1_000, 1_000, 10, 10);

        let mut m2 = Sample::at(FieldNames::verbose(), 1_005, Some(m1.baseline()));
        m2.record_interface_totals(400, 1_200, 10, 4);

        let stats = m2.stats().unwrap();
        assert_eq!(stats.bytes_in, -600);
        assert_eq!(stats.bytes_out, 200);
        assert_eq!(stats.packets_in, 0);
        assert_eq!(stats.packets_out, -6);
    }

    #[test]
    fn test_baseline_without_totals_reports_absolute_values() {
        let m1 = sample();
        let mut m2 = Sample::at(FieldNames::verbose(), 1_010, Some(m1.baseline()));
        m2.record_interface_totals(7, 8, 9, 10);
        assert_eq!(m2.interface_stats()["bytes_in"], 7);
        assert_eq!(m2.interval(), 10);
    }

    #[test]
    fn test_compact_stats_keys() {
        let mut s = Sample::at(FieldNames::compact(), 0, None);
        s.record_interface_totals(1, 2, 3, 4);
        let stats = s.interface_stats();
        assert_eq!(stats["bi"], 1);
        assert_eq!(stats["bo"], 2);
        assert_eq!(stats["pi"], 3);
        assert_eq!(stats["po"], 4);
    }

    #[test]
    fn test_connection_dedup() {
        let mut s = sample();
        s.record_connection("10.10.10.10", 80, Some("eth0"), 9009);
        s.record_connection("10.10.10.10", 80, Some("eth0"), 9009);
        s.record_connection("11.11.11.11", 80, Some("eth0"), 8888);

        assert_eq!(s.connections().len(), 2);
        assert_eq!(s.connections()[0].remote_addr, "10.10.10.10:80");
    }

    #[test]
    fn test_connection_differing_interface_is_distinct() {
        let mut s = sample();
        s.record_connection("10.0.0.1", 443, Some("eth0"), 5000);
        s.record_connection("10.0.0.1", 443, None, 5000);
        assert_eq!(s.connections().len(), 2);
        assert_eq!(s.connections()[1].local_interface, None);
    }

    #[test]
    fn test_port_dedup_is_per_protocol() {
        let mut s = sample();
        s.record_listening_ports("TCP", vec![ListeningPort::new(80)]);
        s.record_listening_ports("TCP", vec![ListeningPort::new(80)]);
        assert_eq!(s.listening_ports("TCP").len(), 1);

        s.record_listening_ports("UDP", vec![ListeningPort::new(80)]);
        assert_eq!(s.listening_ports("UDP").len(), 1);
        assert_eq!(s.listening_ports("TCP").len(), 1);
    }

    #[test]
    fn test_port_batch_is_filtered_per_item() {
        let mut s = sample();
        s.record_listening_ports(
            "TCP",
            vec![
                ListeningPort::on_interface(80, "eth0"),
                ListeningPort::on_interface(88, "wlan0"),
                ListeningPort::on_interface(8000, "eth0"),
                ListeningPort::on_interface(8000, "eth0"),
            ],
        );
        assert_eq!(s.listening_ports("TCP").len(), 3);

        // Only the new port of a mixed batch is appended.
        s.record_listening_ports(
            "tcp",
            vec![
                ListeningPort::on_interface(80, "eth0"),
                ListeningPort::on_interface(443, "eth0"),
            ],
        );
        let ports: Vec<u16> = s.listening_ports("TCP").iter().map(|p| p.port).collect();
        assert_eq!(ports, vec![80, 88, 8000, 443]);
    }

    #[test]
    fn test_invalid_protocol_is_ignored() {
        let mut s = sample();
        s.record_listening_ports("SCTP", vec![ListeningPort::new(9)]);
        assert!(s.listening_ports("SCTP").is_empty());
        assert!(s.ports(Protocol::Tcp).is_empty());
        assert!(s.ports(Protocol::Udp).is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("udp".parse::<Protocol>().unwrap(), Protocol::Udp);
        assert_eq!("Tcp".parse::<Protocol>().unwrap(), Protocol::Tcp);
        assert!("icmp".parse::<Protocol>().is_err());
        assert_eq!(Protocol::Udp.to_string(), "UDP");
    }

    #[test]
    fn test_counters_above_i64_max_wrap() {
        let mut s = sample();
        s.record_interface_totals(u64::MAX, i64::MAX as u64, 0, 0);
        let stats = s.stats().unwrap();
        assert_eq!(stats.bytes_in, -1);
        assert_eq!(stats.bytes_out, i64::MAX);
    }
}
