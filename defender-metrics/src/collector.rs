//! Turns probe output into one [`Sample`] per cycle.
//!
//! The collector keeps the previous cycle's [`Baseline`] so each new sample
//! reports traffic since the last one rather than since boot.

use std::net::IpAddr;

use tracing::{debug, warn};

use crate::probe::{NetworkProbe, SocketEntry, SocketKind, SocketState};
use crate::sample::{Baseline, ListeningPort, Protocol, Sample, DEFAULT_MAX_LIST_SIZE};
use crate::tags::FieldNames;

/// Periodic metrics collector.
#[derive(Debug, Clone)]
pub struct Collector {
    names: FieldNames,
    max_list_size: usize,
    baseline: Option<Baseline>,
}

impl Collector {
    /// Create a collector; `short_names` selects compact report keys.
    pub fn new(short_names: bool) -> Self {
        Self {
            names: FieldNames::new(short_names),
            max_list_size: DEFAULT_MAX_LIST_SIZE,
            baseline: None,
        }
    }

    /// Bound applied to lists in every sample (0 = unbounded).
    pub fn with_max_list_size(mut self, max_list_size: usize) -> Self {
        self.max_list_size = max_list_size;
        self
    }

    /// Baseline the next sample will be compared against.
    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    /// Sample the host now.
    pub fn collect<P: NetworkProbe + ?Sized>(&mut self, probe: &mut P) -> Sample {
        let sample = Sample::with_baseline(self.names, self.baseline);
        self.fill(sample, probe)
    }

    /// Sample the host, stamping the result with `timestamp`.
    pub fn collect_at<P: NetworkProbe + ?Sized>(&mut self, probe: &mut P, timestamp: i64) -> Sample {
        let sample = Sample::at(self.names, timestamp, self.baseline);
        self.fill(sample, probe)
    }

    fn fill<P: NetworkProbe + ?Sized>(&mut self, mut sample: Sample, probe: &mut P) -> Sample {
        sample.max_list_size = self.max_list_size;
        probe.refresh();
        let probe = &*probe;

        record_network_stats(&mut sample, probe);

        match probe.sockets() {
            Ok(sockets) => {
                record_listening_ports(&mut sample, probe, &sockets);
                record_connections(&mut sample, probe, &sockets);
            }
            Err(e) => warn!(error = %e, "Failed to read sockets, skipping port and connection metrics"),
        }

        debug!(
            timestamp = sample.timestamp(),
            interval = sample.interval(),
            connections = sample.connections().len(),
            tcp_ports = sample.ports(Protocol::Tcp).len(),
            udp_ports = sample.ports(Protocol::Udp).len(),
            "Collected metrics sample"
        );

        self.baseline = Some(sample.baseline());
        sample
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Interface name for a local address.
///
/// Wildcard binds are reported by their own address text.
fn interface_name<P: NetworkProbe + ?Sized>(probe: &P, addr: &IpAddr) -> Option<String> {
    if addr.is_unspecified() {
        return Some(addr.to_string());
    }
    probe.interface_for(addr)
}

fn record_network_stats<P: NetworkProbe + ?Sized>(sample: &mut Sample, probe: &P) {
    match probe.io_counters() {
        Ok(c) => sample.record_interface_totals(c.bytes_in, c.bytes_out, c.packets_in, c.packets_out),
        Err(e) => warn!(error = %e, "Failed to read interface counters"),
    }
}

fn record_listening_ports<P: NetworkProbe + ?Sized>(
    sample: &mut Sample,
    probe: &P,
    sockets: &[SocketEntry],
) {
    let mut tcp = Vec::new();
    let mut udp = Vec::new();

    for sock in sockets {
        let port = ListeningPort {
            port: sock.local.port(),
            interface: interface_name(probe, &sock.local.ip()),
        };
        match (sock.kind, sock.state) {
            (SocketKind::Stream, SocketState::Listen) => tcp.push(port),
            // UDP has no listen state; every bound socket counts.
            (SocketKind::Datagram, _) => udp.push(port),
            _ => {}
        }
    }

    sample.record_ports(Protocol::Udp, udp);
    sample.record_ports(Protocol::Tcp, tcp);
}

fn record_connections<P: NetworkProbe + ?Sized>(
    sample: &mut Sample,
    probe: &P,
    sockets: &[SocketEntry],
) {
    let established = sockets
        .iter()
        .filter(|s| s.kind == SocketKind::Stream && s.state == SocketState::Established);

    for sock in established {
        let Some(remote) = sock.remote else {
            warn!(local = %sock.local, "Established socket without peer address, skipping");
            continue;
        };
        let iface = interface_name(probe, &sock.local.ip());
        sample.record_connection(
            &remote.ip().to_string(),
            remote.port(),
            iface.as_deref(),
            sock.local.port(),
        );
    }
}
