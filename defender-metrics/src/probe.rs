//! OS probe layer.
//!
//! The collector reads host facts only through [`NetworkProbe`], so tests can
//! script the host and other platforms can plug in their own source.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use sysinfo::Networks;
use tracing::trace;

use crate::error::ProbeError;
use crate::network;
use crate::procfs;
use crate::sample::InterfaceCounters;

/// Socket type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// TCP
    Stream,
    /// UDP
    Datagram,
}

/// Connection state as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketState {
    Established,
    Listen,
    Other(u8),
}

impl SocketState {
    /// Map a kernel TCP state code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => SocketState::Established,
            0x0A => SocketState::Listen,
            other => SocketState::Other(other),
        }
    }
}

/// One open socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEntry {
    pub kind: SocketKind,
    pub state: SocketState,
    pub local: SocketAddr,
    /// Peer address; `None` for unconnected sockets.
    pub remote: Option<SocketAddr>,
}

/// Source of raw host network facts.
pub trait NetworkProbe {
    /// Bring cached OS state up to date before a collection cycle.
    fn refresh(&mut self) {}

    /// Cumulative host-wide traffic counters.
    fn io_counters(&self) -> Result<InterfaceCounters, ProbeError>;

    /// All open inet sockets.
    fn sockets(&self) -> Result<Vec<SocketEntry>, ProbeError>;

    /// Name of the interface owning `addr`.
    fn interface_for(&self, addr: &IpAddr) -> Option<String>;
}

/// Probe backed by `sysinfo` for interfaces and `/proc/net` for sockets.
pub struct HostProbe {
    networks: Networks,
    addresses: HashMap<IpAddr, String>,
    proc_root: PathBuf,
}

impl HostProbe {
    pub fn new() -> Self {
        Self::with_proc_root("/proc")
    }

    /// Read socket tables from an alternate procfs mount.
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        let networks = Networks::new_with_refreshed_list();
        let addresses = network::collect_interface_addresses(&networks);
        Self {
            networks,
            addresses,
            proc_root: proc_root.into(),
        }
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkProbe for HostProbe {
    fn refresh(&mut self) {
        self.networks.refresh_list();
        self.addresses = network::collect_interface_addresses(&self.networks);
        trace!(
            interfaces = self.networks.list().len(),
            addresses = self.addresses.len(),
            "Network probe refreshed"
        );
    }

    fn io_counters(&self) -> Result<InterfaceCounters, ProbeError> {
        Ok(network::collect_io_counters(&self.networks))
    }

    fn sockets(&self) -> Result<Vec<SocketEntry>, ProbeError> {
        if !cfg!(target_os = "linux") {
            return Err(ProbeError::Unsupported("socket tables"));
        }
        procfs::read_socket_tables(&self.proc_root)
    }

    fn interface_for(&self, addr: &IpAddr) -> Option<String> {
        self.addresses.get(addr).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        assert_eq!(SocketState::from_code(0x01), SocketState::Established);
        assert_eq!(SocketState::from_code(0x0A), SocketState::Listen);
        assert_eq!(SocketState::from_code(0x07), SocketState::Other(0x07));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_host_probe_reads_alternate_root() {
        let dir = tempfile::tempdir().unwrap();
        let net = dir.path().join("net");
        std::fs::create_dir(&net).unwrap();
        std::fs::write(
            net.join("tcp"),
            "  sl  local_address rem_address   st\n   0: 00000000:0016 00000000:0000 0A\n",
        )
        .unwrap();

        let probe = HostProbe::with_proc_root(dir.path());
        let sockets = probe.sockets().unwrap();
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].local.port(), 22);
        assert_eq!(sockets[0].state, SocketState::Listen);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_host_probe_without_tables_fails() {
        let dir = tempfile::tempdir().unwrap();
        let probe = HostProbe::with_proc_root(dir.path());
        assert!(matches!(probe.sockets(), Err(ProbeError::Io { .. })));
    }
}
