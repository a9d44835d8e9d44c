//! Network interface counters and addresses.

use std::collections::HashMap;
use std::net::IpAddr;

use sysinfo::Networks;

use crate::sample::InterfaceCounters;

/// Sum cumulative traffic counters across all interfaces.
pub fn collect_io_counters(networks: &Networks) -> InterfaceCounters {
    networks
        .list()
        .values()
        .fold(InterfaceCounters::default(), |acc, data| InterfaceCounters {
            bytes_in: acc.bytes_in.saturating_add(data.total_received()),
            bytes_out: acc.bytes_out.saturating_add(data.total_transmitted()),
            packets_in: acc.packets_in.saturating_add(data.total_packets_received()),
            packets_out: acc.packets_out.saturating_add(data.total_packets_transmitted()),
        })
}

/// Map every configured address to the interface that owns it.
///
/// When an address is configured on several interfaces, the name that sorts
/// first wins so the mapping is stable across refreshes.
pub fn collect_interface_addresses(networks: &Networks) -> HashMap<IpAddr, String> {
    let mut interfaces: Vec<_> = networks.list().iter().collect();
    interfaces.sort_by(|a, b| a.0.cmp(b.0));

    let mut map = HashMap::new();
    for (name, data) in interfaces {
        for net in data.ip_networks() {
            map.entry(net.addr).or_insert_with(|| name.clone());
        }
    }
    map
}
