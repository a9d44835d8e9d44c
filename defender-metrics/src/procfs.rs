//! Socket tables from `/proc/net`.
//!
//! Each table line looks like
//! `sl local_address rem_address st tx_queue:rx_queue tr:tm->when retrnsmt uid timeout inode`
//! with addresses printed as `HEXADDR:HEXPORT`. The address hex is the raw
//! in-memory value, printed in 32-bit words.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::Path;

use tracing::{debug, trace};

use crate::error::ProbeError;
use crate::probe::{SocketEntry, SocketKind, SocketState};

/// Socket tables read on each cycle, with the socket kind they hold.
pub const SOCKET_TABLES: [(&str, SocketKind); 4] = [
    ("tcp", SocketKind::Stream),
    ("tcp6", SocketKind::Stream),
    ("udp", SocketKind::Datagram),
    ("udp6", SocketKind::Datagram),
];

/// Read every socket table under `proc_root/net`.
///
/// Missing tables (e.g. no IPv6 support) are skipped. Fails only when no
/// table could be read at all.
pub fn read_socket_tables(proc_root: &Path) -> Result<Vec<SocketEntry>, ProbeError> {
    let mut out = Vec::new();
    let mut last_error = None;
    let mut read_any = false;

    for (name, kind) in SOCKET_TABLES {
        let path = proc_root.join("net").join(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                read_any = true;
                out.extend(parse_socket_table(&content, kind));
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping socket table");
                last_error = Some(ProbeError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        }
    }

    match (read_any, last_error) {
        (false, Some(e)) => Err(e),
        _ => Ok(out),
    }
}

/// Parse one socket table. Malformed lines are skipped.
pub fn parse_socket_table(content: &str, kind: SocketKind) -> Vec<SocketEntry> {
    content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_socket_line(line, kind) {
            Ok(entry) => Some(entry),
            Err(e) => {
                trace!(error = %e, "Skipping socket line");
                None
            }
        })
        .collect()
}

fn parse_socket_line(line: &str, kind: SocketKind) -> Result<SocketEntry, ProbeError> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    if cols.len() < 4 {
        return Err(ProbeError::Malformed(line.trim().to_string()));
    }

    let local = parse_socket_addr(cols[1])?;
    let remote = parse_socket_addr(cols[2])?;
    let state = u8::from_str_radix(cols[3], 16)
        .map_err(|_| ProbeError::Malformed(format!("bad state '{}'", cols[3])))?;

    // An all-zero remote means no peer.
    let remote = (!remote.ip().is_unspecified() || remote.port() != 0).then_some(remote);

    Ok(SocketEntry {
        kind,
        state: SocketState::from_code(state),
        local,
        remote,
    })
}

/// Parse `HEXADDR:HEXPORT` for IPv4 (8 hex digits) or IPv6 (32 hex digits).
///
/// IPv4-mapped IPv6 addresses come back as plain IPv4.
pub fn parse_socket_addr(field: &str) -> Result<SocketAddr, ProbeError> {
    let malformed = || ProbeError::Malformed(format!("bad address '{}'", field));

    let (hex_ip, hex_port) = field.split_once(':').ok_or_else(malformed)?;
    let port = u16::from_str_radix(hex_port, 16).map_err(|_| malformed())?;

    let ip = match hex_ip.len() {
        8 => {
            let word = u32::from_str_radix(hex_ip, 16).map_err(|_| malformed())?;
            IpAddr::V4(Ipv4Addr::from(word.to_ne_bytes()))
        }
        32 => {
            let mut octets = [0u8; 16];
            for (i, chunk) in octets.chunks_exact_mut(4).enumerate() {
                let word = u32::from_str_radix(&hex_ip[i * 8..i * 8 + 8], 16)
                    .map_err(|_| malformed())?;
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            IpAddr::V6(Ipv6Addr::from(octets)).to_canonical()
        }
        _ => return Err(malformed()),
    };

    Ok(SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Fixtures use little-endian word order, as printed on x86 and arm64.
    const TCP_TABLE: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 19526 1 0000000000000000 100 0 0 10 0
   1: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 22345 1 0000000000000000 100 0 0 10 0
   2: 0F02000A:0016 0202000A:D3B2 01 00000000:00000000 02:0009A4B6 00000000     0        0 24681 4 0000000000000000 20 4 30 10 -1
   3: garbage
";

    const UDP6_TABLE: &str = "\
  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  12: 00000000000000000000000000000000:0222 00000000000000000000000000000000:0000 07 00000000:00000000 00:00000000 00000000     0        0 20123 2 0000000000000000 0
  13: 0000000000000000FFFF00000100007F:0035 00000000000000000000000000000000:0000 07 00000000:00000000 00:00000000 00000000     0        0 20124 2 0000000000000000 0
";

    #[cfg(target_endian = "little")]
    #[test]
    fn test_parse_tcp_table() {
        let entries = parse_socket_table(TCP_TABLE, SocketKind::Stream);
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].local, "0.0.0.0:22".parse().unwrap());
        assert_eq!(entries[0].state, SocketState::Listen);
        assert_eq!(entries[0].remote, None);

        assert_eq!(entries[1].local, "127.0.0.1:8080".parse().unwrap());

        assert_eq!(entries[2].state, SocketState::Established);
        assert_eq!(entries[2].local, "10.0.2.15:22".parse().unwrap());
        assert_eq!(entries[2].remote, Some("10.0.2.2:54194".parse().unwrap()));
        assert!(entries.iter().all(|e| e.kind == SocketKind::Stream));
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn test_parse_udp6_table() {
        let entries = parse_socket_table(UDP6_TABLE, SocketKind::Datagram);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].local, "[::]:546".parse().unwrap());
        assert_eq!(entries[0].state, SocketState::Other(0x07));
        // v4-mapped loopback
        assert_eq!(entries[1].local, "127.0.0.1:53".parse().unwrap());
    }

    #[test]
    fn test_rejects_bad_addresses() {
        assert!(parse_socket_addr("0100007F").is_err());
        assert!(parse_socket_addr("0100007:1F90").is_err());
        assert!(parse_socket_addr("ZZ00007F:1F90").is_err());
        assert!(parse_socket_addr("0100007F:XYZ").is_err());
    }

    #[test]
    fn test_empty_table() {
        assert!(parse_socket_table("header only\n", SocketKind::Stream).is_empty());
        assert!(parse_socket_table("", SocketKind::Datagram).is_empty());
    }
}
