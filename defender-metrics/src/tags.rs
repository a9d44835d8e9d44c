//! Field name selection for metrics reports.
//!
//! Every key written into a report goes through [`FieldNames`], which picks
//! either the verbose spelling (easier to debug) or the compact spelling
//! (smaller payloads). The mode is fixed when the resolver is created.

/// Logical report fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Header,
    Metrics,
    ReportId,
    Version,
    TcpConnections,
    EstablishedConnections,
    Connections,
    RemoteAddr,
    RemotePort,
    LocalPort,
    LocalInterface,
    Status,
    ListeningTcpPorts,
    ListeningUdpPorts,
    Ports,
    Port,
    Interface,
    NetworkStats,
    BytesIn,
    BytesOut,
    PacketsIn,
    PacketsOut,
    Total,
}

impl Tag {
    /// All tags, in declaration order.
    pub const ALL: [Tag; 23] = [
        Tag::Header,
        Tag::Metrics,
        Tag::ReportId,
        Tag::Version,
        Tag::TcpConnections,
        Tag::EstablishedConnections,
        Tag::Connections,
        Tag::RemoteAddr,
        Tag::RemotePort,
        Tag::LocalPort,
        Tag::LocalInterface,
        Tag::Status,
        Tag::ListeningTcpPorts,
        Tag::ListeningUdpPorts,
        Tag::Ports,
        Tag::Port,
        Tag::Interface,
        Tag::NetworkStats,
        Tag::BytesIn,
        Tag::BytesOut,
        Tag::PacketsIn,
        Tag::PacketsOut,
        Tag::Total,
    ];

    /// The (verbose, compact) spellings of this field.
    pub const fn names(self) -> (&'static str, &'static str) {
        match self {
            Tag::Header => ("header", "hed"),
            Tag::Metrics => ("metrics", "met"),
            Tag::ReportId => ("report_id", "rid"),
            Tag::Version => ("version", "v"),
            Tag::TcpConnections => ("tcp_connections", "tc"),
            Tag::EstablishedConnections => ("established_connections", "ec"),
            Tag::Connections => ("connections", "cs"),
            Tag::RemoteAddr => ("remote_addr", "rad"),
            Tag::RemotePort => ("remote_port", "rp"),
            Tag::LocalPort => ("local_port", "lp"),
            Tag::LocalInterface => ("local_interface", "li"),
            Tag::Status => ("status", "s"),
            Tag::ListeningTcpPorts => ("listening_tcp_ports", "tp"),
            Tag::ListeningUdpPorts => ("listening_udp_ports", "up"),
            Tag::Ports => ("ports", "pts"),
            Tag::Port => ("port", "pt"),
            Tag::Interface => ("interface", "if"),
            Tag::NetworkStats => ("network_stats", "ns"),
            Tag::BytesIn => ("bytes_in", "bi"),
            Tag::BytesOut => ("bytes_out", "bo"),
            Tag::PacketsIn => ("packets_in", "pi"),
            Tag::PacketsOut => ("packets_out", "po"),
            Tag::Total => ("total", "t"),
        }
    }
}

/// Resolves logical fields to their wire names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldNames {
    compact: bool,
}

impl FieldNames {
    /// Create a resolver; `compact` selects the short spellings.
    pub const fn new(compact: bool) -> Self {
        Self { compact }
    }

    /// Resolver producing the verbose spellings.
    pub const fn verbose() -> Self {
        Self::new(false)
    }

    /// Resolver producing the compact spellings.
    pub const fn compact() -> Self {
        Self::new(true)
    }

    pub const fn is_compact(&self) -> bool {
        self.compact
    }

    /// Wire name of `tag` in this resolver's mode.
    pub const fn resolve(&self, tag: Tag) -> &'static str {
        let (verbose, compact) = tag.names();
        if self.compact {
            compact
        } else {
            verbose
        }
    }
}
