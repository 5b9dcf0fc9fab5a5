use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Transport protocol recognised when building flow keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
        }
    }
}

/// A captured packet, already decoded by the capture layer.
///
/// Any of the addressing fields may be missing when the frame had no
/// IP or TCP/UDP layer; such packets still aggregate under a degenerate key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Capture timestamp
    pub timestamp: DateTime<Utc>,

    /// Length of the frame in bytes
    pub length: usize,

    /// Source IP address
    pub source_ip: Option<IpAddr>,

    /// Destination IP address
    pub destination_ip: Option<IpAddr>,

    /// Source port (TCP/UDP only)
    pub source_port: Option<u16>,

    /// Destination port (TCP/UDP only)
    pub destination_port: Option<u16>,

    /// Transport protocol (TCP/UDP only)
    pub protocol: Option<Protocol>,
}

impl Packet {
    /// Create a packet with no addressing information
    pub fn new(timestamp: DateTime<Utc>, length: usize) -> Self {
        Self {
            timestamp,
            length,
            source_ip: None,
            destination_ip: None,
            source_port: None,
            destination_port: None,
            protocol: None,
        }
    }

    /// Set the IP endpoints
    pub fn with_addresses(mut self, source: IpAddr, destination: IpAddr) -> Self {
        self.source_ip = Some(source);
        self.destination_ip = Some(destination);
        self
    }

    /// Set the transport protocol and ports
    pub fn with_transport(mut self, protocol: Protocol, source_port: u16, destination_port: u16) -> Self {
        self.protocol = Some(protocol);
        self.source_port = Some(source_port);
        self.destination_port = Some(destination_port);
        self
    }
}
