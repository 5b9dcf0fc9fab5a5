use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::models::packet::{Packet, Protocol};

/// Directional 5-tuple identifying a flow.
///
/// A->B and B->A are different keys. Missing fields compare equal to each
/// other, so undecodable packets share one degenerate key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowKey {
    pub src_addr: Option<IpAddr>,
    pub dst_addr: Option<IpAddr>,
    pub protocol: Option<Protocol>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
}

impl FlowKey {
    /// Build the key from a decoded packet
    pub fn from_packet(packet: &Packet) -> Self {
        Self {
            src_addr: packet.source_ip,
            dst_addr: packet.destination_ip,
            protocol: packet.protocol,
            src_port: packet.source_port,
            dst_port: packet.destination_port,
        }
    }

    /// True when no field could be decoded
    pub fn is_degenerate(&self) -> bool {
        self.src_addr.is_none()
            && self.dst_addr.is_none()
            && self.protocol.is_none()
            && self.src_port.is_none()
            && self.dst_port.is_none()
    }

    /// Key fields as text, empty where missing
    pub fn parts(&self) -> [String; 5] {
        fn text<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(|v| v.to_string()).unwrap_or_default()
        }
        [
            text(&self.src_addr),
            text(&self.dst_addr),
            text(&self.protocol),
            text(&self.src_port),
            text(&self.dst_port),
        ]
    }
}

impl From<&Packet> for FlowKey {
    fn from(packet: &Packet) -> Self {
        Self::from_packet(packet)
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.parts().join("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_direction_is_not_normalized() {
        let now = Utc::now();
        let a = "10.0.0.1".parse().unwrap();
        let b = "10.0.0.2".parse().unwrap();
        let forward = Packet::new(now, 60).with_addresses(a, b).with_transport(Protocol::Tcp, 5000, 80);
        let backward = Packet::new(now, 60).with_addresses(b, a).with_transport(Protocol::Tcp, 80, 5000);

        assert_ne!(FlowKey::from(&forward), FlowKey::from(&backward));
    }

    #[test]
    fn test_display() {
        let packet = Packet::new(Utc::now(), 60)
            .with_addresses("192.168.1.5".parse().unwrap(), "8.8.8.8".parse().unwrap())
            .with_transport(Protocol::Udp, 53000, 53);
        assert_eq!(FlowKey::from(&packet).to_string(), "192.168.1.5-8.8.8.8-UDP-53000-53");

        let empty = FlowKey::from(&Packet::new(Utc::now(), 42));
        assert!(empty.is_degenerate());
        assert_eq!(empty.to_string(), "----");
    }
}
