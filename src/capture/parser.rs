use chrono::{DateTime, Utc};
use log::{debug, log_enabled, trace, Level};
use pcap::Linktype;
use pnet::packet::{
    ethernet::{EtherType, EtherTypes, EthernetPacket},
    ip::{IpNextHeaderProtocol, IpNextHeaderProtocols},
    ipv4::Ipv4Packet,
    ipv6::Ipv6Packet,
    tcp::TcpPacket,
    udp::UdpPacket,
    Packet as PnetPacket,
};
use std::net::IpAddr;

use crate::models::packet::{Packet, Protocol};

/// Length of the address family header on BSD loopback captures
const NULL_HEADER_LEN: usize = 4;

/// Length of the Linux cooked capture header (`any` device)
const SLL_HEADER_LEN: usize = 16;

/// Decodes captured frames into flow-ready packets.
///
/// Only what the flow key needs is extracted: IP endpoints, and protocol and
/// ports for TCP and UDP. Layers that fail to decode leave their fields empty,
/// so every frame yields a packet, if only one with a degenerate key.
pub struct PacketParser {
    linktype: Linktype,
}

impl PacketParser {
    /// Create a parser for frames of the given link type
    pub fn new(linktype: Linktype) -> Self {
        Self { linktype }
    }

    /// Decode one frame
    pub fn parse_packet(&self, data: &[u8], timestamp: DateTime<Utc>) -> Packet {
        if log_enabled!(Level::Trace) {
            trace!("Parsing {:?} frame, size: {} bytes", self.linktype, data.len());
        }

        let mut packet = Packet::new(timestamp, data.len());

        match self.linktype {
            Linktype::ETHERNET => match EthernetPacket::new(data) {
                Some(eth_packet) => self.parse_ethertype(eth_packet.get_ethertype(), eth_packet.payload(), &mut packet),
                None => debug!("Truncated Ethernet frame, {} bytes", data.len()),
            },
            Linktype::LINUX_SLL if data.len() >= SLL_HEADER_LEN => {
                let ethertype = EtherType::new(u16::from_be_bytes([data[14], data[15]]));
                self.parse_ethertype(ethertype, &data[SLL_HEADER_LEN..], &mut packet);
            }
            Linktype::RAW | Linktype::IPV4 | Linktype::IPV6 => self.parse_ip(data, &mut packet),
            Linktype::NULL | Linktype::LOOP if data.len() >= NULL_HEADER_LEN => {
                self.parse_ip(&data[NULL_HEADER_LEN..], &mut packet);
            }
            other => debug!("Undecodable {:?} frame, {} bytes", other, data.len()),
        }

        packet
    }

    fn parse_ethertype(&self, ethertype: EtherType, payload: &[u8], packet: &mut Packet) {
        match ethertype {
            EtherTypes::Ipv4 => self.parse_ipv4(payload, packet),
            EtherTypes::Ipv6 => self.parse_ipv6(payload, packet),
            other => {
                if log_enabled!(Level::Trace) {
                    trace!("No IP layer in frame (EtherType {:?})", other);
                }
            }
        }
    }

    /// Parse a bare IP datagram, choosing the version from its first nibble
    fn parse_ip(&self, data: &[u8], packet: &mut Packet) {
        match data.first().map(|b| b >> 4) {
            Some(4) => self.parse_ipv4(data, packet),
            Some(6) => self.parse_ipv6(data, packet),
            Some(version) => debug!("Unknown IP version {}", version),
            None => debug!("Empty IP datagram"),
        }
    }

    fn parse_ipv4(&self, data: &[u8], packet: &mut Packet) {
        let ipv4_packet = match Ipv4Packet::new(data) {
            Some(p) => p,
            None => {
                debug!("Truncated IPv4 header, {} bytes", data.len());
                return;
            }
        };

        packet.source_ip = Some(IpAddr::V4(ipv4_packet.get_source()));
        packet.destination_ip = Some(IpAddr::V4(ipv4_packet.get_destination()));

        if log_enabled!(Level::Trace) {
            trace!(
                "IPv4 - src: {}, dst: {}, proto: {:?}",
                ipv4_packet.get_source(),
                ipv4_packet.get_destination(),
                ipv4_packet.get_next_level_protocol()
            );
        }

        self.parse_transport_protocol(ipv4_packet.get_next_level_protocol(), ipv4_packet.payload(), packet);
    }

    fn parse_ipv6(&self, data: &[u8], packet: &mut Packet) {
        let ipv6_packet = match Ipv6Packet::new(data) {
            Some(p) => p,
            None => {
                debug!("Truncated IPv6 header, {} bytes", data.len());
                return;
            }
        };

        packet.source_ip = Some(IpAddr::V6(ipv6_packet.get_source()));
        packet.destination_ip = Some(IpAddr::V6(ipv6_packet.get_destination()));

        self.parse_transport_protocol(ipv6_packet.get_next_header(), ipv6_packet.payload(), packet);
    }

    /// Record protocol and ports for TCP and UDP; anything else stays empty
    fn parse_transport_protocol(&self, proto: IpNextHeaderProtocol, data: &[u8], packet: &mut Packet) {
        if log_enabled!(Level::Trace) {
            trace!("Transport protocol: {:?}, data length: {}", proto, data.len());
        }

        match proto {
            IpNextHeaderProtocols::Tcp => {
                if let Some(tcp_packet) = TcpPacket::new(data) {
                    packet.protocol = Some(Protocol::Tcp);
                    packet.source_port = Some(tcp_packet.get_source());
                    packet.destination_port = Some(tcp_packet.get_destination());
                }
            }
            IpNextHeaderProtocols::Udp => {
                if let Some(udp_packet) = UdpPacket::new(data) {
                    packet.protocol = Some(Protocol::Udp);
                    packet.source_port = Some(udp_packet.get_source());
                    packet.destination_port = Some(udp_packet.get_destination());
                }
            }
            _ => {}
        }
    }
}

/// Convert a pcap header timestamp to UTC
pub fn header_timestamp(secs: i64, micros: i64) -> DateTime<Utc> {
    let nanos = (micros.clamp(0, 999_999) * 1_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos).unwrap_or_default()
}
