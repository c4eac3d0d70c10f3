use std::time::Duration;

use pnet::packet::{
    ethernet::{EtherType, EtherTypes, EthernetPacket},
    ip::{IpNextHeaderProtocol, IpNextHeaderProtocols},
    ipv4::Ipv4Packet,
    ipv6::Ipv6Packet,
    vlan::VlanPacket,
    Packet,
};
use serde::Serialize;

pub mod filter;
pub mod sink;
pub mod sniffer;

/// One packet that passed the traffic filter.
///
/// `timestamp` is measured in seconds from the opening of the capture window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CaptureRecord {
    #[serde(rename = "ts")]
    pub timestamp: f64,
    #[serde(rename = "len")]
    pub length: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Ipv4,
    Ipv6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
    Other(u8),
}

/// Header metadata of one observed frame. The payload is never kept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub captured_at: f64,
    pub length: usize,
    pub network: Option<Network>,
    pub transport: Option<Transport>,
}

impl Frame {
    /// Reads the Ethernet, IP and transport headers of a raw link-layer frame.
    pub fn parse(data: &[u8], captured_at: f64) -> Frame {
        let mut frame = Frame {
            captured_at,
            length: data.len(),
            network: None,
            transport: None,
        };

        let Some(eth) = EthernetPacket::new(data) else {
            return frame;
        };

        match eth.get_ethertype() {
            // a single 802.1Q tag
            EtherTypes::Vlan => {
                if let Some(vlan) = VlanPacket::new(eth.payload()) {
                    frame.read_ip(vlan.get_ethertype(), vlan.payload());
                }
            }
            ethertype => frame.read_ip(ethertype, eth.payload()),
        }

        frame
    }

    fn read_ip(&mut self, ethertype: EtherType, payload: &[u8]) {
        match ethertype {
            EtherTypes::Ipv4 => {
                if let Some(ip) = Ipv4Packet::new(payload) {
                    self.network = Some(Network::Ipv4);
                    self.transport = Some(transport_of(ip.get_next_level_protocol()));
                }
            }
            EtherTypes::Ipv6 => {
                if let Some(ip) = Ipv6Packet::new(payload) {
                    self.network = Some(Network::Ipv6);
                    self.transport = Some(transport_of(ip.get_next_header()));
                }
            }
            _ => {}
        }
    }
}

fn transport_of(prot: IpNextHeaderProtocol) -> Transport {
    match prot {
        IpNextHeaderProtocols::Tcp => Transport::Tcp,
        IpNextHeaderProtocols::Udp => Transport::Udp,
        other => Transport::Other(other.0),
    }
}

/// Something that can watch an interface for a fixed window and report every frame.
pub trait Sniffer {
    fn sniff(&mut self, window: Duration, on_frame: &mut dyn FnMut(Frame)) -> anyhow::Result<()>;
}
