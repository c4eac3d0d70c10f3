use super::{Frame, Network, Transport};

/// Frames of this size or smaller are bare ACKs and pings, they carry no media.
pub const MIN_FRAME_LEN: usize = 60;

#[derive(Debug, Clone, Copy)]
pub struct TrafficFilter {
    include_ipv6: bool,
}

impl TrafficFilter {
    pub fn new(include_ipv6: bool) -> Self {
        TrafficFilter { include_ipv6 }
    }

    pub fn accepts(&self, frame: &Frame) -> bool {
        let ip = match frame.network {
            Some(Network::Ipv4) => true,
            Some(Network::Ipv6) => self.include_ipv6,
            None => false,
        };
        let transport = matches!(frame.transport, Some(Transport::Tcp | Transport::Udp));

        ip && transport && frame.length > MIN_FRAME_LEN
    }
}

impl Default for TrafficFilter {
    fn default() -> Self {
        TrafficFilter::new(false)
    }
}
