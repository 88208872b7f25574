use std::net::IpAddr;

use crate::codec::builder::{build_payload, length_field, require};
use crate::codec::{
    BuildError, BuildPolicy, Header, Packet, PacketBuilder, calc_pseudo_checksum, pseudo_length_bits,
};
use crate::protocols::numbers::{IpNumber, UdpPort};

use super::layout;
use super::packet::{UdpHeader, UdpPacket};

const PROTOCOL: &str = "UDP";

#[derive(Default)]
pub struct UdpBuilder {
    src_port: Option<UdpPort>,
    dst_port: Option<UdpPort>,
    length: u16,
    checksum: u16,
    src_addr: Option<IpAddr>,
    dst_addr: Option<IpAddr>,
    payload: Option<Box<dyn PacketBuilder>>,
    policy: BuildPolicy,
}

impl UdpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_packet(packet: &UdpPacket) -> Self {
        Self {
            src_port: Some(packet.header.src_port),
            dst_port: Some(packet.header.dst_port),
            length: packet.header.length,
            checksum: packet.header.checksum,
            src_addr: None,
            dst_addr: None,
            payload: packet
                .payload
                .clone()
                .map(|payload| Box::new(payload) as Box<dyn PacketBuilder>),
            policy: BuildPolicy::default(),
        }
    }

    pub fn src_port(mut self, port: UdpPort) -> Self {
        self.src_port = Some(port);
        self
    }

    pub fn dst_port(mut self, port: UdpPort) -> Self {
        self.dst_port = Some(port);
        self
    }

    pub fn length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }

    pub fn checksum(mut self, checksum: u16) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn src_addr(mut self, addr: impl Into<IpAddr>) -> Self {
        self.src_addr = Some(addr.into());
        self
    }

    pub fn dst_addr(mut self, addr: impl Into<IpAddr>) -> Self {
        self.dst_addr = Some(addr.into());
        self
    }

    pub fn payload<B: PacketBuilder + 'static>(mut self, payload: B) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    pub fn payload_builder(mut self, payload: Option<Box<dyn PacketBuilder>>) -> Self {
        self.payload = payload;
        self
    }

    pub fn correct_length_at_build(mut self, on: bool) -> Self {
        self.policy.correct_length_at_build = on;
        self
    }

    pub fn correct_checksum_at_build(mut self, on: bool) -> Self {
        self.policy.correct_checksum_at_build = on;
        self
    }

    pub fn policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<UdpPacket, BuildError> {
        let src_port = require(self.src_port, PROTOCOL, "src_port")?;
        let dst_port = require(self.dst_port, PROTOCOL, "dst_port")?;
        let addrs = if self.policy.correct_checksum_at_build {
            Some((
                require(self.src_addr, PROTOCOL, "src_addr")?,
                require(self.dst_addr, PROTOCOL, "dst_addr")?,
            ))
        } else {
            None
        };

        let (payload, payload_bytes) = build_payload(self.payload)?;

        let length = if self.policy.correct_length_at_build {
            let total = layout::HEADER_LEN + payload_bytes.len();
            length_field(PROTOCOL, "length", total, 16)? as u16
        } else {
            self.length
        };

        let mut header = UdpHeader {
            src_port,
            dst_port,
            length,
            checksum: self.checksum,
        };
        if let Some((src, dst)) = addrs {
            if src.is_ipv4() == dst.is_ipv4() {
                let datagram_len = layout::HEADER_LEN + payload_bytes.len();
                length_field(PROTOCOL, "datagram_length", datagram_len, pseudo_length_bits(src))?;
            }
            header.checksum = 0;
            let checksum = calc_pseudo_checksum(
                src,
                dst,
                IpNumber::UDP.value(),
                &header.raw_data(),
                &payload_bytes,
            )
            .ok_or_else(|| {
                BuildError::invalid(
                    PROTOCOL,
                    format!("src_addr {} and dst_addr {} differ in family", src, dst),
                )
            })?;
            // Zero on the wire means "no checksum".
            header.checksum = if checksum == 0 { 0xffff } else { checksum };
        }

        Ok(UdpPacket { header, payload })
    }
}

impl PacketBuilder for UdpBuilder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::codec::UnknownPacket;

    #[test]
    fn length_and_checksum_are_corrected() {
        let src = Ipv4Addr::new(192, 168, 0, 1);
        let dst = Ipv4Addr::new(192, 168, 0, 2);
        let packet = UdpBuilder::new()
            .src_port(UdpPort(1234))
            .dst_port(UdpPort(9999))
            .payload(UnknownPacket::builder(vec![1, 2, 3]))
            .src_addr(src)
            .dst_addr(dst)
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        assert_eq!(packet.header().length_field(), 11);
        assert!(packet.has_valid_checksum(src.into(), dst.into(), false));
    }

    #[test]
    fn ports_are_required() {
        let err = UdpBuilder::new().src_port(UdpPort(1)).build().unwrap_err();
        assert!(matches!(err, BuildError::MissingField { field: "dst_port", .. }));
    }
}
