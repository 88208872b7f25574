use std::net::IpAddr;

use crate::codec::builder::{build_payload, length_field, require};
use crate::codec::{
    BuildError, BuildPolicy, Header, Packet, PacketBuilder, calc_pseudo_checksum, check_width,
    padding_len, pseudo_length_bits,
};
use crate::protocols::numbers::{IpNumber, TcpPort};

use super::layout;
use super::option::TcpOption;
use super::packet::{TcpHeader, TcpPacket};

const PROTOCOL: &str = "TCP";

/// Staging object for a [`TcpPacket`].
///
/// Ports are required. Checksum correction also needs the source and
/// destination addresses of the enclosing IP header, of the same family.
#[derive(Default)]
pub struct TcpBuilder {
    src_port: Option<TcpPort>,
    dst_port: Option<TcpPort>,
    sequence_number: u32,
    acknowledgment_number: u32,
    data_offset: u8,
    reserved: u8,
    urg: bool,
    ack: bool,
    psh: bool,
    rst: bool,
    syn: bool,
    fin: bool,
    window: u16,
    checksum: u16,
    urgent_pointer: u16,
    options: Vec<TcpOption>,
    padding: Vec<u8>,
    src_addr: Option<IpAddr>,
    dst_addr: Option<IpAddr>,
    payload: Option<Box<dyn PacketBuilder>>,
    policy: BuildPolicy,
}

impl TcpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_packet(packet: &TcpPacket) -> Self {
        let header = &packet.header;
        Self {
            src_port: Some(header.src_port),
            dst_port: Some(header.dst_port),
            sequence_number: header.sequence_number,
            acknowledgment_number: header.acknowledgment_number,
            data_offset: header.data_offset,
            reserved: header.reserved,
            urg: header.urg,
            ack: header.ack,
            psh: header.psh,
            rst: header.rst,
            syn: header.syn,
            fin: header.fin,
            window: header.window,
            checksum: header.checksum,
            urgent_pointer: header.urgent_pointer,
            options: header.options.clone(),
            padding: header.padding.clone(),
            src_addr: None,
            dst_addr: None,
            payload: packet
                .payload
                .clone()
                .map(|payload| Box::new(payload) as Box<dyn PacketBuilder>),
            policy: BuildPolicy::default(),
        }
    }

    pub fn src_port(mut self, port: TcpPort) -> Self {
        self.src_port = Some(port);
        self
    }

    pub fn dst_port(mut self, port: TcpPort) -> Self {
        self.dst_port = Some(port);
        self
    }

    pub fn sequence_number(mut self, value: u32) -> Self {
        self.sequence_number = value;
        self
    }

    pub fn acknowledgment_number(mut self, value: u32) -> Self {
        self.acknowledgment_number = value;
        self
    }

    pub fn data_offset(mut self, words: u8) -> Self {
        self.data_offset = words;
        self
    }

    pub fn reserved(mut self, reserved: u8) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn urg(mut self, on: bool) -> Self {
        self.urg = on;
        self
    }

    pub fn ack(mut self, on: bool) -> Self {
        self.ack = on;
        self
    }

    pub fn psh(mut self, on: bool) -> Self {
        self.psh = on;
        self
    }

    pub fn rst(mut self, on: bool) -> Self {
        self.rst = on;
        self
    }

    pub fn syn(mut self, on: bool) -> Self {
        self.syn = on;
        self
    }

    pub fn fin(mut self, on: bool) -> Self {
        self.fin = on;
        self
    }

    pub fn window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    pub fn checksum(mut self, checksum: u16) -> Self {
        self.checksum = checksum;
        self
    }

    pub fn urgent_pointer(mut self, value: u16) -> Self {
        self.urgent_pointer = value;
        self
    }

    pub fn options(mut self, options: Vec<TcpOption>) -> Self {
        self.options = options;
        self
    }

    pub fn padding(mut self, padding: Vec<u8>) -> Self {
        self.padding = padding;
        self
    }

    /// Pseudo-header source address, used only for checksum correction.
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

    pub fn padding_at_build(mut self, on: bool) -> Self {
        self.policy.padding_at_build = on;
        self
    }

    pub fn policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<TcpPacket, BuildError> {
        let src_port = require(self.src_port, PROTOCOL, "src_port")?;
        let dst_port = require(self.dst_port, PROTOCOL, "dst_port")?;
        let addrs = if self.policy.correct_checksum_at_build {
            let src = require(self.src_addr, PROTOCOL, "src_addr")?;
            let dst = require(self.dst_addr, PROTOCOL, "dst_addr")?;
            if src.is_ipv4() != dst.is_ipv4() {
                return Err(BuildError::invalid(
                    PROTOCOL,
                    format!("src_addr {} and dst_addr {} differ in family", src, dst),
                ));
            }
            Some((src, dst))
        } else {
            None
        };
        check_width(PROTOCOL, "reserved", u64::from(self.reserved), layout::RESERVED_BITS)?;
        for option in &self.options {
            option.validate()?;
        }
        if !self.policy.correct_length_at_build {
            check_width(
                PROTOCOL,
                "data_offset",
                u64::from(self.data_offset),
                layout::DATA_OFFSET_BITS,
            )?;
        }

        let (payload, payload_bytes) = build_payload(self.payload)?;

        let unpadded = layout::MIN_HEADER_LEN + TcpHeader::options_len(&self.options);
        let padding = if self.policy.padding_at_build {
            vec![0u8; padding_len(unpadded, layout::ALIGNMENT)]
        } else {
            self.padding
        };
        let header_len = unpadded + padding.len();

        let data_offset = if self.policy.correct_length_at_build {
            if header_len % layout::ALIGNMENT != 0 {
                return Err(BuildError::invalid(
                    PROTOCOL,
                    format!("header length {} is not a multiple of 4", header_len),
                ));
            }
            length_field(PROTOCOL, "data_offset", header_len / 4, layout::DATA_OFFSET_BITS)? as u8
        } else {
            self.data_offset
        };

        let mut header = TcpHeader {
            src_port,
            dst_port,
            sequence_number: self.sequence_number,
            acknowledgment_number: self.acknowledgment_number,
            data_offset,
            reserved: self.reserved,
            urg: self.urg,
            ack: self.ack,
            psh: self.psh,
            rst: self.rst,
            syn: self.syn,
            fin: self.fin,
            window: self.window,
            checksum: self.checksum,
            urgent_pointer: self.urgent_pointer,
            options: self.options,
            padding,
        };
        if let Some((src, dst)) = addrs {
            let segment_len = header.length() + payload_bytes.len();
            length_field(PROTOCOL, "segment_length", segment_len, pseudo_length_bits(src))?;
            header.checksum = 0;
            header.checksum = calc_pseudo_checksum(
                src,
                dst,
                IpNumber::TCP.value(),
                &header.raw_data(),
                &payload_bytes,
            )
            .ok_or_else(|| BuildError::invalid(PROTOCOL, "no pseudo-header for address pair"))?;
        }

        Ok(TcpPacket { header, payload })
    }
}

impl PacketBuilder for TcpBuilder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use crate::codec::UnknownPacket;

    fn base() -> TcpBuilder {
        TcpBuilder::new()
            .src_port(TcpPort(12345))
            .dst_port(TcpPort::HTTP)
            .sequence_number(1)
            .syn(true)
            .window(0x7210)
    }

    #[test]
    fn builds_syn_with_checksum() {
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dst = Ipv4Addr::new(10, 0, 0, 2);
        let packet = base()
            .src_addr(src)
            .dst_addr(dst)
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        assert_eq!(packet.header().data_offset(), 5);
        assert_eq!(packet.header().checksum(), 0xf945);
        assert!(packet.has_valid_checksum(src.into(), dst.into(), false));
    }

    #[test]
    fn checksum_covers_payload_over_ipv6() {
        let src = Ipv6Addr::LOCALHOST;
        let dst = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
        let packet = base()
            .psh(true)
            .ack(true)
            .payload(UnknownPacket::builder(b"payload".to_vec()))
            .src_addr(src)
            .dst_addr(dst)
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        assert!(packet.has_valid_checksum(src.into(), dst.into(), false));
        assert_eq!(packet.length(), 27);
    }

    #[test]
    fn checksum_correction_requires_addresses() {
        let err = base().correct_checksum_at_build(true).build().unwrap_err();
        assert!(matches!(err, BuildError::MissingField { field: "src_addr", .. }));

        let err = base()
            .src_addr(Ipv4Addr::LOCALHOST)
            .dst_addr(Ipv6Addr::LOCALHOST)
            .correct_checksum_at_build(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));
    }

    #[test]
    fn reserved_width_is_enforced() {
        let err = base().reserved(0x40).build().unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "reserved", max: 63, .. }));
    }

    #[test]
    fn options_set_data_offset() {
        let packet = base()
            .options(vec![
                TcpOption::MaximumSegmentSize(1460),
                TcpOption::SackPermitted,
                TcpOption::WindowScale(7),
            ])
            .correct_length_at_build(true)
            .padding_at_build(true)
            .build()
            .unwrap();
        assert_eq!(packet.header().padding(), [0, 0, 0]);
        assert_eq!(packet.header().data_offset(), 8);
        assert_eq!(packet.raw_data().len(), 32);
    }

    #[test]
    fn option_length_must_fit_one_octet() {
        let unknown = |len: usize| TcpOption::Unknown {
            kind: crate::protocols::numbers::TcpOptionKind(99),
            data: vec![0; len],
        };
        assert!(base().options(vec![unknown(253)]).build().is_ok());

        let err = base().options(vec![unknown(300)]).build().unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutOfRange { field: "option_length", value: 302, max: 255, .. }
        ));

        let blocks = vec![(1, 2); 32];
        let err = base().options(vec![TcpOption::Sack(blocks)]).build().unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "option_length", .. }));
    }

    #[test]
    fn large_segments_checksum_without_overflow() {
        let payload = vec![0xff; 200_000];
        let src = Ipv6Addr::LOCALHOST;
        let dst = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);
        let packet = base()
            .payload(UnknownPacket::builder(payload.clone()))
            .src_addr(src)
            .dst_addr(dst)
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        assert!(packet.has_valid_checksum(src.into(), dst.into(), false));

        // The IPv4 pseudo-header length is 16 bits.
        let err = base()
            .payload(UnknownPacket::builder(payload))
            .src_addr(Ipv4Addr::new(10, 0, 0, 1))
            .dst_addr(Ipv4Addr::new(10, 0, 0, 2))
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutOfRange { field: "segment_length", max: 0xffff, .. }
        ));
    }
}
