use std::net::IpAddr;

use serde::Serialize;
use serde_json::Value;

use crate::codec::bits::{put_u16, put_u32};
use crate::codec::chain::{ChainErrorPolicy, Element, parse_length_bounded};
use crate::codec::packet::{Render, to_json_value};
use crate::codec::{
    ByteOrder, CodecError, Header, Packet, PayloadKind, ProtocolRegistry, RawView,
    calc_pseudo_checksum, get_bits,
};
use crate::protocols::numbers::{IpNumber, TcpPort};

use super::builder::TcpBuilder;
use super::layout;
use super::option::{TcpOption, decode_option};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TcpHeader {
    pub(super) src_port: TcpPort,
    pub(super) dst_port: TcpPort,
    pub(super) sequence_number: u32,
    pub(super) acknowledgment_number: u32,
    pub(super) data_offset: u8,
    pub(super) reserved: u8,
    pub(super) urg: bool,
    pub(super) ack: bool,
    pub(super) psh: bool,
    pub(super) rst: bool,
    pub(super) syn: bool,
    pub(super) fin: bool,
    pub(super) window: u16,
    pub(super) checksum: u16,
    pub(super) urgent_pointer: u16,
    pub(super) options: Vec<TcpOption>,
    pub(super) padding: Vec<u8>,
}

impl TcpHeader {
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::MIN_HEADER_LEN)?;

        let offset_and_flags = view.read_u16_be(layout::DATA_OFFSET_AND_FLAGS_RANGE.start)?;
        let data_offset = get_bits(
            offset_and_flags,
            layout::DATA_OFFSET_MASK,
            layout::DATA_OFFSET_SHIFT,
        ) as u8;
        let header_len = usize::from(data_offset) * 4;
        if header_len < layout::MIN_HEADER_LEN {
            return Err(view.malformed(format!(
                "data offset {} is below the minimum of {}",
                data_offset,
                layout::MIN_HEADER_LEN / 4
            )));
        }
        view.require_len(header_len)?;

        let options_view = view
            .sub(layout::OPTIONS_OFFSET, header_len - layout::OPTIONS_OFFSET)?
            .within("TCP options");
        let chain = parse_length_bounded(
            &options_view,
            ChainErrorPolicy::StopAndLog,
            decode_option,
            |option| matches!(option, TcpOption::EndOfOptionList),
        )?;
        let padding = options_view
            .read_slice(chain.consumed..options_view.len())?
            .to_vec();

        Ok(Self {
            src_port: TcpPort(view.read_u16_be(layout::SRC_PORT_RANGE.start)?),
            dst_port: TcpPort(view.read_u16_be(layout::DST_PORT_RANGE.start)?),
            sequence_number: view.read_u32_be(layout::SEQUENCE_NUMBER_RANGE.start)?,
            acknowledgment_number: view.read_u32_be(layout::ACKNOWLEDGMENT_NUMBER_RANGE.start)?,
            data_offset,
            reserved: get_bits(offset_and_flags, layout::RESERVED_MASK, layout::RESERVED_SHIFT)
                as u8,
            urg: offset_and_flags & layout::URG_MASK != 0,
            ack: offset_and_flags & layout::ACK_MASK != 0,
            psh: offset_and_flags & layout::PSH_MASK != 0,
            rst: offset_and_flags & layout::RST_MASK != 0,
            syn: offset_and_flags & layout::SYN_MASK != 0,
            fin: offset_and_flags & layout::FIN_MASK != 0,
            window: view.read_u16_be(layout::WINDOW_RANGE.start)?,
            checksum: view.read_u16_be(layout::CHECKSUM_RANGE.start)?,
            urgent_pointer: view.read_u16_be(layout::URGENT_POINTER_RANGE.start)?,
            options: chain.elements,
            padding,
        })
    }

    pub fn src_port(&self) -> TcpPort {
        self.src_port
    }

    pub fn dst_port(&self) -> TcpPort {
        self.dst_port
    }

    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn acknowledgment_number(&self) -> u32 {
        self.acknowledgment_number
    }

    pub fn data_offset(&self) -> u8 {
        self.data_offset
    }

    pub fn reserved(&self) -> u8 {
        self.reserved
    }

    pub fn urg(&self) -> bool {
        self.urg
    }

    pub fn ack(&self) -> bool {
        self.ack
    }

    pub fn psh(&self) -> bool {
        self.psh
    }

    pub fn rst(&self) -> bool {
        self.rst
    }

    pub fn syn(&self) -> bool {
        self.syn
    }

    pub fn fin(&self) -> bool {
        self.fin
    }

    pub fn window(&self) -> u16 {
        self.window
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    pub fn urgent_pointer(&self) -> u16 {
        self.urgent_pointer
    }

    pub fn options(&self) -> &[TcpOption] {
        &self.options
    }

    pub fn padding(&self) -> &[u8] {
        &self.padding
    }

    pub(super) fn options_len(options: &[TcpOption]) -> usize {
        options.iter().map(Element::length).sum()
    }

    fn offset_and_flags(&self) -> u16 {
        let mut word = (u16::from(self.data_offset) << layout::DATA_OFFSET_SHIFT)
            & layout::DATA_OFFSET_MASK;
        word |= (u16::from(self.reserved) << layout::RESERVED_SHIFT) & layout::RESERVED_MASK;
        for (on, mask) in [
            (self.urg, layout::URG_MASK),
            (self.ack, layout::ACK_MASK),
            (self.psh, layout::PSH_MASK),
            (self.rst, layout::RST_MASK),
            (self.syn, layout::SYN_MASK),
            (self.fin, layout::FIN_MASK),
        ] {
            if on {
                word |= mask;
            }
        }
        word
    }
}

impl Header for TcpHeader {
    fn length(&self) -> usize {
        layout::MIN_HEADER_LEN + Self::options_len(&self.options) + self.padding.len()
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        put_u16(&mut out, self.src_port.value(), ByteOrder::BigEndian);
        put_u16(&mut out, self.dst_port.value(), ByteOrder::BigEndian);
        put_u32(&mut out, self.sequence_number, ByteOrder::BigEndian);
        put_u32(&mut out, self.acknowledgment_number, ByteOrder::BigEndian);
        put_u16(&mut out, self.offset_and_flags(), ByteOrder::BigEndian);
        put_u16(&mut out, self.window, ByteOrder::BigEndian);
        put_u16(&mut out, self.checksum, ByteOrder::BigEndian);
        put_u16(&mut out, self.urgent_pointer, ByteOrder::BigEndian);
        for option in &self.options {
            option.write_to(&mut out);
        }
        out.extend_from_slice(&self.padding);
        out
    }

    fn render(&self, indent: usize) -> String {
        let mut render = Render::new(indent, "TCP Header", self.length());
        render
            .field("Source port", self.src_port)
            .field("Destination port", self.dst_port)
            .field("Sequence Number", self.sequence_number)
            .field("Acknowledgment Number", self.acknowledgment_number)
            .field(
                "Data Offset",
                format!("{} ({} [bytes])", self.data_offset, usize::from(self.data_offset) * 4),
            )
            .field("Reserved", self.reserved)
            .field("URG", self.urg)
            .field("ACK", self.ack)
            .field("PSH", self.psh)
            .field("RST", self.rst)
            .field("SYN", self.syn)
            .field("FIN", self.fin)
            .field("Window", self.window)
            .field("Checksum", format!("0x{:04x}", self.checksum))
            .field("Urgent Pointer", self.urgent_pointer);
        for option in &self.options {
            render.field("Option", option);
        }
        render.bytes("Padding", &self.padding).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TcpPacket {
    pub(super) header: TcpHeader,
    pub(super) payload: Option<Box<dyn Packet>>,
}

impl TcpPacket {
    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        Self::decode_with(ProtocolRegistry::global(), data, offset, length)
    }

    /// The segment runs to the end of the window; TCP carries no length.
    /// The payload decoder is chosen by destination port, then source port.
    pub fn decode_with(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Self, CodecError> {
        let view = RawView::new("TCP", data, offset, length)?;
        let header = TcpHeader::parse(&view)?;
        let header_len = header.length();
        let payload_len = view.len() - header_len;

        let payload = if payload_len == 0 {
            None
        } else {
            let decoder = registry.get_pair(
                PayloadKind::TcpPort,
                u32::from(header.dst_port.value()),
                u32::from(header.src_port.value()),
            );
            Some(registry.decode_payload(
                decoder,
                data,
                view.offset() + header_len,
                payload_len,
            )?)
        };

        Ok(Self { header, payload })
    }

    pub fn decode(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        Ok(Box::new(Self::decode_with(registry, data, offset, length)?))
    }

    pub fn builder() -> TcpBuilder {
        TcpBuilder::new()
    }

    pub fn to_builder(&self) -> TcpBuilder {
        TcpBuilder::from_packet(self)
    }

    pub fn header(&self) -> &TcpHeader {
        &self.header
    }

    /// Verify the checksum against the pseudo-header of `src`/`dst`.
    ///
    /// A zero checksum means "not computed" and is accepted only when
    /// `accept_zero` is set. Mixed address families never verify.
    pub fn has_valid_checksum(&self, src: IpAddr, dst: IpAddr, accept_zero: bool) -> bool {
        if self.header.checksum == 0 {
            return accept_zero;
        }
        let payload = self.payload.as_ref().map(|p| p.raw_data()).unwrap_or_default();
        calc_pseudo_checksum(
            src,
            dst,
            IpNumber::TCP.value(),
            &self.header.raw_data(),
            &payload,
        ) == Some(0)
    }
}

impl Packet for TcpPacket {
    fn protocol(&self) -> &'static str {
        "TCP"
    }

    fn header(&self) -> Option<&dyn Header> {
        Some(&self.header)
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn header_json(&self) -> Value {
        to_json_value(&self.header)
    }

    fn clone_packet(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    const SYN: [u8; 20] = [
        0x30, 0x39, 0x00, 0x50, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x50, 0x02, 0x72,
        0x10, 0xf9, 0x45, 0x00, 0x00,
    ];

    fn addrs() -> (IpAddr, IpAddr) {
        (
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
        )
    }

    #[test]
    fn twenty_byte_segment_round_trips() {
        let packet = TcpPacket::new_packet(&SYN, 0, SYN.len()).unwrap();
        let header = packet.header();
        assert_eq!(header.src_port(), TcpPort(12345));
        assert_eq!(header.dst_port(), TcpPort::HTTP);
        assert_eq!(header.data_offset(), 5);
        assert!(header.syn());
        assert!(!header.ack());
        assert!(header.options().is_empty());
        assert_eq!(packet.length(), 20);
        assert_eq!(packet.raw_data(), SYN);
    }

    #[test]
    fn checksum_verifies_against_pseudo_header() {
        let packet = TcpPacket::new_packet(&SYN, 0, SYN.len()).unwrap();
        let (src, dst) = addrs();
        assert!(packet.has_valid_checksum(src, dst, false));
        assert!(!packet.has_valid_checksum(dst, IpAddr::V4(Ipv4Addr::LOCALHOST), false));
    }

    #[test]
    fn zero_checksum_depends_on_accept_zero() {
        let mut bytes = SYN;
        bytes[16] = 0;
        bytes[17] = 0;
        let packet = TcpPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        let (src, dst) = addrs();
        assert!(packet.has_valid_checksum(src, dst, true));
        assert!(!packet.has_valid_checksum(src, dst, false));
    }

    #[test]
    fn data_offset_beyond_window_is_too_short() {
        let mut bytes = SYN;
        bytes[12] = 0x60;
        let err = TcpPacket::new_packet(&bytes, 0, bytes.len()).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 24, actual: 20, .. }));
    }

    #[test]
    fn payload_goes_to_registered_port() {
        let mut bytes = SYN.to_vec();
        bytes.extend_from_slice(b"hi");
        let registry = ProtocolRegistry::builder().build();
        let packet = TcpPacket::decode_with(&registry, &bytes, 0, bytes.len()).unwrap();
        let payload = Packet::payload(&packet).unwrap();
        assert_eq!(payload.protocol(), "Unknown");
        assert_eq!(payload.raw_data(), b"hi");
    }

    #[test]
    fn options_parse_with_nop_alignment() {
        let mut bytes = SYN.to_vec();
        bytes[12] = 0x70;
        bytes.extend_from_slice(&[2, 4, 0x05, 0xb4, 1, 3, 3, 7]);
        let packet = TcpPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(
            packet.header().options(),
            [
                TcpOption::MaximumSegmentSize(1460),
                TcpOption::NoOperation,
                TcpOption::WindowScale(7)
            ]
        );
        assert!(packet.header().padding().is_empty());
        assert_eq!(packet.raw_data(), bytes);
    }
}
