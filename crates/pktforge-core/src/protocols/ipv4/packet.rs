use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;
use serde_json::Value;

use crate::codec::chain::{ChainErrorPolicy, Element, parse_length_bounded};
use crate::codec::packet::{Render, to_json_value};
use crate::codec::bits::put_u16;
use crate::codec::{
    ByteOrder, CodecError, Header, Packet, PayloadKind, ProtocolRegistry, RawView, UnknownPacket,
    calc_checksum, get_bits,
};
use crate::protocols::numbers::IpNumber;

use super::builder::IpV4Builder;
use super::layout;
use super::option::{IpV4Option, decode_option};

/// Type of Service octet (RFC 791 / RFC 2474 / RFC 3168 views).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IpV4Tos(pub u8);

impl IpV4Tos {
    pub fn value(self) -> u8 {
        self.0
    }

    /// RFC 791 precedence, the top three bits.
    pub fn precedence(self) -> u8 {
        get_bits(self.0, 0xe0, 5)
    }

    pub fn dscp(self) -> u8 {
        get_bits(self.0, 0xfc, 2)
    }

    pub fn ecn(self) -> u8 {
        get_bits(self.0, 0x03, 0)
    }
}

impl fmt::Display for IpV4Tos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02x} (precedence: {}, dscp: {}, ecn: {})",
            self.0,
            self.precedence(),
            self.dscp(),
            self.ecn()
        )
    }
}

/// IPv4 header, fixed part plus options and padding.
///
/// Fields are kept exactly as decoded (or as set on the builder), so a
/// header whose IHL disagrees with its options still re-encodes byte for
/// byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IpV4Header {
    pub(super) version: u8,
    pub(super) ihl: u8,
    pub(super) tos: IpV4Tos,
    pub(super) total_length: u16,
    pub(super) identification: u16,
    pub(super) reserved_flag: bool,
    pub(super) dont_fragment: bool,
    pub(super) more_fragment: bool,
    pub(super) fragment_offset: u16,
    pub(super) ttl: u8,
    pub(super) protocol: IpNumber,
    pub(super) header_checksum: u16,
    pub(super) src_addr: Ipv4Addr,
    pub(super) dst_addr: Ipv4Addr,
    pub(super) options: Vec<IpV4Option>,
    pub(super) padding: Vec<u8>,
}

impl IpV4Header {
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::MIN_HEADER_LEN)?;

        let version_and_ihl = view.read_u8(layout::VERSION_AND_IHL_OFFSET)?;
        let version = get_bits(version_and_ihl, layout::VERSION_MASK, layout::VERSION_SHIFT);
        let ihl = get_bits(version_and_ihl, layout::IHL_MASK, 0);
        let header_len = usize::from(ihl) * 4;
        if header_len < layout::MIN_HEADER_LEN {
            return Err(view.malformed(format!(
                "IHL {} is below the minimum of {}",
                ihl,
                layout::MIN_HEADER_LEN / 4
            )));
        }
        view.require_len(header_len)?;

        let flags_and_offset = view.read_u16_be(layout::FLAGS_AND_FRAGMENT_OFFSET_RANGE.start)?;
        let [a, b, c, d] = view.read_array::<4>(layout::SRC_ADDR_RANGE.start)?;
        let src_addr = Ipv4Addr::new(a, b, c, d);
        let [a, b, c, d] = view.read_array::<4>(layout::DST_ADDR_RANGE.start)?;
        let dst_addr = Ipv4Addr::new(a, b, c, d);

        let options_view = view
            .sub(layout::OPTIONS_OFFSET, header_len - layout::OPTIONS_OFFSET)?
            .within("IPv4 options");
        let chain = parse_length_bounded(
            &options_view,
            ChainErrorPolicy::StopAndLog,
            decode_option,
            |option| matches!(option, IpV4Option::EndOfOptionList),
        )?;
        let padding = options_view
            .read_slice(chain.consumed..options_view.len())?
            .to_vec();

        Ok(Self {
            version,
            ihl,
            tos: IpV4Tos(view.read_u8(layout::TOS_OFFSET)?),
            total_length: view.read_u16_be(layout::TOTAL_LENGTH_RANGE.start)?,
            identification: view.read_u16_be(layout::IDENTIFICATION_RANGE.start)?,
            reserved_flag: flags_and_offset & layout::RESERVED_FLAG_MASK != 0,
            dont_fragment: flags_and_offset & layout::DONT_FRAGMENT_MASK != 0,
            more_fragment: flags_and_offset & layout::MORE_FRAGMENT_MASK != 0,
            fragment_offset: get_bits(flags_and_offset, layout::FRAGMENT_OFFSET_MASK, 0),
            ttl: view.read_u8(layout::TTL_OFFSET)?,
            protocol: IpNumber(view.read_u8(layout::PROTOCOL_OFFSET)?),
            header_checksum: view.read_u16_be(layout::HEADER_CHECKSUM_RANGE.start)?,
            src_addr,
            dst_addr,
            options: chain.elements,
            padding,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn ihl(&self) -> u8 {
        self.ihl
    }

    pub fn tos(&self) -> IpV4Tos {
        self.tos
    }

    pub fn total_length(&self) -> u16 {
        self.total_length
    }

    pub fn identification(&self) -> u16 {
        self.identification
    }

    pub fn reserved_flag(&self) -> bool {
        self.reserved_flag
    }

    pub fn dont_fragment(&self) -> bool {
        self.dont_fragment
    }

    pub fn more_fragment(&self) -> bool {
        self.more_fragment
    }

    pub fn fragment_offset(&self) -> u16 {
        self.fragment_offset
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    pub fn protocol(&self) -> IpNumber {
        self.protocol
    }

    pub fn header_checksum(&self) -> u16 {
        self.header_checksum
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        self.src_addr
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        self.dst_addr
    }

    pub fn options(&self) -> &[IpV4Option] {
        &self.options
    }

    pub fn padding(&self) -> &[u8] {
        &self.padding
    }

    /// Whether the datagram is a fragment (MF set or non-zero offset).
    pub fn is_fragment(&self) -> bool {
        self.more_fragment || self.fragment_offset != 0
    }

    /// Verify the header checksum. A zero checksum is accepted only when
    /// `accept_zero` is set.
    pub fn has_valid_header_checksum(&self, accept_zero: bool) -> bool {
        if self.header_checksum == 0 {
            return accept_zero;
        }
        calc_checksum(&self.raw_data()) == 0
    }

    pub(super) fn options_len(options: &[IpV4Option]) -> usize {
        options.iter().map(Element::length).sum()
    }

    fn flags_and_offset(&self) -> u16 {
        let mut word = self.fragment_offset & layout::FRAGMENT_OFFSET_MASK;
        if self.reserved_flag {
            word |= layout::RESERVED_FLAG_MASK;
        }
        if self.dont_fragment {
            word |= layout::DONT_FRAGMENT_MASK;
        }
        if self.more_fragment {
            word |= layout::MORE_FRAGMENT_MASK;
        }
        word
    }
}

impl Header for IpV4Header {
    fn length(&self) -> usize {
        layout::MIN_HEADER_LEN + Self::options_len(&self.options) + self.padding.len()
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        out.push((self.version << layout::VERSION_SHIFT) | (self.ihl & layout::IHL_MASK));
        out.push(self.tos.value());
        put_u16(&mut out, self.total_length, ByteOrder::BigEndian);
        put_u16(&mut out, self.identification, ByteOrder::BigEndian);
        put_u16(&mut out, self.flags_and_offset(), ByteOrder::BigEndian);
        out.push(self.ttl);
        out.push(self.protocol.value());
        put_u16(&mut out, self.header_checksum, ByteOrder::BigEndian);
        out.extend_from_slice(&self.src_addr.octets());
        out.extend_from_slice(&self.dst_addr.octets());
        for option in &self.options {
            option.write_to(&mut out);
        }
        out.extend_from_slice(&self.padding);
        out
    }

    fn render(&self, indent: usize) -> String {
        let mut render = Render::new(indent, "IPv4 Header", self.length());
        render
            .field("Version", self.version)
            .field(
                "IHL",
                format!("{} ({} [bytes])", self.ihl, usize::from(self.ihl) * 4),
            )
            .field("TOS", self.tos)
            .field("Total length", format!("{} [bytes]", self.total_length))
            .field("Identification", self.identification)
            .field(
                "Flags (Reserved, Don't Fragment, More Fragment)",
                format!(
                    "({}, {}, {})",
                    self.reserved_flag, self.dont_fragment, self.more_fragment
                ),
            )
            .field(
                "Fragment offset",
                format!(
                    "{} ({} [bytes])",
                    self.fragment_offset,
                    u32::from(self.fragment_offset) * 8
                ),
            )
            .field("TTL", self.ttl)
            .field("Protocol", self.protocol)
            .field("Header checksum", format!("0x{:04x}", self.header_checksum))
            .field("Source address", self.src_addr)
            .field("Destination address", self.dst_addr);
        for option in &self.options {
            render.field("Option", option);
        }
        render.bytes("Padding", &self.padding).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IpV4Packet {
    pub(super) header: IpV4Header,
    pub(super) payload: Option<Box<dyn Packet>>,
}

impl IpV4Packet {
    /// Decode `data[offset..offset + length]`, dispatching the payload
    /// through the global registry.
    ///
    /// # Examples
    /// ```
    /// use pktforge_core::codec::Packet;
    /// use pktforge_core::protocols::ipv4::IpV4Packet;
    ///
    /// let bytes = [
    ///     0x45, 0x00, 0x00, 0x14, 0x00, 0x01, 0x00, 0x00, 0x40, 0xfd, 0x00, 0x00,
    ///     10, 0, 0, 1, 10, 0, 0, 2,
    /// ];
    /// let packet = IpV4Packet::new_packet(&bytes, 0, bytes.len())?;
    /// assert_eq!(packet.header().ttl(), 64);
    /// assert!(packet.payload().is_none());
    /// assert_eq!(packet.raw_data(), bytes);
    /// # Ok::<(), pktforge_core::codec::CodecError>(())
    /// ```
    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        Self::decode_with(ProtocolRegistry::global(), data, offset, length)
    }

    pub fn decode_with(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Self, CodecError> {
        let view = RawView::new("IPv4", data, offset, length)?;
        let header = IpV4Header::parse(&view)?;
        let header_len = header.length();
        let available = view.len() - header_len;

        // total_length 0 is left by TCP segmentation offload; use the window.
        let payload_len = if header.total_length == 0 {
            available
        } else {
            let total = usize::from(header.total_length);
            if total < header_len {
                return Err(view.malformed(format!(
                    "total length {} is less than header length {}",
                    total, header_len
                )));
            }
            (total - header_len).min(available)
        };

        let payload: Option<Box<dyn Packet>> = if payload_len == 0 {
            None
        } else if header.is_fragment() {
            Some(Box::new(UnknownPacket::new_packet(
                data,
                view.offset() + header_len,
                payload_len,
            )?))
        } else {
            Some(registry.decode(
                PayloadKind::IpNumber,
                u32::from(header.protocol.value()),
                data,
                view.offset() + header_len,
                payload_len,
            )?)
        };

        Ok(Self { header, payload })
    }

    /// `PacketDecoder` entry for registry dispatch.
    pub fn decode(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        Ok(Box::new(Self::decode_with(registry, data, offset, length)?))
    }

    pub fn builder() -> IpV4Builder {
        IpV4Builder::new()
    }

    /// Builder pre-filled with this packet's fields and payload.
    pub fn to_builder(&self) -> IpV4Builder {
        IpV4Builder::from_packet(self)
    }

    pub fn header(&self) -> &IpV4Header {
        &self.header
    }
}

impl Packet for IpV4Packet {
    fn protocol(&self) -> &'static str {
        "IPv4"
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
    use super::*;

    const UDP_IN_IPV4: [u8; 28] = [
        0x45, 0x00, 0x00, 0x1c, 0x00, 0x01, 0x40, 0x00, 0x40, 0x11, 0xb9, 0x7c, 0xc0, 0xa8, 0x00,
        0x01, 0xc0, 0xa8, 0x00, 0x02, 0x04, 0xd2, 0x27, 0x0f, 0x00, 0x08, 0x00, 0x00,
    ];

    fn opaque_registry() -> ProtocolRegistry {
        ProtocolRegistry::builder().build()
    }

    #[test]
    fn decodes_fixed_header() {
        let packet = IpV4Packet::decode_with(&opaque_registry(), &UDP_IN_IPV4, 0, 28).unwrap();
        let header = packet.header();
        assert_eq!(header.version(), 4);
        assert_eq!(header.ihl(), 5);
        assert_eq!(header.total_length(), 28);
        assert!(header.dont_fragment());
        assert!(!header.is_fragment());
        assert_eq!(header.protocol(), IpNumber::UDP);
        assert_eq!(header.src_addr(), Ipv4Addr::new(192, 168, 0, 1));
        assert!(header.has_valid_header_checksum(false));
        assert_eq!(Packet::payload(&packet).unwrap().length(), 8);
        assert_eq!(packet.raw_data(), UDP_IN_IPV4);
    }

    #[test]
    fn truncated_header_is_too_short() {
        for len in 0..layout::MIN_HEADER_LEN {
            let err = IpV4Packet::decode_with(&opaque_registry(), &UDP_IN_IPV4, 0, len).unwrap_err();
            assert!(matches!(err, CodecError::TooShort { needed: 20, .. }));
        }
    }

    #[test]
    fn ihl_below_five_is_malformed() {
        let mut bytes = UDP_IN_IPV4;
        bytes[0] = 0x44;
        let err = IpV4Packet::decode_with(&opaque_registry(), &bytes, 0, 28).unwrap_err();
        assert!(err.to_string().contains("IHL 4"));
    }

    #[test]
    fn zero_total_length_uses_window() {
        let mut bytes = UDP_IN_IPV4;
        bytes[2] = 0;
        bytes[3] = 0;
        let packet = IpV4Packet::decode_with(&opaque_registry(), &bytes, 0, 28).unwrap();
        assert_eq!(Packet::payload(&packet).unwrap().length(), 8);
    }

    #[test]
    fn total_length_is_clamped_to_window() {
        let mut bytes = UDP_IN_IPV4;
        bytes[3] = 0xff;
        let packet = IpV4Packet::decode_with(&opaque_registry(), &bytes, 0, 28).unwrap();
        assert_eq!(packet.length(), 28);
    }

    #[test]
    fn total_length_below_header_is_malformed() {
        let mut bytes = UDP_IN_IPV4;
        bytes[3] = 0x10;
        let err = IpV4Packet::decode_with(&opaque_registry(), &bytes, 0, 28).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn fragment_payload_stays_opaque() {
        let mut bytes = UDP_IN_IPV4;
        bytes[6] = 0x20;
        let packet = IpV4Packet::new_packet(&bytes, 0, 28).unwrap();
        assert_eq!(Packet::payload(&packet).unwrap().protocol(), "Unknown");
    }

    #[test]
    fn options_and_padding_round_trip() {
        let mut bytes = UDP_IN_IPV4[..20].to_vec();
        bytes[0] = 0x47;
        bytes[3] = 28;
        // NOP, Router Alert, EOL, then two bytes of padding.
        bytes.extend_from_slice(&[1, 148, 4, 0, 0, 0, 0, 0]);
        let packet = IpV4Packet::decode_with(&opaque_registry(), &bytes, 0, bytes.len()).unwrap();
        let header = packet.header();
        assert_eq!(
            header.options(),
            [
                IpV4Option::NoOperation,
                IpV4Option::RouterAlert(0),
                IpV4Option::EndOfOptionList
            ]
        );
        assert_eq!(header.padding(), [0, 0]);
        assert_eq!(header.length(), 28);
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn bad_trailing_option_becomes_padding() {
        let mut bytes = UDP_IN_IPV4[..20].to_vec();
        bytes[0] = 0x46;
        bytes[3] = 24;
        bytes.extend_from_slice(&[1, 7, 9, 0]);
        let packet = IpV4Packet::decode_with(&opaque_registry(), &bytes, 0, bytes.len()).unwrap();
        assert_eq!(packet.header().options(), [IpV4Option::NoOperation]);
        assert_eq!(packet.header().padding(), [7, 9, 0]);
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn decode_respects_offset() {
        let mut buffer = vec![0xaa; 3];
        buffer.extend_from_slice(&UDP_IN_IPV4);
        let packet = IpV4Packet::decode_with(&opaque_registry(), &buffer, 3, 28).unwrap();
        assert_eq!(packet.raw_data(), UDP_IN_IPV4);
    }

    #[test]
    fn tos_views() {
        let tos = IpV4Tos(0xb9);
        assert_eq!(tos.precedence(), 5);
        assert_eq!(tos.dscp(), 46);
        assert_eq!(tos.ecn(), 1);
    }
}
