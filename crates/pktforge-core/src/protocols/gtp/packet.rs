use serde::Serialize;
use serde_json::Value;

use crate::codec::bits::{put_u16, put_u32};
use crate::codec::chain::{Element, parse_linked};
use crate::codec::packet::{Render, to_json_value};
use crate::codec::{
    ByteOrder, CodecError, Header, Packet, PayloadKind, ProtocolRegistry, RawView, UnknownPacket,
    get_bits,
};
use crate::protocols::ipv4::IpV4Packet;
use crate::protocols::numbers::{GtpV1ExtensionHeaderType, GtpV1MessageType};

use super::builder::GtpV1Builder;
use super::extension::{GtpExtensionHeader, decode_extension};
use super::layout;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GtpV1Header {
    pub(super) version: u8,
    pub(super) protocol_type: bool,
    pub(super) reserved: bool,
    pub(super) extension_header_flag: bool,
    pub(super) sequence_number_flag: bool,
    pub(super) n_pdu_number_flag: bool,
    pub(super) message_type: GtpV1MessageType,
    pub(super) length: u16,
    pub(super) teid: u32,
    /// The next three are present together, iff any of E, S or PN is set.
    pub(super) sequence_number: Option<u16>,
    pub(super) n_pdu_number: Option<u8>,
    pub(super) next_extension_header_type: Option<GtpV1ExtensionHeaderType>,
    pub(super) extension_headers: Vec<GtpExtensionHeader>,
}

impl GtpV1Header {
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::MANDATORY_LEN)?;
        let flags = view.read_u8(layout::FLAGS_OFFSET)?;
        let extension_header_flag = flags & layout::EXTENSION_FLAG_MASK != 0;
        let sequence_number_flag = flags & layout::SEQUENCE_FLAG_MASK != 0;
        let n_pdu_number_flag = flags & layout::N_PDU_FLAG_MASK != 0;

        let mut header = Self {
            version: get_bits(flags, layout::VERSION_MASK, layout::VERSION_SHIFT),
            protocol_type: flags & layout::PROTOCOL_TYPE_MASK != 0,
            reserved: flags & layout::RESERVED_MASK != 0,
            extension_header_flag,
            sequence_number_flag,
            n_pdu_number_flag,
            message_type: GtpV1MessageType(view.read_u8(layout::MESSAGE_TYPE_OFFSET)?),
            length: view.read_u16_be(layout::LENGTH_RANGE.start)?,
            teid: view.read_u32_be(layout::TEID_RANGE.start)?,
            sequence_number: None,
            n_pdu_number: None,
            next_extension_header_type: None,
            extension_headers: Vec::new(),
        };
        if !(extension_header_flag || sequence_number_flag || n_pdu_number_flag) {
            return Ok(header);
        }

        view.require_len(layout::MANDATORY_LEN + layout::OPTIONAL_FIELDS_LEN)?;
        let next = view.read_u8(layout::NEXT_EXTENSION_TYPE_OFFSET)?;
        header.sequence_number = Some(view.read_u16_be(layout::SEQUENCE_NUMBER_RANGE.start)?);
        header.n_pdu_number = Some(view.read_u8(layout::N_PDU_NUMBER_OFFSET)?);
        header.next_extension_header_type = Some(GtpV1ExtensionHeaderType(next));

        // The next-type octet is only meaningful with the E flag.
        if extension_header_flag {
            let extensions = view
                .tail(layout::MANDATORY_LEN + layout::OPTIONAL_FIELDS_LEN)?
                .within("GTP-U extension header");
            let chain = parse_linked(
                &extensions,
                next,
                GtpV1ExtensionHeaderType::NO_MORE_EXTENSION_HEADERS.value(),
                decode_extension,
                |ext| ext.next_extension_type().value(),
            )?;
            header.extension_headers = chain.elements;
        }
        Ok(header)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// `true` for GTP, `false` for GTP'.
    pub fn protocol_type(&self) -> bool {
        self.protocol_type
    }

    pub fn reserved(&self) -> bool {
        self.reserved
    }

    pub fn extension_header_flag(&self) -> bool {
        self.extension_header_flag
    }

    pub fn sequence_number_flag(&self) -> bool {
        self.sequence_number_flag
    }

    pub fn n_pdu_number_flag(&self) -> bool {
        self.n_pdu_number_flag
    }

    pub fn message_type(&self) -> GtpV1MessageType {
        self.message_type
    }

    /// Bytes after the mandatory eight-octet part.
    pub fn length_field(&self) -> u16 {
        self.length
    }

    pub fn teid(&self) -> u32 {
        self.teid
    }

    pub fn sequence_number(&self) -> Option<u16> {
        self.sequence_number
    }

    pub fn n_pdu_number(&self) -> Option<u8> {
        self.n_pdu_number
    }

    pub fn next_extension_header_type(&self) -> Option<GtpV1ExtensionHeaderType> {
        self.next_extension_header_type
    }

    pub fn extension_headers(&self) -> &[GtpExtensionHeader] {
        &self.extension_headers
    }

    fn flags(&self) -> u8 {
        let mut flags = (self.version << layout::VERSION_SHIFT) & layout::VERSION_MASK;
        for (on, mask) in [
            (self.protocol_type, layout::PROTOCOL_TYPE_MASK),
            (self.reserved, layout::RESERVED_MASK),
            (self.extension_header_flag, layout::EXTENSION_FLAG_MASK),
            (self.sequence_number_flag, layout::SEQUENCE_FLAG_MASK),
            (self.n_pdu_number_flag, layout::N_PDU_FLAG_MASK),
        ] {
            if on {
                flags |= mask;
            }
        }
        flags
    }

    fn has_optional_fields(&self) -> bool {
        self.sequence_number.is_some()
    }
}

impl Header for GtpV1Header {
    fn length(&self) -> usize {
        let optional = if self.has_optional_fields() {
            layout::OPTIONAL_FIELDS_LEN
        } else {
            0
        };
        layout::MANDATORY_LEN
            + optional
            + self
                .extension_headers
                .iter()
                .map(Element::length)
                .sum::<usize>()
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        out.push(self.flags());
        out.push(self.message_type.value());
        put_u16(&mut out, self.length, ByteOrder::BigEndian);
        put_u32(&mut out, self.teid, ByteOrder::BigEndian);
        if self.has_optional_fields() {
            put_u16(
                &mut out,
                self.sequence_number.unwrap_or_default(),
                ByteOrder::BigEndian,
            );
            out.push(self.n_pdu_number.unwrap_or_default());
            out.push(self.next_extension_header_type.unwrap_or_default().value());
        }
        for extension in &self.extension_headers {
            extension.write_to(&mut out);
        }
        out
    }

    fn render(&self, indent: usize) -> String {
        let mut render = Render::new(indent, "GTPv1 Header", self.length());
        render
            .field("Version", self.version)
            .field("Protocol type", if self.protocol_type { "GTP" } else { "GTP'" })
            .field("Reserved", self.reserved)
            .field("Extension header flag", self.extension_header_flag)
            .field("Sequence number flag", self.sequence_number_flag)
            .field("N-PDU number flag", self.n_pdu_number_flag)
            .field("Message type", self.message_type)
            .field("Length", format!("{} [bytes]", self.length))
            .field("TEID", format!("0x{:08x}", self.teid))
            .opt_field("Sequence number", self.sequence_number)
            .opt_field("N-PDU number", self.n_pdu_number)
            .opt_field("Next extension header type", self.next_extension_header_type);
        for extension in &self.extension_headers {
            render.field("Extension header", extension);
        }
        render.finish()
    }
}

/// GTPv1-U packet.
///
/// A decoded G-PDU exposes its T-PDU as a payload: IPv4 when the first
/// nibble is 4, opaque bytes otherwise. Other message types keep their
/// information elements as opaque payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GtpV1Packet {
    pub(super) header: GtpV1Header,
    pub(super) payload: Option<Box<dyn Packet>>,
}

impl GtpV1Packet {
    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        Self::decode_with(ProtocolRegistry::global(), data, offset, length)
    }

    pub fn decode_with(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Self, CodecError> {
        let view = RawView::new("GTP-U", data, offset, length)?;
        let header = GtpV1Header::parse(&view)?;
        let header_len = header.length();
        let declared = layout::MANDATORY_LEN + usize::from(header.length);
        if declared < header_len {
            return Err(view.malformed(format!(
                "length field {} does not cover the {} header bytes after the mandatory part",
                header.length,
                header_len - layout::MANDATORY_LEN
            )));
        }
        let payload_len = (declared - header_len).min(view.len() - header_len);

        let payload = if payload_len == 0 {
            None
        } else {
            let decoder = registry.get(
                PayloadKind::GtpMessageType,
                u32::from(header.message_type.value()),
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

    /// T-PDU of a G-PDU: IPv4 by its version nibble, anything else opaque.
    pub fn decode_t_pdu(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        let view = RawView::new("GTP-U T-PDU", data, offset, length)?;
        match view.read_u8(0).map(|b| b >> 4) {
            Ok(layout::IPV4_VERSION) => IpV4Packet::decode(registry, data, offset, length),
            _ => UnknownPacket::decode(registry, data, offset, length),
        }
    }

    pub fn builder() -> GtpV1Builder {
        GtpV1Builder::new()
    }

    pub fn to_builder(&self) -> GtpV1Builder {
        GtpV1Builder::from_packet(self)
    }

    pub fn header(&self) -> &GtpV1Header {
        &self.header
    }
}

impl Packet for GtpV1Packet {
    fn protocol(&self) -> &'static str {
        "GTP-U"
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
    use crate::protocols::gtp::{GtpExtensionContent, NrUFrame};

    const INNER_IPV4: [u8; 28] = [
        0x45, 0x00, 0x00, 0x1c, 0x00, 0x01, 0x40, 0x00, 0x40, 0x11, 0xb9, 0x7c, 0xc0, 0xa8, 0x00,
        0x01, 0xc0, 0xa8, 0x00, 0x02, 0x04, 0xd2, 0x27, 0x0f, 0x00, 0x08, 0x00, 0x00,
    ];

    fn g_pdu(header: &[u8]) -> Vec<u8> {
        let mut bytes = header.to_vec();
        bytes.extend_from_slice(&INNER_IPV4);
        bytes
    }

    #[test]
    fn minimal_g_pdu_carries_ipv4() {
        let bytes = g_pdu(&[0x30, 0xff, 0x00, 0x1c, 0x00, 0x00, 0x00, 0x2a]);
        let packet = GtpV1Packet::new_packet(&bytes, 0, bytes.len()).unwrap();
        let header = packet.header();
        assert_eq!(header.version(), 1);
        assert!(header.protocol_type());
        assert_eq!(header.message_type(), GtpV1MessageType::G_PDU);
        assert_eq!(header.teid(), 42);
        assert_eq!(header.sequence_number(), None);
        assert_eq!(Packet::payload(&packet).map(|p| p.protocol()), Some("IPv4"));
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn nr_ran_container_chain() {
        let header = [
            0x34, 0xff, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x01, // E flag, length 44
            0x00, 0x00, 0x00, 0x84, // seq, N-PDU, next: NR RAN container
            0x02, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x85, // DL USER DATA, SN 5
            0x01, 0x00, 0x09, 0x00, // PDU session container, QFI 9
        ];
        let bytes = g_pdu(&header);
        let packet = GtpV1Packet::new_packet(&bytes, 0, bytes.len()).unwrap();
        let extensions = packet.header().extension_headers();
        assert_eq!(extensions.len(), 2);
        let GtpExtensionContent::NrRanContainer(NrUFrame::DlUserData(frame)) =
            extensions[0].content()
        else {
            panic!("unexpected extension {:?}", extensions[0]);
        };
        assert_eq!(frame.nr_u_sequence_number, 5);
        assert!(!frame.dl_flush());
        assert_eq!(extensions[0].padding(), [0]);
        assert_eq!(Header::length(packet.header()), 24);
        assert_eq!(Packet::payload(&packet).map(|p| p.length()), Some(28));
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn echo_request_payload_is_opaque() {
        let bytes = [
            0x32, 0x01, 0x00, 0x06, 0x00, 0x00, 0x00, 0x00, 0x12, 0x34, 0x00, 0x00, 0x0e, 0x00,
        ];
        let packet = GtpV1Packet::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(packet.header().sequence_number(), Some(0x1234));
        assert!(packet.header().extension_headers().is_empty());
        assert_eq!(Packet::payload(&packet).map(|p| p.protocol()), Some("Unknown"));
    }

    #[test]
    fn non_ip_t_pdu_is_opaque() {
        let bytes = [0x30, 0xff, 0x00, 0x02, 0x00, 0x00, 0x00, 0x01, 0x60, 0x00];
        let packet = GtpV1Packet::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(Packet::payload(&packet).map(|p| p.protocol()), Some("Unknown"));
    }

    #[test]
    fn length_shorter_than_header_is_malformed() {
        let bytes = [0x32, 0xff, 0x00, 0x02, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = GtpV1Packet::new_packet(&bytes, 0, bytes.len()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn truncated_optional_fields_are_too_short() {
        let bytes = [0x32, 0xff, 0x00, 0x04, 0, 0, 0, 0, 0, 0];
        let err = GtpV1Packet::new_packet(&bytes, 0, bytes.len()).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 12, actual: 10, .. }));
    }
}
