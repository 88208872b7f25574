use crate::codec::builder::{build_payload, length_field, require};
use crate::codec::{BuildError, BuildPolicy, Header, Packet, PacketBuilder, check_width};
use crate::protocols::numbers::{GtpV1ExtensionHeaderType, GtpV1MessageType};

use super::extension::GtpExtensionHeader;
use super::layout;
use super::packet::{GtpV1Header, GtpV1Packet};

const PROTOCOL: &str = "GTP-U";

/// Staging object for a [`GtpV1Packet`].
///
/// `message_type` is required. Version defaults to 1 and the protocol type
/// to GTP. The optional sequence number / N-PDU number / next type block is
/// written iff one of the E, S or PN flags is set; unset values are zero.
///
/// With `correct_length_at_build`, the length field, every extension length
/// byte and the next-type links are recomputed and the E flag follows the
/// extension list. With `padding_at_build`, extension contents are zero
/// padded to the 4-octet rule.
pub struct GtpV1Builder {
    version: u8,
    protocol_type: bool,
    reserved: bool,
    extension_header_flag: bool,
    sequence_number_flag: bool,
    n_pdu_number_flag: bool,
    message_type: Option<GtpV1MessageType>,
    length: u16,
    teid: u32,
    sequence_number: Option<u16>,
    n_pdu_number: Option<u8>,
    next_extension_header_type: Option<GtpV1ExtensionHeaderType>,
    extension_headers: Vec<GtpExtensionHeader>,
    payload: Option<Box<dyn PacketBuilder>>,
    policy: BuildPolicy,
}

impl Default for GtpV1Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl GtpV1Builder {
    pub fn new() -> Self {
        Self {
            version: 1,
            protocol_type: true,
            reserved: false,
            extension_header_flag: false,
            sequence_number_flag: false,
            n_pdu_number_flag: false,
            message_type: None,
            length: 0,
            teid: 0,
            sequence_number: None,
            n_pdu_number: None,
            next_extension_header_type: None,
            extension_headers: Vec::new(),
            payload: None,
            policy: BuildPolicy::default(),
        }
    }

    pub(super) fn from_packet(packet: &GtpV1Packet) -> Self {
        let h = &packet.header;
        Self {
            version: h.version,
            protocol_type: h.protocol_type,
            reserved: h.reserved,
            extension_header_flag: h.extension_header_flag,
            sequence_number_flag: h.sequence_number_flag,
            n_pdu_number_flag: h.n_pdu_number_flag,
            message_type: Some(h.message_type),
            length: h.length,
            teid: h.teid,
            sequence_number: h.sequence_number,
            n_pdu_number: h.n_pdu_number,
            next_extension_header_type: h.next_extension_header_type,
            extension_headers: h.extension_headers.clone(),
            payload: packet
                .payload
                .clone()
                .map(|payload| Box::new(payload) as Box<dyn PacketBuilder>),
            policy: BuildPolicy::default(),
        }
    }

    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn protocol_type(mut self, gtp: bool) -> Self {
        self.protocol_type = gtp;
        self
    }

    pub fn reserved(mut self, on: bool) -> Self {
        self.reserved = on;
        self
    }

    pub fn extension_header_flag(mut self, on: bool) -> Self {
        self.extension_header_flag = on;
        self
    }

    pub fn sequence_number_flag(mut self, on: bool) -> Self {
        self.sequence_number_flag = on;
        self
    }

    pub fn n_pdu_number_flag(mut self, on: bool) -> Self {
        self.n_pdu_number_flag = on;
        self
    }

    pub fn message_type(mut self, message_type: GtpV1MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    pub fn length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }

    pub fn teid(mut self, teid: u32) -> Self {
        self.teid = teid;
        self
    }

    pub fn sequence_number(mut self, sequence_number: u16) -> Self {
        self.sequence_number = Some(sequence_number);
        self
    }

    pub fn n_pdu_number(mut self, n_pdu_number: u8) -> Self {
        self.n_pdu_number = Some(n_pdu_number);
        self
    }

    pub fn next_extension_header_type(mut self, next: GtpV1ExtensionHeaderType) -> Self {
        self.next_extension_header_type = Some(next);
        self
    }

    pub fn extension_header(mut self, extension: GtpExtensionHeader) -> Self {
        self.extension_headers.push(extension);
        self
    }

    pub fn extension_headers(mut self, extensions: Vec<GtpExtensionHeader>) -> Self {
        self.extension_headers = extensions;
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

    pub fn padding_at_build(mut self, on: bool) -> Self {
        self.policy.padding_at_build = on;
        self
    }

    pub fn policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<GtpV1Packet, BuildError> {
        let message_type = require(self.message_type, PROTOCOL, "message_type")?;
        check_width(
            PROTOCOL,
            "version",
            u64::from(self.version),
            layout::VERSION_BITS,
        )?;
        for extension in &self.extension_headers {
            extension.validate()?;
        }

        let (payload, payload_bytes) = build_payload(self.payload)?;

        let mut extensions = self.extension_headers;
        if self.policy.padding_at_build {
            extensions.iter_mut().for_each(GtpExtensionHeader::pad_to_unit);
        }
        let mut extension_header_flag = self.extension_header_flag;
        let mut next_extension_header_type = self.next_extension_header_type;
        if self.policy.correct_length_at_build {
            let types: Vec<_> = extensions.iter().map(|e| e.extension_type()).collect();
            let end = GtpV1ExtensionHeaderType::NO_MORE_EXTENSION_HEADERS;
            for (index, extension) in extensions.iter_mut().enumerate() {
                extension.set_next_extension_type(types.get(index + 1).copied().unwrap_or(end));
                extension.correct_length()?;
            }
            extension_header_flag = !extensions.is_empty();
            next_extension_header_type = Some(types.first().copied().unwrap_or(end));
        }

        let has_optional_fields =
            extension_header_flag || self.sequence_number_flag || self.n_pdu_number_flag;
        if !has_optional_fields && !extensions.is_empty() {
            return Err(BuildError::invalid(
                PROTOCOL,
                "extension headers need the E, S or PN flag",
            ));
        }
        let mut header = GtpV1Header {
            version: self.version,
            protocol_type: self.protocol_type,
            reserved: self.reserved,
            extension_header_flag,
            sequence_number_flag: self.sequence_number_flag,
            n_pdu_number_flag: self.n_pdu_number_flag,
            message_type,
            length: self.length,
            teid: self.teid,
            sequence_number: has_optional_fields.then(|| self.sequence_number.unwrap_or(0)),
            n_pdu_number: has_optional_fields.then(|| self.n_pdu_number.unwrap_or(0)),
            next_extension_header_type: has_optional_fields
                .then(|| next_extension_header_type.unwrap_or_default()),
            extension_headers: extensions,
        };

        if self.policy.correct_length_at_build {
            let total = header.length() - layout::MANDATORY_LEN + payload_bytes.len();
            header.length = length_field(PROTOCOL, "length", total, layout::LENGTH_BITS)? as u16;
        }

        Ok(GtpV1Packet { header, payload })
    }
}

impl PacketBuilder for GtpV1Builder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::UnknownPacket;
    use crate::protocols::gtp::{DlUserData, GtpExtensionContent, NrUFrame};

    #[test]
    fn corrects_length_and_links_extensions() {
        let nr_u = GtpExtensionHeader::new(GtpExtensionContent::NrRanContainer(
            NrUFrame::DlUserData(DlUserData {
                nr_u_sequence_number: 5,
                dl_discard_nr_pdcp_pdu_sn: Some(3),
                ..DlUserData::default()
            }),
        ));
        let udp_port = GtpExtensionHeader::new(GtpExtensionContent::UdpPort(2152));
        let packet = GtpV1Builder::new()
            .message_type(GtpV1MessageType::G_PDU)
            .teid(0x01020304)
            .extension_header(nr_u)
            .extension_header(udp_port)
            .payload(UnknownPacket::builder(vec![0x60, 0, 0, 0]))
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();

        let header = packet.header();
        assert!(header.extension_header_flag());
        assert_eq!(
            header.next_extension_header_type(),
            Some(GtpV1ExtensionHeaderType::NR_RAN_CONTAINER)
        );
        let extensions = header.extension_headers();
        assert_eq!(extensions[0].length_units(), 3);
        assert_eq!(extensions[0].next_extension_type(), GtpV1ExtensionHeaderType::UDP_PORT);
        assert_eq!(extensions[1].length_units(), 1);
        // 4 optional + 12 + 4 extension bytes + 4 payload bytes.
        assert_eq!(header.length_field(), 24);

        let bytes = packet.raw_data();
        let decoded = GtpV1Packet::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(decoded.header(), packet.header());
        assert_eq!(decoded.raw_data(), bytes);
    }

    #[test]
    fn sequence_flag_alone_writes_optional_fields() {
        let packet = GtpV1Builder::new()
            .message_type(GtpV1MessageType::ECHO_REQUEST)
            .sequence_number_flag(true)
            .sequence_number(0x1234)
            .correct_length_at_build(true)
            .build()
            .unwrap();
        assert_eq!(packet.header().length_field(), 4);
        assert_eq!(packet.header().n_pdu_number(), Some(0));
        assert_eq!(
            packet.raw_data(),
            [0x32, 0x01, 0x00, 0x04, 0, 0, 0, 0, 0x12, 0x34, 0x00, 0x00]
        );
    }

    #[test]
    fn extensions_without_flags_are_rejected() {
        let err = GtpV1Builder::new()
            .message_type(GtpV1MessageType::G_PDU)
            .extension_header(GtpExtensionHeader::new(GtpExtensionContent::UdpPort(1)))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));
    }

    #[test]
    fn unaligned_extension_needs_padding() {
        let raw = GtpExtensionHeader::from_parts(
            0,
            GtpExtensionContent::LongPdcpPduNumber(1),
            Vec::new(),
            GtpV1ExtensionHeaderType::NO_MORE_EXTENSION_HEADERS,
        );
        let build = |padding: bool| {
            GtpV1Builder::new()
                .message_type(GtpV1MessageType::G_PDU)
                .extension_header(raw.clone())
                .correct_length_at_build(true)
                .padding_at_build(padding)
                .build()
        };
        assert!(matches!(build(false), Err(BuildError::Invalid { .. })));
        let packet = build(true).unwrap();
        assert_eq!(packet.header().extension_headers()[0].length_units(), 2);
    }

    #[test]
    fn version_width_and_message_type_are_checked() {
        let err = GtpV1Builder::new()
            .message_type(GtpV1MessageType::G_PDU)
            .version(8)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "version", .. }));

        let err = GtpV1Builder::new().build().unwrap_err();
        assert!(matches!(err, BuildError::MissingField { field: "message_type", .. }));
    }
}
