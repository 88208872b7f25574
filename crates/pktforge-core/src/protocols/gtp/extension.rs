use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

use crate::codec::bits::put_u24;
use crate::codec::packet::hex;
use crate::codec::{
    BuildError, ByteOrder, CodecError, DispatchTable, Element, RawView, check_width, get_bits,
    padding_len,
};
use crate::protocols::numbers::GtpV1ExtensionHeaderType;

use super::layout;
use super::nru::NrUFrame;

const PROTOCOL: &str = "GTP-U";

/// PDU Session Container content (3GPP TS 38.415): the PDU type, the flag
/// nibble after it, and the QoS flow identifier. Optional trailing fields
/// are carried as extension padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PduSessionInformation {
    pub pdu_type: u8,
    pub type_flags: u8,
    /// PPP and RQI (downlink) or spare bits (uplink).
    pub qos_flags: u8,
    pub qfi: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum GtpExtensionContent {
    UdpPort(u16),
    PdcpPduNumber(u16),
    /// 18-bit PDCP number; the spare octets after it are padding.
    LongPdcpPduNumber(u32),
    PduSessionContainer(PduSessionInformation),
    NrRanContainer(NrUFrame),
    Unknown {
        extension_type: GtpV1ExtensionHeaderType,
        data: Vec<u8>,
    },
}

impl GtpExtensionContent {
    pub fn extension_type(&self) -> GtpV1ExtensionHeaderType {
        match self {
            GtpExtensionContent::UdpPort(_) => GtpV1ExtensionHeaderType::UDP_PORT,
            GtpExtensionContent::PdcpPduNumber(_) => GtpV1ExtensionHeaderType::PDCP_PDU_NUMBER,
            GtpExtensionContent::LongPdcpPduNumber(_) => {
                GtpV1ExtensionHeaderType::LONG_PDCP_PDU_NUMBER
            }
            GtpExtensionContent::PduSessionContainer(_) => {
                GtpV1ExtensionHeaderType::PDU_SESSION_CONTAINER
            }
            GtpExtensionContent::NrRanContainer(_) => GtpV1ExtensionHeaderType::NR_RAN_CONTAINER,
            GtpExtensionContent::Unknown { extension_type, .. } => *extension_type,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            GtpExtensionContent::UdpPort(value) | GtpExtensionContent::PdcpPduNumber(value) => {
                out.extend_from_slice(&value.to_be_bytes());
            }
            GtpExtensionContent::LongPdcpPduNumber(number) => {
                put_u24(out, *number, ByteOrder::BigEndian);
            }
            GtpExtensionContent::PduSessionContainer(info) => {
                out.push(
                    (info.pdu_type << layout::PDU_SESSION_TYPE_SHIFT)
                        | (info.type_flags & layout::PDU_SESSION_TYPE_FLAGS_MASK),
                );
                out.push(
                    (info.qos_flags << layout::PDU_SESSION_QOS_FLAGS_SHIFT)
                        | (info.qfi & layout::QFI_MASK),
                );
            }
            GtpExtensionContent::NrRanContainer(frame) => frame.write_to(out),
            GtpExtensionContent::Unknown { data, .. } => out.extend_from_slice(data),
        }
    }

    fn validate(&self) -> Result<(), BuildError> {
        match self {
            GtpExtensionContent::LongPdcpPduNumber(number) => check_width(
                PROTOCOL,
                "long_pdcp_pdu_number",
                u64::from(*number),
                layout::LONG_PDCP_PDU_NUMBER_BITS,
            ),
            GtpExtensionContent::PduSessionContainer(info) => {
                check_width(PROTOCOL, "pdu_type", u64::from(info.pdu_type), 4)?;
                check_width(PROTOCOL, "type_flags", u64::from(info.type_flags), 4)?;
                check_width(PROTOCOL, "qos_flags", u64::from(info.qos_flags), 2)?;
                check_width(PROTOCOL, "qfi", u64::from(info.qfi), layout::QFI_BITS)
            }
            GtpExtensionContent::NrRanContainer(frame) => frame.validate(),
            GtpExtensionContent::Unknown { extension_type, .. }
                if *extension_type == GtpV1ExtensionHeaderType::NO_MORE_EXTENSION_HEADERS =>
            {
                Err(BuildError::invalid(
                    PROTOCOL,
                    "extension header type 0 ends the chain and cannot carry content",
                ))
            }
            _ => Ok(()),
        }
    }
}

impl Element for GtpExtensionContent {
    fn length(&self) -> usize {
        match self {
            GtpExtensionContent::UdpPort(_) => layout::UDP_PORT_LEN,
            GtpExtensionContent::PdcpPduNumber(_) => layout::PDCP_PDU_NUMBER_LEN,
            GtpExtensionContent::LongPdcpPduNumber(_) => layout::LONG_PDCP_PDU_NUMBER_LEN,
            GtpExtensionContent::PduSessionContainer(_) => layout::PDU_SESSION_FIXED_LEN,
            GtpExtensionContent::NrRanContainer(frame) => frame.length(),
            GtpExtensionContent::Unknown { data, .. } => data.len(),
        }
    }
}

/// One GTP-U extension header: length byte, content, padding, and the
/// type of the next extension header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GtpExtensionHeader {
    extension_type: GtpV1ExtensionHeaderType,
    /// In 4-octet units, as written on the wire.
    length_units: u8,
    content: GtpExtensionContent,
    padding: Vec<u8>,
    next_extension_type: GtpV1ExtensionHeaderType,
}

impl GtpExtensionHeader {
    /// A well-formed extension header for `content`: zero padding up to the
    /// 4-octet rule, the matching length byte, and no next header.
    pub fn new(content: GtpExtensionContent) -> Self {
        let unpadded = layout::EXTENSION_OVERHEAD + content.length();
        let padding = vec![0; padding_len(unpadded, layout::EXTENSION_UNIT)];
        let total = unpadded + padding.len();
        Self {
            extension_type: content.extension_type(),
            length_units: (total / layout::EXTENSION_UNIT).min(usize::from(u8::MAX)) as u8,
            content,
            padding,
            next_extension_type: GtpV1ExtensionHeaderType::NO_MORE_EXTENSION_HEADERS,
        }
    }

    /// Every field as given, for deliberately inconsistent headers.
    pub fn from_parts(
        length_units: u8,
        content: GtpExtensionContent,
        padding: Vec<u8>,
        next_extension_type: GtpV1ExtensionHeaderType,
    ) -> Self {
        Self {
            extension_type: content.extension_type(),
            length_units,
            content,
            padding,
            next_extension_type,
        }
    }

    pub fn extension_type(&self) -> GtpV1ExtensionHeaderType {
        self.extension_type
    }

    pub fn length_units(&self) -> u8 {
        self.length_units
    }

    pub fn content(&self) -> &GtpExtensionContent {
        &self.content
    }

    pub fn padding(&self) -> &[u8] {
        &self.padding
    }

    pub fn next_extension_type(&self) -> GtpV1ExtensionHeaderType {
        self.next_extension_type
    }

    pub(super) fn set_next_extension_type(&mut self, next: GtpV1ExtensionHeaderType) {
        self.next_extension_type = next;
    }

    pub(super) fn pad_to_unit(&mut self) {
        let unpadded = layout::EXTENSION_OVERHEAD + self.content.length();
        self.padding = vec![0; padding_len(unpadded, layout::EXTENSION_UNIT)];
    }

    /// Recompute the length byte from content and padding.
    pub(super) fn correct_length(&mut self) -> Result<(), BuildError> {
        let total = self.length();
        if total % layout::EXTENSION_UNIT != 0 {
            return Err(BuildError::invalid(
                PROTOCOL,
                format!(
                    "{} extension header is {} bytes, not a multiple of {}",
                    self.extension_type.name(),
                    total,
                    layout::EXTENSION_UNIT
                ),
            ));
        }
        let units = total / layout::EXTENSION_UNIT;
        check_width(
            PROTOCOL,
            "extension_length",
            units as u64,
            layout::EXTENSION_LENGTH_BITS,
        )?;
        self.length_units = units as u8;
        Ok(())
    }

    pub(super) fn validate(&self) -> Result<(), BuildError> {
        self.content.validate()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.length_units);
        self.content.write_to(out);
        out.extend_from_slice(&self.padding);
        out.push(self.next_extension_type.value());
    }
}

impl Element for GtpExtensionHeader {
    fn length(&self) -> usize {
        layout::EXTENSION_OVERHEAD + self.content.length() + self.padding.len()
    }
}

impl fmt::Display for GtpExtensionHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.extension_type)?;
        match &self.content {
            GtpExtensionContent::UdpPort(port) => write!(f, "port {}", port)?,
            GtpExtensionContent::PdcpPduNumber(number) => write!(f, "{}", number)?,
            GtpExtensionContent::LongPdcpPduNumber(number) => write!(f, "{}", number)?,
            GtpExtensionContent::PduSessionContainer(info) => {
                write!(f, "PDU type {}, QFI {}", info.pdu_type, info.qfi)?
            }
            GtpExtensionContent::NrRanContainer(frame) => write!(f, "{}", frame)?,
            GtpExtensionContent::Unknown { data, .. } => write!(f, "0x{}", hex(data))?,
        }
        write!(f, " (next: {})", self.next_extension_type)
    }
}

type ContentDecoder = fn(&RawView<'_>) -> Result<GtpExtensionContent, CodecError>;

static CONTENT_DECODERS: LazyLock<DispatchTable<ContentDecoder>> = LazyLock::new(|| {
    DispatchTable::new(decode_unknown as ContentDecoder)
        .with(
            GtpV1ExtensionHeaderType::UDP_PORT.value(),
            decode_udp_port as ContentDecoder,
        )
        .with(
            GtpV1ExtensionHeaderType::PDCP_PDU_NUMBER.value(),
            decode_pdcp_pdu_number as ContentDecoder,
        )
        .with(
            GtpV1ExtensionHeaderType::LONG_PDCP_PDU_NUMBER.value(),
            decode_long_pdcp_pdu_number as ContentDecoder,
        )
        .with(
            GtpV1ExtensionHeaderType::PDU_SESSION_CONTAINER.value(),
            decode_pdu_session_container as ContentDecoder,
        )
        .with(
            GtpV1ExtensionHeaderType::NR_RAN_CONTAINER.value(),
            decode_nr_ran_container as ContentDecoder,
        )
});

/// Decode the extension header of type `extension_type` at the start of
/// `view`. The length byte bounds the content; whatever the typed content
/// does not use is kept as padding.
pub fn decode_extension(
    extension_type: u8,
    view: RawView<'_>,
) -> Result<GtpExtensionHeader, CodecError> {
    let view = view.within("GTP-U extension header");
    let length_units = view.read_u8(0)?;
    if length_units == 0 {
        return Err(view.malformed("extension header length 0"));
    }
    let total = usize::from(length_units) * layout::EXTENSION_UNIT;
    let whole = view.sub(0, total)?;
    let content_view = whole.sub(1, total - layout::EXTENSION_OVERHEAD)?;
    let extension_type = GtpV1ExtensionHeaderType(extension_type);
    let mut content = CONTENT_DECODERS.get(extension_type.value())(&content_view)?;
    if let GtpExtensionContent::Unknown {
        extension_type: slot,
        ..
    } = &mut content
    {
        *slot = extension_type;
    }
    let padding = content_view
        .read_slice(content.length()..content_view.len())?
        .to_vec();
    Ok(GtpExtensionHeader {
        extension_type,
        length_units,
        content,
        padding,
        next_extension_type: GtpV1ExtensionHeaderType(whole.read_u8(total - 1)?),
    })
}

fn decode_udp_port(view: &RawView<'_>) -> Result<GtpExtensionContent, CodecError> {
    Ok(GtpExtensionContent::UdpPort(view.read_u16_be(0)?))
}

fn decode_pdcp_pdu_number(view: &RawView<'_>) -> Result<GtpExtensionContent, CodecError> {
    Ok(GtpExtensionContent::PdcpPduNumber(view.read_u16_be(0)?))
}

fn decode_long_pdcp_pdu_number(view: &RawView<'_>) -> Result<GtpExtensionContent, CodecError> {
    let raw = view.read_u24_be(0)?;
    // The six high bits are spare and must be zero to round trip as a number.
    if raw >> layout::LONG_PDCP_PDU_NUMBER_BITS != 0 {
        return decode_unknown(view);
    }
    Ok(GtpExtensionContent::LongPdcpPduNumber(raw))
}

fn decode_pdu_session_container(view: &RawView<'_>) -> Result<GtpExtensionContent, CodecError> {
    let first = view.read_u8(0)?;
    let second = view.read_u8(1)?;
    Ok(GtpExtensionContent::PduSessionContainer(PduSessionInformation {
        pdu_type: get_bits(
            first,
            layout::PDU_SESSION_TYPE_MASK,
            layout::PDU_SESSION_TYPE_SHIFT,
        ),
        type_flags: first & layout::PDU_SESSION_TYPE_FLAGS_MASK,
        qos_flags: get_bits(
            second,
            layout::PDU_SESSION_QOS_FLAGS_MASK,
            layout::PDU_SESSION_QOS_FLAGS_SHIFT,
        ),
        qfi: second & layout::QFI_MASK,
    }))
}

fn decode_nr_ran_container(view: &RawView<'_>) -> Result<GtpExtensionContent, CodecError> {
    Ok(GtpExtensionContent::NrRanContainer(NrUFrame::parse(view)?))
}

fn decode_unknown(view: &RawView<'_>) -> Result<GtpExtensionContent, CodecError> {
    Ok(GtpExtensionContent::Unknown {
        extension_type: GtpV1ExtensionHeaderType::NO_MORE_EXTENSION_HEADERS,
        data: view.bytes().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(header: &GtpExtensionHeader) -> Vec<u8> {
        let mut out = Vec::new();
        header.write_to(&mut out);
        out
    }

    #[test]
    fn pdu_session_container() {
        let bytes = [0x01, 0x10, 0x09, 0x00];
        let ext = decode_extension(0x85, RawView::of("t", &bytes)).unwrap();
        assert_eq!(
            ext.content(),
            &GtpExtensionContent::PduSessionContainer(PduSessionInformation {
                pdu_type: 1,
                type_flags: 0,
                qos_flags: 0,
                qfi: 9,
            })
        );
        assert_eq!(ext.next_extension_type(), GtpV1ExtensionHeaderType(0));
        assert_eq!(ext.length(), 4);
        assert_eq!(encode(&ext), bytes);
    }

    #[test]
    fn long_pdcp_number_keeps_spare_octets_as_padding() {
        let bytes = [0x02, 0x01, 0x23, 0x45, 0x00, 0x00, 0x00, 0xc0];
        let ext = decode_extension(0x82, RawView::of("t", &bytes)).unwrap();
        assert_eq!(ext.content(), &GtpExtensionContent::LongPdcpPduNumber(0x012345));
        assert_eq!(ext.padding(), [0, 0, 0]);
        assert_eq!(ext.next_extension_type(), GtpV1ExtensionHeaderType::PDCP_PDU_NUMBER);
        assert_eq!(encode(&ext), bytes);
    }

    #[test]
    fn unknown_type_keeps_its_code() {
        let bytes = [0x01, 0xaa, 0xbb, 0x00];
        let ext = decode_extension(0x20, RawView::of("t", &bytes)).unwrap();
        assert_eq!(ext.extension_type(), GtpV1ExtensionHeaderType::SERVICE_CLASS_INDICATOR);
        assert_eq!(ext.content().extension_type(), ext.extension_type());
        assert_eq!(encode(&ext), bytes);
    }

    #[test]
    fn zero_length_is_malformed() {
        let err = decode_extension(0x40, RawView::of("t", &[0, 0, 0, 0])).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
        let err = decode_extension(0x40, RawView::of("t", &[2, 0, 0, 0])).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 8, .. }));
    }

    #[test]
    fn new_pads_to_four_octets() {
        let ext = GtpExtensionHeader::new(GtpExtensionContent::LongPdcpPduNumber(7));
        assert_eq!(ext.length_units(), 2);
        assert_eq!(ext.padding().len(), 3);
        assert_eq!(encode(&ext), [0x02, 0x00, 0x00, 0x07, 0, 0, 0, 0]);
    }
}
