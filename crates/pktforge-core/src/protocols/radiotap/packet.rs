use serde::Serialize;
use serde_json::Value;

use crate::codec::bits::{put_u16, put_u32};
use crate::codec::packet::{Render, to_json_value};
use crate::codec::{
    ByteOrder, CodecError, Header, Packet, PacketDecoder, PayloadKind, ProtocolRegistry, RawView,
    padding_len,
};
use crate::protocols::dot11;
use crate::protocols::numbers::DataLinkType;

use super::builder::RadiotapBuilder;
use super::field::{RadiotapDataField, RadiotapField, field_layout};
use super::layout;

fn has_bit(word: u32, bit: u32) -> bool {
    word & (1 << bit) != 0
}

/// Present bits of the fields that can be decoded, in wire order. Stops at
/// the first bit without a known layout, at a bit beyond the first word of
/// a radiotap namespace, or where a vendor namespace begins.
pub(super) fn announced_fields(present: &[u32]) -> Vec<u32> {
    let mut bits = Vec::new();
    // Word index within the current radiotap namespace.
    let mut namespace_word = 0usize;
    for word in present {
        for bit in (0..layout::FIELD_BITS).filter(|&bit| has_bit(*word, bit)) {
            if namespace_word != 0 || field_layout(bit).is_none() {
                return bits;
            }
            bits.push(bit);
        }
        if has_bit(*word, layout::RADIOTAP_NAMESPACE_BIT) {
            namespace_word = 0;
        } else if has_bit(*word, layout::VENDOR_NAMESPACE_BIT) {
            return bits;
        } else {
            namespace_word += 1;
        }
    }
    bits
}

/// Radiotap capture header. The length field and every present word are
/// little-endian; data fields are aligned to their natural size measured
/// from the first header octet.
///
/// Fields are decoded up to the first present bit whose layout is not
/// known; from there to the header end the bytes are kept in `trailing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RadiotapHeader {
    pub(super) version: u8,
    pub(super) pad: u8,
    pub(super) length: u16,
    pub(super) present: Vec<u32>,
    pub(super) fields: Vec<RadiotapDataField>,
    pub(super) trailing: Vec<u8>,
}

impl RadiotapHeader {
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::MIN_HEADER_LEN)?;
        let length = view.read_u16(layout::LENGTH_RANGE.start, ByteOrder::LittleEndian)?;
        if usize::from(length) < layout::MIN_HEADER_LEN {
            return Err(view.malformed(format!(
                "length {} is below the minimum of {}",
                length,
                layout::MIN_HEADER_LEN
            )));
        }
        let header = view.sub(0, usize::from(length))?;

        let mut present = Vec::new();
        let mut cursor = layout::PRESENT_OFFSET;
        loop {
            let word = header.read_u32(cursor, ByteOrder::LittleEndian)?;
            present.push(word);
            cursor += layout::PRESENT_WORD_LEN;
            if !has_bit(word, layout::EXT_BIT) {
                break;
            }
        }

        let mut fields = Vec::new();
        for bit in announced_fields(&present) {
            let Some(slot) = field_layout(bit) else {
                break;
            };
            let padding = padding_len(cursor, slot.align);
            let align_padding = header.read_slice(cursor..cursor + padding)?.to_vec();
            let start = cursor + padding;
            let bytes = header.read_slice(start..start + slot.size)?;
            let field = RadiotapField::from_bytes(bit, bytes)
                .ok_or_else(|| header.malformed(format!("present bit {} has no decoder", bit)))?;
            fields.push(RadiotapDataField {
                align_padding,
                field,
            });
            cursor = start + slot.size;
        }
        let trailing = header.read_slice(cursor..header.len())?.to_vec();

        Ok(Self {
            version: view.read_u8(layout::VERSION_OFFSET)?,
            pad: view.read_u8(layout::PAD_OFFSET)?,
            length,
            present,
            fields,
            trailing,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn pad(&self) -> u8 {
        self.pad
    }

    /// Declared header length (`it_len`).
    pub fn length_field(&self) -> u16 {
        self.length
    }

    /// Present words in wire order, extension bits included.
    pub fn present(&self) -> &[u32] {
        &self.present
    }

    pub fn data_fields(&self) -> &[RadiotapDataField] {
        &self.fields
    }

    pub fn fields(&self) -> impl Iterator<Item = &RadiotapField> {
        self.fields.iter().map(|data| &data.field)
    }

    /// Undecoded bytes after the last known field.
    pub fn trailing(&self) -> &[u8] {
        &self.trailing
    }

    pub fn field(&self, bit: u32) -> Option<&RadiotapField> {
        self.fields().find(|field| field.bit() == bit)
    }

    pub fn flags(&self) -> Option<u8> {
        match self.field(layout::FLAGS_BIT) {
            Some(RadiotapField::Flags(flags)) => Some(*flags),
            _ => None,
        }
    }

    /// Whether the 802.11 frame that follows ends with an FCS.
    pub fn has_fcs(&self) -> bool {
        self.flags()
            .is_some_and(|flags| flags & layout::FLAGS_FCS != 0)
    }

    pub fn tsft(&self) -> Option<u64> {
        match self.field(layout::TSFT_BIT) {
            Some(RadiotapField::Tsft(tsft)) => Some(*tsft),
            _ => None,
        }
    }

    pub fn channel_frequency(&self) -> Option<u16> {
        match self.field(layout::CHANNEL_BIT) {
            Some(RadiotapField::Channel { frequency, .. }) => Some(*frequency),
            _ => None,
        }
    }

    pub fn antenna_signal_dbm(&self) -> Option<i8> {
        match self.field(layout::DBM_ANTENNA_SIGNAL_BIT) {
            Some(RadiotapField::AntennaSignalDbm(signal)) => Some(*signal),
            _ => None,
        }
    }
}

impl Header for RadiotapHeader {
    fn length(&self) -> usize {
        layout::PRESENT_OFFSET
            + self.present.len() * layout::PRESENT_WORD_LEN
            + self.fields.iter().map(RadiotapDataField::length).sum::<usize>()
            + self.trailing.len()
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        out.push(self.version);
        out.push(self.pad);
        put_u16(&mut out, self.length, ByteOrder::LittleEndian);
        for word in &self.present {
            put_u32(&mut out, *word, ByteOrder::LittleEndian);
        }
        for data in &self.fields {
            out.extend_from_slice(&data.align_padding);
            data.field.write_to(&mut out);
        }
        out.extend_from_slice(&self.trailing);
        out
    }

    fn render(&self, indent: usize) -> String {
        let mut render = Render::new(indent, "Radiotap Header", self.length());
        render
            .field("Version", self.version)
            .field("Length", format!("{} [bytes]", self.length));
        for word in &self.present {
            render.field("Present", format!("0x{:08x}", word));
        }
        for field in self.fields() {
            render.field(field.name(), field);
        }
        render.bytes("Undecoded fields", &self.trailing).finish()
    }
}

/// A radiotap header and the 802.11 frame it describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RadiotapPacket {
    pub(super) header: RadiotapHeader,
    pub(super) payload: Option<Box<dyn Packet>>,
}

impl RadiotapPacket {
    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        Self::decode_with(ProtocolRegistry::global(), data, offset, length)
    }

    /// The frame after the header is an `IEEE802_11` link-type payload; when
    /// the Flags field announces an FCS the frame is decoded with it split
    /// off.
    pub fn decode_with(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Self, CodecError> {
        let view = RawView::new("Radiotap", data, offset, length)?;
        let header = RadiotapHeader::parse(&view)?;
        let header_len = header.length();
        let payload = if view.len() == header_len {
            None
        } else {
            let decoder: PacketDecoder = if header.has_fcs() {
                dot11::decode_frame_with_fcs
            } else {
                registry.get(
                    PayloadKind::DataLinkType,
                    u32::from(DataLinkType::IEEE802_11.value()),
                )
            };
            Some(registry.decode_payload(
                decoder,
                data,
                view.offset() + header_len,
                view.len() - header_len,
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

    pub fn builder() -> RadiotapBuilder {
        RadiotapBuilder::new()
    }

    pub fn to_builder(&self) -> RadiotapBuilder {
        RadiotapBuilder::from_packet(self)
    }

    pub fn header(&self) -> &RadiotapHeader {
        &self.header
    }
}

impl Packet for RadiotapPacket {
    fn protocol(&self) -> &'static str {
        "Radiotap"
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
pub(crate) mod tests {
    use super::*;
    use crate::codec::calc_crc32;
    use crate::protocols::dot11::packet::tests::BEACON;

    /// Flags (FCS), rate, channel 2412 MHz, signal -43 dBm, antenna 1.
    #[rustfmt::skip]
    pub(crate) const RADIOTAP: [u8; 16] = [
        0x00, 0x00, 0x10, 0x00,
        0x2e, 0x08, 0x00, 0x00,
        0x10, 0x02, 0x6c, 0x09, 0xa0, 0x00, 0xd5, 0x01,
    ];

    pub(crate) fn capture() -> Vec<u8> {
        let mut bytes = RADIOTAP.to_vec();
        bytes.extend_from_slice(&BEACON);
        bytes.extend_from_slice(&calc_crc32(&BEACON).to_le_bytes());
        bytes
    }

    #[test]
    fn header_fields_and_fcs_frame() {
        let bytes = capture();
        let packet = RadiotapPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        let header = packet.header();
        assert_eq!(header.length_field(), 16);
        assert_eq!(header.present(), [0x0000_082e]);
        assert_eq!(header.fields().count(), 5);
        assert!(header.has_fcs());
        assert_eq!(header.channel_frequency(), Some(2412));
        assert_eq!(header.antenna_signal_dbm(), Some(-43));
        assert_eq!(header.data_fields()[2].align_padding, Vec::<u8>::new());
        assert!(header.trailing().is_empty());

        let frame = Packet::payload(&packet).unwrap();
        assert_eq!(frame.protocol(), "IEEE 802.11 Management");
        assert_eq!(frame.length(), BEACON.len() + 4);
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn frame_without_fcs_goes_through_link_type() {
        let mut bytes = RADIOTAP.to_vec();
        bytes[8] = 0x00;
        bytes.extend_from_slice(&BEACON);
        let packet = RadiotapPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert!(!packet.header().has_fcs());
        let frame = Packet::payload(&packet).unwrap();
        assert_eq!(frame.protocol(), "IEEE 802.11 Management");
        assert_eq!(frame.length(), BEACON.len());
    }

    #[test]
    fn alignment_padding_is_kept_verbatim() {
        let bytes = [
            0x00, 0x00, 0x0e, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x00, 0xaa, 0x85, 0x09, 0xa0, 0x00,
        ];
        let packet = RadiotapPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        let fields = packet.header().data_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].align_padding, [0xaa]);
        assert_eq!(packet.header().channel_frequency(), Some(2437));
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn unknown_bit_stops_field_parsing() {
        let mut bytes = vec![0x00, 0x00, 0x14, 0x00, 0x02, 0x00, 0x04, 0x00, 0x00];
        bytes.extend_from_slice(&[0x11; 11]);
        let packet = RadiotapPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(packet.header().fields().count(), 1);
        assert_eq!(packet.header().trailing(), [0x11; 11]);
        assert!(Packet::payload(&packet).is_none());
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn extended_present_words() {
        // Second word opens a new radiotap namespace: bit 5 is known again.
        let bytes = [
            0x00, 0x00, 0x0e, 0x00, 0x02, 0x00, 0x00, 0xa0, 0x20, 0x00, 0x00, 0x00, 0x00, 0xc4,
        ];
        let packet = RadiotapPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(packet.header().present().len(), 2);
        assert_eq!(packet.header().fields().count(), 2);
        assert_eq!(packet.header().antenna_signal_dbm(), Some(-60));

        // Without bit 29 the second word carries bits 32 and up, which are
        // not known.
        let mut bytes = bytes;
        bytes[7] = 0x80;
        let packet = RadiotapPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(packet.header().fields().count(), 1);
        assert_eq!(packet.header().trailing(), [0xc4]);
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn bad_lengths() {
        let err = RadiotapPacket::new_packet(&RADIOTAP, 0, 6).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 8, .. }));

        let mut bytes = RADIOTAP;
        bytes[2] = 0x04;
        let err = RadiotapPacket::new_packet(&bytes, 0, bytes.len()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));

        let err = RadiotapPacket::new_packet(&RADIOTAP, 0, 12).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 16, .. }));

        // Channel announced but it_len ends after the flags octet.
        let mut bytes = RADIOTAP;
        bytes[2] = 0x0a;
        let err = RadiotapPacket::new_packet(&bytes, 0, 10).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { .. }));
    }
}
