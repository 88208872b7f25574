use serde::Serialize;
use serde_json::Value;

use crate::codec::bits::put_u32;
use crate::codec::packet::{Render, to_json_value};
use crate::codec::{
    ByteOrder, CodecError, Element, Header, Packet, PayloadKind, ProtocolRegistry, RawView,
};

use super::builder::Ssh2BinaryPacketBuilder;
use super::layout;
use super::message::Ssh2Message;

/// Binary packet framing (RFC 4253 section 6) before keys are in use:
/// `packet_length` counts the padding-length octet, the message and the
/// random padding. The MAC is empty until NEWKEYS; decoding never
/// produces one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ssh2BinaryHeader {
    pub(super) packet_length: u32,
    pub(super) padding_length: u8,
    pub(super) message: Ssh2Message,
    pub(super) random_padding: Vec<u8>,
    pub(super) mac: Vec<u8>,
}

impl Ssh2BinaryHeader {
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::BINARY_PREFIX_LEN)?;
        let packet_length = view.read_u32_be(layout::PACKET_LENGTH_OFFSET)?;
        let padding_length = view.read_u8(layout::PADDING_LENGTH_OFFSET)?;
        let message_len = (packet_length as usize)
            .checked_sub(layout::PADDING_LENGTH_LEN + usize::from(padding_length))
            .filter(|&len| len > 0)
            .ok_or_else(|| {
                view.malformed(format!(
                    "packet_length {} leaves no room for a message after {} padding bytes",
                    packet_length, padding_length
                ))
            })?;
        let message = Ssh2Message::parse(&view.sub(layout::BINARY_PREFIX_LEN, message_len)?)?;
        let padding_start = layout::BINARY_PREFIX_LEN + message_len;
        let random_padding = view
            .read_slice(padding_start..padding_start + usize::from(padding_length))?
            .to_vec();
        Ok(Self {
            packet_length,
            padding_length,
            message,
            random_padding,
            mac: Vec::new(),
        })
    }

    pub fn packet_length(&self) -> u32 {
        self.packet_length
    }

    pub fn padding_length(&self) -> u8 {
        self.padding_length
    }

    pub fn message(&self) -> &Ssh2Message {
        &self.message
    }

    pub fn random_padding(&self) -> &[u8] {
        &self.random_padding
    }

    pub fn mac(&self) -> &[u8] {
        &self.mac
    }
}

impl Header for Ssh2BinaryHeader {
    fn length(&self) -> usize {
        layout::BINARY_PREFIX_LEN
            + self.message.length()
            + self.random_padding.len()
            + self.mac.len()
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        put_u32(&mut out, self.packet_length, ByteOrder::BigEndian);
        out.push(self.padding_length);
        self.message.write_to(&mut out);
        out.extend_from_slice(&self.random_padding);
        out.extend_from_slice(&self.mac);
        out
    }

    fn render(&self, indent: usize) -> String {
        let mut render = Render::new(indent, "SSH2 Binary Packet Header", self.length());
        render
            .field("Packet length", self.packet_length)
            .field("Padding length", self.padding_length)
            .field("Message", &self.message)
            .bytes("Random padding", &self.random_padding);
        if !self.mac.is_empty() {
            render.bytes("MAC", &self.mac);
        }
        render.finish()
    }
}

/// One binary packet. Bytes after it in the same window are decoded through
/// the `Ssh2Stream` decoder registered for this packet's message number,
/// which lets what follows NEWKEYS stay opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ssh2BinaryPacket {
    pub(super) header: Ssh2BinaryHeader,
    pub(super) payload: Option<Box<dyn Packet>>,
}

impl Ssh2BinaryPacket {
    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        Self::decode_with(ProtocolRegistry::global(), data, offset, length)
    }

    pub fn decode_with(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Self, CodecError> {
        let view = RawView::new("SSH2", data, offset, length)?;
        let header = Ssh2BinaryHeader::parse(&view)?;
        let header_len = header.length();
        let payload = if view.len() == header_len {
            None
        } else {
            let decoder = registry.get(
                PayloadKind::Ssh2Stream,
                u32::from(header.message.message_number().value()),
            );
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

    pub fn builder() -> Ssh2BinaryPacketBuilder {
        Ssh2BinaryPacketBuilder::default()
    }

    pub fn to_builder(&self) -> Ssh2BinaryPacketBuilder {
        Ssh2BinaryPacketBuilder::from_packet(self)
    }

    pub fn header(&self) -> &Ssh2BinaryHeader {
        &self.header
    }
}

impl Packet for Ssh2BinaryPacket {
    fn protocol(&self) -> &'static str {
        "SSH2 Binary Packet"
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
    use crate::protocols::numbers::Ssh2MessageNumber;

    const NEWKEYS: [u8; 16] = [0, 0, 0, 12, 10, 21, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

    #[test]
    fn newkeys_packet() {
        let packet = Ssh2BinaryPacket::new_packet(&NEWKEYS, 0, NEWKEYS.len()).unwrap();
        let header = packet.header();
        assert_eq!(header.packet_length(), 12);
        assert_eq!(header.padding_length(), 10);
        assert_eq!(header.message(), &Ssh2Message::NewKeys);
        assert_eq!(header.random_padding().len(), 10);
        assert!(header.mac().is_empty());
        assert!(Packet::payload(&packet).is_none());
        assert_eq!(packet.raw_data(), NEWKEYS);
    }

    #[test]
    fn bytes_after_newkeys_stay_opaque() {
        let mut bytes = NEWKEYS.to_vec();
        bytes.extend_from_slice(&[0x8f, 0x3a, 0x71, 0x02, 0x5c]);
        let packet = Ssh2BinaryPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(Packet::payload(&packet).map(|p| p.protocol()), Some("Unknown"));
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn consecutive_packets_chain() {
        let mut bytes = vec![0, 0, 0, 12, 6, 5, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6];
        bytes.extend_from_slice(&NEWKEYS);
        let packet = Ssh2BinaryPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(
            packet.header().message().message_number(),
            Ssh2MessageNumber::SERVICE_REQUEST
        );
        let next = Packet::payload(&packet).unwrap();
        assert_eq!(next.protocol(), "SSH2 Binary Packet");
        assert_eq!(next.length(), 16);
    }

    #[test]
    fn padding_longer_than_packet_is_malformed() {
        let bytes = [0, 0, 0, 4, 10, 21, 0, 0];
        let err = Ssh2BinaryPacket::new_packet(&bytes, 0, bytes.len()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn truncated_packet_is_too_short() {
        let err = Ssh2BinaryPacket::new_packet(&NEWKEYS[..12], 0, 12).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 16, actual: 12, .. }));

        let err = Ssh2BinaryPacket::new_packet(&NEWKEYS[..3], 0, 3).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 5, actual: 3, .. }));
    }
}
