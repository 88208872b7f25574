use std::net::IpAddr;

use serde::Serialize;
use serde_json::Value;

use crate::codec::bits::put_u16;
use crate::codec::packet::{Render, to_json_value};
use crate::codec::{
    ByteOrder, CodecError, Header, Packet, PayloadKind, ProtocolRegistry, RawView,
    calc_pseudo_checksum,
};
use crate::protocols::numbers::{IpNumber, UdpPort};

use super::builder::UdpBuilder;
use super::layout;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UdpHeader {
    pub(super) src_port: UdpPort,
    pub(super) dst_port: UdpPort,
    pub(super) length: u16,
    pub(super) checksum: u16,
}

impl UdpHeader {
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::HEADER_LEN)?;
        Ok(Self {
            src_port: UdpPort(view.read_u16_be(layout::SRC_PORT_RANGE.start)?),
            dst_port: UdpPort(view.read_u16_be(layout::DST_PORT_RANGE.start)?),
            length: view.read_u16_be(layout::LENGTH_RANGE.start)?,
            checksum: view.read_u16_be(layout::CHECKSUM_RANGE.start)?,
        })
    }

    pub fn src_port(&self) -> UdpPort {
        self.src_port
    }

    pub fn dst_port(&self) -> UdpPort {
        self.dst_port
    }

    /// Declared datagram length, header included.
    pub fn length_field(&self) -> u16 {
        self.length
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }
}

impl Header for UdpHeader {
    fn length(&self) -> usize {
        layout::HEADER_LEN
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(layout::HEADER_LEN);
        put_u16(&mut out, self.src_port.value(), ByteOrder::BigEndian);
        put_u16(&mut out, self.dst_port.value(), ByteOrder::BigEndian);
        put_u16(&mut out, self.length, ByteOrder::BigEndian);
        put_u16(&mut out, self.checksum, ByteOrder::BigEndian);
        out
    }

    fn render(&self, indent: usize) -> String {
        Render::new(indent, "UDP Header", layout::HEADER_LEN)
            .field("Source port", self.src_port)
            .field("Destination port", self.dst_port)
            .field("Length", format!("{} [bytes]", self.length))
            .field("Checksum", format!("0x{:04x}", self.checksum))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UdpPacket {
    pub(super) header: UdpHeader,
    pub(super) payload: Option<Box<dyn Packet>>,
}

impl UdpPacket {
    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        Self::decode_with(ProtocolRegistry::global(), data, offset, length)
    }

    /// Payload length comes from the length field, clamped to the window;
    /// a zero length field means the rest of the window.
    pub fn decode_with(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Self, CodecError> {
        let view = RawView::new("UDP", data, offset, length)?;
        let header = UdpHeader::parse(&view)?;
        let available = view.len() - layout::HEADER_LEN;
        let payload_len = match usize::from(header.length) {
            0 => available,
            declared if declared < layout::HEADER_LEN => {
                return Err(view.malformed(format!(
                    "length field {} is less than header length {}",
                    declared,
                    layout::HEADER_LEN
                )));
            }
            declared => (declared - layout::HEADER_LEN).min(available),
        };

        let payload = if payload_len == 0 {
            None
        } else {
            let decoder = registry.get_pair(
                PayloadKind::UdpPort,
                u32::from(header.dst_port.value()),
                u32::from(header.src_port.value()),
            );
            Some(registry.decode_payload(
                decoder,
                data,
                view.offset() + layout::HEADER_LEN,
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

    pub fn builder() -> UdpBuilder {
        UdpBuilder::new()
    }

    pub fn to_builder(&self) -> UdpBuilder {
        UdpBuilder::from_packet(self)
    }

    pub fn header(&self) -> &UdpHeader {
        &self.header
    }

    /// Zero means "no checksum" and is accepted only with `accept_zero`.
    pub fn has_valid_checksum(&self, src: IpAddr, dst: IpAddr, accept_zero: bool) -> bool {
        if self.header.checksum == 0 {
            return accept_zero;
        }
        let payload = self.payload.as_ref().map(|p| p.raw_data()).unwrap_or_default();
        calc_pseudo_checksum(
            src,
            dst,
            IpNumber::UDP.value(),
            &self.header.raw_data(),
            &payload,
        ) == Some(0)
    }
}

impl Packet for UdpPacket {
    fn protocol(&self) -> &'static str {
        "UDP"
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

    #[test]
    fn header_only_datagram() {
        let bytes = [0x04, 0xd2, 0x27, 0x0f, 0x00, 0x08, 0x00, 0x00];
        let packet = UdpPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(packet.header().src_port(), UdpPort(1234));
        assert_eq!(packet.header().length_field(), 8);
        assert!(Packet::payload(&packet).is_none());
        assert_eq!(packet.raw_data(), bytes);
    }

    #[test]
    fn trailing_bytes_beyond_length_are_dropped() {
        let bytes = [0x04, 0xd2, 0x27, 0x0f, 0x00, 0x0a, 0x00, 0x00, 1, 2, 0, 0];
        let registry = ProtocolRegistry::builder().build();
        let packet = UdpPacket::decode_with(&registry, &bytes, 0, bytes.len()).unwrap();
        assert_eq!(packet.length(), 10);
    }

    #[test]
    fn short_length_field_is_malformed() {
        let bytes = [0x04, 0xd2, 0x27, 0x0f, 0x00, 0x04, 0x00, 0x00];
        let err = UdpPacket::new_packet(&bytes, 0, bytes.len()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn truncated_header_is_too_short() {
        let err = UdpPacket::new_packet(&[0, 53, 0], 0, 3).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 8, actual: 3, .. }));
    }
}
