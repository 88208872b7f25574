use serde_json::{Value, json};

use super::builder::PacketBuilder;
use super::error::{BuildError, CodecError};
use super::packet::{Header, Packet, Render, hex};
use super::registry::ProtocolRegistry;
use super::view::RawView;

/// Bytes with no registered decoder, a fragment, or data after a
/// "no more headers" marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownPacket {
    data: Vec<u8>,
}

impl UnknownPacket {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        let view = RawView::new("Unknown", data, offset, length)?;
        Ok(Self::new(view.bytes().to_vec()))
    }

    pub fn decode(
        _: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        Ok(Box::new(Self::new_packet(data, offset, length)?))
    }

    pub fn builder(data: impl Into<Vec<u8>>) -> UnknownBuilder {
        UnknownBuilder { data: data.into() }
    }
}

impl Packet for UnknownPacket {
    fn protocol(&self) -> &'static str {
        "Unknown"
    }

    fn header(&self) -> Option<&dyn Header> {
        None
    }

    fn payload(&self) -> Option<&dyn Packet> {
        None
    }

    fn header_json(&self) -> Value {
        json!({ "data": hex(&self.data) })
    }

    fn clone_packet(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }

    fn length(&self) -> usize {
        self.data.len()
    }

    fn raw_data(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn render(&self, indent: usize) -> String {
        Render::new(indent, "data", self.data.len())
            .bytes("Hex stream", &self.data)
            .finish()
    }
}

/// Payload bytes a registered decoder rejected, kept with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IllegalPacket {
    data: Vec<u8>,
    reason: String,
}

impl IllegalPacket {
    pub fn new(data: Vec<u8>, reason: String) -> Self {
        Self { data, reason }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Packet for IllegalPacket {
    fn protocol(&self) -> &'static str {
        "Illegal"
    }

    fn header(&self) -> Option<&dyn Header> {
        None
    }

    fn payload(&self) -> Option<&dyn Packet> {
        None
    }

    fn header_json(&self) -> Value {
        json!({ "data": hex(&self.data), "reason": self.reason })
    }

    fn clone_packet(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }

    fn length(&self) -> usize {
        self.data.len()
    }

    fn raw_data(&self) -> Vec<u8> {
        self.data.clone()
    }

    fn render(&self, indent: usize) -> String {
        Render::new(indent, "Illegal Packet", self.data.len())
            .field("Reason", &self.reason)
            .bytes("Hex stream", &self.data)
            .finish()
    }
}

/// Builder for an opaque payload.
#[derive(Debug, Clone, Default)]
pub struct UnknownBuilder {
    data: Vec<u8>,
}

impl UnknownBuilder {
    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    pub fn build(self) -> Result<UnknownPacket, BuildError> {
        Ok(UnknownPacket::new(self.data))
    }
}

impl PacketBuilder for UnknownBuilder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_packet_keeps_window_bytes() {
        let packet = UnknownPacket::new_packet(&[1, 2, 3, 4], 1, 2).unwrap();
        assert_eq!(packet.data(), &[2, 3]);
        assert_eq!(packet.length(), 2);
        assert!(packet.render(0).contains("0x0203"));
    }

    #[test]
    fn unknown_builder_is_a_payload_builder() {
        let builder: Box<dyn PacketBuilder> = Box::new(UnknownPacket::builder(vec![7u8, 8]));
        let packet = builder.build_packet().unwrap();
        assert_eq!(packet.raw_data(), [7, 8]);
    }
}
