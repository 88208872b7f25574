//! IEEE 802.11 management frames and their information elements.
//!
//! Frames enter through `decode_frame`, which reads the frame control field
//! and dispatches `type << 4 | subtype` through the `Dot11FrameType`
//! registry kind. Management subtypes are decoded here; control and data
//! frames stay opaque unless a decoder is registered for them.

pub mod builder;
pub mod element;
pub mod layout;
pub mod mac;
pub mod packet;

pub use builder::Dot11ManagementBuilder;
pub use element::{
    Dot11ChannelRange, Dot11ExtendedCapabilities, Dot11HtCapabilities, Dot11HtOperation,
    Dot11InformationElement, decode_element, is_basic_rate, rate_mbps,
};
pub use mac::{Dot11CapabilityInformation, MacAddress};
pub use packet::{
    Dot11BeaconFixedFields, Dot11ManagementBody, Dot11ManagementHeader, Dot11ManagementPacket,
};

use crate::codec::{
    CodecError, Packet, PayloadKind, ProtocolRegistry, RawView, UnknownPacket, get_bits,
};
use crate::protocols::numbers::Dot11FrameType;

fn frame_kind(view: &RawView<'_>) -> Result<Dot11FrameType, CodecError> {
    let control = view.read_u8(layout::FRAME_CONTROL_OFFSET)?;
    let frame_type = get_bits(control, layout::TYPE_MASK, layout::TYPE_SHIFT);
    let subtype = get_bits(control, layout::SUBTYPE_MASK, layout::SUBTYPE_SHIFT);
    Ok(Dot11FrameType(frame_type << 4 | subtype))
}

/// Decode an 802.11 frame without FCS, the `IEEE802_11` link type.
pub fn decode_frame(
    registry: &ProtocolRegistry,
    data: &[u8],
    offset: usize,
    length: usize,
) -> Result<Box<dyn Packet>, CodecError> {
    let view = RawView::new("IEEE 802.11", data, offset, length)?;
    let kind = frame_kind(&view)?;
    let decoder = registry.get(PayloadKind::Dot11FrameType, u32::from(kind.value()));
    decoder(registry, data, offset, length)
}

/// Decode an 802.11 frame whose last four octets are the FCS, as Radiotap
/// announces with its Flags field.
pub fn decode_frame_with_fcs(
    registry: &ProtocolRegistry,
    data: &[u8],
    offset: usize,
    length: usize,
) -> Result<Box<dyn Packet>, CodecError> {
    let view = RawView::new("IEEE 802.11", data, offset, length)?;
    let kind = frame_kind(&view)?;
    if kind.value() >> 4 == layout::MANAGEMENT_TYPE {
        Dot11ManagementPacket::decode_with_fcs(registry, data, offset, length)
    } else {
        UnknownPacket::decode(registry, data, offset, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::calc_crc32;
    use crate::protocols::dot11::packet::tests::BEACON;

    #[test]
    fn frames_dispatch_on_frame_type() {
        let registry = ProtocolRegistry::global();
        let packet = decode_frame(registry, &BEACON, 0, BEACON.len()).unwrap();
        assert_eq!(packet.protocol(), "IEEE 802.11 Management");

        let ack = [0xd4, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
        let packet = decode_frame(registry, &ack, 0, ack.len()).unwrap();
        assert_eq!(packet.protocol(), "Unknown");
        assert_eq!(packet.raw_data(), ack);
    }

    #[test]
    fn fcs_entry_point_splits_trailer() {
        let mut bytes = BEACON.to_vec();
        bytes.extend_from_slice(&calc_crc32(&BEACON).to_le_bytes());
        let packet = decode_frame_with_fcs(ProtocolRegistry::global(), &bytes, 0, bytes.len())
            .unwrap();
        assert_eq!(packet.protocol(), "IEEE 802.11 Management");
        assert_eq!(packet.length(), bytes.len());
        assert_eq!(packet.header_json()["fcs"], calc_crc32(&BEACON));
    }
}
