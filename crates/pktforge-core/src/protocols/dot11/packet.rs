use serde::Serialize;
use serde_json::Value;

use crate::codec::bits::{put_u16, put_u32, put_u64};
use crate::codec::chain::{ChainErrorPolicy, Element, parse_length_bounded};
use crate::codec::packet::{Render, to_json_value};
use crate::codec::{
    ByteOrder, CodecError, Header, Packet, ProtocolRegistry, RawView, calc_crc32, get_bits,
    get_flag, set_bits, set_flag,
};
use crate::protocols::numbers::{Dot11FrameType, Dot11InformationElementId};

use super::builder::Dot11ManagementBuilder;
use super::element::{Dot11InformationElement, decode_element};
use super::layout;
use super::mac::{Dot11CapabilityInformation, MacAddress};

/// Timestamp, beacon interval and capability information, the fixed part of
/// Beacon and Probe Response bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Dot11BeaconFixedFields {
    /// TSF timer in microseconds.
    pub timestamp: u64,
    /// In time units of 1024 microseconds.
    pub beacon_interval: u16,
    pub capability_information: Dot11CapabilityInformation,
}

impl Dot11BeaconFixedFields {
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::FIXED_FIELDS_LEN)?;
        Ok(Self {
            timestamp: view.read_u64(layout::TIMESTAMP_OFFSET, ByteOrder::LittleEndian)?,
            beacon_interval: view
                .read_u16(layout::BEACON_INTERVAL_OFFSET, ByteOrder::LittleEndian)?,
            capability_information: Dot11CapabilityInformation(
                view.read_u16(layout::CAPABILITY_OFFSET, ByteOrder::LittleEndian)?,
            ),
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        put_u64(out, self.timestamp, ByteOrder::LittleEndian);
        put_u16(out, self.beacon_interval, ByteOrder::LittleEndian);
        put_u16(out, self.capability_information.value(), ByteOrder::LittleEndian);
    }
}

/// Frame body after the MAC header, shaped by the management subtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Dot11ManagementBody {
    Beacon {
        fixed: Dot11BeaconFixedFields,
        elements: Vec<Dot11InformationElement>,
    },
    ProbeResponse {
        fixed: Dot11BeaconFixedFields,
        elements: Vec<Dot11InformationElement>,
    },
    ProbeRequest {
        elements: Vec<Dot11InformationElement>,
    },
    /// Any other management subtype, kept as raw bytes.
    Generic { data: Vec<u8> },
}

fn parse_elements(view: &RawView<'_>) -> Result<Vec<Dot11InformationElement>, CodecError> {
    let chain = parse_length_bounded(
        &view.within("802.11 information elements"),
        ChainErrorPolicy::Propagate,
        decode_element,
        |_| false,
    )?;
    Ok(chain.elements)
}

impl Dot11ManagementBody {
    fn parse(kind: Dot11FrameType, view: &RawView<'_>) -> Result<Self, CodecError> {
        Ok(match kind {
            Dot11FrameType::BEACON => Dot11ManagementBody::Beacon {
                fixed: Dot11BeaconFixedFields::parse(view)?,
                elements: parse_elements(&view.tail(layout::FIXED_FIELDS_LEN)?)?,
            },
            Dot11FrameType::PROBE_RESPONSE => Dot11ManagementBody::ProbeResponse {
                fixed: Dot11BeaconFixedFields::parse(view)?,
                elements: parse_elements(&view.tail(layout::FIXED_FIELDS_LEN)?)?,
            },
            Dot11FrameType::PROBE_REQUEST => Dot11ManagementBody::ProbeRequest {
                elements: parse_elements(view)?,
            },
            _ => Dot11ManagementBody::Generic {
                data: view.bytes().to_vec(),
            },
        })
    }

    /// The subtype this body decodes under, `None` for a generic body.
    pub fn subtype(&self) -> Option<Dot11FrameType> {
        match self {
            Dot11ManagementBody::Beacon { .. } => Some(Dot11FrameType::BEACON),
            Dot11ManagementBody::ProbeResponse { .. } => Some(Dot11FrameType::PROBE_RESPONSE),
            Dot11ManagementBody::ProbeRequest { .. } => Some(Dot11FrameType::PROBE_REQUEST),
            Dot11ManagementBody::Generic { .. } => None,
        }
    }

    pub fn fixed_fields(&self) -> Option<&Dot11BeaconFixedFields> {
        match self {
            Dot11ManagementBody::Beacon { fixed, .. }
            | Dot11ManagementBody::ProbeResponse { fixed, .. } => Some(fixed),
            _ => None,
        }
    }

    /// Information elements in wire order; empty for a generic body.
    pub fn elements(&self) -> &[Dot11InformationElement] {
        match self {
            Dot11ManagementBody::Beacon { elements, .. }
            | Dot11ManagementBody::ProbeResponse { elements, .. }
            | Dot11ManagementBody::ProbeRequest { elements } => elements,
            Dot11ManagementBody::Generic { .. } => &[],
        }
    }

    pub fn length(&self) -> usize {
        let elements: usize = self.elements().iter().map(Element::length).sum();
        match self {
            Dot11ManagementBody::Generic { data } => data.len(),
            Dot11ManagementBody::ProbeRequest { .. } => elements,
            _ => layout::FIXED_FIELDS_LEN + elements,
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        if let Dot11ManagementBody::Generic { data } = self {
            out.extend_from_slice(data);
            return;
        }
        if let Some(fixed) = self.fixed_fields() {
            fixed.write_to(out);
        }
        for element in self.elements() {
            element.write_to(out);
        }
    }
}

/// An 802.11 management frame: MAC header, optional HT Control, body and
/// optional frame check sequence. Multi-octet fields are little-endian.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Dot11ManagementHeader {
    pub(super) protocol_version: u8,
    pub(super) frame_type: u8,
    pub(super) subtype: u8,
    pub(super) to_ds: bool,
    pub(super) from_ds: bool,
    pub(super) more_fragments: bool,
    pub(super) retry: bool,
    pub(super) power_management: bool,
    pub(super) more_data: bool,
    pub(super) protected_frame: bool,
    pub(super) order: bool,
    pub(super) duration: u16,
    pub(super) address1: MacAddress,
    pub(super) address2: MacAddress,
    pub(super) address3: MacAddress,
    pub(super) fragment_number: u8,
    pub(super) sequence_number: u16,
    pub(super) ht_control: Option<u32>,
    pub(super) body: Dot11ManagementBody,
    pub(super) fcs: Option<u32>,
}

fn read_address(view: &RawView<'_>, at: usize) -> Result<MacAddress, CodecError> {
    Ok(MacAddress(view.read_array::<{ layout::MAC_ADDRESS_LEN }>(at)?))
}

impl Dot11ManagementHeader {
    fn parse(view: &RawView<'_>, with_fcs: bool) -> Result<Self, CodecError> {
        let fcs_len = if with_fcs { layout::FCS_LEN } else { 0 };
        view.require_len(layout::MAC_HEADER_LEN + fcs_len)?;

        let control = view.read_u8(layout::FRAME_CONTROL_OFFSET)?;
        let flags = view.read_u8(layout::FLAGS_OFFSET)?;
        let frame_type = get_bits(control, layout::TYPE_MASK, layout::TYPE_SHIFT);
        let subtype = get_bits(control, layout::SUBTYPE_MASK, layout::SUBTYPE_SHIFT);
        if frame_type != layout::MANAGEMENT_TYPE {
            return Err(view.malformed(format!("frame type {} is not management", frame_type)));
        }

        let order = get_flag(flags, layout::ORDER_MASK);
        let mut body_start = layout::MAC_HEADER_LEN;
        let ht_control = if order {
            let value = view.read_u32(body_start, ByteOrder::LittleEndian)?;
            body_start += layout::HT_CONTROL_LEN;
            Some(value)
        } else {
            None
        };
        view.require_len(body_start + fcs_len)?;
        let frame_end = view.len() - fcs_len;

        let kind = Dot11FrameType(frame_type << 4 | subtype);
        let body_view = view.sub(body_start, frame_end - body_start)?;
        let body = Dot11ManagementBody::parse(kind, &body_view)?;
        let fcs = if with_fcs {
            Some(view.read_u32(frame_end, ByteOrder::LittleEndian)?)
        } else {
            None
        };

        let sequence_control =
            view.read_u16(layout::SEQUENCE_CONTROL_RANGE.start, ByteOrder::LittleEndian)?;
        Ok(Self {
            protocol_version: get_bits(control, layout::PROTOCOL_VERSION_MASK, 0),
            frame_type,
            subtype,
            to_ds: get_flag(flags, layout::TO_DS_MASK),
            from_ds: get_flag(flags, layout::FROM_DS_MASK),
            more_fragments: get_flag(flags, layout::MORE_FRAGMENTS_MASK),
            retry: get_flag(flags, layout::RETRY_MASK),
            power_management: get_flag(flags, layout::POWER_MANAGEMENT_MASK),
            more_data: get_flag(flags, layout::MORE_DATA_MASK),
            protected_frame: get_flag(flags, layout::PROTECTED_FRAME_MASK),
            order,
            duration: view.read_u16(layout::DURATION_RANGE.start, ByteOrder::LittleEndian)?,
            address1: read_address(view, layout::ADDRESS1_RANGE.start)?,
            address2: read_address(view, layout::ADDRESS2_RANGE.start)?,
            address3: read_address(view, layout::ADDRESS3_RANGE.start)?,
            fragment_number: get_bits(sequence_control, layout::FRAGMENT_NUMBER_MASK, 0) as u8,
            sequence_number: get_bits(
                sequence_control,
                layout::SEQUENCE_NUMBER_MASK,
                layout::SEQUENCE_NUMBER_SHIFT,
            ),
            ht_control,
            body,
            fcs,
        })
    }

    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    /// The two-bit type; always 0 (management) here.
    pub fn frame_type(&self) -> u8 {
        self.frame_type
    }

    pub fn subtype(&self) -> u8 {
        self.subtype
    }

    /// Type and subtype combined, the registry code of the frame.
    pub fn kind(&self) -> Dot11FrameType {
        Dot11FrameType(self.frame_type << 4 | self.subtype)
    }

    pub fn to_ds(&self) -> bool {
        self.to_ds
    }

    pub fn from_ds(&self) -> bool {
        self.from_ds
    }

    pub fn more_fragments(&self) -> bool {
        self.more_fragments
    }

    pub fn retry(&self) -> bool {
        self.retry
    }

    pub fn power_management(&self) -> bool {
        self.power_management
    }

    pub fn more_data(&self) -> bool {
        self.more_data
    }

    pub fn protected_frame(&self) -> bool {
        self.protected_frame
    }

    /// Set when an HT Control field follows the MAC header.
    pub fn order(&self) -> bool {
        self.order
    }

    pub fn duration(&self) -> u16 {
        self.duration
    }

    /// Receiver (destination) address.
    pub fn address1(&self) -> MacAddress {
        self.address1
    }

    /// Transmitter (source) address.
    pub fn address2(&self) -> MacAddress {
        self.address2
    }

    /// BSSID.
    pub fn address3(&self) -> MacAddress {
        self.address3
    }

    pub fn fragment_number(&self) -> u8 {
        self.fragment_number
    }

    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    pub fn ht_control(&self) -> Option<u32> {
        self.ht_control
    }

    pub fn body(&self) -> &Dot11ManagementBody {
        &self.body
    }

    pub fn fcs(&self) -> Option<u32> {
        self.fcs
    }

    /// First element with the given id.
    pub fn element(&self, id: Dot11InformationElementId) -> Option<&Dot11InformationElement> {
        self.body.elements().iter().find(|element| element.id() == id)
    }

    pub fn ssid(&self) -> Option<&[u8]> {
        self.body.elements().iter().find_map(|element| match element {
            Dot11InformationElement::Ssid(ssid) => Some(ssid.as_slice()),
            _ => None,
        })
    }

    /// `None` when the frame carries no FCS.
    pub fn has_valid_fcs(&self) -> Option<bool> {
        self.fcs.map(|fcs| fcs == calc_crc32(&self.frame_bytes()))
    }

    fn flags_byte(&self) -> u8 {
        [
            (layout::TO_DS_MASK, self.to_ds),
            (layout::FROM_DS_MASK, self.from_ds),
            (layout::MORE_FRAGMENTS_MASK, self.more_fragments),
            (layout::RETRY_MASK, self.retry),
            (layout::POWER_MANAGEMENT_MASK, self.power_management),
            (layout::MORE_DATA_MASK, self.more_data),
            (layout::PROTECTED_FRAME_MASK, self.protected_frame),
            (layout::ORDER_MASK, self.order),
        ]
        .into_iter()
        .fold(0, |byte, (mask, on)| set_flag(byte, mask, on))
    }

    /// Everything the FCS covers: the frame without its last four octets.
    pub(super) fn frame_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        let control = set_bits(0u8, self.protocol_version, layout::PROTOCOL_VERSION_MASK, 0);
        let control = set_bits(control, self.frame_type, layout::TYPE_MASK, layout::TYPE_SHIFT);
        let control = set_bits(control, self.subtype, layout::SUBTYPE_MASK, layout::SUBTYPE_SHIFT);
        out.push(control);
        out.push(self.flags_byte());
        put_u16(&mut out, self.duration, ByteOrder::LittleEndian);
        out.extend_from_slice(&self.address1.octets());
        out.extend_from_slice(&self.address2.octets());
        out.extend_from_slice(&self.address3.octets());
        let sequence_control = set_bits(
            0u16,
            u16::from(self.fragment_number),
            layout::FRAGMENT_NUMBER_MASK,
            0,
        );
        let sequence_control = set_bits(
            sequence_control,
            self.sequence_number,
            layout::SEQUENCE_NUMBER_MASK,
            layout::SEQUENCE_NUMBER_SHIFT,
        );
        put_u16(&mut out, sequence_control, ByteOrder::LittleEndian);
        if let Some(ht_control) = self.ht_control {
            put_u32(&mut out, ht_control, ByteOrder::LittleEndian);
        }
        self.body.write_to(&mut out);
        out
    }
}

impl Header for Dot11ManagementHeader {
    fn length(&self) -> usize {
        layout::MAC_HEADER_LEN
            + self.ht_control.map_or(0, |_| layout::HT_CONTROL_LEN)
            + self.body.length()
            + self.fcs.map_or(0, |_| layout::FCS_LEN)
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = self.frame_bytes();
        if let Some(fcs) = self.fcs {
            put_u32(&mut out, fcs, ByteOrder::LittleEndian);
        }
        out
    }

    fn render(&self, indent: usize) -> String {
        let mut render = Render::new(indent, "IEEE 802.11 Management Header", self.length());
        render
            .field("Frame type", self.kind())
            .field("Protocol version", self.protocol_version)
            .field("Flags", format!("0x{:02x}", self.flags_byte()))
            .field("Duration", format!("{} [us]", self.duration))
            .field("Address 1", self.address1)
            .field("Address 2", self.address2)
            .field("Address 3", self.address3)
            .field("Fragment number", self.fragment_number)
            .field("Sequence number", self.sequence_number)
            .opt_field("HT control", self.ht_control.map(|v| format!("0x{:08x}", v)));
        if let Some(fixed) = self.body.fixed_fields() {
            render
                .field("Timestamp", fixed.timestamp)
                .field("Beacon interval", format!("{} [TU]", fixed.beacon_interval))
                .field("Capability information", fixed.capability_information);
        }
        for element in self.body.elements() {
            render.field("Element", element);
        }
        if let Dot11ManagementBody::Generic { data } = &self.body {
            render.bytes("Body", data);
        }
        render
            .opt_field("FCS", self.fcs.map(|fcs| format!("0x{:08x}", fcs)))
            .finish()
    }
}

/// A management frame. It is a leaf: nothing is dispatched after the body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dot11ManagementPacket {
    pub(super) header: Dot11ManagementHeader,
}

impl Dot11ManagementPacket {
    /// Decode a frame that ends with its body.
    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        let view = RawView::new("IEEE 802.11", data, offset, length)?;
        Ok(Self {
            header: Dot11ManagementHeader::parse(&view, false)?,
        })
    }

    /// Decode a frame whose last four octets are the FCS.
    pub fn new_packet_with_fcs(
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Self, CodecError> {
        let view = RawView::new("IEEE 802.11", data, offset, length)?;
        Ok(Self {
            header: Dot11ManagementHeader::parse(&view, true)?,
        })
    }

    pub fn decode(
        _registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        Ok(Box::new(Self::new_packet(data, offset, length)?))
    }

    pub fn decode_with_fcs(
        _registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        Ok(Box::new(Self::new_packet_with_fcs(data, offset, length)?))
    }

    pub fn builder() -> Dot11ManagementBuilder {
        Dot11ManagementBuilder::new()
    }

    pub fn to_builder(&self) -> Dot11ManagementBuilder {
        Dot11ManagementBuilder::from_packet(self)
    }

    pub fn header(&self) -> &Dot11ManagementHeader {
        &self.header
    }
}

impl Packet for Dot11ManagementPacket {
    fn protocol(&self) -> &'static str {
        "IEEE 802.11 Management"
    }

    fn header(&self) -> Option<&dyn Header> {
        Some(&self.header)
    }

    fn payload(&self) -> Option<&dyn Packet> {
        None
    }

    fn header_json(&self) -> Value {
        to_json_value(&self.header)
    }

    fn clone_packet(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }
}
