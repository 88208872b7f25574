use crate::codec::builder::require;
use crate::codec::{BuildError, BuildPolicy, Packet, PacketBuilder, calc_crc32, check_width};
use crate::protocols::numbers::Dot11FrameType;

use super::layout;
use super::mac::MacAddress;
use super::packet::{Dot11ManagementBody, Dot11ManagementHeader, Dot11ManagementPacket};

const PROTOCOL: &str = "IEEE 802.11";

/// Staging object for a [`Dot11ManagementPacket`].
///
/// The body is required. The subtype follows from a Beacon, Probe Response
/// or Probe Request body when not set; a generic body needs it explicitly.
///
/// With `correct_length_at_build` the Order flag follows the presence of an
/// HT Control value. With `correct_checksum_at_build` an FCS, when present,
/// is recomputed over the rest of the frame; `append_fcs` adds one.
pub struct Dot11ManagementBuilder {
    protocol_version: u8,
    frame_type: u8,
    subtype: Option<u8>,
    to_ds: bool,
    from_ds: bool,
    more_fragments: bool,
    retry: bool,
    power_management: bool,
    more_data: bool,
    protected_frame: bool,
    order: bool,
    duration: u16,
    address1: MacAddress,
    address2: MacAddress,
    address3: MacAddress,
    fragment_number: u8,
    sequence_number: u16,
    ht_control: Option<u32>,
    body: Option<Dot11ManagementBody>,
    fcs: Option<u32>,
    policy: BuildPolicy,
}

impl Default for Dot11ManagementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Dot11ManagementBuilder {
    pub fn new() -> Self {
        Self {
            protocol_version: 0,
            frame_type: layout::MANAGEMENT_TYPE,
            subtype: None,
            to_ds: false,
            from_ds: false,
            more_fragments: false,
            retry: false,
            power_management: false,
            more_data: false,
            protected_frame: false,
            order: false,
            duration: 0,
            address1: MacAddress::BROADCAST,
            address2: MacAddress::default(),
            address3: MacAddress::default(),
            fragment_number: 0,
            sequence_number: 0,
            ht_control: None,
            body: None,
            fcs: None,
            policy: BuildPolicy::default(),
        }
    }

    pub(super) fn from_packet(packet: &Dot11ManagementPacket) -> Self {
        let h = &packet.header;
        Self {
            protocol_version: h.protocol_version,
            frame_type: h.frame_type,
            subtype: Some(h.subtype),
            to_ds: h.to_ds,
            from_ds: h.from_ds,
            more_fragments: h.more_fragments,
            retry: h.retry,
            power_management: h.power_management,
            more_data: h.more_data,
            protected_frame: h.protected_frame,
            order: h.order,
            duration: h.duration,
            address1: h.address1,
            address2: h.address2,
            address3: h.address3,
            fragment_number: h.fragment_number,
            sequence_number: h.sequence_number,
            ht_control: h.ht_control,
            body: Some(h.body.clone()),
            fcs: h.fcs,
            policy: BuildPolicy::default(),
        }
    }

    pub fn protocol_version(mut self, version: u8) -> Self {
        self.protocol_version = version;
        self
    }

    pub fn frame_type(mut self, frame_type: u8) -> Self {
        self.frame_type = frame_type;
        self
    }

    pub fn subtype(mut self, subtype: u8) -> Self {
        self.subtype = Some(subtype);
        self
    }

    /// Type and subtype from a combined code.
    pub fn kind(mut self, kind: Dot11FrameType) -> Self {
        self.frame_type = kind.value() >> 4;
        self.subtype = Some(kind.value() & 0x0f);
        self
    }

    pub fn to_ds(mut self, on: bool) -> Self {
        self.to_ds = on;
        self
    }

    pub fn from_ds(mut self, on: bool) -> Self {
        self.from_ds = on;
        self
    }

    pub fn more_fragments(mut self, on: bool) -> Self {
        self.more_fragments = on;
        self
    }

    pub fn retry(mut self, on: bool) -> Self {
        self.retry = on;
        self
    }

    pub fn power_management(mut self, on: bool) -> Self {
        self.power_management = on;
        self
    }

    pub fn more_data(mut self, on: bool) -> Self {
        self.more_data = on;
        self
    }

    pub fn protected_frame(mut self, on: bool) -> Self {
        self.protected_frame = on;
        self
    }

    pub fn order(mut self, on: bool) -> Self {
        self.order = on;
        self
    }

    pub fn duration(mut self, duration: u16) -> Self {
        self.duration = duration;
        self
    }

    pub fn address1(mut self, address: MacAddress) -> Self {
        self.address1 = address;
        self
    }

    pub fn address2(mut self, address: MacAddress) -> Self {
        self.address2 = address;
        self
    }

    pub fn address3(mut self, address: MacAddress) -> Self {
        self.address3 = address;
        self
    }

    pub fn fragment_number(mut self, fragment_number: u8) -> Self {
        self.fragment_number = fragment_number;
        self
    }

    pub fn sequence_number(mut self, sequence_number: u16) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    pub fn ht_control(mut self, ht_control: u32) -> Self {
        self.ht_control = Some(ht_control);
        self
    }

    pub fn body(mut self, body: Dot11ManagementBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn fcs(mut self, fcs: u32) -> Self {
        self.fcs = Some(fcs);
        self
    }

    /// Add a trailing FCS (zero until corrected) or drop it.
    pub fn append_fcs(mut self, on: bool) -> Self {
        self.fcs = if on { Some(self.fcs.unwrap_or(0)) } else { None };
        self
    }

    pub fn correct_length_at_build(mut self, on: bool) -> Self {
        self.policy.correct_length_at_build = on;
        self
    }

    pub fn correct_checksum_at_build(mut self, on: bool) -> Self {
        self.policy.correct_checksum_at_build = on;
        self
    }

    pub fn policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn validate(&self, subtype: u8, body: &Dot11ManagementBody) -> Result<(), BuildError> {
        for (field, value, bits) in [
            ("protocol_version", u64::from(self.protocol_version), layout::PROTOCOL_VERSION_BITS),
            ("frame_type", u64::from(self.frame_type), layout::TYPE_BITS),
            ("subtype", u64::from(subtype), layout::SUBTYPE_BITS),
            ("fragment_number", u64::from(self.fragment_number), layout::FRAGMENT_NUMBER_BITS),
            ("sequence_number", u64::from(self.sequence_number), layout::SEQUENCE_NUMBER_BITS),
        ] {
            check_width(PROTOCOL, field, value, bits)?;
        }
        if self.frame_type != layout::MANAGEMENT_TYPE {
            return Err(BuildError::invalid(
                PROTOCOL,
                format!("frame type {} is not management", self.frame_type),
            ));
        }
        let kind = Dot11FrameType(self.frame_type << 4 | subtype);
        let expected = body.subtype();
        let specific = [
            Dot11FrameType::BEACON,
            Dot11FrameType::PROBE_RESPONSE,
            Dot11FrameType::PROBE_REQUEST,
        ];
        if expected.is_some_and(|expected| expected != kind)
            || (expected.is_none() && specific.contains(&kind))
        {
            return Err(BuildError::invalid(
                PROTOCOL,
                format!("body does not match subtype {}", kind),
            ));
        }
        for element in body.elements() {
            element.validate()?;
        }
        Ok(())
    }

    pub fn build(mut self) -> Result<Dot11ManagementPacket, BuildError> {
        let body = require(self.body.take(), PROTOCOL, "body")?;
        let subtype = match self.subtype {
            Some(subtype) => subtype,
            None => require(body.subtype(), PROTOCOL, "subtype")?.value() & 0x0f,
        };
        self.validate(subtype, &body)?;

        let order = if self.policy.correct_length_at_build {
            self.ht_control.is_some()
        } else {
            self.order
        };
        if order != self.ht_control.is_some() {
            return Err(BuildError::invalid(
                PROTOCOL,
                "HT control must be present exactly when the Order flag is set",
            ));
        }

        let mut header = Dot11ManagementHeader {
            protocol_version: self.protocol_version,
            frame_type: self.frame_type,
            subtype,
            to_ds: self.to_ds,
            from_ds: self.from_ds,
            more_fragments: self.more_fragments,
            retry: self.retry,
            power_management: self.power_management,
            more_data: self.more_data,
            protected_frame: self.protected_frame,
            order,
            duration: self.duration,
            address1: self.address1,
            address2: self.address2,
            address3: self.address3,
            fragment_number: self.fragment_number,
            sequence_number: self.sequence_number,
            ht_control: self.ht_control,
            body,
            fcs: self.fcs,
        };

        if self.policy.correct_checksum_at_build && header.fcs.is_some() {
            header.fcs = Some(calc_crc32(&header.frame_bytes()));
        }

        Ok(Dot11ManagementPacket { header })
    }
}

impl PacketBuilder for Dot11ManagementBuilder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::dot11::packet::Dot11BeaconFixedFields;
    use crate::protocols::dot11::packet::tests::BEACON;
    use crate::protocols::dot11::{Dot11CapabilityInformation, Dot11InformationElement};

    fn beacon_body() -> Dot11ManagementBody {
        Dot11ManagementBody::Beacon {
            fixed: Dot11BeaconFixedFields {
                timestamp: 1,
                beacon_interval: 100,
                capability_information: Dot11CapabilityInformation(0x0431),
            },
            elements: vec![
                Dot11InformationElement::Ssid(b"home".to_vec()),
                Dot11InformationElement::SupportedRates(vec![0x82, 0x84, 0x0b, 0x16]),
                Dot11InformationElement::DsssParameterSet { current_channel: 6 },
                Dot11InformationElement::Tim {
                    dtim_count: 0,
                    dtim_period: 1,
                    bitmap_control: 0,
                    partial_virtual_bitmap: vec![0],
                },
            ],
        }
    }

    fn base() -> Dot11ManagementBuilder {
        Dot11ManagementBuilder::new()
            .address2(MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]))
            .address3(MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]))
            .sequence_number(1)
            .body(beacon_body())
    }

    #[test]
    fn builds_reference_beacon() {
        let packet = base().build().unwrap();
        assert_eq!(packet.header().kind(), Dot11FrameType::BEACON);
        assert_eq!(packet.raw_data(), BEACON);
    }

    #[test]
    fn checksum_correction_fills_fcs() {
        let packet = base()
            .append_fcs(true)
            .correct_checksum_at_build(true)
            .build()
            .unwrap();
        assert_eq!(packet.header().fcs(), Some(calc_crc32(&BEACON)));
        assert_eq!(packet.header().has_valid_fcs(), Some(true));

        let bytes = packet.raw_data();
        let decoded = Dot11ManagementPacket::new_packet_with_fcs(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn order_flag_follows_ht_control() {
        let err = base().ht_control(1).build().unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));

        let packet = base()
            .ht_control(1)
            .correct_length_at_build(true)
            .build()
            .unwrap();
        assert!(packet.header().order());
        assert_eq!(packet.length(), BEACON.len() + 4);
    }

    #[test]
    fn widths_and_subtype_are_checked() {
        let err = base().sequence_number(0x1000).build().unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutOfRange { field: "sequence_number", max: 0xfff, .. }
        ));

        let err = base().kind(Dot11FrameType::PROBE_REQUEST).build().unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));

        let err = base().kind(Dot11FrameType::DATA).build().unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));

        let err = Dot11ManagementBuilder::new()
            .body(Dot11ManagementBody::Generic { data: vec![0; 6] })
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingField { field: "subtype", .. }));
    }

    #[test]
    fn to_builder_round_trips() {
        let packet = Dot11ManagementPacket::new_packet(&BEACON, 0, BEACON.len()).unwrap();
        let rebuilt = packet.to_builder().build().unwrap();
        assert_eq!(rebuilt, packet);
    }
}
