use std::net::Ipv4Addr;

use crate::codec::builder::{build_payload, length_field, require};
use crate::codec::{
    BuildError, BuildPolicy, Header, Packet, PacketBuilder, calc_checksum, check_width,
    padding_len,
};
use crate::protocols::numbers::IpNumber;

use super::layout;
use super::option::IpV4Option;
use super::packet::{IpV4Header, IpV4Packet, IpV4Tos};

const PROTOCOL: &str = "IPv4";

/// Staging object for an [`IpV4Packet`].
///
/// `src_addr`, `dst_addr` and `protocol` are required. Version defaults to 4
/// and TTL to 64; everything else defaults to zero.
pub struct IpV4Builder {
    version: u8,
    ihl: u8,
    tos: IpV4Tos,
    total_length: u16,
    identification: u16,
    reserved_flag: bool,
    dont_fragment: bool,
    more_fragment: bool,
    fragment_offset: u16,
    ttl: u8,
    protocol: Option<IpNumber>,
    header_checksum: u16,
    src_addr: Option<Ipv4Addr>,
    dst_addr: Option<Ipv4Addr>,
    options: Vec<IpV4Option>,
    padding: Vec<u8>,
    payload: Option<Box<dyn PacketBuilder>>,
    policy: BuildPolicy,
}

impl Default for IpV4Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl IpV4Builder {
    pub fn new() -> Self {
        Self {
            version: layout::IPV4_VERSION,
            ihl: 0,
            tos: IpV4Tos::default(),
            total_length: 0,
            identification: 0,
            reserved_flag: false,
            dont_fragment: false,
            more_fragment: false,
            fragment_offset: 0,
            ttl: layout::DEFAULT_TTL,
            protocol: None,
            header_checksum: 0,
            src_addr: None,
            dst_addr: None,
            options: Vec::new(),
            padding: Vec::new(),
            payload: None,
            policy: BuildPolicy::default(),
        }
    }

    pub(super) fn from_packet(packet: &IpV4Packet) -> Self {
        let header = &packet.header;
        Self {
            version: header.version,
            ihl: header.ihl,
            tos: header.tos,
            total_length: header.total_length,
            identification: header.identification,
            reserved_flag: header.reserved_flag,
            dont_fragment: header.dont_fragment,
            more_fragment: header.more_fragment,
            fragment_offset: header.fragment_offset,
            ttl: header.ttl,
            protocol: Some(header.protocol),
            header_checksum: header.header_checksum,
            src_addr: Some(header.src_addr),
            dst_addr: Some(header.dst_addr),
            options: header.options.clone(),
            padding: header.padding.clone(),
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

    /// Header length in 32-bit words; ignored when lengths are corrected.
    pub fn ihl(mut self, ihl: u8) -> Self {
        self.ihl = ihl;
        self
    }

    pub fn tos(mut self, tos: IpV4Tos) -> Self {
        self.tos = tos;
        self
    }

    pub fn total_length(mut self, total_length: u16) -> Self {
        self.total_length = total_length;
        self
    }

    pub fn identification(mut self, identification: u16) -> Self {
        self.identification = identification;
        self
    }

    pub fn reserved_flag(mut self, on: bool) -> Self {
        self.reserved_flag = on;
        self
    }

    pub fn dont_fragment(mut self, on: bool) -> Self {
        self.dont_fragment = on;
        self
    }

    pub fn more_fragment(mut self, on: bool) -> Self {
        self.more_fragment = on;
        self
    }

    /// Offset in 8-octet units, 13 bits wide.
    pub fn fragment_offset(mut self, fragment_offset: u16) -> Self {
        self.fragment_offset = fragment_offset;
        self
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn protocol(mut self, protocol: IpNumber) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn header_checksum(mut self, header_checksum: u16) -> Self {
        self.header_checksum = header_checksum;
        self
    }

    pub fn src_addr(mut self, src_addr: Ipv4Addr) -> Self {
        self.src_addr = Some(src_addr);
        self
    }

    pub fn dst_addr(mut self, dst_addr: Ipv4Addr) -> Self {
        self.dst_addr = Some(dst_addr);
        self
    }

    pub fn options(mut self, options: Vec<IpV4Option>) -> Self {
        self.options = options;
        self
    }

    pub fn padding(mut self, padding: Vec<u8>) -> Self {
        self.padding = padding;
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

    pub fn correct_checksum_at_build(mut self, on: bool) -> Self {
        self.policy.correct_checksum_at_build = on;
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

    pub fn build(self) -> Result<IpV4Packet, BuildError> {
        let protocol = require(self.protocol, PROTOCOL, "protocol")?;
        let src_addr = require(self.src_addr, PROTOCOL, "src_addr")?;
        let dst_addr = require(self.dst_addr, PROTOCOL, "dst_addr")?;
        check_width(PROTOCOL, "version", u64::from(self.version), layout::VERSION_BITS)?;
        check_width(
            PROTOCOL,
            "fragment_offset",
            u64::from(self.fragment_offset),
            layout::FRAGMENT_OFFSET_BITS,
        )?;
        if !self.policy.correct_length_at_build {
            check_width(PROTOCOL, "ihl", u64::from(self.ihl), layout::IHL_BITS)?;
        }
        for option in &self.options {
            option.validate()?;
        }

        let (payload, payload_bytes) = build_payload(self.payload)?;

        let unpadded = layout::MIN_HEADER_LEN + IpV4Header::options_len(&self.options);
        let padding = if self.policy.padding_at_build {
            vec![0u8; padding_len(unpadded, layout::ALIGNMENT)]
        } else {
            self.padding
        };
        let header_len = unpadded + padding.len();

        let (ihl, total_length) = if self.policy.correct_length_at_build {
            if header_len % layout::ALIGNMENT != 0 {
                return Err(BuildError::invalid(
                    PROTOCOL,
                    format!("header length {} is not a multiple of 4", header_len),
                ));
            }
            let ihl = length_field(PROTOCOL, "ihl", header_len / 4, layout::IHL_BITS)?;
            let total = length_field(
                PROTOCOL,
                "total_length",
                header_len + payload_bytes.len(),
                16,
            )?;
            (ihl as u8, total as u16)
        } else {
            (self.ihl, self.total_length)
        };

        let mut header = IpV4Header {
            version: self.version,
            ihl,
            tos: self.tos,
            total_length,
            identification: self.identification,
            reserved_flag: self.reserved_flag,
            dont_fragment: self.dont_fragment,
            more_fragment: self.more_fragment,
            fragment_offset: self.fragment_offset,
            ttl: self.ttl,
            protocol,
            header_checksum: self.header_checksum,
            src_addr,
            dst_addr,
            options: self.options,
            padding,
        };
        if self.policy.correct_checksum_at_build {
            header.header_checksum = 0;
            header.header_checksum = calc_checksum(&header.raw_data());
        }

        Ok(IpV4Packet { header, payload })
    }
}

impl PacketBuilder for IpV4Builder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ProtocolRegistry, UnknownPacket};
    use crate::protocols::ipv4::IpV4TimestampData;

    fn base() -> IpV4Builder {
        IpV4Builder::new()
            .protocol(IpNumber::UDP)
            .src_addr(Ipv4Addr::new(192, 168, 0, 1))
            .dst_addr(Ipv4Addr::new(192, 168, 0, 2))
            .identification(1)
            .dont_fragment(true)
    }

    #[test]
    fn builds_reference_header() {
        let payload = [0x04, 0xd2, 0x27, 0x0f, 0x00, 0x08, 0x00, 0x00];
        let packet = base()
            .payload(UnknownPacket::builder(payload.to_vec()))
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        let bytes = packet.raw_data();
        assert_eq!(
            &bytes[..20],
            [
                0x45, 0x00, 0x00, 0x1c, 0x00, 0x01, 0x40, 0x00, 0x40, 0x11, 0xb9, 0x7c, 0xc0, 0xa8,
                0x00, 0x01, 0xc0, 0xa8, 0x00, 0x02
            ]
        );
        assert!(packet.header().has_valid_header_checksum(false));
    }

    #[test]
    fn missing_fields_are_reported() {
        let err = IpV4Builder::new().build().unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingField {
                protocol: "IPv4",
                field: "protocol"
            }
        );
        let err = IpV4Builder::new()
            .protocol(IpNumber::TCP)
            .src_addr(Ipv4Addr::LOCALHOST)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("dst_addr"));
    }

    #[test]
    fn fragment_offset_width_is_enforced() {
        let err = base().fragment_offset(0x2000).build().unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutOfRange {
                field: "fragment_offset",
                max: 0x1fff,
                ..
            }
        ));
        assert!(base().fragment_offset(0x1fff).build().is_ok());
    }

    #[test]
    fn ihl_width_is_enforced_without_correction() {
        let err = base().ihl(16).build().unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "ihl", .. }));
    }

    #[test]
    fn options_are_padded_and_counted() {
        let packet = base()
            .options(vec![
                IpV4Option::RouterAlert(0),
                IpV4Option::NoOperation,
                IpV4Option::EndOfOptionList,
            ])
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        let header = packet.header();
        assert_eq!(header.padding(), [0, 0]);
        assert_eq!(header.ihl(), 7);
        assert_eq!(header.total_length(), 28);
        assert!(header.has_valid_header_checksum(false));

        let bytes = packet.raw_data();
        let registry = ProtocolRegistry::builder().build();
        let decoded = IpV4Packet::decode_with(&registry, &bytes, 0, bytes.len()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn unaligned_header_without_padding_is_rejected() {
        let err = base()
            .options(vec![IpV4Option::NoOperation])
            .correct_length_at_build(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));
    }

    #[test]
    fn to_builder_round_trips() {
        let packet = base()
            .payload(UnknownPacket::builder(vec![1, 2, 3, 4]))
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        let rebuilt = packet
            .to_builder()
            .ttl(1)
            .correct_checksum_at_build(true)
            .build()
            .unwrap();
        assert_eq!(rebuilt.header().ttl(), 1);
        assert_eq!(rebuilt.raw_data()[20..], [1, 2, 3, 4]);
        assert!(rebuilt.header().has_valid_header_checksum(false));
    }

    #[test]
    fn option_widths_are_enforced() {
        let unknown = IpV4Option::Unknown {
            option_type: crate::protocols::numbers::IpV4OptionType(0x9e),
            data: vec![0; 300],
        };
        let err = base().options(vec![unknown]).ihl(15).build().unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutOfRange { field: "option_length", value: 302, .. }
        ));

        let timestamp = |overflow: u8, flag: u8| IpV4Option::Timestamp {
            pointer: 5,
            overflow,
            flag,
            data: IpV4TimestampData::TimestampsOnly(vec![7]),
        };
        let err = base().options(vec![timestamp(16, 0)]).build().unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "timestamp_overflow", .. }));
        let err = base().options(vec![timestamp(0, 0x10)]).build().unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "timestamp_flag", .. }));

        let packet = base()
            .options(vec![timestamp(15, 0)])
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        let bytes = packet.raw_data();
        let registry = ProtocolRegistry::builder().build();
        let decoded = IpV4Packet::decode_with(&registry, &bytes, 0, bytes.len()).unwrap();
        assert_eq!(decoded, packet);
    }
}
