//! Protocol families built on the codec framework.
//!
//! Each family follows the same layered structure:
//! - `layout`: byte offsets, masks and widths (source of truth)
//! - `packet`: the header, its private parse and the packet type
//! - `builder`: the mutable counterpart that assembles a packet
//!
//! Families never call each other's decoders directly for payloads; they
//! go through the registry so callers can swap decoders in and out.

pub mod dns;
pub mod dot11;
pub mod gtp;
pub mod ipv4;
pub mod numbers;
pub mod radiotap;
pub mod ssh;
pub mod tcp;
pub mod udp;

use crate::codec::{PayloadKind, RegistryBuilder, UnknownPacket};

use dns::DnsPacket;
use dot11::Dot11ManagementPacket;
use gtp::GtpV1Packet;
use ipv4::IpV4Packet;
use numbers::{DataLinkType, GtpV1MessageType, IpNumber, Ssh2MessageNumber, TcpPort, UdpPort};
use radiotap::RadiotapPacket;
use tcp::TcpPacket;
use udp::UdpPacket;

/// Every management subtype, `type << 4 | subtype` with type 0.
const DOT11_MANAGEMENT_KINDS: std::ops::RangeInclusive<u32> = 0x00..=0x0f;

/// Registers the built-in decoders on `builder`.
pub fn register_defaults(builder: RegistryBuilder) -> RegistryBuilder {
    let builder = builder
        .register(PayloadKind::IpNumber, u32::from(IpNumber::IPV4.value()), IpV4Packet::decode)
        .register(PayloadKind::IpNumber, u32::from(IpNumber::TCP.value()), TcpPacket::decode)
        .register(PayloadKind::IpNumber, u32::from(IpNumber::UDP.value()), UdpPacket::decode)
        .register(PayloadKind::TcpPort, u32::from(TcpPort::SSH.value()), ssh::decode_stream)
        .register(PayloadKind::UdpPort, u32::from(UdpPort::DOMAIN.value()), DnsPacket::decode)
        .register(PayloadKind::UdpPort, u32::from(UdpPort::GTP_U.value()), GtpV1Packet::decode)
        .register(
            PayloadKind::GtpMessageType,
            u32::from(GtpV1MessageType::G_PDU.value()),
            GtpV1Packet::decode_t_pdu,
        )
        .register(
            PayloadKind::DataLinkType,
            u32::from(DataLinkType::RAW.value()),
            IpV4Packet::decode,
        )
        .register(
            PayloadKind::DataLinkType,
            u32::from(DataLinkType::IEEE802_11.value()),
            dot11::decode_frame,
        )
        .register(
            PayloadKind::DataLinkType,
            u32::from(DataLinkType::IEEE802_11_RADIO.value()),
            RadiotapPacket::decode,
        )
        .default_for(PayloadKind::Ssh2Stream, ssh::decode_stream)
        .register(
            PayloadKind::Ssh2Stream,
            u32::from(Ssh2MessageNumber::NEWKEYS.value()),
            UnknownPacket::decode,
        );
    DOT11_MANAGEMENT_KINDS.fold(builder, |builder, kind| {
        builder.register(PayloadKind::Dot11FrameType, kind, Dot11ManagementPacket::decode)
    })
}
