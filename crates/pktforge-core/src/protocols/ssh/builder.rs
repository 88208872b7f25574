use crate::codec::builder::{build_payload, length_field, require};
use crate::codec::{
    BuildError, BuildPolicy, Element, Header, Packet, PacketBuilder, padding_len,
};

use super::layout;
use super::message::Ssh2Message;
use super::packet::{Ssh2BinaryHeader, Ssh2BinaryPacket};
use super::version::{Ssh2VersionExchangeHeader, Ssh2VersionExchangePacket};

const PROTOCOL: &str = "SSH2";

/// Padding that brings the packet to a multiple of the block size with at
/// least four bytes of padding.
fn binary_padding_len(message_len: usize) -> usize {
    let pad = padding_len(layout::BINARY_PREFIX_LEN + message_len, layout::BLOCK_SIZE);
    if pad < layout::MIN_PADDING {
        pad + layout::BLOCK_SIZE
    } else {
        pad
    }
}

/// Builder for [`Ssh2BinaryPacket`]. `message` is required.
///
/// `padding_at_build` replaces the random padding with zeros sized to the
/// 8-byte block rule; `correct_length_at_build` recomputes `packet_length`
/// and `padding_length`.
#[derive(Default)]
pub struct Ssh2BinaryPacketBuilder {
    packet_length: u32,
    padding_length: u8,
    message: Option<Ssh2Message>,
    random_padding: Vec<u8>,
    mac: Vec<u8>,
    payload: Option<Box<dyn PacketBuilder>>,
    policy: BuildPolicy,
}

impl Ssh2BinaryPacketBuilder {
    pub(super) fn from_packet(packet: &Ssh2BinaryPacket) -> Self {
        let h = &packet.header;
        Self {
            packet_length: h.packet_length,
            padding_length: h.padding_length,
            message: Some(h.message.clone()),
            random_padding: h.random_padding.clone(),
            mac: h.mac.clone(),
            payload: packet
                .payload
                .clone()
                .map(|payload| Box::new(payload) as Box<dyn PacketBuilder>),
            policy: BuildPolicy::default(),
        }
    }

    pub fn packet_length(mut self, packet_length: u32) -> Self {
        self.packet_length = packet_length;
        self
    }

    pub fn padding_length(mut self, padding_length: u8) -> Self {
        self.padding_length = padding_length;
        self
    }

    pub fn message(mut self, message: Ssh2Message) -> Self {
        self.message = Some(message);
        self
    }

    pub fn random_padding(mut self, padding: impl Into<Vec<u8>>) -> Self {
        self.random_padding = padding.into();
        self
    }

    pub fn mac(mut self, mac: impl Into<Vec<u8>>) -> Self {
        self.mac = mac.into();
        self
    }

    /// The next packet on the same stream.
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

    pub fn padding_at_build(mut self, on: bool) -> Self {
        self.policy.padding_at_build = on;
        self
    }

    pub fn policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<Ssh2BinaryPacket, BuildError> {
        let message = require(self.message, PROTOCOL, "message")?;
        message.validate()?;

        let (payload, _) = build_payload(self.payload)?;

        let random_padding = if self.policy.padding_at_build {
            vec![0; binary_padding_len(message.length())]
        } else {
            self.random_padding
        };

        let (packet_length, padding_length) = if self.policy.correct_length_at_build {
            let padding_length = length_field(
                PROTOCOL,
                "padding_length",
                random_padding.len(),
                layout::PADDING_LENGTH_BITS,
            )?;
            let packet_length = length_field(
                PROTOCOL,
                "packet_length",
                layout::PADDING_LENGTH_LEN + message.length() + random_padding.len(),
                layout::PACKET_LENGTH_BITS,
            )?;
            (packet_length as u32, padding_length as u8)
        } else {
            (self.packet_length, self.padding_length)
        };

        Ok(Ssh2BinaryPacket {
            header: Ssh2BinaryHeader {
                packet_length,
                padding_length,
                message,
                random_padding,
                mac: self.mac,
            },
            payload,
        })
    }
}

impl PacketBuilder for Ssh2BinaryPacketBuilder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

/// Builder for [`Ssh2VersionExchangePacket`]. `software_version` is
/// required; the protocol version defaults to `"2.0"` and the line to a
/// CR LF ending.
pub struct Ssh2VersionExchangeBuilder {
    proto_version: String,
    software_version: Option<String>,
    comments: Option<String>,
    crlf: bool,
    payload: Option<Box<dyn PacketBuilder>>,
}

impl Default for Ssh2VersionExchangeBuilder {
    fn default() -> Self {
        Self {
            proto_version: "2.0".to_owned(),
            software_version: None,
            comments: None,
            crlf: true,
            payload: None,
        }
    }
}

fn check_version_token(field: &'static str, value: &str) -> Result<(), BuildError> {
    let printable = |c: char| c.is_ascii_graphic() && c != '-';
    if value.is_empty() || !value.chars().all(printable) {
        return Err(BuildError::invalid(
            PROTOCOL,
            format!("{} {:?} must be printable US-ASCII without '-' or spaces", field, value),
        ));
    }
    Ok(())
}

impl Ssh2VersionExchangeBuilder {
    pub(super) fn from_packet(packet: &Ssh2VersionExchangePacket) -> Self {
        let h = &packet.header;
        Self {
            proto_version: h.proto_version.clone(),
            software_version: Some(h.software_version.clone()),
            comments: h.comments.clone(),
            crlf: h.crlf,
            payload: packet
                .payload
                .clone()
                .map(|payload| Box::new(payload) as Box<dyn PacketBuilder>),
        }
    }

    pub fn proto_version(mut self, version: impl Into<String>) -> Self {
        self.proto_version = version.into();
        self
    }

    pub fn software_version(mut self, version: impl Into<String>) -> Self {
        self.software_version = Some(version.into());
        self
    }

    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn crlf(mut self, on: bool) -> Self {
        self.crlf = on;
        self
    }

    /// What follows the identification line on the same stream.
    pub fn payload<B: PacketBuilder + 'static>(mut self, payload: B) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    pub fn build(self) -> Result<Ssh2VersionExchangePacket, BuildError> {
        let software_version = require(self.software_version, PROTOCOL, "software_version")?;
        check_version_token("proto_version", &self.proto_version)?;
        check_version_token("software_version", &software_version)?;
        if let Some(comments) = &self.comments {
            if !comments.chars().all(|c| c == ' ' || c.is_ascii_graphic()) {
                return Err(BuildError::invalid(
                    PROTOCOL,
                    "comments must be printable US-ASCII",
                ));
            }
        }

        let (payload, _) = build_payload(self.payload)?;
        let header = Ssh2VersionExchangeHeader {
            proto_version: self.proto_version,
            software_version,
            comments: self.comments,
            crlf: self.crlf,
        };
        let line_len = header.length();
        if line_len > layout::MAX_VERSION_LINE {
            return Err(BuildError::invalid(
                PROTOCOL,
                format!(
                    "identification line is {} bytes, at most {} allowed",
                    line_len,
                    layout::MAX_VERSION_LINE
                ),
            ));
        }
        Ok(Ssh2VersionExchangePacket { header, payload })
    }
}

impl PacketBuilder for Ssh2VersionExchangeBuilder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RawView, UnknownPacket};
    use crate::protocols::ssh::{Ssh2MpInt, Ssh2NameList};

    #[test]
    fn padding_rule() {
        assert_eq!(binary_padding_len(1), 10);
        assert_eq!(binary_padding_len(3), 8);
        assert_eq!(binary_padding_len(7), 4);
        assert_eq!(binary_padding_len(8), 11);
    }

    #[test]
    fn newkeys_with_corrections() {
        let packet = Ssh2BinaryPacketBuilder::default()
            .message(Ssh2Message::NewKeys)
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        assert_eq!(packet.header().packet_length(), 12);
        assert_eq!(packet.header().padding_length(), 10);
        let bytes = packet.raw_data();
        assert_eq!(bytes.len() % layout::BLOCK_SIZE, 0);
        let decoded = Ssh2BinaryPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn kexdh_init_round_trip_through_builder() {
        let packet = Ssh2BinaryPacket::builder()
            .message(Ssh2Message::KexDhInit {
                e: Ssh2MpInt::from_unsigned(&[0xc3; 32]),
            })
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        let bytes = packet.raw_data();
        assert_eq!(bytes.len() % layout::BLOCK_SIZE, 0);
        assert!(packet.header().random_padding().len() >= layout::MIN_PADDING);
        let decoded = Ssh2BinaryPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(decoded.header().message(), packet.header().message());
    }

    #[test]
    fn explicit_values_are_kept() {
        let packet = Ssh2BinaryPacket::builder()
            .message(Ssh2Message::NewKeys)
            .packet_length(99)
            .padding_length(4)
            .random_padding([1, 2, 3, 4])
            .build()
            .unwrap();
        assert_eq!(packet.raw_data(), [0, 0, 0, 99, 4, 21, 1, 2, 3, 4]);
    }

    #[test]
    fn oversized_padding_is_out_of_range() {
        let err = Ssh2BinaryPacket::builder()
            .message(Ssh2Message::NewKeys)
            .random_padding(vec![0; 300])
            .correct_length_at_build(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "padding_length", .. }));
    }

    #[test]
    fn kexinit_names_are_validated() {
        let kex_init = crate::protocols::ssh::Ssh2KexInit {
            kex_algorithms: Ssh2NameList::new(["bad name,"]),
            ..Default::default()
        };
        let err = Ssh2BinaryPacket::builder()
            .message(Ssh2Message::KexInit(kex_init))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));
        assert!(matches!(
            Ssh2BinaryPacket::builder().build(),
            Err(BuildError::MissingField { field: "message", .. })
        ));
    }

    #[test]
    fn version_exchange_followed_by_packet() {
        let kexinit = Ssh2BinaryPacket::builder()
            .message(Ssh2Message::Unknown {
                message_number: crate::protocols::numbers::Ssh2MessageNumber::IGNORE,
                data: vec![0, 0, 0, 0],
            })
            .policy(BuildPolicy::CORRECT_ALL);
        let packet = Ssh2VersionExchangePacket::builder()
            .software_version("pktforge_0.1")
            .payload(kexinit)
            .build()
            .unwrap();
        let bytes = packet.raw_data();
        assert!(bytes.starts_with(b"SSH-2.0-pktforge_0.1\r\n"));
        let decoded = Ssh2VersionExchangePacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(decoded, packet);
        let view = RawView::of("SSH2", &bytes);
        assert_eq!(view.len(), packet.length());
    }

    #[test]
    fn version_tokens_are_checked() {
        let err = Ssh2VersionExchangePacket::builder()
            .software_version("has space")
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));

        let err = Ssh2VersionExchangePacket::builder()
            .software_version("x")
            .comments("a".repeat(300))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("at most 255"));

        let packet = Ssh2VersionExchangePacket::builder()
            .software_version("x")
            .crlf(false)
            .payload(UnknownPacket::builder(vec![0xff]))
            .build()
            .unwrap();
        assert_eq!(packet.raw_data(), b"SSH-2.0-x\n\xff");
    }
}
