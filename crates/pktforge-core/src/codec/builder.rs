//! Builder policies and the shared steps of the build pipeline.
//!
//! Every format builds in the same order: payload first (so its bytes are
//! known), then padding, then length fields, then checksum. Required fields
//! and bit widths are checked before any bytes are assembled, so a failed
//! `build()` never yields a partial packet.

use super::error::BuildError;
use super::packet::Packet;

/// Opt-in corrections applied by `build()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BuildPolicy {
    /// Recompute length/IHL/data-offset/count fields from the actual content.
    pub correct_length_at_build: bool,
    /// Recompute checksums from the pseudo-header, header and payload.
    pub correct_checksum_at_build: bool,
    /// Pad variable tails to the format's alignment with zero bytes.
    pub padding_at_build: bool,
}

impl BuildPolicy {
    /// All three corrections enabled.
    pub const CORRECT_ALL: BuildPolicy = BuildPolicy {
        correct_length_at_build: true,
        correct_checksum_at_build: true,
        padding_at_build: true,
    };
}

/// Type-erased builder, used for nested payload builders.
///
/// Building consumes the builder, so a payload builder cannot be reused for
/// a second parent.
pub trait PacketBuilder: Send {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError>;
}

/// An already built packet can stand in as a payload builder; this is how
/// `to_builder()` hands an existing payload back to a new parent.
impl PacketBuilder for Box<dyn Packet> {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(*self)
    }
}

/// Zero bytes needed to bring `len` up to a multiple of `align`.
///
/// # Examples
/// ```
/// use pktforge_core::codec::padding_len;
///
/// assert_eq!(padding_len(20, 4), 0);
/// assert_eq!(padding_len(23, 4), 1);
/// assert_eq!(padding_len(13, 8), 3);
/// ```
pub fn padding_len(len: usize, align: usize) -> usize {
    if align == 0 {
        return 0;
    }
    (align - len % align) % align
}

pub fn require<T>(value: Option<T>, protocol: &'static str, field: &'static str) -> Result<T, BuildError> {
    value.ok_or(BuildError::MissingField { protocol, field })
}

/// Step 1 of the pipeline: build the nested payload and capture its bytes.
pub fn build_payload(
    payload: Option<Box<dyn PacketBuilder>>,
) -> Result<(Option<Box<dyn Packet>>, Vec<u8>), BuildError> {
    match payload {
        Some(builder) => {
            let packet = builder.build_packet()?;
            let bytes = packet.raw_data();
            Ok((Some(packet), bytes))
        }
        None => Ok((None, Vec::new())),
    }
}

/// Convert a computed length into a field of `bits` bits.
pub fn length_field(
    protocol: &'static str,
    field: &'static str,
    value: usize,
    bits: u32,
) -> Result<u64, BuildError> {
    let value = value as u64;
    super::bits::check_width(protocol, field, value, bits)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_len_aligns() {
        assert_eq!(padding_len(0, 4), 0);
        assert_eq!(padding_len(1, 4), 3);
        assert_eq!(padding_len(5, 0), 0);
    }

    #[test]
    fn require_names_missing_field() {
        let err = require::<u8>(None, "TCP", "src_port").unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingField {
                protocol: "TCP",
                field: "src_port"
            }
        );
        assert_eq!(require(Some(3), "TCP", "src_port").unwrap(), 3);
    }

    #[test]
    fn length_field_checks_width() {
        assert_eq!(length_field("IPv4", "ihl", 15, 4).unwrap(), 15);
        assert!(length_field("IPv4", "ihl", 16, 4).is_err());
    }

    #[test]
    fn build_payload_without_builder_is_empty() {
        let (packet, bytes) = build_payload(None).unwrap();
        assert!(packet.is_none());
        assert!(bytes.is_empty());
    }
}
