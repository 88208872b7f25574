//! SSH2 transport layer up to key exchange (RFC 4253, data types from
//! RFC 4251).
//!
//! A TCP segment on port 22 is a stream fragment: it starts either with the
//! identification line (`SSH-...`) or with a binary packet. Whatever is left
//! after one unit is decoded again through the `Ssh2Stream` registry kind,
//! keyed by the message number just decoded (0 after an identification
//! line). The default registry maps NEWKEYS to opaque bytes, since what
//! follows it is encrypted.

pub mod builder;
pub mod layout;
pub mod message;
pub mod packet;
pub mod types;
pub mod version;

pub use builder::{Ssh2BinaryPacketBuilder, Ssh2VersionExchangeBuilder};
pub use message::{Ssh2KexInit, Ssh2Message};
pub use packet::{Ssh2BinaryHeader, Ssh2BinaryPacket};
pub use types::{Ssh2Boolean, Ssh2MpInt, Ssh2NameList, Ssh2String};
pub use version::{Ssh2VersionExchangeHeader, Ssh2VersionExchangePacket};

use crate::codec::{CodecError, Packet, ProtocolRegistry, RawView};

/// Decode one unit of an SSH2 byte stream: an identification line when the
/// window starts with `SSH-`, a binary packet otherwise.
pub fn decode_stream(
    registry: &ProtocolRegistry,
    data: &[u8],
    offset: usize,
    length: usize,
) -> Result<Box<dyn Packet>, CodecError> {
    let view = RawView::new("SSH2", data, offset, length)?;
    if view.bytes().starts_with(layout::VERSION_PREFIX) {
        Ssh2VersionExchangePacket::decode(registry, data, offset, length)
    } else {
        Ssh2BinaryPacket::decode(registry, data, offset, length)
    }
}
