//! IPv4 (RFC 791).
//!
//! Options form a length-bounded chain ending at End of Option List. An
//! option that cannot be decoded ends the list with a warning; the bytes it
//! covered are kept as padding so the header still re-encodes exactly.
//!
//! Payload length is `total_length - header length`, clamped to the window.
//! A `total_length` of zero (segmentation offload) means "the rest of the
//! window". Fragments keep their payload as opaque bytes.

pub mod builder;
pub mod layout;
pub mod option;
pub mod packet;

pub use builder::IpV4Builder;
pub use option::{IpV4Option, IpV4TimestampData};
pub use packet::{IpV4Header, IpV4Packet, IpV4Tos};
