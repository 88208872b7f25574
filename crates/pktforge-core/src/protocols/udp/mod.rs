//! UDP (RFC 768).
//!
//! The payload decoder is chosen by destination port, then source port:
//! 53 decodes as DNS and 2152 as GTP-U with the built-in registry.

pub mod builder;
pub mod layout;
pub mod packet;

pub use builder::UdpBuilder;
pub use packet::{UdpHeader, UdpPacket};
