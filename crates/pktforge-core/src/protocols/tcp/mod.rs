//! TCP (RFC 793, RFC 7323, RFC 2018).
//!
//! Options are parsed like IPv4 options: a length-bounded chain ending at
//! End of Option List, where an undecodable trailing option stops the list
//! with a warning and its bytes are kept as padding.
//!
//! The payload decoder is looked up by destination port first, then source
//! port, so server-side well-known ports win in both directions.

pub mod builder;
pub mod layout;
pub mod option;
pub mod packet;

pub use builder::TcpBuilder;
pub use option::TcpOption;
pub use packet::{TcpHeader, TcpPacket};
