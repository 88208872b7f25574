//! Radiotap capture headers (link type 127).
//!
//! The header announces its data fields through a chain of present words.
//! Fields with a known layout are decoded; everything after the first
//! unknown one is kept as raw bytes so the header still re-encodes exactly.
//! The 802.11 frame that follows is decoded with its FCS split off when the
//! Flags field says one is there.

pub mod builder;
pub mod field;
pub mod layout;
pub mod packet;

pub use builder::RadiotapBuilder;
pub use field::{FieldLayout, RadiotapDataField, RadiotapField, field_layout};
pub use packet::{RadiotapHeader, RadiotapPacket};
