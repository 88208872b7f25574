//! Codec framework shared by every protocol family.
//!
//! The pieces layer the same way in every format:
//! - `view`: the bounds-checked window every decode starts from
//! - `bits`: bit-field and endianness helpers
//! - `chain`: option/element sequence parsing
//! - `packet`: the `Header`/`Packet` contract and diagnostic rendering
//! - `builder`: build policies and the shared build pipeline steps
//! - `registry`: discriminator-keyed payload dispatch
//! - `checksum`: the Internet checksum, pseudo-headers and CRC-32
//! - `error`: explicit, actionable errors
//!
//! Decoding and building are pure: no I/O, no shared mutable state.

pub mod bits;
pub mod builder;
pub mod chain;
pub mod checksum;
pub mod error;
pub mod named;
pub mod packet;
pub mod registry;
pub mod unknown;
pub mod view;

pub use bits::{ByteOrder, check_width, get_bits, get_flag, set_bits, set_flag};
pub use builder::{BuildPolicy, PacketBuilder, padding_len};
pub use chain::{Chain, ChainErrorPolicy, Element};
pub use checksum::{
    calc_checksum, calc_crc32, calc_pseudo_checksum, pseudo_header, pseudo_length_bits,
};
pub use error::{BuildError, CodecError};
pub use packet::{Header, Packet, find_layer};
pub use registry::{DispatchTable, PacketDecoder, PayloadKind, ProtocolRegistry, RegistryBuilder};
pub use unknown::{IllegalPacket, UnknownBuilder, UnknownPacket};
pub use view::RawView;
