//! pktforge core library: decode, inspect and build binary network packets.
//!
//! The `codec` module is the framework every format plugs into: a
//! bounds-checked `RawView` over the input, bit-field helpers, option and
//! element chains, the `Header`/`Packet` contract, builders with opt-in
//! length/checksum/padding correction, and a `ProtocolRegistry` that picks
//! the payload decoder from a discriminator (IP protocol number, port, link
//! type, 802.11 frame type, SSH2 stream position, GTP-U message type).
//! The `protocols` module holds the families built on it.
//!
//! Invariants:
//! - Decoding a valid packet and re-encoding it yields the input bytes.
//! - Decoders never read outside the window they are given.
//! - A payload that fails to decode is kept as an `IllegalPacket`; the
//!   enclosing header still decodes.
//!
//! Version française (résumé):
//! Cette crate décode, affiche et construit des paquets réseau binaires.
//! `codec` fournit le cadre commun (fenêtre bornée, champs de bits, chaînes
//! d'options, registre de décodeurs) et `protocols` les familles concrètes.
//! Décoder puis réencoder un paquet valide redonne exactement les octets
//! d'origine.
//!
//! # Examples
//! ```
//! use pktforge_core::{Packet, ProtocolRegistry, PayloadKind};
//!
//! // IPv4 / UDP / DNS query for "a.", decoded from the IP layer down.
//! let bytes = [
//!     0x45, 0x00, 0x00, 0x2f, 0x00, 0x01, 0x00, 0x00, 0x40, 0x11, 0x00, 0x00,
//!     0x0a, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x02,
//!     0x30, 0x39, 0x00, 0x35, 0x00, 0x1b, 0x00, 0x00,
//!     0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x01, b'a', 0x00, 0x00, 0x01, 0x00, 0x01,
//! ];
//! let registry = ProtocolRegistry::global();
//! let packet = registry.decode(PayloadKind::DataLinkType, 101, &bytes, 0, bytes.len())?;
//! assert_eq!(packet.protocol(), "IPv4");
//! assert_eq!(packet.raw_data(), bytes);
//! let dns = pktforge_core::find_layer(packet.as_ref(), "DNS").expect("DNS layer");
//! assert_eq!(dns.length(), 19);
//! # Ok::<(), pktforge_core::CodecError>(())
//! ```

pub mod codec;
pub mod protocols;

pub use codec::{
    BuildError, BuildPolicy, CodecError, Header, Packet, PacketBuilder, PacketDecoder,
    PayloadKind, ProtocolRegistry, RawView, RegistryBuilder, find_layer,
};
