//! Discriminator-keyed decoder dispatch.
//!
//! A `ProtocolRegistry` maps `(PayloadKind, code)` to a payload decoder. It
//! is assembled once through `RegistryBuilder` and never mutated afterwards,
//! so lookups from any thread need no locking. New protocols plug in by
//! building a registry with extra entries and decoding through
//! `decode_with`-style entry points; existing headers are untouched.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;
use tracing::debug;

use super::error::CodecError;
use super::packet::Packet;
use super::unknown::{IllegalPacket, UnknownPacket};
use super::view::RawView;

/// Decodes `data[offset..offset + length]` into a packet, dispatching any
/// nested payload through the same registry.
pub type PacketDecoder =
    fn(&ProtocolRegistry, &[u8], usize, usize) -> Result<Box<dyn Packet>, CodecError>;

/// Namespace of a payload discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PayloadKind {
    /// IPv4 protocol / IPv6 next header.
    IpNumber,
    TcpPort,
    UdpPort,
    /// Link-layer type of the encapsulated frame.
    DataLinkType,
    /// 802.11 `type << 4 | subtype`.
    Dot11FrameType,
    /// Bytes following an SSH2 message on the same stream.
    Ssh2Stream,
    /// GTP-U message type.
    GtpMessageType,
}

#[derive(Debug, Clone)]
pub struct ProtocolRegistry {
    exact: HashMap<(PayloadKind, u32), PacketDecoder>,
    defaults: HashMap<PayloadKind, PacketDecoder>,
}

static GLOBAL: LazyLock<ProtocolRegistry> =
    LazyLock::new(|| RegistryBuilder::with_defaults().build());

impl ProtocolRegistry {
    /// Registry with every built-in protocol, built on first use.
    pub fn global() -> &'static ProtocolRegistry {
        &GLOBAL
    }

    /// Empty builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Exact match only.
    pub fn lookup(&self, kind: PayloadKind, code: u32) -> Option<PacketDecoder> {
        self.exact.get(&(kind, code)).copied()
    }

    /// Exact match, then the kind's default, then opaque bytes.
    pub fn get(&self, kind: PayloadKind, code: u32) -> PacketDecoder {
        self.lookup(kind, code)
            .or_else(|| self.defaults.get(&kind).copied())
            .unwrap_or(UnknownPacket::decode)
    }

    /// Like `get`, trying `first` then `second` before falling back; used
    /// for port pairs where either side may carry the well-known port.
    pub fn get_pair(&self, kind: PayloadKind, first: u32, second: u32) -> PacketDecoder {
        self.lookup(kind, first)
            .or_else(|| self.lookup(kind, second))
            .or_else(|| self.defaults.get(&kind).copied())
            .unwrap_or(UnknownPacket::decode)
    }

    pub fn contains(&self, kind: PayloadKind, code: u32) -> bool {
        self.exact.contains_key(&(kind, code))
    }

    /// Run `decoder` over a payload window. A decoder that rejects its
    /// bytes yields an `IllegalPacket` so the enclosing header still decodes;
    /// only an invalid window is an error.
    pub fn decode_payload(
        &self,
        decoder: PacketDecoder,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        let view = RawView::new("payload", data, offset, length)?;
        match decoder(self, data, offset, length) {
            Ok(packet) => Ok(packet),
            Err(err) => {
                debug!(offset, length, error = %err, "payload decoder failed, keeping raw bytes");
                Ok(Box::new(IllegalPacket::new(view.bytes().to_vec(), err.to_string())))
            }
        }
    }

    pub fn decode(
        &self,
        kind: PayloadKind,
        code: u32,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        if !self.contains(kind, code) {
            debug!(?kind, code, "no exact decoder registered");
        }
        self.decode_payload(self.get(kind, code), data, offset, length)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    exact: HashMap<(PayloadKind, u32), PacketDecoder>,
    defaults: HashMap<PayloadKind, PacketDecoder>,
}

impl RegistryBuilder {
    /// Builder pre-populated with the built-in protocols.
    pub fn with_defaults() -> Self {
        crate::protocols::register_defaults(Self::default())
    }

    /// Add or replace the decoder for `(kind, code)`.
    pub fn register(mut self, kind: PayloadKind, code: u32, decoder: PacketDecoder) -> Self {
        self.exact.insert((kind, code), decoder);
        self
    }

    /// Decoder used for codes of `kind` with no exact entry.
    pub fn default_for(mut self, kind: PayloadKind, decoder: PacketDecoder) -> Self {
        self.defaults.insert(kind, decoder);
        self
    }

    pub fn build(self) -> ProtocolRegistry {
        ProtocolRegistry {
            exact: self.exact,
            defaults: self.defaults,
        }
    }
}

/// Fixed dispatch table for element families (options, information
/// elements, extension headers, record data), with a fallback decoder for
/// unknown codes.
#[derive(Debug, Clone)]
pub struct DispatchTable<F: Copy> {
    entries: HashMap<u32, F>,
    fallback: F,
}

impl<F: Copy> DispatchTable<F> {
    pub fn new(fallback: F) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    pub fn with(mut self, code: impl Into<u32>, decoder: F) -> Self {
        self.entries.insert(code.into(), decoder);
        self
    }

    pub fn get(&self, code: impl Into<u32>) -> F {
        self.entries
            .get(&code.into())
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn contains(&self, code: impl Into<u32>) -> bool {
        self.entries.contains_key(&code.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_fails(
        _: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        Err(RawView::new("failing", data, offset, length)?.too_short(length + 1))
    }

    #[test]
    fn unknown_code_falls_back_to_opaque_bytes() {
        let registry = ProtocolRegistry::builder().build();
        let packet = registry
            .decode(PayloadKind::TcpPort, 9999, &[1, 2, 3], 0, 3)
            .unwrap();
        assert_eq!(packet.protocol(), "Unknown");
        assert_eq!(packet.raw_data(), [1, 2, 3]);
    }

    #[test]
    fn failing_decoder_yields_illegal_packet() {
        let registry = ProtocolRegistry::builder()
            .register(PayloadKind::UdpPort, 7, always_fails)
            .build();
        let packet = registry
            .decode(PayloadKind::UdpPort, 7, &[9, 9], 0, 2)
            .unwrap();
        assert_eq!(packet.protocol(), "Illegal");
        assert_eq!(packet.length(), 2);
    }

    #[test]
    fn bad_window_is_an_error() {
        let registry = ProtocolRegistry::builder().build();
        let err = registry
            .decode(PayloadKind::UdpPort, 7, &[9, 9], 1, 2)
            .unwrap_err();
        assert!(matches!(err, CodecError::Bounds { .. }));
    }

    #[test]
    fn pair_lookup_prefers_first_match() {
        let registry = ProtocolRegistry::builder()
            .register(PayloadKind::TcpPort, 22, always_fails)
            .build();
        let decoder = registry.get_pair(PayloadKind::TcpPort, 50000, 22);
        assert_eq!(decoder as usize, always_fails as PacketDecoder as usize);
    }

    #[test]
    fn dispatch_table_falls_back() {
        let table = DispatchTable::new(0u8).with(3u8, 30u8);
        assert_eq!(table.get(3u8), 30);
        assert_eq!(table.get(4u8), 0);
        assert!(table.contains(3u8));
    }

    #[test]
    fn global_registry_has_builtins() {
        let registry = ProtocolRegistry::global();
        assert!(registry.contains(PayloadKind::IpNumber, 6));
        assert!(registry.contains(PayloadKind::UdpPort, 53));
    }
}
