use pktforge_core::codec::UnknownPacket;
use pktforge_core::protocols::udp::UdpPacket;
use pktforge_core::protocols::{self, dns::DnsPacket};
use pktforge_core::{CodecError, Packet, PayloadKind, ProtocolRegistry, RegistryBuilder};

const DNS_QUERY: [u8; 19] = [
    0x00, 0x07, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, b'a', 0x00,
    0x00, 0x01, 0x00, 0x01,
];

fn udp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&src_port.to_be_bytes());
    bytes.extend_from_slice(&dst_port.to_be_bytes());
    bytes.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    bytes.extend_from_slice(&[0, 0]);
    bytes.extend_from_slice(payload);
    bytes
}

fn payload_protocol(registry: &ProtocolRegistry, bytes: &[u8]) -> &'static str {
    let packet = UdpPacket::decode_with(registry, bytes, 0, bytes.len()).expect("decode udp");
    Packet::payload(&packet).map_or("none", |payload| payload.protocol())
}

#[test]
fn either_port_selects_the_decoder() {
    let registry = ProtocolRegistry::global();
    assert_eq!(payload_protocol(registry, &udp(40000, 53, &DNS_QUERY)), "DNS");
    assert_eq!(payload_protocol(registry, &udp(53, 40000, &DNS_QUERY)), "DNS");
    assert_eq!(payload_protocol(registry, &udp(40000, 40001, &DNS_QUERY)), "Unknown");
}

#[test]
fn rejected_payload_is_kept_as_illegal() {
    let registry = ProtocolRegistry::global();
    let bytes = udp(40000, 53, &DNS_QUERY[..5]);
    let packet = UdpPacket::decode_with(registry, &bytes, 0, bytes.len()).expect("decode udp");
    let payload = Packet::payload(&packet).expect("payload");
    assert_eq!(payload.protocol(), "Illegal");
    assert_eq!(payload.raw_data(), DNS_QUERY[..5]);
    assert_eq!(packet.raw_data(), bytes);
}

#[test]
fn custom_registry_adds_a_port_without_touching_udp() {
    let registry = RegistryBuilder::with_defaults()
        .register(PayloadKind::UdpPort, 5353, DnsPacket::decode)
        .build();
    let bytes = udp(5353, 5353, &DNS_QUERY);
    assert_eq!(payload_protocol(&registry, &bytes), "DNS");
    assert_eq!(payload_protocol(ProtocolRegistry::global(), &bytes), "Unknown");
}

#[test]
fn kind_default_applies_before_opaque_fallback() {
    fn always_dns(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        DnsPacket::decode(registry, data, offset, length)
    }

    let registry = ProtocolRegistry::builder()
        .default_for(PayloadKind::UdpPort, always_dns)
        .build();
    assert!(!registry.contains(PayloadKind::UdpPort, 9));
    assert_eq!(payload_protocol(&registry, &udp(9, 9, &DNS_QUERY)), "DNS");

    let empty = ProtocolRegistry::builder().build();
    assert_eq!(payload_protocol(&empty, &udp(53, 53, &DNS_QUERY)), "Unknown");
}

#[test]
fn default_registry_is_the_documented_set() {
    let registry = protocols::register_defaults(ProtocolRegistry::builder()).build();
    let global = ProtocolRegistry::global();
    for (kind, code) in [
        (PayloadKind::IpNumber, 6),
        (PayloadKind::UdpPort, 53),
        (PayloadKind::TcpPort, 22),
        (PayloadKind::DataLinkType, 127),
    ] {
        assert_eq!(registry.contains(kind, code), global.contains(kind, code));
        assert!(registry.contains(kind, code));
    }
    let decoded = registry
        .decode(PayloadKind::UdpPort, 53, &DNS_QUERY, 0, DNS_QUERY.len())
        .expect("dns");
    assert_eq!(decoded.protocol(), "DNS");

    let opaque = UnknownPacket::decode(&registry, &DNS_QUERY, 0, 4).expect("opaque");
    assert_eq!(opaque.raw_data(), DNS_QUERY[..4]);
}

#[test]
fn registry_is_shared_across_threads() {
    let bytes = udp(40000, 53, &DNS_QUERY);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| payload_protocol(ProtocolRegistry::global(), &bytes)))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("thread"), "DNS");
        }
    });
}
