use serde::Serialize;
use serde_json::Value;

use crate::codec::bits::put_u16;
use crate::codec::chain::{Element, parse_counted};
use crate::codec::packet::{Render, to_json_value};
use crate::codec::{ByteOrder, CodecError, Header, Packet, ProtocolRegistry, RawView, get_bits};
use crate::protocols::numbers::{DnsOpCode, DnsRCode};

use super::builder::DnsBuilder;
use super::layout;
use super::record::{DnsQuestion, DnsResourceRecord};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DnsHeader {
    pub(super) id: u16,
    pub(super) qr: bool,
    pub(super) opcode: DnsOpCode,
    pub(super) aa: bool,
    pub(super) tc: bool,
    pub(super) rd: bool,
    pub(super) ra: bool,
    pub(super) z: bool,
    pub(super) ad: bool,
    pub(super) cd: bool,
    pub(super) rcode: DnsRCode,
    pub(super) qd_count: u16,
    pub(super) an_count: u16,
    pub(super) ns_count: u16,
    pub(super) ar_count: u16,
    pub(super) questions: Vec<DnsQuestion>,
    pub(super) answers: Vec<DnsResourceRecord>,
    pub(super) authorities: Vec<DnsResourceRecord>,
    pub(super) additional_info: Vec<DnsResourceRecord>,
}

impl DnsHeader {
    /// Each section is decoded exactly as many times as its count says;
    /// bytes after the last section are not part of the message.
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::HEADER_LEN)?;
        let flags = view.read_u16_be(layout::FLAGS_RANGE.start)?;
        let qd_count = view.read_u16_be(layout::QD_COUNT_RANGE.start)?;
        let an_count = view.read_u16_be(layout::AN_COUNT_RANGE.start)?;
        let ns_count = view.read_u16_be(layout::NS_COUNT_RANGE.start)?;
        let ar_count = view.read_u16_be(layout::AR_COUNT_RANGE.start)?;

        let mut cursor = layout::HEADER_LEN;
        let questions = section(view, &mut cursor, "DNS question", qd_count, DnsQuestion::parse)?;
        let answers =
            section(view, &mut cursor, "DNS answer", an_count, DnsResourceRecord::parse)?;
        let authorities =
            section(view, &mut cursor, "DNS authority", ns_count, DnsResourceRecord::parse)?;
        let additional_info =
            section(view, &mut cursor, "DNS additional", ar_count, DnsResourceRecord::parse)?;

        Ok(Self {
            id: view.read_u16_be(layout::ID_RANGE.start)?,
            qr: flags & layout::QR_MASK != 0,
            opcode: DnsOpCode(get_bits(flags, layout::OPCODE_MASK, layout::OPCODE_SHIFT) as u8),
            aa: flags & layout::AA_MASK != 0,
            tc: flags & layout::TC_MASK != 0,
            rd: flags & layout::RD_MASK != 0,
            ra: flags & layout::RA_MASK != 0,
            z: flags & layout::Z_MASK != 0,
            ad: flags & layout::AD_MASK != 0,
            cd: flags & layout::CD_MASK != 0,
            rcode: DnsRCode((flags & layout::RCODE_MASK) as u8),
            qd_count,
            an_count,
            ns_count,
            ar_count,
            questions,
            answers,
            authorities,
            additional_info,
        })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// `true` for a response.
    pub fn is_response(&self) -> bool {
        self.qr
    }

    pub fn opcode(&self) -> DnsOpCode {
        self.opcode
    }

    pub fn is_authoritative_answer(&self) -> bool {
        self.aa
    }

    pub fn is_truncated(&self) -> bool {
        self.tc
    }

    pub fn is_recursion_desired(&self) -> bool {
        self.rd
    }

    pub fn is_recursion_available(&self) -> bool {
        self.ra
    }

    pub fn z(&self) -> bool {
        self.z
    }

    pub fn is_authentic_data(&self) -> bool {
        self.ad
    }

    pub fn is_checking_disabled(&self) -> bool {
        self.cd
    }

    pub fn rcode(&self) -> DnsRCode {
        self.rcode
    }

    pub fn qd_count(&self) -> u16 {
        self.qd_count
    }

    pub fn an_count(&self) -> u16 {
        self.an_count
    }

    pub fn ns_count(&self) -> u16 {
        self.ns_count
    }

    pub fn ar_count(&self) -> u16 {
        self.ar_count
    }

    pub fn questions(&self) -> &[DnsQuestion] {
        &self.questions
    }

    pub fn answers(&self) -> &[DnsResourceRecord] {
        &self.answers
    }

    pub fn authorities(&self) -> &[DnsResourceRecord] {
        &self.authorities
    }

    pub fn additional_info(&self) -> &[DnsResourceRecord] {
        &self.additional_info
    }

    fn records(&self) -> impl Iterator<Item = &DnsResourceRecord> {
        self.answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.additional_info)
    }

    fn flags(&self) -> u16 {
        let mut word =
            (u16::from(self.opcode.value()) << layout::OPCODE_SHIFT) & layout::OPCODE_MASK;
        word |= u16::from(self.rcode.value()) & layout::RCODE_MASK;
        for (on, mask) in [
            (self.qr, layout::QR_MASK),
            (self.aa, layout::AA_MASK),
            (self.tc, layout::TC_MASK),
            (self.rd, layout::RD_MASK),
            (self.ra, layout::RA_MASK),
            (self.z, layout::Z_MASK),
            (self.ad, layout::AD_MASK),
            (self.cd, layout::CD_MASK),
        ] {
            if on {
                word |= mask;
            }
        }
        word
    }
}

fn section<'a, E: Element>(
    view: &RawView<'a>,
    cursor: &mut usize,
    protocol: &'static str,
    count: u16,
    decode: fn(RawView<'a>) -> Result<E, CodecError>,
) -> Result<Vec<E>, CodecError> {
    let window = view.tail(*cursor)?.within(protocol);
    let chain = parse_counted(&window, usize::from(count), decode)?;
    *cursor += chain.consumed;
    Ok(chain.elements)
}

impl Header for DnsHeader {
    fn length(&self) -> usize {
        layout::HEADER_LEN
            + self.questions.iter().map(Element::length).sum::<usize>()
            + self.records().map(Element::length).sum::<usize>()
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        put_u16(&mut out, self.id, ByteOrder::BigEndian);
        put_u16(&mut out, self.flags(), ByteOrder::BigEndian);
        for count in [self.qd_count, self.an_count, self.ns_count, self.ar_count] {
            put_u16(&mut out, count, ByteOrder::BigEndian);
        }
        for question in &self.questions {
            question.write_to(&mut out);
        }
        for record in self.records() {
            record.write_to(&mut out);
        }
        out
    }

    fn render(&self, indent: usize) -> String {
        let mut render = Render::new(indent, "DNS Header", self.length());
        render
            .field("ID", format!("0x{:04x}", self.id))
            .field("QR", if self.qr { "response" } else { "query" })
            .field("OPCODE", self.opcode)
            .field("AA", self.aa)
            .field("TC", self.tc)
            .field("RD", self.rd)
            .field("RA", self.ra)
            .field("Z", self.z)
            .field("AD", self.ad)
            .field("CD", self.cd)
            .field("RCODE", self.rcode)
            .field("QDCOUNT", self.qd_count)
            .field("ANCOUNT", self.an_count)
            .field("NSCOUNT", self.ns_count)
            .field("ARCOUNT", self.ar_count);
        for question in &self.questions {
            render.field("Question", question);
        }
        for (name, section) in [
            ("Answer", &self.answers),
            ("Authority", &self.authorities),
            ("Additional", &self.additional_info),
        ] {
            for record in section {
                render.field(name, record);
            }
        }
        render.finish()
    }
}

/// A DNS message. DNS is a leaf protocol: it never has a payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsPacket {
    pub(super) header: DnsHeader,
}

impl DnsPacket {
    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        let view = RawView::new("DNS", data, offset, length)?;
        Ok(Self {
            header: DnsHeader::parse(&view)?,
        })
    }

    /// Registry-compatible entry point; DNS dispatches nothing further.
    pub fn decode(
        _registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        Ok(Box::new(Self::new_packet(data, offset, length)?))
    }

    pub fn builder() -> DnsBuilder {
        DnsBuilder::new()
    }

    pub fn to_builder(&self) -> DnsBuilder {
        DnsBuilder::from_packet(self)
    }

    pub fn header(&self) -> &DnsHeader {
        &self.header
    }
}

impl Packet for DnsPacket {
    fn protocol(&self) -> &'static str {
        "DNS"
    }

    fn header(&self) -> Option<&dyn Header> {
        Some(&self.header)
    }

    fn payload(&self) -> Option<&dyn Packet> {
        None
    }

    fn header_json(&self) -> Value {
        to_json_value(&self.header)
    }

    fn clone_packet(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::protocols::dns::DnsRData;
    use crate::protocols::numbers::{DnsClass, DnsResourceRecordType};

    /// Response to `example.com A`, answer name compressed to offset 12.
    const RESPONSE: [u8; 45] = [
        0x12, 0x34, 0x81, 0x80, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // header
        0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00, // qname
        0x00, 0x01, 0x00, 0x01, // qtype, qclass
        0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10, 0x00, 0x04, // answer
        93, 184, 216, 34,
    ];

    #[test]
    fn decodes_response() {
        let packet = DnsPacket::new_packet(&RESPONSE, 0, RESPONSE.len()).unwrap();
        let header = packet.header();
        assert_eq!(header.id(), 0x1234);
        assert!(header.is_response());
        assert!(header.is_recursion_desired());
        assert!(header.is_recursion_available());
        assert_eq!(header.opcode(), DnsOpCode::QUERY);
        assert_eq!(header.rcode(), DnsRCode::NO_ERROR);
        assert_eq!(header.questions().len(), 1);
        assert_eq!(header.questions()[0].qtype(), DnsResourceRecordType::A);
        assert_eq!(header.questions()[0].qclass(), DnsClass::IN);
        let answer = &header.answers()[0];
        assert_eq!(answer.name().decompress(&RESPONSE).unwrap(), "example.com");
        assert_eq!(
            answer.rdata(),
            Some(&DnsRData::A(Ipv4Addr::new(93, 184, 216, 34)))
        );
        assert_eq!(packet.length(), RESPONSE.len());
        assert_eq!(packet.raw_data(), RESPONSE);
    }

    #[test]
    fn header_with_one_question() {
        let mut query = RESPONSE[..29].to_vec();
        query[7] = 0; // ANCOUNT
        let packet = DnsPacket::new_packet(&query, 0, query.len()).unwrap();
        let questions = packet.header().questions();
        assert_eq!(questions.len(), 1);
        assert_eq!(packet.length(), 12 + questions[0].length());
    }

    #[test]
    fn missing_answer_is_an_error() {
        let err = DnsPacket::new_packet(&RESPONSE, 0, 29).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
        assert!(err.to_string().contains("expected 1 elements"));
    }

    #[test]
    fn truncated_answer_is_too_short() {
        let err = DnsPacket::new_packet(&RESPONSE, 0, 40).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { .. }));
    }

    #[test]
    fn short_header_is_too_short() {
        let err = DnsPacket::new_packet(&RESPONSE, 0, 11).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 12, actual: 11, .. }));
    }

    #[test]
    fn renders_sections() {
        let packet = DnsPacket::new_packet(&RESPONSE, 0, RESPONSE.len()).unwrap();
        let text = Packet::render(&packet, 0);
        assert!(text.contains("[DNS Header (45 bytes)]"));
        assert!(text.contains("Question: QNAME: example.com"));
        assert!(text.contains("Answer: NAME: [pointer: 12]"));
    }
}
