use crate::codec::builder::length_field;
use crate::codec::{BuildError, BuildPolicy, Packet, PacketBuilder, check_width};
use crate::protocols::numbers::{DnsOpCode, DnsRCode};

use super::layout;
use super::packet::{DnsHeader, DnsPacket};
use super::record::{DnsQuestion, DnsResourceRecord};

const PROTOCOL: &str = "DNS";

/// Builder for a DNS message.
///
/// With `correct_length_at_build` the four section counts are taken from
/// the section lists; otherwise the supplied counts are written as is,
/// which allows deliberately inconsistent messages.
#[derive(Debug, Clone, Default)]
pub struct DnsBuilder {
    id: u16,
    qr: bool,
    opcode: DnsOpCode,
    aa: bool,
    tc: bool,
    rd: bool,
    ra: bool,
    z: bool,
    ad: bool,
    cd: bool,
    rcode: DnsRCode,
    qd_count: u16,
    an_count: u16,
    ns_count: u16,
    ar_count: u16,
    questions: Vec<DnsQuestion>,
    answers: Vec<DnsResourceRecord>,
    authorities: Vec<DnsResourceRecord>,
    additional_info: Vec<DnsResourceRecord>,
    policy: BuildPolicy,
}

impl DnsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_packet(packet: &DnsPacket) -> Self {
        let h = &packet.header;
        Self {
            id: h.id,
            qr: h.qr,
            opcode: h.opcode,
            aa: h.aa,
            tc: h.tc,
            rd: h.rd,
            ra: h.ra,
            z: h.z,
            ad: h.ad,
            cd: h.cd,
            rcode: h.rcode,
            qd_count: h.qd_count,
            an_count: h.an_count,
            ns_count: h.ns_count,
            ar_count: h.ar_count,
            questions: h.questions.clone(),
            answers: h.answers.clone(),
            authorities: h.authorities.clone(),
            additional_info: h.additional_info.clone(),
            policy: BuildPolicy::default(),
        }
    }

    pub fn id(mut self, id: u16) -> Self {
        self.id = id;
        self
    }

    pub fn response(mut self, on: bool) -> Self {
        self.qr = on;
        self
    }

    pub fn opcode(mut self, opcode: DnsOpCode) -> Self {
        self.opcode = opcode;
        self
    }

    pub fn authoritative_answer(mut self, on: bool) -> Self {
        self.aa = on;
        self
    }

    pub fn truncated(mut self, on: bool) -> Self {
        self.tc = on;
        self
    }

    pub fn recursion_desired(mut self, on: bool) -> Self {
        self.rd = on;
        self
    }

    pub fn recursion_available(mut self, on: bool) -> Self {
        self.ra = on;
        self
    }

    pub fn z(mut self, on: bool) -> Self {
        self.z = on;
        self
    }

    pub fn authentic_data(mut self, on: bool) -> Self {
        self.ad = on;
        self
    }

    pub fn checking_disabled(mut self, on: bool) -> Self {
        self.cd = on;
        self
    }

    pub fn rcode(mut self, rcode: DnsRCode) -> Self {
        self.rcode = rcode;
        self
    }

    pub fn qd_count(mut self, count: u16) -> Self {
        self.qd_count = count;
        self
    }

    pub fn an_count(mut self, count: u16) -> Self {
        self.an_count = count;
        self
    }

    pub fn ns_count(mut self, count: u16) -> Self {
        self.ns_count = count;
        self
    }

    pub fn ar_count(mut self, count: u16) -> Self {
        self.ar_count = count;
        self
    }

    pub fn question(mut self, question: DnsQuestion) -> Self {
        self.questions.push(question);
        self
    }

    pub fn questions(mut self, questions: Vec<DnsQuestion>) -> Self {
        self.questions = questions;
        self
    }

    pub fn answer(mut self, record: DnsResourceRecord) -> Self {
        self.answers.push(record);
        self
    }

    pub fn answers(mut self, records: Vec<DnsResourceRecord>) -> Self {
        self.answers = records;
        self
    }

    pub fn authorities(mut self, records: Vec<DnsResourceRecord>) -> Self {
        self.authorities = records;
        self
    }

    pub fn additional_info(mut self, records: Vec<DnsResourceRecord>) -> Self {
        self.additional_info = records;
        self
    }

    pub fn correct_length_at_build(mut self, on: bool) -> Self {
        self.policy.correct_length_at_build = on;
        self
    }

    pub fn policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<DnsPacket, BuildError> {
        check_width(
            PROTOCOL,
            "opcode",
            u64::from(self.opcode.value()),
            layout::OPCODE_BITS,
        )?;
        check_width(
            PROTOCOL,
            "rcode",
            u64::from(self.rcode.value()),
            layout::RCODE_BITS,
        )?;
        for record in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.additional_info)
        {
            if let Some(rdata) = record.rdata() {
                rdata.validate()?;
            }
        }

        let (qd_count, an_count, ns_count, ar_count) = if self.policy.correct_length_at_build {
            let count = |field: &'static str, len: usize| {
                length_field(PROTOCOL, field, len, layout::COUNT_BITS).map(|v| v as u16)
            };
            (
                count("qd_count", self.questions.len())?,
                count("an_count", self.answers.len())?,
                count("ns_count", self.authorities.len())?,
                count("ar_count", self.additional_info.len())?,
            )
        } else {
            (self.qd_count, self.an_count, self.ns_count, self.ar_count)
        };

        Ok(DnsPacket {
            header: DnsHeader {
                id: self.id,
                qr: self.qr,
                opcode: self.opcode,
                aa: self.aa,
                tc: self.tc,
                rd: self.rd,
                ra: self.ra,
                z: self.z,
                ad: self.ad,
                cd: self.cd,
                rcode: self.rcode,
                qd_count,
                an_count,
                ns_count,
                ar_count,
                questions: self.questions,
                answers: self.answers,
                authorities: self.authorities,
                additional_info: self.additional_info,
            },
        })
    }
}

impl PacketBuilder for DnsBuilder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::protocols::dns::{DnsDomainName, DnsRData};
    use crate::protocols::numbers::{DnsClass, DnsResourceRecordType};

    fn question() -> DnsQuestion {
        DnsQuestion::new(
            DnsDomainName::from_name("example.com").unwrap(),
            DnsResourceRecordType::A,
            DnsClass::IN,
        )
    }

    #[test]
    fn counts_follow_sections() {
        let answer = DnsResourceRecord::builder()
            .name(DnsDomainName::from_labels(Vec::new(), Some(12)).unwrap())
            .rr_type(DnsResourceRecordType::A)
            .class(DnsClass::IN)
            .ttl(300)
            .rdata(DnsRData::A(Ipv4Addr::new(192, 0, 2, 1)))
            .correct_length_at_build(true)
            .build()
            .unwrap();
        let packet = DnsBuilder::new()
            .id(7)
            .response(true)
            .recursion_desired(true)
            .question(question())
            .answer(answer)
            .correct_length_at_build(true)
            .build()
            .unwrap();
        assert_eq!(packet.header().qd_count(), 1);
        assert_eq!(packet.header().an_count(), 1);

        let bytes = packet.raw_data();
        let decoded = DnsPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn supplied_counts_are_kept() {
        let packet = DnsBuilder::new().question(question()).qd_count(3).build().unwrap();
        assert_eq!(packet.header().qd_count(), 3);
        let bytes = packet.raw_data();
        assert!(DnsPacket::new_packet(&bytes, 0, bytes.len()).is_err());
    }

    #[test]
    fn opcode_and_rcode_are_four_bits() {
        let err = DnsBuilder::new().opcode(DnsOpCode(16)).build().unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "opcode", max: 15, .. }));
        let err = DnsBuilder::new().rcode(DnsRCode(0x10)).build().unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "rcode", .. }));
    }

    #[test]
    fn to_builder_round_trips() {
        let packet = DnsBuilder::new()
            .id(0xbeef)
            .opcode(DnsOpCode::UPDATE)
            .rcode(DnsRCode::REFUSED)
            .authentic_data(true)
            .checking_disabled(true)
            .build()
            .unwrap();
        let rebuilt = packet.to_builder().build().unwrap();
        assert_eq!(rebuilt, packet);
        assert_eq!(rebuilt.raw_data()[2..4], [0x28, 0x35]);
    }
}
