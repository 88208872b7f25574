use std::fmt;

use serde::Serialize;

use crate::codec::builder::{length_field, require};
use crate::codec::{BuildError, CodecError, Element, RawView};
use crate::protocols::numbers::{DnsClass, DnsResourceRecordType};

use super::layout;
use super::name::DnsDomainName;
use super::rdata::{DnsRData, decode_rdata};

/// An entry of the question section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DnsQuestion {
    qname: DnsDomainName,
    qtype: DnsResourceRecordType,
    qclass: DnsClass,
}

impl DnsQuestion {
    pub fn new(qname: DnsDomainName, qtype: DnsResourceRecordType, qclass: DnsClass) -> Self {
        Self {
            qname,
            qtype,
            qclass,
        }
    }

    pub fn parse(view: RawView<'_>) -> Result<Self, CodecError> {
        let qname = DnsDomainName::parse(&view)?;
        let fixed = view.sub(qname.length(), layout::QUESTION_FIXED_LEN)?;
        Ok(Self {
            qname,
            qtype: DnsResourceRecordType(fixed.read_u16_be(0)?),
            qclass: DnsClass(fixed.read_u16_be(2)?),
        })
    }

    pub fn qname(&self) -> &DnsDomainName {
        &self.qname
    }

    pub fn qtype(&self) -> DnsResourceRecordType {
        self.qtype
    }

    pub fn qclass(&self) -> DnsClass {
        self.qclass
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        self.qname.write_to(out);
        out.extend_from_slice(&self.qtype.value().to_be_bytes());
        out.extend_from_slice(&self.qclass.value().to_be_bytes());
    }
}

impl Element for DnsQuestion {
    fn length(&self) -> usize {
        self.qname.length() + layout::QUESTION_FIXED_LEN
    }
}

impl fmt::Display for DnsQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QNAME: {}, QTYPE: {}, QCLASS: {}",
            self.qname, self.qtype, self.qclass
        )
    }
}

/// An answer, authority or additional record.
///
/// `rdata` is `None` when RDLENGTH is zero (dynamic update deletions).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DnsResourceRecord {
    name: DnsDomainName,
    rr_type: DnsResourceRecordType,
    class: DnsClass,
    ttl: u32,
    rd_length: u16,
    rdata: Option<DnsRData>,
}

impl DnsResourceRecord {
    pub fn builder() -> DnsResourceRecordBuilder {
        DnsResourceRecordBuilder::default()
    }

    pub fn parse(view: RawView<'_>) -> Result<Self, CodecError> {
        let name = DnsDomainName::parse(&view)?;
        let fixed = view.sub(name.length(), layout::RECORD_FIXED_LEN)?;
        let rr_type = DnsResourceRecordType(fixed.read_u16_be(layout::RECORD_TYPE_OFFSET)?);
        let rd_length = fixed.read_u16_be(layout::RECORD_RD_LENGTH_OFFSET)?;
        let rdata = match rd_length {
            0 => None,
            len => {
                let rdata_view =
                    view.sub(name.length() + layout::RECORD_FIXED_LEN, usize::from(len))?;
                Some(decode_rdata(rr_type, rdata_view)?)
            }
        };
        Ok(Self {
            name,
            rr_type,
            class: DnsClass(fixed.read_u16_be(layout::RECORD_CLASS_OFFSET)?),
            ttl: fixed.read_u32_be(layout::RECORD_TTL_OFFSET)?,
            rd_length,
            rdata,
        })
    }

    pub fn name(&self) -> &DnsDomainName {
        &self.name
    }

    pub fn rr_type(&self) -> DnsResourceRecordType {
        self.rr_type
    }

    pub fn class(&self) -> DnsClass {
        self.class
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn rd_length(&self) -> u16 {
        self.rd_length
    }

    pub fn rdata(&self) -> Option<&DnsRData> {
        self.rdata.as_ref()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        self.name.write_to(out);
        out.extend_from_slice(&self.rr_type.value().to_be_bytes());
        out.extend_from_slice(&self.class.value().to_be_bytes());
        out.extend_from_slice(&self.ttl.to_be_bytes());
        out.extend_from_slice(&self.rd_length.to_be_bytes());
        if let Some(rdata) = &self.rdata {
            rdata.write_to(out);
        }
    }

    /// Builder pre-filled with this record.
    pub fn to_builder(&self) -> DnsResourceRecordBuilder {
        DnsResourceRecordBuilder {
            name: Some(self.name.clone()),
            rr_type: Some(self.rr_type),
            class: Some(self.class),
            ttl: self.ttl,
            rd_length: self.rd_length,
            rdata: self.rdata.clone(),
            correct_length_at_build: false,
        }
    }
}

impl Element for DnsResourceRecord {
    fn length(&self) -> usize {
        self.name.length()
            + layout::RECORD_FIXED_LEN
            + self.rdata.as_ref().map_or(0, Element::length)
    }
}

impl fmt::Display for DnsResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NAME: {}, TYPE: {}, CLASS: {}, TTL: {}, RDLENGTH: {}",
            self.name, self.rr_type, self.class, self.ttl, self.rd_length
        )?;
        if let Some(rdata) = &self.rdata {
            write!(f, ", RDATA: {}", rdata)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DnsResourceRecordBuilder {
    name: Option<DnsDomainName>,
    rr_type: Option<DnsResourceRecordType>,
    class: Option<DnsClass>,
    ttl: u32,
    rd_length: u16,
    rdata: Option<DnsRData>,
    correct_length_at_build: bool,
}

impl DnsResourceRecordBuilder {
    pub fn name(mut self, name: DnsDomainName) -> Self {
        self.name = Some(name);
        self
    }

    pub fn rr_type(mut self, rr_type: DnsResourceRecordType) -> Self {
        self.rr_type = Some(rr_type);
        self
    }

    pub fn class(mut self, class: DnsClass) -> Self {
        self.class = Some(class);
        self
    }

    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn rd_length(mut self, rd_length: u16) -> Self {
        self.rd_length = rd_length;
        self
    }

    pub fn rdata(mut self, rdata: DnsRData) -> Self {
        self.rdata = Some(rdata);
        self
    }

    /// Recompute RDLENGTH from the record data.
    pub fn correct_length_at_build(mut self, on: bool) -> Self {
        self.correct_length_at_build = on;
        self
    }

    pub fn build(self) -> Result<DnsResourceRecord, BuildError> {
        let name = require(self.name, "DNS", "name")?;
        let rr_type = require(self.rr_type, "DNS", "rr_type")?;
        let class = require(self.class, "DNS", "class")?;
        if let Some(rdata) = &self.rdata {
            rdata.validate()?;
        }
        let rd_length = if self.correct_length_at_build {
            let len = self.rdata.as_ref().map_or(0, Element::length);
            length_field("DNS", "rd_length", len, layout::RD_LENGTH_BITS)? as u16
        } else {
            self.rd_length
        };
        Ok(DnsResourceRecord {
            name,
            rr_type,
            class,
            ttl: self.ttl,
            rd_length,
            rdata: self.rdata,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn question_parses_name_and_fixed_part() {
        let bytes = b"\x07example\x03com\x00\x00\x01\x00\x01";
        let question = DnsQuestion::parse(RawView::of("DNS", bytes)).unwrap();
        assert_eq!(question.qname().name(), "example.com");
        assert_eq!(question.qtype(), DnsResourceRecordType::A);
        assert_eq!(question.qclass(), DnsClass::IN);
        assert_eq!(question.length(), bytes.len());
    }

    #[test]
    fn record_with_compressed_owner() {
        let bytes = [
            0xc0, 0x0c, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x0e, 0x10, 0x00, 0x04, 93, 184, 216,
            34,
        ];
        let record = DnsResourceRecord::parse(RawView::of("DNS", &bytes)).unwrap();
        assert_eq!(record.name().pointer(), Some(12));
        assert_eq!(record.ttl(), 3600);
        assert_eq!(record.rdata(), Some(&DnsRData::A(Ipv4Addr::new(93, 184, 216, 34))));
        assert_eq!(record.length(), bytes.len());
        let mut out = Vec::new();
        record.write_to(&mut out);
        assert_eq!(out, bytes);
    }

    #[test]
    fn rd_length_past_window_is_too_short() {
        let bytes = [0, 0x00, 0x01, 0x00, 0x01, 0, 0, 0, 0, 0x00, 0x08, 1, 2, 3, 4];
        let err = DnsResourceRecord::parse(RawView::of("DNS", &bytes)).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { .. }));
    }

    #[test]
    fn builder_recomputes_rd_length() {
        let record = DnsResourceRecord::builder()
            .name(DnsDomainName::from_name("example.com").unwrap())
            .rr_type(DnsResourceRecordType::TXT)
            .class(DnsClass::IN)
            .rdata(DnsRData::Txt(vec![b"v=spf1 -all".to_vec()]))
            .correct_length_at_build(true)
            .build()
            .unwrap();
        assert_eq!(record.rd_length(), 12);

        let err = DnsResourceRecord::builder().build().unwrap_err();
        assert!(matches!(err, BuildError::MissingField { field: "name", .. }));
    }

    #[test]
    fn character_strings_and_rdata_must_fit_their_length_fields() {
        let txt = |strings: Vec<Vec<u8>>| {
            DnsResourceRecord::builder()
                .name(DnsDomainName::from_name("example.com").unwrap())
                .rr_type(DnsResourceRecordType::TXT)
                .class(DnsClass::IN)
                .rdata(DnsRData::Txt(strings))
                .correct_length_at_build(true)
                .build()
        };

        let record = txt(vec![vec![b'a'; 255], b"tail".to_vec()]).unwrap();
        assert_eq!(record.rd_length(), 256 + 5);
        let mut bytes = Vec::new();
        record.write_to(&mut bytes);
        let decoded = DnsResourceRecord::parse(RawView::of("DNS", &bytes)).unwrap();
        assert_eq!(decoded, record);

        let err = txt(vec![vec![b'a'; 300]]).unwrap_err();
        assert!(matches!(
            err,
            BuildError::OutOfRange { field: "character_string_length", value: 300, .. }
        ));

        let err = DnsResourceRecord::builder()
            .name(DnsDomainName::from_name("example.com").unwrap())
            .rr_type(DnsResourceRecordType(65280))
            .class(DnsClass::IN)
            .rdata(DnsRData::Unknown(vec![0; 70_000]))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "rd_length", .. }));
    }
}
