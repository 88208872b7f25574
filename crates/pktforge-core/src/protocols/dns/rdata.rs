use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use serde::Serialize;

use crate::codec::packet::hex;
use crate::codec::{BuildError, CodecError, DispatchTable, Element, RawView, check_width};
use crate::protocols::numbers::DnsResourceRecordType;

use super::layout;
use super::name::{DnsDomainName, labels_as_text};

/// Record data, decoded according to the record type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum DnsRData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    /// NS, MD, MF, CNAME, MB, MG, MR and PTR all carry a single name.
    DomainName(DnsDomainName),
    Mx {
        preference: u16,
        exchange: DnsDomainName,
    },
    Txt(#[serde(serialize_with = "labels_as_text")] Vec<Vec<u8>>),
    Soa {
        mname: DnsDomainName,
        rname: DnsDomainName,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    Unknown(Vec<u8>),
}

impl DnsRData {
    /// Each TXT character-string carries a one-octet length, and the whole
    /// record data must fit RDLENGTH.
    pub fn validate(&self) -> Result<(), BuildError> {
        if let DnsRData::Txt(strings) = self {
            for string in strings {
                check_width(
                    "DNS",
                    "character_string_length",
                    string.len() as u64,
                    layout::CHARACTER_STRING_LEN_BITS,
                )?;
            }
        }
        check_width("DNS", "rd_length", self.length() as u64, layout::RD_LENGTH_BITS)
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            DnsRData::A(addr) => out.extend_from_slice(&addr.octets()),
            DnsRData::Aaaa(addr) => out.extend_from_slice(&addr.octets()),
            DnsRData::DomainName(name) => name.write_to(out),
            DnsRData::Mx {
                preference,
                exchange,
            } => {
                out.extend_from_slice(&preference.to_be_bytes());
                exchange.write_to(out);
            }
            DnsRData::Txt(strings) => {
                for string in strings {
                    out.push(string.len() as u8);
                    out.extend_from_slice(string);
                }
            }
            DnsRData::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                mname.write_to(out);
                rname.write_to(out);
                for value in [serial, refresh, retry, expire, minimum] {
                    out.extend_from_slice(&value.to_be_bytes());
                }
            }
            DnsRData::Unknown(data) => out.extend_from_slice(data),
        }
    }

    pub fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        self.write_to(&mut out);
        out
    }
}

impl Element for DnsRData {
    fn length(&self) -> usize {
        match self {
            DnsRData::A(_) => 4,
            DnsRData::Aaaa(_) => 16,
            DnsRData::DomainName(name) => name.length(),
            DnsRData::Mx { exchange, .. } => layout::MX_PREFERENCE_LEN + exchange.length(),
            DnsRData::Txt(strings) => strings.iter().map(|s| s.len() + 1).sum(),
            DnsRData::Soa { mname, rname, .. } => {
                mname.length() + rname.length() + layout::SOA_FIXED_LEN
            }
            DnsRData::Unknown(data) => data.len(),
        }
    }
}

impl fmt::Display for DnsRData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsRData::A(addr) => write!(f, "{}", addr),
            DnsRData::Aaaa(addr) => write!(f, "{}", addr),
            DnsRData::DomainName(name) => write!(f, "{}", name),
            DnsRData::Mx {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            DnsRData::Txt(strings) => {
                let strings = strings
                    .iter()
                    .map(|s| format!("\"{}\"", String::from_utf8_lossy(s)))
                    .collect::<Vec<_>>();
                f.write_str(&strings.join(" "))
            }
            DnsRData::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{} {} {} {} {} {} {}",
                mname, rname, serial, refresh, retry, expire, minimum
            ),
            DnsRData::Unknown(data) => write!(f, "0x{}", hex(data)),
        }
    }
}

type RDataDecoder = fn(RawView<'_>) -> Result<DnsRData, CodecError>;

static RDATA_DECODERS: LazyLock<DispatchTable<RDataDecoder>> = LazyLock::new(|| {
    let mut table = DispatchTable::new(decode_unknown as RDataDecoder)
        .with(DnsResourceRecordType::A.value(), decode_a as RDataDecoder)
        .with(DnsResourceRecordType::AAAA.value(), decode_aaaa as RDataDecoder)
        .with(DnsResourceRecordType::MX.value(), decode_mx as RDataDecoder)
        .with(DnsResourceRecordType::TXT.value(), decode_txt as RDataDecoder)
        .with(DnsResourceRecordType::SOA.value(), decode_soa as RDataDecoder);
    for rr_type in [
        DnsResourceRecordType::NS,
        DnsResourceRecordType::MD,
        DnsResourceRecordType::MF,
        DnsResourceRecordType::CNAME,
        DnsResourceRecordType::MB,
        DnsResourceRecordType::MG,
        DnsResourceRecordType::MR,
        DnsResourceRecordType::PTR,
    ] {
        table = table.with(rr_type.value(), decode_domain_name as RDataDecoder);
    }
    table
});

/// Decode RDATA occupying exactly `view`.
pub fn decode_rdata(
    rr_type: DnsResourceRecordType,
    view: RawView<'_>,
) -> Result<DnsRData, CodecError> {
    let rdata = RDATA_DECODERS.get(rr_type.value())(view.within("DNS RDATA"))?;
    if rdata.length() != view.len() {
        return Err(view.malformed(format!(
            "{} data covers {} bytes, RDLENGTH is {}",
            rr_type.name(),
            rdata.length(),
            view.len()
        )));
    }
    Ok(rdata)
}

fn decode_a(view: RawView<'_>) -> Result<DnsRData, CodecError> {
    let octets = view.read_array::<4>(0)?;
    Ok(DnsRData::A(Ipv4Addr::from(octets)))
}

fn decode_aaaa(view: RawView<'_>) -> Result<DnsRData, CodecError> {
    let octets = view.read_array::<16>(0)?;
    Ok(DnsRData::Aaaa(Ipv6Addr::from(octets)))
}

fn decode_domain_name(view: RawView<'_>) -> Result<DnsRData, CodecError> {
    Ok(DnsRData::DomainName(DnsDomainName::parse(&view)?))
}

fn decode_mx(view: RawView<'_>) -> Result<DnsRData, CodecError> {
    let preference = view.read_u16_be(0)?;
    let exchange = DnsDomainName::parse(&view.tail(layout::MX_PREFERENCE_LEN)?)?;
    Ok(DnsRData::Mx {
        preference,
        exchange,
    })
}

fn decode_txt(view: RawView<'_>) -> Result<DnsRData, CodecError> {
    let mut strings = Vec::new();
    let mut cursor = 0;
    while cursor < view.len() {
        let len = usize::from(view.read_u8(cursor)?);
        strings.push(view.read_slice(cursor + 1..cursor + 1 + len)?.to_vec());
        cursor += 1 + len;
    }
    Ok(DnsRData::Txt(strings))
}

fn decode_soa(view: RawView<'_>) -> Result<DnsRData, CodecError> {
    let mname = DnsDomainName::parse(&view)?;
    let rest = view.tail(mname.length())?;
    let rname = DnsDomainName::parse(&rest)?;
    let fixed = rest.tail(rname.length())?;
    fixed.require_len(layout::SOA_FIXED_LEN)?;
    Ok(DnsRData::Soa {
        mname,
        rname,
        serial: fixed.read_u32_be(0)?,
        refresh: fixed.read_u32_be(4)?,
        retry: fixed.read_u32_be(8)?,
        expire: fixed.read_u32_be(12)?,
        minimum: fixed.read_u32_be(16)?,
    })
}

fn decode_unknown(view: RawView<'_>) -> Result<DnsRData, CodecError> {
    Ok(DnsRData::Unknown(view.bytes().to_vec()))
}
