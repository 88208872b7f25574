//! SSH2 data type representations (RFC 4251 section 5).

use std::fmt;

use serde::Serialize;

use crate::codec::bits::put_u32;
use crate::codec::packet::hex;
use crate::codec::{BuildError, ByteOrder, CodecError, Element, RawView};

use super::layout;

const PROTOCOL: &str = "SSH2";

/// `string`: a uint32 length followed by that many arbitrary bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Ssh2String(Vec<u8>);

impl Ssh2String {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(data.into())
    }

    /// Decode the string at the start of `view`.
    pub fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        let len = view.read_u32_be(0)? as usize;
        let data = view.read_slice(layout::STRING_LENGTH_LEN..layout::STRING_LENGTH_LEN + len)?;
        Ok(Self(data.to_vec()))
    }

    pub fn data(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        put_u32(out, self.0.len() as u32, ByteOrder::BigEndian);
        out.extend_from_slice(&self.0);
    }
}

impl Element for Ssh2String {
    fn length(&self) -> usize {
        layout::STRING_LENGTH_LEN + self.0.len()
    }
}

impl fmt::Display for Ssh2String {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) if text.chars().all(|c| !c.is_control()) => write!(f, "\"{}\"", text),
            _ => write!(f, "0x{}", hex(&self.0)),
        }
    }
}

/// `name-list`: a `string` of comma-separated US-ASCII names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Ssh2NameList(Vec<String>);

impl Ssh2NameList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        let raw = Ssh2String::parse(view)?;
        if !raw.data().is_ascii() {
            return Err(view.malformed("name-list is not US-ASCII"));
        }
        let text = String::from_utf8_lossy(raw.data());
        if text.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self(text.split(',').map(str::to_owned).collect()))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    fn joined(&self) -> String {
        self.0.join(",")
    }

    /// Names must be non-empty, US-ASCII and free of commas.
    pub fn validate(&self, field: &'static str) -> Result<(), BuildError> {
        let separator = char::from(layout::NAME_LIST_SEPARATOR);
        match self
            .0
            .iter()
            .find(|name| name.is_empty() || !name.is_ascii() || name.contains(separator))
        {
            Some(name) => Err(BuildError::invalid(
                PROTOCOL,
                format!("{}: invalid name {:?}", field, name),
            )),
            None => Ok(()),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        Ssh2String::new(self.joined()).write_to(out);
    }
}

impl Element for Ssh2NameList {
    fn length(&self) -> usize {
        let commas = self.0.len().saturating_sub(1);
        layout::STRING_LENGTH_LEN + self.0.iter().map(String::len).sum::<usize>() + commas
    }
}

impl fmt::Display for Ssh2NameList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// `mpint`: a two's complement big-endian integer in a `string`.
///
/// The bytes are kept as sent, so a non-minimal encoding still re-encodes
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Ssh2MpInt(Vec<u8>);

impl Ssh2MpInt {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Minimal encoding of a non-negative magnitude: leading zeros
    /// stripped, and a zero byte prepended when the top bit is set.
    pub fn from_unsigned(magnitude: &[u8]) -> Self {
        let start = magnitude
            .iter()
            .position(|&b| b != 0)
            .unwrap_or(magnitude.len());
        let digits = &magnitude[start..];
        let mut bytes = Vec::with_capacity(digits.len() + 1);
        if digits.first().is_some_and(|b| b & 0x80 != 0) {
            bytes.push(0);
        }
        bytes.extend_from_slice(digits);
        Self(bytes)
    }

    pub fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        Ok(Self(Ssh2String::parse(view)?.0))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.first().is_some_and(|b| b & 0x80 != 0)
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        put_u32(out, self.0.len() as u32, ByteOrder::BigEndian);
        out.extend_from_slice(&self.0);
    }
}

impl Element for Ssh2MpInt {
    fn length(&self) -> usize {
        layout::STRING_LENGTH_LEN + self.0.len()
    }
}

impl fmt::Display for Ssh2MpInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

/// `boolean`: one octet, any non-zero value is true. The octet is kept
/// as sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Ssh2Boolean(u8);

impl Ssh2Boolean {
    pub fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        Ok(Self(view.read_u8(0)?))
    }

    pub fn value(self) -> bool {
        self.0 != 0
    }

    pub fn raw(self) -> u8 {
        self.0
    }
}

impl From<bool> for Ssh2Boolean {
    fn from(value: bool) -> Self {
        Self(u8::from(value))
    }
}

impl Element for Ssh2Boolean {
    fn length(&self) -> usize {
        1
    }
}

impl fmt::Display for Ssh2Boolean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_reads_its_length_prefix() {
        let data = [0, 0, 0, 7, b't', b'e', b's', b't', b'i', b'n', b'g', 0xff];
        let string = Ssh2String::parse(&RawView::of("SSH2", &data)).unwrap();
        assert_eq!(string.as_str(), Some("testing"));
        assert_eq!(string.length(), 11);
        assert_eq!(string.to_string(), "\"testing\"");
    }

    #[test]
    fn string_longer_than_window_is_too_short() {
        let data = [0, 0, 0, 9, b'a'];
        let err = Ssh2String::parse(&RawView::of("SSH2", &data)).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { needed: 13, actual: 5, .. }));
    }

    #[test]
    fn name_lists() {
        let data = [0, 0, 0, 9, b'z', b'l', b'i', b'b', b',', b'n', b'o', b'n', b'e'];
        let list = Ssh2NameList::parse(&RawView::of("SSH2", &data)).unwrap();
        assert_eq!(list.names(), ["zlib", "none"]);
        assert_eq!(list.length(), data.len());
        let mut out = Vec::new();
        list.write_to(&mut out);
        assert_eq!(out, data);

        let empty = Ssh2NameList::parse(&RawView::of("SSH2", &[0, 0, 0, 0])).unwrap();
        assert!(empty.names().is_empty());
        assert_eq!(empty.length(), 4);

        assert!(Ssh2NameList::new(["a,b"]).validate("kex_algorithms").is_err());
        assert!(Ssh2NameList::new([""]).validate("kex_algorithms").is_err());
        assert!(Ssh2NameList::new(["none"]).validate("kex_algorithms").is_ok());
    }

    #[test]
    fn mpint_examples_from_rfc_4251() {
        assert!(Ssh2MpInt::from_unsigned(&[0]).bytes().is_empty());
        assert_eq!(
            Ssh2MpInt::from_unsigned(&[0x09, 0xa3, 0x78, 0xf9, 0xb2, 0xe3, 0x32, 0xa7]).bytes(),
            [0x09, 0xa3, 0x78, 0xf9, 0xb2, 0xe3, 0x32, 0xa7]
        );
        assert_eq!(Ssh2MpInt::from_unsigned(&[0x00, 0x80]).bytes(), [0x00, 0x80]);
        assert!(Ssh2MpInt::new(vec![0xed, 0xcc]).is_negative());
        assert!(!Ssh2MpInt::from_unsigned(&[0x80]).is_negative());
    }

    #[test]
    fn boolean_keeps_its_octet() {
        let flag = Ssh2Boolean::parse(&RawView::of("SSH2", &[2])).unwrap();
        assert!(flag.value());
        assert_eq!(flag.raw(), 2);
        assert_eq!(Ssh2Boolean::from(false).raw(), 0);
    }
}
