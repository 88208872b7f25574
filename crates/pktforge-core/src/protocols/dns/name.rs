use std::fmt;

use serde::{Serialize, Serializer};

use crate::codec::{BuildError, CodecError, Element, RawView};

use super::layout;

/// A domain name as it appears on the wire: zero or more labels, then
/// either the root label or a compression pointer.
///
/// Pointers are kept as is so the name re-encodes to the same bytes; use
/// [`DnsDomainName::decompress`] to resolve them against the message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DnsDomainName {
    #[serde(serialize_with = "labels_as_text")]
    labels: Vec<Vec<u8>>,
    pointer: Option<u16>,
}

pub(super) fn labels_as_text<S: Serializer>(
    labels: &[Vec<u8>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(labels.iter().map(|label| String::from_utf8_lossy(label)))
}

impl DnsDomainName {
    /// The root name (a single zero byte on the wire).
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted name such as `"www.example.com"`. A trailing dot is
    /// allowed; an empty string or `"."` is the root.
    pub fn from_name(name: &str) -> Result<Self, BuildError> {
        let trimmed = name.strip_suffix('.').unwrap_or(name);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let labels = trimmed
            .split('.')
            .map(|label| label.as_bytes().to_vec())
            .collect();
        Self::from_labels(labels, None)
    }

    /// Labels followed by an optional compression pointer.
    pub fn from_labels(labels: Vec<Vec<u8>>, pointer: Option<u16>) -> Result<Self, BuildError> {
        for label in &labels {
            if label.is_empty() || label.len() > layout::MAX_LABEL_LEN {
                return Err(BuildError::invalid(
                    "DNS",
                    format!(
                        "label length {} outside 1..={}",
                        label.len(),
                        layout::MAX_LABEL_LEN
                    ),
                ));
            }
        }
        if let Some(pointer) = pointer {
            crate::codec::check_width("DNS", "pointer", u64::from(pointer), 14)?;
        }
        let name = Self { labels, pointer };
        if name.pointer.is_none() && name.length() > layout::MAX_NAME_LEN {
            return Err(BuildError::invalid(
                "DNS",
                format!("name length {} exceeds {}", name.length(), layout::MAX_NAME_LEN),
            ));
        }
        Ok(name)
    }

    pub(super) fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        let mut labels = Vec::new();
        let mut cursor = 0;
        loop {
            let len = view.read_u8(cursor)?;
            match len & layout::LABEL_TYPE_MASK {
                layout::POINTER_TAG => {
                    let pointer = view.read_u16_be(cursor)? & layout::POINTER_OFFSET_MASK;
                    return Ok(Self {
                        labels,
                        pointer: Some(pointer),
                    });
                }
                0 if len == 0 => {
                    return Ok(Self {
                        labels,
                        pointer: None,
                    });
                }
                0 => {
                    let start = cursor + 1;
                    let label = view.read_slice(start..start + usize::from(len))?;
                    labels.push(label.to_vec());
                    cursor = start + usize::from(len);
                }
                _ => {
                    return Err(view.malformed(format!("unsupported label type 0x{:02x}", len)));
                }
            }
        }
    }

    pub fn labels(&self) -> &[Vec<u8>] {
        &self.labels
    }

    pub fn pointer(&self) -> Option<u16> {
        self.pointer
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty() && self.pointer.is_none()
    }

    /// Dotted form of the literal labels, without following the pointer.
    pub fn name(&self) -> String {
        self.labels
            .iter()
            .map(|label| String::from_utf8_lossy(label))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Resolve compression pointers against the whole DNS `message` and
    /// return the full dotted name.
    ///
    /// # Examples
    /// ```
    /// use pktforge_core::protocols::dns::DnsDomainName;
    ///
    /// // "a.b" at offset 0, then "c" + pointer to offset 0.
    /// let message = [1, b'a', 1, b'b', 0, 1, b'c', 0xc0, 0x00];
    /// let name = DnsDomainName::from_labels(vec![b"c".to_vec()], Some(0))?;
    /// assert_eq!(name.decompress(&message)?, "c.a.b");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn decompress(&self, message: &[u8]) -> Result<String, CodecError> {
        let whole = RawView::of("DNS", message);
        let mut labels = self.labels.clone();
        let mut next = self.pointer;
        let mut hops = 0;
        while let Some(offset) = next {
            hops += 1;
            if hops > layout::MAX_POINTER_HOPS {
                return Err(whole.malformed(format!(
                    "compression pointer loop after {} hops",
                    layout::MAX_POINTER_HOPS
                )));
            }
            let target = Self::parse(&whole.tail(usize::from(offset))?)?;
            labels.extend(target.labels);
            next = target.pointer;
        }
        Ok(Self {
            labels,
            pointer: None,
        }
        .name())
    }

    pub(super) fn write_to(&self, out: &mut Vec<u8>) {
        for label in &self.labels {
            out.push(label.len() as u8);
            out.extend_from_slice(label);
        }
        match self.pointer {
            Some(pointer) => {
                out.extend_from_slice(&(0xc000 | pointer).to_be_bytes());
            }
            None => out.push(0),
        }
    }

    pub fn raw_data(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        self.write_to(&mut out);
        out
    }
}

impl Element for DnsDomainName {
    fn length(&self) -> usize {
        let labels: usize = self.labels.iter().map(|label| label.len() + 1).sum();
        labels
            + if self.pointer.is_some() {
                layout::POINTER_LEN
            } else {
                1
            }
    }
}

impl fmt::Display for DnsDomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<ROOT>");
        }
        f.write_str(&self.name())?;
        if let Some(pointer) = self.pointer {
            if !self.labels.is_empty() {
                f.write_str(".")?;
            }
            write!(f, "[pointer: {}]", pointer)?;
        }
        Ok(())
    }
}
