use std::fmt::{self, Display, Write};
use std::hash::{Hash, Hasher};

use serde_json::{Value, json};

/// One protocol layer's metadata prefix.
///
/// A header knows its own encoded size and bytes; it never holds the
/// payload that follows it.
pub trait Header: fmt::Debug + Send + Sync {
    /// Encoded size in bytes.
    fn length(&self) -> usize;

    /// Encoded bytes; `raw_data().len() == length()`.
    fn raw_data(&self) -> Vec<u8>;

    /// Human-readable field dump, each line prefixed by `indent` spaces.
    fn render(&self, indent: usize) -> String;
}

/// A header plus an optional, exclusively owned, payload packet.
pub trait Packet: fmt::Debug + Send + Sync {
    /// Short protocol name, e.g. `"IPv4"`.
    fn protocol(&self) -> &'static str;

    fn header(&self) -> Option<&dyn Header>;

    fn payload(&self) -> Option<&dyn Packet>;

    fn header_json(&self) -> Value;

    fn clone_packet(&self) -> Box<dyn Packet>;

    fn length(&self) -> usize {
        self.header().map_or(0, |h| h.length()) + self.payload().map_or(0, |p| p.length())
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = self.header().map(|h| h.raw_data()).unwrap_or_default();
        if let Some(payload) = self.payload() {
            out.extend_from_slice(&payload.raw_data());
        }
        out
    }

    fn render(&self, indent: usize) -> String {
        let mut out = self.header().map(|h| h.render(indent)).unwrap_or_default();
        if let Some(payload) = self.payload() {
            out.push_str(&payload.render(indent));
        }
        out
    }

    fn to_json(&self) -> Value {
        json!({
            "protocol": self.protocol(),
            "length": self.length(),
            "header": self.header_json(),
            "payload": self.payload().map(|p| p.to_json()),
        })
    }
}

/// Walk a packet and its payload chain looking for a layer by protocol name.
pub fn find_layer<'a>(packet: &'a dyn Packet, protocol: &str) -> Option<&'a dyn Packet> {
    let mut next = Some(packet);
    while let Some(layer) = next {
        if layer.protocol() == protocol {
            return Some(layer);
        }
        next = layer.payload();
    }
    None
}

impl PartialEq for dyn Packet {
    fn eq(&self, other: &Self) -> bool {
        self.protocol() == other.protocol() && self.raw_data() == other.raw_data()
    }
}

impl Eq for dyn Packet {}

impl Hash for dyn Packet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.protocol().hash(state);
        self.raw_data().hash(state);
    }
}

impl Clone for Box<dyn Packet> {
    fn clone(&self) -> Self {
        self.clone_packet()
    }
}

/// Serialize a header for JSON output, degrading to `null` on failure.
pub(crate) fn to_json_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Builder for the indented diagnostic dump.
pub(crate) struct Render {
    out: String,
    indent: String,
}

impl Render {
    pub(crate) fn new(indent: usize, title: &str, length: usize) -> Self {
        let indent = " ".repeat(indent);
        let mut out = String::new();
        let _ = writeln!(out, "{indent}[{title} ({length} bytes)]");
        Self { out, indent }
    }

    pub(crate) fn field(&mut self, name: &str, value: impl Display) -> &mut Self {
        let _ = writeln!(self.out, "{}  {}: {}", self.indent, name, value);
        self
    }

    pub(crate) fn opt_field<T: Display>(&mut self, name: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.field(name, value);
        }
        self
    }

    pub(crate) fn bytes(&mut self, name: &str, bytes: &[u8]) -> &mut Self {
        if !bytes.is_empty() {
            self.field(name, format!("0x{}", hex(bytes)));
        }
        self
    }

    /// Nested block (already rendered with deeper indentation).
    pub(crate) fn block(&mut self, rendered: &str) -> &mut Self {
        self.out.push_str(rendered);
        self
    }

    pub(crate) fn finish(&mut self) -> String {
        std::mem::take(&mut self.out)
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::{Render, hex};

    #[test]
    fn render_indents_fields() {
        let text = Render::new(2, "Demo Header", 4)
            .field("Kind", 7)
            .opt_field::<u8>("Absent", None)
            .bytes("Data", &[0xab, 0x01])
            .finish();
        assert_eq!(text, "  [Demo Header (4 bytes)]\n    Kind: 7\n    Data: 0xab01\n");
    }

    #[test]
    fn hex_is_contiguous() {
        assert_eq!(hex(&[0x0f, 0xa0]), "0fa0");
    }
}
