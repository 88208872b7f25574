use serde::Serialize;
use serde_json::Value;

use crate::codec::packet::{Render, to_json_value};
use crate::codec::{CodecError, Header, Packet, PayloadKind, ProtocolRegistry, RawView};

use super::builder::Ssh2VersionExchangeBuilder;
use super::layout;

/// Identification line: `SSH-protoversion-softwareversion[ SP comments]`
/// followed by CR LF, or by a bare LF as some implementations send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Ssh2VersionExchangeHeader {
    pub(super) proto_version: String,
    pub(super) software_version: String,
    pub(super) comments: Option<String>,
    pub(super) crlf: bool,
}

impl Ssh2VersionExchangeHeader {
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::VERSION_PREFIX.len())?;
        if view.read_slice(0..layout::VERSION_PREFIX.len())? != layout::VERSION_PREFIX {
            return Err(view.malformed("identification line does not start with SSH-"));
        }
        let searched = view.len().min(layout::MAX_VERSION_LINE);
        let line_end = view
            .read_slice(0..searched)?
            .iter()
            .position(|&b| b == layout::LF)
            .ok_or_else(|| {
                view.malformed(format!(
                    "no line feed within the first {} bytes",
                    layout::MAX_VERSION_LINE
                ))
            })?;
        let mut text_end = line_end;
        let crlf = line_end > 0 && view.read_u8(line_end - 1)? == layout::CR;
        if crlf {
            text_end -= 1;
        }

        let text = view.read_slice(layout::VERSION_PREFIX.len()..text_end)?;
        let text = std::str::from_utf8(text)
            .map_err(|_| view.malformed("identification line is not US-ASCII"))?;
        let (proto_version, rest) = text
            .split_once('-')
            .ok_or_else(|| view.malformed("identification line has no software version"))?;
        let (software_version, comments) = match rest.split_once(' ') {
            Some((software, comments)) => (software, Some(comments.to_owned())),
            None => (rest, None),
        };
        Ok(Self {
            proto_version: proto_version.to_owned(),
            software_version: software_version.to_owned(),
            comments,
            crlf,
        })
    }

    /// `"2.0"`, or `"1.99"` from servers that also speak SSH1.
    pub fn proto_version(&self) -> &str {
        &self.proto_version
    }

    pub fn software_version(&self) -> &str {
        &self.software_version
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    /// Whether the line ends with CR LF rather than a bare LF.
    pub fn crlf(&self) -> bool {
        self.crlf
    }

    /// The line without its terminator.
    pub fn line(&self) -> String {
        let mut line = format!("SSH-{}-{}", self.proto_version, self.software_version);
        if let Some(comments) = &self.comments {
            line.push(' ');
            line.push_str(comments);
        }
        line
    }
}

impl Header for Ssh2VersionExchangeHeader {
    fn length(&self) -> usize {
        self.line().len() + if self.crlf { 2 } else { 1 }
    }

    fn raw_data(&self) -> Vec<u8> {
        let mut out = self.line().into_bytes();
        if self.crlf {
            out.push(layout::CR);
        }
        out.push(layout::LF);
        out
    }

    fn render(&self, indent: usize) -> String {
        Render::new(indent, "SSH2 Version Exchange Header", self.length())
            .field("Protocol version", &self.proto_version)
            .field("Software version", &self.software_version)
            .opt_field("Comments", self.comments.as_deref())
            .finish()
    }
}

/// The identification string each side sends first. Whatever follows it in
/// the same window goes back through the `Ssh2Stream` decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ssh2VersionExchangePacket {
    pub(super) header: Ssh2VersionExchangeHeader,
    pub(super) payload: Option<Box<dyn Packet>>,
}

impl Ssh2VersionExchangePacket {
    pub fn new_packet(data: &[u8], offset: usize, length: usize) -> Result<Self, CodecError> {
        Self::decode_with(ProtocolRegistry::global(), data, offset, length)
    }

    pub fn decode_with(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Self, CodecError> {
        let view = RawView::new("SSH2", data, offset, length)?;
        let header = Ssh2VersionExchangeHeader::parse(&view)?;
        let header_len = header.length();
        let payload = if view.len() == header_len {
            None
        } else {
            let decoder = registry.get(PayloadKind::Ssh2Stream, layout::VERSION_EXCHANGE_CODE);
            Some(registry.decode_payload(
                decoder,
                data,
                view.offset() + header_len,
                view.len() - header_len,
            )?)
        };
        Ok(Self { header, payload })
    }

    pub fn decode(
        registry: &ProtocolRegistry,
        data: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Box<dyn Packet>, CodecError> {
        Ok(Box::new(Self::decode_with(registry, data, offset, length)?))
    }

    pub fn builder() -> Ssh2VersionExchangeBuilder {
        Ssh2VersionExchangeBuilder::default()
    }

    pub fn to_builder(&self) -> Ssh2VersionExchangeBuilder {
        Ssh2VersionExchangeBuilder::from_packet(self)
    }

    pub fn header(&self) -> &Ssh2VersionExchangeHeader {
        &self.header
    }
}

impl Packet for Ssh2VersionExchangePacket {
    fn protocol(&self) -> &'static str {
        "SSH2 Version Exchange"
    }

    fn header(&self) -> Option<&dyn Header> {
        Some(&self.header)
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn header_json(&self) -> Value {
        to_json_value(&self.header)
    }

    fn clone_packet(&self) -> Box<dyn Packet> {
        Box::new(self.clone())
    }
}
