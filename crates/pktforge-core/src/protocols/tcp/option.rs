use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

use crate::codec::{BuildError, CodecError, DispatchTable, Element, RawView, check_width};
use crate::protocols::numbers::TcpOptionKind;

use super::layout;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TcpOption {
    EndOfOptionList,
    NoOperation,
    MaximumSegmentSize(u16),
    WindowScale(u8),
    SackPermitted,
    /// Left/right edges of each selectively acknowledged block.
    Sack(Vec<(u32, u32)>),
    Timestamps { value: u32, echo_reply: u32 },
    Unknown { kind: TcpOptionKind, data: Vec<u8> },
}

impl TcpOption {
    pub fn kind(&self) -> TcpOptionKind {
        match self {
            TcpOption::EndOfOptionList => TcpOptionKind::END_OF_OPTION_LIST,
            TcpOption::NoOperation => TcpOptionKind::NO_OPERATION,
            TcpOption::MaximumSegmentSize(_) => TcpOptionKind::MAXIMUM_SEGMENT_SIZE,
            TcpOption::WindowScale(_) => TcpOptionKind::WINDOW_SCALE,
            TcpOption::SackPermitted => TcpOptionKind::SACK_PERMITTED,
            TcpOption::Sack(_) => TcpOptionKind::SACK,
            TcpOption::Timestamps { .. } => TcpOptionKind::TIMESTAMPS,
            TcpOption::Unknown { kind, .. } => *kind,
        }
    }

    /// The whole option must fit its one-octet length field.
    pub fn validate(&self) -> Result<(), BuildError> {
        match self {
            TcpOption::EndOfOptionList | TcpOption::NoOperation => Ok(()),
            _ => check_width(
                "TCP",
                "option_length",
                self.length() as u64,
                layout::OPTION_LENGTH_BITS,
            ),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let kind = self.kind().value();
        match self {
            TcpOption::EndOfOptionList | TcpOption::NoOperation => {
                out.push(kind);
                return;
            }
            _ => out.extend_from_slice(&[kind, self.length() as u8]),
        }
        match self {
            TcpOption::MaximumSegmentSize(mss) => out.extend_from_slice(&mss.to_be_bytes()),
            TcpOption::WindowScale(shift) => out.push(*shift),
            TcpOption::Sack(blocks) => {
                for (left, right) in blocks {
                    out.extend_from_slice(&left.to_be_bytes());
                    out.extend_from_slice(&right.to_be_bytes());
                }
            }
            TcpOption::Timestamps { value, echo_reply } => {
                out.extend_from_slice(&value.to_be_bytes());
                out.extend_from_slice(&echo_reply.to_be_bytes());
            }
            TcpOption::Unknown { data, .. } => out.extend_from_slice(data),
            _ => {}
        }
    }
}

impl Element for TcpOption {
    fn length(&self) -> usize {
        match self {
            TcpOption::EndOfOptionList | TcpOption::NoOperation => 1,
            TcpOption::MaximumSegmentSize(_) => layout::MSS_OPTION_LEN,
            TcpOption::WindowScale(_) => layout::WINDOW_SCALE_OPTION_LEN,
            TcpOption::SackPermitted => layout::SACK_PERMITTED_OPTION_LEN,
            TcpOption::Sack(blocks) => {
                layout::OPTION_MIN_LEN + blocks.len() * layout::SACK_BLOCK_LEN
            }
            TcpOption::Timestamps { .. } => layout::TIMESTAMPS_OPTION_LEN,
            TcpOption::Unknown { data, .. } => layout::OPTION_MIN_LEN + data.len(),
        }
    }
}

impl fmt::Display for TcpOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Kind: {}]", self.kind())?;
        match self {
            TcpOption::MaximumSegmentSize(mss) => write!(f, " [MSS: {} bytes]", mss),
            TcpOption::WindowScale(shift) => write!(f, " [Shift count: {}]", shift),
            TcpOption::Sack(blocks) => {
                for (left, right) in blocks {
                    write!(f, " [{}-{}]", left, right)?;
                }
                Ok(())
            }
            TcpOption::Timestamps { value, echo_reply } => {
                write!(f, " [TS Value: {}] [TS Echo Reply: {}]", value, echo_reply)
            }
            TcpOption::Unknown { data, .. } => {
                write!(f, " [data: 0x{}]", crate::codec::packet::hex(data))
            }
            _ => Ok(()),
        }
    }
}

type OptionDecoder = fn(RawView<'_>) -> Result<TcpOption, CodecError>;

static OPTION_DECODERS: LazyLock<DispatchTable<OptionDecoder>> = LazyLock::new(|| {
    DispatchTable::new(decode_unknown as OptionDecoder)
        .with(TcpOptionKind::END_OF_OPTION_LIST.value(), decode_single_byte as OptionDecoder)
        .with(TcpOptionKind::NO_OPERATION.value(), decode_single_byte as OptionDecoder)
        .with(TcpOptionKind::MAXIMUM_SEGMENT_SIZE.value(), decode_mss as OptionDecoder)
        .with(TcpOptionKind::WINDOW_SCALE.value(), decode_window_scale as OptionDecoder)
        .with(TcpOptionKind::SACK_PERMITTED.value(), decode_sack_permitted as OptionDecoder)
        .with(TcpOptionKind::SACK.value(), decode_sack as OptionDecoder)
        .with(TcpOptionKind::TIMESTAMPS.value(), decode_timestamps as OptionDecoder)
});

pub fn decode_option(view: RawView<'_>) -> Result<TcpOption, CodecError> {
    let kind = view.read_u8(layout::OPTION_KIND_OFFSET)?;
    OPTION_DECODERS.get(kind)(view.within("TCP option"))
}

fn read_body<'a>(view: &RawView<'a>) -> Result<&'a [u8], CodecError> {
    let kind = view.read_u8(layout::OPTION_KIND_OFFSET)?;
    let length = usize::from(view.read_u8(layout::OPTION_LENGTH_OFFSET)?);
    if length < layout::OPTION_MIN_LEN {
        return Err(view.malformed(format!(
            "option {} length {} is below minimum {}",
            kind,
            length,
            layout::OPTION_MIN_LEN
        )));
    }
    view.read_slice(layout::OPTION_MIN_LEN..length)
}

fn read_fixed<'a>(view: &RawView<'a>, expected: usize) -> Result<&'a [u8], CodecError> {
    let body = read_body(view)?;
    if body.len() + layout::OPTION_MIN_LEN != expected {
        return Err(view.malformed(format!(
            "option length must be {}, got {}",
            expected,
            body.len() + layout::OPTION_MIN_LEN
        )));
    }
    Ok(body)
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn decode_single_byte(view: RawView<'_>) -> Result<TcpOption, CodecError> {
    match view.read_u8(layout::OPTION_KIND_OFFSET)? {
        0 => Ok(TcpOption::EndOfOptionList),
        _ => Ok(TcpOption::NoOperation),
    }
}

fn decode_mss(view: RawView<'_>) -> Result<TcpOption, CodecError> {
    let body = read_fixed(&view, layout::MSS_OPTION_LEN)?;
    Ok(TcpOption::MaximumSegmentSize(u16::from_be_bytes([body[0], body[1]])))
}

fn decode_window_scale(view: RawView<'_>) -> Result<TcpOption, CodecError> {
    let body = read_fixed(&view, layout::WINDOW_SCALE_OPTION_LEN)?;
    Ok(TcpOption::WindowScale(body[0]))
}

fn decode_sack_permitted(view: RawView<'_>) -> Result<TcpOption, CodecError> {
    read_fixed(&view, layout::SACK_PERMITTED_OPTION_LEN)?;
    Ok(TcpOption::SackPermitted)
}

fn decode_sack(view: RawView<'_>) -> Result<TcpOption, CodecError> {
    let body = read_body(&view)?;
    if body.len() % layout::SACK_BLOCK_LEN != 0 {
        return Err(view.malformed(format!(
            "SACK data length {} is not a multiple of {}",
            body.len(),
            layout::SACK_BLOCK_LEN
        )));
    }
    let blocks = body
        .chunks_exact(layout::SACK_BLOCK_LEN)
        .map(|block| (be_u32(&block[..4]), be_u32(&block[4..])))
        .collect();
    Ok(TcpOption::Sack(blocks))
}

fn decode_timestamps(view: RawView<'_>) -> Result<TcpOption, CodecError> {
    let body = read_fixed(&view, layout::TIMESTAMPS_OPTION_LEN)?;
    Ok(TcpOption::Timestamps {
        value: be_u32(&body[..4]),
        echo_reply: be_u32(&body[4..]),
    })
}

fn decode_unknown(view: RawView<'_>) -> Result<TcpOption, CodecError> {
    let kind = TcpOptionKind(view.read_u8(layout::OPTION_KIND_OFFSET)?);
    Ok(TcpOption::Unknown {
        kind,
        data: read_body(&view)?.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<TcpOption, CodecError> {
        decode_option(RawView::of("test", bytes))
    }

    #[test]
    fn syn_options_decode_and_re_encode() {
        let cases: [(&[u8], TcpOption); 4] = [
            (&[2, 4, 0x05, 0xb4], TcpOption::MaximumSegmentSize(1460)),
            (&[3, 3, 7], TcpOption::WindowScale(7)),
            (&[4, 2], TcpOption::SackPermitted),
            (
                &[8, 10, 0, 0, 0, 1, 0, 0, 0, 2],
                TcpOption::Timestamps {
                    value: 1,
                    echo_reply: 2,
                },
            ),
        ];
        for (bytes, expected) in cases {
            let option = decode(bytes).unwrap();
            assert_eq!(option, expected);
            let mut out = Vec::new();
            option.write_to(&mut out);
            assert_eq!(out, bytes);
        }
    }

    #[test]
    fn sack_blocks() {
        let bytes = [5, 10, 0, 0, 0, 10, 0, 0, 0, 20];
        assert_eq!(decode(&bytes).unwrap(), TcpOption::Sack(vec![(10, 20)]));
        let err = decode(&[5, 6, 0, 0, 0, 1]).unwrap_err();
        assert!(err.to_string().contains("multiple of 8"));
    }

    #[test]
    fn wrong_fixed_length_is_malformed() {
        let err = decode(&[2, 3, 5]).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn unknown_kind_keeps_data() {
        let option = decode(&[30, 4, 0xde, 0xad]).unwrap();
        assert_eq!(
            option,
            TcpOption::Unknown {
                kind: TcpOptionKind(30),
                data: vec![0xde, 0xad]
            }
        );
        assert_eq!(option.length(), 4);
    }
}
