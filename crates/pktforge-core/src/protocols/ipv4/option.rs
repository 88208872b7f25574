use std::fmt;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use serde::Serialize;

use crate::codec::{BuildError, CodecError, DispatchTable, Element, RawView, check_width, get_bits};
use crate::protocols::numbers::IpV4OptionType;

use super::layout;

/// Timestamp option contents, by the option's flag nibble.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IpV4TimestampData {
    /// Flag 0: timestamps only.
    TimestampsOnly(Vec<u32>),
    /// Flags 1 and 3: address/timestamp pairs.
    AddressAndTimestamps(Vec<(Ipv4Addr, u32)>),
    /// Any other flag: bytes kept verbatim.
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum IpV4Option {
    EndOfOptionList,
    NoOperation,
    /// Record Route, Loose and Strict Source Route share this shape.
    Route {
        option_type: IpV4OptionType,
        pointer: u8,
        route: Vec<Ipv4Addr>,
    },
    Timestamp {
        pointer: u8,
        overflow: u8,
        flag: u8,
        data: IpV4TimestampData,
    },
    StreamId(u16),
    RouterAlert(u16),
    Unknown {
        option_type: IpV4OptionType,
        data: Vec<u8>,
    },
}

impl IpV4Option {
    pub fn option_type(&self) -> IpV4OptionType {
        match self {
            IpV4Option::EndOfOptionList => IpV4OptionType::END_OF_OPTION_LIST,
            IpV4Option::NoOperation => IpV4OptionType::NO_OPERATION,
            IpV4Option::Route { option_type, .. } => *option_type,
            IpV4Option::Timestamp { .. } => IpV4OptionType::TIMESTAMP,
            IpV4Option::StreamId(_) => IpV4OptionType::STREAM_ID,
            IpV4Option::RouterAlert(_) => IpV4OptionType::ROUTER_ALERT,
            IpV4Option::Unknown { option_type, .. } => *option_type,
        }
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if let IpV4Option::Timestamp { overflow, flag, .. } = self {
            check_width(
                "IPv4",
                "timestamp_overflow",
                u64::from(*overflow),
                layout::TIMESTAMP_OVERFLOW_BITS,
            )?;
            check_width("IPv4", "timestamp_flag", u64::from(*flag), layout::TIMESTAMP_FLAG_BITS)?;
        }
        match self {
            IpV4Option::EndOfOptionList | IpV4Option::NoOperation => Ok(()),
            _ => check_width(
                "IPv4",
                "option_length",
                self.length() as u64,
                layout::OPTION_LENGTH_BITS,
            ),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let option_type = self.option_type().value();
        match self {
            IpV4Option::EndOfOptionList | IpV4Option::NoOperation => out.push(option_type),
            IpV4Option::Route { pointer, route, .. } => {
                out.extend_from_slice(&[option_type, self.length() as u8, *pointer]);
                for addr in route {
                    out.extend_from_slice(&addr.octets());
                }
            }
            IpV4Option::Timestamp {
                pointer,
                overflow,
                flag,
                data,
            } => {
                out.extend_from_slice(&[
                    option_type,
                    self.length() as u8,
                    *pointer,
                    (overflow << 4) | (flag & layout::TIMESTAMP_FLAG_MASK),
                ]);
                match data {
                    IpV4TimestampData::TimestampsOnly(stamps) => {
                        for stamp in stamps {
                            out.extend_from_slice(&stamp.to_be_bytes());
                        }
                    }
                    IpV4TimestampData::AddressAndTimestamps(pairs) => {
                        for (addr, stamp) in pairs {
                            out.extend_from_slice(&addr.octets());
                            out.extend_from_slice(&stamp.to_be_bytes());
                        }
                    }
                    IpV4TimestampData::Raw(bytes) => out.extend_from_slice(bytes),
                }
            }
            IpV4Option::StreamId(value) | IpV4Option::RouterAlert(value) => {
                out.extend_from_slice(&[option_type, self.length() as u8]);
                out.extend_from_slice(&value.to_be_bytes());
            }
            IpV4Option::Unknown { data, .. } => {
                out.extend_from_slice(&[option_type, self.length() as u8]);
                out.extend_from_slice(data);
            }
        }
    }
}

impl Element for IpV4Option {
    fn length(&self) -> usize {
        match self {
            IpV4Option::EndOfOptionList | IpV4Option::NoOperation => 1,
            IpV4Option::Route { route, .. } => layout::ROUTE_OPTION_MIN_LEN + route.len() * 4,
            IpV4Option::Timestamp { data, .. } => {
                layout::TIMESTAMP_OPTION_MIN_LEN
                    + match data {
                        IpV4TimestampData::TimestampsOnly(stamps) => stamps.len() * 4,
                        IpV4TimestampData::AddressAndTimestamps(pairs) => pairs.len() * 8,
                        IpV4TimestampData::Raw(bytes) => bytes.len(),
                    }
            }
            IpV4Option::StreamId(_) => layout::STREAM_ID_OPTION_LEN,
            IpV4Option::RouterAlert(_) => layout::ROUTER_ALERT_OPTION_LEN,
            IpV4Option::Unknown { data, .. } => layout::OPTION_MIN_LEN + data.len(),
        }
    }
}

impl fmt::Display for IpV4Option {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[option-type: {}]", self.option_type())?;
        match self {
            IpV4Option::EndOfOptionList | IpV4Option::NoOperation => Ok(()),
            IpV4Option::Route { pointer, route, .. } => {
                let route = route.iter().map(|a| a.to_string()).collect::<Vec<_>>();
                write!(f, " [pointer: {}] [route: {}]", pointer, route.join(" "))
            }
            IpV4Option::Timestamp {
                pointer,
                overflow,
                flag,
                ..
            } => write!(f, " [pointer: {}] [overflow: {}] [flag: {}]", pointer, overflow, flag),
            IpV4Option::StreamId(id) => write!(f, " [stream id: {}]", id),
            IpV4Option::RouterAlert(value) => write!(f, " [value: {}]", value),
            IpV4Option::Unknown { data, .. } => {
                write!(f, " [data: 0x{}]", crate::codec::packet::hex(data))
            }
        }
    }
}

type OptionDecoder = fn(RawView<'_>) -> Result<IpV4Option, CodecError>;

static OPTION_DECODERS: LazyLock<DispatchTable<OptionDecoder>> = LazyLock::new(|| {
    DispatchTable::new(decode_unknown as OptionDecoder)
        .with(IpV4OptionType::END_OF_OPTION_LIST.value(), decode_single_byte as OptionDecoder)
        .with(IpV4OptionType::NO_OPERATION.value(), decode_single_byte as OptionDecoder)
        .with(IpV4OptionType::RECORD_ROUTE.value(), decode_route as OptionDecoder)
        .with(IpV4OptionType::LOOSE_SOURCE_ROUTING.value(), decode_route as OptionDecoder)
        .with(IpV4OptionType::STRICT_SOURCE_ROUTING.value(), decode_route as OptionDecoder)
        .with(IpV4OptionType::TIMESTAMP.value(), decode_timestamp as OptionDecoder)
        .with(IpV4OptionType::STREAM_ID.value(), decode_stream_id as OptionDecoder)
        .with(IpV4OptionType::ROUTER_ALERT.value(), decode_router_alert as OptionDecoder)
});

/// Decode the option starting at the first byte of `view`.
pub fn decode_option(view: RawView<'_>) -> Result<IpV4Option, CodecError> {
    let option_type = view.read_u8(layout::OPTION_TYPE_OFFSET)?;
    OPTION_DECODERS.get(option_type)(view.within("IPv4 option"))
}

/// Type/length/data prefix shared by all multi-byte options.
fn read_tlv<'a>(view: &RawView<'a>, min_len: usize) -> Result<(u8, &'a [u8]), CodecError> {
    view.require_len(layout::OPTION_MIN_LEN)?;
    let option_type = view.read_u8(layout::OPTION_TYPE_OFFSET)?;
    let length = view.read_u8(layout::OPTION_LENGTH_OFFSET)? as usize;
    if length < min_len {
        return Err(view.malformed(format!(
            "option {} length {} is below minimum {}",
            option_type, length, min_len
        )));
    }
    let data = view.read_slice(layout::OPTION_MIN_LEN..length)?;
    Ok((option_type, data))
}

fn decode_single_byte(view: RawView<'_>) -> Result<IpV4Option, CodecError> {
    match view.read_u8(layout::OPTION_TYPE_OFFSET)? {
        0 => Ok(IpV4Option::EndOfOptionList),
        _ => Ok(IpV4Option::NoOperation),
    }
}

fn decode_route(view: RawView<'_>) -> Result<IpV4Option, CodecError> {
    let (option_type, data) = read_tlv(&view, layout::ROUTE_OPTION_MIN_LEN)?;
    let (pointer, addrs) = data.split_at(1);
    if addrs.len() % 4 != 0 {
        return Err(view.malformed(format!(
            "route data length {} is not a multiple of 4",
            addrs.len()
        )));
    }
    let route = addrs
        .chunks_exact(4)
        .map(|c| Ipv4Addr::new(c[0], c[1], c[2], c[3]))
        .collect();
    Ok(IpV4Option::Route {
        option_type: IpV4OptionType(option_type),
        pointer: pointer[0],
        route,
    })
}

fn decode_timestamp(view: RawView<'_>) -> Result<IpV4Option, CodecError> {
    let (_, data) = read_tlv(&view, layout::TIMESTAMP_OPTION_MIN_LEN)?;
    let pointer = data[0];
    let overflow = get_bits(data[1], layout::TIMESTAMP_OVERFLOW_MASK, 4);
    let flag = get_bits(data[1], layout::TIMESTAMP_FLAG_MASK, 0);
    let body = &data[2..];
    let data = match flag {
        0 if body.len() % 4 == 0 => IpV4TimestampData::TimestampsOnly(
            body.chunks_exact(4)
                .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        1 | 3 if body.len() % 8 == 0 => IpV4TimestampData::AddressAndTimestamps(
            body.chunks_exact(8)
                .map(|c| {
                    (
                        Ipv4Addr::new(c[0], c[1], c[2], c[3]),
                        u32::from_be_bytes([c[4], c[5], c[6], c[7]]),
                    )
                })
                .collect(),
        ),
        _ => IpV4TimestampData::Raw(body.to_vec()),
    };
    Ok(IpV4Option::Timestamp {
        pointer,
        overflow,
        flag,
        data,
    })
}

fn read_fixed_u16(view: &RawView<'_>, expected: usize) -> Result<u16, CodecError> {
    let (option_type, data) = read_tlv(view, layout::OPTION_MIN_LEN)?;
    if data.len() + layout::OPTION_MIN_LEN != expected {
        return Err(view.malformed(format!(
            "option {} must be {} bytes, got {}",
            option_type,
            expected,
            data.len() + layout::OPTION_MIN_LEN
        )));
    }
    Ok(u16::from_be_bytes([data[0], data[1]]))
}

fn decode_stream_id(view: RawView<'_>) -> Result<IpV4Option, CodecError> {
    Ok(IpV4Option::StreamId(read_fixed_u16(&view, layout::STREAM_ID_OPTION_LEN)?))
}

fn decode_router_alert(view: RawView<'_>) -> Result<IpV4Option, CodecError> {
    Ok(IpV4Option::RouterAlert(read_fixed_u16(
        &view,
        layout::ROUTER_ALERT_OPTION_LEN,
    )?))
}

fn decode_unknown(view: RawView<'_>) -> Result<IpV4Option, CodecError> {
    let (option_type, data) = read_tlv(&view, layout::OPTION_MIN_LEN)?;
    Ok(IpV4Option::Unknown {
        option_type: IpV4OptionType(option_type),
        data: data.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(bytes: &[u8]) -> IpV4Option {
        let option = decode_option(RawView::of("test", bytes)).unwrap();
        let mut out = Vec::new();
        option.write_to(&mut out);
        assert_eq!(out, bytes);
        assert_eq!(option.length(), bytes.len());
        option
    }

    #[test]
    fn record_route_decodes_addresses() {
        let option = round_trip(&[7, 11, 4, 10, 0, 0, 1, 0, 0, 0, 0]);
        match option {
            IpV4Option::Route { pointer, route, .. } => {
                assert_eq!(pointer, 4);
                assert_eq!(route, [Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::UNSPECIFIED]);
            }
            other => panic!("unexpected option {other:?}"),
        }
    }

    #[test]
    fn timestamp_with_addresses() {
        let option = round_trip(&[68, 12, 5, 0x21, 192, 168, 0, 1, 0, 0, 1, 0]);
        match option {
            IpV4Option::Timestamp {
                overflow, flag, data, ..
            } => {
                assert_eq!(overflow, 2);
                assert_eq!(flag, 1);
                assert_eq!(
                    data,
                    IpV4TimestampData::AddressAndTimestamps(vec![(
                        Ipv4Addr::new(192, 168, 0, 1),
                        256
                    )])
                );
            }
            other => panic!("unexpected option {other:?}"),
        }
    }

    #[test]
    fn router_alert_and_unknown() {
        assert_eq!(round_trip(&[148, 4, 0, 0]), IpV4Option::RouterAlert(0));
        assert!(matches!(
            round_trip(&[30, 3, 0xaa]),
            IpV4Option::Unknown { .. }
        ));
    }

    #[test]
    fn length_below_two_is_malformed() {
        let err = decode_option(RawView::of("test", &[30, 1, 0])).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn length_past_window_is_too_short() {
        let err = decode_option(RawView::of("test", &[7, 11, 4, 10])).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { .. }));
    }

    #[test]
    fn misaligned_route_is_malformed() {
        let err = decode_option(RawView::of("test", &[131, 5, 4, 1, 2])).unwrap_err();
        assert!(err.to_string().contains("multiple of 4"));
    }
}
