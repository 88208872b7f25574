//! Element/option chain parsing.
//!
//! Three chain shapes share one invariant: each decoded element reports a
//! length in `1..=remaining`, otherwise the chain is malformed. This is what
//! keeps a hostile length byte from looping forever.
//!
//! - length-bounded: decode until the window is used up or a terminator
//!   element is seen; running out of bytes without a terminator is fine.
//! - counted: decode exactly `count` elements; running out early is an error.
//! - linked: every element names the type of the next one (GTP extension
//!   headers); a designated type ends the chain.

use tracing::warn;

use super::error::CodecError;
use super::view::RawView;

/// A self-delimiting sub-structure of a header.
pub trait Element {
    /// Encoded size in bytes, including any type/length prefix.
    fn length(&self) -> usize;
}

/// What a length-bounded chain does with an element that fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainErrorPolicy {
    /// Fail the whole header.
    Propagate,
    /// Log, keep what was decoded so far, and leave the rest unconsumed.
    StopAndLog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain<E> {
    pub elements: Vec<E>,
    /// Bytes covered by `elements`.
    pub consumed: usize,
}

fn checked_len<E: Element>(element: &E, remaining: &RawView<'_>) -> Result<usize, CodecError> {
    let len = element.length();
    if len == 0 || len > remaining.len() {
        return Err(remaining.malformed(format!(
            "element length {} outside 1..={}",
            len,
            remaining.len()
        )));
    }
    Ok(len)
}

pub fn parse_length_bounded<'a, E, D, T>(
    view: &RawView<'a>,
    policy: ChainErrorPolicy,
    mut decode: D,
    is_terminator: T,
) -> Result<Chain<E>, CodecError>
where
    E: Element,
    D: FnMut(RawView<'a>) -> Result<E, CodecError>,
    T: Fn(&E) -> bool,
{
    let mut elements = Vec::new();
    let mut cursor = 0;
    while cursor < view.len() {
        let remaining = view.tail(cursor)?;
        let step = decode(remaining).and_then(|element| {
            let len = checked_len(&element, &remaining)?;
            Ok((element, len))
        });
        let (element, len) = match step {
            Ok(step) => step,
            Err(err) if policy == ChainErrorPolicy::StopAndLog => {
                warn!(
                    protocol = view.protocol(),
                    offset = remaining.offset(),
                    error = %err,
                    "stopping element chain at unparsable element"
                );
                break;
            }
            Err(err) => return Err(err),
        };
        cursor += len;
        let stop = is_terminator(&element);
        elements.push(element);
        if stop {
            break;
        }
    }
    Ok(Chain {
        elements,
        consumed: cursor,
    })
}

pub fn parse_counted<'a, E, D>(
    view: &RawView<'a>,
    count: usize,
    mut decode: D,
) -> Result<Chain<E>, CodecError>
where
    E: Element,
    D: FnMut(RawView<'a>) -> Result<E, CodecError>,
{
    let mut elements = Vec::with_capacity(count.min(64));
    let mut cursor = 0;
    for index in 0..count {
        let remaining = view.tail(cursor)?;
        if remaining.is_empty() {
            return Err(remaining.malformed(format!(
                "expected {} elements, data ends after {}",
                count, index
            )));
        }
        let element = decode(remaining)?;
        cursor += checked_len(&element, &remaining)?;
        elements.push(element);
    }
    Ok(Chain {
        elements,
        consumed: cursor,
    })
}

pub fn parse_linked<'a, E, D, N>(
    view: &RawView<'a>,
    first_type: u8,
    terminator: u8,
    mut decode: D,
    next_type: N,
) -> Result<Chain<E>, CodecError>
where
    E: Element,
    D: FnMut(u8, RawView<'a>) -> Result<E, CodecError>,
    N: Fn(&E) -> u8,
{
    let mut elements = Vec::new();
    let mut cursor = 0;
    let mut kind = first_type;
    while kind != terminator {
        let remaining = view.tail(cursor)?;
        if remaining.is_empty() {
            return Err(remaining.too_short(1));
        }
        let element = decode(kind, remaining)?;
        cursor += checked_len(&element, &remaining)?;
        kind = next_type(&element);
        elements.push(element);
    }
    Ok(Chain {
        elements,
        consumed: cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tlv {
        kind: u8,
        len: usize,
        next: u8,
    }

    impl Element for Tlv {
        fn length(&self) -> usize {
            self.len
        }
    }

    fn decode_tlv(view: RawView<'_>) -> Result<Tlv, CodecError> {
        let kind = view.read_u8(0)?;
        if kind == 0 || kind == 1 {
            return Ok(Tlv { kind, len: 1, next: 0 });
        }
        let len = view.read_u8(1)? as usize;
        view.require_len(len)?;
        Ok(Tlv { kind, len, next: 0 })
    }

    #[test]
    fn length_bounded_stops_at_terminator() {
        let data = [1u8, 7, 3, 0, 0, 9, 9];
        let view = RawView::of("demo", &data);
        let chain = parse_length_bounded(
            &view,
            ChainErrorPolicy::Propagate,
            decode_tlv,
            |e: &Tlv| e.kind == 0,
        )
        .unwrap();
        assert_eq!(chain.elements.len(), 3);
        assert_eq!(chain.consumed, 5);
    }

    #[test]
    fn length_bounded_without_terminator_consumes_everything() {
        let data = [1u8, 7, 2, 0];
        let chain = parse_length_bounded(
            &RawView::of("demo", &data),
            ChainErrorPolicy::Propagate,
            decode_tlv,
            |e: &Tlv| e.kind == 0,
        )
        .unwrap();
        assert_eq!(chain.consumed, data.len());
    }

    #[test]
    fn zero_length_element_is_malformed() {
        let data = [7u8, 0, 1];
        let err = parse_length_bounded(
            &RawView::of("demo", &data),
            ChainErrorPolicy::Propagate,
            decode_tlv,
            |_: &Tlv| false,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn stop_and_log_keeps_decoded_prefix() {
        let data = [1u8, 1, 7, 9];
        let chain = parse_length_bounded(
            &RawView::of("demo", &data),
            ChainErrorPolicy::StopAndLog,
            decode_tlv,
            |_: &Tlv| false,
        )
        .unwrap();
        assert_eq!(chain.elements.len(), 2);
        assert_eq!(chain.consumed, 2);
    }

    #[test]
    fn counted_fails_on_truncation() {
        let data = [1u8, 1];
        let view = RawView::of("demo", &data);
        assert_eq!(parse_counted(&view, 2, decode_tlv).unwrap().consumed, 2);
        let err = parse_counted(&view, 3, decode_tlv).unwrap_err();
        assert!(err.to_string().contains("expected 3 elements"));
    }

    #[test]
    fn linked_follows_next_type() {
        let data = [5u8, 2, 6, 2];
        let mut seen = Vec::new();
        let chain = parse_linked(
            &RawView::of("demo", &data),
            5,
            0,
            |kind, view| {
                seen.push(kind);
                let len = view.read_u8(1)? as usize;
                let next = if kind == 5 { 6 } else { 0 };
                Ok(Tlv { kind, len, next })
            },
            |e: &Tlv| e.next,
        )
        .unwrap();
        assert_eq!(seen, [5, 6]);
        assert_eq!(chain.consumed, 4);
    }

    #[test]
    fn linked_requires_announced_element() {
        let data = [5u8, 2];
        let err = parse_linked(
            &RawView::of("demo", &data),
            5,
            0,
            |kind, view| {
                let len = view.read_u8(1)? as usize;
                Ok(Tlv { kind, len, next: 9 })
            },
            |e: &Tlv| e.next,
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::TooShort { .. }));
    }
}
