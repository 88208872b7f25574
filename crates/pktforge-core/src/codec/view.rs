use std::ops::Range;

use super::bits::{ByteOrder, read_uint};
use super::error::{CodecError, hex_dump};

/// Bounds-validated window over a borrowed buffer.
///
/// All reads take offsets relative to the start of the window and fail with
/// `CodecError::TooShort` instead of panicking. Errors report the absolute
/// offset and the window length given by the caller.
///
/// # Examples
/// ```
/// use pktforge_core::codec::{ByteOrder, RawView};
///
/// let data = [0xffu8, 0x12, 0x34, 0x56];
/// let view = RawView::new("demo", &data, 1, 3)?;
/// assert_eq!(view.read_u16(0, ByteOrder::BigEndian)?, 0x1234);
/// assert_eq!(view.read_u16(0, ByteOrder::LittleEndian)?, 0x3412);
/// assert!(view.read_u8(3).is_err());
/// # Ok::<(), pktforge_core::codec::CodecError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RawView<'a> {
    protocol: &'static str,
    data: &'a [u8],
    offset: usize,
    length: usize,
}

impl<'a> RawView<'a> {
    /// Validate `offset + length <= data.len()`; the only bounds check a
    /// decode entry point performs before reading.
    pub fn new(
        protocol: &'static str,
        data: &'a [u8],
        offset: usize,
        length: usize,
    ) -> Result<Self, CodecError> {
        match offset.checked_add(length) {
            Some(end) if end <= data.len() => Ok(Self {
                protocol,
                data,
                offset,
                length,
            }),
            _ => Err(CodecError::Bounds {
                offset,
                length,
                buffer_len: data.len(),
            }),
        }
    }

    /// Window over a whole slice.
    pub fn of(protocol: &'static str, data: &'a [u8]) -> Self {
        Self {
            protocol,
            data,
            offset: 0,
            length: data.len(),
        }
    }

    /// Same window, reported under another protocol name.
    pub fn within(self, protocol: &'static str) -> Self {
        Self { protocol, ..self }
    }

    pub fn protocol(&self) -> &'static str {
        self.protocol
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The window's bytes.
    pub fn bytes(&self) -> &'a [u8] {
        &self.data[self.offset..self.offset + self.length]
    }

    /// The whole underlying buffer the window was cut from.
    pub fn buffer(&self) -> &'a [u8] {
        self.data
    }

    pub fn too_short(&self, needed: usize) -> CodecError {
        CodecError::TooShort {
            protocol: self.protocol,
            needed,
            actual: self.length,
            offset: self.offset,
            length: self.length,
            dump: hex_dump(self.bytes()),
        }
    }

    pub fn malformed(&self, reason: impl Into<String>) -> CodecError {
        CodecError::Malformed {
            protocol: self.protocol,
            reason: reason.into(),
            offset: self.offset,
            length: self.length,
            dump: hex_dump(self.bytes()),
        }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), CodecError> {
        if self.length < needed {
            return Err(self.too_short(needed));
        }
        Ok(())
    }

    pub fn read_slice(&self, range: Range<usize>) -> Result<&'a [u8], CodecError> {
        if range.start > range.end || range.end > self.length {
            return Err(self.too_short(range.end));
        }
        Ok(&self.data[self.offset + range.start..self.offset + range.end])
    }

    pub fn read_array<const N: usize>(&self, at: usize) -> Result<[u8; N], CodecError> {
        let bytes = self.read_slice(at..at + N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&self, at: usize) -> Result<u8, CodecError> {
        if at >= self.length {
            return Err(self.too_short(at + 1));
        }
        Ok(self.data[self.offset + at])
    }

    pub fn read_u16(&self, at: usize, order: ByteOrder) -> Result<u16, CodecError> {
        Ok(read_uint(self.read_slice(at..at + 2)?, order) as u16)
    }

    pub fn read_u16_be(&self, at: usize) -> Result<u16, CodecError> {
        self.read_u16(at, ByteOrder::BigEndian)
    }

    pub fn read_u24_be(&self, at: usize) -> Result<u32, CodecError> {
        Ok(read_uint(self.read_slice(at..at + 3)?, ByteOrder::BigEndian) as u32)
    }

    pub fn read_u32(&self, at: usize, order: ByteOrder) -> Result<u32, CodecError> {
        Ok(read_uint(self.read_slice(at..at + 4)?, order) as u32)
    }

    pub fn read_u32_be(&self, at: usize) -> Result<u32, CodecError> {
        self.read_u32(at, ByteOrder::BigEndian)
    }

    pub fn read_u64(&self, at: usize, order: ByteOrder) -> Result<u64, CodecError> {
        Ok(read_uint(self.read_slice(at..at + 8)?, order))
    }

    /// Sub-window starting at `start` (relative) spanning `len` bytes.
    pub fn sub(&self, start: usize, len: usize) -> Result<RawView<'a>, CodecError> {
        match start.checked_add(len) {
            Some(end) if end <= self.length => Ok(RawView {
                protocol: self.protocol,
                data: self.data,
                offset: self.offset + start,
                length: len,
            }),
            _ => Err(self.too_short(start.saturating_add(len))),
        }
    }

    /// Everything from `start` (relative) to the end of the window.
    pub fn tail(&self, start: usize) -> Result<RawView<'a>, CodecError> {
        if start > self.length {
            return Err(self.too_short(start));
        }
        self.sub(start, self.length - start)
    }
}

#[cfg(test)]
mod tests {
    use super::RawView;
    use crate::codec::{ByteOrder, CodecError};

    #[test]
    fn new_rejects_out_of_range_window() {
        let data = [0u8; 4];
        assert!(RawView::new("demo", &data, 0, 4).is_ok());
        assert!(RawView::new("demo", &data, 4, 0).is_ok());
        let err = RawView::new("demo", &data, 2, 3).unwrap_err();
        assert_eq!(
            err,
            CodecError::Bounds {
                offset: 2,
                length: 3,
                buffer_len: 4
            }
        );
        assert!(RawView::new("demo", &data, usize::MAX, 2).is_err());
    }

    #[test]
    fn reads_are_window_relative() {
        let data = [9u8, 1, 2, 3, 4, 5, 6, 7, 8];
        let view = RawView::new("demo", &data, 1, 8).unwrap();
        assert_eq!(view.read_u8(0).unwrap(), 1);
        assert_eq!(view.read_u24_be(0).unwrap(), 0x010203);
        assert_eq!(view.read_u32_be(4).unwrap(), 0x05060708);
        assert_eq!(
            view.read_u64(0, ByteOrder::LittleEndian).unwrap(),
            0x0807060504030201
        );
        assert_eq!(view.read_array::<2>(6).unwrap(), [7, 8]);
    }

    #[test]
    fn short_reads_report_window() {
        let data = [0u8; 6];
        let view = RawView::new("demo", &data, 2, 3).unwrap();
        match view.read_u32_be(0).unwrap_err() {
            CodecError::TooShort {
                protocol,
                needed,
                actual,
                offset,
                length,
                dump,
            } => {
                assert_eq!(protocol, "demo");
                assert_eq!(needed, 4);
                assert_eq!(actual, 3);
                assert_eq!(offset, 2);
                assert_eq!(length, 3);
                assert_eq!(dump, "00 00 00");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sub_and_tail_stay_inside_window() {
        let data = [0u8, 1, 2, 3, 4, 5];
        let view = RawView::new("demo", &data, 1, 4).unwrap();
        let sub = view.sub(1, 2).unwrap();
        assert_eq!(sub.bytes(), &[2, 3]);
        assert_eq!(sub.offset(), 2);
        assert_eq!(view.tail(4).unwrap().len(), 0);
        assert!(view.sub(3, 2).is_err());
        assert!(view.tail(5).is_err());
    }
}
