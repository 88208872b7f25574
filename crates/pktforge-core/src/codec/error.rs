use thiserror::Error;

/// Longest window rendered into an error dump; longer windows are elided.
pub const MAX_DUMP_BYTES: usize = 256;

/// Errors returned by decoding and by builders.
///
/// Every decode failure carries the protocol name, the window that was
/// handed in and a hex dump of it, so log lines can be matched back to the
/// offending bytes.
///
/// # Examples
/// ```
/// use pktforge_core::codec::{CodecError, RawView};
///
/// let data = [0x45u8, 0x00];
/// let err = RawView::new("IPv4", &data, 0, 2)
///     .and_then(|view| view.require_len(20))
///     .unwrap_err();
/// assert!(matches!(err, CodecError::TooShort { needed: 20, actual: 2, .. }));
/// assert!(err.to_string().contains("45 00"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid window: offset {offset} + length {length} exceeds buffer of {buffer_len} bytes")]
    Bounds {
        offset: usize,
        length: usize,
        buffer_len: usize,
    },
    #[error(
        "{protocol}: data too short: need {needed} bytes, got {actual} (offset: {offset}, length: {length}, data: {dump})"
    )]
    TooShort {
        protocol: &'static str,
        needed: usize,
        actual: usize,
        offset: usize,
        length: usize,
        dump: String,
    },
    #[error("{protocol}: {reason} (offset: {offset}, length: {length}, data: {dump})")]
    Malformed {
        protocol: &'static str,
        reason: String,
        offset: usize,
        length: usize,
        dump: String,
    },
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Errors raised synchronously by `build()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("{protocol}: missing required field `{field}`")]
    MissingField {
        protocol: &'static str,
        field: &'static str,
    },
    #[error("{protocol}: field `{field}` value {value} out of range (max {max})")]
    OutOfRange {
        protocol: &'static str,
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("{protocol}: {reason}")]
    Invalid {
        protocol: &'static str,
        reason: String,
    },
}

impl BuildError {
    pub fn invalid(protocol: &'static str, reason: impl Into<String>) -> Self {
        BuildError::Invalid {
            protocol,
            reason: reason.into(),
        }
    }
}

/// Render bytes as space-separated lowercase hex, eliding past `MAX_DUMP_BYTES`.
pub fn hex_dump(bytes: &[u8]) -> String {
    let shown = &bytes[..bytes.len().min(MAX_DUMP_BYTES)];
    let mut out = shown
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if bytes.len() > MAX_DUMP_BYTES {
        out.push_str(&format!(" ... ({} more)", bytes.len() - MAX_DUMP_BYTES));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{BuildError, MAX_DUMP_BYTES, hex_dump};

    #[test]
    fn hex_dump_spaces_bytes() {
        assert_eq!(hex_dump(&[0x00, 0xab, 0x10]), "00 ab 10");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn hex_dump_elides_long_windows() {
        let data = vec![0u8; MAX_DUMP_BYTES + 3];
        assert!(hex_dump(&data).ends_with("... (3 more)"));
    }

    #[test]
    fn out_of_range_names_field_and_bound() {
        let err = BuildError::OutOfRange {
            protocol: "IPv4",
            field: "fragment_offset",
            value: 0x2000,
            max: 0x1fff,
        };
        let msg = err.to_string();
        assert!(msg.contains("fragment_offset"));
        assert!(msg.contains("8191"));
    }
}
