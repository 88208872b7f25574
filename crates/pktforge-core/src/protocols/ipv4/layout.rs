use std::ops::Range;

pub const VERSION_AND_IHL_OFFSET: usize = 0;
pub const TOS_OFFSET: usize = 1;
pub const TOTAL_LENGTH_RANGE: Range<usize> = 2..4;
pub const IDENTIFICATION_RANGE: Range<usize> = 4..6;
pub const FLAGS_AND_FRAGMENT_OFFSET_RANGE: Range<usize> = 6..8;
pub const TTL_OFFSET: usize = 8;
pub const PROTOCOL_OFFSET: usize = 9;
pub const HEADER_CHECKSUM_RANGE: Range<usize> = 10..12;
pub const SRC_ADDR_RANGE: Range<usize> = 12..16;
pub const DST_ADDR_RANGE: Range<usize> = 16..20;
pub const OPTIONS_OFFSET: usize = 20;

pub const MIN_HEADER_LEN: usize = 20;
pub const MAX_HEADER_LEN: usize = 60;
pub const ALIGNMENT: usize = 4;

pub const VERSION_MASK: u8 = 0xf0;
pub const VERSION_SHIFT: u32 = 4;
pub const IHL_MASK: u8 = 0x0f;
pub const RESERVED_FLAG_MASK: u16 = 0x8000;
pub const DONT_FRAGMENT_MASK: u16 = 0x4000;
pub const MORE_FRAGMENT_MASK: u16 = 0x2000;
pub const FRAGMENT_OFFSET_MASK: u16 = 0x1fff;

pub const VERSION_BITS: u32 = 4;
pub const IHL_BITS: u32 = 4;
pub const FRAGMENT_OFFSET_BITS: u32 = 13;

pub const IPV4_VERSION: u8 = 4;
pub const DEFAULT_TTL: u8 = 64;

pub const OPTION_TYPE_OFFSET: usize = 0;
pub const OPTION_LENGTH_OFFSET: usize = 1;
pub const OPTION_MIN_LEN: usize = 2;
pub const OPTION_LENGTH_BITS: u32 = 8;
pub const ROUTE_OPTION_MIN_LEN: usize = 3;
pub const TIMESTAMP_OPTION_MIN_LEN: usize = 4;
pub const STREAM_ID_OPTION_LEN: usize = 4;
pub const ROUTER_ALERT_OPTION_LEN: usize = 4;
pub const TIMESTAMP_OVERFLOW_MASK: u8 = 0xf0;
pub const TIMESTAMP_FLAG_MASK: u8 = 0x0f;
pub const TIMESTAMP_OVERFLOW_BITS: u32 = 4;
pub const TIMESTAMP_FLAG_BITS: u32 = 4;
