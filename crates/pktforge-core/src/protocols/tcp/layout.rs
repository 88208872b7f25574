use std::ops::Range;

pub const SRC_PORT_RANGE: Range<usize> = 0..2;
pub const DST_PORT_RANGE: Range<usize> = 2..4;
pub const SEQUENCE_NUMBER_RANGE: Range<usize> = 4..8;
pub const ACKNOWLEDGMENT_NUMBER_RANGE: Range<usize> = 8..12;
pub const DATA_OFFSET_AND_FLAGS_RANGE: Range<usize> = 12..14;
pub const WINDOW_RANGE: Range<usize> = 14..16;
pub const CHECKSUM_RANGE: Range<usize> = 16..18;
pub const URGENT_POINTER_RANGE: Range<usize> = 18..20;
pub const OPTIONS_OFFSET: usize = 20;

pub const MIN_HEADER_LEN: usize = 20;
pub const ALIGNMENT: usize = 4;

pub const DATA_OFFSET_MASK: u16 = 0xf000;
pub const DATA_OFFSET_SHIFT: u32 = 12;
pub const RESERVED_MASK: u16 = 0x0fc0;
pub const RESERVED_SHIFT: u32 = 6;
pub const URG_MASK: u16 = 0x0020;
pub const ACK_MASK: u16 = 0x0010;
pub const PSH_MASK: u16 = 0x0008;
pub const RST_MASK: u16 = 0x0004;
pub const SYN_MASK: u16 = 0x0002;
pub const FIN_MASK: u16 = 0x0001;

pub const DATA_OFFSET_BITS: u32 = 4;
pub const RESERVED_BITS: u32 = 6;

pub const OPTION_KIND_OFFSET: usize = 0;
pub const OPTION_LENGTH_OFFSET: usize = 1;
pub const OPTION_MIN_LEN: usize = 2;
pub const OPTION_LENGTH_BITS: u32 = 8;
pub const MSS_OPTION_LEN: usize = 4;
pub const WINDOW_SCALE_OPTION_LEN: usize = 3;
pub const SACK_PERMITTED_OPTION_LEN: usize = 2;
pub const SACK_BLOCK_LEN: usize = 8;
pub const TIMESTAMPS_OPTION_LEN: usize = 10;
