use std::ops::Range;

pub const ID_RANGE: Range<usize> = 0..2;
pub const FLAGS_RANGE: Range<usize> = 2..4;
pub const QD_COUNT_RANGE: Range<usize> = 4..6;
pub const AN_COUNT_RANGE: Range<usize> = 6..8;
pub const NS_COUNT_RANGE: Range<usize> = 8..10;
pub const AR_COUNT_RANGE: Range<usize> = 10..12;
pub const HEADER_LEN: usize = 12;

pub const QR_MASK: u16 = 0x8000;
pub const OPCODE_MASK: u16 = 0x7800;
pub const OPCODE_SHIFT: u32 = 11;
pub const AA_MASK: u16 = 0x0400;
pub const TC_MASK: u16 = 0x0200;
pub const RD_MASK: u16 = 0x0100;
pub const RA_MASK: u16 = 0x0080;
pub const Z_MASK: u16 = 0x0040;
pub const AD_MASK: u16 = 0x0020;
pub const CD_MASK: u16 = 0x0010;
pub const RCODE_MASK: u16 = 0x000f;

pub const OPCODE_BITS: u32 = 4;
pub const RCODE_BITS: u32 = 4;
pub const COUNT_BITS: u32 = 16;

pub const LABEL_TYPE_MASK: u8 = 0xc0;
pub const POINTER_TAG: u8 = 0xc0;
pub const POINTER_OFFSET_MASK: u16 = 0x3fff;
pub const POINTER_LEN: usize = 2;
pub const MAX_LABEL_LEN: usize = 63;
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_POINTER_HOPS: usize = 128;
pub const CHARACTER_STRING_LEN_BITS: u32 = 8;
pub const RD_LENGTH_BITS: u32 = 16;

/// Type, class (2 bytes each) after a question name.
pub const QUESTION_FIXED_LEN: usize = 4;
/// Type, class, TTL, RDLENGTH after a record name.
pub const RECORD_FIXED_LEN: usize = 10;
pub const RECORD_TYPE_OFFSET: usize = 0;
pub const RECORD_CLASS_OFFSET: usize = 2;
pub const RECORD_TTL_OFFSET: usize = 4;
pub const RECORD_RD_LENGTH_OFFSET: usize = 8;

pub const SOA_FIXED_LEN: usize = 20;
pub const MX_PREFERENCE_LEN: usize = 2;
