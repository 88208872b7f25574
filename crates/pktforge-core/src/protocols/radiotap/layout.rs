use std::ops::Range;

pub const VERSION_OFFSET: usize = 0;
pub const PAD_OFFSET: usize = 1;
pub const LENGTH_RANGE: Range<usize> = 2..4;
pub const PRESENT_OFFSET: usize = 4;
pub const MIN_HEADER_LEN: usize = 8;
pub const PRESENT_WORD_LEN: usize = 4;
pub const LENGTH_BITS: u32 = 16;

/// Present bits 0 to 28 name fields; 29 to 31 steer the word chain.
pub const FIELD_BITS: u32 = 29;
pub const RADIOTAP_NAMESPACE_BIT: u32 = 29;
pub const VENDOR_NAMESPACE_BIT: u32 = 30;
pub const EXT_BIT: u32 = 31;

pub const TSFT_BIT: u32 = 0;
pub const FLAGS_BIT: u32 = 1;
pub const RATE_BIT: u32 = 2;
pub const CHANNEL_BIT: u32 = 3;
pub const FHSS_BIT: u32 = 4;
pub const DBM_ANTENNA_SIGNAL_BIT: u32 = 5;
pub const DBM_ANTENNA_NOISE_BIT: u32 = 6;
pub const LOCK_QUALITY_BIT: u32 = 7;
pub const TX_ATTENUATION_BIT: u32 = 8;
pub const DB_TX_ATTENUATION_BIT: u32 = 9;
pub const DBM_TX_POWER_BIT: u32 = 10;
pub const ANTENNA_BIT: u32 = 11;
pub const DB_ANTENNA_SIGNAL_BIT: u32 = 12;
pub const DB_ANTENNA_NOISE_BIT: u32 = 13;
pub const RX_FLAGS_BIT: u32 = 14;
pub const TX_FLAGS_BIT: u32 = 15;
pub const RTS_RETRIES_BIT: u32 = 16;
pub const DATA_RETRIES_BIT: u32 = 17;
pub const MCS_BIT: u32 = 19;
pub const AMPDU_STATUS_BIT: u32 = 20;
pub const VHT_BIT: u32 = 21;

/// Flags field: the frame ends with a 4-octet FCS.
pub const FLAGS_FCS: u8 = 0x10;
