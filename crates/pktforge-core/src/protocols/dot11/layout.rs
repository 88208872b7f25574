use std::ops::Range;

pub const FRAME_CONTROL_OFFSET: usize = 0;
pub const FLAGS_OFFSET: usize = 1;
pub const DURATION_RANGE: Range<usize> = 2..4;
pub const ADDRESS1_RANGE: Range<usize> = 4..10;
pub const ADDRESS2_RANGE: Range<usize> = 10..16;
pub const ADDRESS3_RANGE: Range<usize> = 16..22;
pub const SEQUENCE_CONTROL_RANGE: Range<usize> = 22..24;
pub const MAC_HEADER_LEN: usize = 24;
pub const HT_CONTROL_LEN: usize = 4;
pub const FCS_LEN: usize = 4;
pub const MAC_ADDRESS_LEN: usize = 6;

pub const PROTOCOL_VERSION_MASK: u8 = 0x03;
pub const TYPE_MASK: u8 = 0x0c;
pub const TYPE_SHIFT: u32 = 2;
pub const SUBTYPE_MASK: u8 = 0xf0;
pub const SUBTYPE_SHIFT: u32 = 4;
pub const PROTOCOL_VERSION_BITS: u32 = 2;
pub const TYPE_BITS: u32 = 2;
pub const SUBTYPE_BITS: u32 = 4;
pub const MANAGEMENT_TYPE: u8 = 0;

pub const TO_DS_MASK: u8 = 0x01;
pub const FROM_DS_MASK: u8 = 0x02;
pub const MORE_FRAGMENTS_MASK: u8 = 0x04;
pub const RETRY_MASK: u8 = 0x08;
pub const POWER_MANAGEMENT_MASK: u8 = 0x10;
pub const MORE_DATA_MASK: u8 = 0x20;
pub const PROTECTED_FRAME_MASK: u8 = 0x40;
pub const ORDER_MASK: u8 = 0x80;

pub const FRAGMENT_NUMBER_MASK: u16 = 0x000f;
pub const SEQUENCE_NUMBER_MASK: u16 = 0xfff0;
pub const SEQUENCE_NUMBER_SHIFT: u32 = 4;
pub const FRAGMENT_NUMBER_BITS: u32 = 4;
pub const SEQUENCE_NUMBER_BITS: u32 = 12;

pub const TIMESTAMP_OFFSET: usize = 0;
pub const BEACON_INTERVAL_OFFSET: usize = 8;
pub const CAPABILITY_OFFSET: usize = 10;
pub const FIXED_FIELDS_LEN: usize = 12;

pub const ELEMENT_ID_OFFSET: usize = 0;
pub const ELEMENT_LENGTH_OFFSET: usize = 1;
pub const ELEMENT_HEADER_LEN: usize = 2;
pub const ELEMENT_LENGTH_BITS: u32 = 8;

pub const DSSS_PARAMETER_SET_LEN: usize = 1;
pub const TIM_FIXED_LEN: usize = 3;
pub const POWER_CAPABILITY_LEN: usize = 2;
pub const CHANNEL_RANGE_LEN: usize = 2;
pub const HT_CAPABILITIES_LEN: usize = 26;
pub const HT_OPERATION_LEN: usize = 22;
pub const MCS_SET_LEN: usize = 16;
pub const VENDOR_OUI_LEN: usize = 3;

pub const BASIC_RATE_MASK: u8 = 0x80;
pub const RATE_MASK: u8 = 0x7f;
