use std::ops::Range;

pub const FLAGS_OFFSET: usize = 0;
pub const MESSAGE_TYPE_OFFSET: usize = 1;
pub const LENGTH_RANGE: Range<usize> = 2..4;
pub const TEID_RANGE: Range<usize> = 4..8;
pub const SEQUENCE_NUMBER_RANGE: Range<usize> = 8..10;
pub const N_PDU_NUMBER_OFFSET: usize = 10;
pub const NEXT_EXTENSION_TYPE_OFFSET: usize = 11;

/// Mandatory part; the length field counts bytes after it.
pub const MANDATORY_LEN: usize = 8;
/// Sequence number, N-PDU number and next extension type.
pub const OPTIONAL_FIELDS_LEN: usize = 4;

pub const VERSION_MASK: u8 = 0xe0;
pub const VERSION_SHIFT: u32 = 5;
pub const PROTOCOL_TYPE_MASK: u8 = 0x10;
pub const RESERVED_MASK: u8 = 0x08;
pub const EXTENSION_FLAG_MASK: u8 = 0x04;
pub const SEQUENCE_FLAG_MASK: u8 = 0x02;
pub const N_PDU_FLAG_MASK: u8 = 0x01;

pub const VERSION_BITS: u32 = 3;
pub const LENGTH_BITS: u32 = 16;

/// Extension header lengths count 4-octet units, length and next type included.
pub const EXTENSION_UNIT: usize = 4;
/// Length byte plus next-type byte.
pub const EXTENSION_OVERHEAD: usize = 2;
pub const EXTENSION_LENGTH_BITS: u32 = 8;

pub const UDP_PORT_LEN: usize = 2;
pub const PDCP_PDU_NUMBER_LEN: usize = 2;
pub const LONG_PDCP_PDU_NUMBER_LEN: usize = 3;
pub const LONG_PDCP_PDU_NUMBER_BITS: u32 = 18;

pub const PDU_SESSION_FIXED_LEN: usize = 2;
pub const PDU_SESSION_TYPE_MASK: u8 = 0xf0;
pub const PDU_SESSION_TYPE_SHIFT: u32 = 4;
pub const PDU_SESSION_TYPE_FLAGS_MASK: u8 = 0x0f;
pub const PDU_SESSION_QOS_FLAGS_MASK: u8 = 0xc0;
pub const PDU_SESSION_QOS_FLAGS_SHIFT: u32 = 6;
pub const QFI_MASK: u8 = 0x3f;
pub const QFI_BITS: u32 = 6;

/// Every NR-U frame starts with the PDU type nibble.
pub const NR_U_PDU_TYPE_MASK: u8 = 0xf0;
pub const NR_U_PDU_TYPE_SHIFT: u32 = 4;
pub const NR_U_PDU_TYPE_BITS: u32 = 4;
pub const NR_U_SN_LEN: usize = 3;
pub const NR_U_SN_BITS: u32 = 24;

pub const DL_USER_DATA_FIXED_LEN: usize = 5;
pub const DL_USER_DATA_SPARE_MASK: u8 = 0x08;
pub const DL_DISCARD_BLOCKS_MASK: u8 = 0x04;
pub const DL_FLUSH_MASK: u8 = 0x02;
pub const REPORT_POLLING_MASK: u8 = 0x01;
pub const DL_USER_DATA_SPARE2_MASK: u8 = 0xe0;
pub const DL_USER_DATA_SPARE2_SHIFT: u32 = 5;
pub const REQUEST_OUT_OF_SEQUENCE_REPORT_MASK: u8 = 0x10;
pub const REPORT_DELIVERED_MASK: u8 = 0x08;
pub const USER_DATA_EXISTENCE_MASK: u8 = 0x04;
pub const ASSISTANCE_INFO_REPORT_POLLING_MASK: u8 = 0x02;
pub const RETRANSMISSION_FLAG_MASK: u8 = 0x01;
/// Start SN plus block size.
pub const DISCARD_BLOCK_LEN: usize = 4;

pub const DL_DELIVERY_STATUS_FIXED_LEN: usize = 6;
pub const HIGHEST_TRANSMITTED_IND_MASK: u8 = 0x08;
pub const HIGHEST_DELIVERED_IND_MASK: u8 = 0x04;
pub const FINAL_FRAME_IND_MASK: u8 = 0x02;
pub const LOST_PACKET_REPORT_MASK: u8 = 0x01;
pub const DL_DELIVERY_STATUS_SPARE2_MASK: u8 = 0xf0;
pub const DL_DELIVERY_STATUS_SPARE2_SHIFT: u32 = 4;
pub const DATA_RATE_IND_MASK: u8 = 0x08;
pub const HIGHEST_RETRANSMITTED_IND_MASK: u8 = 0x04;
pub const HIGHEST_DELIVERED_RETRANSMITTED_IND_MASK: u8 = 0x02;
pub const CAUSE_REPORT_MASK: u8 = 0x01;
/// Start and end SN of a lost range.
pub const LOST_RANGE_LEN: usize = 6;

pub const DL_USER_DATA: u8 = 0;
pub const DL_DATA_DELIVERY_STATUS: u8 = 1;

/// First nibble of an IPv4 T-PDU.
pub const IPV4_VERSION: u8 = 4;
