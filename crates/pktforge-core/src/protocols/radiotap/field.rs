use std::fmt;

use serde::Serialize;

use crate::codec::bits::{put_u16, put_u32, put_u64, read_uint};
use crate::codec::packet::hex;
use crate::codec::{ByteOrder, padding_len};

use super::layout;

/// Natural alignment and size of a known data field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub align: usize,
    pub size: usize,
}

/// Layout of the field announced by present bit `bit` of the first word of
/// a radiotap namespace, `None` when its size is not known.
pub fn field_layout(bit: u32) -> Option<FieldLayout> {
    let (align, size) = match bit {
        layout::TSFT_BIT => (8, 8),
        layout::FLAGS_BIT | layout::RATE_BIT => (1, 1),
        layout::CHANNEL_BIT => (2, 4),
        layout::FHSS_BIT => (2, 2),
        layout::DBM_ANTENNA_SIGNAL_BIT | layout::DBM_ANTENNA_NOISE_BIT => (1, 1),
        layout::LOCK_QUALITY_BIT | layout::TX_ATTENUATION_BIT | layout::DB_TX_ATTENUATION_BIT => {
            (2, 2)
        }
        layout::DBM_TX_POWER_BIT | layout::ANTENNA_BIT => (1, 1),
        layout::DB_ANTENNA_SIGNAL_BIT | layout::DB_ANTENNA_NOISE_BIT => (1, 1),
        layout::RX_FLAGS_BIT | layout::TX_FLAGS_BIT => (2, 2),
        layout::RTS_RETRIES_BIT | layout::DATA_RETRIES_BIT => (1, 1),
        layout::MCS_BIT => (1, 3),
        layout::AMPDU_STATUS_BIT => (4, 8),
        layout::VHT_BIT => (2, 12),
        _ => return None,
    };
    Some(FieldLayout { align, size })
}

/// A decoded radiotap data field. Multi-octet values are little-endian on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum RadiotapField {
    /// MAC timestamp in microseconds.
    Tsft(u64),
    Flags(u8),
    /// Units of 500 kbit/s.
    Rate(u8),
    Channel {
        frequency: u16,
        flags: u16,
    },
    Fhss {
        hop_set: u8,
        hop_pattern: u8,
    },
    AntennaSignalDbm(i8),
    AntennaNoiseDbm(i8),
    LockQuality(u16),
    TxAttenuation(u16),
    DbTxAttenuation(u16),
    TxPowerDbm(i8),
    Antenna(u8),
    AntennaSignalDb(u8),
    AntennaNoiseDb(u8),
    RxFlags(u16),
    TxFlags(u16),
    RtsRetries(u8),
    DataRetries(u8),
    Mcs {
        known: u8,
        flags: u8,
        mcs: u8,
    },
    AmpduStatus {
        reference: u32,
        flags: u16,
        delimiter_crc: u8,
        reserved: u8,
    },
    Vht {
        known: u16,
        flags: u8,
        bandwidth: u8,
        mcs_nss: [u8; 4],
        coding: u8,
        group_id: u8,
        partial_aid: u16,
    },
}

fn le(bytes: &[u8]) -> u64 {
    read_uint(bytes, ByteOrder::LittleEndian)
}

impl RadiotapField {
    /// Decode the field for present bit `bit` from exactly
    /// `field_layout(bit).size` bytes.
    pub fn from_bytes(bit: u32, b: &[u8]) -> Option<Self> {
        let expected = field_layout(bit)?;
        if b.len() != expected.size {
            return None;
        }
        Some(match bit {
            layout::TSFT_BIT => RadiotapField::Tsft(le(b)),
            layout::FLAGS_BIT => RadiotapField::Flags(b[0]),
            layout::RATE_BIT => RadiotapField::Rate(b[0]),
            layout::CHANNEL_BIT => RadiotapField::Channel {
                frequency: le(&b[0..2]) as u16,
                flags: le(&b[2..4]) as u16,
            },
            layout::FHSS_BIT => RadiotapField::Fhss {
                hop_set: b[0],
                hop_pattern: b[1],
            },
            layout::DBM_ANTENNA_SIGNAL_BIT => RadiotapField::AntennaSignalDbm(b[0] as i8),
            layout::DBM_ANTENNA_NOISE_BIT => RadiotapField::AntennaNoiseDbm(b[0] as i8),
            layout::LOCK_QUALITY_BIT => RadiotapField::LockQuality(le(b) as u16),
            layout::TX_ATTENUATION_BIT => RadiotapField::TxAttenuation(le(b) as u16),
            layout::DB_TX_ATTENUATION_BIT => RadiotapField::DbTxAttenuation(le(b) as u16),
            layout::DBM_TX_POWER_BIT => RadiotapField::TxPowerDbm(b[0] as i8),
            layout::ANTENNA_BIT => RadiotapField::Antenna(b[0]),
            layout::DB_ANTENNA_SIGNAL_BIT => RadiotapField::AntennaSignalDb(b[0]),
            layout::DB_ANTENNA_NOISE_BIT => RadiotapField::AntennaNoiseDb(b[0]),
            layout::RX_FLAGS_BIT => RadiotapField::RxFlags(le(b) as u16),
            layout::TX_FLAGS_BIT => RadiotapField::TxFlags(le(b) as u16),
            layout::RTS_RETRIES_BIT => RadiotapField::RtsRetries(b[0]),
            layout::DATA_RETRIES_BIT => RadiotapField::DataRetries(b[0]),
            layout::MCS_BIT => RadiotapField::Mcs {
                known: b[0],
                flags: b[1],
                mcs: b[2],
            },
            layout::AMPDU_STATUS_BIT => RadiotapField::AmpduStatus {
                reference: le(&b[0..4]) as u32,
                flags: le(&b[4..6]) as u16,
                delimiter_crc: b[6],
                reserved: b[7],
            },
            layout::VHT_BIT => RadiotapField::Vht {
                known: le(&b[0..2]) as u16,
                flags: b[2],
                bandwidth: b[3],
                mcs_nss: [b[4], b[5], b[6], b[7]],
                coding: b[8],
                group_id: b[9],
                partial_aid: le(&b[10..12]) as u16,
            },
            _ => return None,
        })
    }

    /// Present bit announcing this field.
    pub fn bit(&self) -> u32 {
        use RadiotapField::*;
        match self {
            Tsft(_) => layout::TSFT_BIT,
            Flags(_) => layout::FLAGS_BIT,
            Rate(_) => layout::RATE_BIT,
            Channel { .. } => layout::CHANNEL_BIT,
            Fhss { .. } => layout::FHSS_BIT,
            AntennaSignalDbm(_) => layout::DBM_ANTENNA_SIGNAL_BIT,
            AntennaNoiseDbm(_) => layout::DBM_ANTENNA_NOISE_BIT,
            LockQuality(_) => layout::LOCK_QUALITY_BIT,
            TxAttenuation(_) => layout::TX_ATTENUATION_BIT,
            DbTxAttenuation(_) => layout::DB_TX_ATTENUATION_BIT,
            TxPowerDbm(_) => layout::DBM_TX_POWER_BIT,
            Antenna(_) => layout::ANTENNA_BIT,
            AntennaSignalDb(_) => layout::DB_ANTENNA_SIGNAL_BIT,
            AntennaNoiseDb(_) => layout::DB_ANTENNA_NOISE_BIT,
            RxFlags(_) => layout::RX_FLAGS_BIT,
            TxFlags(_) => layout::TX_FLAGS_BIT,
            RtsRetries(_) => layout::RTS_RETRIES_BIT,
            DataRetries(_) => layout::DATA_RETRIES_BIT,
            Mcs { .. } => layout::MCS_BIT,
            AmpduStatus { .. } => layout::AMPDU_STATUS_BIT,
            Vht { .. } => layout::VHT_BIT,
        }
    }

    pub fn layout(&self) -> FieldLayout {
        // Every variant maps to a bit with a known layout.
        field_layout(self.bit()).unwrap_or(FieldLayout { align: 1, size: 0 })
    }

    pub fn name(&self) -> &'static str {
        use RadiotapField::*;
        match self {
            Tsft(_) => "TSFT",
            Flags(_) => "Flags",
            Rate(_) => "Rate",
            Channel { .. } => "Channel",
            Fhss { .. } => "FHSS",
            AntennaSignalDbm(_) => "Antenna signal",
            AntennaNoiseDbm(_) => "Antenna noise",
            LockQuality(_) => "Lock quality",
            TxAttenuation(_) => "TX attenuation",
            DbTxAttenuation(_) => "dB TX attenuation",
            TxPowerDbm(_) => "TX power",
            Antenna(_) => "Antenna",
            AntennaSignalDb(_) => "dB antenna signal",
            AntennaNoiseDb(_) => "dB antenna noise",
            RxFlags(_) => "RX flags",
            TxFlags(_) => "TX flags",
            RtsRetries(_) => "RTS retries",
            DataRetries(_) => "Data retries",
            Mcs { .. } => "MCS",
            AmpduStatus { .. } => "A-MPDU status",
            Vht { .. } => "VHT",
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        use RadiotapField::*;
        let order = ByteOrder::LittleEndian;
        match self {
            Tsft(value) => put_u64(out, *value, order),
            Flags(value) | Rate(value) | Antenna(value) | AntennaSignalDb(value)
            | AntennaNoiseDb(value) | RtsRetries(value) | DataRetries(value) => out.push(*value),
            AntennaSignalDbm(value) | AntennaNoiseDbm(value) | TxPowerDbm(value) => {
                out.push(*value as u8)
            }
            Channel { frequency, flags } => {
                put_u16(out, *frequency, order);
                put_u16(out, *flags, order);
            }
            Fhss {
                hop_set,
                hop_pattern,
            } => out.extend_from_slice(&[*hop_set, *hop_pattern]),
            LockQuality(value) | TxAttenuation(value) | DbTxAttenuation(value)
            | RxFlags(value) | TxFlags(value) => put_u16(out, *value, order),
            Mcs { known, flags, mcs } => out.extend_from_slice(&[*known, *flags, *mcs]),
            AmpduStatus {
                reference,
                flags,
                delimiter_crc,
                reserved,
            } => {
                put_u32(out, *reference, order);
                put_u16(out, *flags, order);
                out.extend_from_slice(&[*delimiter_crc, *reserved]);
            }
            Vht {
                known,
                flags,
                bandwidth,
                mcs_nss,
                coding,
                group_id,
                partial_aid,
            } => {
                put_u16(out, *known, order);
                out.extend_from_slice(&[*flags, *bandwidth]);
                out.extend_from_slice(mcs_nss);
                out.extend_from_slice(&[*coding, *group_id]);
                put_u16(out, *partial_aid, order);
            }
        }
    }
}

impl fmt::Display for RadiotapField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RadiotapField::*;
        match self {
            Tsft(value) => write!(f, "{} [us]", value),
            Flags(value) => write!(f, "0x{:02x}", value),
            Rate(value) => write!(f, "{} [Mbit/s]", f64::from(*value) * 0.5),
            Channel { frequency, flags } => {
                write!(f, "{} [MHz] flags 0x{:04x}", frequency, flags)
            }
            Fhss {
                hop_set,
                hop_pattern,
            } => write!(f, "hop set {} pattern {}", hop_set, hop_pattern),
            AntennaSignalDbm(value) | AntennaNoiseDbm(value) | TxPowerDbm(value) => {
                write!(f, "{} [dBm]", value)
            }
            AntennaSignalDb(value) | AntennaNoiseDb(value) => write!(f, "{} [dB]", value),
            LockQuality(value) | TxAttenuation(value) | DbTxAttenuation(value) => {
                write!(f, "{}", value)
            }
            RxFlags(value) | TxFlags(value) => write!(f, "0x{:04x}", value),
            Antenna(value) | RtsRetries(value) | DataRetries(value) => write!(f, "{}", value),
            Mcs { known, flags, mcs } => {
                write!(f, "known 0x{:02x} flags 0x{:02x} index {}", known, flags, mcs)
            }
            AmpduStatus {
                reference, flags, ..
            } => write!(f, "reference {} flags 0x{:04x}", reference, flags),
            Vht {
                known,
                bandwidth,
                mcs_nss,
                ..
            } => write!(
                f,
                "known 0x{:04x} bandwidth {} mcs/nss 0x{}",
                known,
                bandwidth,
                hex(mcs_nss)
            ),
        }
    }
}

/// A data field together with the alignment padding written before it.
/// Padding bytes are kept as received so that re-encoding is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RadiotapDataField {
    pub align_padding: Vec<u8>,
    pub field: RadiotapField,
}

impl RadiotapDataField {
    /// A field without padding; builders add it with `padding_at_build`.
    pub fn new(field: RadiotapField) -> Self {
        Self {
            align_padding: Vec::new(),
            field,
        }
    }

    /// Padding this field needs when it would start at `offset` from the
    /// start of the radiotap header.
    pub fn required_padding(&self, offset: usize) -> usize {
        padding_len(offset, self.field.layout().align)
    }

    pub fn length(&self) -> usize {
        self.align_padding.len() + self.field.layout().size
    }
}
