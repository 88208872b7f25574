//! Bit-field packing helpers.
//!
//! Masks are expressed in the storage word (`u8`, `u16`, `u32`), shifts move
//! the masked bits down to bit 0. Endianness is chosen per field, never
//! globally: most formats are network order, Radiotap and 802.11 are
//! little-endian.

use std::ops::{BitAnd, BitOr, Not, Shl, Shr};

use serde::Serialize;

use super::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// Extract `(word & mask) >> shift`.
pub fn get_bits<T>(word: T, mask: T, shift: u32) -> T
where
    T: Copy + BitAnd<Output = T> + Shr<u32, Output = T>,
{
    (word & mask) >> shift
}

/// Replace the bits selected by `mask` with `value << shift`.
pub fn set_bits<T>(dest: T, value: T, mask: T, shift: u32) -> T
where
    T: Copy
        + BitAnd<Output = T>
        + BitOr<Output = T>
        + Not<Output = T>
        + Shl<u32, Output = T>,
{
    (dest & !mask) | ((value << shift) & mask)
}

pub fn get_flag(byte: u8, mask: u8) -> bool {
    byte & mask != 0
}

pub fn set_flag(byte: u8, mask: u8, on: bool) -> u8 {
    if on { byte | mask } else { byte & !mask }
}

/// Reject `value` when it does not fit in `bits` bits.
pub fn check_width(
    protocol: &'static str,
    field: &'static str,
    value: u64,
    bits: u32,
) -> Result<(), BuildError> {
    let max = if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    if value > max {
        return Err(BuildError::OutOfRange {
            protocol,
            field,
            value,
            max,
        });
    }
    Ok(())
}

/// Read an unsigned integer of `bytes.len()` (at most 8) bytes.
pub fn read_uint(bytes: &[u8], order: ByteOrder) -> u64 {
    let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
    match order {
        ByteOrder::BigEndian => bytes.iter().fold(0, fold),
        ByteOrder::LittleEndian => bytes.iter().rev().fold(0, fold),
    }
}

/// Append the low `width` bytes of `value`.
pub fn write_uint(out: &mut Vec<u8>, value: u64, width: usize, order: ByteOrder) {
    match order {
        ByteOrder::BigEndian => {
            for i in (0..width).rev() {
                out.push((value >> (i * 8)) as u8);
            }
        }
        ByteOrder::LittleEndian => {
            for i in 0..width {
                out.push((value >> (i * 8)) as u8);
            }
        }
    }
}

pub fn put_u16(out: &mut Vec<u8>, value: u16, order: ByteOrder) {
    write_uint(out, u64::from(value), 2, order);
}

pub fn put_u24(out: &mut Vec<u8>, value: u32, order: ByteOrder) {
    write_uint(out, u64::from(value), 3, order);
}

pub fn put_u32(out: &mut Vec<u8>, value: u32, order: ByteOrder) {
    write_uint(out, u64::from(value), 4, order);
}

pub fn put_u64(out: &mut Vec<u8>, value: u64, order: ByteOrder) {
    write_uint(out, value, 8, order);
}
