use std::net::IpAddr;

/// Internet checksum (RFC 1071): one's complement of the one's complement
/// sum of 16-bit big-endian words, odd trailing byte padded with zero.
///
/// Running it over data that already contains a correct checksum yields 0.
///
/// # Examples
/// ```
/// use pktforge_core::codec::calc_checksum;
///
/// let data = [0x00u8, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
/// assert_eq!(calc_checksum(&data), 0x220d);
/// ```
pub fn calc_checksum(data: &[u8]) -> u16 {
    // A u64 accumulator cannot overflow below 2^48 words.
    let mut sum = data.chunks(2).fold(0u64, |acc, chunk| {
        let word = match chunk {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        acc + u64::from(word)
    });
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Pseudo-header prefixed to TCP/UDP data for checksum purposes only.
///
/// IPv4 layout: src(4) dst(4) zero(1) protocol(1) length(2).
/// IPv6 layout: src(16) dst(16) length(4) zero(3) next header(1).
/// Mixed address families, and lengths the length field cannot hold, yield
/// `None`.
pub fn pseudo_header(src: IpAddr, dst: IpAddr, protocol: u8, length: usize) -> Option<Vec<u8>> {
    match (src, dst) {
        (IpAddr::V4(src), IpAddr::V4(dst)) => {
            let length = u16::try_from(length).ok()?;
            let mut out = Vec::with_capacity(12);
            out.extend_from_slice(&src.octets());
            out.extend_from_slice(&dst.octets());
            out.push(0);
            out.push(protocol);
            out.extend_from_slice(&length.to_be_bytes());
            Some(out)
        }
        (IpAddr::V6(src), IpAddr::V6(dst)) => {
            let length = u32::try_from(length).ok()?;
            let mut out = Vec::with_capacity(40);
            out.extend_from_slice(&src.octets());
            out.extend_from_slice(&dst.octets());
            out.extend_from_slice(&length.to_be_bytes());
            out.extend_from_slice(&[0, 0, 0, protocol]);
            Some(out)
        }
        _ => None,
    }
}

/// Largest segment the pseudo-header of this address pair can describe:
/// 16 bits for IPv4, 32 bits for IPv6.
pub fn pseudo_length_bits(src: IpAddr) -> u32 {
    if src.is_ipv4() { 16 } else { 32 }
}

/// Checksum over pseudo-header + segment (header with whatever checksum it
/// carries, followed by payload).
pub fn calc_pseudo_checksum(
    src: IpAddr,
    dst: IpAddr,
    protocol: u8,
    header: &[u8],
    payload: &[u8],
) -> Option<u16> {
    let length = header.len() + payload.len();
    let mut data = pseudo_header(src, dst, protocol, length)?;
    data.extend_from_slice(header);
    data.extend_from_slice(payload);
    Some(calc_checksum(&data))
}

/// CRC-32 (IEEE 802.3 polynomial), the 802.11 frame check sequence.
pub fn calc_crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn checksum_of_checksummed_data_is_zero() {
        let mut data = vec![0x45u8, 0x00, 0x00, 0x1c, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11];
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&[10, 0, 0, 1, 10, 0, 0, 2]);
        let sum = calc_checksum(&data);
        data[10..12].copy_from_slice(&sum.to_be_bytes());
        assert_eq!(calc_checksum(&data), 0);
    }

    #[test]
    fn odd_length_pads_with_zero() {
        assert_eq!(calc_checksum(&[0x12]), calc_checksum(&[0x12, 0x00]));
    }

    #[test]
    fn pseudo_header_layouts() {
        let v4 = pseudo_header(
            Ipv4Addr::new(1, 2, 3, 4).into(),
            Ipv4Addr::new(5, 6, 7, 8).into(),
            6,
            20,
        )
        .unwrap();
        assert_eq!(v4, [1, 2, 3, 4, 5, 6, 7, 8, 0, 6, 0, 20]);

        let v6 = pseudo_header(Ipv6Addr::LOCALHOST.into(), Ipv6Addr::LOCALHOST.into(), 17, 8)
            .unwrap();
        assert_eq!(v6.len(), 40);
        assert_eq!(&v6[32..], &[0, 0, 0, 8, 0, 0, 0, 17]);

        assert!(
            pseudo_header(Ipv4Addr::LOCALHOST.into(), Ipv6Addr::LOCALHOST.into(), 6, 0).is_none()
        );
    }

    #[test]
    fn large_inputs_fold_carries() {
        // 100_000 words of 0xffff sum to 0xffff after folding.
        assert_eq!(calc_checksum(&vec![0xff; 200_000]), 0);
        assert_eq!(calc_checksum(&vec![0x00; 300_001]), 0xffff);

        let mut data = vec![0xab; 262_144];
        data.extend_from_slice(&[0, 0]);
        let sum = calc_checksum(&data);
        let end = data.len();
        data[end - 2..].copy_from_slice(&sum.to_be_bytes());
        assert_eq!(calc_checksum(&data), 0);
    }

    #[test]
    fn pseudo_header_rejects_lengths_past_the_field() {
        let v4 = Ipv4Addr::LOCALHOST.into();
        assert!(pseudo_header(v4, v4, 6, 0xffff).is_some());
        assert!(pseudo_header(v4, v4, 6, 0x1_0000).is_none());
        let v6 = Ipv6Addr::LOCALHOST.into();
        assert!(pseudo_header(v6, v6, 6, 0x1_0000).is_some());
        assert_eq!(pseudo_length_bits(v4), 16);
        assert_eq!(pseudo_length_bits(v6), 32);
    }

    #[test]
    fn crc32_check_value() {
        assert_eq!(calc_crc32(b"123456789"), 0xcbf4_3926);
    }
}
