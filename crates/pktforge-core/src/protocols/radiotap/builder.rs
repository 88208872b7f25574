use crate::codec::builder::{build_payload, length_field};
use crate::codec::{BuildError, BuildPolicy, Packet, PacketBuilder};

use super::field::{RadiotapDataField, RadiotapField};
use super::layout;
use super::packet::{RadiotapHeader, RadiotapPacket, announced_fields};

const PROTOCOL: &str = "Radiotap";

/// Builds a radiotap header in front of an optional 802.11 frame.
///
/// Without explicit present words a single word is derived from the
/// fields, which must then be given in ascending bit order.
#[derive(Default)]
pub struct RadiotapBuilder {
    version: u8,
    pad: u8,
    length: u16,
    present: Option<Vec<u32>>,
    fields: Vec<RadiotapDataField>,
    trailing: Vec<u8>,
    payload: Option<Box<dyn PacketBuilder>>,
    policy: BuildPolicy,
}

impl RadiotapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn from_packet(packet: &RadiotapPacket) -> Self {
        let header = &packet.header;
        Self {
            version: header.version,
            pad: header.pad,
            length: header.length,
            present: Some(header.present.clone()),
            fields: header.fields.clone(),
            trailing: header.trailing.clone(),
            payload: packet
                .payload
                .clone()
                .map(|payload| Box::new(payload) as Box<dyn PacketBuilder>),
            policy: BuildPolicy::default(),
        }
    }

    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    pub fn pad(mut self, pad: u8) -> Self {
        self.pad = pad;
        self
    }

    pub fn length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }

    pub fn present(mut self, present: Vec<u32>) -> Self {
        self.present = Some(present);
        self
    }

    /// Appends a field without alignment padding.
    pub fn field(mut self, field: RadiotapField) -> Self {
        self.fields.push(RadiotapDataField::new(field));
        self
    }

    pub fn data_field(mut self, field: RadiotapDataField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: Vec<RadiotapDataField>) -> Self {
        self.fields = fields;
        self
    }

    pub fn trailing(mut self, trailing: Vec<u8>) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn payload<B: PacketBuilder + 'static>(mut self, payload: B) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    pub fn payload_builder(mut self, payload: Option<Box<dyn PacketBuilder>>) -> Self {
        self.payload = payload;
        self
    }

    pub fn correct_length_at_build(mut self, on: bool) -> Self {
        self.policy.correct_length_at_build = on;
        self
    }

    pub fn padding_at_build(mut self, on: bool) -> Self {
        self.policy.padding_at_build = on;
        self
    }

    pub fn policy(mut self, policy: BuildPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn present_words(&self) -> Result<Vec<u32>, BuildError> {
        let bits: Vec<u32> = self.fields.iter().map(|data| data.field.bit()).collect();
        let Some(present) = &self.present else {
            if bits.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(BuildError::invalid(
                    PROTOCOL,
                    "fields must be given in ascending present-bit order without repeats",
                ));
            }
            return Ok(vec![bits.iter().fold(0u32, |word, bit| word | 1 << bit)]);
        };

        let Some((last, chained)) = present.split_last() else {
            return Err(BuildError::invalid(PROTOCOL, "at least one present word is required"));
        };
        let ext: u32 = 1 << layout::EXT_BIT;
        if last & ext != 0 || chained.iter().any(|word| word & ext == 0) {
            return Err(BuildError::invalid(
                PROTOCOL,
                "bit 31 must be set on every present word except the last",
            ));
        }
        if announced_fields(present) != bits {
            return Err(BuildError::invalid(
                PROTOCOL,
                format!("fields with bits {:?} do not match the present words", bits),
            ));
        }
        Ok(present.clone())
    }

    pub fn build(self) -> Result<RadiotapPacket, BuildError> {
        let present = self.present_words()?;

        let (payload, _) = build_payload(self.payload)?;

        let mut offset = layout::PRESENT_OFFSET + present.len() * layout::PRESENT_WORD_LEN;
        let mut fields = self.fields;
        for data in &mut fields {
            let needed = data.required_padding(offset);
            if self.policy.padding_at_build {
                data.align_padding = vec![0; needed];
            } else if data.align_padding.len() != needed {
                return Err(BuildError::invalid(
                    PROTOCOL,
                    format!(
                        "{} at offset {} needs {} padding bytes, has {}",
                        data.field.name(),
                        offset,
                        needed,
                        data.align_padding.len()
                    ),
                ));
            }
            offset += data.length();
        }

        let length = if self.policy.correct_length_at_build {
            let total = offset + self.trailing.len();
            length_field(PROTOCOL, "length", total, layout::LENGTH_BITS)? as u16
        } else {
            self.length
        };

        Ok(RadiotapPacket {
            header: RadiotapHeader {
                version: self.version,
                pad: self.pad,
                length,
                present,
                fields,
                trailing: self.trailing,
            },
            payload,
        })
    }
}

impl PacketBuilder for RadiotapBuilder {
    fn build_packet(self: Box<Self>) -> Result<Box<dyn Packet>, BuildError> {
        Ok(Box::new((*self).build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::calc_crc32;
    use crate::protocols::dot11::Dot11ManagementPacket;
    use crate::protocols::dot11::packet::tests::BEACON;
    use crate::protocols::radiotap::packet::tests::{RADIOTAP, capture};

    fn sample_fields() -> RadiotapBuilder {
        RadiotapBuilder::new()
            .field(RadiotapField::Flags(0x10))
            .field(RadiotapField::Rate(2))
            .field(RadiotapField::Channel {
                frequency: 2412,
                flags: 0x00a0,
            })
            .field(RadiotapField::AntennaSignalDbm(-43))
            .field(RadiotapField::Antenna(1))
    }

    #[test]
    fn builds_sample_header_with_frame() {
        let frame = Dot11ManagementPacket::new_packet(&BEACON, 0, BEACON.len())
            .unwrap()
            .to_builder()
            .append_fcs(true)
            .correct_checksum_at_build(true);
        let packet = sample_fields()
            .payload(frame)
            .policy(BuildPolicy::CORRECT_ALL)
            .build()
            .unwrap();
        assert_eq!(packet.header().present(), [0x0000_082e]);
        assert_eq!(packet.raw_data(), capture());
        let fcs = &packet.raw_data()[RADIOTAP.len() + BEACON.len()..];
        assert_eq!(fcs, calc_crc32(&BEACON).to_le_bytes());
    }

    #[test]
    fn padding_is_inserted_or_checked() {
        let builder = || {
            RadiotapBuilder::new()
                .field(RadiotapField::Flags(0))
                .field(RadiotapField::Channel {
                    frequency: 2437,
                    flags: 0,
                })
                .correct_length_at_build(true)
        };
        let packet = builder().padding_at_build(true).build().unwrap();
        assert_eq!(packet.header().length_field(), 14);
        assert_eq!(packet.header().data_fields()[1].align_padding, [0]);

        let err = builder().build().unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));
    }

    #[test]
    fn field_order_is_checked() {
        let err = RadiotapBuilder::new()
            .field(RadiotapField::Rate(2))
            .field(RadiotapField::Flags(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));

        let err = RadiotapBuilder::new()
            .present(vec![0x0000_0004])
            .field(RadiotapField::Flags(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));

        let err = RadiotapBuilder::new()
            .present(vec![0x8000_0000])
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));
    }

    #[test]
    fn decoded_packet_rebuilds_unchanged() {
        let bytes = [
            0x00, 0x00, 0x0e, 0x00, 0x02, 0x00, 0x00, 0xa0, 0x20, 0x00, 0x00, 0x00, 0x00, 0xc4,
        ];
        let packet = RadiotapPacket::new_packet(&bytes, 0, bytes.len()).unwrap();
        let rebuilt = packet.to_builder().build().unwrap();
        assert_eq!(rebuilt, packet);
        assert_eq!(rebuilt.raw_data(), bytes);
    }
}
