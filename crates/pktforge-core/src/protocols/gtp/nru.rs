//! NR user plane frames (3GPP TS 38.425) carried in the NR RAN Container
//! extension header.
//!
//! Optional fields are `Option`s; the flag bits that announce them are
//! derived from presence when encoding, so a decoded frame never reads a
//! field its flags do not announce.

use std::fmt;

use serde::Serialize;

use crate::codec::bits::{put_u24, put_u32};
use crate::codec::{BuildError, ByteOrder, CodecError, Element, RawView, check_width, get_bits};

use super::layout;

const PROTOCOL: &str = "NR-U";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DiscardBlock {
    pub start: u32,
    pub size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LostSnRange {
    pub start: u32,
    pub end: u32,
}

/// DL USER DATA (PDU type 0).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DlUserData {
    pub spare: bool,
    pub report_polling: bool,
    /// High three bits of the second octet.
    pub spare2: u8,
    pub request_out_of_sequence_report: bool,
    pub user_data_existence: bool,
    pub assistance_info_report_polling: bool,
    pub retransmission: bool,
    pub nr_u_sequence_number: u32,
    /// Present iff DL Flush is set.
    pub dl_discard_nr_pdcp_pdu_sn: Option<u32>,
    /// Present iff DL Discard Blocks is set.
    pub dl_discard_blocks: Option<Vec<DiscardBlock>>,
    /// Present iff Report Delivered is set.
    pub dl_report_nr_pdcp_pdu_sn: Option<u32>,
}

impl DlUserData {
    pub fn dl_flush(&self) -> bool {
        self.dl_discard_nr_pdcp_pdu_sn.is_some()
    }

    pub fn has_dl_discard_blocks(&self) -> bool {
        self.dl_discard_blocks.is_some()
    }

    pub fn report_delivered(&self) -> bool {
        self.dl_report_nr_pdcp_pdu_sn.is_some()
    }

    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::DL_USER_DATA_FIXED_LEN)?;
        let first = view.read_u8(0)?;
        let second = view.read_u8(1)?;
        let mut frame = Self {
            spare: first & layout::DL_USER_DATA_SPARE_MASK != 0,
            report_polling: first & layout::REPORT_POLLING_MASK != 0,
            spare2: get_bits(
                second,
                layout::DL_USER_DATA_SPARE2_MASK,
                layout::DL_USER_DATA_SPARE2_SHIFT,
            ),
            request_out_of_sequence_report: second & layout::REQUEST_OUT_OF_SEQUENCE_REPORT_MASK
                != 0,
            user_data_existence: second & layout::USER_DATA_EXISTENCE_MASK != 0,
            assistance_info_report_polling: second & layout::ASSISTANCE_INFO_REPORT_POLLING_MASK
                != 0,
            retransmission: second & layout::RETRANSMISSION_FLAG_MASK != 0,
            nr_u_sequence_number: view.read_u24_be(2)?,
            ..Self::default()
        };

        let mut at = layout::DL_USER_DATA_FIXED_LEN;
        frame.dl_discard_nr_pdcp_pdu_sn =
            read_sn(view, &mut at, first & layout::DL_FLUSH_MASK != 0)?;
        if first & layout::DL_DISCARD_BLOCKS_MASK != 0 {
            let count = usize::from(view.read_u8(at)?);
            at += 1;
            let mut blocks = Vec::with_capacity(count);
            for _ in 0..count {
                blocks.push(DiscardBlock {
                    start: view.read_u24_be(at)?,
                    size: view.read_u8(at + layout::NR_U_SN_LEN)?,
                });
                at += layout::DISCARD_BLOCK_LEN;
            }
            frame.dl_discard_blocks = Some(blocks);
        }
        frame.dl_report_nr_pdcp_pdu_sn =
            read_sn(view, &mut at, second & layout::REPORT_DELIVERED_MASK != 0)?;
        Ok(frame)
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        let mut first = layout::DL_USER_DATA << layout::NR_U_PDU_TYPE_SHIFT;
        for (on, mask) in [
            (self.spare, layout::DL_USER_DATA_SPARE_MASK),
            (self.has_dl_discard_blocks(), layout::DL_DISCARD_BLOCKS_MASK),
            (self.dl_flush(), layout::DL_FLUSH_MASK),
            (self.report_polling, layout::REPORT_POLLING_MASK),
        ] {
            if on {
                first |= mask;
            }
        }
        let mut second = (self.spare2 << layout::DL_USER_DATA_SPARE2_SHIFT)
            & layout::DL_USER_DATA_SPARE2_MASK;
        for (on, mask) in [
            (
                self.request_out_of_sequence_report,
                layout::REQUEST_OUT_OF_SEQUENCE_REPORT_MASK,
            ),
            (self.report_delivered(), layout::REPORT_DELIVERED_MASK),
            (self.user_data_existence, layout::USER_DATA_EXISTENCE_MASK),
            (
                self.assistance_info_report_polling,
                layout::ASSISTANCE_INFO_REPORT_POLLING_MASK,
            ),
            (self.retransmission, layout::RETRANSMISSION_FLAG_MASK),
        ] {
            if on {
                second |= mask;
            }
        }
        out.push(first);
        out.push(second);
        put_u24(out, self.nr_u_sequence_number, ByteOrder::BigEndian);
        if let Some(sn) = self.dl_discard_nr_pdcp_pdu_sn {
            put_u24(out, sn, ByteOrder::BigEndian);
        }
        if let Some(blocks) = &self.dl_discard_blocks {
            out.push(blocks.len() as u8);
            for block in blocks {
                put_u24(out, block.start, ByteOrder::BigEndian);
                out.push(block.size);
            }
        }
        if let Some(sn) = self.dl_report_nr_pdcp_pdu_sn {
            put_u24(out, sn, ByteOrder::BigEndian);
        }
    }

    fn length(&self) -> usize {
        layout::DL_USER_DATA_FIXED_LEN
            + self.dl_discard_nr_pdcp_pdu_sn.map_or(0, |_| layout::NR_U_SN_LEN)
            + self
                .dl_discard_blocks
                .as_ref()
                .map_or(0, |blocks| 1 + blocks.len() * layout::DISCARD_BLOCK_LEN)
            + self.dl_report_nr_pdcp_pdu_sn.map_or(0, |_| layout::NR_U_SN_LEN)
    }

    fn validate(&self) -> Result<(), BuildError> {
        check_width(PROTOCOL, "spare2", u64::from(self.spare2), 3)?;
        check_sn("nr_u_sequence_number", Some(self.nr_u_sequence_number))?;
        check_sn("dl_discard_nr_pdcp_pdu_sn", self.dl_discard_nr_pdcp_pdu_sn)?;
        check_sn("dl_report_nr_pdcp_pdu_sn", self.dl_report_nr_pdcp_pdu_sn)?;
        if let Some(blocks) = &self.dl_discard_blocks {
            check_width(PROTOCOL, "dl_discard_blocks", blocks.len() as u64, 8)?;
            for block in blocks {
                check_sn("dl_discard_block.start", Some(block.start))?;
            }
        }
        Ok(())
    }
}

/// DL DATA DELIVERY STATUS (PDU type 1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DlDataDeliveryStatus {
    pub final_frame: bool,
    /// High four bits of the second octet.
    pub spare2: u8,
    pub desired_buffer_size: u32,
    pub desired_data_rate: Option<u32>,
    pub lost_ranges: Option<Vec<LostSnRange>>,
    pub highest_delivered_nr_pdcp_sn: Option<u32>,
    pub highest_transmitted_nr_pdcp_sn: Option<u32>,
    pub cause: Option<u8>,
    pub highest_delivered_retransmitted_nr_pdcp_sn: Option<u32>,
    pub highest_retransmitted_nr_pdcp_sn: Option<u32>,
}

impl DlDataDeliveryStatus {
    fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        view.require_len(layout::DL_DELIVERY_STATUS_FIXED_LEN)?;
        let first = view.read_u8(0)?;
        let second = view.read_u8(1)?;
        let mut frame = Self {
            final_frame: first & layout::FINAL_FRAME_IND_MASK != 0,
            spare2: get_bits(
                second,
                layout::DL_DELIVERY_STATUS_SPARE2_MASK,
                layout::DL_DELIVERY_STATUS_SPARE2_SHIFT,
            ),
            desired_buffer_size: view.read_u32_be(2)?,
            ..Self::default()
        };

        let mut at = layout::DL_DELIVERY_STATUS_FIXED_LEN;
        // Field order is fixed; each flag only says whether its field is there.
        if second & layout::DATA_RATE_IND_MASK != 0 {
            frame.desired_data_rate = Some(view.read_u32_be(at)?);
            at += 4;
        }
        if first & layout::LOST_PACKET_REPORT_MASK != 0 {
            let count = usize::from(view.read_u8(at)?);
            at += 1;
            let mut ranges = Vec::with_capacity(count);
            for _ in 0..count {
                ranges.push(LostSnRange {
                    start: view.read_u24_be(at)?,
                    end: view.read_u24_be(at + layout::NR_U_SN_LEN)?,
                });
                at += layout::LOST_RANGE_LEN;
            }
            frame.lost_ranges = Some(ranges);
        }
        frame.highest_delivered_nr_pdcp_sn =
            read_sn(view, &mut at, first & layout::HIGHEST_DELIVERED_IND_MASK != 0)?;
        frame.highest_transmitted_nr_pdcp_sn =
            read_sn(view, &mut at, first & layout::HIGHEST_TRANSMITTED_IND_MASK != 0)?;
        if second & layout::CAUSE_REPORT_MASK != 0 {
            frame.cause = Some(view.read_u8(at)?);
            at += 1;
        }
        frame.highest_delivered_retransmitted_nr_pdcp_sn = read_sn(
            view,
            &mut at,
            second & layout::HIGHEST_DELIVERED_RETRANSMITTED_IND_MASK != 0,
        )?;
        frame.highest_retransmitted_nr_pdcp_sn =
            read_sn(view, &mut at, second & layout::HIGHEST_RETRANSMITTED_IND_MASK != 0)?;
        Ok(frame)
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        let mut first = layout::DL_DATA_DELIVERY_STATUS << layout::NR_U_PDU_TYPE_SHIFT;
        for (on, mask) in [
            (
                self.highest_transmitted_nr_pdcp_sn.is_some(),
                layout::HIGHEST_TRANSMITTED_IND_MASK,
            ),
            (
                self.highest_delivered_nr_pdcp_sn.is_some(),
                layout::HIGHEST_DELIVERED_IND_MASK,
            ),
            (self.final_frame, layout::FINAL_FRAME_IND_MASK),
            (self.lost_ranges.is_some(), layout::LOST_PACKET_REPORT_MASK),
        ] {
            if on {
                first |= mask;
            }
        }
        let mut second = (self.spare2 << layout::DL_DELIVERY_STATUS_SPARE2_SHIFT)
            & layout::DL_DELIVERY_STATUS_SPARE2_MASK;
        for (on, mask) in [
            (self.desired_data_rate.is_some(), layout::DATA_RATE_IND_MASK),
            (
                self.highest_retransmitted_nr_pdcp_sn.is_some(),
                layout::HIGHEST_RETRANSMITTED_IND_MASK,
            ),
            (
                self.highest_delivered_retransmitted_nr_pdcp_sn.is_some(),
                layout::HIGHEST_DELIVERED_RETRANSMITTED_IND_MASK,
            ),
            (self.cause.is_some(), layout::CAUSE_REPORT_MASK),
        ] {
            if on {
                second |= mask;
            }
        }
        out.push(first);
        out.push(second);
        put_u32(out, self.desired_buffer_size, ByteOrder::BigEndian);
        if let Some(rate) = self.desired_data_rate {
            put_u32(out, rate, ByteOrder::BigEndian);
        }
        if let Some(ranges) = &self.lost_ranges {
            out.push(ranges.len() as u8);
            for range in ranges {
                put_u24(out, range.start, ByteOrder::BigEndian);
                put_u24(out, range.end, ByteOrder::BigEndian);
            }
        }
        let sns = [
            self.highest_delivered_nr_pdcp_sn,
            self.highest_transmitted_nr_pdcp_sn,
        ];
        for sn in sns.into_iter().flatten() {
            put_u24(out, sn, ByteOrder::BigEndian);
        }
        if let Some(cause) = self.cause {
            out.push(cause);
        }
        let sns = [
            self.highest_delivered_retransmitted_nr_pdcp_sn,
            self.highest_retransmitted_nr_pdcp_sn,
        ];
        for sn in sns.into_iter().flatten() {
            put_u24(out, sn, ByteOrder::BigEndian);
        }
    }

    fn sns(&self) -> [(&'static str, Option<u32>); 4] {
        [
            ("highest_delivered_nr_pdcp_sn", self.highest_delivered_nr_pdcp_sn),
            ("highest_transmitted_nr_pdcp_sn", self.highest_transmitted_nr_pdcp_sn),
            (
                "highest_delivered_retransmitted_nr_pdcp_sn",
                self.highest_delivered_retransmitted_nr_pdcp_sn,
            ),
            (
                "highest_retransmitted_nr_pdcp_sn",
                self.highest_retransmitted_nr_pdcp_sn,
            ),
        ]
    }

    fn length(&self) -> usize {
        let sns = self.sns().iter().filter(|(_, sn)| sn.is_some()).count();
        layout::DL_DELIVERY_STATUS_FIXED_LEN
            + self.desired_data_rate.map_or(0, |_| 4)
            + self
                .lost_ranges
                .as_ref()
                .map_or(0, |ranges| 1 + ranges.len() * layout::LOST_RANGE_LEN)
            + sns * layout::NR_U_SN_LEN
            + self.cause.map_or(0, |_| 1)
    }

    fn validate(&self) -> Result<(), BuildError> {
        check_width(PROTOCOL, "spare2", u64::from(self.spare2), 4)?;
        for (field, sn) in self.sns() {
            check_sn(field, sn)?;
        }
        if let Some(ranges) = &self.lost_ranges {
            check_width(PROTOCOL, "lost_ranges", ranges.len() as u64, 8)?;
            for range in ranges {
                check_sn("lost_range.start", Some(range.start))?;
                check_sn("lost_range.end", Some(range.end))?;
            }
        }
        Ok(())
    }
}

/// Read a 24-bit SN at `*at` when `present`, advancing past it.
fn read_sn(view: &RawView<'_>, at: &mut usize, present: bool) -> Result<Option<u32>, CodecError> {
    if !present {
        return Ok(None);
    }
    let sn = view.read_u24_be(*at)?;
    *at += layout::NR_U_SN_LEN;
    Ok(Some(sn))
}

fn check_sn(field: &'static str, sn: Option<u32>) -> Result<(), BuildError> {
    match sn {
        Some(sn) => check_width(PROTOCOL, field, u64::from(sn), layout::NR_U_SN_BITS),
        None => Ok(()),
    }
}

/// An NR-U frame, chosen by the PDU type nibble of its first octet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum NrUFrame {
    DlUserData(DlUserData),
    DlDataDeliveryStatus(DlDataDeliveryStatus),
    /// Any other PDU type, kept whole (first octet included).
    Other(Vec<u8>),
}

impl NrUFrame {
    /// Decode the frame at the start of `view`. Bytes after the fields the
    /// flags announce are left to the caller (extension header padding).
    pub fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        let view = view.within(PROTOCOL);
        let first = view.read_u8(0)?;
        match get_bits(first, layout::NR_U_PDU_TYPE_MASK, layout::NR_U_PDU_TYPE_SHIFT) {
            layout::DL_USER_DATA => Ok(NrUFrame::DlUserData(DlUserData::parse(&view)?)),
            layout::DL_DATA_DELIVERY_STATUS => Ok(NrUFrame::DlDataDeliveryStatus(
                DlDataDeliveryStatus::parse(&view)?,
            )),
            _ => Ok(NrUFrame::Other(view.bytes().to_vec())),
        }
    }

    pub fn pdu_type(&self) -> u8 {
        match self {
            NrUFrame::DlUserData(_) => layout::DL_USER_DATA,
            NrUFrame::DlDataDeliveryStatus(_) => layout::DL_DATA_DELIVERY_STATUS,
            NrUFrame::Other(data) => data.first().map_or(0, |b| b >> layout::NR_U_PDU_TYPE_SHIFT),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            NrUFrame::DlUserData(frame) => frame.write_to(out),
            NrUFrame::DlDataDeliveryStatus(frame) => frame.write_to(out),
            NrUFrame::Other(data) => out.extend_from_slice(data),
        }
    }

    /// Reject values that do not fit their wire fields.
    pub fn validate(&self) -> Result<(), BuildError> {
        match self {
            NrUFrame::DlUserData(frame) => frame.validate(),
            NrUFrame::DlDataDeliveryStatus(frame) => frame.validate(),
            NrUFrame::Other(data) if data.is_empty() => {
                Err(BuildError::invalid(PROTOCOL, "frame without PDU type octet"))
            }
            NrUFrame::Other(_) => Ok(()),
        }
    }
}

impl Element for NrUFrame {
    fn length(&self) -> usize {
        match self {
            NrUFrame::DlUserData(frame) => frame.length(),
            NrUFrame::DlDataDeliveryStatus(frame) => frame.length(),
            NrUFrame::Other(data) => data.len(),
        }
    }
}

impl fmt::Display for NrUFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NrUFrame::DlUserData(frame) => {
                write!(f, "DL USER DATA (NR-U SN {})", frame.nr_u_sequence_number)?;
                if let Some(sn) = frame.dl_discard_nr_pdcp_pdu_sn {
                    write!(f, ", flush up to {}", sn)?;
                }
                if let Some(blocks) = &frame.dl_discard_blocks {
                    write!(f, ", {} discard blocks", blocks.len())?;
                }
                if let Some(sn) = frame.dl_report_nr_pdcp_pdu_sn {
                    write!(f, ", report delivery of {}", sn)?;
                }
                Ok(())
            }
            NrUFrame::DlDataDeliveryStatus(frame) => {
                write!(
                    f,
                    "DL DATA DELIVERY STATUS (buffer {} bytes",
                    frame.desired_buffer_size
                )?;
                if let Some(ranges) = &frame.lost_ranges {
                    write!(f, ", {} lost ranges", ranges.len())?;
                }
                if let Some(cause) = frame.cause {
                    write!(f, ", cause {}", cause)?;
                }
                f.write_str(")")
            }
            NrUFrame::Other(data) => {
                write!(f, "PDU type {} ({} bytes)", self.pdu_type(), data.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(frame: &NrUFrame) -> Vec<u8> {
        let mut out = Vec::new();
        frame.write_to(&mut out);
        out
    }

    #[test]
    fn dl_flush_clear_skips_discard_sn() {
        // Flags: no flush, no blocks; one trailing byte that is not an SN.
        let bytes = [0x00, 0x00, 0x00, 0x01, 0x02, 0xff];
        let frame = NrUFrame::parse(&RawView::of("t", &bytes)).unwrap();
        let NrUFrame::DlUserData(data) = &frame else {
            panic!("unexpected frame {frame:?}");
        };
        assert!(!data.dl_flush());
        assert_eq!(data.dl_discard_nr_pdcp_pdu_sn, None);
        assert_eq!(data.nr_u_sequence_number, 0x0102);
        assert_eq!(frame.length(), 5);
    }

    #[test]
    fn dl_flush_set_needs_discard_sn() {
        let bytes = [0x02, 0x00, 0x00, 0x01, 0x02, 0xff];
        let err = NrUFrame::parse(&RawView::of("t", &bytes)).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { .. }));

        let bytes = [0x02, 0x00, 0x00, 0x01, 0x02, 0x00, 0x00, 0x09];
        let frame = NrUFrame::parse(&RawView::of("t", &bytes)).unwrap();
        let NrUFrame::DlUserData(data) = &frame else {
            panic!("unexpected frame {frame:?}");
        };
        assert_eq!(data.dl_discard_nr_pdcp_pdu_sn, Some(9));
        assert_eq!(encode(&frame), bytes);
    }

    #[test]
    fn discard_blocks_and_report() {
        let bytes = [
            0x04, 0x08, 0x00, 0x00, 0x07, // blocks + report delivered, SN 7
            0x02, // two blocks
            0x00, 0x00, 0x10, 0x03, 0x00, 0x00, 0x20, 0x01, // blocks
            0x00, 0x00, 0x05, // report SN
        ];
        let frame = NrUFrame::parse(&RawView::of("t", &bytes)).unwrap();
        let NrUFrame::DlUserData(data) = &frame else {
            panic!("unexpected frame {frame:?}");
        };
        assert_eq!(
            data.dl_discard_blocks.as_deref(),
            Some(
                &[
                    DiscardBlock { start: 0x10, size: 3 },
                    DiscardBlock { start: 0x20, size: 1 },
                ][..]
            )
        );
        assert_eq!(data.dl_report_nr_pdcp_pdu_sn, Some(5));
        assert_eq!(frame.length(), bytes.len());
        assert_eq!(encode(&frame), bytes);
    }

    #[test]
    fn delivery_status_optional_fields() {
        let bytes = [
            0x15, 0x09, // type 1, highest delivered, lost report; data rate, cause
            0x00, 0x00, 0x10, 0x00, // desired buffer size
            0x00, 0x00, 0x20, 0x00, // desired data rate
            0x01, 0x00, 0x00, 0x03, 0x00, 0x00, 0x04, // one lost range
            0x00, 0x00, 0x02, // highest delivered
            0x07, // cause
        ];
        let frame = NrUFrame::parse(&RawView::of("t", &bytes)).unwrap();
        let NrUFrame::DlDataDeliveryStatus(status) = &frame else {
            panic!("unexpected frame {frame:?}");
        };
        assert_eq!(status.desired_buffer_size, 0x1000);
        assert_eq!(status.desired_data_rate, Some(0x2000));
        assert_eq!(
            status.lost_ranges,
            Some(vec![LostSnRange { start: 3, end: 4 }])
        );
        assert_eq!(status.highest_delivered_nr_pdcp_sn, Some(2));
        assert_eq!(status.highest_transmitted_nr_pdcp_sn, None);
        assert_eq!(status.cause, Some(7));
        assert_eq!(frame.length(), bytes.len());
        assert_eq!(encode(&frame), bytes);
    }

    #[test]
    fn sequence_numbers_are_24_bits() {
        let frame = NrUFrame::DlUserData(DlUserData {
            nr_u_sequence_number: 0x0100_0000,
            ..DlUserData::default()
        });
        let err = frame.validate().unwrap_err();
        assert!(matches!(err, BuildError::OutOfRange { field: "nr_u_sequence_number", .. }));
    }

    #[test]
    fn other_pdu_types_are_raw() {
        let frame = NrUFrame::parse(&RawView::of("t", &[0x20, 1, 2])).unwrap();
        assert_eq!(frame.pdu_type(), 2);
        assert_eq!(frame, NrUFrame::Other(vec![0x20, 1, 2]));
    }
}
