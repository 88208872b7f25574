//! GTPv1-U (3GPP TS 29.281) with the NR user plane frames of TS 38.425.
//!
//! Extension headers form a *linked* chain: the next-type octet of the
//! optional field block names the first extension, and each extension names
//! the one after it until "no more extension headers". The chain is only
//! followed when the E flag is set.
//!
//! Extension lengths count 4-octet units. Content that does not fill its
//! unit is kept as zero padding on the extension, so decoded packets
//! re-encode to the same bytes.

pub mod builder;
pub mod extension;
pub mod layout;
pub mod nru;
pub mod packet;

pub use builder::GtpV1Builder;
pub use extension::{
    GtpExtensionContent, GtpExtensionHeader, PduSessionInformation, decode_extension,
};
pub use nru::{DiscardBlock, DlDataDeliveryStatus, DlUserData, LostSnRange, NrUFrame};
pub use packet::{GtpV1Header, GtpV1Packet};
