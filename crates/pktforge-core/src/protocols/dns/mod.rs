//! DNS messages (RFC 1035, with the AD/CD bits of RFC 4035).
//!
//! The question, answer, authority and additional sections are *counted*
//! chains: each is decoded exactly as many times as the header says, and a
//! message that runs out of bytes first is rejected rather than returned
//! with short lists.
//!
//! Compressed names keep their pointer as decoded so a message re-encodes
//! to the same bytes. [`DnsDomainName::decompress`] resolves a name against
//! the whole message when the full text is needed.

pub mod builder;
pub mod layout;
pub mod name;
pub mod packet;
pub mod rdata;
pub mod record;

pub use builder::DnsBuilder;
pub use name::DnsDomainName;
pub use packet::{DnsHeader, DnsPacket};
pub use rdata::{DnsRData, decode_rdata};
pub use record::{DnsQuestion, DnsResourceRecord, DnsResourceRecordBuilder};
