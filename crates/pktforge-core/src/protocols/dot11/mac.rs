use std::fmt;

use serde::{Serialize, Serializer};

/// 48-bit IEEE MAC address, transmitted in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Group bit of the first octet.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(octets: [u8; 6]) -> Self {
        MacAddress(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Capability Information field of Beacon and Probe Response bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Dot11CapabilityInformation(pub u16);

impl Dot11CapabilityInformation {
    pub fn value(self) -> u16 {
        self.0
    }

    fn bit(self, n: u32) -> bool {
        self.0 & (1 << n) != 0
    }

    pub fn ess(self) -> bool {
        self.bit(0)
    }

    pub fn ibss(self) -> bool {
        self.bit(1)
    }

    pub fn cf_pollable(self) -> bool {
        self.bit(2)
    }

    pub fn cf_poll_request(self) -> bool {
        self.bit(3)
    }

    pub fn privacy(self) -> bool {
        self.bit(4)
    }

    pub fn short_preamble(self) -> bool {
        self.bit(5)
    }

    pub fn spectrum_management(self) -> bool {
        self.bit(8)
    }

    pub fn qos(self) -> bool {
        self.bit(9)
    }

    pub fn short_slot_time(self) -> bool {
        self.bit(10)
    }

    pub fn apsd(self) -> bool {
        self.bit(11)
    }

    pub fn radio_measurement(self) -> bool {
        self.bit(12)
    }

    pub fn delayed_block_ack(self) -> bool {
        self.bit(14)
    }

    pub fn immediate_block_ack(self) -> bool {
        self.bit(15)
    }
}

impl fmt::Display for Dot11CapabilityInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:04x} (ESS: {}, IBSS: {}, privacy: {}, short slot time: {})",
            self.0,
            self.ess(),
            self.ibss(),
            self.privacy(),
            self.short_slot_time()
        )
    }
}
