use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

use crate::codec::packet::hex;
use crate::codec::{BuildError, CodecError, DispatchTable, Element, RawView, check_width};
use crate::protocols::numbers::Dot11InformationElementId;

use super::layout;

const PROTOCOL: &str = "IEEE 802.11";

/// Data rate in Mbit/s of a Supported Rates octet (units of 500 kbit/s).
pub fn rate_mbps(rate: u8) -> f64 {
    f64::from(rate & layout::RATE_MASK) * 0.5
}

/// Whether a Supported Rates octet belongs to the BSS basic rate set.
pub fn is_basic_rate(rate: u8) -> bool {
    rate & layout::BASIC_RATE_MASK != 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dot11ChannelRange {
    pub first_channel: u8,
    pub number_of_channels: u8,
}

/// HT Capabilities element body (802.11n), multi-octet fields little-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Dot11HtCapabilities {
    pub ht_capabilities_info: u16,
    pub ampdu_parameters: u8,
    pub supported_mcs_set: [u8; 16],
    pub ht_extended_capabilities: u16,
    pub transmit_beamforming_capabilities: u32,
    pub asel_capabilities: u8,
}

impl Dot11HtCapabilities {
    fn from_body(body: &[u8]) -> Self {
        let mut supported_mcs_set = [0u8; layout::MCS_SET_LEN];
        supported_mcs_set.copy_from_slice(&body[3..19]);
        Self {
            ht_capabilities_info: u16::from_le_bytes([body[0], body[1]]),
            ampdu_parameters: body[2],
            supported_mcs_set,
            ht_extended_capabilities: u16::from_le_bytes([body[19], body[20]]),
            transmit_beamforming_capabilities: u32::from_le_bytes([
                body[21], body[22], body[23], body[24],
            ]),
            asel_capabilities: body[25],
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.ht_capabilities_info.to_le_bytes());
        out.push(self.ampdu_parameters);
        out.extend_from_slice(&self.supported_mcs_set);
        out.extend_from_slice(&self.ht_extended_capabilities.to_le_bytes());
        out.extend_from_slice(&self.transmit_beamforming_capabilities.to_le_bytes());
        out.push(self.asel_capabilities);
    }

    fn info_bit(&self, n: u32) -> bool {
        self.ht_capabilities_info & (1 << n) != 0
    }

    pub fn ldpc_coding_capability(&self) -> bool {
        self.info_bit(0)
    }

    /// 20/40 MHz operation supported.
    pub fn supported_channel_width_set(&self) -> bool {
        self.info_bit(1)
    }

    pub fn sm_power_save(&self) -> u8 {
        ((self.ht_capabilities_info >> 2) & 0x03) as u8
    }

    pub fn ht_greenfield(&self) -> bool {
        self.info_bit(4)
    }

    pub fn short_gi_20mhz(&self) -> bool {
        self.info_bit(5)
    }

    pub fn short_gi_40mhz(&self) -> bool {
        self.info_bit(6)
    }

    pub fn tx_stbc(&self) -> bool {
        self.info_bit(7)
    }

    pub fn rx_stbc(&self) -> u8 {
        ((self.ht_capabilities_info >> 8) & 0x03) as u8
    }

    pub fn delayed_block_ack(&self) -> bool {
        self.info_bit(10)
    }

    /// 7935 octets rather than 3839.
    pub fn max_amsdu_length(&self) -> bool {
        self.info_bit(11)
    }

    pub fn dsss_cck_mode_40mhz(&self) -> bool {
        self.info_bit(12)
    }

    pub fn forty_mhz_intolerant(&self) -> bool {
        self.info_bit(14)
    }

    pub fn lsig_txop_protection(&self) -> bool {
        self.info_bit(15)
    }

    pub fn max_ampdu_length_exponent(&self) -> u8 {
        self.ampdu_parameters & 0x03
    }

    pub fn min_mpdu_start_spacing(&self) -> u8 {
        (self.ampdu_parameters >> 2) & 0x07
    }

    /// Rx MCS bitmask lookup, indices 0 to 76.
    pub fn supports_mcs(&self, index: u8) -> bool {
        index < 77
            && self.supported_mcs_set[usize::from(index / 8)] & (1 << (index % 8)) != 0
    }
}

/// HT Operation element body (802.11n).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Dot11HtOperation {
    pub primary_channel: u8,
    pub information: [u8; 5],
    pub basic_mcs_set: [u8; 16],
}

impl Dot11HtOperation {
    fn from_body(body: &[u8]) -> Self {
        let mut information = [0u8; 5];
        information.copy_from_slice(&body[1..6]);
        let mut basic_mcs_set = [0u8; layout::MCS_SET_LEN];
        basic_mcs_set.copy_from_slice(&body[6..22]);
        Self {
            primary_channel: body[0],
            information,
            basic_mcs_set,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.primary_channel);
        out.extend_from_slice(&self.information);
        out.extend_from_slice(&self.basic_mcs_set);
    }

    /// 0 none, 1 above, 3 below.
    pub fn secondary_channel_offset(&self) -> u8 {
        self.information[0] & 0x03
    }

    /// Any channel width in the supported set, rather than 20 MHz only.
    pub fn sta_channel_width(&self) -> bool {
        self.information[0] & 0x04 != 0
    }

    pub fn rifs_mode(&self) -> bool {
        self.information[0] & 0x08 != 0
    }

    pub fn ht_protection(&self) -> u8 {
        self.information[1] & 0x03
    }

    pub fn nongreenfield_stas_present(&self) -> bool {
        self.information[1] & 0x04 != 0
    }

    pub fn obss_non_ht_stas_present(&self) -> bool {
        self.information[1] & 0x10 != 0
    }

    pub fn dual_beacon(&self) -> bool {
        self.information[3] & 0x40 != 0
    }

    pub fn dual_cts_protection(&self) -> bool {
        self.information[3] & 0x80 != 0
    }

    pub fn stbc_beacon(&self) -> bool {
        self.information[4] & 0x01 != 0
    }
}

/// Extended Capabilities element body.
///
/// Stations send only as many octets as they need, so a capability bit
/// beyond the last octet is absent (`None`), which is not the same as a
/// cleared bit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Dot11ExtendedCapabilities {
    pub octets: Vec<u8>,
}

impl Dot11ExtendedCapabilities {
    pub fn new(octets: Vec<u8>) -> Self {
        Self { octets }
    }

    /// Capability bit `n`, counting from bit 0 of the first octet.
    pub fn bit(&self, n: usize) -> Option<bool> {
        self.octets
            .get(n / 8)
            .map(|octet| octet & (1 << (n % 8)) != 0)
    }

    /// Octet group `index` (bits `8 * index` to `8 * index + 7`).
    pub fn octet(&self, index: usize) -> Option<u8> {
        self.octets.get(index).copied()
    }
}

macro_rules! extended_capability_bits {
    ($($name:ident = $bit:expr;)*) => {
        impl Dot11ExtendedCapabilities {
            $(
                pub fn $name(&self) -> Option<bool> {
                    self.bit($bit)
                }
            )*
        }
    };
}

extended_capability_bits! {
    bss_coexistence_management_support = 0;
    extended_channel_switching = 2;
    psmp_capability = 4;
    s_psmp_support = 6;
    event = 7;
    diagnostics = 8;
    multicast_diagnostics = 9;
    location_tracking = 10;
    fms = 11;
    proxy_arp_service = 12;
    collocated_interference_reporting = 13;
    civic_location = 14;
    geospatial_location = 15;
    tfs = 16;
    wnm_sleep_mode = 17;
    tim_broadcast = 18;
    bss_transition = 19;
    qos_traffic_capability = 20;
    ac_station_count = 21;
    multiple_bssid = 22;
    timing_measurement = 23;
    channel_usage = 24;
    ssid_list = 25;
    dms = 26;
    utc_tsf_offset = 27;
    tdls_peer_u_apsd_buffer_sta_support = 28;
    tdls_peer_psm_support = 29;
    tdls_channel_switching = 30;
    interworking = 31;
    qos_map = 32;
    ebr = 33;
    sspn_interface = 34;
    msgcf_capability = 36;
    tdls_support = 37;
    tdls_prohibited = 38;
    tdls_channel_switching_prohibited = 39;
    reject_unadmitted_frame = 40;
    identifier_location = 44;
    u_apsd_coexistence = 45;
    wnm_notification = 46;
    qab_capability = 47;
    utf8_ssid = 48;
    qmf_activated = 49;
    qmf_reconfiguration_activated = 50;
    robust_av_streaming = 51;
    advanced_gcr = 52;
    mesh_gcr = 53;
    scs = 54;
    qload_report = 55;
    alternate_edca = 56;
    unprotected_txop_negotiation = 57;
    protected_txop_negotiation = 58;
    protected_qload_report = 60;
    tdls_wider_bandwidth = 61;
    operating_mode_notification = 62;
}

/// One information element of a management frame body. The length octet is
/// not stored: it always follows from the content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Dot11InformationElement {
    /// Raw SSID octets; usually, but not necessarily, UTF-8.
    Ssid(Vec<u8>),
    SupportedRates(Vec<u8>),
    ExtendedSupportedRates(Vec<u8>),
    DsssParameterSet {
        current_channel: u8,
    },
    Tim {
        dtim_count: u8,
        dtim_period: u8,
        bitmap_control: u8,
        partial_virtual_bitmap: Vec<u8>,
    },
    Request(Vec<Dot11InformationElementId>),
    /// Transmit power bounds in dBm.
    PowerCapability {
        min_tx_power: i8,
        max_tx_power: i8,
    },
    SupportedChannels(Vec<Dot11ChannelRange>),
    HtCapabilities(Dot11HtCapabilities),
    HtOperation(Dot11HtOperation),
    ExtendedCapabilities(Dot11ExtendedCapabilities),
    VendorSpecific {
        oui: [u8; 3],
        data: Vec<u8>,
    },
    Unknown {
        id: Dot11InformationElementId,
        data: Vec<u8>,
    },
}

impl Dot11InformationElement {
    pub fn id(&self) -> Dot11InformationElementId {
        use Dot11InformationElement::*;
        match self {
            Ssid(_) => Dot11InformationElementId::SSID,
            SupportedRates(_) => Dot11InformationElementId::SUPPORTED_RATES,
            ExtendedSupportedRates(_) => Dot11InformationElementId::EXTENDED_SUPPORTED_RATES,
            DsssParameterSet { .. } => Dot11InformationElementId::DSSS_PARAMETER_SET,
            Tim { .. } => Dot11InformationElementId::TIM,
            Request(_) => Dot11InformationElementId::REQUEST,
            PowerCapability { .. } => Dot11InformationElementId::POWER_CAPABILITY,
            SupportedChannels(_) => Dot11InformationElementId::SUPPORTED_CHANNELS,
            HtCapabilities(_) => Dot11InformationElementId::HT_CAPABILITIES,
            HtOperation(_) => Dot11InformationElementId::HT_OPERATION,
            ExtendedCapabilities(_) => Dot11InformationElementId::EXTENDED_CAPABILITIES,
            VendorSpecific { .. } => Dot11InformationElementId::VENDOR_SPECIFIC,
            Unknown { id, .. } => *id,
        }
    }

    /// Encoded content, without the id and length octets.
    pub fn body(&self) -> Vec<u8> {
        use Dot11InformationElement::*;
        let mut out = Vec::new();
        match self {
            Ssid(data) | SupportedRates(data) | ExtendedSupportedRates(data) => {
                out.extend_from_slice(data)
            }
            DsssParameterSet { current_channel } => out.push(*current_channel),
            Tim {
                dtim_count,
                dtim_period,
                bitmap_control,
                partial_virtual_bitmap,
            } => {
                out.extend_from_slice(&[*dtim_count, *dtim_period, *bitmap_control]);
                out.extend_from_slice(partial_virtual_bitmap);
            }
            Request(ids) => out.extend(ids.iter().map(|id| id.value())),
            PowerCapability {
                min_tx_power,
                max_tx_power,
            } => out.extend_from_slice(&[*min_tx_power as u8, *max_tx_power as u8]),
            SupportedChannels(ranges) => {
                for range in ranges {
                    out.extend_from_slice(&[range.first_channel, range.number_of_channels]);
                }
            }
            HtCapabilities(capabilities) => capabilities.write_to(&mut out),
            HtOperation(operation) => operation.write_to(&mut out),
            ExtendedCapabilities(capabilities) => out.extend_from_slice(&capabilities.octets),
            VendorSpecific { oui, data } => {
                out.extend_from_slice(oui);
                out.extend_from_slice(data);
            }
            Unknown { data, .. } => out.extend_from_slice(data),
        }
        out
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        let body = self.body();
        out.push(self.id().value());
        out.push(body.len() as u8);
        out.extend_from_slice(&body);
    }

    /// The content must fit the one-octet length field.
    pub fn validate(&self) -> Result<(), BuildError> {
        check_width(
            PROTOCOL,
            "element_length",
            self.body().len() as u64,
            layout::ELEMENT_LENGTH_BITS,
        )
    }
}

impl Element for Dot11InformationElement {
    fn length(&self) -> usize {
        layout::ELEMENT_HEADER_LEN + self.body().len()
    }
}

fn write_rates(f: &mut fmt::Formatter<'_>, rates: &[u8]) -> fmt::Result {
    for rate in rates {
        write!(f, " {}", rate_mbps(*rate))?;
        if is_basic_rate(*rate) {
            f.write_str("(B)")?;
        }
    }
    f.write_str(" Mbit/s")
}

impl fmt::Display for Dot11InformationElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Dot11InformationElement::*;
        write!(f, "[{}]", self.id())?;
        match self {
            Ssid(ssid) => write!(f, " \"{}\"", String::from_utf8_lossy(ssid)),
            SupportedRates(rates) | ExtendedSupportedRates(rates) => write_rates(f, rates),
            DsssParameterSet { current_channel } => write!(f, " channel {}", current_channel),
            Tim {
                dtim_count,
                dtim_period,
                bitmap_control,
                partial_virtual_bitmap,
            } => write!(
                f,
                " DTIM {}/{} bitmap control 0x{:02x} bitmap 0x{}",
                dtim_count,
                dtim_period,
                bitmap_control,
                hex(partial_virtual_bitmap)
            ),
            Request(ids) => {
                for id in ids {
                    write!(f, " {}", id.value())?;
                }
                Ok(())
            }
            PowerCapability {
                min_tx_power,
                max_tx_power,
            } => write!(f, " {} to {} dBm", min_tx_power, max_tx_power),
            SupportedChannels(ranges) => {
                for range in ranges {
                    write!(f, " {}+{}", range.first_channel, range.number_of_channels)?;
                }
                Ok(())
            }
            HtCapabilities(capabilities) => write!(
                f,
                " info 0x{:04x} A-MPDU 0x{:02x}",
                capabilities.ht_capabilities_info, capabilities.ampdu_parameters
            ),
            HtOperation(operation) => {
                write!(f, " primary channel {}", operation.primary_channel)
            }
            ExtendedCapabilities(capabilities) => write!(f, " 0x{}", hex(&capabilities.octets)),
            VendorSpecific { oui, data } => write!(f, " OUI {} data 0x{}", hex(oui), hex(data)),
            Unknown { data, .. } => write!(f, " data 0x{}", hex(data)),
        }
    }
}

type ElementDecoder = fn(&RawView<'_>, &[u8]) -> Result<Dot11InformationElement, CodecError>;

static ELEMENT_DECODERS: LazyLock<DispatchTable<ElementDecoder>> = LazyLock::new(|| {
    use Dot11InformationElementId as Id;
    DispatchTable::new(decode_unknown as ElementDecoder)
        .with(Id::SSID.value(), decode_ssid as ElementDecoder)
        .with(Id::SUPPORTED_RATES.value(), decode_supported_rates as ElementDecoder)
        .with(
            Id::EXTENDED_SUPPORTED_RATES.value(),
            decode_extended_supported_rates as ElementDecoder,
        )
        .with(Id::DSSS_PARAMETER_SET.value(), decode_dsss as ElementDecoder)
        .with(Id::TIM.value(), decode_tim as ElementDecoder)
        .with(Id::REQUEST.value(), decode_request as ElementDecoder)
        .with(Id::POWER_CAPABILITY.value(), decode_power_capability as ElementDecoder)
        .with(Id::SUPPORTED_CHANNELS.value(), decode_supported_channels as ElementDecoder)
        .with(Id::HT_CAPABILITIES.value(), decode_ht_capabilities as ElementDecoder)
        .with(Id::HT_OPERATION.value(), decode_ht_operation as ElementDecoder)
        .with(
            Id::EXTENDED_CAPABILITIES.value(),
            decode_extended_capabilities as ElementDecoder,
        )
        .with(Id::VENDOR_SPECIFIC.value(), decode_vendor_specific as ElementDecoder)
});

/// Decode the element at the start of `view`. The window may extend past
/// the element; only `2 + length` bytes are read.
pub fn decode_element(view: RawView<'_>) -> Result<Dot11InformationElement, CodecError> {
    let id = view.read_u8(layout::ELEMENT_ID_OFFSET)?;
    let length = usize::from(view.read_u8(layout::ELEMENT_LENGTH_OFFSET)?);
    let element = view
        .sub(0, layout::ELEMENT_HEADER_LEN + length)?
        .within("802.11 information element");
    let body = element.read_slice(layout::ELEMENT_HEADER_LEN..element.len())?;
    ELEMENT_DECODERS.get(id)(&element, body)
}

fn fixed<'a>(view: &RawView<'_>, body: &'a [u8], expected: usize) -> Result<&'a [u8], CodecError> {
    if body.len() != expected {
        return Err(view.malformed(format!(
            "element length must be {}, got {}",
            expected,
            body.len()
        )));
    }
    Ok(body)
}

fn decode_ssid(_: &RawView<'_>, body: &[u8]) -> Result<Dot11InformationElement, CodecError> {
    Ok(Dot11InformationElement::Ssid(body.to_vec()))
}

fn decode_supported_rates(
    _: &RawView<'_>,
    body: &[u8],
) -> Result<Dot11InformationElement, CodecError> {
    Ok(Dot11InformationElement::SupportedRates(body.to_vec()))
}

fn decode_extended_supported_rates(
    _: &RawView<'_>,
    body: &[u8],
) -> Result<Dot11InformationElement, CodecError> {
    Ok(Dot11InformationElement::ExtendedSupportedRates(body.to_vec()))
}

fn decode_dsss(view: &RawView<'_>, body: &[u8]) -> Result<Dot11InformationElement, CodecError> {
    let body = fixed(view, body, layout::DSSS_PARAMETER_SET_LEN)?;
    Ok(Dot11InformationElement::DsssParameterSet {
        current_channel: body[0],
    })
}

fn decode_tim(view: &RawView<'_>, body: &[u8]) -> Result<Dot11InformationElement, CodecError> {
    if body.len() < layout::TIM_FIXED_LEN {
        return Err(view.malformed(format!(
            "TIM length {} is below the minimum of {}",
            body.len(),
            layout::TIM_FIXED_LEN
        )));
    }
    Ok(Dot11InformationElement::Tim {
        dtim_count: body[0],
        dtim_period: body[1],
        bitmap_control: body[2],
        partial_virtual_bitmap: body[layout::TIM_FIXED_LEN..].to_vec(),
    })
}

fn decode_request(_: &RawView<'_>, body: &[u8]) -> Result<Dot11InformationElement, CodecError> {
    Ok(Dot11InformationElement::Request(
        body.iter().map(|&id| Dot11InformationElementId(id)).collect(),
    ))
}

fn decode_power_capability(
    view: &RawView<'_>,
    body: &[u8],
) -> Result<Dot11InformationElement, CodecError> {
    let body = fixed(view, body, layout::POWER_CAPABILITY_LEN)?;
    Ok(Dot11InformationElement::PowerCapability {
        min_tx_power: body[0] as i8,
        max_tx_power: body[1] as i8,
    })
}

fn decode_supported_channels(
    view: &RawView<'_>,
    body: &[u8],
) -> Result<Dot11InformationElement, CodecError> {
    if body.len() % layout::CHANNEL_RANGE_LEN != 0 {
        return Err(view.malformed(format!(
            "supported channels length {} is not a multiple of {}",
            body.len(),
            layout::CHANNEL_RANGE_LEN
        )));
    }
    Ok(Dot11InformationElement::SupportedChannels(
        body.chunks_exact(layout::CHANNEL_RANGE_LEN)
            .map(|pair| Dot11ChannelRange {
                first_channel: pair[0],
                number_of_channels: pair[1],
            })
            .collect(),
    ))
}

fn decode_ht_capabilities(
    view: &RawView<'_>,
    body: &[u8],
) -> Result<Dot11InformationElement, CodecError> {
    let body = fixed(view, body, layout::HT_CAPABILITIES_LEN)?;
    Ok(Dot11InformationElement::HtCapabilities(
        Dot11HtCapabilities::from_body(body),
    ))
}

fn decode_ht_operation(
    view: &RawView<'_>,
    body: &[u8],
) -> Result<Dot11InformationElement, CodecError> {
    let body = fixed(view, body, layout::HT_OPERATION_LEN)?;
    Ok(Dot11InformationElement::HtOperation(Dot11HtOperation::from_body(body)))
}

fn decode_extended_capabilities(
    _: &RawView<'_>,
    body: &[u8],
) -> Result<Dot11InformationElement, CodecError> {
    Ok(Dot11InformationElement::ExtendedCapabilities(
        Dot11ExtendedCapabilities::new(body.to_vec()),
    ))
}

fn decode_vendor_specific(
    view: &RawView<'_>,
    body: &[u8],
) -> Result<Dot11InformationElement, CodecError> {
    if body.len() < layout::VENDOR_OUI_LEN {
        return Err(view.malformed(format!(
            "vendor specific length {} leaves no room for an OUI",
            body.len()
        )));
    }
    Ok(Dot11InformationElement::VendorSpecific {
        oui: [body[0], body[1], body[2]],
        data: body[layout::VENDOR_OUI_LEN..].to_vec(),
    })
}

fn decode_unknown(view: &RawView<'_>, body: &[u8]) -> Result<Dot11InformationElement, CodecError> {
    Ok(Dot11InformationElement::Unknown {
        id: Dot11InformationElementId(view.read_u8(layout::ELEMENT_ID_OFFSET)?),
        data: body.to_vec(),
    })
}
