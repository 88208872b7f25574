//! Well-known protocol codes used as fields and dispatch keys.

use crate::named_number;

named_number! {
    /// IPv4 protocol / IPv6 next header (IANA "Assigned Internet Protocol Numbers").
    pub struct IpNumber(u8) {
        ICMPV4 = 1 => "ICMPv4",
        IGMP = 2 => "IGMP",
        IPV4 = 4 => "IPv4",
        TCP = 6 => "TCP",
        UDP = 17 => "UDP",
        IPV6 = 41 => "IPv6",
        GRE = 47 => "GRE",
        ESP = 50 => "ESP",
        AH = 51 => "AH",
        ICMPV6 = 58 => "ICMPv6",
        SCTP = 132 => "SCTP",
    }
}

named_number! {
    pub struct TcpPort(u16) {
        FTP_DATA = 20 => "FTP Data",
        FTP = 21 => "FTP",
        SSH = 22 => "SSH",
        TELNET = 23 => "Telnet",
        SMTP = 25 => "SMTP",
        DOMAIN = 53 => "DNS",
        HTTP = 80 => "HTTP",
        BGP = 179 => "BGP",
        HTTPS = 443 => "HTTPS",
    }
}

named_number! {
    pub struct UdpPort(u16) {
        DOMAIN = 53 => "DNS",
        BOOTPS = 67 => "BOOTP Server",
        BOOTPC = 68 => "BOOTP Client",
        NTP = 123 => "NTP",
        SNMP = 161 => "SNMP",
        GTP_C = 2123 => "GTP-C",
        GTP_U = 2152 => "GTP-U",
        MDNS = 5353 => "mDNS",
    }
}

named_number! {
    /// Link-layer header types (tcpdump DLT values).
    pub struct DataLinkType(u16) {
        EN10MB = 1 => "Ethernet",
        RAW = 101 => "Raw IP",
        IEEE802_11 = 105 => "IEEE 802.11",
        IEEE802_11_RADIO = 127 => "Radiotap",
    }
}

named_number! {
    /// 802.11 frame kind, `type << 4 | subtype`.
    pub struct Dot11FrameType(u8) {
        ASSOCIATION_REQUEST = 0x00 => "Association request",
        ASSOCIATION_RESPONSE = 0x01 => "Association response",
        REASSOCIATION_REQUEST = 0x02 => "Reassociation request",
        REASSOCIATION_RESPONSE = 0x03 => "Reassociation response",
        PROBE_REQUEST = 0x04 => "Probe request",
        PROBE_RESPONSE = 0x05 => "Probe response",
        TIMING_ADVERTISEMENT = 0x06 => "Timing Advertisement",
        BEACON = 0x08 => "Beacon",
        ATIM = 0x09 => "ATIM",
        DISASSOCIATION = 0x0a => "Disassociation",
        AUTHENTICATION = 0x0b => "Authentication",
        DEAUTHENTICATION = 0x0c => "Deauthentication",
        ACTION = 0x0d => "Action",
        ACTION_NO_ACK = 0x0e => "Action No Ack",
        BLOCK_ACK_REQUEST = 0x18 => "Block Ack Request",
        BLOCK_ACK = 0x19 => "Block Ack",
        PS_POLL = 0x1a => "PS-Poll",
        RTS = 0x1b => "RTS",
        CTS = 0x1c => "CTS",
        ACK = 0x1d => "ACK",
        DATA = 0x20 => "Data",
        NULL = 0x24 => "Null (no data)",
        QOS_DATA = 0x28 => "QoS Data",
        QOS_NULL = 0x2c => "QoS Null (no data)",
    }
}

named_number! {
    pub struct Dot11InformationElementId(u8) {
        SSID = 0 => "SSID",
        SUPPORTED_RATES = 1 => "Supported Rates",
        DSSS_PARAMETER_SET = 3 => "DSSS Parameter Set",
        TIM = 5 => "TIM",
        COUNTRY = 7 => "Country",
        REQUEST = 10 => "Request",
        BSS_LOAD = 11 => "BSS Load",
        POWER_CAPABILITY = 33 => "Power Capability",
        SUPPORTED_CHANNELS = 36 => "Supported Channels",
        HT_CAPABILITIES = 45 => "HT Capabilities",
        RSN = 48 => "RSN",
        EXTENDED_SUPPORTED_RATES = 50 => "Extended Supported Rates",
        HT_OPERATION = 61 => "HT Operation",
        EXTENDED_CAPABILITIES = 127 => "Extended Capabilities",
        VENDOR_SPECIFIC = 221 => "Vendor Specific",
    }
}

named_number! {
    pub struct DnsResourceRecordType(u16) {
        A = 1 => "A",
        NS = 2 => "NS",
        MD = 3 => "MD",
        MF = 4 => "MF",
        CNAME = 5 => "CNAME",
        SOA = 6 => "SOA",
        MB = 7 => "MB",
        MG = 8 => "MG",
        MR = 9 => "MR",
        NULL = 10 => "NULL",
        WKS = 11 => "WKS",
        PTR = 12 => "PTR",
        HINFO = 13 => "HINFO",
        MINFO = 14 => "MINFO",
        MX = 15 => "MX",
        TXT = 16 => "TXT",
        AAAA = 28 => "AAAA",
        SRV = 33 => "SRV",
        OPT = 41 => "OPT",
        ANY = 255 => "ANY",
    }
}

named_number! {
    pub struct DnsClass(u16) {
        IN = 1 => "Internet",
        CS = 2 => "CSNET",
        CH = 3 => "Chaos",
        HS = 4 => "Hesiod",
        NONE = 254 => "NONE",
        ANY = 255 => "ANY",
    }
}

named_number! {
    pub struct DnsOpCode(u8) {
        QUERY = 0 => "Query",
        IQUERY = 1 => "Inverse Query",
        STATUS = 2 => "Status",
        NOTIFY = 4 => "Notify",
        UPDATE = 5 => "Update",
    }
}

named_number! {
    pub struct DnsRCode(u8) {
        NO_ERROR = 0 => "No Error",
        FORM_ERR = 1 => "Format Error",
        SERV_FAIL = 2 => "Server Failure",
        NX_DOMAIN = 3 => "Non-Existent Domain",
        NOT_IMP = 4 => "Not Implemented",
        REFUSED = 5 => "Query Refused",
        YX_DOMAIN = 6 => "Name Exists when it should not",
        YX_RR_SET = 7 => "RR Set Exists when it should not",
        NX_RR_SET = 8 => "RR Set that should exist does not",
        NOT_AUTH = 9 => "Not Authorized",
        NOT_ZONE = 10 => "Name not contained in zone",
    }
}

named_number! {
    pub struct GtpV1MessageType(u8) {
        ECHO_REQUEST = 1 => "Echo Request",
        ECHO_RESPONSE = 2 => "Echo Response",
        ERROR_INDICATION = 26 => "Error Indication",
        SUPPORTED_EXTENSION_HEADERS_NOTIFICATION = 31 => "Supported Extension Headers Notification",
        END_MARKER = 254 => "End Marker",
        G_PDU = 255 => "G-PDU",
    }
}

named_number! {
    pub struct GtpV1ExtensionHeaderType(u8) {
        NO_MORE_EXTENSION_HEADERS = 0x00 => "No more extension headers",
        MBMS_SUPPORT_INDICATION = 0x01 => "MBMS support indication",
        MS_INFO_CHANGE_REPORTING_SUPPORT_INDICATION = 0x02 => "MS Info Change Reporting support indication",
        SERVICE_CLASS_INDICATOR = 0x20 => "Service Class Indicator",
        UDP_PORT = 0x40 => "UDP Port",
        RAN_CONTAINER = 0x81 => "RAN Container",
        LONG_PDCP_PDU_NUMBER = 0x82 => "Long PDCP PDU Number",
        XW_RAN_CONTAINER = 0x83 => "Xw RAN Container",
        NR_RAN_CONTAINER = 0x84 => "NR RAN Container",
        PDU_SESSION_CONTAINER = 0x85 => "PDU Session Container",
        PDCP_PDU_NUMBER = 0xc0 => "PDCP PDU Number",
        SUSPEND_REQUEST = 0xc1 => "Suspend Request",
        SUSPEND_RESPONSE = 0xc2 => "Suspend Response",
    }
}

named_number! {
    pub struct Ssh2MessageNumber(u8) {
        DISCONNECT = 1 => "SSH_MSG_DISCONNECT",
        IGNORE = 2 => "SSH_MSG_IGNORE",
        UNIMPLEMENTED = 3 => "SSH_MSG_UNIMPLEMENTED",
        DEBUG = 4 => "SSH_MSG_DEBUG",
        SERVICE_REQUEST = 5 => "SSH_MSG_SERVICE_REQUEST",
        SERVICE_ACCEPT = 6 => "SSH_MSG_SERVICE_ACCEPT",
        KEXINIT = 20 => "SSH_MSG_KEXINIT",
        NEWKEYS = 21 => "SSH_MSG_NEWKEYS",
        KEXDH_INIT = 30 => "SSH_MSG_KEXDH_INIT",
        KEXDH_REPLY = 31 => "SSH_MSG_KEXDH_REPLY",
        USERAUTH_REQUEST = 50 => "SSH_MSG_USERAUTH_REQUEST",
        USERAUTH_FAILURE = 51 => "SSH_MSG_USERAUTH_FAILURE",
        USERAUTH_SUCCESS = 52 => "SSH_MSG_USERAUTH_SUCCESS",
        USERAUTH_BANNER = 53 => "SSH_MSG_USERAUTH_BANNER",
        GLOBAL_REQUEST = 80 => "SSH_MSG_GLOBAL_REQUEST",
        CHANNEL_OPEN = 90 => "SSH_MSG_CHANNEL_OPEN",
        CHANNEL_DATA = 94 => "SSH_MSG_CHANNEL_DATA",
        CHANNEL_CLOSE = 97 => "SSH_MSG_CHANNEL_CLOSE",
    }
}

named_number! {
    pub struct IpV4OptionType(u8) {
        END_OF_OPTION_LIST = 0 => "End of Option List",
        NO_OPERATION = 1 => "No Operation",
        RECORD_ROUTE = 7 => "Record Route",
        TIMESTAMP = 68 => "Internet Timestamp",
        TRACEROUTE = 82 => "Traceroute",
        SECURITY = 130 => "Security",
        LOOSE_SOURCE_ROUTING = 131 => "Loose Source Route",
        EXTENDED_SECURITY = 133 => "Extended Security",
        STREAM_ID = 136 => "Stream ID",
        STRICT_SOURCE_ROUTING = 137 => "Strict Source Route",
        ROUTER_ALERT = 148 => "Router Alert",
    }
}

named_number! {
    pub struct TcpOptionKind(u8) {
        END_OF_OPTION_LIST = 0 => "End of Option List",
        NO_OPERATION = 1 => "No Operation",
        MAXIMUM_SEGMENT_SIZE = 2 => "Maximum Segment Size",
        WINDOW_SCALE = 3 => "Window Scale",
        SACK_PERMITTED = 4 => "SACK Permitted",
        SACK = 5 => "SACK",
        TIMESTAMPS = 8 => "Timestamps",
        MD5_SIGNATURE = 19 => "MD5 Signature Option",
        USER_TIMEOUT = 28 => "User Timeout Option",
        TCP_AO = 29 => "TCP Authentication Option",
        FAST_OPEN = 34 => "TCP Fast Open Cookie",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_name() {
        assert_eq!(IpNumber::TCP.to_string(), "6 (TCP)");
        assert_eq!(UdpPort(40000).to_string(), "40000 (unknown)");
        assert_eq!(Dot11FrameType::BEACON.name(), "Beacon");
    }
}
