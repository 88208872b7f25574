use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;

use crate::codec::bits::put_u32;
use crate::codec::packet::hex;
use crate::codec::{BuildError, ByteOrder, CodecError, DispatchTable, Element, RawView};
use crate::protocols::numbers::Ssh2MessageNumber;

use super::layout;
use super::types::{Ssh2Boolean, Ssh2MpInt, Ssh2NameList, Ssh2String};

/// SSH_MSG_KEXINIT (RFC 4253 section 7.1).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Ssh2KexInit {
    pub cookie: [u8; layout::COOKIE_LEN],
    pub kex_algorithms: Ssh2NameList,
    pub server_host_key_algorithms: Ssh2NameList,
    pub encryption_algorithms_client_to_server: Ssh2NameList,
    pub encryption_algorithms_server_to_client: Ssh2NameList,
    pub mac_algorithms_client_to_server: Ssh2NameList,
    pub mac_algorithms_server_to_client: Ssh2NameList,
    pub compression_algorithms_client_to_server: Ssh2NameList,
    pub compression_algorithms_server_to_client: Ssh2NameList,
    pub languages_client_to_server: Ssh2NameList,
    pub languages_server_to_client: Ssh2NameList,
    pub first_kex_packet_follows: Ssh2Boolean,
    pub reserved: u32,
}

impl Ssh2KexInit {
    /// The ten name-lists in wire order.
    pub fn name_lists(&self) -> [(&'static str, &Ssh2NameList); layout::KEXINIT_NAME_LISTS] {
        [
            ("kex_algorithms", &self.kex_algorithms),
            ("server_host_key_algorithms", &self.server_host_key_algorithms),
            (
                "encryption_algorithms_client_to_server",
                &self.encryption_algorithms_client_to_server,
            ),
            (
                "encryption_algorithms_server_to_client",
                &self.encryption_algorithms_server_to_client,
            ),
            (
                "mac_algorithms_client_to_server",
                &self.mac_algorithms_client_to_server,
            ),
            (
                "mac_algorithms_server_to_client",
                &self.mac_algorithms_server_to_client,
            ),
            (
                "compression_algorithms_client_to_server",
                &self.compression_algorithms_client_to_server,
            ),
            (
                "compression_algorithms_server_to_client",
                &self.compression_algorithms_server_to_client,
            ),
            ("languages_client_to_server", &self.languages_client_to_server),
            ("languages_server_to_client", &self.languages_server_to_client),
        ]
    }

    fn parse(body: &RawView<'_>) -> Result<(Self, usize), CodecError> {
        let cookie = body.read_array::<{ layout::COOKIE_LEN }>(0)?;
        let mut at = layout::COOKIE_LEN;
        let mut name_list = || -> Result<Ssh2NameList, CodecError> {
            let list = Ssh2NameList::parse(&body.tail(at)?)?;
            at += list.length();
            Ok(list)
        };
        let kex_algorithms = name_list()?;
        let server_host_key_algorithms = name_list()?;
        let encryption_algorithms_client_to_server = name_list()?;
        let encryption_algorithms_server_to_client = name_list()?;
        let mac_algorithms_client_to_server = name_list()?;
        let mac_algorithms_server_to_client = name_list()?;
        let compression_algorithms_client_to_server = name_list()?;
        let compression_algorithms_server_to_client = name_list()?;
        let languages_client_to_server = name_list()?;
        let languages_server_to_client = name_list()?;
        let first_kex_packet_follows = Ssh2Boolean::parse(&body.tail(at)?)?;
        at += first_kex_packet_follows.length();
        let reserved = body.read_u32_be(at)?;
        at += layout::RESERVED_LEN;

        let kex_init = Self {
            cookie,
            kex_algorithms,
            server_host_key_algorithms,
            encryption_algorithms_client_to_server,
            encryption_algorithms_server_to_client,
            mac_algorithms_client_to_server,
            mac_algorithms_server_to_client,
            compression_algorithms_client_to_server,
            compression_algorithms_server_to_client,
            languages_client_to_server,
            languages_server_to_client,
            first_kex_packet_follows,
            reserved,
        };
        Ok((kex_init, at))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.cookie);
        for (_, list) in self.name_lists() {
            list.write_to(out);
        }
        out.push(self.first_kex_packet_follows.raw());
        put_u32(out, self.reserved, ByteOrder::BigEndian);
    }

    fn length(&self) -> usize {
        layout::COOKIE_LEN
            + self
                .name_lists()
                .iter()
                .map(|(_, list)| list.length())
                .sum::<usize>()
            + self.first_kex_packet_follows.length()
            + layout::RESERVED_LEN
    }
}

/// The message carried by a binary packet, message number included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Ssh2Message {
    KexInit(Ssh2KexInit),
    NewKeys,
    /// Client's ephemeral public value `e`.
    KexDhInit { e: Ssh2MpInt },
    /// Host key, server's ephemeral value `f`, and the exchange hash signature.
    KexDhReply {
        host_key: Ssh2String,
        f: Ssh2MpInt,
        signature: Ssh2String,
    },
    Unknown {
        message_number: Ssh2MessageNumber,
        data: Vec<u8>,
    },
}

impl Ssh2Message {
    pub fn message_number(&self) -> Ssh2MessageNumber {
        match self {
            Ssh2Message::KexInit(_) => Ssh2MessageNumber::KEXINIT,
            Ssh2Message::NewKeys => Ssh2MessageNumber::NEWKEYS,
            Ssh2Message::KexDhInit { .. } => Ssh2MessageNumber::KEXDH_INIT,
            Ssh2Message::KexDhReply { .. } => Ssh2MessageNumber::KEXDH_REPLY,
            Ssh2Message::Unknown { message_number, .. } => *message_number,
        }
    }

    /// Decode the message filling `view`, dispatching on its first octet.
    pub fn parse(view: &RawView<'_>) -> Result<Self, CodecError> {
        let view = view.within("SSH2 message");
        let number = view.read_u8(layout::MESSAGE_NUMBER_OFFSET)?;
        let body = view.tail(1)?;
        let (message, used) = MESSAGE_DECODERS.get(number)(number, &body)?;
        if used != body.len() {
            return Err(view.malformed(format!(
                "{} leaves {} trailing bytes",
                Ssh2MessageNumber(number),
                body.len() - used
            )));
        }
        Ok(message)
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if let Ssh2Message::KexInit(kex_init) = self {
            for (field, list) in kex_init.name_lists() {
                list.validate(field)?;
            }
        }
        Ok(())
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.message_number().value());
        match self {
            Ssh2Message::KexInit(kex_init) => kex_init.write_to(out),
            Ssh2Message::NewKeys => {}
            Ssh2Message::KexDhInit { e } => e.write_to(out),
            Ssh2Message::KexDhReply {
                host_key,
                f,
                signature,
            } => {
                host_key.write_to(out);
                f.write_to(out);
                signature.write_to(out);
            }
            Ssh2Message::Unknown { data, .. } => out.extend_from_slice(data),
        }
    }
}

impl Element for Ssh2Message {
    fn length(&self) -> usize {
        1 + match self {
            Ssh2Message::KexInit(kex_init) => kex_init.length(),
            Ssh2Message::NewKeys => 0,
            Ssh2Message::KexDhInit { e } => e.length(),
            Ssh2Message::KexDhReply {
                host_key,
                f,
                signature,
            } => host_key.length() + f.length() + signature.length(),
            Ssh2Message::Unknown { data, .. } => data.len(),
        }
    }
}

impl fmt::Display for Ssh2Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message_number())?;
        match self {
            Ssh2Message::KexInit(kex_init) => {
                write!(f, " cookie 0x{}", hex(&kex_init.cookie))?;
                for (name, list) in kex_init.name_lists() {
                    write!(f, ", {}: {}", name, list)?;
                }
                write!(
                    f,
                    ", first_kex_packet_follows: {}",
                    kex_init.first_kex_packet_follows
                )
            }
            Ssh2Message::NewKeys => Ok(()),
            Ssh2Message::KexDhInit { e } => write!(f, " e: {}", e),
            Ssh2Message::KexDhReply {
                host_key,
                f: value,
                signature,
            } => write!(
                f,
                " K_S: {} bytes, f: {}, signature: {} bytes",
                host_key.data().len(),
                value,
                signature.data().len()
            ),
            Ssh2Message::Unknown { data, .. } => write!(f, " 0x{}", hex(data)),
        }
    }
}

/// Decodes a message body (after the number); returns the bytes it used.
type MessageDecoder = fn(u8, &RawView<'_>) -> Result<(Ssh2Message, usize), CodecError>;

static MESSAGE_DECODERS: LazyLock<DispatchTable<MessageDecoder>> = LazyLock::new(|| {
    DispatchTable::new(decode_unknown as MessageDecoder)
        .with(
            Ssh2MessageNumber::KEXINIT.value(),
            decode_kex_init as MessageDecoder,
        )
        .with(
            Ssh2MessageNumber::NEWKEYS.value(),
            decode_new_keys as MessageDecoder,
        )
        .with(
            Ssh2MessageNumber::KEXDH_INIT.value(),
            decode_kexdh_init as MessageDecoder,
        )
        .with(
            Ssh2MessageNumber::KEXDH_REPLY.value(),
            decode_kexdh_reply as MessageDecoder,
        )
});

fn decode_kex_init(_: u8, body: &RawView<'_>) -> Result<(Ssh2Message, usize), CodecError> {
    let (kex_init, used) = Ssh2KexInit::parse(body)?;
    Ok((Ssh2Message::KexInit(kex_init), used))
}

fn decode_new_keys(_: u8, _: &RawView<'_>) -> Result<(Ssh2Message, usize), CodecError> {
    Ok((Ssh2Message::NewKeys, 0))
}

fn decode_kexdh_init(_: u8, body: &RawView<'_>) -> Result<(Ssh2Message, usize), CodecError> {
    let e = Ssh2MpInt::parse(body)?;
    let used = e.length();
    Ok((Ssh2Message::KexDhInit { e }, used))
}

fn decode_kexdh_reply(_: u8, body: &RawView<'_>) -> Result<(Ssh2Message, usize), CodecError> {
    let host_key = Ssh2String::parse(body)?;
    let mut at = host_key.length();
    let f = Ssh2MpInt::parse(&body.tail(at)?)?;
    at += f.length();
    let signature = Ssh2String::parse(&body.tail(at)?)?;
    at += signature.length();
    Ok((
        Ssh2Message::KexDhReply {
            host_key,
            f,
            signature,
        },
        at,
    ))
}

fn decode_unknown(number: u8, body: &RawView<'_>) -> Result<(Ssh2Message, usize), CodecError> {
    Ok((
        Ssh2Message::Unknown {
            message_number: Ssh2MessageNumber(number),
            data: body.bytes().to_vec(),
        },
        body.len(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(message: &Ssh2Message) -> Vec<u8> {
        let mut out = Vec::new();
        message.write_to(&mut out);
        out
    }

    fn sample_kex_init() -> Ssh2KexInit {
        Ssh2KexInit {
            cookie: [0x11; layout::COOKIE_LEN],
            kex_algorithms: Ssh2NameList::new([
                "curve25519-sha256",
                "diffie-hellman-group14-sha256",
            ]),
            server_host_key_algorithms: Ssh2NameList::new(["ssh-ed25519"]),
            encryption_algorithms_client_to_server: Ssh2NameList::new(["aes128-ctr"]),
            encryption_algorithms_server_to_client: Ssh2NameList::new(["aes128-ctr"]),
            mac_algorithms_client_to_server: Ssh2NameList::new(["hmac-sha2-256"]),
            mac_algorithms_server_to_client: Ssh2NameList::new(["hmac-sha2-256"]),
            compression_algorithms_client_to_server: Ssh2NameList::new(["none"]),
            compression_algorithms_server_to_client: Ssh2NameList::new(["none"]),
            ..Ssh2KexInit::default()
        }
    }

    #[test]
    fn kex_init_round_trip() {
        let message = Ssh2Message::KexInit(sample_kex_init());
        let bytes = encode(&message);
        assert_eq!(bytes[0], 20);
        assert_eq!(bytes.len(), message.length());
        let decoded = Ssh2Message::parse(&RawView::of("SSH2", &bytes)).unwrap();
        assert_eq!(decoded, message);
        let Ssh2Message::KexInit(kex_init) = decoded else {
            panic!("expected KEXINIT");
        };
        assert!(kex_init.languages_client_to_server.names().is_empty());
        assert!(!kex_init.first_kex_packet_follows.value());
    }

    #[test]
    fn truncated_kex_init_is_too_short() {
        let bytes = encode(&Ssh2Message::KexInit(sample_kex_init()));
        let err = Ssh2Message::parse(&RawView::of("SSH2", &bytes[..30])).unwrap_err();
        assert!(matches!(err, CodecError::TooShort { .. }));
    }

    #[test]
    fn kexdh_messages() {
        let init = Ssh2Message::KexDhInit {
            e: Ssh2MpInt::from_unsigned(&[0x80, 0x01]),
        };
        assert_eq!(encode(&init), [30, 0, 0, 0, 3, 0x00, 0x80, 0x01]);

        let reply = Ssh2Message::KexDhReply {
            host_key: Ssh2String::new(b"key".to_vec()),
            f: Ssh2MpInt::from_unsigned(&[0x05]),
            signature: Ssh2String::new(b"sig".to_vec()),
        };
        let bytes = encode(&reply);
        assert_eq!(Ssh2Message::parse(&RawView::of("SSH2", &bytes)).unwrap(), reply);
    }

    #[test]
    fn trailing_bytes_in_known_message_are_malformed() {
        let err = Ssh2Message::parse(&RawView::of("SSH2", &[21, 0])).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
    }

    #[test]
    fn unknown_message_keeps_body() {
        let mut bytes = vec![5, 0, 0, 0, 12];
        bytes.extend_from_slice(b"ssh-userauth");
        let message = Ssh2Message::parse(&RawView::of("SSH2", &bytes)).unwrap();
        assert_eq!(message.message_number(), Ssh2MessageNumber::SERVICE_REQUEST);
        assert_eq!(encode(&message), bytes);
    }

    #[test]
    fn invalid_name_is_rejected() {
        let mut kex_init = sample_kex_init();
        kex_init.kex_algorithms = Ssh2NameList::new(["a,b"]);
        let err = Ssh2Message::KexInit(kex_init).validate().unwrap_err();
        assert!(err.to_string().contains("kex_algorithms"));
    }
}
