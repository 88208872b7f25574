pub const VERSION_PREFIX: &[u8] = b"SSH-";
/// Longest identification line, CR LF included (RFC 4253 section 4.2).
pub const MAX_VERSION_LINE: usize = 255;
pub const CR: u8 = b'\r';
pub const LF: u8 = b'\n';

pub const PACKET_LENGTH_OFFSET: usize = 0;
pub const PADDING_LENGTH_OFFSET: usize = 4;
/// packet_length plus padding_length.
pub const BINARY_PREFIX_LEN: usize = 5;
/// The padding_length octet, counted by packet_length.
pub const PADDING_LENGTH_LEN: usize = 1;

/// Cipher block size before keys are negotiated.
pub const BLOCK_SIZE: usize = 8;
pub const MIN_PADDING: usize = 4;
pub const PADDING_LENGTH_BITS: u32 = 8;
pub const PACKET_LENGTH_BITS: u32 = 32;

pub const MESSAGE_NUMBER_OFFSET: usize = 0;
/// uint32 prefix of `string`, `name-list` and `mpint`.
pub const STRING_LENGTH_LEN: usize = 4;
pub const NAME_LIST_SEPARATOR: u8 = b',';

pub const COOKIE_LEN: usize = 16;
pub const KEXINIT_NAME_LISTS: usize = 10;
pub const RESERVED_LEN: usize = 4;

/// Registry code for what follows a version exchange, which carries no
/// message number.
pub const VERSION_EXCHANGE_CODE: u32 = 0;
