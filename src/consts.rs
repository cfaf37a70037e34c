//! # Constants
//!
//! Command codes, fixed lengths, offsets and marker bytes of the two handshake
//! phases. Key material lives in [`crate::anchors::TrustAnchors`], never here.

/// Size of one SACD sector in bytes.
pub const SECTOR_SIZE: usize = 2048;

pub const AES_BLOCK_SIZE: usize = 16;
pub const DES_BLOCK_SIZE: usize = 8;
pub const SHA1_DIGEST_SIZE: usize = 20;

/// Width of every RSA-1024 operand, in bytes.
pub const RSA1024_SIZE: usize = 128;
/// Width of every operand of the small 175-bit host key, in bytes.
pub const RSA175_SIZE: usize = 22;

// ─────────────────────────────────────────────────────────────────────────────
// BD Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Key class used by every BD-phase SEND KEY / REPORT KEY.
pub const BD_KEY_CLASS: u8 = 0xE0;

pub const BD_SECURITY_INIT: u8 = 0x00;
pub const BD_SEND_HOST_RANDOM: u8 = 0x01;
pub const BD_REPORT_RANDOMS: u8 = 0x02;
pub const BD_SEND_DRIVE_RANDOM: u8 = 0x03;
pub const BD_REESTABLISH_HOST_RANDOM: u8 = 0x11;
pub const BD_REESTABLISH_REPORT_RANDOMS: u8 = 0x12;
pub const BD_REESTABLISH_DRIVE_RANDOM: u8 = 0x13;

/// Length field and total size of a random-carrying SEND KEY payload.
pub const BD_RANDOM_FIELD_LEN: u8 = 0x10;
pub const BD_RANDOM_PAYLOAD_SIZE: usize = 20;

/// REPORT KEY response carrying the echoed host random and the drive random.
pub const BD_RANDOMS_RESPONSE_SIZE: usize = 0x24;
pub const BD_HOST_ECHO_OFFSET: usize = 4;
pub const BD_DRIVE_RANDOM_OFFSET: usize = 0x14;

/// Marker bytes of the encrypted vendor CDBs.
pub const CDB_MARKER_E1: [u8; 2] = [0x45, 0x31];
pub const CDB_MARKER_E0: [u8; 2] = [0x45, 0x30];
pub const CDB_LENGTH_OFFSET: usize = 6;
pub const CDB_CHECKSUM_OFFSET: usize = 7;

/// E1 challenge data block.
pub const E1_DATA_SIZE: usize = 80;
pub const E1_PAYLOAD_OFFSET: usize = 16;
pub const CHALLENGE_PAYLOAD_SIZE: usize = 64;

/// E0 verification response.
pub const E0_RESPONSE_SIZE: usize = 0x54;
pub const E0_CHECKSUM_END: usize = 0x4f;

/// Offset of the one's-complement checksum in both challenge blocks.
pub const CHALLENGE_CHECKSUM_OFFSET: usize = 4;

// ─────────────────────────────────────────────────────────────────────────────
// SAC Key Exchange
// ─────────────────────────────────────────────────────────────────────────────

/// Key format used for Cmd0, before the drive has negotiated one.
pub const SAC_INITIAL_KEY_FORMAT: u8 = 0x00;

pub const SAC_CMD_GET_KEY_FORMAT: u8 = 0x00;
pub const SAC_CMD_HOST_CHALLENGE: u8 = 0x02;
pub const SAC_CMD_DRIVE_CERTIFICATE: u8 = 0x03;
pub const SAC_CMD_SESSION_CHALLENGE: u8 = 0x04;
pub const SAC_CMD_SESSION_RESPONSE: u8 = 0x05;
pub const SAC_CMD_DISC_KEY: u8 = 0x06;
pub const SAC_CMD_RELEASE: u8 = 0x07;

pub const SAC_KEY_FORMAT_RESPONSE_SIZE: usize = 8;
pub const SAC_KEY_FORMAT_OFFSET: usize = 7;

/// Cmd2: host challenge.
pub const HOST_CHALLENGE_PAYLOAD_SIZE: usize = 201;
pub const HOST_CERTIFICATE_SIZE: usize = 175;
pub const HOST_CERTIFICATE_NUMBER: u32 = 1;
pub const HOST_CERTIFICATE_MARKER: u16 = 0x0099;
pub const HOST_CERTIFICATE_ID_SIZE: usize = 8;

/// Cmd3: drive certificate.
pub const DRIVE_CERTIFICATE_RESPONSE_SIZE: usize = 208;
pub const DRIVE_CERTIFICATE_BODY_SIZE: usize = 197;
pub const DRIVE_CERTIFICATE_MARKER: u8 = 0x95;
pub const DRIVE_CERTIFICATE_ID_SIZE: usize = 8;
pub const CERTIFICATE_TRAILER_SIZE: usize = 39;
pub const CERTIFICATE_RESERVED_TAIL: usize = 4;

/// Leading and trailing marker of a recovered ISO-9796-2-style block.
pub const ISO9796_HEADER: u8 = 0x6a;
pub const ISO9796_TRAILER: u8 = 0xBC;

/// Range of the recovered certificate block that holds the drive modulus.
pub const RECOVERED_MODULUS_START: usize = 18;
pub const RECOVERED_MODULUS_END: usize = 107;

/// Cmd4: session challenge.
pub const SESSION_CHALLENGE_PAYLOAD_SIZE: usize = 174;
pub const PKCS1_RANDOM_PAD_SIZE: usize = 101;
pub const SIGNATURE_HASH_INPUT_SIZE: usize = 152;
pub const SIGNED_CIPHERTEXT_PREFIX: usize = 82;
pub const CIPHERTEXT_SUFFIX_SIZE: usize = 46;

/// Cmd5: session response.
pub const SESSION_RESPONSE_SIZE: usize = 174;
pub const INNER_CIPHERTEXT_START: usize = 25;
pub const INNER_CIPHERTEXT_END: usize = 107;

/// Cmd6: encrypted disc key.
pub const DISC_KEY_RESPONSE_SIZE: usize = 48;
pub const DISC_KEY_OFFSET: usize = 0x20;
