//! src/auth/packets.rs
//! Byte layouts of the BD Authentication phase
//!
//! Pure encode/decode functions over fixed-size arrays. No I/O and no host
//! endianness or struct layout is involved.

use crate::aliases::{AesIv16, AesKey16, Block8, Des3Key24, DesIv8, Nonce16, SpanBuffer};
use crate::consts::{
    BD_DRIVE_RANDOM_OFFSET, BD_HOST_ECHO_OFFSET, BD_RANDOMS_RESPONSE_SIZE, BD_RANDOM_FIELD_LEN,
    BD_RANDOM_PAYLOAD_SIZE, CDB_CHECKSUM_OFFSET, CDB_LENGTH_OFFSET, CHALLENGE_CHECKSUM_OFFSET,
    CHALLENGE_PAYLOAD_SIZE, E0_CHECKSUM_END, E0_RESPONSE_SIZE, E1_DATA_SIZE, E1_PAYLOAD_OFFSET,
};
use crate::crypto::cbc::{aes_cbc_decrypt, aes_cbc_encrypt, des3_cbc_encrypt};
use crate::error::SacdError;
use crate::utils::{checksum, ct_eq};

pub type RandomPayload20 = SpanBuffer<BD_RANDOM_PAYLOAD_SIZE>;
pub type ChallengeBlock80 = SpanBuffer<E1_DATA_SIZE>;

/// SEND KEY payload carrying one encrypted 16-byte random.
///
/// `[0] = 0x10`, `[1..4]` zero, `[4..20] = AES-CBC(key, iv, random)`.
pub fn encode_random_payload(
    random: &Nonce16,
    key: &AesKey16,
    iv: &AesIv16,
) -> Result<RandomPayload20, SacdError> {
    let mut payload = RandomPayload20::new([0u8; BD_RANDOM_PAYLOAD_SIZE]);
    let bytes = payload.expose_secret_mut();
    bytes[0] = BD_RANDOM_FIELD_LEN;
    bytes[4..20].copy_from_slice(random.expose_secret());
    aes_cbc_encrypt(key.expose_secret(), iv.expose_secret(), &mut bytes[4..20])?;
    Ok(payload)
}

/// Decrypts the two randoms of a REPORT KEY response.
///
/// Each 16-byte field is decrypted on its own, both starting from `iv`.
/// Returns `(host_random_echo, drive_random)`.
pub fn decode_randoms(
    response: &[u8],
    key: &AesKey16,
    iv: &AesIv16,
) -> Result<(Nonce16, Nonce16), SacdError> {
    if response.len() != BD_RANDOMS_RESPONSE_SIZE {
        return Err(SacdError::AuthFailed(format!(
            "randoms response is {} bytes, expected {BD_RANDOMS_RESPONSE_SIZE}",
            response.len()
        )));
    }

    let mut echo = Nonce16::new([0u8; 16]);
    echo.expose_secret_mut()
        .copy_from_slice(&response[BD_HOST_ECHO_OFFSET..BD_HOST_ECHO_OFFSET + 16]);
    aes_cbc_decrypt(key.expose_secret(), iv.expose_secret(), echo.expose_secret_mut())?;

    let mut drive_random = Nonce16::new([0u8; 16]);
    drive_random
        .expose_secret_mut()
        .copy_from_slice(&response[BD_DRIVE_RANDOM_OFFSET..BD_DRIVE_RANDOM_OFFSET + 16]);
    aes_cbc_decrypt(
        key.expose_secret(),
        iv.expose_secret(),
        drive_random.expose_secret_mut(),
    )?;

    Ok((echo, drive_random))
}

/// `true` if the drive echoed our host random unchanged.
pub fn echo_matches(echo: &Nonce16, host_random: &Nonce16) -> bool {
    ct_eq(echo.expose_secret(), host_random.expose_secret())
}

/// key7 / key8 from the two nonces of one exchange.
///
/// `key7 = AES(key3, iv, host[0..8] || drive[8..16])`,
/// `key8 = AES(key4, iv, host[8..16] || drive[0..8])`.
pub fn derive_session_keys(
    host_random: &Nonce16,
    drive_random: &Nonce16,
    key3: &AesKey16,
    key4: &AesKey16,
    iv: &AesIv16,
) -> Result<(AesKey16, AesKey16), SacdError> {
    let host = host_random.expose_secret();
    let drive = drive_random.expose_secret();

    let mut key7 = AesKey16::new([0u8; 16]);
    key7.expose_secret_mut()[..8].copy_from_slice(&host[..8]);
    key7.expose_secret_mut()[8..].copy_from_slice(&drive[8..]);
    aes_cbc_encrypt(key3.expose_secret(), iv.expose_secret(), key7.expose_secret_mut())?;

    let mut key8 = AesKey16::new([0u8; 16]);
    key8.expose_secret_mut()[..8].copy_from_slice(&host[8..]);
    key8.expose_secret_mut()[8..].copy_from_slice(&drive[..8]);
    aes_cbc_encrypt(key4.expose_secret(), iv.expose_secret(), key8.expose_secret_mut())?;

    Ok((key7, key8))
}

/// Two-key EDE key `key7 || key7[0..8]`.
pub fn cdb_key(key7: &AesKey16) -> Des3Key24 {
    let mut key = Des3Key24::new([0u8; 24]);
    key.expose_secret_mut()[..16].copy_from_slice(key7.expose_secret());
    key.expose_secret_mut()[16..].copy_from_slice(&key7.expose_secret()[..8]);
    key
}

/// Plaintext vendor CDB: marker, transfer length, checksum.
pub fn cdb_plaintext(marker: [u8; 2], transfer_len: u8) -> [u8; 8] {
    let mut cdb = [0u8; 8];
    cdb[..2].copy_from_slice(&marker);
    cdb[CDB_LENGTH_OFFSET] = transfer_len;
    cdb[CDB_CHECKSUM_OFFSET] = checksum(&cdb[..CDB_CHECKSUM_OFFSET]);
    cdb
}

/// Encrypted vendor CDB as sent to the drive.
pub fn encode_cdb(
    marker: [u8; 2],
    transfer_len: u8,
    key7: &AesKey16,
    iv2: &DesIv8,
) -> Result<[u8; 8], SacdError> {
    let mut cdb = Block8::new(cdb_plaintext(marker, transfer_len));
    let key = cdb_key(key7);
    des3_cbc_encrypt(key.expose_secret(), iv2.expose_secret(), cdb.expose_secret_mut())?;
    Ok(*cdb.expose_secret())
}

/// E1 data block, encrypted with key7 / IV3.
///
/// Plain layout: `[0..4] = 0x0000004C`, `[4] = checksum([5..80])`,
/// `[16..80] = challenge payload`.
pub fn encode_challenge_block(
    payload: &[u8; CHALLENGE_PAYLOAD_SIZE],
    key7: &AesKey16,
    iv3: &AesIv16,
) -> Result<ChallengeBlock80, SacdError> {
    let mut block = ChallengeBlock80::new([0u8; E1_DATA_SIZE]);
    let bytes = block.expose_secret_mut();
    bytes[..4].copy_from_slice(&((E1_DATA_SIZE - 4) as u32).to_be_bytes());
    bytes[E1_PAYLOAD_OFFSET..].copy_from_slice(payload);
    bytes[CHALLENGE_CHECKSUM_OFFSET] = checksum(&bytes[CHALLENGE_CHECKSUM_OFFSET + 1..]);
    aes_cbc_encrypt(key7.expose_secret(), iv3.expose_secret(), bytes)?;
    Ok(block)
}

/// Decrypts an E0 response in place and verifies its checksum.
pub fn verify_challenge_response(
    response: &mut [u8],
    key7: &AesKey16,
    iv3: &AesIv16,
) -> Result<(), SacdError> {
    if response.len() != E0_RESPONSE_SIZE {
        return Err(SacdError::AuthFailed(format!(
            "challenge response is {} bytes, expected {E0_RESPONSE_SIZE}",
            response.len()
        )));
    }
    aes_cbc_decrypt(
        key7.expose_secret(),
        iv3.expose_secret(),
        &mut response[4..E0_RESPONSE_SIZE],
    )?;

    let expected = checksum(&response[CHALLENGE_CHECKSUM_OFFSET + 1..E0_CHECKSUM_END]);
    if response[CHALLENGE_CHECKSUM_OFFSET] != expected {
        return Err(SacdError::AuthFailed("response checksum mismatch".into()));
    }
    Ok(())
}
