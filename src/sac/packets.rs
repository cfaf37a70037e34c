//! src/sac/packets.rs
//! Byte layouts of the SAC Key Exchange
//!
//! Encoders build the exact SEND KEY buffers (4-byte big-endian length header,
//! payload, zero padding to a multiple of 4); decoders validate and pull
//! fields out of REPORT KEY responses.

use crate::aliases::{AesIv16, AesKey16, Nonce16, RsaBlock128, SpanBuffer};
use crate::anchors::TrustAnchors;
use crate::consts::{
    CIPHERTEXT_SUFFIX_SIZE, DISC_KEY_OFFSET, DISC_KEY_RESPONSE_SIZE, HOST_CERTIFICATE_MARKER,
    HOST_CERTIFICATE_NUMBER, HOST_CHALLENGE_PAYLOAD_SIZE, INNER_CIPHERTEXT_END,
    INNER_CIPHERTEXT_START, ISO9796_HEADER, ISO9796_TRAILER, PKCS1_RANDOM_PAD_SIZE, RSA1024_SIZE,
    SESSION_CHALLENGE_PAYLOAD_SIZE, SESSION_RESPONSE_SIZE, SIGNATURE_HASH_INPUT_SIZE,
    SIGNED_CIPHERTEXT_PREFIX,
};
use crate::crypto::cbc::aes_cbc_decrypt;
use crate::crypto::digest::{sha1, sha1_parts};
use crate::crypto::rng::{fill_nonzero, RandomSource};
use crate::crypto::rsa::{rsa_private_op, rsa_public_op_pow65537};
use crate::error::SacdError;
use crate::sac::certificate::CertificateId8;
use crate::utils::{ct_eq, padded_send_size, secure_zero};

pub const HOST_CHALLENGE_SEND_SIZE: usize = padded_send_size(HOST_CHALLENGE_PAYLOAD_SIZE);
pub const SESSION_CHALLENGE_SEND_SIZE: usize = padded_send_size(SESSION_CHALLENGE_PAYLOAD_SIZE);

const _: () = assert!(16 + 8 + RSA1024_SIZE == SIGNATURE_HASH_INPUT_SIZE);

pub type HostChallenge208 = SpanBuffer<HOST_CHALLENGE_SEND_SIZE>;
pub type SessionChallenge180 = SpanBuffer<SESSION_CHALLENGE_SEND_SIZE>;

/// Cmd2 buffer.
///
/// `[0..4]` length 201, `[4..20]` host random, `[20..24]` zero,
/// `[24..28]` host certificate number, `[28..30]` marker `0x0099`,
/// `[30..205]` host certificate, then zero padding.
pub fn encode_host_challenge(host_random: &Nonce16, anchors: &TrustAnchors) -> HostChallenge208 {
    let mut buffer = HostChallenge208::new([0u8; HOST_CHALLENGE_SEND_SIZE]);
    let bytes = buffer.expose_secret_mut();
    bytes[..4].copy_from_slice(&(HOST_CHALLENGE_PAYLOAD_SIZE as u32).to_be_bytes());
    bytes[4..20].copy_from_slice(host_random.expose_secret());
    bytes[24..28].copy_from_slice(&HOST_CERTIFICATE_NUMBER.to_be_bytes());
    bytes[28..30].copy_from_slice(&HOST_CERTIFICATE_MARKER.to_be_bytes());
    bytes[30..30 + anchors.host_certificate.expose_secret().len()]
        .copy_from_slice(anchors.host_certificate.expose_secret());
    buffer
}

/// PKCS#1 v1.5 type-2 block carrying the host session random.
///
/// `00 02 || 101 non-zero random bytes || 00 || host certificate id || random`.
pub fn build_session_block<R: RandomSource + ?Sized>(
    rng: &mut R,
    host_certificate_id: &[u8; 8],
    host_session_random: &Nonce16,
) -> Result<RsaBlock128, SacdError> {
    let mut block = RsaBlock128::new([0u8; RSA1024_SIZE]);
    let bytes = block.expose_secret_mut();
    bytes[1] = 0x02;
    fill_nonzero(rng, &mut bytes[2..2 + PKCS1_RANDOM_PAD_SIZE])?;
    let id_start = 3 + PKCS1_RANDOM_PAD_SIZE;
    bytes[id_start..id_start + 8].copy_from_slice(host_certificate_id);
    bytes[id_start + 8..].copy_from_slice(host_session_random.expose_secret());
    Ok(block)
}

/// Cmd4 buffer: encrypted session block plus host signature.
///
/// The session block is RSA-encrypted with the drive key. The signature block
/// is `6a || drive_response || cert_id || enc[0..82] || SHA1(drive_response ||
/// cert_id || enc) || bc`, signed with the host private key. The buffer
/// carries the signature followed by `enc[82..128]`.
pub fn encode_session_challenge(
    session_block: &RsaBlock128,
    drive_key: &RsaBlock128,
    drive_response: &Nonce16,
    certificate_id: &CertificateId8,
    anchors: &TrustAnchors,
) -> Result<SessionChallenge180, SacdError> {
    let mut encrypted = RsaBlock128::new([0u8; RSA1024_SIZE]);
    rsa_public_op_pow65537(
        drive_key.expose_secret(),
        session_block.expose_secret(),
        encrypted.expose_secret_mut(),
    )?;
    let enc = encrypted.expose_secret();

    let digest = sha1_parts(&[
        drive_response.expose_secret(),
        certificate_id.expose_secret(),
        enc,
    ]);

    let mut signing_input = RsaBlock128::new([0u8; RSA1024_SIZE]);
    {
        let s = signing_input.expose_secret_mut();
        s[0] = ISO9796_HEADER;
        s[1..17].copy_from_slice(drive_response.expose_secret());
        s[17..25].copy_from_slice(certificate_id.expose_secret());
        s[25..25 + SIGNED_CIPHERTEXT_PREFIX].copy_from_slice(&enc[..SIGNED_CIPHERTEXT_PREFIX]);
        s[107..127].copy_from_slice(digest.expose_secret());
        s[127] = ISO9796_TRAILER;
    }

    let mut buffer = SessionChallenge180::new([0u8; SESSION_CHALLENGE_SEND_SIZE]);
    let bytes = buffer.expose_secret_mut();
    bytes[..4].copy_from_slice(&(SESSION_CHALLENGE_PAYLOAD_SIZE as u32).to_be_bytes());
    rsa_private_op(
        anchors.host_rsa_modulus.expose_secret(),
        anchors.host_rsa_private_exponent.expose_secret(),
        signing_input.expose_secret(),
        &mut bytes[4..4 + RSA1024_SIZE],
    )?;
    bytes[4 + RSA1024_SIZE..4 + RSA1024_SIZE + CIPHERTEXT_SUFFIX_SIZE]
        .copy_from_slice(&enc[SIGNED_CIPHERTEXT_PREFIX..]);
    Ok(buffer)
}

/// Validates a Cmd5 response and returns the drive session random.
pub fn decode_session_response(
    response: &[u8],
    drive_key: &RsaBlock128,
    host_random: &Nonce16,
    certificate_id: &CertificateId8,
    anchors: &TrustAnchors,
) -> Result<Nonce16, SacdError> {
    if response.len() != SESSION_RESPONSE_SIZE {
        return Err(SacdError::SacFailed(format!(
            "session response is {} bytes, expected {SESSION_RESPONSE_SIZE}",
            response.len()
        )));
    }

    let mut outer = RsaBlock128::new([0u8; RSA1024_SIZE]);
    rsa_public_op_pow65537(
        drive_key.expose_secret(),
        &response[..RSA1024_SIZE],
        outer.expose_secret_mut(),
    )?;
    let outer_bytes = outer.expose_secret();
    if outer_bytes[0] != ISO9796_HEADER {
        return Err(SacdError::SacFailed("invalid session response signature".into()));
    }
    if !ct_eq(&outer_bytes[1..17], host_random.expose_secret()) {
        return Err(SacdError::SacFailed("host random echo mismatch".into()));
    }

    let mut inner = RsaBlock128::new([0u8; RSA1024_SIZE]);
    let head = INNER_CIPHERTEXT_END - INNER_CIPHERTEXT_START;
    inner.expose_secret_mut()[..head]
        .copy_from_slice(&outer_bytes[INNER_CIPHERTEXT_START..INNER_CIPHERTEXT_END]);
    inner.expose_secret_mut()[head..].copy_from_slice(&response[RSA1024_SIZE..]);

    let mut plain = RsaBlock128::new([0u8; RSA1024_SIZE]);
    rsa_private_op(
        anchors.host_rsa_modulus.expose_secret(),
        anchors.host_rsa_private_exponent.expose_secret(),
        inner.expose_secret(),
        plain.expose_secret_mut(),
    )?;
    parse_session_block(plain.expose_secret(), certificate_id)
}

/// Pulls the session random out of a decrypted PKCS#1 type-2 block.
fn parse_session_block(
    block: &[u8; RSA1024_SIZE],
    certificate_id: &CertificateId8,
) -> Result<Nonce16, SacdError> {
    if block[0] != 0x00 || block[1] != 0x02 {
        return Err(SacdError::SacFailed("bad PKCS#1 header".into()));
    }
    let separator = block[2..]
        .iter()
        .position(|&b| b == 0x00)
        .map(|p| p + 2)
        .ok_or_else(|| SacdError::SacFailed("PKCS#1 separator missing".into()))?;

    let id_start = separator + 1;
    if id_start + 8 + 16 > RSA1024_SIZE {
        return Err(SacdError::SacFailed("PKCS#1 payload truncated".into()));
    }
    if !ct_eq(&block[id_start..id_start + 8], certificate_id.expose_secret()) {
        return Err(SacdError::SacFailed("certificate id mismatch".into()));
    }

    let mut random = Nonce16::new([0u8; 16]);
    random
        .expose_secret_mut()
        .copy_from_slice(&block[id_start + 8..id_start + 24]);
    Ok(random)
}

/// `SHA1(host_session_random || drive_session_random)[0..16]`.
pub fn derive_session_key(
    host_session_random: &Nonce16,
    drive_session_random: &Nonce16,
) -> AesKey16 {
    let digest = sha1_parts(&[
        host_session_random.expose_secret(),
        drive_session_random.expose_secret(),
    ]);
    let mut key = AesKey16::new([0u8; 16]);
    key.expose_secret_mut()
        .copy_from_slice(&digest.expose_secret()[..16]);
    key
}

/// Decrypts the Cmd6 blob and returns the disc key at `[0x20..0x30]`.
pub fn decrypt_disc_key(
    blob: &[u8],
    session_key: &AesKey16,
    sac_static_iv: &AesIv16,
) -> Result<AesKey16, SacdError> {
    if blob.len() != DISC_KEY_RESPONSE_SIZE {
        return Err(SacdError::SacFailed(format!(
            "disc key blob is {} bytes, expected {DISC_KEY_RESPONSE_SIZE}",
            blob.len()
        )));
    }
    let mut plain = [0u8; DISC_KEY_RESPONSE_SIZE];
    plain.copy_from_slice(blob);
    let decrypted = aes_cbc_decrypt(
        session_key.expose_secret(),
        sac_static_iv.expose_secret(),
        &mut plain,
    );
    let mut disc_key = AesKey16::new([0u8; 16]);
    if decrypted.is_ok() {
        disc_key
            .expose_secret_mut()
            .copy_from_slice(&plain[DISC_KEY_OFFSET..DISC_KEY_OFFSET + 16]);
    }
    secure_zero(&mut plain);
    decrypted.map(|()| disc_key)
}

/// SHA-1 fingerprint of a drive key, for log lines.
pub fn key_fingerprint(drive_key: &RsaBlock128) -> String {
    hex::encode(&sha1(drive_key.expose_secret()).expose_secret()[..4])
}
