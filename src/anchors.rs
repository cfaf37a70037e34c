//! # Trust Anchors
//!
//! The constant key material of the protocol: six AES keys, the fixed IVs, the
//! E1 challenge payload, the host certificate and its RSA-1024 key pair, and
//! the manufacturer CA root modulus.
//!
//! The small 175-bit host key pair is optional. The handshake only ever puts
//! its public half on the wire, inside the 175-byte `host_certificate` blob.
//!
//! The vendor values are not shipped with this crate. They are read once from
//! a JSON key file (all fields hex encoded) and then passed by shared
//! reference into both handshake phases; nothing mutates them afterwards.
//!
//! ```json
//! {
//!   "key1": "…32 hex chars…", "key2": "…", "key3": "…",
//!   "key4": "…", "key5": "…", "key6": "…",
//!   "iv1": "…", "iv2": "…16 hex chars…", "iv3": "…",
//!   "challenge_payload": "…128 hex chars…",
//!   "host_certificate": "…350 hex chars…",
//!   "host_certificate_id": "…16 hex chars…",
//!   "host_rsa_modulus": "…256 hex chars…",
//!   "host_rsa_private_exponent": "…256 hex chars…",
//!   "ca_root_modulus": "…256 hex chars…",
//!   "sac_static_iv": "…", "disc_iv": "…",
//!   "host_rsa175_modulus": "…44 hex chars… (optional)",
//!   "host_rsa175_private_exponent": "…44 hex chars… (optional)"
//! }
//! ```

use crate::aliases::{AesIv16, AesKey16, DesIv8, RsaBlock128, RsaBlock22};
use crate::consts::{
    CHALLENGE_PAYLOAD_SIZE, HOST_CERTIFICATE_ID_SIZE, HOST_CERTIFICATE_SIZE, RSA175_SIZE,
};
use crate::crypto::rsa::rsa_private_op;
use crate::error::SacdError;
use secure_gate::Fixed;
use serde::Deserialize;
use std::path::Path;

/// The immutable key table shared by every session.
#[derive(Debug, Clone)]
pub struct TrustAnchors {
    /// BD phase, first exchange: encrypts randoms sent to the drive.
    pub key1: AesKey16,
    /// BD phase, first exchange: decrypts randoms reported by the drive.
    pub key2: AesKey16,
    /// Derives key7.
    pub key3: AesKey16,
    /// Derives key8.
    pub key4: AesKey16,
    /// BD phase, re-establishment: encrypts randoms sent to the drive.
    pub key5: AesKey16,
    /// BD phase, re-establishment: decrypts randoms reported by the drive.
    pub key6: AesKey16,
    pub iv1: AesIv16,
    /// 3DES IV for the encrypted vendor CDBs.
    pub iv2: DesIv8,
    /// AES IV for the E1/E0 challenge blocks.
    pub iv3: AesIv16,
    pub challenge_payload: Fixed<[u8; CHALLENGE_PAYLOAD_SIZE]>,
    /// Sent in the clear with the SAC host challenge.
    pub host_certificate: Fixed<[u8; HOST_CERTIFICATE_SIZE]>,
    pub host_certificate_id: Fixed<[u8; HOST_CERTIFICATE_ID_SIZE]>,
    pub host_rsa_modulus: RsaBlock128,
    pub host_rsa_private_exponent: RsaBlock128,
    pub ca_root_modulus: RsaBlock128,
    /// IV of the Cmd6 disc-key blob.
    pub sac_static_iv: AesIv16,
    /// IV for sector decryption.
    pub disc_iv: AesIv16,
    /// Small host key pair, when the key file carries it.
    pub host_rsa175: Option<SmallHostKey>,
}

/// The 175-bit host key pair.
#[derive(Debug, Clone)]
pub struct SmallHostKey {
    pub modulus: RsaBlock22,
    pub private_exponent: RsaBlock22,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyFile {
    key1: String,
    key2: String,
    key3: String,
    key4: String,
    key5: String,
    key6: String,
    iv1: String,
    iv2: String,
    iv3: String,
    challenge_payload: String,
    host_certificate: String,
    host_certificate_id: String,
    host_rsa_modulus: String,
    host_rsa_private_exponent: String,
    ca_root_modulus: String,
    sac_static_iv: String,
    disc_iv: String,
    #[serde(default)]
    host_rsa175_modulus: Option<String>,
    #[serde(default)]
    host_rsa175_private_exponent: Option<String>,
}

/// Decode one hex field into a fixed-size secret, checking its length.
fn decode_field<const N: usize>(name: &str, hex_value: &str) -> Result<Fixed<[u8; N]>, SacdError> {
    let mut out = Fixed::new([0u8; N]);
    let trimmed = hex_value.trim();
    if trimmed.len() != N * 2 {
        return Err(SacdError::KeyFile(format!(
            "{name}: expected {N} bytes, got {}",
            trimmed.len() / 2
        )));
    }
    hex::decode_to_slice(trimmed, out.expose_secret_mut())
        .map_err(|e| SacdError::KeyFile(format!("{name}: {e}")))?;
    Ok(out)
}

/// Both halves of the small key, or neither.
fn decode_small_key(
    modulus: Option<&str>,
    private_exponent: Option<&str>,
) -> Result<Option<SmallHostKey>, SacdError> {
    match (modulus, private_exponent) {
        (None, None) => Ok(None),
        (Some(modulus), Some(private_exponent)) => Ok(Some(SmallHostKey {
            modulus: decode_field("host_rsa175_modulus", modulus)?,
            private_exponent: decode_field("host_rsa175_private_exponent", private_exponent)?,
        })),
        _ => Err(SacdError::KeyFile(
            "host_rsa175_modulus and host_rsa175_private_exponent must be given together".into(),
        )),
    }
}

impl TrustAnchors {
    /// Parse a key table from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self, SacdError> {
        let file: KeyFile =
            serde_json::from_str(json).map_err(|e| SacdError::KeyFile(e.to_string()))?;

        Ok(Self {
            key1: decode_field("key1", &file.key1)?,
            key2: decode_field("key2", &file.key2)?,
            key3: decode_field("key3", &file.key3)?,
            key4: decode_field("key4", &file.key4)?,
            key5: decode_field("key5", &file.key5)?,
            key6: decode_field("key6", &file.key6)?,
            iv1: decode_field("iv1", &file.iv1)?,
            iv2: decode_field("iv2", &file.iv2)?,
            iv3: decode_field("iv3", &file.iv3)?,
            challenge_payload: decode_field("challenge_payload", &file.challenge_payload)?,
            host_certificate: decode_field("host_certificate", &file.host_certificate)?,
            host_certificate_id: decode_field("host_certificate_id", &file.host_certificate_id)?,
            host_rsa_modulus: decode_field("host_rsa_modulus", &file.host_rsa_modulus)?,
            host_rsa_private_exponent: decode_field(
                "host_rsa_private_exponent",
                &file.host_rsa_private_exponent,
            )?,
            ca_root_modulus: decode_field("ca_root_modulus", &file.ca_root_modulus)?,
            sac_static_iv: decode_field("sac_static_iv", &file.sac_static_iv)?,
            disc_iv: decode_field("disc_iv", &file.disc_iv)?,
            host_rsa175: decode_small_key(
                file.host_rsa175_modulus.as_deref(),
                file.host_rsa175_private_exponent.as_deref(),
            )?,
        })
    }

    /// Private operation with the small host key.
    pub fn rsa175_private_op(&self, input: &[u8]) -> Result<RsaBlock22, SacdError> {
        let key = self.host_rsa175.as_ref().ok_or_else(|| {
            SacdError::KeyFile("host_rsa175_modulus: not present in key file".into())
        })?;
        let mut output = RsaBlock22::new([0u8; RSA175_SIZE]);
        rsa_private_op(
            key.modulus.expose_secret(),
            key.private_exponent.expose_secret(),
            input,
            output.expose_secret_mut(),
        )?;
        Ok(output)
    }

    /// Read and parse a key file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SacdError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
