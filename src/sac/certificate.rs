//! src/sac/certificate.rs
//! Drive certificate (Cmd3 response) and drive public key recovery

use crate::aliases::{Nonce16, RsaBlock128, SpanBuffer};
use crate::consts::{
    CERTIFICATE_TRAILER_SIZE, DRIVE_CERTIFICATE_BODY_SIZE, DRIVE_CERTIFICATE_ID_SIZE,
    DRIVE_CERTIFICATE_MARKER, DRIVE_CERTIFICATE_RESPONSE_SIZE, ISO9796_HEADER, RECOVERED_MODULUS_END,
    RECOVERED_MODULUS_START, RSA1024_SIZE,
};
use crate::crypto::rsa::rsa_public_op_pow65537;
use crate::error::SacdError;

pub type CertificateId8 = SpanBuffer<DRIVE_CERTIFICATE_ID_SIZE>;
pub type CertificateTrailer39 = SpanBuffer<CERTIFICATE_TRAILER_SIZE>;

// Offsets inside the 208-byte response (4-byte length header first).
const BODY: usize = 4;
const CHALLENGE_RESPONSE: usize = BODY;
const CERTIFICATE_ID: usize = BODY + 16;
const MARKER: usize = BODY + 25;
const MODULUS: usize = BODY + 26;
const TRAILER: usize = MODULUS + RSA1024_SIZE;

/// The drive's answer to the host challenge.
#[derive(Debug)]
pub struct DriveCertificate {
    /// Drive's response to the host challenge, bound into the signature.
    pub challenge_response: Nonce16,
    pub certificate_id: CertificateId8,
    /// CA-signed block carrying the first 89 bytes of the drive modulus.
    pub signed_modulus: RsaBlock128,
    /// Last 39 bytes of the drive modulus, sent in the clear.
    pub trailer: CertificateTrailer39,
    pub marker: u8,
}

impl DriveCertificate {
    /// Parse a Cmd3 response.
    ///
    /// The format marker is checked before anything else is copied out.
    pub fn decode(response: &[u8]) -> Result<Self, SacdError> {
        if response.len() != DRIVE_CERTIFICATE_RESPONSE_SIZE {
            return Err(SacdError::SacFailed(format!(
                "certificate response is {} bytes, expected {DRIVE_CERTIFICATE_RESPONSE_SIZE}",
                response.len()
            )));
        }

        let marker = response[MARKER];
        if marker != DRIVE_CERTIFICATE_MARKER {
            return Err(SacdError::SacFailed(format!(
                "invalid certificate type {marker:#04x}"
            )));
        }

        let length = u32::from_be_bytes([response[0], response[1], response[2], response[3]]);
        if (length as usize) < DRIVE_CERTIFICATE_BODY_SIZE {
            return Err(SacdError::SacFailed(format!(
                "certificate body length {length} is shorter than {DRIVE_CERTIFICATE_BODY_SIZE}"
            )));
        }

        let mut certificate = Self {
            challenge_response: Nonce16::new([0u8; 16]),
            certificate_id: CertificateId8::new([0u8; DRIVE_CERTIFICATE_ID_SIZE]),
            signed_modulus: RsaBlock128::new([0u8; RSA1024_SIZE]),
            trailer: CertificateTrailer39::new([0u8; CERTIFICATE_TRAILER_SIZE]),
            marker,
        };
        certificate
            .challenge_response
            .expose_secret_mut()
            .copy_from_slice(&response[CHALLENGE_RESPONSE..CHALLENGE_RESPONSE + 16]);
        certificate
            .certificate_id
            .expose_secret_mut()
            .copy_from_slice(&response[CERTIFICATE_ID..CERTIFICATE_ID + DRIVE_CERTIFICATE_ID_SIZE]);
        certificate
            .signed_modulus
            .expose_secret_mut()
            .copy_from_slice(&response[MODULUS..MODULUS + RSA1024_SIZE]);
        certificate
            .trailer
            .expose_secret_mut()
            .copy_from_slice(&response[TRAILER..TRAILER + CERTIFICATE_TRAILER_SIZE]);
        Ok(certificate)
    }

    /// Recover the drive's RSA-1024 public modulus.
    ///
    /// `signed_modulus ^ 65537 mod ca_root` must start with `0x6a`; the modulus
    /// is bytes `[18..107]` of that block followed by the 39 trailer bytes.
    pub fn recover_drive_key(
        &self,
        ca_root_modulus: &RsaBlock128,
    ) -> Result<RsaBlock128, SacdError> {
        let mut recovered = RsaBlock128::new([0u8; RSA1024_SIZE]);
        rsa_public_op_pow65537(
            ca_root_modulus.expose_secret(),
            self.signed_modulus.expose_secret(),
            recovered.expose_secret_mut(),
        )?;

        let block = recovered.expose_secret();
        if block[0] != ISO9796_HEADER {
            return Err(SacdError::SacFailed(
                "drive certificate signature is invalid".into(),
            ));
        }

        let head = RECOVERED_MODULUS_END - RECOVERED_MODULUS_START;
        let mut drive_key = RsaBlock128::new([0u8; RSA1024_SIZE]);
        drive_key.expose_secret_mut()[..head]
            .copy_from_slice(&block[RECOVERED_MODULUS_START..RECOVERED_MODULUS_END]);
        drive_key.expose_secret_mut()[head..].copy_from_slice(self.trailer.expose_secret());
        Ok(drive_key)
    }
}
