//! src/sac/exchange.rs
//! SAC Key Exchange state machine
//!
//! ```text
//! GetKeyFormat → SendHostChallenge → ValidateCertificate → SendSessionChallenge
//!   → ValidateSessionResponse → DeriveDiscKey → Done
//! ```
//!
//! The release command is sent on every exit path and its result ignored.
//! The work buffer is wiped after it.

use crate::aliases::{AesIv16, AesKey16, Nonce16, RsaBlock128};
use crate::anchors::TrustAnchors;
use crate::consts::{
    DISC_KEY_RESPONSE_SIZE, DRIVE_CERTIFICATE_RESPONSE_SIZE, SAC_CMD_DISC_KEY,
    SAC_CMD_DRIVE_CERTIFICATE, SAC_CMD_GET_KEY_FORMAT, SAC_CMD_HOST_CHALLENGE, SAC_CMD_RELEASE,
    SAC_CMD_SESSION_CHALLENGE, SAC_CMD_SESSION_RESPONSE, SAC_INITIAL_KEY_FORMAT,
    SAC_KEY_FORMAT_OFFSET, SAC_KEY_FORMAT_RESPONSE_SIZE, SESSION_RESPONSE_SIZE,
};
use crate::crypto::rng::{RandomSource, SecureRandomExt};
use crate::error::SacdError;
use crate::sac::certificate::{CertificateId8, DriveCertificate};
use crate::sac::packets::{
    build_session_block, decode_session_response, decrypt_disc_key, derive_session_key,
    encode_host_challenge, encode_session_challenge, key_fingerprint,
};
use crate::transport::{expect_len, Transport};
use crate::utils::secure_zero;
use log::{debug, error, warn};

/// States of one SAC Key Exchange run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SacState {
    Idle,
    GetKeyFormat,
    SendHostChallenge,
    ValidateCertificate,
    SendSessionChallenge,
    ValidateSessionResponse,
    DeriveDiscKey,
    Done,
    Failed,
}

/// Work buffer of one run. Never leaves the exchange.
struct SacContext {
    host_random: Nonce16,
    drive_response: Nonce16,
    certificate_id: CertificateId8,
    drive_key: RsaBlock128,
    host_session_random: Nonce16,
    drive_session_random: Nonce16,
    session_key: AesKey16,
    disc_key: AesKey16,
}

impl SacContext {
    fn new() -> Self {
        Self {
            host_random: Nonce16::new([0u8; 16]),
            drive_response: Nonce16::new([0u8; 16]),
            certificate_id: CertificateId8::new([0u8; 8]),
            drive_key: RsaBlock128::new([0u8; 128]),
            host_session_random: Nonce16::new([0u8; 16]),
            drive_session_random: Nonce16::new([0u8; 16]),
            session_key: AesKey16::new([0u8; 16]),
            disc_key: AesKey16::new([0u8; 16]),
        }
    }

    fn wipe(&mut self) {
        secure_zero(self.host_random.expose_secret_mut());
        secure_zero(self.drive_response.expose_secret_mut());
        secure_zero(self.certificate_id.expose_secret_mut());
        secure_zero(self.drive_key.expose_secret_mut());
        secure_zero(self.host_session_random.expose_secret_mut());
        secure_zero(self.drive_session_random.expose_secret_mut());
        secure_zero(self.session_key.expose_secret_mut());
        secure_zero(self.disc_key.expose_secret_mut());
    }
}

/// One SAC Key Exchange run against an authenticated drive.
pub struct SacKeyExchange<'a, T: Transport + ?Sized, R: RandomSource + ?Sized> {
    transport: &'a mut T,
    anchors: &'a TrustAnchors,
    rng: &'a mut R,
    state: SacState,
    trace: Vec<SacState>,
    key_format: Option<u8>,
    released: bool,
    ctx: SacContext,
}

impl<'a, T: Transport + ?Sized, R: RandomSource + ?Sized> SacKeyExchange<'a, T, R> {
    pub fn new(transport: &'a mut T, anchors: &'a TrustAnchors, rng: &'a mut R) -> Self {
        Self {
            transport,
            anchors,
            rng,
            state: SacState::Idle,
            trace: Vec::new(),
            key_format: None,
            released: false,
            ctx: SacContext::new(),
        }
    }

    pub fn state(&self) -> SacState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn trace(&self) -> &[SacState] {
        &self.trace
    }

    /// Key format reported by the drive in the first command, once known.
    pub fn key_format(&self) -> Option<u8> {
        self.key_format
    }

    /// Whether the release command has been issued.
    pub fn released(&self) -> bool {
        self.released
    }

    /// Run the exchange and return the disc key.
    pub fn run(&mut self) -> Result<AesKey16, SacdError> {
        if self.state != SacState::Idle {
            return Err(SacdError::SacFailed("key exchange run already used".into()));
        }
        let mut this = scopeguard::guard(self, |this| {
            this.release();
            this.ctx.wipe();
        });
        this.run_states()
    }

    fn enter(&mut self, state: SacState) {
        debug!("SAC key exchange: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.trace.push(state);
    }

    fn run_states(&mut self) -> Result<AesKey16, SacdError> {
        let mut next = SacState::GetKeyFormat;
        loop {
            self.enter(next);
            if next == SacState::Done {
                return Ok(self.ctx.disc_key.clone());
            }
            next = match self.step(next) {
                Ok(state) => state,
                Err(e) => {
                    error!("SAC key exchange failed in {:?}: {e}", self.state);
                    self.enter(SacState::Failed);
                    return Err(e);
                }
            };
        }
    }

    fn step(&mut self, state: SacState) -> Result<SacState, SacdError> {
        match state {
            SacState::GetKeyFormat => {
                self.get_key_format()?;
                Ok(SacState::SendHostChallenge)
            }
            SacState::SendHostChallenge => {
                self.send_host_challenge()?;
                Ok(SacState::ValidateCertificate)
            }
            SacState::ValidateCertificate => {
                self.validate_certificate()?;
                Ok(SacState::SendSessionChallenge)
            }
            SacState::SendSessionChallenge => {
                self.send_session_challenge()?;
                Ok(SacState::ValidateSessionResponse)
            }
            SacState::ValidateSessionResponse => {
                self.validate_session_response()?;
                Ok(SacState::DeriveDiscKey)
            }
            SacState::DeriveDiscKey => {
                self.derive_disc_key()?;
                Ok(SacState::Done)
            }
            SacState::Idle | SacState::Done | SacState::Failed => Err(SacdError::SacFailed(
                format!("no transition out of {state:?}"),
            )),
        }
    }

    fn format(&self) -> u8 {
        self.key_format.unwrap_or(SAC_INITIAL_KEY_FORMAT)
    }

    fn get_key_format(&mut self) -> Result<(), SacdError> {
        let response = self
            .transport
            .report_key(
                SAC_INITIAL_KEY_FORMAT,
                SAC_CMD_GET_KEY_FORMAT,
                SAC_KEY_FORMAT_RESPONSE_SIZE,
            )
            .and_then(|r| expect_len(r, SAC_KEY_FORMAT_RESPONSE_SIZE, "key format"))?;
        let format = response[SAC_KEY_FORMAT_OFFSET];
        debug!("SAC key exchange: key format {format:#04x}");
        self.key_format = Some(format);
        Ok(())
    }

    fn send_host_challenge(&mut self) -> Result<(), SacdError> {
        self.ctx.host_random = Nonce16::random_from(&mut *self.rng)?;
        let buffer = encode_host_challenge(&self.ctx.host_random, self.anchors);
        let format = self.format();
        self.transport
            .send_key(buffer.expose_secret(), format, SAC_CMD_HOST_CHALLENGE)?;
        Ok(())
    }

    fn validate_certificate(&mut self) -> Result<(), SacdError> {
        let format = self.format();
        let mut response = self
            .transport
            .report_key(
                format,
                SAC_CMD_DRIVE_CERTIFICATE,
                DRIVE_CERTIFICATE_RESPONSE_SIZE,
            )
            .and_then(|r| expect_len(r, DRIVE_CERTIFICATE_RESPONSE_SIZE, "drive certificate"))?;
        let decoded = DriveCertificate::decode(&response);
        secure_zero(&mut response);
        let certificate = decoded?;

        let drive_key = certificate.recover_drive_key(&self.anchors.ca_root_modulus)?;
        debug!(
            "SAC key exchange: drive key {} recovered",
            key_fingerprint(&drive_key)
        );
        self.ctx.drive_key = drive_key;
        self.ctx.drive_response = certificate.challenge_response;
        self.ctx.certificate_id = certificate.certificate_id;
        Ok(())
    }

    fn send_session_challenge(&mut self) -> Result<(), SacdError> {
        self.ctx.host_session_random = Nonce16::random_from(&mut *self.rng)?;
        let block = build_session_block(
            &mut *self.rng,
            self.anchors.host_certificate_id.expose_secret(),
            &self.ctx.host_session_random,
        )?;
        let buffer = encode_session_challenge(
            &block,
            &self.ctx.drive_key,
            &self.ctx.drive_response,
            &self.ctx.certificate_id,
            self.anchors,
        )?;
        let format = self.format();
        self.transport
            .send_key(buffer.expose_secret(), format, SAC_CMD_SESSION_CHALLENGE)?;
        Ok(())
    }

    fn validate_session_response(&mut self) -> Result<(), SacdError> {
        let format = self.format();
        let mut response = self
            .transport
            .report_key(format, SAC_CMD_SESSION_RESPONSE, SESSION_RESPONSE_SIZE)
            .and_then(|r| expect_len(r, SESSION_RESPONSE_SIZE, "session response"))?;
        let decoded = decode_session_response(
            &response,
            &self.ctx.drive_key,
            &self.ctx.host_random,
            &self.ctx.certificate_id,
            self.anchors,
        );
        secure_zero(&mut response);
        self.ctx.drive_session_random = decoded?;
        self.ctx.session_key =
            derive_session_key(&self.ctx.host_session_random, &self.ctx.drive_session_random);
        Ok(())
    }

    fn derive_disc_key(&mut self) -> Result<(), SacdError> {
        let format = self.format();
        let mut response = self
            .transport
            .report_key(format, SAC_CMD_DISC_KEY, DISC_KEY_RESPONSE_SIZE)
            .and_then(|r| expect_len(r, DISC_KEY_RESPONSE_SIZE, "disc key"))?;
        let decoded = decrypt_disc_key(
            &response,
            &self.ctx.session_key,
            &self.anchors.sac_static_iv,
        );
        secure_zero(&mut response);
        self.ctx.disc_key = decoded?;
        Ok(())
    }

    /// Best effort: tells the drive the channel is released.
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let format = self.format();
        if let Err(e) = self.transport.send_key(&[], format, SAC_CMD_RELEASE) {
            warn!("SAC key exchange: release command failed ({e}), ignored");
        }
    }
}

/// Run SAC Key Exchange once.
///
/// Fails with [`SacdError::NotAuthenticated`] without touching the drive unless
/// `authenticated` is true. Returns the disc key and the sector IV.
///
/// `authenticated` is taken on trust: it must be true only after
/// [`authenticate`](crate::auth::authenticate) succeeded on this same drive and
/// nothing has reset it since. [`DriveSession`](crate::DriveSession) tracks
/// that flag itself; callers driving the phases directly own it.
pub fn key_exchange<T, R>(
    transport: &mut T,
    anchors: &TrustAnchors,
    rng: &mut R,
    authenticated: bool,
) -> Result<(AesKey16, AesIv16), SacdError>
where
    T: Transport + ?Sized,
    R: RandomSource + ?Sized,
{
    if !authenticated {
        return Err(SacdError::NotAuthenticated);
    }
    let disc_key = SacKeyExchange::new(transport, anchors, rng).run()?;
    Ok((disc_key, anchors.disc_iv.clone()))
}
