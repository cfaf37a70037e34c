//! # Drive Session
//!
//! Ties the two handshake phases to one drive and keeps what they produce:
//! the phase-completion flags and the disc key/IV used for sector decryption.
//!
//! ```text
//! authenticate() ──► sac_key_exchange() ──► decrypt(buffer, sectors) …
//! ```
//!
//! The key and IV are wiped when the session is dropped, and immediately by
//! [`reset`](DriveSession::reset) and [`close`](DriveSession::close).
//! Copies handed out by [`sac_key_exchange`](DriveSession::sac_key_exchange)
//! belong to the caller.

use crate::aliases::{AesIv16, AesKey16};
use crate::anchors::TrustAnchors;
use crate::auth;
use crate::builders::DriveSessionBuilder;
use crate::consts::SECTOR_SIZE;
use crate::crypto::cbc::aes_cbc_decrypt;
use crate::crypto::rng::{RandomSource, SystemRandom};
use crate::drive::DriveModel;
use crate::error::SacdError;
use crate::sac;
use crate::transport::Transport;
use crate::utils::secure_zero;
use log::debug;

/// Disc key and IV; wiped on drop.
struct SessionKeys {
    key: AesKey16,
    iv: AesIv16,
}

impl SessionKeys {
    fn empty() -> Self {
        Self {
            key: AesKey16::new([0u8; 16]),
            iv: AesIv16::new([0u8; 16]),
        }
    }

    fn wipe(&mut self) {
        secure_zero(self.key.expose_secret_mut());
        secure_zero(self.iv.expose_secret_mut());
    }
}

impl Drop for SessionKeys {
    fn drop(&mut self) {
        self.wipe();
    }
}

/// Handshake state and derived keys for one opened drive.
pub struct DriveSession<'a, T: Transport, R: RandomSource = SystemRandom> {
    transport: T,
    anchors: &'a TrustAnchors,
    rng: R,
    authenticated: bool,
    sac_exchanged: bool,
    keys: SessionKeys,
    drive_model: Option<DriveModel>,
    last_error: Option<String>,
}

impl<'a, T: Transport> DriveSession<'a, T, SystemRandom> {
    /// Session with the OS random source and default fallback policy.
    pub fn new(transport: T, anchors: &'a TrustAnchors) -> Self {
        DriveSessionBuilder::new(transport, anchors).build()
    }
}

impl<'a, T: Transport, R: RandomSource> DriveSession<'a, T, R> {
    pub(crate) fn from_parts(
        transport: T,
        anchors: &'a TrustAnchors,
        rng: R,
        drive_model: Option<DriveModel>,
    ) -> Self {
        Self {
            transport,
            anchors,
            rng,
            authenticated: false,
            sac_exchanged: false,
            keys: SessionKeys::empty(),
            drive_model,
            last_error: None,
        }
    }

    /// Run BD Authentication. A session that is already authenticated returns
    /// immediately; call [`reset`](Self::reset) first to start over.
    pub fn authenticate(&mut self) -> Result<(), SacdError> {
        if self.authenticated {
            debug!("drive session: already authenticated");
            return Ok(());
        }
        let result = auth::authenticate(&mut self.transport, self.anchors, &mut self.rng);
        self.record(result)?;
        self.authenticated = true;
        Ok(())
    }

    /// Run SAC Key Exchange and keep the disc key and IV.
    ///
    /// Returns copies of the cached key and IV without touching the drive once
    /// the exchange has completed.
    pub fn sac_key_exchange(&mut self) -> Result<(AesKey16, AesIv16), SacdError> {
        if self.sac_exchanged {
            return Ok((self.keys.key.clone(), self.keys.iv.clone()));
        }
        let result = self.run_key_exchange();
        let (key, iv) = self.record(result)?;
        self.keys.wipe();
        self.keys.key = key;
        self.keys.iv = iv;
        self.sac_exchanged = true;
        Ok((self.keys.key.clone(), self.keys.iv.clone()))
    }

    fn run_key_exchange(&mut self) -> Result<(AesKey16, AesIv16), SacdError> {
        if !self.authenticated {
            return Err(SacdError::NotAuthenticated);
        }
        self.transport.prepare_key_exchange()?;
        sac::key_exchange(
            &mut self.transport,
            self.anchors,
            &mut self.rng,
            self.authenticated,
        )
    }

    /// Decrypt `sector_count` 2048-byte sectors at the start of `buffer` in
    /// place, as one AES-128-CBC chain from the disc IV.
    pub fn decrypt(&self, buffer: &mut [u8], sector_count: usize) -> Result<(), SacdError> {
        if !self.sac_exchanged {
            return Err(SacdError::NotAuthenticated);
        }
        if sector_count == 0 {
            return Ok(());
        }
        let len = sector_count
            .checked_mul(SECTOR_SIZE)
            .ok_or_else(|| SacdError::CryptoFailed("sector count overflows".into()))?;
        if buffer.len() < len {
            return Err(SacdError::CryptoFailed(format!(
                "buffer holds {} bytes, {sector_count} sectors need {len}",
                buffer.len()
            )));
        }
        aes_cbc_decrypt(
            self.keys.key.expose_secret(),
            self.keys.iv.expose_secret(),
            &mut buffer[..len],
        )
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn is_key_exchanged(&self) -> bool {
        self.sac_exchanged
    }

    pub fn drive_model(&self) -> Option<DriveModel> {
        self.drive_model
    }

    /// Display text of the most recent phase failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Forget both phases and wipe the key and IV.
    pub fn reset(&mut self) {
        self.authenticated = false;
        self.sac_exchanged = false;
        self.last_error = None;
        self.keys.wipe();
    }

    /// Wipe the session and hand the transport back.
    pub fn close(mut self) -> T {
        self.reset();
        self.transport
    }

    fn record<V>(&mut self, result: Result<V, SacdError>) -> Result<V, SacdError> {
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }
}
