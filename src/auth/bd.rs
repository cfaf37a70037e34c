//! src/auth/bd.rs
//! BD Authentication state machine
//!
//! ```text
//! CheckReady → SecurityCheck → SendHostRandom → ReceiveRandoms → SendDriveRandom
//!   → DeriveKeys1 → SendChallengeE1 → ReestablishSession → DeriveKeys2
//!   → VerifyChallengeE0 → Authenticated
//! ```
//!
//! Any failure moves to `Failed` and ends the run; nothing is retried. The
//! nonces and key7/key8 live in a run-local context that is wiped when the run
//! ends, successfully or not.

use crate::aliases::{AesKey16, Nonce16};
use crate::anchors::TrustAnchors;
use crate::auth::packets::{
    decode_randoms, derive_session_keys, echo_matches, encode_cdb, encode_challenge_block,
    encode_random_payload, verify_challenge_response,
};
use crate::consts::{
    BD_KEY_CLASS, BD_RANDOMS_RESPONSE_SIZE, BD_REESTABLISH_DRIVE_RANDOM,
    BD_REESTABLISH_HOST_RANDOM, BD_REESTABLISH_REPORT_RANDOMS, BD_REPORT_RANDOMS,
    BD_SECURITY_INIT, BD_SEND_DRIVE_RANDOM, BD_SEND_HOST_RANDOM, CDB_MARKER_E0, CDB_MARKER_E1,
    E0_RESPONSE_SIZE, E1_DATA_SIZE,
};
use crate::crypto::rng::{RandomSource, SecureRandomExt};
use crate::error::{SacdError, TransportError};
use crate::transport::{expect_len, Transport};
use crate::utils::secure_zero;
use log::{debug, error, warn};

/// States of one BD Authentication run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BdState {
    Idle,
    CheckReady,
    SecurityCheck,
    SendHostRandom,
    ReceiveRandoms,
    SendDriveRandom,
    DeriveKeys1,
    SendChallengeE1,
    ReestablishSession,
    DeriveKeys2,
    VerifyChallengeE0,
    Authenticated,
    Failed,
}

/// The first random exchange and its re-establishment differ only in
/// subcommands and trust-anchor keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exchange {
    Initial,
    Reestablish,
}

impl Exchange {
    /// (send host random, report randoms, send drive random)
    const fn subcommands(self) -> (u8, u8, u8) {
        match self {
            Exchange::Initial => (BD_SEND_HOST_RANDOM, BD_REPORT_RANDOMS, BD_SEND_DRIVE_RANDOM),
            Exchange::Reestablish => (
                BD_REESTABLISH_HOST_RANDOM,
                BD_REESTABLISH_REPORT_RANDOMS,
                BD_REESTABLISH_DRIVE_RANDOM,
            ),
        }
    }

    /// (encrypt key, decrypt key)
    fn keys(self, anchors: &TrustAnchors) -> (&AesKey16, &AesKey16) {
        match self {
            Exchange::Initial => (&anchors.key1, &anchors.key2),
            Exchange::Reestablish => (&anchors.key5, &anchors.key6),
        }
    }
}

/// Nonces and derived keys of one run.
struct BdContext {
    host_random: Nonce16,
    drive_random: Nonce16,
    key7: AesKey16,
    key8: AesKey16,
}

impl BdContext {
    fn new() -> Self {
        Self {
            host_random: Nonce16::new([0u8; 16]),
            drive_random: Nonce16::new([0u8; 16]),
            key7: AesKey16::new([0u8; 16]),
            key8: AesKey16::new([0u8; 16]),
        }
    }

    fn wipe(&mut self) {
        secure_zero(self.host_random.expose_secret_mut());
        secure_zero(self.drive_random.expose_secret_mut());
        secure_zero(self.key7.expose_secret_mut());
        secure_zero(self.key8.expose_secret_mut());
    }
}

fn command_failed(step: &str, e: TransportError) -> SacdError {
    SacdError::AuthFailed(format!("{step}: {e}"))
}

/// One BD Authentication run against a drive.
pub struct BdAuthentication<'a, T: Transport + ?Sized, R: RandomSource + ?Sized> {
    transport: &'a mut T,
    anchors: &'a TrustAnchors,
    rng: &'a mut R,
    state: BdState,
    trace: Vec<BdState>,
    ctx: BdContext,
}

impl<'a, T: Transport + ?Sized, R: RandomSource + ?Sized> BdAuthentication<'a, T, R> {
    pub fn new(transport: &'a mut T, anchors: &'a TrustAnchors, rng: &'a mut R) -> Self {
        Self {
            transport,
            anchors,
            rng,
            state: BdState::Idle,
            trace: Vec::new(),
            ctx: BdContext::new(),
        }
    }

    /// Current state; `Authenticated` or `Failed` once [`run`](Self::run) returned.
    pub fn state(&self) -> BdState {
        self.state
    }

    /// Every state entered so far, in order.
    pub fn trace(&self) -> &[BdState] {
        &self.trace
    }

    /// Run the phase to completion.
    pub fn run(&mut self) -> Result<(), SacdError> {
        if self.state != BdState::Idle {
            return Err(SacdError::AuthFailed(
                "authentication run already used".into(),
            ));
        }
        let result = self.run_states();
        self.ctx.wipe();
        result
    }

    fn enter(&mut self, state: BdState) {
        debug!("BD authentication: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.trace.push(state);
    }

    fn run_states(&mut self) -> Result<(), SacdError> {
        let mut next = BdState::CheckReady;
        loop {
            self.enter(next);
            if next == BdState::Authenticated {
                return Ok(());
            }
            next = match self.step(next) {
                Ok(state) => state,
                Err(e) => {
                    error!("BD authentication failed in {:?}: {e}", self.state);
                    self.enter(BdState::Failed);
                    return Err(e);
                }
            };
        }
    }

    fn step(&mut self, state: BdState) -> Result<BdState, SacdError> {
        match state {
            BdState::CheckReady => {
                self.check_ready();
                Ok(BdState::SecurityCheck)
            }
            BdState::SecurityCheck => {
                self.transport
                    .send_key(&[], BD_KEY_CLASS, BD_SECURITY_INIT)
                    .map_err(|e| command_failed("security check", e))?;
                Ok(BdState::SendHostRandom)
            }
            BdState::SendHostRandom => {
                self.send_host_random(Exchange::Initial)?;
                Ok(BdState::ReceiveRandoms)
            }
            BdState::ReceiveRandoms => {
                self.receive_randoms(Exchange::Initial)?;
                Ok(BdState::SendDriveRandom)
            }
            BdState::SendDriveRandom => {
                self.send_drive_random(Exchange::Initial)?;
                Ok(BdState::DeriveKeys1)
            }
            BdState::DeriveKeys1 => {
                self.derive_keys()?;
                Ok(BdState::SendChallengeE1)
            }
            BdState::SendChallengeE1 => {
                self.send_challenge()?;
                Ok(BdState::ReestablishSession)
            }
            BdState::ReestablishSession => {
                self.send_host_random(Exchange::Reestablish)?;
                self.receive_randoms(Exchange::Reestablish)?;
                self.send_drive_random(Exchange::Reestablish)?;
                Ok(BdState::DeriveKeys2)
            }
            BdState::DeriveKeys2 => {
                self.derive_keys()?;
                Ok(BdState::VerifyChallengeE0)
            }
            BdState::VerifyChallengeE0 => {
                self.verify_challenge()?;
                Ok(BdState::Authenticated)
            }
            BdState::Idle | BdState::Authenticated | BdState::Failed => Err(
                SacdError::AuthFailed(format!("no transition out of {state:?}")),
            ),
        }
    }

    /// Best effort: every failure is tolerated here.
    fn check_ready(&mut self) {
        match self.transport.ready_check() {
            Ok(()) => {}
            Err(status) if status.is_medium_not_present() => {
                debug!("BD authentication: no medium ({status}), continuing");
            }
            Err(status) => {
                warn!("BD authentication: ready check failed ({status}), continuing");
            }
        }
    }

    fn send_host_random(&mut self, exchange: Exchange) -> Result<(), SacdError> {
        let (send_host, _, _) = exchange.subcommands();
        let (enc_key, _) = exchange.keys(self.anchors);

        self.ctx.host_random = Nonce16::random_from(&mut *self.rng)?;
        let payload = encode_random_payload(&self.ctx.host_random, enc_key, &self.anchors.iv1)?;
        self.transport
            .send_key(payload.expose_secret(), BD_KEY_CLASS, send_host)
            .map_err(|e| command_failed("send host random", e))
    }

    fn receive_randoms(&mut self, exchange: Exchange) -> Result<(), SacdError> {
        let (_, report, _) = exchange.subcommands();
        let (_, dec_key) = exchange.keys(self.anchors);

        let mut response = self
            .transport
            .report_key(BD_KEY_CLASS, report, BD_RANDOMS_RESPONSE_SIZE)
            .and_then(|r| expect_len(r, BD_RANDOMS_RESPONSE_SIZE, "randoms"))
            .map_err(|e| command_failed("receive randoms", e))?;

        let decoded = decode_randoms(&response, dec_key, &self.anchors.iv1);
        secure_zero(&mut response);
        let (echo, drive_random) = decoded?;

        if !echo_matches(&echo, &self.ctx.host_random) {
            return Err(SacdError::AuthFailed("host random mismatch".into()));
        }
        self.ctx.drive_random = drive_random;
        Ok(())
    }

    fn send_drive_random(&mut self, exchange: Exchange) -> Result<(), SacdError> {
        let (_, _, send_drive) = exchange.subcommands();
        let (enc_key, _) = exchange.keys(self.anchors);

        let payload = encode_random_payload(&self.ctx.drive_random, enc_key, &self.anchors.iv1)?;
        self.transport
            .send_key(payload.expose_secret(), BD_KEY_CLASS, send_drive)
            .map_err(|e| command_failed("send drive random", e))
    }

    fn derive_keys(&mut self) -> Result<(), SacdError> {
        let (key7, key8) = derive_session_keys(
            &self.ctx.host_random,
            &self.ctx.drive_random,
            &self.anchors.key3,
            &self.anchors.key4,
            &self.anchors.iv1,
        )?;
        self.ctx.key7 = key7;
        self.ctx.key8 = key8;
        Ok(())
    }

    fn send_challenge(&mut self) -> Result<(), SacdError> {
        let cdb = encode_cdb(
            CDB_MARKER_E1,
            E1_DATA_SIZE as u8,
            &self.ctx.key7,
            &self.anchors.iv2,
        )?;
        let data = encode_challenge_block(
            self.anchors.challenge_payload.expose_secret(),
            &self.ctx.key7,
            &self.anchors.iv3,
        )?;
        self.transport
            .vendor_command_e1(&cdb, data.expose_secret())
            .map_err(|e| command_failed("send challenge", e))
    }

    fn verify_challenge(&mut self) -> Result<(), SacdError> {
        let cdb = encode_cdb(
            CDB_MARKER_E0,
            E0_RESPONSE_SIZE as u8,
            &self.ctx.key7,
            &self.anchors.iv2,
        )?;
        let mut response = self
            .transport
            .vendor_command_e0(&cdb, E0_RESPONSE_SIZE)
            .and_then(|r| expect_len(r, E0_RESPONSE_SIZE, "challenge response"))
            .map_err(|e| command_failed("verify challenge", e))?;

        let verified = verify_challenge_response(&mut response, &self.ctx.key7, &self.anchors.iv3);
        secure_zero(&mut response);
        verified
    }
}

/// Run BD Authentication once.
pub fn authenticate<T, R>(
    transport: &mut T,
    anchors: &TrustAnchors,
    rng: &mut R,
) -> Result<(), SacdError>
where
    T: Transport + ?Sized,
    R: RandomSource + ?Sized,
{
    BdAuthentication::new(transport, anchors, rng).run()
}
