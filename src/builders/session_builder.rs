//! src/builders/session_builder.rs
//! DriveSession builder

use crate::anchors::TrustAnchors;
use crate::crypto::rng::{FallbackPolicy, RandomSource, SystemRandom};
use crate::drive::DriveModel;
use crate::session::DriveSession;
use crate::transport::Transport;

/// Builder for a [`DriveSession`].
///
/// Defaults: OS random source with [`FallbackPolicy::Deterministic`], no drive
/// model recorded.
///
/// ```ignore
/// let anchors = TrustAnchors::load("keys.json")?;
/// let mut session = DriveSessionBuilder::new(drive, &anchors)
///     .with_fallback_policy(FallbackPolicy::FailClosed)
///     .with_drive_model(DriveModel::PioneerBdrS)
///     .build();
/// session.authenticate()?;
/// ```
pub struct DriveSessionBuilder<'a, T: Transport, R: RandomSource = SystemRandom> {
    transport: T,
    anchors: &'a TrustAnchors,
    rng: R,
    drive_model: Option<DriveModel>,
}

impl<'a, T: Transport> DriveSessionBuilder<'a, T, SystemRandom> {
    #[must_use]
    pub fn new(transport: T, anchors: &'a TrustAnchors) -> Self {
        Self {
            transport,
            anchors,
            rng: SystemRandom::new(),
            drive_model: None,
        }
    }

    /// What the OS random source does if it fails.
    #[must_use]
    pub fn with_fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.rng = SystemRandom::new().with_policy(policy);
        self
    }
}

impl<'a, T: Transport, R: RandomSource> DriveSessionBuilder<'a, T, R> {
    /// Replace the random source (tests pass a fixed-output source here).
    #[must_use]
    pub fn with_random<S: RandomSource>(self, rng: S) -> DriveSessionBuilder<'a, T, S> {
        DriveSessionBuilder {
            transport: self.transport,
            anchors: self.anchors,
            rng,
            drive_model: self.drive_model,
        }
    }

    #[must_use]
    pub fn with_drive_model(mut self, model: DriveModel) -> Self {
        self.drive_model = Some(model);
        self
    }

    /// Record the drive model from its INQUIRY strings; unknown drives leave
    /// it unset.
    #[must_use]
    pub fn with_inquiry(mut self, vendor: &str, product: &str) -> Self {
        self.drive_model = DriveModel::identify(vendor, product);
        self
    }

    #[must_use]
    pub fn build(self) -> DriveSession<'a, T, R> {
        DriveSession::from_parts(self.transport, self.anchors, self.rng, self.drive_model)
    }
}
