// src/lib.rs

//! BD Authentication and SAC Key Exchange for SACD-capable BD drives.
//!
//! The drive returns plaintext SACD sectors only after a two-phase handshake.
//! [`DriveSession`] runs both phases over a caller-supplied [`Transport`] and
//! then decrypts sector data with the disc key the handshake produced.

pub mod aliases;
pub mod anchors;
pub mod auth;
pub mod builders;
pub mod consts;
pub mod crypto;
pub mod drive;
pub mod error;
pub mod sac;
pub mod session;
pub mod transport;
pub mod utils;

// High-level API
pub use anchors::TrustAnchors;
pub use builders::DriveSessionBuilder;
pub use drive::DriveModel;
pub use error::{SacdError, StatusCode, TransportError};
pub use session::DriveSession;
pub use transport::Transport;

// Phase entry points for callers that manage their own session state,
// including the authenticated flag `key_exchange` requires
pub use auth::authenticate;
pub use sac::key_exchange;

pub use crypto::rng::{FallbackPolicy, RandomSource, SystemRandom};
