// src/sac/mod.rs

//! SAC Key Exchange: the second handshake phase.
//!
//! Runs only after BD Authentication succeeded. Recovers the drive's RSA key
//! from its CA-signed certificate, agrees on a session key and returns the
//! disc key used for sector decryption.

pub mod certificate;
pub(crate) mod exchange;
pub mod packets;

pub use certificate::DriveCertificate;
pub use exchange::{key_exchange, SacKeyExchange, SacState};
