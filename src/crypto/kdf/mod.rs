//! # Key Derivation Functions (KDF)
//!
//! - [`sha1_kdf`] - `SHA1((plain XOR crypt) || crypt)`
//!
//! The SAC session key itself is a truncated SHA-1 of the two session
//! randoms and is derived inline in [`crate::sac`].

pub mod sha1_kdf;
