// src/crypto/mod.rs

//! Low-level crypto primitives.
//!
//! Stateless wrappers the handshake is built from. All of them work on
//! caller-owned buffers and never keep key material beyond the call.

pub mod cbc;
pub mod digest;
pub mod kdf;
pub mod rng;
pub mod rsa;

pub use cbc::{
    aes256_cbc_decrypt, aes256_cbc_encrypt, aes_cbc_decrypt, aes_cbc_encrypt, des3_cbc_decrypt,
    des3_cbc_encrypt, des_cbc_decrypt,
};
pub use digest::{sha1, sha1_parts};
pub use kdf::sha1_kdf::sha1_kdf;
pub use rng::{fill_nonzero, random_bytes, FallbackPolicy, RandomSource, SystemRandom};
pub use rsa::{rsa_private_op, rsa_public_op_pow65537};
