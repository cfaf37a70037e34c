//! # Secure-Gate Type Aliases
//!
//! Every buffer that ever holds key material, a nonce or an intermediate of the
//! handshake is one of the fixed-size aliases below. They are thin wrappers over
//! [`secure_gate::Fixed`] and require an explicit `.expose_secret()` /
//! `.expose_secret_mut()` to reach the bytes. `Fixed` does not wipe itself on
//! drop; every owner wipes its buffers with [`crate::utils::secure_zero`].
//!
//! ## Type Categories
//!
//! ### Symmetric keys
//! - [`AesKey16`] - AES-128 key (trust-anchor keys, key7/key8, disc key)
//! - [`AesKey32`] - AES-256 key
//! - [`Des3Key24`] - two-key EDE 3DES key (`key7 || key7[0..8]`)
//! - [`DesKey8`] - single DES key
//!
//! ### IVs and nonces
//! - [`AesIv16`] - AES-CBC IV
//! - [`DesIv8`] - DES/3DES-CBC IV
//! - [`Nonce16`] - host/drive randoms of either phase
//!
//! ### Digests and RSA blocks
//! - [`Sha1Digest20`] - SHA-1 output
//! - [`RsaBlock128`] - one RSA-1024 operand or result
//! - [`RsaBlock22`] - one operand or result of the 175-bit host key
//!
//! ### Generic
//! - [`SpanBuffer<N>`] - secure stack buffer for any size `N`

use secure_gate::fixed_alias;

// ─────────────────────────────────────────────────────────────────────────────
// SpanBuffer: generic secure stack buffer (direct alias to secure-gate's Fixed)
// ─────────────────────────────────────────────────────────────────────────────
pub type SpanBuffer<const N: usize> = secure_gate::Fixed<[u8; N]>;

pub type Block8 = SpanBuffer<8>; // one DES block, one CDB
pub type Block16 = SpanBuffer<16>; // one AES block

// ─────────────────────────────────────────────────────────────────────────────
// Fixed-size concrete secrets, alphabetical order
// ─────────────────────────────────────────────────────────────────────────────
fixed_alias!(pub AesIv16, 16); // IV1, IV3, SAC static IV, disc IV
fixed_alias!(pub AesKey16, 16); // key1..key8, session key, disc key
fixed_alias!(pub AesKey32, 32); // AES-256 variant
fixed_alias!(pub Des3Key24, 24); // 3DES EDE key for the CDB
fixed_alias!(pub DesIv8, 8); // IV2
fixed_alias!(pub DesKey8, 8); // single DES
fixed_alias!(pub Nonce16, 16); // host_random, drive_random, session randoms
fixed_alias!(pub RsaBlock128, 128); // RSA-1024 operands
fixed_alias!(pub RsaBlock22, 22); // RSA-175 operands
fixed_alias!(pub Sha1Digest20, 20); // SHA-1 output
