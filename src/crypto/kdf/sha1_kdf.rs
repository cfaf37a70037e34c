//! src/crypto/kdf/sha1_kdf.rs
//! SHA-1 based key derivation: `SHA1((plain XOR crypt) || crypt)`

use crate::aliases::Sha1Digest20;
use crate::consts::SHA1_DIGEST_SIZE;
use crate::crypto::digest::sha1_parts;
use crate::utils::{secure_zero, xor_blocks};

/// Derive a 20-byte value from a plaintext/ciphertext pair.
///
/// Pure function; the XOR intermediate is wiped before return.
pub fn sha1_kdf(
    plain: &[u8; SHA1_DIGEST_SIZE],
    crypt: &[u8; SHA1_DIGEST_SIZE],
) -> Sha1Digest20 {
    let mut mixed = [0u8; SHA1_DIGEST_SIZE];
    xor_blocks(plain, crypt, &mut mixed);
    let derived = sha1_parts(&[&mixed, crypt]);
    secure_zero(&mut mixed);
    derived
}
