//! src/crypto/digest.rs
//! SHA-1 over one or more byte slices.

use crate::aliases::Sha1Digest20;
use sha1::{Digest, Sha1};

/// SHA-1 of `data`.
#[inline]
pub fn sha1(data: &[u8]) -> Sha1Digest20 {
    sha1_parts(&[data])
}

/// SHA-1 of the concatenation of `parts`, without building the concatenation.
pub fn sha1_parts(parts: &[&[u8]]) -> Sha1Digest20 {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part);
    }
    Sha1Digest20::new(hasher.finalize().into())
}
