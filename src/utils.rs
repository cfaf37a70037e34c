// ============================================================================
// FILE: src/utils.rs
// ============================================================================

//! Utility functions used across the library.

use zeroize::Zeroize;

/// XORs `block_a` and `block_b` into `output`, over the length of `output`.
///
/// # Panics (by contract)
///
/// Panics if either input is shorter than `output`. All callers pass
/// fixed-size buffers of matching width.
#[inline(always)]
pub fn xor_blocks(block_a: &[u8], block_b: &[u8], output: &mut [u8]) {
    for (i, out) in output.iter_mut().enumerate() {
        *out = block_a[i] ^ block_b[i];
    }
}

/// One's-complement byte checksum: `!(sum of bytes mod 256)`.
///
/// ```
/// assert_eq!(sacd_auth::utils::checksum(&[0x01, 0x02, 0x03]), 0xF9);
/// ```
#[inline]
pub fn checksum(data: &[u8]) -> u8 {
    !data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Size of a SEND KEY buffer carrying `payload_len` bytes: a 4-byte length
/// header plus the payload, rounded up to a multiple of 4.
#[inline]
pub const fn padded_send_size(payload_len: usize) -> usize {
    let pad = if payload_len % 4 != 0 {
        4 - payload_len % 4
    } else {
        0
    };
    payload_len + 4 + pad
}

/// Wipes `buffer` with writes the optimizer may not elide.
#[inline]
pub fn secure_zero(buffer: &mut [u8]) {
    buffer.zeroize();
}

/// Constant-time equality for equal-length byte strings.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
