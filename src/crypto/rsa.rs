//! src/crypto/rsa.rs
//! Raw (unpadded) RSA on big-endian fixed-width operands
//!
//! Operand and result widths always equal the modulus width: 128 bytes for
//! RSA-1024, 22 bytes for the 175-bit key. Results are left-padded with zeros.

use crate::error::SacdError;
use rsa::BigUint;

/// Public exponent 65537 = 2^16 + 1.
const PUBLIC_EXPONENT_SQUARINGS: usize = 16;

fn check_width(modulus: &[u8], input: &[u8], output: &[u8]) -> Result<(), SacdError> {
    if modulus.is_empty() {
        return Err(SacdError::NullArgument("modulus"));
    }
    if input.is_empty() {
        return Err(SacdError::NullArgument("input"));
    }
    if input.len() != modulus.len() || output.len() != modulus.len() {
        return Err(SacdError::CryptoFailed(format!(
            "RSA operands must be {} bytes (input {}, output {})",
            modulus.len(),
            input.len(),
            output.len()
        )));
    }
    Ok(())
}

fn parse_modulus(modulus: &[u8]) -> Result<BigUint, SacdError> {
    let n = BigUint::from_bytes_be(modulus);
    if n.bits() < 2 {
        return Err(SacdError::CryptoFailed("RSA modulus must be > 1".into()));
    }
    Ok(n)
}

/// Writes `value` big-endian into `output`, left-padded with zeros.
fn write_fixed_width(value: &BigUint, output: &mut [u8]) -> Result<(), SacdError> {
    let bytes = value.to_bytes_be();
    // `to_bytes_be` of zero is `[0]`
    let significant = match bytes.iter().position(|&b| b != 0) {
        Some(first) => &bytes[first..],
        None => &[][..],
    };
    if significant.len() > output.len() {
        return Err(SacdError::CryptoFailed("RSA result exceeds modulus width".into()));
    }
    let start = output.len() - significant.len();
    output[..start].fill(0);
    output[start..].copy_from_slice(significant);
    Ok(())
}

/// `input ^ exponent mod modulus` with a private exponent.
pub fn rsa_private_op(
    modulus: &[u8],
    exponent: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> Result<(), SacdError> {
    check_width(modulus, input, output)?;
    if exponent.is_empty() {
        return Err(SacdError::NullArgument("exponent"));
    }
    let n = parse_modulus(modulus)?;
    let d = BigUint::from_bytes_be(exponent);
    let x = BigUint::from_bytes_be(input);

    let result = x.modpow(&d, &n);
    write_fixed_width(&result, output)
}

/// `input ^ 65537 mod modulus` as sixteen squarings and one multiply.
///
/// The modulus may be even, so no Montgomery-based exponentiation is used.
pub fn rsa_public_op_pow65537(
    modulus: &[u8],
    input: &[u8],
    output: &mut [u8],
) -> Result<(), SacdError> {
    check_width(modulus, input, output)?;
    let n = parse_modulus(modulus)?;
    let base = BigUint::from_bytes_be(input) % &n;

    let mut acc = base.clone();
    for _ in 0..PUBLIC_EXPONENT_SQUARINGS {
        acc = (&acc * &acc) % &n;
    }
    acc = (&acc * &base) % &n;

    write_fixed_width(&acc, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_is_left_padded() {
        let mut modulus = [0u8; 22];
        modulus[0] = 0x40;
        modulus[21] = 0x01;
        let mut one = [0u8; 22];
        one[21] = 1;
        let mut out = [0xFFu8; 22];
        rsa_public_op_pow65537(&modulus, &one, &mut out).unwrap();
        assert_eq!(out, one);
    }

    #[test]
    fn zero_input_gives_zero() {
        let modulus = [0xC5u8; 16];
        let mut out = [0xFFu8; 16];
        rsa_public_op_pow65537(&modulus, &[0u8; 16], &mut out).unwrap();
        assert_eq!(out, [0u8; 16]);
    }

    #[test]
    fn small_even_modulus_matches_naive_power() {
        // 3^65537 mod 1000: 3 has order 100 mod 1000, 65537 mod 100 = 37
        let modulus = 1000u16.to_be_bytes();
        let input = 3u16.to_be_bytes();
        let mut out = [0u8; 2];
        rsa_public_op_pow65537(&modulus, &input, &mut out).unwrap();
        let mut expected: u32 = 1;
        for _ in 0..37 {
            expected = expected * 3 % 1000;
        }
        assert_eq!(u16::from_be_bytes(out) as u32, expected);
    }

    #[test]
    fn private_op_inverts_public_op_for_toy_key() {
        // p = 61, q = 53, n = 3233, e = 65537, d = 2753 (65537 mod 3120 = 17)
        let modulus = 3233u16.to_be_bytes();
        let d = 2753u16.to_be_bytes();
        let message = 1234u16.to_be_bytes();
        let mut cipher = [0u8; 2];
        rsa_public_op_pow65537(&modulus, &message, &mut cipher).unwrap();
        let mut plain = [0u8; 2];
        rsa_private_op(&modulus, &d, &cipher, &mut plain).unwrap();
        assert_eq!(plain, message);
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let mut out = [0u8; 128];
        assert!(matches!(
            rsa_public_op_pow65537(&[0xFFu8; 128], &[1u8; 127], &mut out),
            Err(SacdError::CryptoFailed(_))
        ));
        assert!(matches!(
            rsa_private_op(&[0xFFu8; 128], &[], &[1u8; 128], &mut out),
            Err(SacdError::NullArgument("exponent"))
        ));
        assert!(matches!(
            rsa_public_op_pow65537(&[0u8; 128], &[1u8; 128], &mut out),
            Err(SacdError::CryptoFailed(_))
        ));
    }
}
