//! src/crypto/cbc.rs
//! CBC mode over the `aes` and `des` block ciphers, in place, no padding
//!
//! Every function works on a caller-owned buffer whose length must be a
//! multiple of the cipher's block size. The IV is read, never written; the
//! running chain value lives in a local buffer that is wiped before return.

use crate::consts::{AES_BLOCK_SIZE, DES_BLOCK_SIZE};
use crate::error::SacdError;
use crate::utils::{secure_zero, xor_blocks};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::typenum::Unsigned;
use aes::cipher::{BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit};
use aes::{Aes128, Aes256};
use des::{Des, TdesEde3};

/// Validates a CBC call before any cipher is constructed.
fn check_cbc_args(
    key: &[u8],
    key_len: usize,
    iv: &[u8],
    block_size: usize,
    data: &[u8],
) -> Result<(), SacdError> {
    if key.is_empty() {
        return Err(SacdError::NullArgument("key"));
    }
    if iv.is_empty() {
        return Err(SacdError::NullArgument("iv"));
    }
    if data.is_empty() {
        return Err(SacdError::NullArgument("data"));
    }
    if key.len() != key_len {
        return Err(SacdError::CryptoFailed(format!(
            "key must be {key_len} bytes, got {}",
            key.len()
        )));
    }
    if iv.len() != block_size {
        return Err(SacdError::CryptoFailed(format!(
            "IV must be {block_size} bytes, got {}",
            iv.len()
        )));
    }
    if data.len() % block_size != 0 {
        return Err(SacdError::CryptoFailed(format!(
            "data length {} is not a multiple of {block_size}",
            data.len()
        )));
    }
    Ok(())
}

#[inline]
fn cbc_encrypt_in_place<C: BlockEncrypt>(cipher: &C, iv: &[u8], data: &mut [u8]) {
    let block_size = <C as BlockSizeUser>::BlockSize::USIZE;
    let mut chain = [0u8; AES_BLOCK_SIZE];
    chain[..block_size].copy_from_slice(iv);

    for chunk in data.chunks_exact_mut(block_size) {
        let mut mixed = [0u8; AES_BLOCK_SIZE];
        xor_blocks(chunk, &chain, &mut mixed[..block_size]);
        chunk.copy_from_slice(&mixed[..block_size]);
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
        chain[..block_size].copy_from_slice(chunk);
        secure_zero(&mut mixed);
    }

    secure_zero(&mut chain);
}

#[inline]
fn cbc_decrypt_in_place<C: BlockDecrypt>(cipher: &C, iv: &[u8], data: &mut [u8]) {
    let block_size = <C as BlockSizeUser>::BlockSize::USIZE;
    let mut chain = [0u8; AES_BLOCK_SIZE];
    let mut saved = [0u8; AES_BLOCK_SIZE];
    chain[..block_size].copy_from_slice(iv);

    for chunk in data.chunks_exact_mut(block_size) {
        saved[..block_size].copy_from_slice(chunk);
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
        let mut plain = [0u8; AES_BLOCK_SIZE];
        xor_blocks(chunk, &chain, &mut plain[..block_size]);
        chunk.copy_from_slice(&plain[..block_size]);
        chain[..block_size].copy_from_slice(&saved[..block_size]);
        secure_zero(&mut plain);
    }

    secure_zero(&mut chain);
    secure_zero(&mut saved);
}

fn new_cipher<C: KeyInit>(key: &[u8]) -> Result<C, SacdError> {
    C::new_from_slice(key).map_err(|_| SacdError::CryptoFailed("invalid cipher key".into()))
}

/// AES-128-CBC encryption in place.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), SacdError> {
    check_cbc_args(key, 16, iv, AES_BLOCK_SIZE, data)?;
    let cipher: Aes128 = new_cipher(key)?;
    cbc_encrypt_in_place(&cipher, iv, data);
    Ok(())
}

/// AES-128-CBC decryption in place.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), SacdError> {
    check_cbc_args(key, 16, iv, AES_BLOCK_SIZE, data)?;
    let cipher: Aes128 = new_cipher(key)?;
    cbc_decrypt_in_place(&cipher, iv, data);
    Ok(())
}

/// AES-256-CBC encryption in place.
pub fn aes256_cbc_encrypt(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), SacdError> {
    check_cbc_args(key, 32, iv, AES_BLOCK_SIZE, data)?;
    let cipher: Aes256 = new_cipher(key)?;
    cbc_encrypt_in_place(&cipher, iv, data);
    Ok(())
}

/// AES-256-CBC decryption in place.
pub fn aes256_cbc_decrypt(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), SacdError> {
    check_cbc_args(key, 32, iv, AES_BLOCK_SIZE, data)?;
    let cipher: Aes256 = new_cipher(key)?;
    cbc_decrypt_in_place(&cipher, iv, data);
    Ok(())
}

/// 3DES-EDE-CBC encryption in place with a 24-byte key.
///
/// Two-key 3DES is expressed by passing `k1 || k2 || k1`.
pub fn des3_cbc_encrypt(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), SacdError> {
    check_cbc_args(key, 24, iv, DES_BLOCK_SIZE, data)?;
    let cipher: TdesEde3 = new_cipher(key)?;
    cbc_encrypt_in_place(&cipher, iv, data);
    Ok(())
}

/// 3DES-EDE-CBC decryption in place with a 24-byte key.
pub fn des3_cbc_decrypt(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), SacdError> {
    check_cbc_args(key, 24, iv, DES_BLOCK_SIZE, data)?;
    let cipher: TdesEde3 = new_cipher(key)?;
    cbc_decrypt_in_place(&cipher, iv, data);
    Ok(())
}

/// Single-DES-CBC decryption in place.
pub fn des_cbc_decrypt(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<(), SacdError> {
    check_cbc_args(key, 8, iv, DES_BLOCK_SIZE, data)?;
    let cipher: Des = new_cipher(key)?;
    cbc_decrypt_in_place(&cipher, iv, data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // FIPS-197 C.1 / SP 800-38A F.2.1
    #[test]
    fn aes128_cbc_sp800_38a() {
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let iv = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let mut data = hex::decode(
            "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51",
        )
        .unwrap();
        aes_cbc_encrypt(&key, &iv, &mut data).unwrap();
        assert_eq!(
            hex::encode(&data),
            "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2"
        );
        aes_cbc_decrypt(&key, &iv, &mut data).unwrap();
        assert_eq!(
            hex::encode(&data),
            "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51"
        );
    }

    #[test]
    fn iv_is_not_modified() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let mut data = [0u8; 32];
        aes_cbc_encrypt(&key, &iv, &mut data).unwrap();
        assert_eq!(iv, [0x22u8; 16]);
    }

    #[test]
    fn rejects_bad_arguments() {
        let mut data = [0u8; 17];
        assert!(matches!(
            aes_cbc_encrypt(&[0u8; 16], &[0u8; 16], &mut data),
            Err(SacdError::CryptoFailed(_))
        ));
        assert!(matches!(
            aes_cbc_encrypt(&[0u8; 15], &[0u8; 16], &mut [0u8; 16]),
            Err(SacdError::CryptoFailed(_))
        ));
        assert!(matches!(
            aes256_cbc_encrypt(&[0u8; 16], &[0u8; 16], &mut [0u8; 16]),
            Err(SacdError::CryptoFailed(_))
        ));
        assert!(matches!(
            aes_cbc_decrypt(&[], &[0u8; 16], &mut [0u8; 16]),
            Err(SacdError::NullArgument("key"))
        ));
        assert!(matches!(
            des3_cbc_encrypt(&[0u8; 24], &[], &mut [0u8; 8]),
            Err(SacdError::NullArgument("iv"))
        ));
        assert!(matches!(
            des_cbc_decrypt(&[0u8; 8], &[0u8; 8], &mut []),
            Err(SacdError::NullArgument("data"))
        ));
        assert!(matches!(
            des3_cbc_encrypt(&[0u8; 24], &[0u8; 8], &mut [0u8; 12]),
            Err(SacdError::CryptoFailed(_))
        ));
    }

    #[test]
    fn des3_with_repeated_key_is_single_des() {
        let k = [0x13u8, 0x34, 0x57, 0x79, 0x9B, 0xBC, 0xDF, 0xF1];
        let mut key24 = [0u8; 24];
        for part in key24.chunks_exact_mut(8) {
            part.copy_from_slice(&k);
        }
        let iv = [0u8; 8];
        let mut data = *b"SACD-BD!";
        des3_cbc_encrypt(&key24, &iv, &mut data).unwrap();
        des_cbc_decrypt(&k, &iv, &mut data).unwrap();
        assert_eq!(&data, b"SACD-BD!");
    }
}
