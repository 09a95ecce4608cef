use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};
use crate::error::{ServiceError, Result};

/// The size of the AES-128 key in bytes.
pub const KEY_SIZE: usize = 16;
/// The AES block size, which is also the CBC IV size.
pub const BLOCK_SIZE: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// A session key wrapper that ensures the key is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct SecureKey([u8; KEY_SIZE]);

impl SecureKey {
    /// Creates a new `SecureKey` from a byte array.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self(key)
    }

    /// Returns a reference to the key as a byte slice.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecureKey(..)")
    }
}

/// Generates a new random CBC initialization vector.
///
/// # Returns
///
/// A 16-byte array representing the IV.
pub fn generate_iv() -> [u8; BLOCK_SIZE] {
    let mut iv = [0u8; BLOCK_SIZE];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypts a plaintext using AES-128-CBC with PKCS7 padding.
///
/// A fresh IV is drawn for every call.
///
/// # Arguments
///
/// * `plaintext` - The data to encrypt.
/// * `key` - The AES-128 key.
///
/// # Returns
///
/// A tuple containing the IV and the ciphertext.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let iv = generate_iv();
    let cipher = Aes128CbcEnc::new_from_slices(key, &iv)
        .map_err(|_| ServiceError::Crypto(format!("Invalid key length: {}", key.len())))?;

    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    Ok((iv.to_vec(), ciphertext))
}

/// Decrypts an AES-128-CBC ciphertext and strips its PKCS7 padding.
///
/// # Arguments
///
/// * `iv` - The IV used for encryption.
/// * `ciphertext` - The data to decrypt.
/// * `key` - The AES-128 key.
///
/// # Returns
///
/// The decrypted plaintext.
pub fn decrypt(iv: &[u8], ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    if key.len() != KEY_SIZE {
        return Err(ServiceError::Crypto(format!("Invalid key length: {}", key.len())));
    }
    if iv.len() != BLOCK_SIZE {
        return Err(ServiceError::Crypto(format!("Invalid IV length: {}", iv.len())));
    }
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(ServiceError::Crypto(format!(
            "Ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }

    let cipher = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|_| ServiceError::Crypto("Invalid key or IV".to_string()))?;

    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| ServiceError::Crypto("Invalid padding".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = *b"0123456789abcdef";

    #[test]
    fn round_trip_recovers_plaintext() {
        let (iv, ciphertext) = encrypt(b"Victoria1", &KEY).unwrap();
        assert_eq!(iv.len(), BLOCK_SIZE);
        assert_eq!(ciphertext.len(), BLOCK_SIZE);
        assert_eq!(decrypt(&iv, &ciphertext, &KEY).unwrap(), b"Victoria1");
    }

    #[test]
    fn empty_plaintext_is_one_full_padding_block() {
        let (iv, ciphertext) = encrypt(b"", &KEY).unwrap();
        assert_eq!(ciphertext.len(), BLOCK_SIZE);
        assert!(decrypt(&iv, &ciphertext, &KEY).unwrap().is_empty());
    }

    #[test]
    fn every_call_draws_a_fresh_iv() {
        let (iv1, c1) = encrypt(b"same input", &KEY).unwrap();
        let (iv2, c2) = encrypt(b"same input", &KEY).unwrap();
        assert_ne!(iv1, iv2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn wrong_key_never_yields_plaintext() {
        let other = *b"fedcba9876543210";
        let (iv, ciphertext) = encrypt(b"Victoria1", &KEY).unwrap();
        match decrypt(&iv, &ciphertext, &other) {
            Ok(plain) => assert_ne!(plain, b"Victoria1"),
            Err(e) => assert!(matches!(e, ServiceError::Crypto(_))),
        }
    }

    #[test]
    fn rejects_bad_lengths() {
        let (iv, ciphertext) = encrypt(b"payload", &KEY).unwrap();

        assert!(matches!(encrypt(b"x", &KEY[..8]), Err(ServiceError::Crypto(_))));
        assert!(matches!(decrypt(&iv, &ciphertext, &KEY[..15]), Err(ServiceError::Crypto(_))));
        assert!(matches!(decrypt(&iv[..8], &ciphertext, &KEY), Err(ServiceError::Crypto(_))));
        assert!(matches!(
            decrypt(&iv, &ciphertext[..ciphertext.len() - 1], &KEY),
            Err(ServiceError::Crypto(_))
        ));
        assert!(matches!(decrypt(&iv, &[], &KEY), Err(ServiceError::Crypto(_))));
    }
}
