use sha2::{Digest, Sha512};

/// Hashes a salted password the way the password file stores it.
///
/// # Arguments
///
/// * `salt` - Raw salt bytes, hashed first.
/// * `password` - Raw password bytes.
///
/// # Returns
///
/// `hex(SHA-512(salt || password))`, 128 lowercase hex characters.
pub fn password_hash(salt: &[u8], password: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(salt);
    hasher.update(password);
    hex::encode(hasher.finalize())
}
