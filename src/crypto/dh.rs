//! Diffie-Hellman key agreement for `dh-ietf1024-sha256-aes128-cbc-pkcs7`.
//!
//! Both ends work in the RFC 2409 Second Oakley Group (1024-bit MODP prime,
//! generator 2). The shared secret `g^(ab) mod p` is encoded big-endian,
//! left-padded to the group size, hashed with SHA-256, and the first 16 bytes
//! of the digest become the AES-128 session key.
//!
//! The group is a fixed constant: changing it breaks every peer that speaks
//! the same algorithm name.

use num_bigint::BigUint;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::crypto::aes::{SecureKey, KEY_SIZE};
use crate::error::{Result, ServiceError};

/// The only negotiable session algorithm.
pub const ALGORITHM_DH: &str = "dh-ietf1024-sha256-aes128-cbc-pkcs7";

/// Size of the group modulus (and of an encoded public value) in bytes.
pub const GROUP_BYTES: usize = 128;

/// The group generator.
const GENERATOR: u32 = 2;

/// RFC 2409 section 6.2, Second Oakley Group.
const PRIME: [u8; GROUP_BYTES] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xc9, 0x0f, 0xda, 0xa2,
    0x21, 0x68, 0xc2, 0x34, 0xc4, 0xc6, 0x62, 0x8b, 0x80, 0xdc, 0x1c, 0xd1,
    0x29, 0x02, 0x4e, 0x08, 0x8a, 0x67, 0xcc, 0x74, 0x02, 0x0b, 0xbe, 0xa6,
    0x3b, 0x13, 0x9b, 0x22, 0x51, 0x4a, 0x08, 0x79, 0x8e, 0x34, 0x04, 0xdd,
    0xef, 0x95, 0x19, 0xb3, 0xcd, 0x3a, 0x43, 0x1b, 0x30, 0x2b, 0x0a, 0x6d,
    0xf2, 0x5f, 0x14, 0x37, 0x4f, 0xe1, 0x35, 0x6d, 0x6d, 0x51, 0xc2, 0x45,
    0xe4, 0x85, 0xb5, 0x76, 0x62, 0x5e, 0x7e, 0xc6, 0xf4, 0x4c, 0x42, 0xe9,
    0xa6, 0x37, 0xed, 0x6b, 0x0b, 0xff, 0x5c, 0xb6, 0xf4, 0x06, 0xb7, 0xed,
    0xee, 0x38, 0x6b, 0xfb, 0x5a, 0x89, 0x9f, 0xa5, 0xae, 0x9f, 0x24, 0x11,
    0x7c, 0x4b, 0x1f, 0xe6, 0x49, 0x28, 0x66, 0x51, 0xec, 0xe6, 0x53, 0x81,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

fn prime() -> BigUint {
    BigUint::from_bytes_be(&PRIME)
}

/// Left-pads a big-endian integer to the group width.
fn to_group_bytes(value: &BigUint) -> Vec<u8> {
    let raw = value.to_bytes_be();
    let mut out = vec![0u8; GROUP_BYTES.saturating_sub(raw.len())];
    out.extend_from_slice(&raw);
    out
}

/// One side of a key exchange.
///
/// The private exponent is held as big-endian bytes and wiped on drop.
pub struct DhKeypair {
    private: Zeroizing<Vec<u8>>,
    public: BigUint,
}

impl DhKeypair {
    /// Draws a private exponent in `[2, p - 2]` and computes `g^x mod p`.
    pub fn generate() -> Self {
        let p = prime();
        let mut bytes = Zeroizing::new([0u8; GROUP_BYTES]);
        OsRng.fill_bytes(bytes.as_mut_slice());
        let private = BigUint::from_bytes_be(bytes.as_slice()) % (&p - 3u32) + 2u32;
        let public = BigUint::from(GENERATOR).modpow(&private, &p);
        Self {
            private: Zeroizing::new(private.to_bytes_be()),
            public,
        }
    }

    /// The public value, big-endian and padded to the group width.
    pub fn public_bytes(&self) -> Vec<u8> {
        to_group_bytes(&self.public)
    }

    /// Completes the exchange with the peer's public value and derives the
    /// 16-byte session key.
    ///
    /// # Arguments
    ///
    /// * `peer_public` - The peer's big-endian public value.
    ///
    /// # Returns
    ///
    /// The derived `SecureKey`, or `NegotiationFailure` if the peer value lies
    /// outside `(1, p - 1)`.
    pub fn derive_key(&self, peer_public: &[u8]) -> Result<SecureKey> {
        let p = prime();
        let peer = validate_public(peer_public, &p)?;
        let private = BigUint::from_bytes_be(&self.private);
        let shared = peer.modpow(&private, &p);

        let digest = Sha256::digest(Zeroizing::new(to_group_bytes(&shared)).as_slice());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest[..KEY_SIZE]);
        Ok(SecureKey::new(key))
    }
}

fn validate_public(bytes: &[u8], p: &BigUint) -> Result<BigUint> {
    if bytes.is_empty() || bytes.len() > GROUP_BYTES {
        return Err(ServiceError::NegotiationFailure(format!(
            "Public value has invalid length {}",
            bytes.len()
        )));
    }
    let value = BigUint::from_bytes_be(bytes);
    let upper = p - 1u32;
    if value <= BigUint::from(1u32) || value >= upper {
        return Err(ServiceError::NegotiationFailure(
            "Public value outside the multiplicative group".to_string(),
        ));
    }
    Ok(value)
}
