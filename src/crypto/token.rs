use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{Result, ServiceError};

/// Random bytes behind every serial number and object identifier.
pub const IDENTIFIER_BYTES: usize = 16;
/// Length of a login cookie in bytes.
pub const COOKIE_SIZE: usize = 64;
/// Regeneration attempts before a collision is treated as fatal.
const MAX_ALLOCATION_ATTEMPTS: usize = 8;

/// Generates a random identifier, hex-encoded to 32 characters.
///
/// Used for session serial numbers, item IDs and unaliased collection IDs.
pub fn generate_identifier() -> String {
    let mut bytes = [0u8; IDENTIFIER_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generates an identifier for which `is_taken` returns false.
///
/// Identifiers are never reused: a collision with a live identifier is
/// detected and regenerated, and repeated collisions are reported as
/// `PathCollision` rather than silently accepted.
pub fn allocate_identifier(is_taken: impl Fn(&str) -> bool) -> Result<String> {
    for _ in 0..MAX_ALLOCATION_ATTEMPTS {
        let id = generate_identifier();
        if !is_taken(&id) {
            return Ok(id);
        }
        tracing::warn!("Identifier collision, regenerating");
    }
    Err(ServiceError::PathCollision(format!(
        "no free identifier after {} attempts",
        MAX_ALLOCATION_ATTEMPTS
    )))
}

/// Generates a fresh login cookie of `COOKIE_SIZE` alphanumeric bytes.
pub fn generate_cookie() -> Zeroizing<String> {
    Zeroizing::new(
        OsRng
            .sample_iter(&Alphanumeric)
            .take(COOKIE_SIZE)
            .map(char::from)
            .collect(),
    )
}

/// Compares two byte strings in constant time.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_32_hex_chars() {
        let id = generate_identifier();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_identifier());
    }

    #[test]
    fn allocation_skips_taken_identifiers() {
        let first = allocate_identifier(|_| false).unwrap();
        let second = allocate_identifier(|id| id == first).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn allocation_gives_up_when_everything_collides() {
        assert!(matches!(
            allocate_identifier(|_| true),
            Err(ServiceError::PathCollision(_))
        ));
    }

    #[test]
    fn cookies_are_64_bytes() {
        let cookie = generate_cookie();
        assert_eq!(cookie.len(), COOKIE_SIZE);
        assert!(cookie.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn constant_time_eq_checks_length_and_content() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
