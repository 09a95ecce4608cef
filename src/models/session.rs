use chrono::{DateTime, Utc};
use std::time::Duration;
use zeroize::Zeroizing;

use crate::crypto::aes::SecureKey;

/// A negotiated session held in the service's session table.
///
/// ⚠️ `symmetric_key` and `cookie` are secrets: neither is ever logged or
/// serialized, and both are zeroized when the session is dropped.
#[derive(Clone)]
pub struct Session {
    /// 32 hex characters identifying the session.
    pub serial_number: String,
    /// The AES-128 key agreed during negotiation.
    pub symmetric_key: SecureKey,
    /// Bound by a successful login; `None` while unauthenticated.
    pub cookie: Option<Zeroizing<String>>,
    /// The timestamp when the session was negotiated.
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(serial_number: String, symmetric_key: SecureKey) -> Self {
        Self {
            serial_number,
            symmetric_key,
            cookie: None,
            created_at: Utc::now(),
        }
    }

    /// True once the session is at least `max_age` old.
    pub fn is_expired(&self, max_age: Duration) -> bool {
        (Utc::now() - self.created_at)
            .to_std()
            .is_ok_and(|age| age >= max_age)
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookie.is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("serial_number", &self.serial_number)
            .field("authenticated", &self.is_authenticated())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
