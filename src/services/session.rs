use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

use crate::crypto::aes::SecureKey;
use crate::crypto::dh::{DhKeypair, ALGORITHM_DH};
use crate::crypto::token::{self, constant_time_eq};
use crate::error::{Result, ServiceError};
use crate::models::session::Session;

/// Sessions older than this are treated as closed.
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Negotiates sessions and owns the session table.
///
/// Cloning is cheap: every clone shares the same table. A session lives
/// until it is closed or reaches `max_age`; expired sessions are invisible
/// to lookups and are dropped, cookie included, by [`expire_stale`](Self::expire_stale).
#[derive(Clone)]
pub struct SessionNegotiator {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    max_age: Duration,
}

impl Default for SessionNegotiator {
    fn default() -> Self {
        Self::with_max_age(DEFAULT_SESSION_MAX_AGE)
    }
}

impl SessionNegotiator {
    /// Creates a new, empty `SessionNegotiator` with the default session lifetime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new, empty `SessionNegotiator` whose sessions expire after `max_age`.
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_age,
        }
    }

    fn live<'a>(&self, sessions: &'a HashMap<String, Session>, serial: &str) -> Result<&'a Session> {
        sessions
            .get(serial)
            .filter(|s| !s.is_expired(self.max_age))
            .ok_or(ServiceError::UnknownSession)
    }

    /// Responds to a client's key-exchange request.
    ///
    /// # Arguments
    ///
    /// * `algorithm` - The algorithm identifier requested by the client.
    /// * `peer_public` - The client's DH public value.
    ///
    /// # Returns
    ///
    /// The service's public value and the new session's serial number.
    pub async fn negotiate(&self, algorithm: &str, peer_public: &[u8]) -> Result<(Vec<u8>, String)> {
        if algorithm != ALGORITHM_DH {
            return Err(ServiceError::UnsupportedAlgorithm(algorithm.to_string()));
        }

        let keypair = DhKeypair::generate();
        let key = keypair.derive_key(peer_public)?;

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired(self.max_age));
        let serial = token::allocate_identifier(|id| sessions.contains_key(id))?;
        sessions.insert(serial.clone(), Session::new(serial.clone(), key));
        drop(sessions);

        tracing::info!("🔑 Session {} negotiated", serial);
        Ok((keypair.public_bytes(), serial))
    }

    /// Removes a session. Its key and any bound cookie stop working immediately.
    pub async fn close(&self, serial: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(serial) {
            Some(session) if !session.is_expired(self.max_age) => {
                tracing::info!("👋 Session {} closed", serial);
                Ok(())
            }
            _ => Err(ServiceError::UnknownSession),
        }
    }

    /// Drops every session that has reached its maximum age.
    ///
    /// # Returns
    ///
    /// The number of sessions removed.
    pub async fn expire_stale(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(self.max_age));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("🧹 Expired {} stale session(s)", removed);
        }
        removed
    }

    /// Returns a snapshot of a live session.
    pub async fn get(&self, serial: &str) -> Result<Session> {
        let sessions = self.sessions.read().await;
        self.live(&sessions, serial).cloned()
    }

    /// Returns the key of a live session.
    pub async fn key(&self, serial: &str) -> Result<SecureKey> {
        let sessions = self.sessions.read().await;
        self.live(&sessions, serial).map(|s| s.symmetric_key.clone())
    }

    pub async fn is_live(&self, serial: &str) -> bool {
        let sessions = self.sessions.read().await;
        self.live(&sessions, serial).is_ok()
    }

    /// Binds a login cookie to a session, replacing any earlier one.
    pub async fn bind_cookie(&self, serial: &str, cookie: Zeroizing<String>) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(serial)
            .filter(|s| !s.is_expired(self.max_age))
            .ok_or(ServiceError::UnknownSession)?;
        session.cookie = Some(cookie);
        Ok(())
    }

    /// Checks a presented cookie against the one bound to the session.
    ///
    /// Unauthenticated sessions match nothing.
    pub async fn cookie_matches(&self, serial: &str, presented: &[u8]) -> Result<bool> {
        let sessions = self.sessions.read().await;
        let session = self.live(&sessions, serial)?;
        Ok(session
            .cookie
            .as_ref()
            .is_some_and(|cookie| constant_time_eq(cookie.as_bytes(), presented)))
    }

    /// Number of sessions in the table, expired ones not yet swept included.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open(negotiator: &SessionNegotiator) -> (String, SecureKey) {
        let client = DhKeypair::generate();
        let (server_public, serial) = negotiator
            .negotiate(ALGORITHM_DH, &client.public_bytes())
            .await
            .unwrap();
        (serial, client.derive_key(&server_public).unwrap())
    }

    #[tokio::test]
    async fn negotiated_keys_match() {
        let negotiator = SessionNegotiator::new();
        let (serial, client_key) = open(&negotiator).await;

        assert_eq!(negotiator.key(&serial).await.unwrap(), client_key);
    }

    #[tokio::test]
    async fn serials_are_32_hex_and_unique() {
        let negotiator = SessionNegotiator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..16 {
            let (serial, _) = open(&negotiator).await;
            assert_eq!(serial.len(), 32);
            assert!(serial.chars().all(|c| c.is_ascii_hexdigit()));
            assert!(seen.insert(serial));
        }
        assert_eq!(negotiator.count().await, 16);
    }

    #[tokio::test]
    async fn unknown_algorithm_is_rejected() {
        let negotiator = SessionNegotiator::new();
        let client = DhKeypair::generate();
        let err = negotiator.negotiate("plain", &client.public_bytes()).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedAlgorithm(_)));
        assert_eq!(negotiator.count().await, 0);
    }

    #[tokio::test]
    async fn invalid_public_value_creates_no_session() {
        let negotiator = SessionNegotiator::new();
        let err = negotiator.negotiate(ALGORITHM_DH, &[1u8]).await.unwrap_err();
        assert!(matches!(err, ServiceError::NegotiationFailure(_)));
        assert_eq!(negotiator.count().await, 0);
    }

    #[tokio::test]
    async fn closing_invalidates_session_and_cookie() {
        let negotiator = SessionNegotiator::new();
        let (serial, _) = open(&negotiator).await;
        negotiator
            .bind_cookie(&serial, Zeroizing::new("c".repeat(64)))
            .await
            .unwrap();
        assert!(negotiator.cookie_matches(&serial, "c".repeat(64).as_bytes()).await.unwrap());

        negotiator.close(&serial).await.unwrap();

        assert!(!negotiator.is_live(&serial).await);
        assert!(matches!(negotiator.key(&serial).await, Err(ServiceError::UnknownSession)));
        assert!(matches!(
            negotiator.cookie_matches(&serial, "c".repeat(64).as_bytes()).await,
            Err(ServiceError::UnknownSession)
        ));
        assert!(matches!(negotiator.close(&serial).await, Err(ServiceError::UnknownSession)));
    }

    #[tokio::test]
    async fn unauthenticated_session_matches_no_cookie() {
        let negotiator = SessionNegotiator::new();
        let (serial, _) = open(&negotiator).await;
        assert!(!negotiator.cookie_matches(&serial, b"").await.unwrap());
        assert!(!negotiator.get(&serial).await.unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn expired_session_is_unknown_and_swept() {
        let negotiator = SessionNegotiator::with_max_age(Duration::ZERO);
        let (serial, _) = open(&negotiator).await;
        negotiator
            .bind_cookie(&serial, Zeroizing::new("c".repeat(64)))
            .await
            .unwrap_err();

        assert!(!negotiator.is_live(&serial).await);
        assert!(matches!(negotiator.key(&serial).await, Err(ServiceError::UnknownSession)));
        assert!(matches!(negotiator.get(&serial).await, Err(ServiceError::UnknownSession)));
        assert!(matches!(
            negotiator.cookie_matches(&serial, "c".repeat(64).as_bytes()).await,
            Err(ServiceError::UnknownSession)
        ));

        assert_eq!(negotiator.count().await, 1);
        assert_eq!(negotiator.expire_stale().await, 1);
        assert_eq!(negotiator.count().await, 0);
    }

    #[tokio::test]
    async fn sweep_removes_sessions_once_they_age_out() {
        let negotiator = SessionNegotiator::with_max_age(Duration::from_millis(200));
        let (serial, _) = open(&negotiator).await;
        negotiator
            .bind_cookie(&serial, Zeroizing::new("c".repeat(64)))
            .await
            .unwrap();

        assert_eq!(negotiator.expire_stale().await, 0);
        assert!(negotiator.cookie_matches(&serial, "c".repeat(64).as_bytes()).await.unwrap());

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(negotiator.expire_stale().await, 1);
        assert!(matches!(
            negotiator.cookie_matches(&serial, "c".repeat(64).as_bytes()).await,
            Err(ServiceError::UnknownSession)
        ));
    }

    #[tokio::test]
    async fn negotiation_sweeps_expired_sessions() {
        let negotiator = SessionNegotiator::with_max_age(Duration::ZERO);
        for _ in 0..8 {
            open(&negotiator).await;
        }
        assert_eq!(negotiator.count().await, 1);
    }
}
