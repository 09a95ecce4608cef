use crate::error::{Result, ServiceError};
use crate::models::secret::SecretPayload;
use crate::paths;
use crate::services::session::SessionNegotiator;
use crate::services::store::ObjectStore;

/// Moves item secrets in and out of the store on behalf of live sessions.
///
/// The channel never decrypts: ciphertext goes into the store as received and
/// comes out as stored, tagged with the session whose key produced it.
#[derive(Clone)]
pub struct SecretChannel {
    sessions: SessionNegotiator,
    store: ObjectStore,
}

impl SecretChannel {
    pub fn new(sessions: SessionNegotiator, store: ObjectStore) -> Self {
        Self { sessions, store }
    }

    /// Fails with `UnknownSession` unless `session_path` names a live session.
    pub async fn ensure_live(&self, session_path: &str) -> Result<()> {
        let serial = paths::parse_session_path(session_path)
            .map_err(|_| ServiceError::UnknownSession)?;
        if !self.sessions.is_live(serial).await {
            tracing::debug!("Session {} is not live", serial);
            return Err(ServiceError::UnknownSession);
        }
        Ok(())
    }

    /// Returns an item's stored secret to a caller holding a live session.
    ///
    /// # Arguments
    ///
    /// * `item_path` - The item's object path.
    /// * `session_path` - The caller's session.
    ///
    /// # Returns
    ///
    /// The stored `SecretPayload`; the caller decrypts it with the key of
    /// `payload.session`.
    pub async fn get_secret(&self, item_path: &str, session_path: &str) -> Result<SecretPayload> {
        self.ensure_live(session_path).await?;
        self.store.secret_of(item_path).await
    }

    /// Replaces an item's secret with a payload encrypted under a live session.
    pub async fn set_secret(&self, item_path: &str, secret: SecretPayload) -> Result<()> {
        self.ensure_live(&secret.session).await?;
        self.store.set_secret(item_path, secret).await
    }
}
