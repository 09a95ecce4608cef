use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::repositories::password::{FilePasswordStore, PasswordStore};
use crate::services::auth::AuthManager;
use crate::services::secret::SecretChannel;
use crate::services::session::SessionNegotiator;
use crate::services::store::ObjectStore;

/// The service's authoritative state, handed to every request handler.
///
/// Every field is a cheap handle onto shared state, so clones observe the
/// same sessions, collections and password record.
#[derive(Clone)]
pub struct ServiceState {
    /// The service's configuration.
    pub config: Config,
    /// The session table.
    pub sessions: SessionNegotiator,
    /// The collection/item hierarchy.
    pub store: ObjectStore,
    /// Secret reads and writes bound to live sessions.
    pub secrets: SecretChannel,
    /// The password record and login state.
    pub auth: AuthManager,
}

impl ServiceState {
    /// Creates a new `ServiceState` backed by the given password store.
    pub fn new(config: Config, passwords: Arc<dyn PasswordStore>) -> Self {
        let sessions =
            SessionNegotiator::with_max_age(Duration::from_secs(config.session_max_age_secs));
        let store = ObjectStore::new();
        let secrets = SecretChannel::new(sessions.clone(), store.clone());
        let auth = AuthManager::new(sessions.clone(), passwords);

        Self {
            config,
            sessions,
            store,
            secrets,
            auth,
        }
    }

    /// Creates a new `ServiceState` persisting the password to `config.password_file`.
    pub fn from_config(config: &Config) -> Self {
        let passwords = Arc::new(FilePasswordStore::new(config.password_file.clone()));
        tracing::info!("✅ Password file: {}", config.password_file.display());
        Self::new(config.clone(), passwords)
    }
}
