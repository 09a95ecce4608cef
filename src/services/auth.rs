use std::sync::Arc;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::crypto::{aes, hash::password_hash, token};
use crate::error::{Result, ServiceError};
use crate::repositories::password::PasswordStore;
use crate::services::session::SessionNegotiator;

/// The success marker returned by the authentication calls.
pub const RESULT_OK: &str = "ok";

/// A value encrypted under a session key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    pub value: Vec<u8>,
    pub iv: Vec<u8>,
}

impl EncryptedValue {
    pub fn new(value: Vec<u8>, iv: Vec<u8>) -> Self {
        Self { value, iv }
    }

    /// Encrypts `plaintext` under `key` with a fresh IV.
    pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<Self> {
        let (iv, value) = aes::encrypt(plaintext, key)?;
        Ok(Self { value, iv })
    }

    fn open(&self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        aes::decrypt(&self.iv, &self.value, key).map(Zeroizing::new)
    }
}

/// The four encrypted inputs of a password change.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub old_password: EncryptedValue,
    pub new_password: EncryptedValue,
    pub old_salt: EncryptedValue,
    pub new_salt: EncryptedValue,
}

/// Owns the password record and the login state of every session.
#[derive(Clone)]
pub struct AuthManager {
    sessions: SessionNegotiator,
    passwords: Arc<dyn PasswordStore>,
    /// Serializes read-verify-write of the password record.
    writer: Arc<Mutex<()>>,
}

impl AuthManager {
    pub fn new(sessions: SessionNegotiator, passwords: Arc<dyn PasswordStore>) -> Self {
        Self {
            sessions,
            passwords,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// The backing password-file collaborator.
    pub fn password_store(&self) -> &Arc<dyn PasswordStore> {
        &self.passwords
    }

    /// Changes the password.
    ///
    /// The old salt and password must hash to the stored record. An empty
    /// record matches anything, which is how the first password is set.
    ///
    /// # Arguments
    ///
    /// * `serial` - The serial number of the session the inputs are encrypted under.
    /// * `change` - The encrypted old/new passwords and salts.
    ///
    /// # Returns
    ///
    /// `"ok"`, or `PasswordMismatch` with the record left untouched.
    pub async fn set_password(&self, serial: &str, change: PasswordChange) -> Result<&'static str> {
        let key = self.sessions.key(serial).await?;
        let key = key.as_bytes();

        let old_password = change.old_password.open(key)?;
        let new_password = change.new_password.open(key)?;
        let old_salt = change.old_salt.open(key)?;
        let new_salt = change.new_salt.open(key)?;

        let _guard = self.writer.lock().await;

        let stored = Zeroizing::new(self.passwords.read_password_hash().await?);
        let old_hash = Zeroizing::new(password_hash(&old_salt, &old_password));

        if !stored.is_empty() && !token::constant_time_eq(old_hash.as_bytes(), stored.as_bytes()) {
            tracing::warn!("❌ Password change rejected for session {}", serial);
            return Err(ServiceError::PasswordMismatch);
        }

        let new_hash = Zeroizing::new(password_hash(&new_salt, &new_password));
        self.passwords.write_password_hash(&new_hash).await?;

        tracing::info!("✅ Password changed via session {}", serial);
        Ok(RESULT_OK)
    }

    /// Logs a session in.
    ///
    /// The presented value is the hex password hash, encrypted under the
    /// session key. On a match a fresh cookie is bound to the session and
    /// returned encrypted under the same key.
    ///
    /// # Returns
    ///
    /// The encrypted cookie and `"ok"`, or `AuthenticationFailed` with no
    /// cookie bound.
    pub async fn login(&self, serial: &str, presented: EncryptedValue) -> Result<(EncryptedValue, &'static str)> {
        let key = self.sessions.key(serial).await?;
        let presented = presented.open(key.as_bytes())?;

        let stored = Zeroizing::new(self.passwords.read_password_hash().await?);
        if stored.is_empty() || !token::constant_time_eq(&presented, stored.as_bytes()) {
            tracing::warn!("❌ Login failed for session {}", serial);
            return Err(ServiceError::AuthenticationFailed);
        }

        let cookie = token::generate_cookie();
        let sealed = EncryptedValue::seal(cookie.as_bytes(), key.as_bytes())?;
        self.sessions.bind_cookie(serial, cookie).await?;

        tracing::info!("✅ Session {} authenticated", serial);
        Ok((sealed, RESULT_OK))
    }

    /// Runs a privileged command on an authenticated session.
    ///
    /// Both the cookie and the command are encrypted under the session key;
    /// the reply comes back the same way.
    pub async fn command(
        &self,
        serial: &str,
        cookie: EncryptedValue,
        command: EncryptedValue,
    ) -> Result<(EncryptedValue, &'static str)> {
        let key = self.sessions.key(serial).await?;
        let key = key.as_bytes();

        let cookie = cookie.open(key)?;
        if !self.sessions.cookie_matches(serial, &cookie).await? {
            tracing::warn!("❌ Command refused for session {}", serial);
            return Err(ServiceError::AuthenticationFailed);
        }

        let command = command.open(key)?;
        let reply: &[u8] = match command.as_slice() {
            b"ping" => b"pong",
            other => {
                return Err(ServiceError::Validation(format!(
                    "Unknown command: {}",
                    String::from_utf8_lossy(other)
                )));
            }
        };

        tracing::debug!("Command executed for session {}", serial);
        Ok((EncryptedValue::seal(reply, key)?, RESULT_OK))
    }
}
