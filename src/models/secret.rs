use serde::{Deserialize, Serialize};

use crate::wire::b64;

/// An encrypted secret as it travels between client and service.
///
/// `value` is ciphertext under the key of the session named by `session`;
/// the service stores it verbatim and never sees plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretPayload {
    /// Object path of the session whose key encrypted `value`.
    pub session: String,
    /// The CBC IV.
    #[serde(with = "b64")]
    pub parameters: Vec<u8>,
    /// The ciphertext.
    #[serde(with = "b64")]
    pub value: Vec<u8>,
    /// The declared MIME type of the plaintext, e.g. `text/plain`.
    pub content_type: String,
}

impl SecretPayload {
    /// Encrypts `plaintext` under `key` for the session at `session`.
    pub fn encrypt(
        session: &str,
        plaintext: &[u8],
        key: &[u8],
        content_type: &str,
    ) -> crate::error::Result<Self> {
        let (iv, value) = crate::crypto::aes::encrypt(plaintext, key)?;
        Ok(Self {
            session: session.to_string(),
            parameters: iv,
            value,
            content_type: content_type.to_string(),
        })
    }

    /// Decrypts the payload with `key`.
    pub fn decrypt(&self, key: &[u8]) -> crate::error::Result<Vec<u8>> {
        crate::crypto::aes::decrypt(&self.parameters, &self.value, key)
    }
}
