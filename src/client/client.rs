use reqwest::{header::HeaderMap, header::HeaderValue, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use zeroize::Zeroizing;

use super::cache::{ClientCache, ClientCollection, ClientItem, ClientSession};
use crate::crypto::aes::{self, SecureKey};
use crate::crypto::dh::{DhKeypair, ALGORITHM_DH};
use crate::error::{Result, ServiceError};
use crate::handlers::auth::{
    CommandRequest, CommandResponse, LoginRequest, LoginResponse, SetPasswordRequest,
};
use crate::handlers::item::{
    CreateItemRequest, CreateItemResponse, GetItemRequest, GetSecretRequest, GetSecretResponse,
    SetSecretRequest,
};
use crate::handlers::service::{
    CloseSessionRequest, CreateCollectionRequest, CreateCollectionResponse, OpenSessionRequest,
    OpenSessionResponse, ReadAliasRequest, ReadAliasResponse, ResultResponse,
};
use crate::models::collection::CollectionProperties;
use crate::models::item::{ItemInfo, ItemProperties};
use crate::models::secret::SecretPayload;
use crate::paths;
use crate::services::auth::EncryptedValue;

/// The error body every failed call carries.
#[derive(Deserialize)]
struct WireError {
    error: String,
    name: String,
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Transport(e.to_string())
    }
}

/// Client for the secret service RPC surface.
///
/// Keeps a [`ClientCache`] of the negotiated session and of every collection
/// and item it creates, so callers can cross-check against the service.
#[derive(Debug)]
pub struct SecretServiceClient {
    base_url: String,
    client: Client,
    cache: ClientCache,
}

impl SecretServiceClient {
    /// Creates a client for the service listening at `base_url`, e.g. `http://127.0.0.1:7171`.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            cache: ClientCache::default(),
        })
    }

    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    /// The current session.
    pub fn session(&self) -> Result<&ClientSession> {
        self.cache.session()
    }

    async fn call<Req: Serialize, Resp: DeserializeOwned>(&self, method: &str, request: &Req) -> Result<Resp> {
        let url = format!("{}/api/{}", self.base_url, method);
        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Resp>().await?);
        }

        let body = response.text().await?;
        Err(match sonic_rs::from_str::<WireError>(&body) {
            Ok(wire) => ServiceError::from_wire(&wire.name, wire.error),
            Err(_) => ServiceError::Transport(format!("HTTP {}: {}", status, body)),
        })
    }

    fn key(&self) -> Result<SecureKey> {
        Ok(self.session()?.symmetric_key.clone())
    }

    async fn negotiate(&mut self, method: &str) -> Result<String> {
        let keypair = DhKeypair::generate();
        let response: OpenSessionResponse = self
            .call(
                method,
                &OpenSessionRequest {
                    algorithm: ALGORITHM_DH.to_string(),
                    input: keypair.public_bytes(),
                },
            )
            .await?;

        if response.serial_number.len() != paths::IDENTIFIER_LEN {
            return Err(ServiceError::NegotiationFailure(format!(
                "Unexpected serial number length {}",
                response.serial_number.len()
            )));
        }
        let symmetric_key = keypair.derive_key(&response.output)?;

        tracing::debug!("Session {} negotiated", response.serial_number);
        self.cache.session = Some(ClientSession {
            object_path: response.session,
            serial_number: response.serial_number.clone(),
            symmetric_key,
            cookie: None,
        });
        Ok(response.serial_number)
    }

    /// Negotiates a new session and returns its serial number.
    pub async fn open_session(&mut self) -> Result<String> {
        self.negotiate("service/open-session").await
    }

    /// Same as [`open_session`](Self::open_session), via CreateSession.
    pub async fn create_session(&mut self) -> Result<String> {
        self.negotiate("service/create-session").await
    }

    /// Closes the current session and forgets its key.
    pub async fn close_session(&mut self) -> Result<()> {
        let session = self.session()?.object_path.clone();
        let _: ResultResponse = self
            .call("service/close-session", &CloseSessionRequest { session })
            .await?;
        self.cache.session = None;
        Ok(())
    }

    /// Creates (or reuses) a collection and returns its object path.
    ///
    /// For an aliased collection the path is computed locally and must match
    /// what the service answers.
    pub async fn create_collection(&mut self, label: &str, alias: Option<&str>) -> Result<String> {
        let response: CreateCollectionResponse = self
            .call(
                "service/create-collection",
                &CreateCollectionRequest {
                    properties: CollectionProperties {
                        label: label.to_string(),
                    },
                    alias: alias.unwrap_or_default().to_string(),
                },
            )
            .await?;

        if let Some(alias) = alias {
            let expected = paths::alias_path(alias);
            if response.collection != expected {
                return Err(ServiceError::Internal(format!(
                    "Alias path mismatch: expected {}, got {}",
                    expected, response.collection
                )));
            }
        }

        self.cache
            .collections
            .entry(response.collection.clone())
            .or_insert_with(|| {
                ClientCollection::new(
                    response.collection.clone(),
                    alias.map(str::to_string),
                    label.to_string(),
                )
            });
        Ok(response.collection)
    }

    /// Stores `secret` as a new item, encrypted under the current session.
    pub async fn create_item(
        &mut self,
        collection: &str,
        label: &str,
        attributes: HashMap<String, String>,
        secret: &[u8],
        content_type: &str,
        replace: bool,
    ) -> Result<String> {
        let session = self.session()?;
        let payload = SecretPayload::encrypt(
            &session.object_path,
            secret,
            session.symmetric_key.as_bytes(),
            content_type,
        )?;

        let response: CreateItemResponse = self
            .call(
                "collection/create-item",
                &CreateItemRequest {
                    collection: collection.to_string(),
                    properties: ItemProperties {
                        label: label.to_string(),
                        attributes: attributes.clone(),
                    },
                    secret: payload.clone(),
                    replace,
                },
            )
            .await?;

        self.cache.record_item(
            collection,
            ClientItem {
                object_path: response.item.clone(),
                label: label.to_string(),
                attributes,
                secret: payload,
            },
        );
        Ok(response.item)
    }

    /// Fetches and decrypts an item's secret.
    ///
    /// Only secrets written under the current session can be decrypted.
    pub async fn get_secret(&self, item: &str) -> Result<Zeroizing<Vec<u8>>> {
        let session = self.session()?;
        let response: GetSecretResponse = self
            .call(
                "item/get-secret",
                &GetSecretRequest {
                    item: item.to_string(),
                    session: session.object_path.clone(),
                },
            )
            .await?;

        if response.secret.session != session.object_path {
            return Err(ServiceError::Crypto(
                "Secret is encrypted under another session".to_string(),
            ));
        }
        response
            .secret
            .decrypt(session.symmetric_key.as_bytes())
            .map(Zeroizing::new)
    }

    /// Replaces an item's secret.
    pub async fn set_secret(&mut self, item: &str, secret: &[u8], content_type: &str) -> Result<()> {
        let session = self.session()?;
        let payload = SecretPayload::encrypt(
            &session.object_path,
            secret,
            session.symmetric_key.as_bytes(),
            content_type,
        )?;

        let _: ResultResponse = self
            .call(
                "item/set-secret",
                &SetSecretRequest {
                    item: item.to_string(),
                    secret: payload.clone(),
                },
            )
            .await?;

        if let Some(cached) = self
            .cache
            .collections
            .values_mut()
            .find_map(|c| c.items.get_mut(item))
        {
            cached.secret = payload;
        }
        Ok(())
    }

    /// Fetches an item's label, attributes and timestamps.
    pub async fn get_item(&self, item: &str) -> Result<ItemInfo> {
        self.call(
            "item/get",
            &GetItemRequest {
                item: item.to_string(),
            },
        )
        .await
    }

    /// Resolves an alias to a collection path, `"/"` if unassigned.
    pub async fn read_alias(&self, name: &str) -> Result<String> {
        let response: ReadAliasResponse = self
            .call(
                "service/read-alias",
                &ReadAliasRequest {
                    name: name.to_string(),
                },
            )
            .await?;
        Ok(response.collection)
    }

    /// Changes the service password. All four inputs travel encrypted.
    pub async fn set_password(
        &self,
        old_password: &str,
        new_password: &str,
        old_salt: &str,
        new_salt: &str,
    ) -> Result<()> {
        let session = self.session()?;
        let key = session.symmetric_key.as_bytes();
        let old_password = EncryptedValue::seal(old_password.as_bytes(), key)?;
        let new_password = EncryptedValue::seal(new_password.as_bytes(), key)?;
        let old_salt = EncryptedValue::seal(old_salt.as_bytes(), key)?;
        let new_salt = EncryptedValue::seal(new_salt.as_bytes(), key)?;

        let _: ResultResponse = self
            .call(
                "auth/set-password",
                &SetPasswordRequest {
                    serial_number: session.serial_number.clone(),
                    old_password: old_password.value,
                    old_password_iv: old_password.iv,
                    new_password: new_password.value,
                    new_password_iv: new_password.iv,
                    old_salt: old_salt.value,
                    old_salt_iv: old_salt.iv,
                    new_salt: new_salt.value,
                    new_salt_iv: new_salt.iv,
                },
            )
            .await?;
        Ok(())
    }

    /// Logs the session in with the hex password hash and caches the cookie.
    pub async fn login(&mut self, hash: &str) -> Result<()> {
        let key = self.key()?;
        let session = self.session()?;
        let presented = EncryptedValue::seal(hash.as_bytes(), key.as_bytes())?;

        let response: LoginResponse = self
            .call(
                "auth/login",
                &LoginRequest {
                    serial_number: session.serial_number.clone(),
                    hash: presented.value,
                    hash_iv: presented.iv,
                },
            )
            .await?;

        let cookie = Zeroizing::new(aes::decrypt(
            &response.cookie_iv,
            &response.cookie,
            key.as_bytes(),
        )?);
        let cookie = String::from_utf8(cookie.to_vec())
            .map_err(|_| ServiceError::Crypto("Cookie is not valid UTF-8".to_string()))?;

        if let Some(session) = self.cache.session.as_mut() {
            session.cookie = Some(Zeroizing::new(cookie));
        }
        Ok(())
    }

    /// The cookie bound by the last successful Login.
    pub fn cookie(&self) -> Option<&str> {
        self.cache
            .session
            .as_ref()
            .and_then(|s| s.cookie.as_deref())
            .map(String::as_str)
    }

    /// Runs `command` on the logged-in session and returns the reply.
    pub async fn command(&self, command: &str) -> Result<Vec<u8>> {
        let session = self.session()?;
        let cookie = session
            .cookie
            .as_ref()
            .ok_or(ServiceError::AuthenticationFailed)?;
        let key = session.symmetric_key.as_bytes();
        let cookie = EncryptedValue::seal(cookie.as_bytes(), key)?;
        let command = EncryptedValue::seal(command.as_bytes(), key)?;

        let response: CommandResponse = self
            .call(
                "auth/command",
                &CommandRequest {
                    serial_number: session.serial_number.clone(),
                    cookie: cookie.value,
                    cookie_iv: cookie.iv,
                    command: command.value,
                    command_iv: command.iv,
                },
            )
            .await?;

        aes::decrypt(&response.reply_iv, &response.reply, key)
    }
}
