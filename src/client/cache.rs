use std::collections::HashMap;
use zeroize::Zeroizing;

use crate::crypto::aes::SecureKey;
use crate::error::{Result, ServiceError};
use crate::models::secret::SecretPayload;

/// The client's half of a negotiated session.
#[derive(Clone)]
pub struct ClientSession {
    pub serial_number: String,
    pub symmetric_key: SecureKey,
    pub object_path: String,
    /// Set once Login succeeds.
    pub cookie: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("serial_number", &self.serial_number)
            .field("object_path", &self.object_path)
            .field("authenticated", &self.cookie.is_some())
            .finish()
    }
}

/// An item as this client last wrote it.
#[derive(Debug, Clone)]
pub struct ClientItem {
    pub object_path: String,
    pub label: String,
    pub attributes: HashMap<String, String>,
    pub secret: SecretPayload,
}

/// A collection as observed by this client.
#[derive(Debug, Clone)]
pub struct ClientCollection {
    pub alias: Option<String>,
    pub object_path: String,
    pub label: String,
    pub items: HashMap<String, ClientItem>,
}

impl ClientCollection {
    pub fn new(object_path: String, alias: Option<String>, label: String) -> Self {
        Self {
            alias,
            object_path,
            label,
            items: HashMap::new(),
        }
    }

    pub fn get_item_by_path(&self, path: &str) -> Option<&ClientItem> {
        self.items.get(path)
    }
}

/// Local mirror of the session and the objects this client created.
#[derive(Debug, Default)]
pub struct ClientCache {
    pub session: Option<ClientSession>,
    pub collections: HashMap<String, ClientCollection>,
}

impl ClientCache {
    /// The current session, or `UnknownSession` before OpenSession.
    pub fn session(&self) -> Result<&ClientSession> {
        self.session.as_ref().ok_or(ServiceError::UnknownSession)
    }

    pub fn get_collection(&self, path: &str) -> Option<&ClientCollection> {
        self.collections.get(path)
    }

    pub fn get_collection_by_alias(&self, alias: &str) -> Option<&ClientCollection> {
        self.collections
            .values()
            .find(|c| c.alias.as_deref() == Some(alias))
    }

    /// Looks an item up across every cached collection.
    pub fn get_item_by_path(&self, path: &str) -> Option<&ClientItem> {
        self.collections
            .values()
            .find_map(|c| c.get_item_by_path(path))
    }

    /// Records an item under its collection, creating an unlabelled entry
    /// for collections this client did not create itself.
    pub(crate) fn record_item(&mut self, collection_path: &str, item: ClientItem) {
        self.collections
            .entry(collection_path.to_string())
            .or_insert_with(|| ClientCollection::new(collection_path.to_string(), None, String::new()))
            .items
            .insert(item.object_path.clone(), item);
    }
}
