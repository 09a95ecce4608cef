use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::crypto::token;
use crate::error::{Result, ServiceError};
use crate::models::collection::{Collection, CollectionProperties};
use crate::models::item::{Item, ItemProperties};
use crate::models::secret::SecretPayload;
use crate::paths::{self, NO_PROMPT};

#[derive(Default)]
struct StoreInner {
    /// Collections keyed by object path.
    collections: HashMap<String, Collection>,
    /// Alias name to collection object path.
    aliases: HashMap<String, String>,
}

/// The authoritative collection/item hierarchy.
///
/// All mutation happens under one write lock, so identifier allocation and
/// insertion are a single step and concurrent creations never collide.
#[derive(Clone, Default)]
pub struct ObjectStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl ObjectStore {
    /// Creates a new, empty `ObjectStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection, or returns the one already holding `alias`.
    ///
    /// # Arguments
    ///
    /// * `properties` - The collection's properties.
    /// * `alias` - An optional alias; the collection is then addressed at
    ///   `/org/freedesktop/secrets/aliases/<alias>`.
    ///
    /// # Returns
    ///
    /// The collection's object path and the prompt path (always `"/"`).
    pub async fn create_collection(
        &self,
        properties: CollectionProperties,
        alias: Option<&str>,
    ) -> Result<(String, String)> {
        if let Some(alias) = alias {
            paths::validate_alias(alias)?;
        }

        let mut inner = self.inner.write().await;

        let path = match alias {
            Some(alias) => {
                if let Some(existing) = inner.aliases.get(alias) {
                    tracing::debug!("Collection for alias '{}' already exists", alias);
                    return Ok((existing.clone(), NO_PROMPT.to_string()));
                }
                paths::alias_path(alias)
            }
            None => {
                let id = token::allocate_identifier(|id| {
                    inner.collections.contains_key(&paths::collection_path(id))
                })?;
                paths::collection_path(&id)
            }
        };

        if inner.collections.contains_key(&path) {
            return Err(ServiceError::PathCollision(path));
        }

        let collection = Collection::new(path.clone(), alias.map(str::to_string), properties.label);
        inner.collections.insert(path.clone(), collection);
        if let Some(alias) = alias {
            inner.aliases.insert(alias.to_string(), path.clone());
        }

        tracing::info!("📁 Collection created: {}", path);
        Ok((path, NO_PROMPT.to_string()))
    }

    /// Creates an item in a collection.
    ///
    /// The secret is stored verbatim; it is already ciphertext. With `replace`
    /// set, an item whose attribute map equals `properties.attributes` exactly
    /// has its secret overwritten instead.
    ///
    /// # Returns
    ///
    /// The item's object path and the prompt path (always `"/"`).
    pub async fn create_item(
        &self,
        collection_path: &str,
        properties: ItemProperties,
        secret: SecretPayload,
        replace: bool,
    ) -> Result<(String, String)> {
        let mut inner = self.inner.write().await;
        let collection = inner
            .collections
            .get_mut(collection_path)
            .ok_or(ServiceError::NotFound)?;

        if replace {
            let existing = collection
                .find_by_attributes(&properties.attributes)
                .map(|item| item.object_path.clone());
            if let Some(path) = existing {
                if let Some(item) = collection.items.get_mut(&path) {
                    item.secret = secret;
                    item.modified = Utc::now();
                }
                tracing::info!("🔁 Item replaced: {}", path);
                return Ok((path, NO_PROMPT.to_string()));
            }
        }

        let id = token::allocate_identifier(|id| {
            collection
                .items
                .contains_key(&paths::item_path(collection_path, id))
        })?;
        let path = paths::item_path(collection_path, &id);

        let now = Utc::now();
        collection.items.insert(
            path.clone(),
            Item {
                object_path: path.clone(),
                label: properties.label,
                attributes: properties.attributes,
                secret,
                created: now,
                modified: now,
            },
        );

        tracing::info!("🔐 Item created: {}", path);
        Ok((path, NO_PROMPT.to_string()))
    }

    /// Looks up an item by its exact object path.
    pub async fn get_item_by_path(&self, path: &str) -> Option<Item> {
        let (collection, _) = paths::split_item_path(path).ok()?;
        let inner = self.inner.read().await;
        inner
            .collections
            .get(collection)?
            .get_item_by_path(path)
            .cloned()
    }

    pub async fn get_collection(&self, path: &str) -> Option<Collection> {
        self.inner.read().await.collections.get(path).cloned()
    }

    pub async fn get_collection_by_alias(&self, alias: &str) -> Option<Collection> {
        let inner = self.inner.read().await;
        let path = inner.aliases.get(alias)?;
        inner.collections.get(path).cloned()
    }

    /// Resolves an alias to a collection path, or `"/"` if it is unassigned.
    pub async fn read_alias(&self, alias: &str) -> String {
        self.inner
            .read()
            .await
            .aliases
            .get(alias)
            .cloned()
            .unwrap_or_else(|| NO_PROMPT.to_string())
    }

    /// Returns a copy of an item's stored secret.
    pub async fn secret_of(&self, item_path: &str) -> Result<SecretPayload> {
        self.get_item_by_path(item_path)
            .await
            .map(|item| item.secret)
            .ok_or(ServiceError::NotFound)
    }

    /// Replaces an item's stored secret in one write.
    pub async fn set_secret(&self, item_path: &str, secret: SecretPayload) -> Result<()> {
        let (collection, _) =
            paths::split_item_path(item_path).map_err(|_| ServiceError::NotFound)?;
        let mut inner = self.inner.write().await;
        let item = inner
            .collections
            .get_mut(collection)
            .and_then(|c| c.items.get_mut(item_path))
            .ok_or(ServiceError::NotFound)?;
        item.secret = secret;
        item.modified = Utc::now();
        tracing::debug!("Secret updated for {}", item_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: &[u8]) -> SecretPayload {
        SecretPayload {
            session: paths::session_path("0123456789abcdef0123456789abcdef"),
            parameters: vec![0u8; 16],
            value: value.to_vec(),
            content_type: "text/plain".to_string(),
        }
    }

    fn properties(label: &str, attrs: &[(&str, &str)]) -> ItemProperties {
        ItemProperties {
            label: label.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn alias_collection_is_idempotent() {
        let store = ObjectStore::new();
        let (first, prompt) = store
            .create_collection(CollectionProperties::default(), Some("default"))
            .await
            .unwrap();
        assert_eq!(first, "/org/freedesktop/secrets/aliases/default");
        assert_eq!(prompt, "/");

        let (second, _) = store
            .create_collection(CollectionProperties { label: "other".into() }, Some("default"))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.read_alias("default").await, first);
        assert_eq!(store.read_alias("missing").await, "/");
        assert!(store.get_collection_by_alias("default").await.is_some());
    }

    #[tokio::test]
    async fn unaliased_collections_get_fresh_paths() {
        let store = ObjectStore::new();
        let props = CollectionProperties { label: "work".into() };
        let (a, _) = store.create_collection(props.clone(), None).await.unwrap();
        let (b, _) = store.create_collection(props, None).await.unwrap();

        assert_ne!(a, b);
        assert!(a.starts_with(paths::COLLECTION_PREFIX));
        assert_eq!(a.len(), paths::COLLECTION_PREFIX.len() + paths::IDENTIFIER_LEN);
        assert_eq!(store.get_collection(&a).await.unwrap().label, "work");
    }

    #[tokio::test]
    async fn rejects_malformed_alias() {
        let store = ObjectStore::new();
        let err = store
            .create_collection(CollectionProperties::default(), Some("../etc"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn item_paths_have_fixed_length() {
        let store = ObjectStore::new();
        let (collection, _) = store
            .create_collection(CollectionProperties::default(), Some("default"))
            .await
            .unwrap();
        let (item, prompt) = store
            .create_item(&collection, properties("some item", &[("a", "b")]), payload(b"x"), true)
            .await
            .unwrap();

        assert_eq!(prompt, "/");
        assert_eq!(&item[..41], "/org/freedesktop/secrets/aliases/default/");
        assert_eq!(item.len(), 73);

        let stored = store.get_item_by_path(&item).await.unwrap();
        assert_eq!(stored.label, "some item");
        assert_eq!(stored.secret.value, b"x");
    }

    #[tokio::test]
    async fn replace_matches_exact_attributes_only() {
        let store = ObjectStore::new();
        let (collection, _) = store
            .create_collection(CollectionProperties::default(), Some("default"))
            .await
            .unwrap();
        let attrs = [("a", "b"), ("c", "d")];

        let (first, _) = store
            .create_item(&collection, properties("one", &attrs), payload(b"1"), true)
            .await
            .unwrap();
        let (replaced, _) = store
            .create_item(&collection, properties("two", &attrs), payload(b"2"), true)
            .await
            .unwrap();
        assert_eq!(first, replaced);
        assert_eq!(store.secret_of(&first).await.unwrap().value, b"2");

        // A subset of the attributes is a different item.
        let (subset, _) = store
            .create_item(&collection, properties("three", &[("a", "b")]), payload(b"3"), true)
            .await
            .unwrap();
        assert_ne!(first, subset);

        // Without replace, equal attributes still create a new item.
        let (fresh, _) = store
            .create_item(&collection, properties("four", &attrs), payload(b"4"), false)
            .await
            .unwrap();
        assert_ne!(first, fresh);
        assert_eq!(store.get_collection(&collection).await.unwrap().items.len(), 3);
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let store = ObjectStore::new();
        let err = store
            .create_item("/org/freedesktop/secrets/aliases/nope", ItemProperties::default(), payload(b""), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
        assert!(store.get_item_by_path("/not/an/item").await.is_none());
    }

    #[tokio::test]
    async fn set_secret_overwrites_ciphertext() {
        let store = ObjectStore::new();
        let (collection, _) = store
            .create_collection(CollectionProperties::default(), Some("default"))
            .await
            .unwrap();
        let (item, _) = store
            .create_item(&collection, ItemProperties::default(), payload(b"old"), false)
            .await
            .unwrap();

        store.set_secret(&item, payload(b"new")).await.unwrap();
        assert_eq!(store.secret_of(&item).await.unwrap().value, b"new");

        let missing = paths::item_path(&collection, "ffffffffffffffffffffffffffffffff");
        assert!(matches!(
            store.set_secret(&missing, payload(b"")).await,
            Err(ServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn concurrent_creates_never_share_an_identifier() {
        let store = ObjectStore::new();
        let (collection, _) = store
            .create_collection(CollectionProperties::default(), Some("default"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            let collection = collection.clone();
            handles.push(tokio::spawn(async move {
                let n = i.to_string();
                store
                    .create_item(&collection, properties(&n, &[("n", n.as_str())]), payload(b"x"), false)
                    .await
                    .unwrap()
                    .0
            }));
        }

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            assert!(paths.insert(handle.await.unwrap()));
        }
        assert_eq!(store.get_collection(&collection).await.unwrap().items.len(), 32);
    }
}
