use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::secret::SecretPayload;

/// The properties a client supplies when creating an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProperties {
    #[serde(rename = "org.freedesktop.Secret.Item.Label", default)]
    pub label: String,
    #[serde(rename = "org.freedesktop.Secret.Item.Attributes", default)]
    pub attributes: HashMap<String, String>,
}

/// A single secret plus its metadata.
#[derive(Debug, Clone)]
pub struct Item {
    /// `<collectionPath>/<itemID>`.
    pub object_path: String,
    /// A human-readable label.
    pub label: String,
    /// Lookup attributes.
    pub attributes: HashMap<String, String>,
    /// The stored ciphertext and the session that produced it.
    pub secret: SecretPayload,
    /// The timestamp when the item was created.
    pub created: DateTime<Utc>,
    /// The timestamp of the last secret change.
    pub modified: DateTime<Utc>,
}

/// The public view of an item returned over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub object_path: String,
    #[serde(flatten)]
    pub properties: ItemProperties,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<&Item> for ItemInfo {
    fn from(item: &Item) -> Self {
        Self {
            object_path: item.object_path.clone(),
            properties: ItemProperties {
                label: item.label.clone(),
                attributes: item.attributes.clone(),
            },
            created: item.created,
            modified: item.modified,
        }
    }
}
