use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::item::Item;

/// The properties a client supplies when creating a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionProperties {
    #[serde(rename = "org.freedesktop.Secret.Collection.Label", default)]
    pub label: String,
}

/// A named grouping of items.
#[derive(Debug, Clone)]
pub struct Collection {
    /// The alias this collection is addressed by, if any.
    pub alias: Option<String>,
    /// Either `/aliases/<alias>` or `/collection/<id>`.
    pub object_path: String,
    /// A human-readable label.
    pub label: String,
    /// Items keyed by object path.
    pub items: HashMap<String, Item>,
    /// The timestamp when the collection was created.
    pub created: DateTime<Utc>,
}

impl Collection {
    pub fn new(object_path: String, alias: Option<String>, label: String) -> Self {
        Self {
            alias,
            object_path,
            label,
            items: HashMap::new(),
            created: Utc::now(),
        }
    }

    pub fn get_item_by_path(&self, path: &str) -> Option<&Item> {
        self.items.get(path)
    }

    /// Finds the item whose attributes equal `attributes` exactly.
    pub fn find_by_attributes(&self, attributes: &HashMap<String, String>) -> Option<&Item> {
        self.items.values().find(|item| &item.attributes == attributes)
    }
}
