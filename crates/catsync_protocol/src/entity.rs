//! Local entities observed by the reconciliation engine.

use crate::filter::FilterExpr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A syncable local domain object, such as a product category.
///
/// The host system owns entity identity and lifecycle; sync code only
/// borrows entities for the duration of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEntity {
    /// Stable local identifier, unique within its domain.
    pub id: String,
    /// Human-readable label.
    pub display_name: String,
    /// Free-form metadata sent alongside the remote resource.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl LocalEntity {
    /// Creates an entity with no metadata.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the `description` metadata entry.
    pub fn with_description(self, description: impl Into<String>) -> Self {
        self.with_metadata("description", description)
    }

    /// Sets the `external_url` metadata entry.
    pub fn with_external_url(self, url: impl Into<String>) -> Self {
        self.with_metadata("external_url", url)
    }

    /// The predicate selecting which catalog items belong to this entity.
    ///
    /// Always derived from the current display name, so a rename moves the
    /// membership rule along with it.
    pub fn filter_criteria(&self) -> FilterExpr {
        FilterExpr::product_type_contains(self.display_name.clone())
    }
}
