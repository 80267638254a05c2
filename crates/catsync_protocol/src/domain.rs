//! Sync domains and entity lifecycle events.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A category of synchronized entity.
///
/// Each domain has its own enable toggle and its own state store, so
/// product sets and product feeds never share mappings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncDomain(String);

impl SyncDomain {
    /// Product categories mirrored as remote product sets.
    pub const PRODUCT_SETS: &'static str = "product_sets";
    /// Catalog feeds mirrored as remote product feeds.
    pub const PRODUCT_FEEDS: &'static str = "product_feeds";

    /// Creates a domain with a custom name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The product set domain.
    pub fn product_sets() -> Self {
        Self::new(Self::PRODUCT_SETS)
    }

    /// The product feed domain.
    pub fn product_feeds() -> Self {
        Self::new(Self::PRODUCT_FEEDS)
    }

    /// Returns the domain name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SyncDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SyncDomain {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Kind of lifecycle change observed on a local entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Entity was created.
    Created,
    /// Entity was updated.
    Updated,
    /// Entity was deleted.
    Deleted,
}

impl ChangeKind {
    /// Returns the lowercase name of the change kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "created" | "create" => Ok(ChangeKind::Created),
            "updated" | "update" => Ok(ChangeKind::Updated),
            "deleted" | "delete" => Ok(ChangeKind::Deleted),
            _ => Err(ProtocolError::UnknownChangeKind(s.to_string())),
        }
    }
}

/// A lifecycle event delivered by the host's hook mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEvent {
    /// Domain the entity belongs to.
    pub domain: SyncDomain,
    /// Local entity ID.
    pub entity_id: String,
    /// What happened to the entity.
    pub kind: ChangeKind,
}

impl EntityEvent {
    /// Creates a new event.
    pub fn new(domain: SyncDomain, entity_id: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            domain,
            entity_id: entity_id.into(),
            kind,
        }
    }
}
