//! Source of local entities eligible for sync.

use crate::error::SyncResult;
use catsync_protocol::LocalEntity;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Enumerates and resolves local entities.
///
/// `list_entities` must return a finite sequence and may be called again to
/// restart enumeration.
pub trait LocalEntityProvider: Send + Sync {
    /// Lists every entity eligible for sync.
    fn list_entities(&self) -> SyncResult<Vec<LocalEntity>>;

    /// Resolves a single entity. `None` if it no longer exists locally.
    fn get_by_id(&self, id: &str) -> SyncResult<Option<LocalEntity>>;
}

/// An in-memory entity provider.
///
/// Entities are listed in ID order.
#[derive(Debug, Default)]
pub struct MemoryEntityProvider {
    entities: RwLock<BTreeMap<String, LocalEntity>>,
}

impl MemoryEntityProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider holding the given entities.
    pub fn with_entities(entities: impl IntoIterator<Item = LocalEntity>) -> Self {
        let provider = Self::new();
        for entity in entities {
            provider.upsert(entity);
        }
        provider
    }

    /// Inserts or replaces an entity.
    pub fn upsert(&self, entity: LocalEntity) {
        self.entities.write().insert(entity.id.clone(), entity);
    }

    /// Removes an entity, returning it if it existed.
    pub fn remove(&self, id: &str) -> Option<LocalEntity> {
        self.entities.write().remove(id)
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Returns true if there are no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }
}

impl LocalEntityProvider for MemoryEntityProvider {
    fn list_entities(&self) -> SyncResult<Vec<LocalEntity>> {
        Ok(self.entities.read().values().cloned().collect())
    }

    fn get_by_id(&self, id: &str) -> SyncResult<Option<LocalEntity>> {
        Ok(self.entities.read().get(id).cloned())
    }
}
