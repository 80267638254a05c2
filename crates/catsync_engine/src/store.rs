//! Mapping persistence: local entity ID to remote resource ID.
//!
//! A store is scoped to one sync domain. It is the only shared mutable
//! state the engine touches.

use crate::error::{SyncError, SyncResult};
use catsync_protocol::{RemoteResourceMapping, SyncDomain};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Durable local-to-remote ID mapping for one sync domain.
///
/// Callers must only `put` after a confirmed remote create and only `remove`
/// after a confirmed remote delete.
pub trait SyncStateStore: Send + Sync {
    /// Returns the remote ID mapped to a local ID.
    fn get(&self, local_id: &str) -> SyncResult<Option<String>>;

    /// Stores a mapping, overwriting any previous one.
    fn put(&self, local_id: &str, remote_id: &str) -> SyncResult<()>;

    /// Removes a mapping. Removing a missing mapping is not an error.
    fn remove(&self, local_id: &str) -> SyncResult<()>;

    /// Returns every stored mapping, ordered by local ID.
    fn entries(&self) -> SyncResult<Vec<RemoteResourceMapping>>;
}

/// An in-memory state store.
///
/// Counts reads and writes so tests can prove the store was left alone.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    mappings: RwLock<BTreeMap<String, String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with mappings.
    pub fn with_mappings<I, K, V>(mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        store.mappings.write().extend(
            mappings
                .into_iter()
                .map(|(local, remote)| (local.into(), remote.into())),
        );
        store
    }

    /// Number of mappings.
    pub fn len(&self) -> usize {
        self.mappings.read().len()
    }

    /// Returns true if the store holds no mappings.
    pub fn is_empty(&self) -> bool {
        self.mappings.read().is_empty()
    }

    /// Number of `get` and `entries` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of `put` and `remove` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SyncStateStore for MemoryStateStore {
    fn get(&self, local_id: &str) -> SyncResult<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.mappings.read().get(local_id).cloned())
    }

    fn put(&self, local_id: &str, remote_id: &str) -> SyncResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.mappings
            .write()
            .insert(local_id.to_string(), remote_id.to_string());
        Ok(())
    }

    fn remove(&self, local_id: &str) -> SyncResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.mappings.write().remove(local_id);
        Ok(())
    }

    fn entries(&self) -> SyncResult<Vec<RemoteResourceMapping>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .mappings
            .read()
            .iter()
            .map(|(local, remote)| RemoteResourceMapping::new(local.clone(), remote.clone()))
            .collect())
    }
}

/// On-disk document for one domain.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    domain: SyncDomain,
    #[serde(default)]
    mappings: BTreeMap<String, String>,
}

/// A JSON-file state store.
///
/// Keeps `<dir>/<domain>.json` in sync with an in-memory copy. Every
/// mutation rewrites the whole document through a `.tmp` file and a rename,
/// so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    domain: SyncDomain,
    mappings: RwLock<BTreeMap<String, String>>,
}

impl FileStateStore {
    /// Opens the store for a domain, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or an existing
    /// store file cannot be read or decoded.
    pub fn open(dir: &Path, domain: SyncDomain) -> SyncResult<Self> {
        let path = Self::path_for(dir, &domain)?;
        std::fs::create_dir_all(dir).map_err(|e| SyncError::store_io(dir, e))?;

        let mappings = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).map_err(|e| SyncError::store_io(&path, e))?;
            let file: StoreFile = serde_json::from_str(&contents)?;
            if file.domain != domain {
                tracing::warn!(
                    path = %path.display(),
                    expected = %domain,
                    found = %file.domain,
                    "state file domain does not match"
                );
            }
            file.mappings
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            domain,
            mappings: RwLock::new(mappings),
        })
    }

    /// Path of the store document for a domain.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidDomain`] unless the name is a plain file
    /// stem: ASCII letters, digits, `_`, `-` and `.`, not starting with `.`.
    pub fn path_for(dir: &Path, domain: &SyncDomain) -> SyncResult<PathBuf> {
        let name = domain.as_str();
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !plain {
            return Err(SyncError::InvalidDomain(name.to_string()));
        }
        Ok(dir.join(format!("{name}.json")))
    }

    /// Returns the store file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, mappings: &BTreeMap<String, String>) -> SyncResult<()> {
        let file = StoreFile {
            domain: self.domain.clone(),
            mappings: mappings.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| SyncError::store_io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| SyncError::store_io(&self.path, e))?;
        Ok(())
    }
}

impl SyncStateStore for FileStateStore {
    fn get(&self, local_id: &str) -> SyncResult<Option<String>> {
        Ok(self.mappings.read().get(local_id).cloned())
    }

    fn put(&self, local_id: &str, remote_id: &str) -> SyncResult<()> {
        let mut mappings = self.mappings.write();
        let previous = mappings.insert(local_id.to_string(), remote_id.to_string());
        if let Err(e) = self.persist(&mappings) {
            // Keep memory consistent with disk.
            match previous {
                Some(previous) => mappings.insert(local_id.to_string(), previous),
                None => mappings.remove(local_id),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, local_id: &str) -> SyncResult<()> {
        let mut mappings = self.mappings.write();
        let Some(previous) = mappings.remove(local_id) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&mappings) {
            mappings.insert(local_id.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    fn entries(&self) -> SyncResult<Vec<RemoteResourceMapping>> {
        Ok(self
            .mappings
            .read()
            .iter()
            .map(|(local, remote)| RemoteResourceMapping::new(local.clone(), remote.clone()))
            .collect())
    }
}
