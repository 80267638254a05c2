//! Local entities read from a JSON file.

use catsync_engine::{LocalEntityProvider, SyncError, SyncResult};
use catsync_protocol::LocalEntity;
use std::path::{Path, PathBuf};

/// Entity provider backed by a JSON array of entities.
///
/// The file is re-read on every call, so edits between commands (or
/// between events) are picked up.
#[derive(Debug, Clone)]
pub struct FileEntityProvider {
    path: PathBuf,
}

impl FileEntityProvider {
    /// Creates a provider for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A provider with no backing file. Lists nothing.
    pub fn none() -> Self {
        Self {
            path: PathBuf::new(),
        }
    }

    fn load(&self) -> SyncResult<Vec<LocalEntity>> {
        if self.path.as_os_str().is_empty() {
            return Ok(Vec::new());
        }
        read_entities(&self.path)
    }
}

fn read_entities(path: &Path) -> SyncResult<Vec<LocalEntity>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SyncError::Provider(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| SyncError::Provider(format!("invalid entities in {}: {e}", path.display())))
}

impl LocalEntityProvider for FileEntityProvider {
    fn list_entities(&self) -> SyncResult<Vec<LocalEntity>> {
        self.load()
    }

    fn get_by_id(&self, id: &str) -> SyncResult<Option<LocalEntity>> {
        Ok(self.load()?.into_iter().find(|entity| entity.id == id))
    }
}
