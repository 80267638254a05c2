//! Durable links between local entities and remote resources.

use serde::{Deserialize, Serialize};

/// The persisted association of one local entity with one remote resource.
///
/// A mapping exists only after the remote create was confirmed, and is
/// removed only after the remote delete was confirmed. The remote ID never
/// changes while the mapping exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteResourceMapping {
    /// Local entity ID.
    pub local_id: String,
    /// ID assigned by the remote API on creation.
    pub remote_id: String,
}

impl RemoteResourceMapping {
    /// Creates a new mapping.
    pub fn new(local_id: impl Into<String>, remote_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            remote_id: remote_id.into(),
        }
    }
}
