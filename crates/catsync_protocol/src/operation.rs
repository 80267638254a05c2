//! Reconciliation decisions.

use serde::Serialize;
use std::fmt;

/// Kind of remote operation chosen for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// No mapping exists; create the remote resource.
    Create,
    /// A mapping exists; update the remote resource in place.
    Update,
    /// The entity is gone; delete the remote resource.
    Delete,
    /// Nothing to do.
    Skip,
}

impl OperationKind {
    /// Returns the lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Skip => "skip",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconciliation decision for one entity.
///
/// Produced and consumed within a single reconciliation call; never
/// persisted. For a planned create `remote_id` is `None`; once the create
/// has been performed it carries the newly assigned ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOperation {
    /// The decision.
    pub kind: OperationKind,
    /// Local entity ID.
    pub local_id: String,
    /// Remote resource ID, when known.
    pub remote_id: Option<String>,
}

impl SyncOperation {
    /// Creates a new operation.
    pub fn new(kind: OperationKind, local_id: impl Into<String>, remote_id: Option<String>) -> Self {
        Self {
            kind,
            local_id: local_id.into(),
            remote_id,
        }
    }

    /// Creates a skip operation.
    pub fn skip(local_id: impl Into<String>) -> Self {
        Self::new(OperationKind::Skip, local_id, None)
    }

    /// Returns true if no remote call is involved.
    pub fn is_skip(&self) -> bool {
        self.kind == OperationKind::Skip
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.remote_id {
            Some(remote_id) => write!(f, "{} {} -> {}", self.kind, self.local_id, remote_id),
            None => write!(f, "{} {}", self.kind, self.local_id),
        }
    }
}
