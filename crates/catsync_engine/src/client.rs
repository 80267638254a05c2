//! Remote resource client abstraction.

use crate::error::{SyncError, SyncResult};
use catsync_protocol::{RemotePayload, UpdateOutcome};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Create/update/delete access to one kind of remote resource.
///
/// This trait abstracts the remote API, allowing for different
/// implementations (HTTP, mock for testing, etc.). Implementations must
/// report ambiguous responses as errors, never as success.
pub trait RemoteResourceClient: Send + Sync {
    /// Creates a remote resource and returns its ID.
    fn create(&self, payload: &RemotePayload) -> SyncResult<String>;

    /// Updates an existing remote resource.
    fn update(&self, remote_id: &str, payload: &RemotePayload) -> SyncResult<UpdateOutcome>;

    /// Deletes a remote resource.
    fn delete(&self, remote_id: &str) -> SyncResult<()>;
}

/// A call received by [`MockResourceClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// `create` call.
    Create(RemotePayload),
    /// `update` call.
    Update {
        /// Target resource.
        remote_id: String,
        /// Payload sent.
        payload: RemotePayload,
    },
    /// `delete` call.
    Delete {
        /// Target resource.
        remote_id: String,
    },
}

/// A failure the mock should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Produces [`SyncError::TransientNetwork`].
    Transient,
    /// Produces [`SyncError::RemoteValidation`].
    Validation,
    /// Produces [`SyncError::Auth`].
    Auth,
    /// Produces [`SyncError::MalformedResponse`].
    Malformed,
}

impl MockFailure {
    fn to_error(self, target: &str) -> SyncError {
        match self {
            MockFailure::Transient => SyncError::transient(format!("connection reset ({target})")),
            MockFailure::Validation => {
                SyncError::validation(format!("invalid parameter ({target})"), Some(100))
            }
            MockFailure::Auth => SyncError::Auth(format!("access token expired ({target})")),
            MockFailure::Malformed => {
                SyncError::MalformedResponse(format!("missing confirmation ({target})"))
            }
        }
    }
}

/// A scriptable in-memory client for testing.
///
/// Records every call, even failed ones, and assigns sequential remote IDs
/// (`remote-1`, `remote-2`, ...) on successful creates. Failures are keyed
/// by retailer ID for creates and by remote ID for updates and deletes.
#[derive(Debug, Default)]
pub struct MockResourceClient {
    calls: Mutex<Vec<RecordedCall>>,
    next_id: AtomicU64,
    fail_all: Mutex<Option<MockFailure>>,
    create_failures: Mutex<HashMap<String, MockFailure>>,
    update_failures: Mutex<HashMap<String, MockFailure>>,
    delete_failures: Mutex<HashMap<String, MockFailure>>,
    partial_updates: Mutex<HashMap<String, Vec<String>>>,
}

impl MockResourceClient {
    /// Creates a mock that accepts every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail.
    pub fn fail_all(&self, failure: MockFailure) {
        *self.fail_all.lock() = Some(failure);
    }

    /// Makes creates for the given retailer ID fail.
    pub fn fail_create(&self, retailer_id: impl Into<String>, failure: MockFailure) {
        self.create_failures.lock().insert(retailer_id.into(), failure);
    }

    /// Makes updates of the given remote resource fail.
    pub fn fail_update(&self, remote_id: impl Into<String>, failure: MockFailure) {
        self.update_failures.lock().insert(remote_id.into(), failure);
    }

    /// Makes deletes of the given remote resource fail.
    pub fn fail_delete(&self, remote_id: impl Into<String>, failure: MockFailure) {
        self.delete_failures.lock().insert(remote_id.into(), failure);
    }

    /// Makes updates of the given remote resource reject some fields.
    pub fn partially_update(&self, remote_id: impl Into<String>, failed_fields: &[&str]) {
        self.partial_updates.lock().insert(
            remote_id.into(),
            failed_fields.iter().map(|f| f.to_string()).collect(),
        );
    }

    /// Removes every scripted failure.
    pub fn clear_failures(&self) {
        *self.fail_all.lock() = None;
        self.create_failures.lock().clear();
        self.update_failures.lock().clear();
        self.delete_failures.lock().clear();
        self.partial_updates.lock().clear();
    }

    /// Returns every recorded call in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Total number of calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of `create` calls.
    pub fn create_count(&self) -> usize {
        self.count(|c| matches!(c, RecordedCall::Create(_)))
    }

    /// Number of `update` calls.
    pub fn update_count(&self) -> usize {
        self.count(|c| matches!(c, RecordedCall::Update { .. }))
    }

    /// Number of `delete` calls.
    pub fn delete_count(&self) -> usize {
        self.count(|c| matches!(c, RecordedCall::Delete { .. }))
    }

    /// Retailer IDs of every `create` call, in order.
    pub fn created_retailer_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Create(payload) => Some(payload.retailer_id.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&RecordedCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    fn scripted(&self, failures: &Mutex<HashMap<String, MockFailure>>, key: &str) -> Option<MockFailure> {
        (*self.fail_all.lock()).or_else(|| failures.lock().get(key).copied())
    }
}

impl RemoteResourceClient for MockResourceClient {
    fn create(&self, payload: &RemotePayload) -> SyncResult<String> {
        self.calls.lock().push(RecordedCall::Create(payload.clone()));
        if let Some(failure) = self.scripted(&self.create_failures, &payload.retailer_id) {
            return Err(failure.to_error(&payload.retailer_id));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("remote-{n}"))
    }

    fn update(&self, remote_id: &str, payload: &RemotePayload) -> SyncResult<UpdateOutcome> {
        self.calls.lock().push(RecordedCall::Update {
            remote_id: remote_id.to_string(),
            payload: payload.clone(),
        });
        if let Some(failure) = self.scripted(&self.update_failures, remote_id) {
            return Err(failure.to_error(remote_id));
        }
        match self.partial_updates.lock().get(remote_id) {
            Some(failed_fields) => Ok(UpdateOutcome::Partial {
                updated_fields: vec!["name".to_string()],
                failed_fields: failed_fields.clone(),
            }),
            None => Ok(UpdateOutcome::Applied),
        }
    }

    fn delete(&self, remote_id: &str) -> SyncResult<()> {
        self.calls.lock().push(RecordedCall::Delete {
            remote_id: remote_id.to_string(),
        });
        if let Some(failure) = self.scripted(&self.delete_failures, remote_id) {
            return Err(failure.to_error(remote_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(retailer_id: &str) -> RemotePayload {
        RemotePayload {
            name: format!("Category {retailer_id}"),
            retailer_id: retailer_id.to_string(),
            filter: "{}".to_string(),
            metadata: None,
        }
    }

    #[test]
    fn mock_assigns_sequential_ids() {
        let client = MockResourceClient::new();
        assert_eq!(client.create(&payload("a")).unwrap(), "remote-1");
        assert_eq!(client.create(&payload("b")).unwrap(), "remote-2");
        assert_eq!(client.created_retailer_ids(), vec!["a", "b"]);
    }

    #[test]
    fn mock_scripted_failures() {
        let client = MockResourceClient::new();
        client.fail_create("a", MockFailure::Validation);
        client.fail_delete("remote-9", MockFailure::Transient);

        assert!(matches!(
            client.create(&payload("a")),
            Err(SyncError::RemoteValidation { .. })
        ));
        assert!(client.create(&payload("b")).is_ok());
        assert!(client.delete("remote-9").unwrap_err().is_retryable());
        assert_eq!(client.call_count(), 3);
    }

    #[test]
    fn mock_fail_all_and_clear() {
        let client = MockResourceClient::new();
        client.fail_all(MockFailure::Auth);
        assert!(client.update("remote-1", &payload("a")).unwrap_err().is_systemic());

        client.clear_failures();
        assert_eq!(
            client.update("remote-1", &payload("a")).unwrap(),
            UpdateOutcome::Applied
        );
        assert_eq!(client.update_count(), 2);
    }

    #[test]
    fn mock_partial_update() {
        let client = MockResourceClient::new();
        client.partially_update("remote-3", &["filter"]);
        let outcome = client.update("remote-3", &payload("a")).unwrap();
        assert!(outcome.is_partial());
    }
}
