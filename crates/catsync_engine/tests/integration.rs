//! Integration tests for the reconciliation engine.

use catsync_engine::{
    ClientConfig, EventDispatcher, FileStateStore, HttpClient, HttpMethod, HttpRequest,
    HttpResourceClient, HttpResponse, LocalEntityProvider, MemoryEntityProvider,
    MemoryStateStore, MockFailure, MockResourceClient, ReconciliationEngine, RecordedCall,
    RemoteResourceClient, RetryConfig, SyncConfiguration, SyncError, SyncResult, SyncStateStore,
};
use catsync_protocol::{
    ChangeKind, EntityEvent, LocalEntity, OperationKind, RemotePayload, RemoteResourceMapping,
    SyncDomain, SyncOperation, UpdateOutcome,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

type MockEngine = ReconciliationEngine<MockResourceClient, MemoryEntityProvider, MemoryStateStore>;

fn sets() -> SyncDomain {
    SyncDomain::product_sets()
}

fn category(id: &str) -> LocalEntity {
    LocalEntity::new(id, format!("Category {id}"))
}

fn engine(entities: Vec<LocalEntity>, configuration: SyncConfiguration) -> MockEngine {
    ReconciliationEngine::new(
        sets(),
        configuration,
        MockResourceClient::new(),
        MemoryEntityProvider::with_entities(entities),
        MemoryStateStore::new(),
    )
}

fn enabled_engine(entities: Vec<LocalEntity>) -> MockEngine {
    engine(entities, SyncConfiguration::enabled_for(sets()))
}

#[test]
fn create_is_idempotent() {
    let engine = enabled_engine(vec![]);
    let entity = category("1");

    engine.on_entity_created_or_updated(&entity).unwrap();
    engine.on_entity_created_or_updated(&entity).unwrap();

    assert_eq!(engine.client().create_count(), 1);
    assert_eq!(engine.client().update_count(), 1);
    assert_eq!(engine.store().get("1").unwrap(), Some("remote-1".into()));
    assert_eq!(engine.store().len(), 1);
}

#[test]
fn update_uses_current_entity_state() {
    let engine = enabled_engine(vec![]);
    engine
        .on_entity_created_or_updated(&LocalEntity::new("1", "Hats"))
        .unwrap();
    engine
        .on_entity_created_or_updated(&LocalEntity::new("1", "Caps").with_description("renamed"))
        .unwrap();

    match engine.client().calls().last() {
        Some(RecordedCall::Update { remote_id, payload }) => {
            assert_eq!(remote_id, "remote-1");
            assert_eq!(payload.name, "Caps");
            assert_eq!(payload.retailer_id, "1");
            assert!(payload.filter.contains("Caps"));
            assert_eq!(payload.metadata.as_deref(), Some(r#"{"description":"renamed"}"#));
        }
        other => panic!("expected update, got {other:?}"),
    }
}

#[test]
fn disabled_domain_touches_nothing() {
    let engine = engine(
        vec![category("1"), category("2")],
        SyncConfiguration::new().disable(sets()),
    );

    assert!(engine.on_entity_created_or_updated(&category("1")).unwrap().is_skip());
    assert!(engine.on_entity_deleted(&category("1")).unwrap().is_skip());
    assert!(engine
        .handle_event(&EntityEvent::new(sets(), "2", ChangeKind::Updated))
        .unwrap()
        .is_skip());

    let report = engine.sync_all().unwrap();
    assert!(!report.enabled);
    assert_eq!(report.attempted, 0);

    let cleanup = engine.cleanup_orphans().unwrap();
    assert!(cleanup.deleted.is_empty());

    assert_eq!(engine.client().call_count(), 0);
    assert_eq!(engine.store().reads(), 0);
    assert_eq!(engine.store().writes(), 0);
}

#[test]
fn unknown_domain_is_disabled() {
    let engine = engine(vec![category("1")], SyncConfiguration::enabled_for(SyncDomain::product_feeds()));
    assert!(!engine.is_enabled());
    assert!(engine.on_entity_created_or_updated(&category("1")).unwrap().is_skip());
    assert_eq!(engine.client().call_count(), 0);
}

#[test]
fn delete_without_mapping_is_noop() {
    let engine = enabled_engine(vec![]);

    let op = engine.on_entity_deleted(&category("9")).unwrap();
    assert_eq!(op, SyncOperation::skip("9"));
    assert_eq!(engine.client().call_count(), 0);
    assert_eq!(engine.store().writes(), 0);
}

#[test]
fn delete_removes_mapping() {
    let engine = enabled_engine(vec![]);
    engine.on_entity_created_or_updated(&category("1")).unwrap();

    let op = engine.on_entity_deleted(&category("1")).unwrap();
    assert_eq!(op.kind, OperationKind::Delete);
    assert_eq!(op.remote_id.as_deref(), Some("remote-1"));
    assert_eq!(engine.store().get("1").unwrap(), None);
    assert_eq!(engine.stats().deletes, 1);
}

#[test]
fn recreate_after_delete_gets_new_remote_id() {
    let engine = enabled_engine(vec![]);
    engine.on_entity_created_or_updated(&category("1")).unwrap();
    engine.on_entity_deleted(&category("1")).unwrap();

    let op = engine.on_entity_created_or_updated(&category("1")).unwrap();
    assert_eq!(op.kind, OperationKind::Create);
    assert_eq!(op.remote_id.as_deref(), Some("remote-2"));
}

#[test]
fn failed_create_leaves_no_mapping() {
    let engine = enabled_engine(vec![]);
    engine.client().fail_create("1", MockFailure::Transient);

    let err = engine.on_entity_created_or_updated(&category("1")).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(engine.store().get("1").unwrap(), None);

    // a later event is a fresh create
    engine.client().clear_failures();
    let op = engine.on_entity_created_or_updated(&category("1")).unwrap();
    assert_eq!(op.kind, OperationKind::Create);
    assert_eq!(engine.client().create_count(), 2);
}

#[test]
fn malformed_create_response_is_failure() {
    let engine = enabled_engine(vec![]);
    engine.client().fail_create("1", MockFailure::Malformed);

    assert!(matches!(
        engine.on_entity_created_or_updated(&category("1")),
        Err(SyncError::MalformedResponse(_))
    ));
    assert!(engine.store().is_empty());
}

#[test]
fn failed_delete_preserves_mapping() {
    let engine = enabled_engine(vec![]);
    engine.on_entity_created_or_updated(&category("1")).unwrap();
    engine.client().fail_delete("remote-1", MockFailure::Transient);

    assert!(engine.on_entity_deleted(&category("1")).is_err());
    assert_eq!(engine.store().get("1").unwrap(), Some("remote-1".into()));
}

#[test]
fn cleanup_retries_failed_deletes() {
    let engine = enabled_engine(vec![category("1"), category("2")]);
    engine.sync_all().unwrap();

    // entity 1 is removed locally but its remote delete fails
    engine.provider().remove("1");
    engine.client().fail_delete("remote-1", MockFailure::Transient);
    assert!(engine.on_entity_id_deleted("1").is_err());

    let first = engine.cleanup_orphans().unwrap();
    assert!(first.deleted.is_empty());
    assert_eq!(first.failures.len(), 1);
    assert!(first.failures[0].retryable);

    engine.client().clear_failures();
    let second = engine.cleanup_orphans().unwrap();
    assert_eq!(
        second.deleted,
        vec![SyncOperation::new(OperationKind::Delete, "1", Some("remote-1".into()))]
    );
    assert_eq!(
        engine.store().entries().unwrap(),
        vec![RemoteResourceMapping::new("2", "remote-2")]
    );
}

#[test]
fn sync_all_isolates_failures() {
    let engine = enabled_engine(vec![category("A"), category("B"), category("C")]);
    engine.client().fail_create("B", MockFailure::Validation);

    let report = engine.sync_all().unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.created(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].local_id, "B");
    assert!(!report.failures[0].retryable);
    assert!(report.aborted.is_none());
    assert!(!report.is_complete());

    assert!(engine.store().get("A").unwrap().is_some());
    assert!(engine.store().get("B").unwrap().is_none());
    assert!(engine.store().get("C").unwrap().is_some());
    assert_eq!(engine.client().created_retailer_ids(), vec!["A", "B", "C"]);
}

#[test]
fn sync_all_second_run_updates() {
    let engine = enabled_engine(vec![category("A"), category("B")]);
    engine.sync_all().unwrap();

    let report = engine.sync_all().unwrap();
    assert_eq!(report.created(), 0);
    assert_eq!(report.updated(), 2);
    assert!(report.is_complete());
    assert_eq!(engine.stats().batches_completed, 2);
}

#[test]
fn auth_failure_aborts_sync_all() {
    let engine = enabled_engine(vec![category("A"), category("B"), category("C")]);
    engine.client().fail_create("B", MockFailure::Auth);

    let report = engine.sync_all().unwrap();
    assert_eq!(report.attempted, 2);
    assert!(report.aborted.is_some());
    assert_eq!(engine.client().created_retailer_ids(), vec!["A", "B"]);
    assert!(engine.store().get("C").unwrap().is_none());
}

#[test]
fn partial_update_keeps_mapping() {
    let engine = enabled_engine(vec![category("1")]);
    engine.on_entity_created_or_updated(&category("1")).unwrap();
    engine.client().partially_update("remote-1", &["filter"]);

    let report = engine.sync_all().unwrap();
    assert_eq!(report.updated(), 1);
    assert_eq!(report.partially_updated, 1);
    assert!(report.failures.is_empty());
    assert_eq!(engine.store().get("1").unwrap(), Some("remote-1".into()));
}

#[test]
fn events_follow_provider_state() {
    let engine = enabled_engine(vec![category("1")]);

    let created = engine
        .handle_event(&EntityEvent::new(sets(), "1", ChangeKind::Created))
        .unwrap();
    assert_eq!(created.kind, OperationKind::Create);

    let missing = engine
        .handle_event(&EntityEvent::new(sets(), "2", ChangeKind::Created))
        .unwrap();
    assert!(missing.is_skip());

    let deleted = engine
        .handle_event(&EntityEvent::new(sets(), "1", ChangeKind::Deleted))
        .unwrap();
    assert_eq!(deleted.kind, OperationKind::Delete);
    assert!(engine.store().is_empty());
}

#[test]
fn concurrent_events_for_one_entity_create_once() {
    let engine = Arc::new(enabled_engine(vec![]));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.on_entity_created_or_updated(&category("1")).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.client().create_count(), 1);
    assert_eq!(engine.client().update_count(), 7);
    assert_eq!(engine.store().len(), 1);
}

#[test]
fn dispatcher_routes_to_engine() {
    let engine = Arc::new(enabled_engine(vec![category("1")]));
    let dispatcher = EventDispatcher::new();
    dispatcher.register(engine.clone());

    dispatcher
        .dispatch(&EntityEvent::new(sets(), "1", ChangeKind::Updated))
        .unwrap();
    assert_eq!(engine.store().get("1").unwrap(), Some("remote-1".into()));
}

/// A store whose writes always fail.
#[derive(Default)]
struct ReadOnlyStore;

impl SyncStateStore for ReadOnlyStore {
    fn get(&self, _local_id: &str) -> SyncResult<Option<String>> {
        Ok(None)
    }

    fn put(&self, _local_id: &str, _remote_id: &str) -> SyncResult<()> {
        Err(SyncError::Store {
            path: "/read-only".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn remove(&self, _local_id: &str) -> SyncResult<()> {
        Ok(())
    }

    fn entries(&self) -> SyncResult<Vec<RemoteResourceMapping>> {
        Ok(Vec::new())
    }
}

#[test]
fn store_failure_after_create_is_reported() {
    let engine = ReconciliationEngine::new(
        sets(),
        SyncConfiguration::enabled_for(sets()),
        MockResourceClient::new(),
        MemoryEntityProvider::new(),
        ReadOnlyStore,
    );

    let err = engine.on_entity_created_or_updated(&category("1")).unwrap_err();
    assert!(matches!(err, SyncError::Store { .. }));
    assert_eq!(engine.client().create_count(), 1);
    assert_eq!(engine.stats().creates, 0);
    assert_eq!(engine.stats().failures, 1);
}

/// A provider that cannot enumerate.
struct BrokenProvider;

impl LocalEntityProvider for BrokenProvider {
    fn list_entities(&self) -> SyncResult<Vec<LocalEntity>> {
        Err(SyncError::Provider("database unavailable".into()))
    }

    fn get_by_id(&self, _id: &str) -> SyncResult<Option<LocalEntity>> {
        Err(SyncError::Provider("database unavailable".into()))
    }
}

#[test]
fn enumeration_failure_fails_sync_all() {
    let engine = ReconciliationEngine::new(
        sets(),
        SyncConfiguration::enabled_for(sets()),
        MockResourceClient::new(),
        BrokenProvider,
        MemoryStateStore::new(),
    );

    assert!(matches!(engine.sync_all(), Err(SyncError::Provider(_))));
    assert_eq!(engine.client().call_count(), 0);
}

#[test]
fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let entities = vec![category("1"), category("2")];

    {
        let engine = ReconciliationEngine::new(
            sets(),
            SyncConfiguration::enabled_for(sets()),
            MockResourceClient::new(),
            MemoryEntityProvider::with_entities(entities.clone()),
            FileStateStore::open(dir.path(), sets()).unwrap(),
        );
        assert_eq!(engine.sync_all().unwrap().created(), 2);
    }

    let engine = ReconciliationEngine::new(
        sets(),
        SyncConfiguration::enabled_for(sets()),
        MockResourceClient::new(),
        MemoryEntityProvider::with_entities(entities),
        FileStateStore::open(dir.path(), sets()).unwrap(),
    );
    let report = engine.sync_all().unwrap();
    assert_eq!(report.created(), 0);
    assert_eq!(report.updated(), 2);
    assert_eq!(engine.client().create_count(), 0);
}

/// HTTP client answering from a script.
struct ScriptedHttp {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<(HttpMethod, String)>>,
}

impl ScriptedHttp {
    fn new(responses: &[(u16, &str)]) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .iter()
                    .map(|(status, body)| HttpResponse::new(*status, *body))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl HttpClient for ScriptedHttp {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        self.requests
            .lock()
            .push((request.method, request.url.clone()));
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| "no response scripted".to_string())
    }
}

#[test]
fn http_lifecycle() {
    let http = ScriptedHttp::new(&[
        (200, r#"{"id": "555"}"#),
        (200, r#"{"success": true}"#),
        (500, r#"{"error": {"message": "try again", "code": 2, "is_transient": true}}"#),
        (200, r#"{"success": true}"#),
    ]);
    let config = ClientConfig::new("cat-1", "token")
        .with_base_url("https://graph.example.com")
        .with_retry(
            RetryConfig::new(2)
                .with_initial_delay(Duration::from_millis(1))
                .without_jitter(),
        );
    let engine = ReconciliationEngine::new(
        sets(),
        SyncConfiguration::enabled_for(sets()),
        HttpResourceClient::new(config, http),
        MemoryEntityProvider::new(),
        MemoryStateStore::new(),
    );

    let created = engine.on_entity_created_or_updated(&category("42")).unwrap();
    assert_eq!(created.remote_id.as_deref(), Some("555"));

    engine.on_entity_created_or_updated(&category("42")).unwrap();
    let deleted = engine.on_entity_deleted(&category("42")).unwrap();
    assert_eq!(deleted.kind, OperationKind::Delete);
    assert!(engine.store().is_empty());

    let requests = engine.client().http().requests.lock().clone();
    assert_eq!(
        requests,
        vec![
            (HttpMethod::Post, "https://graph.example.com/v20.0/cat-1/product_sets".to_string()),
            (HttpMethod::Post, "https://graph.example.com/v20.0/555".to_string()),
            (
                HttpMethod::Delete,
                "https://graph.example.com/v20.0/555?allow_live_product_set_deletion=true".to_string()
            ),
            (
                HttpMethod::Delete,
                "https://graph.example.com/v20.0/555?allow_live_product_set_deletion=true".to_string()
            ),
        ]
    );
}

#[test]
fn http_rejected_create_stores_nothing() {
    let http = ScriptedHttp::new(&[(
        400,
        r#"{"error": {"message": "Invalid parameter", "type": "OAuthException", "code": 100}}"#,
    )]);
    let engine = ReconciliationEngine::new(
        sets(),
        SyncConfiguration::enabled_for(sets()),
        HttpResourceClient::new(ClientConfig::new("cat-1", "token"), http),
        MemoryEntityProvider::new(),
        MemoryStateStore::new(),
    );

    let err = engine.on_entity_created_or_updated(&category("42")).unwrap_err();
    assert!(matches!(err, SyncError::RemoteValidation { code: Some(100), .. }));
    assert!(engine.store().is_empty());
}

/// Client that asks its engine to stop while the first create is in flight.
#[derive(Default)]
struct CancellingClient {
    inner: MockResourceClient,
    engine: OnceLock<Weak<CancellingEngine>>,
}

type CancellingEngine =
    ReconciliationEngine<CancellingClient, MemoryEntityProvider, MemoryStateStore>;

impl RemoteResourceClient for CancellingClient {
    fn create(&self, payload: &RemotePayload) -> SyncResult<String> {
        if let Some(engine) = self.engine.get().and_then(Weak::upgrade) {
            engine.cancel();
        }
        self.inner.create(payload)
    }

    fn update(&self, remote_id: &str, payload: &RemotePayload) -> SyncResult<UpdateOutcome> {
        self.inner.update(remote_id, payload)
    }

    fn delete(&self, remote_id: &str) -> SyncResult<()> {
        self.inner.delete(remote_id)
    }
}

#[test]
fn cancel_stops_sync_all_between_entities() {
    let engine = Arc::new(ReconciliationEngine::new(
        sets(),
        SyncConfiguration::enabled_for(sets()),
        CancellingClient::default(),
        MemoryEntityProvider::with_entities(vec![category("A"), category("B"), category("C")]),
        MemoryStateStore::new(),
    ));
    engine
        .client()
        .engine
        .set(Arc::downgrade(&engine))
        .unwrap_or_else(|_| panic!("engine already wired"));

    let report = engine.sync_all().unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.created(), 1);
    assert_eq!(report.aborted.as_deref(), Some("sync cancelled"));
    assert_eq!(engine.client().inner.created_retailer_ids(), vec!["A"]);
    assert_eq!(engine.store().len(), 1);
    assert_eq!(engine.stats().batches_aborted, 1);
    assert_eq!(engine.stats().batches_completed, 0);
}

#[test]
fn auth_failure_aborts_cleanup() {
    let engine = enabled_engine(vec![category("1"), category("2")]);
    engine.sync_all().unwrap();
    engine.provider().remove("1");
    engine.provider().remove("2");
    engine.client().fail_delete("remote-1", MockFailure::Auth);
    engine.client().fail_delete("remote-2", MockFailure::Auth);

    let report = engine.cleanup_orphans().unwrap();
    assert!(report.deleted.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert!(report.aborted.is_some());
    assert_eq!(engine.client().delete_count(), 1);
    assert_eq!(engine.store().len(), 2);
}

#[test]
fn http_rejected_update_is_a_failure() {
    let http = ScriptedHttp::new(&[(
        200,
        r#"{"success": false, "updated_fields": [], "failed_fields": ["name", "filter", "retailer_id"]}"#,
    )]);
    let engine = ReconciliationEngine::new(
        sets(),
        SyncConfiguration::enabled_for(sets()),
        HttpResourceClient::new(ClientConfig::new("cat-1", "token"), http),
        MemoryEntityProvider::with_entities(vec![category("42")]),
        MemoryStateStore::with_mappings([("42", "555")]),
    );

    let report = engine.sync_all().unwrap();
    assert_eq!(report.updated(), 0);
    assert_eq!(report.partially_updated, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].local_id, "42");

    let stats = engine.stats();
    assert_eq!(stats.updates, 0);
    assert_eq!(stats.failures, 1);
    assert_eq!(engine.store().get("42").unwrap(), Some("555".into()));
}
