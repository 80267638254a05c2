//! Reconciliation engine.
//!
//! Per entity the engine moves between two states: UNSYNCED (no mapping)
//! and SYNCED (mapping to a live remote resource).
//!
//! - UNSYNCED → SYNCED on a confirmed create
//! - SYNCED → SYNCED on update, whether the update succeeds or fails
//! - SYNCED → UNSYNCED on a confirmed delete
//!
//! The mapping is the only retained state; payloads are rebuilt from the
//! current entity on every call.

use crate::client::RemoteResourceClient;
use crate::config::SyncConfiguration;
use crate::error::{SyncError, SyncResult};
use crate::keyed_lock::KeyedLocks;
use crate::payload::build_remote_payload;
use crate::provider::LocalEntityProvider;
use crate::store::SyncStateStore;
use catsync_protocol::{
    ChangeKind, EntityEvent, LocalEntity, OperationKind, SyncDomain, SyncOperation, UpdateOutcome,
};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Cumulative statistics about reconciliation.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Confirmed remote creates.
    pub creates: u64,
    /// Accepted remote updates, including partial ones.
    pub updates: u64,
    /// Updates where the remote rejected some fields.
    pub partial_updates: u64,
    /// Confirmed remote deletes.
    pub deletes: u64,
    /// Failed reconciliations.
    pub failures: u64,
    /// `sync_all` runs that processed every entity.
    pub batches_completed: u64,
    /// `sync_all` runs stopped early by cancellation or a systemic failure.
    pub batches_aborted: u64,
    /// When the last `sync_all` finished.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// A per-entity failure recorded in a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityFailure {
    /// Local entity ID.
    pub local_id: String,
    /// Error message.
    pub error: String,
    /// Whether retrying may succeed.
    pub retryable: bool,
}

impl EntityFailure {
    fn new(local_id: &str, error: &SyncError) -> Self {
        Self {
            local_id: local_id.to_string(),
            error: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Result of a `sync_all` run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncAllReport {
    /// Domain that was synced.
    pub domain: SyncDomain,
    /// False if the domain was disabled and nothing was enumerated.
    pub enabled: bool,
    /// Entities a reconciliation was attempted for.
    pub attempted: usize,
    /// Successful operations, in processing order.
    pub operations: Vec<SyncOperation>,
    /// Updates where the remote rejected some fields.
    pub partially_updated: usize,
    /// Failed entities, in processing order.
    pub failures: Vec<EntityFailure>,
    /// Why the batch stopped early, if it did.
    pub aborted: Option<String>,
    /// Wall time of the run.
    pub duration: Duration,
}

impl SyncAllReport {
    fn new(domain: SyncDomain) -> Self {
        Self {
            domain,
            enabled: true,
            attempted: 0,
            operations: Vec::new(),
            partially_updated: 0,
            failures: Vec::new(),
            aborted: None,
            duration: Duration::ZERO,
        }
    }

    /// Number of remote resources created.
    pub fn created(&self) -> usize {
        self.count(OperationKind::Create)
    }

    /// Number of remote resources updated.
    pub fn updated(&self) -> usize {
        self.count(OperationKind::Update)
    }

    /// Returns true if every entity was processed without failure.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && self.failures.is_empty()
    }

    fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind == kind).count()
    }
}

/// Result of an orphan cleanup run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// Deleted remote resources.
    pub deleted: Vec<SyncOperation>,
    /// Mappings whose delete failed; they are kept for the next run.
    pub failures: Vec<EntityFailure>,
    /// Why the run stopped early, if it did.
    pub aborted: Option<String>,
}

/// An upsert that went through.
struct Applied {
    operation: SyncOperation,
    partial: bool,
}

/// Mirrors local entities of one domain into remote resources.
///
/// Collaborators are injected at construction. All handlers take `&self`;
/// reconciliations of the same local ID are serialized internally, so the
/// engine may be shared across threads.
pub struct ReconciliationEngine<C, P, S>
where
    C: RemoteResourceClient,
    P: LocalEntityProvider,
    S: SyncStateStore,
{
    domain: SyncDomain,
    client: C,
    provider: P,
    store: S,
    configuration: RwLock<SyncConfiguration>,
    stats: RwLock<SyncStats>,
    locks: KeyedLocks,
    cancelled: AtomicBool,
}

impl<C, P, S> ReconciliationEngine<C, P, S>
where
    C: RemoteResourceClient,
    P: LocalEntityProvider,
    S: SyncStateStore,
{
    /// Creates a new engine for a domain.
    pub fn new(
        domain: SyncDomain,
        configuration: SyncConfiguration,
        client: C,
        provider: P,
        store: S,
    ) -> Self {
        Self {
            domain,
            client,
            provider,
            store,
            configuration: RwLock::new(configuration),
            stats: RwLock::new(SyncStats::default()),
            locks: KeyedLocks::new(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Returns the engine's domain.
    pub fn domain(&self) -> &SyncDomain {
        &self.domain
    }

    /// Returns the remote client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the entity provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the state store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Gets the current configuration.
    pub fn configuration(&self) -> SyncConfiguration {
        self.configuration.read().clone()
    }

    /// Replaces the configuration.
    pub fn set_configuration(&self, configuration: SyncConfiguration) {
        *self.configuration.write() = configuration;
    }

    /// Returns true if sync is enabled for this engine's domain.
    pub fn is_enabled(&self) -> bool {
        self.configuration.read().is_sync_enabled(&self.domain)
    }

    /// Asks `sync_all` to stop after the current entity.
    ///
    /// The request stays pending until a batch observes it, so a cancel
    /// issued just before `sync_all` starts stops that batch before its
    /// first entity. Use [`reset_cancel`](Self::reset_cancel) to withdraw it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancelled flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Reconciles a created or updated entity.
    ///
    /// Creates the remote resource if the entity has no mapping, otherwise
    /// updates it. A mapping is written only after a confirmed create.
    ///
    /// # Errors
    ///
    /// Returns the remote or store error. A failed create leaves no
    /// mapping; a failed update leaves the mapping untouched.
    pub fn on_entity_created_or_updated(&self, entity: &LocalEntity) -> SyncResult<SyncOperation> {
        if !self.is_enabled() {
            debug!(domain = %self.domain, local_id = %entity.id, "sync disabled, skipping");
            return Ok(SyncOperation::skip(&entity.id));
        }

        self.exclusive(&entity.id, || self.upsert(entity))
            .map(|applied| applied.operation)
            .inspect_err(|e| self.record_failure(&entity.id, e))
    }

    /// Reconciles a deleted entity.
    ///
    /// # Errors
    ///
    /// Returns the remote or store error; the mapping is kept on failure.
    pub fn on_entity_deleted(&self, entity: &LocalEntity) -> SyncResult<SyncOperation> {
        self.on_entity_id_deleted(&entity.id)
    }

    /// Reconciles a deleted entity known only by ID.
    ///
    /// Without a mapping there is nothing to delete and no remote call is
    /// made. The engine never schedules retries; see
    /// [`cleanup_orphans`](Self::cleanup_orphans).
    ///
    /// # Errors
    ///
    /// Returns the remote or store error; the mapping is kept on failure.
    pub fn on_entity_id_deleted(&self, local_id: &str) -> SyncResult<SyncOperation> {
        if !self.is_enabled() {
            debug!(domain = %self.domain, local_id, "sync disabled, skipping");
            return Ok(SyncOperation::skip(local_id));
        }

        self.exclusive(local_id, || self.delete_mapped(local_id))
            .inspect_err(|e| self.record_failure(local_id, e))
    }

    /// Handles a lifecycle event from the host.
    ///
    /// Created and updated events are resolved through the provider. An
    /// entity that no longer exists locally is skipped: it was deleted
    /// between the event and its processing, and its delete event follows.
    ///
    /// # Errors
    ///
    /// Returns provider, remote, or store errors.
    pub fn handle_event(&self, event: &EntityEvent) -> SyncResult<SyncOperation> {
        if event.domain != self.domain {
            debug!(domain = %self.domain, event_domain = %event.domain, "event for another domain");
            return Ok(SyncOperation::skip(&event.entity_id));
        }
        if !self.is_enabled() {
            debug!(domain = %self.domain, local_id = %event.entity_id, "sync disabled, skipping");
            return Ok(SyncOperation::skip(&event.entity_id));
        }

        match event.kind {
            ChangeKind::Created | ChangeKind::Updated => {
                let resolved = self
                    .provider
                    .get_by_id(&event.entity_id)
                    .inspect_err(|e| self.record_failure(&event.entity_id, e))?;
                match resolved {
                    Some(entity) => self.on_entity_created_or_updated(&entity),
                    None => {
                        debug!(
                            domain = %self.domain,
                            local_id = %event.entity_id,
                            kind = %event.kind,
                            "entity not found locally, skipping"
                        );
                        Ok(SyncOperation::skip(&event.entity_id))
                    }
                }
            }
            ChangeKind::Deleted => self.on_entity_id_deleted(&event.entity_id),
        }
    }

    /// Reconciles every entity the provider lists.
    ///
    /// Entities are processed one at a time. A failing entity is recorded
    /// and the batch moves on, except for authentication failures, which
    /// stop the batch because every later call would fail the same way.
    ///
    /// # Errors
    ///
    /// Returns an error only if the entities cannot be enumerated.
    pub fn sync_all(&self) -> SyncResult<SyncAllReport> {
        let result = self.run_batch();
        // A pending cancel is consumed by the batch that saw it.
        self.reset_cancel();
        result
    }

    fn run_batch(&self) -> SyncResult<SyncAllReport> {
        let start = Instant::now();
        let mut report = SyncAllReport::new(self.domain.clone());
        if !self.is_enabled() {
            debug!(domain = %self.domain, "sync disabled, skipping full sync");
            report.enabled = false;
            return Ok(report);
        }

        let entities = self
            .provider
            .list_entities()
            .inspect_err(|e| self.record_error(e))?;
        info!(domain = %self.domain, count = entities.len(), "starting full sync");

        for entity in &entities {
            if self.cancelled.load(Ordering::SeqCst) {
                warn!(domain = %self.domain, "full sync cancelled");
                report.aborted = Some(SyncError::Cancelled.to_string());
                break;
            }

            report.attempted += 1;
            match self.exclusive(&entity.id, || self.upsert(entity)) {
                Ok(applied) => {
                    if applied.partial {
                        report.partially_updated += 1;
                    }
                    report.operations.push(applied.operation);
                }
                Err(e) => {
                    self.record_failure(&entity.id, &e);
                    report.failures.push(EntityFailure::new(&entity.id, &e));
                    if e.is_systemic() {
                        error!(
                            domain = %self.domain,
                            local_id = %entity.id,
                            error = %e,
                            "systemic failure, aborting remaining entities"
                        );
                        report.aborted = Some(e.to_string());
                        break;
                    }
                }
            }
        }

        report.duration = start.elapsed();
        {
            let mut stats = self.stats.write();
            if report.aborted.is_some() {
                stats.batches_aborted += 1;
            } else {
                stats.batches_completed += 1;
            }
            stats.last_sync_time = Some(Instant::now());
        }

        info!(
            domain = %self.domain,
            created = report.created(),
            updated = report.updated(),
            failed = report.failures.len(),
            aborted = report.aborted.is_some(),
            "full sync finished"
        );
        Ok(report)
    }

    /// Computes what the create-or-update path would do, without remote calls.
    ///
    /// # Errors
    ///
    /// Returns store errors.
    pub fn plan(&self, entity: &LocalEntity) -> SyncResult<SyncOperation> {
        if !self.is_enabled() {
            return Ok(SyncOperation::skip(&entity.id));
        }

        Ok(match self.store.get(&entity.id)? {
            None => SyncOperation::new(OperationKind::Create, &entity.id, None),
            Some(remote_id) => SyncOperation::new(OperationKind::Update, &entity.id, Some(remote_id)),
        })
    }

    /// Plans every entity the provider lists. Empty when disabled.
    ///
    /// # Errors
    ///
    /// Returns provider or store errors.
    pub fn plan_all(&self) -> SyncResult<Vec<SyncOperation>> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }

        self.provider
            .list_entities()?
            .iter()
            .map(|entity| self.plan(entity))
            .collect()
    }

    /// Deletes remote resources whose local entity no longer exists.
    ///
    /// This is the retry path for deletes that failed earlier: their
    /// mappings were kept, so they show up here.
    ///
    /// # Errors
    ///
    /// Returns an error only if the mappings cannot be listed or an entity
    /// lookup fails.
    pub fn cleanup_orphans(&self) -> SyncResult<CleanupReport> {
        let mut report = CleanupReport::default();
        if !self.is_enabled() {
            debug!(domain = %self.domain, "sync disabled, skipping cleanup");
            return Ok(report);
        }

        for mapping in self.store.entries()? {
            if self.provider.get_by_id(&mapping.local_id)?.is_some() {
                continue;
            }

            match self.exclusive(&mapping.local_id, || self.delete_mapped(&mapping.local_id)) {
                Ok(op) if op.is_skip() => {}
                Ok(op) => report.deleted.push(op),
                Err(e) => {
                    self.record_failure(&mapping.local_id, &e);
                    report.failures.push(EntityFailure::new(&mapping.local_id, &e));
                    if e.is_systemic() {
                        report.aborted = Some(e.to_string());
                        break;
                    }
                }
            }
        }

        info!(
            domain = %self.domain,
            deleted = report.deleted.len(),
            failed = report.failures.len(),
            "orphan cleanup finished"
        );
        Ok(report)
    }

    fn upsert(&self, entity: &LocalEntity) -> SyncResult<Applied> {
        let payload = build_remote_payload(entity);

        match self.store.get(&entity.id)? {
            None => {
                let remote_id = self.client.create(&payload)?;
                if let Err(e) = self.store.put(&entity.id, &remote_id) {
                    error!(
                        domain = %self.domain,
                        local_id = %entity.id,
                        remote_id = %remote_id,
                        error = %e,
                        "remote resource created but mapping not stored"
                    );
                    return Err(e);
                }

                info!(domain = %self.domain, local_id = %entity.id, remote_id = %remote_id, "created remote resource");
                self.stats.write().creates += 1;
                Ok(Applied {
                    operation: SyncOperation::new(OperationKind::Create, &entity.id, Some(remote_id)),
                    partial: false,
                })
            }
            Some(remote_id) => {
                let outcome = self.client.update(&remote_id, &payload)?;
                let partial = match &outcome {
                    UpdateOutcome::Applied => {
                        debug!(domain = %self.domain, local_id = %entity.id, remote_id = %remote_id, "updated remote resource");
                        false
                    }
                    UpdateOutcome::Partial { failed_fields, .. } => {
                        warn!(
                            domain = %self.domain,
                            local_id = %entity.id,
                            remote_id = %remote_id,
                            failed_fields = ?failed_fields,
                            "remote rejected some fields"
                        );
                        true
                    }
                };

                {
                    let mut stats = self.stats.write();
                    stats.updates += 1;
                    if partial {
                        stats.partial_updates += 1;
                    }
                }
                Ok(Applied {
                    operation: SyncOperation::new(OperationKind::Update, &entity.id, Some(remote_id)),
                    partial,
                })
            }
        }
    }

    fn delete_mapped(&self, local_id: &str) -> SyncResult<SyncOperation> {
        let Some(remote_id) = self.store.get(local_id)? else {
            debug!(domain = %self.domain, local_id, "no mapping, nothing to delete");
            return Ok(SyncOperation::skip(local_id));
        };

        self.client.delete(&remote_id)?;
        if let Err(e) = self.store.remove(local_id) {
            error!(
                domain = %self.domain,
                local_id,
                remote_id = %remote_id,
                error = %e,
                "remote resource deleted but mapping not removed"
            );
            return Err(e);
        }

        info!(domain = %self.domain, local_id, remote_id = %remote_id, "deleted remote resource");
        self.stats.write().deletes += 1;
        Ok(SyncOperation::new(OperationKind::Delete, local_id, Some(remote_id)))
    }

    fn exclusive<T>(&self, local_id: &str, work: impl FnOnce() -> T) -> T {
        let result = {
            let _guard = self.locks.lock(local_id);
            work()
        };
        self.locks.release(local_id);
        result
    }

    fn record_failure(&self, local_id: &str, error: &SyncError) {
        warn!(domain = %self.domain, local_id, error = %error, "reconciliation failed");
        self.stats.write().failures += 1;
        self.record_error(error);
    }

    fn record_error(&self, error: &SyncError) {
        self.stats.write().last_error = Some(error.to_string());
    }
}
