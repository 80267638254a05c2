//! Routing of host lifecycle events to per-domain engines.

use crate::client::RemoteResourceClient;
use crate::engine::ReconciliationEngine;
use crate::error::SyncResult;
use crate::provider::LocalEntityProvider;
use crate::store::SyncStateStore;
use catsync_protocol::{EntityEvent, SyncDomain, SyncOperation};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Something that reconciles events for one domain.
pub trait EntityEventHandler: Send + Sync {
    /// The domain this handler owns.
    fn domain(&self) -> &SyncDomain;

    /// Handles one event.
    fn handle(&self, event: &EntityEvent) -> SyncResult<SyncOperation>;
}

impl<C, P, S> EntityEventHandler for ReconciliationEngine<C, P, S>
where
    C: RemoteResourceClient,
    P: LocalEntityProvider,
    S: SyncStateStore,
{
    fn domain(&self) -> &SyncDomain {
        ReconciliationEngine::domain(self)
    }

    fn handle(&self, event: &EntityEvent) -> SyncResult<SyncOperation> {
        self.handle_event(event)
    }
}

/// Routes events to the handler registered for their domain.
///
/// Events are handled on the calling thread, in the order they are
/// dispatched. Events for domains without a handler are skipped.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<SyncDomain, Arc<dyn EntityEventHandler>>>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for its domain, returning the one it replaces.
    pub fn register(
        &self,
        handler: Arc<dyn EntityEventHandler>,
    ) -> Option<Arc<dyn EntityEventHandler>> {
        let domain = handler.domain().clone();
        debug!(domain = %domain, "registering event handler");
        self.handlers.write().insert(domain, handler)
    }

    /// Removes the handler for a domain.
    pub fn unregister(&self, domain: &SyncDomain) -> bool {
        self.handlers.write().remove(domain).is_some()
    }

    /// Returns true if a handler is registered for the domain.
    pub fn is_registered(&self, domain: &SyncDomain) -> bool {
        self.handlers.read().contains_key(domain)
    }

    /// Registered domains, sorted.
    pub fn domains(&self) -> Vec<SyncDomain> {
        let mut domains: Vec<_> = self.handlers.read().keys().cloned().collect();
        domains.sort();
        domains
    }

    /// Dispatches one event.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns.
    pub fn dispatch(&self, event: &EntityEvent) -> SyncResult<SyncOperation> {
        // Clone the handler out so the registry is not locked during remote calls.
        let handler = self.handlers.read().get(&event.domain).cloned();
        match handler {
            Some(handler) => handler.handle(event),
            None => {
                debug!(domain = %event.domain, local_id = %event.entity_id, "no handler registered, skipping");
                Ok(SyncOperation::skip(&event.entity_id))
            }
        }
    }

    /// Dispatches events in order, collecting one result per event.
    pub fn dispatch_all(&self, events: &[EntityEvent]) -> Vec<SyncResult<SyncOperation>> {
        events.iter().map(|event| self.dispatch(event)).collect()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("domains", &self.domains())
            .finish()
    }
}
