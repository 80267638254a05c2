//! # catsync Engine
//!
//! Reconciliation engine mirroring local catalog entities into a remote
//! commerce graph.
//!
//! This crate provides:
//! - The reconciliation engine (create-or-update, delete, full sync)
//! - Mapping persistence (in-memory and JSON file stores)
//! - Remote client abstraction with an HTTP implementation
//! - Retry with exponential backoff for idempotent calls
//! - Event dispatch to per-domain engines
//!
//! ## Architecture
//!
//! Local state is authoritative. Each entity is either UNSYNCED (no mapping)
//! or SYNCED (mapped to a remote resource ID). Every lifecycle event is
//! decided against the stored mapping:
//! 1. No mapping → create, then store the returned remote ID
//! 2. Mapping → update the mapped resource
//! 3. Deletion with a mapping → delete, then drop the mapping
//!
//! ## Key Invariants
//!
//! - A mapping is written only after a confirmed remote create
//! - A mapping is removed only after a confirmed remote delete
//! - A disabled domain causes no remote calls and no store access
//! - One entity's failure never aborts a full sync, unless credentials fail
//! - Reconciliations of the same entity never overlap

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod dispatch;
mod engine;
mod error;
mod http;
mod keyed_lock;
mod payload;
mod provider;
mod store;

pub use client::{MockFailure, MockResourceClient, RecordedCall, RemoteResourceClient};
pub use config::{ClientConfig, RetryConfig, SyncConfiguration};
pub use dispatch::{EntityEventHandler, EventDispatcher};
pub use engine::{CleanupReport, EntityFailure, ReconciliationEngine, SyncAllReport, SyncStats};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResourceClient, HttpResponse};
pub use payload::build_remote_payload;
pub use provider::{LocalEntityProvider, MemoryEntityProvider};
pub use store::{FileStateStore, MemoryStateStore, SyncStateStore};
