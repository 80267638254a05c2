//! # catsync Protocol
//!
//! Data model and wire types for catalog reconciliation.
//!
//! This crate provides:
//! - `LocalEntity` for syncable taxonomy entities (product categories)
//! - `FilterExpr` boolean expressions used by remote product sets
//! - `RemotePayload`, the flat JSON request body sent to the remote API
//! - `RemoteResponse`, a typed response wrapper with raw pass-through
//! - `SyncOperation` reconciliation decisions and `EntityEvent` lifecycle events
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod domain;
mod entity;
mod error;
mod filter;
mod mapping;
mod operation;
mod payload;
mod response;

pub use domain::{ChangeKind, EntityEvent, SyncDomain};
pub use entity::LocalEntity;
pub use error::{ProtocolError, ProtocolResult};
pub use filter::{Comparison, FilterExpr};
pub use mapping::RemoteResourceMapping;
pub use operation::{OperationKind, SyncOperation};
pub use payload::RemotePayload;
pub use response::{ErrorCategory, GraphError, RemoteResponse, UpdateOutcome};
