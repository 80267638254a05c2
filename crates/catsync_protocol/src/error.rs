//! Error types for protocol decoding.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding protocol values.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A response body was not valid JSON or had the wrong shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// An unrecognized change kind was supplied.
    #[error("unknown change kind: {0}")]
    UnknownChangeKind(String),
}
