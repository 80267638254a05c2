//! Error types for the reconciliation engine.

use catsync_protocol::{ErrorCategory, ProtocolError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network failure, timeout, throttling, or remote server failure.
    #[error("transient network error: {message}")]
    TransientNetwork {
        /// Error message.
        message: String,
    },

    /// The remote API rejected the payload.
    #[error("remote rejected request: {message}")]
    RemoteValidation {
        /// Error message.
        message: String,
        /// Remote error code, if one was returned.
        code: Option<i64>,
    },

    /// Credentials are invalid or expired.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote answered without the fields that confirm success.
    #[error("malformed remote response: {0}")]
    MalformedResponse(String),

    /// The state store could not be read or written.
    #[error("state store I/O error at {path}: {source}")]
    Store {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A domain name that cannot be used as a store file name.
    #[error("invalid sync domain name: {0:?}")]
    InvalidDomain(String),

    /// The state store contents could not be encoded or decoded.
    #[error("state store format error: {0}")]
    StoreFormat(#[from] serde_json::Error),

    /// The local entity source failed.
    #[error("entity provider error: {0}")]
    Provider(String),

    /// A protocol value could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The batch was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Creates a transient network error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>, code: Option<i64>) -> Self {
        Self::RemoteValidation {
            message: message.into(),
            code,
        }
    }

    /// Builds the error for a classified remote failure.
    pub fn from_category(category: ErrorCategory, message: impl Into<String>, code: Option<i64>) -> Self {
        match category {
            ErrorCategory::Transient => Self::transient(message),
            ErrorCategory::Validation => Self::validation(message, code),
            ErrorCategory::Auth => Self::Auth(message.into()),
        }
    }

    pub(crate) fn store_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Store {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::TransientNetwork { .. })
    }

    /// Returns true if this error affects every call, not just one entity.
    ///
    /// A batch stops at the first systemic error.
    pub fn is_systemic(&self) -> bool {
        matches!(self, SyncError::Auth(_))
    }
}
