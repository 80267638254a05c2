//! Typed wrapper for remote API responses.
//!
//! The remote API returns loosely shaped JSON objects. Fields the engine
//! depends on are decoded into named struct fields; everything else is kept
//! in [`RemoteResponse::raw`] so callers can still reach it.

use crate::error::ProtocolResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A decoded response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteResponse {
    /// ID of the created resource (create responses).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Success flag (update and delete responses).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Error envelope, present on failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<GraphError>,
    /// Fields the remote accepted on a partial update.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updated_fields: Vec<String>,
    /// Fields the remote rejected on a partial update.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_fields: Vec<String>,
    /// All other fields, untouched.
    #[serde(flatten)]
    pub raw: Map<String, Value>,
}

impl RemoteResponse {
    /// Decodes a response body. An empty body decodes to an empty response.
    pub fn from_body(body: &str) -> ProtocolResult<Self> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(body)?)
    }

    /// Looks up an unrecognized field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    /// Returns the created resource ID, if the response is a confirmed create.
    pub fn created_id(&self) -> Option<&str> {
        if self.error.is_some() {
            return None;
        }
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns true if the response is a confirmed success.
    pub fn is_confirmed(&self) -> bool {
        self.error.is_none() && self.success == Some(true)
    }

    /// Interprets the response to an update call.
    ///
    /// Returns `None` when the response neither confirms success nor lists
    /// the fields that were applied; such responses are ambiguous and must
    /// be treated as failures. An explicit `success: false`, or rejected
    /// fields with nothing applied, is a rejection, not a partial update.
    pub fn update_outcome(&self) -> Option<UpdateOutcome> {
        if self.error.is_some() || self.success == Some(false) {
            return None;
        }
        if !self.failed_fields.is_empty() {
            if self.updated_fields.is_empty() {
                return None;
            }
            return Some(UpdateOutcome::Partial {
                updated_fields: self.updated_fields.clone(),
                failed_fields: self.failed_fields.clone(),
            });
        }
        if self.success == Some(true) || !self.updated_fields.is_empty() {
            return Some(UpdateOutcome::Applied);
        }
        None
    }
}

/// The remote API's error envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphError {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Exception type name, e.g. `OAuthException`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Numeric error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Numeric error subcode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_subcode: Option<i64>,
    /// Whether the remote considers the failure temporary.
    #[serde(default)]
    pub is_transient: bool,
    /// Remote trace ID for support requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbtrace_id: Option<String>,
}

/// Coarse classification of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network trouble, throttling, or server-side failure. Retrying may help.
    Transient,
    /// The payload was rejected. Retrying the same payload will not help.
    Validation,
    /// Credentials are invalid or expired. Affects every subsequent call.
    Auth,
}

impl ErrorCategory {
    /// Classifies a failed response from its HTTP status and error envelope.
    ///
    /// Remote error codes take precedence over the HTTP status.
    pub fn classify(status: u16, error: Option<&GraphError>) -> Self {
        if let Some(error) = error {
            match error.code {
                Some(190) | Some(102) => return ErrorCategory::Auth,
                Some(1) | Some(2) | Some(4) | Some(17) | Some(32) | Some(341) | Some(613) => {
                    return ErrorCategory::Transient
                }
                _ => {}
            }
            if error.is_transient {
                return ErrorCategory::Transient;
            }
        }

        match status {
            401 | 403 => ErrorCategory::Auth,
            408 | 429 => ErrorCategory::Transient,
            500..=599 => ErrorCategory::Transient,
            _ => ErrorCategory::Validation,
        }
    }
}

/// Result of an update that the remote accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Every field was applied.
    Applied,
    /// Some fields were rejected while others were applied.
    Partial {
        /// Applied fields.
        updated_fields: Vec<String>,
        /// Rejected fields.
        failed_fields: Vec<String>,
    },
}

impl UpdateOutcome {
    /// Returns true for a partial update.
    pub fn is_partial(&self) -> bool {
        matches!(self, UpdateOutcome::Partial { .. })
    }
}
