//! HTTP implementation of the remote resource client.
//!
//! Talks to the remote catalog's product set endpoints. The actual HTTP
//! library is abstracted via [`HttpClient`] so the engine does not depend on
//! one (the CLI plugs in a blocking `ureq` agent; tests plug in a script).

use crate::client::RemoteResourceClient;
use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use catsync_protocol::{ErrorCategory, RemotePayload, RemoteResponse, UpdateOutcome};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP method used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// POST.
    Post,
    /// DELETE.
    Delete,
}

impl HttpMethod {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Header name/value pairs.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<String>,
    /// Timeout the client must apply.
    pub timeout: Duration,
}

impl HttpRequest {
    /// Returns the value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A received HTTP response. Non-2xx statuses are responses, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Body text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. Return `Err`
/// only when no response was received (connection failure, timeout); every
/// received status, including 4xx and 5xx, is an `Ok` response.
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String>;
}

/// Product set client over HTTP.
///
/// Transient failures of `update` and `delete` are retried per the
/// configured [`RetryConfig`](crate::RetryConfig). `create` is sent exactly
/// once: a create that timed out may still have succeeded remotely.
pub struct HttpResourceClient<C: HttpClient> {
    config: ClientConfig,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpResourceClient<C> {
    /// Creates a new HTTP resource client.
    pub fn new(config: ClientConfig, client: C) -> Self {
        Self {
            config,
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the underlying HTTP client.
    pub fn http(&self) -> &C {
        &self.client
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    fn request(&self, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
        let mut headers = vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.config.access_token),
        )];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url: self.config.url(path),
            headers,
            body,
            timeout: self.config.timeout,
        }
    }

    fn send(&self, request: &HttpRequest) -> SyncResult<RemoteResponse> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let response = self.client.execute(request).map_err(|e| {
            self.set_error(&e);
            SyncError::transient(e)
        })?;

        let decoded = RemoteResponse::from_body(&response.body);
        let graph_error = decoded.as_ref().ok().and_then(|r| r.error.clone());

        if !response.is_success() || graph_error.is_some() {
            let category = ErrorCategory::classify(response.status, graph_error.as_ref());
            let message = graph_error
                .as_ref()
                .map(|e| e.message.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            let err = SyncError::from_category(
                category,
                message,
                graph_error.as_ref().and_then(|e| e.code),
            );
            self.set_error(&err.to_string());
            return Err(err);
        }

        let decoded = decoded.map_err(|e| {
            let err = SyncError::MalformedResponse(format!("undecodable body: {e}"));
            self.set_error(&err.to_string());
            err
        })?;

        self.clear_error();
        Ok(decoded)
    }

    fn with_retry<T>(&self, operation: &str, call: impl Fn() -> SyncResult<T>) -> SyncResult<T> {
        let retry = &self.config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                std::thread::sleep(retry.delay_for_attempt(attempt));
            }

            match call() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                    warn!(operation, attempt, error = %e, "transient failure, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<C: HttpClient> RemoteResourceClient for HttpResourceClient<C> {
    fn create(&self, payload: &RemotePayload) -> SyncResult<String> {
        let path = format!("{}/product_sets", self.config.catalog_id);
        let request = self.request(HttpMethod::Post, &path, Some(payload.to_json()?));

        let response = self.send(&request)?;
        response.created_id().map(str::to_string).ok_or_else(|| {
            SyncError::MalformedResponse("create response carries no resource id".into())
        })
    }

    fn update(&self, remote_id: &str, payload: &RemotePayload) -> SyncResult<UpdateOutcome> {
        let request = self.request(HttpMethod::Post, remote_id, Some(payload.to_json()?));

        self.with_retry("update", || {
            let response = self.send(&request)?;
            response.update_outcome().ok_or_else(|| {
                SyncError::MalformedResponse("update response neither confirmed nor listed fields".into())
            })
        })
    }

    fn delete(&self, remote_id: &str) -> SyncResult<()> {
        let path = format!("{remote_id}?allow_live_product_set_deletion=true");
        let request = self.request(HttpMethod::Delete, &path, None);

        self.with_retry("delete", || {
            let response = self.send(&request)?;
            if response.is_confirmed() {
                Ok(())
            } else {
                Err(SyncError::MalformedResponse(
                    "delete response did not confirm success".into(),
                ))
            }
        })
    }
}
