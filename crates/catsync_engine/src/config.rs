//! Configuration for the reconciliation engine and remote client.

use catsync_protocol::SyncDomain;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Per-domain sync toggles.
///
/// Passed into the engine explicitly; the engine never consults ambient
/// process state to decide whether a domain is enabled. Domains that were
/// never mentioned are disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncConfiguration {
    domains: BTreeMap<SyncDomain, bool>,
}

impl SyncConfiguration {
    /// Creates a configuration with every domain disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with exactly the given domain enabled.
    pub fn enabled_for(domain: SyncDomain) -> Self {
        Self::new().enable(domain)
    }

    /// Enables a domain.
    pub fn enable(mut self, domain: SyncDomain) -> Self {
        self.domains.insert(domain, true);
        self
    }

    /// Disables a domain.
    pub fn disable(mut self, domain: SyncDomain) -> Self {
        self.domains.insert(domain, false);
        self
    }

    /// Returns true if sync is enabled for the domain.
    pub fn is_sync_enabled(&self, domain: &SyncDomain) -> bool {
        self.domains.get(domain).copied().unwrap_or(false)
    }
}

/// Configuration for the remote catalog client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the remote API.
    pub base_url: String,
    /// API version path segment, e.g. `v20.0`.
    pub api_version: String,
    /// Catalog that owns created resources.
    pub catalog_id: String,
    /// Access token sent as a bearer credential.
    pub access_token: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry configuration for idempotent calls.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Default remote API host.
    pub const DEFAULT_BASE_URL: &'static str = "https://graph.facebook.com";
    /// Default API version.
    pub const DEFAULT_API_VERSION: &'static str = "v20.0";

    /// Creates a new client configuration.
    pub fn new(catalog_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_version: Self::DEFAULT_API_VERSION.to_string(),
            catalog_id: catalog_id.into(),
            access_token: access_token.into(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Builds the URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            self.api_version,
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("catalog_id", &self.catalog_id)
            .field("access_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter.
    pub fn without_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(attempt.saturating_sub(1).min(i32::MAX as u32) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter
            let jitter = delay_secs * 0.25 * clock_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Cheap pseudo-random fraction in [0, 1) taken from the clock.
fn clock_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}
