//! CLI command implementations.

pub mod cleanup;
pub mod event;
pub mod mappings;
pub mod payload;
pub mod sync_all;

use crate::entities::FileEntityProvider;
use crate::transport::UreqClient;
use catsync_engine::{
    ClientConfig, FileStateStore, HttpResourceClient, ReconciliationEngine, SyncConfiguration,
};
use catsync_protocol::SyncDomain;
use std::path::PathBuf;
use std::time::Duration;

/// Engine wired to the file-backed collaborators and the HTTP client.
pub type CliEngine =
    ReconciliationEngine<HttpResourceClient<UreqClient>, FileEntityProvider, FileStateStore>;

/// Global options shared by every command.
pub struct Settings {
    /// Entities file.
    pub entities: Option<PathBuf>,
    /// Mapping store directory.
    pub state_dir: PathBuf,
    /// Domain to operate on.
    pub domain: SyncDomain,
    /// Whether the domain is enabled.
    pub sync_enabled: bool,
    /// Remote catalog ID.
    pub catalog_id: Option<String>,
    /// Remote access token.
    pub access_token: Option<String>,
    /// Remote base URL override.
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Settings {
    /// Returns the entity provider.
    pub fn provider(&self) -> FileEntityProvider {
        match &self.entities {
            Some(path) => FileEntityProvider::new(path),
            None => FileEntityProvider::none(),
        }
    }

    /// Opens the mapping store for the domain.
    pub fn store(&self) -> Result<FileStateStore, Box<dyn std::error::Error>> {
        Ok(FileStateStore::open(&self.state_dir, self.domain.clone())?)
    }

    /// Returns the domain configuration.
    pub fn configuration(&self) -> SyncConfiguration {
        if self.sync_enabled {
            SyncConfiguration::enabled_for(self.domain.clone())
        } else {
            SyncConfiguration::new().disable(self.domain.clone())
        }
    }

    /// Builds an engine.
    ///
    /// Commands that only read local state pass `remote = false` and may
    /// run without credentials.
    pub fn engine(&self, remote: bool) -> Result<CliEngine, Box<dyn std::error::Error>> {
        let (catalog_id, access_token) = if remote {
            (
                self.catalog_id
                    .clone()
                    .ok_or("Catalog ID required (--catalog-id or CATSYNC_CATALOG_ID)")?,
                self.access_token
                    .clone()
                    .ok_or("Access token required (--access-token or CATSYNC_ACCESS_TOKEN)")?,
            )
        } else {
            (
                self.catalog_id.clone().unwrap_or_default(),
                self.access_token.clone().unwrap_or_default(),
            )
        };

        tracing::debug!(
            domain = %self.domain,
            state_dir = %self.state_dir.display(),
            remote,
            "building engine"
        );
        let mut config = ClientConfig::new(catalog_id, access_token).with_timeout(self.timeout);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.as_str());
        }

        Ok(ReconciliationEngine::new(
            self.domain.clone(),
            self.configuration(),
            HttpResourceClient::new(config, UreqClient::new()),
            self.provider(),
            self.store()?,
        ))
    }
}
