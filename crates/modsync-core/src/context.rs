//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::automation::{ArmClient, ArmSettings};
use crate::config::{ServiceSettings, TOKEN_ENV};
use crate::gallery::GalleryClient;
use crate::http::HttpTransport;
use crate::repository::FileRepositoryStore;
use crate::types::Credential;

/// Unified application context for dependency injection.
///
/// Holds configuration paths, service settings and the shared HTTP
/// transport. Frontends create this once and build collaborators from it.
#[derive(Debug, Clone)]
pub struct AppContext {
    config_dir: PathBuf,
    settings: ServiceSettings,
    token: Option<Credential>,
    transport: Arc<HttpTransport>,
}

impl AppContext {
    /// Create a new context with an explicit config directory.
    pub fn new(
        config_dir: PathBuf,
        settings: ServiceSettings,
        token: Option<Credential>,
    ) -> anyhow::Result<Self> {
        let transport = HttpTransport::new().context("Failed to create HTTP client")?;
        Ok(Self {
            config_dir,
            settings,
            token,
            transport: Arc::new(transport),
        })
    }

    /// Create a context from the user's config directory and environment.
    pub fn from_env(settings: ServiceSettings) -> anyhow::Result<Self> {
        let config_dir = dirs::config_dir()
            .map(|p| p.join("modsync"))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(Credential::new);
        Self::new(config_dir, settings, token)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn repository_store_path(&self) -> PathBuf {
        self.config_dir.join("repositories.toml")
    }

    /// Get a FileRepositoryStore under the config directory.
    pub fn repository_store(&self) -> FileRepositoryStore {
        FileRepositoryStore::new(self.repository_store_path())
    }

    /// Get a GalleryClient sharing this context's transport.
    pub fn gallery_client(&self) -> GalleryClient {
        GalleryClient::new(Arc::clone(&self.transport))
    }

    /// Get an ArmClient; requires a subscription id and an access token.
    pub fn arm_client(&self) -> anyhow::Result<ArmClient> {
        let subscription_id = self.settings.subscription_id.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "No subscription id: set service.subscription_id or {}",
                crate::config::SUBSCRIPTION_ENV
            )
        })?;
        let token = self
            .token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No access token: set {}", TOKEN_ENV))?;

        let settings = ArmSettings {
            endpoint: self.settings.endpoint.clone(),
            subscription_id,
            api_version: self.settings.api_version.clone(),
            token,
        };
        Ok(ArmClient::new(Arc::clone(&self.transport), settings))
    }
}
