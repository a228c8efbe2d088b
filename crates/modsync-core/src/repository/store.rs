//! Repository stores for loading and saving repository registrations.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing::debug;

use crate::error::ServiceError;
use crate::types::{Credential, RepositoryHandle};

use super::RepositoryStore;
use super::schema::{RepositoryEntry, RepositoryFile, validate_source_location};

/// Repository registrations persisted in a TOML file.
///
/// Registrations survive across runs; credentials do not.
#[derive(Debug, Clone)]
pub struct FileRepositoryStore {
    path: PathBuf,
}

impl FileRepositoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the default location under the user's config directory.
    pub fn from_default_location() -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("modsync");
        Ok(Self::new(dir.join("repositories.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<RepositoryFile> {
        if !self.path.exists() {
            return Ok(RepositoryFile::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let file: RepositoryFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        file.validate()?;
        Ok(file)
    }

    pub fn save(&self, file: &RepositoryFile) -> anyhow::Result<()> {
        let content =
            toml::to_string_pretty(file).context("Failed to serialize repositories to TOML")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn store_error(&self, error: anyhow::Error) -> ServiceError {
        ServiceError::Store {
            path: self.path.clone(),
            reason: format!("{error:#}"),
        }
    }
}

impl RepositoryStore for FileRepositoryStore {
    fn find_by_source_location(
        &self,
        location: &str,
    ) -> Result<Option<RepositoryHandle>, ServiceError> {
        let file = self.load().map_err(|e| self.store_error(e))?;
        Ok(file
            .find_by_location(location)
            .map(|(name, entry)| RepositoryHandle {
                name: name.clone(),
                source_location: entry.source_location.clone(),
                credential: None,
            }))
    }

    fn register(
        &self,
        name: &str,
        location: &str,
        credential: Option<&Credential>,
    ) -> Result<RepositoryHandle, ServiceError> {
        validate_source_location(location).map_err(|e| ServiceError::Rejected(e.to_string()))?;

        let mut file = self.load().map_err(|e| self.store_error(e))?;
        if let Some(existing) = file.repository.get(name)
            && existing.source_location != location
        {
            return Err(ServiceError::Rejected(format!(
                "Repository '{}' is already registered for {}",
                name, existing.source_location
            )));
        }

        file.repository.insert(
            name.to_string(),
            RepositoryEntry::new(location, credential.is_some()),
        );
        self.save(&file).map_err(|e| self.store_error(e))?;
        debug!(repository = name, path = %self.path.display(), "Saved repository registration");

        Ok(RepositoryHandle {
            name: name.to_string(),
            source_location: location.to_string(),
            credential: credential.cloned(),
        })
    }

    fn list(&self) -> Result<Vec<RepositoryHandle>, ServiceError> {
        let file = self.load().map_err(|e| self.store_error(e))?;
        Ok(file
            .repository
            .into_iter()
            .map(|(name, entry)| RepositoryHandle {
                name,
                source_location: entry.source_location,
                credential: None,
            })
            .collect())
    }
}

/// Repository registrations that live only for the current process.
#[derive(Debug, Default)]
pub struct InMemoryRepositoryStore {
    repositories: Mutex<Vec<RepositoryHandle>>,
}

impl InMemoryRepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<RepositoryHandle>>, ServiceError> {
        self.repositories
            .lock()
            .map_err(|_| ServiceError::Rejected("Repository store lock poisoned".to_string()))
    }
}

impl RepositoryStore for InMemoryRepositoryStore {
    fn find_by_source_location(
        &self,
        location: &str,
    ) -> Result<Option<RepositoryHandle>, ServiceError> {
        Ok(self
            .lock()?
            .iter()
            .find(|repo| repo.source_location == location)
            .cloned())
    }

    fn register(
        &self,
        name: &str,
        location: &str,
        credential: Option<&Credential>,
    ) -> Result<RepositoryHandle, ServiceError> {
        validate_source_location(location).map_err(|e| ServiceError::Rejected(e.to_string()))?;

        let mut repositories = self.lock()?;
        if let Some(existing) = repositories.iter().find(|repo| repo.name == name)
            && existing.source_location != location
        {
            return Err(ServiceError::Rejected(format!(
                "Repository '{}' is already registered for {}",
                name, existing.source_location
            )));
        }
        repositories.retain(|repo| repo.name != name);

        let handle = RepositoryHandle {
            name: name.to_string(),
            source_location: location.to_string(),
            credential: credential.cloned(),
        };
        repositories.push(handle.clone());
        Ok(handle)
    }

    fn list(&self) -> Result<Vec<RepositoryHandle>, ServiceError> {
        Ok(self.lock()?.clone())
    }
}
