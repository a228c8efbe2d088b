//! Package repository registration and resolution
//!
//! A repository is resolved once per source location for the duration of a
//! run. When no known repository points at a location, one named
//! `<module>-repository` is registered.

pub mod schema;
pub mod store;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{ServiceError, SyncError};
use crate::types::{Credential, RepositoryHandle};

pub use schema::{RepositoryEntry, RepositoryFile};
pub use store::{FileRepositoryStore, InMemoryRepositoryStore};

/// Lookup and registration of package repositories.
pub trait RepositoryStore {
    fn find_by_source_location(
        &self,
        location: &str,
    ) -> Result<Option<RepositoryHandle>, ServiceError>;

    fn register(
        &self,
        name: &str,
        location: &str,
        credential: Option<&Credential>,
    ) -> Result<RepositoryHandle, ServiceError>;

    fn list(&self) -> Result<Vec<RepositoryHandle>, ServiceError>;
}

/// Name given to a repository registered on behalf of a module.
pub fn repository_name_for(module_name: &str) -> String {
    format!("{module_name}-repository")
}

/// Resolves source locations to repository handles, at most once per location.
pub struct RepositoryResolver<'a> {
    store: &'a dyn RepositoryStore,
    resolved: HashMap<String, RepositoryHandle>,
}

impl<'a> RepositoryResolver<'a> {
    pub fn new(store: &'a dyn RepositoryStore) -> Self {
        Self {
            store,
            resolved: HashMap::new(),
        }
    }

    /// The returned handle carries exactly `credential`; registrations are
    /// cached without one so each deployment's credential stays its own.
    pub fn resolve(
        &mut self,
        source_location: &str,
        module_name: &str,
        credential: Option<&Credential>,
    ) -> Result<RepositoryHandle, SyncError> {
        let with_credential = |handle: &RepositoryHandle| RepositoryHandle {
            credential: credential.cloned(),
            ..handle.clone()
        };

        if let Some(handle) = self.resolved.get(source_location) {
            return Ok(with_credential(handle));
        }

        let registration_error = |source| SyncError::RepositoryRegistration {
            source_location: source_location.to_string(),
            source,
        };

        let mut handle = match self
            .store
            .find_by_source_location(source_location)
            .map_err(registration_error)?
        {
            Some(existing) => {
                debug!(repository = %existing.name, source_location, "Using registered repository");
                existing
            }
            None => {
                let name = repository_name_for(module_name);
                info!(repository = %name, source_location, "Registering repository");
                self.store
                    .register(&name, source_location, credential)
                    .map_err(registration_error)?
            }
        };

        let resolved = with_credential(&handle);
        handle.credential = None;
        self.resolved.insert(source_location.to_string(), handle);
        Ok(resolved)
    }
}
