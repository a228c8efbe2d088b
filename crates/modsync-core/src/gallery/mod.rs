//! Module lookup in package repositories.

pub mod client;
pub mod feed;

use tracing::{debug, info};

use crate::error::ServiceError;
use crate::import::content_uri;
use crate::types::{Credential, ModuleVersion, RepositoryHandle, SourceModule};

pub use client::GalleryClient;

/// A module version as published by a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedModule {
    pub name: String,
    pub version: ModuleVersion,
}

/// Query side of a package repository.
pub trait ModuleGallery {
    /// Exact version when `required_version` is set, latest otherwise.
    /// `Ok(None)` when nothing matches.
    fn find_module(
        &self,
        name: &str,
        repository: &RepositoryHandle,
        required_version: Option<&ModuleVersion>,
        credential: Option<&Credential>,
    ) -> Result<Option<PublishedModule>, ServiceError>;
}

/// Finds the module version to reconcile and derives its content location.
pub struct ModuleFinder<'a> {
    gallery: &'a dyn ModuleGallery,
}

impl<'a> ModuleFinder<'a> {
    pub fn new(gallery: &'a dyn ModuleGallery) -> Self {
        Self { gallery }
    }

    pub fn find(
        &self,
        name: &str,
        repository: &RepositoryHandle,
        required_version: Option<&ModuleVersion>,
        credential: Option<&Credential>,
    ) -> Result<Option<SourceModule>, ServiceError> {
        debug!(
            module = name,
            repository = %repository.name,
            required = ?required_version.map(ModuleVersion::as_str),
            "Searching repository"
        );

        let Some(published) =
            self.gallery
                .find_module(name, repository, required_version, credential)?
        else {
            return Ok(None);
        };

        info!(
            module = name,
            version = %published.version,
            repository = %repository.name,
            "Found module in repository"
        );
        Ok(Some(SourceModule {
            content_location: content_uri(&repository.source_location, name, &published.version),
            name: published.name,
            version: published.version,
        }))
    }
}
