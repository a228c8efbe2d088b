//! Repository registration schema
//!
//! Defines the on-disk shape of `repositories.toml` and validation of
//! repository source locations.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Schemes a package repository may be served from.
const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "file"];

/// A registered repository as persisted in repositories.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    /// URL the repository is queried at
    pub source_location: String,

    /// Whether a credential was supplied at registration.
    /// The credential itself is never written to disk.
    #[serde(default)]
    pub has_credential: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
}

/// Contents of repositories.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryFile {
    #[serde(default)]
    pub repository: BTreeMap<String, RepositoryEntry>,
}

impl RepositoryEntry {
    pub fn new(source_location: impl Into<String>, has_credential: bool) -> Self {
        Self {
            source_location: source_location.into(),
            has_credential,
            registered_at: Some(Utc::now()),
        }
    }

    /// Validate the source location of this entry
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_source_location(&self.source_location)?;
        Ok(())
    }
}

impl RepositoryFile {
    /// Find the registration whose source location matches exactly
    pub fn find_by_location(&self, location: &str) -> Option<(&String, &RepositoryEntry)> {
        self.repository
            .iter()
            .find(|(_, entry)| entry.source_location == location)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, entry) in &self.repository {
            if name.trim().is_empty() {
                anyhow::bail!("Repository names must not be empty");
            }
            entry
                .validate()
                .map_err(|e| anyhow::anyhow!("Repository '{}': {}", name, e))?;
        }
        Ok(())
    }
}

/// Check that a repository source location is an absolute URL with a
/// supported scheme.
pub fn validate_source_location(location: &str) -> anyhow::Result<Url> {
    if location.trim().is_empty() {
        anyhow::bail!("Source location must not be empty");
    }
    let url = Url::parse(location)
        .map_err(|e| anyhow::anyhow!("Invalid source location '{}': {}", location, e))?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        anyhow::bail!(
            "Unsupported scheme '{}' in source location '{}' (expected http, https or file)",
            url.scheme(),
            location
        );
    }
    Ok(url)
}
