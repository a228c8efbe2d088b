//! NuGet v2 feed client for package repositories.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::ServiceError;
use crate::http::HttpTransport;
use crate::types::{Credential, ModuleVersion, RepositoryHandle};

use super::feed::{parse_feed, select_version};
use super::{ModuleGallery, PublishedModule};

/// Queries `FindPackagesById()` on a repository's OData feed.
#[derive(Debug, Clone)]
pub struct GalleryClient {
    transport: Arc<HttpTransport>,
}

impl GalleryClient {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    /// Build the feed query URL for a package id.
    ///
    /// # Example
    /// ```ignore
    /// let url = GalleryClient::find_packages_url("https://gallery.example/api/v2", "MyModule")?;
    /// // Returns: "https://gallery.example/api/v2/FindPackagesById()?id=%27MyModule%27"
    /// ```
    pub fn find_packages_url(source_location: &str, name: &str) -> Result<Url, ServiceError> {
        let base = source_location.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/FindPackagesById()")).map_err(|e| {
            ServiceError::Rejected(format!("Invalid repository URL '{source_location}': {e}"))
        })?;
        url.query_pairs_mut().append_pair("id", &format!("'{name}'"));
        Ok(url)
    }
}

impl ModuleGallery for GalleryClient {
    fn find_module(
        &self,
        name: &str,
        repository: &RepositoryHandle,
        required_version: Option<&ModuleVersion>,
        credential: Option<&Credential>,
    ) -> Result<Option<PublishedModule>, ServiceError> {
        let mut next = Some(Self::find_packages_url(&repository.source_location, name)?.to_string());
        let mut entries = Vec::new();

        while let Some(url) = next.take() {
            let mut request = self
                .transport
                .client()
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/json");
            if let Some(credential) = credential {
                request = request.bearer_auth(credential.expose());
            }

            let response = self.transport.execute("GET", &url, request)?;
            if response.status == reqwest::StatusCode::NOT_FOUND {
                debug!(module = name, url = %url, "Package not found in feed");
                break;
            }
            if !response.status.is_success() {
                return Err(response.into_error("GET", &url));
            }

            let page = parse_feed(&response.body).map_err(|e| ServiceError::Decode {
                url: url.clone(),
                reason: e.to_string(),
            })?;
            entries.extend(page.entries);
            next = page.next;
        }

        Ok(select_version(&entries, name, required_version))
    }
}
