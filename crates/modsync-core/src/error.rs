//! Error types for modsync-core.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::ModuleVersion;

/// Failures reported by an external collaborator (repository store,
/// package gallery or hosting service).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The collaborator refused the operation.
    #[error("{0}")]
    Rejected(String),

    /// Local repository store could not be read or written.
    #[error("repository store at {path}: {reason}")]
    Store { path: PathBuf, reason: String },

    #[error("failed to start HTTP runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// All errors that abort (or, under `FailurePolicy::Continue`, skip) a
/// reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not resolve or register repository for '{source_location}': {source}")]
    RepositoryRegistration {
        source_location: String,
        #[source]
        source: ServiceError,
    },

    #[error("{}", module_not_found_message(.module, .version, .repository))]
    ModuleNotFound {
        module: String,
        version: Option<ModuleVersion>,
        repository: String,
    },

    #[error("automation account '{account}' not found in resource group '{resource_group}'")]
    AccountNotFound {
        account: String,
        resource_group: String,
    },

    #[error("failed to {stage} module '{module}' in account '{account}': {source}")]
    ImportSubmission {
        stage: &'static str,
        module: String,
        account: String,
        #[source]
        source: ServiceError,
    },

    #[error("import of module '{module}' into account '{account}' finished in state Failed")]
    ImportFailed { module: String, account: String },

    #[error("gave up waiting for module '{module}' in account '{account}' after {waited:?}")]
    PollTimeout {
        module: String,
        account: String,
        waited: Duration,
    },

    #[error("wait for module '{module}' in account '{account}' was cancelled")]
    Cancelled { module: String, account: String },

    #[error("invalid deployment '{deployment}': {reason}")]
    InvalidDeployment { deployment: String, reason: String },

    /// A lookup against an external service failed outright.
    #[error("{operation}: {source}")]
    Service {
        operation: String,
        #[source]
        source: ServiceError,
    },
}

fn module_not_found_message(
    module: &str,
    version: &Option<ModuleVersion>,
    repository: &str,
) -> String {
    match version {
        Some(version) => format!(
            "module '{module}' version {version} not found in repository '{repository}'"
        ),
        None => format!("module '{module}' not found in repository '{repository}'"),
    }
}
