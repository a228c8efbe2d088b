//! Modsync Core Library
//!
//! Reconciles the version of a module published in a package repository
//! against the version imported into automation accounts, and drives the
//! import when the account is behind (or when forced).

pub mod automation;
pub mod config;
pub mod context;
pub mod error;
pub mod gallery;
pub mod http;
pub mod import;
pub mod orchestration;
pub mod poll;
pub mod reconcile;
pub mod repository;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{DeploymentDescriptor, DeploymentOptions, ServiceSettings, SyncManifest};

    // Errors
    pub use crate::error::{ServiceError, SyncError};

    // Collaborators
    pub use crate::automation::{ArmClient, AutomationService};
    pub use crate::gallery::{GalleryClient, ModuleGallery, PublishedModule};
    pub use crate::repository::{FileRepositoryStore, InMemoryRepositoryStore, RepositoryStore};

    // Reconciliation
    pub use crate::orchestration::{FailurePolicy, SyncOptions, SyncReport, SyncRunner};
    pub use crate::poll::{CancelToken, PollPolicy, ThreadSleeper};
    pub use crate::reconcile::Action;

    // Types
    pub use crate::types::{
        AccountHandle, Credential, ImportJob, ImportedModuleInfo, ModuleVersion,
        ProvisioningState, RepositoryHandle, SourceModule, TerminalState,
    };
}
