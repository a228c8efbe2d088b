//! Deployment manifest loading and environment overrides.

pub mod parser;
pub mod schema;

pub use parser::{parse_manifest, parse_manifest_str};
pub use schema::{DeploymentDescriptor, DeploymentOptions, ServiceSettings, SyncManifest};

/// Overrides `service.subscription_id`.
pub const SUBSCRIPTION_ENV: &str = "MODSYNC_SUBSCRIPTION_ID";
/// Bearer token for the hosting service.
pub const TOKEN_ENV: &str = "MODSYNC_ARM_TOKEN";

/// Apply environment overrides on top of a loaded manifest.
pub fn apply_env_overrides(manifest: &mut SyncManifest) {
    if let Ok(subscription) = std::env::var(SUBSCRIPTION_ENV)
        && !subscription.trim().is_empty()
    {
        manifest.service.subscription_id = Some(subscription);
    }
}
