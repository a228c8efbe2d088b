//! Deployment manifest schema (modsync.toml)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::automation::arm::{DEFAULT_API_VERSION, DEFAULT_ENDPOINT};
use crate::orchestration::{FailurePolicy, SyncOptions};
use crate::poll::{DEFAULT_POLL_INTERVAL, PollPolicy};
use crate::types::{Credential, ModuleVersion};

/// Root of a deployment manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncManifest {
    #[serde(default)]
    pub service: ServiceSettings,

    #[serde(default, rename = "deployment")]
    pub deployments: Vec<DeploymentDescriptor>,
}

/// `[service]` table: how to reach the hosting service and run-level policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Subscription holding the automation accounts
    #[serde(default)]
    pub subscription_id: Option<String>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Absent means wait for as long as the import takes
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Treat an import that ends in `Failed` as an error
    #[serde(default)]
    pub fail_on_failed_import: bool,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            subscription_id: None,
            endpoint: default_endpoint(),
            api_version: default_api_version(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: None,
            failure_policy: FailurePolicy::default(),
            fail_on_failed_import: false,
        }
    }
}

/// One `[[deployment]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentDescriptor {
    pub name: String,

    /// Repository URL the module is published in
    pub source: String,

    /// Automation account names
    pub targets: Vec<String>,

    pub options: DeploymentOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOptions {
    pub module: String,

    /// Exact version to reconcile; latest when absent
    #[serde(default)]
    pub version: Option<ModuleVersion>,

    pub resource_group: String,

    /// Replace an imported module with the same or a lower version
    #[serde(default)]
    pub force: bool,

    #[serde(default)]
    pub credential: Option<Credential>,
}

impl ServiceSettings {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            timeout: self.poll_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("service.poll_interval_secs must be greater than zero");
        }
        if self.endpoint.trim().is_empty() {
            anyhow::bail!("service.endpoint must not be empty");
        }
        Ok(())
    }
}

impl DeploymentDescriptor {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Deployment name must not be empty");
        }
        let required = [
            ("source", &self.source),
            ("options.module", &self.options.module),
            ("options.resource_group", &self.options.resource_group),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("Deployment '{}': {} must not be empty", self.name, field);
            }
        }
        if self.targets.is_empty() {
            anyhow::bail!("Deployment '{}' declares no targets", self.name);
        }
        if let Some(target) = self.targets.iter().find(|t| t.trim().is_empty()) {
            anyhow::bail!(
                "Deployment '{}' has an empty target name ({:?})",
                self.name,
                target
            );
        }
        Ok(())
    }
}

impl SyncManifest {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.service.validate()?;
        if self.deployments.is_empty() {
            anyhow::bail!("Manifest declares no [[deployment]] entries");
        }
        for deployment in &self.deployments {
            deployment.validate()?;
        }
        Ok(())
    }

    /// Run options derived from the `[service]` table
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            failure_policy: self.service.failure_policy,
            fail_on_failed_import: self.service.fail_on_failed_import,
            dry_run: false,
            poll: self.service.poll_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment() -> DeploymentDescriptor {
        DeploymentDescriptor {
            name: "prod".to_string(),
            source: "https://gallery.example/api/v2".to_string(),
            targets: vec!["acct".to_string()],
            options: DeploymentOptions {
                module: "MyModule".to_string(),
                version: None,
                resource_group: "rg".to_string(),
                force: false,
                credential: None,
            },
        }
    }

    #[test]
    fn test_validate_deployment_valid() {
        assert!(deployment().validate().is_ok());
    }

    #[test]
    fn test_validate_deployment_missing_module() {
        let mut d = deployment();
        d.options.module = " ".to_string();
        let err = d.validate().unwrap_err();
        assert!(err.to_string().contains("options.module"));
    }

    #[test]
    fn test_validate_deployment_without_targets() {
        let mut d = deployment();
        d.targets.clear();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let settings = ServiceSettings {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_poll_policy_from_settings() {
        let settings = ServiceSettings {
            poll_timeout_secs: Some(600),
            ..Default::default()
        };
        let policy = settings.poll_policy();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.timeout, Some(Duration::from_secs(600)));
    }
}
