//! Azure Resource Manager client for Automation accounts.

use std::sync::Arc;

use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::ServiceError;
use crate::http::HttpTransport;
use crate::types::{
    AccountHandle, Credential, ImportJob, ImportedModuleInfo, ModuleVersion, ProvisioningState,
};

use super::AutomationService;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_API_VERSION: &str = "2023-11-01";

/// Where and as whom to talk to the management API.
#[derive(Debug, Clone)]
pub struct ArmSettings {
    pub endpoint: String,
    pub subscription_id: String,
    pub api_version: String,
    pub token: Credential,
}

impl ArmSettings {
    pub fn new(subscription_id: impl Into<String>, token: Credential) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            subscription_id: subscription_id.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token,
        }
    }

    pub fn account_url(&self, resource_group: &str, account: &str) -> Result<String, ServiceError> {
        self.resource_url(resource_group, account, &[])
    }

    pub fn module_url(
        &self,
        resource_group: &str,
        account: &str,
        module: &str,
    ) -> Result<String, ServiceError> {
        self.resource_url(resource_group, account, &["modules", module])
    }

    /// Each name is percent-encoded as its own path segment.
    fn resource_url(
        &self,
        resource_group: &str,
        account: &str,
        child: &[&str],
    ) -> Result<String, ServiceError> {
        let invalid =
            || ServiceError::Rejected(format!("Invalid management endpoint '{}'", self.endpoint));
        let mut url = Url::parse(&self.endpoint).map_err(|_| invalid())?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| invalid())?;
            segments
                .pop_if_empty()
                .extend(["subscriptions", self.subscription_id.as_str(), "resourceGroups"])
                .push(resource_group)
                .extend(["providers", "Microsoft.Automation", "automationAccounts"])
                .push(account)
                .extend(child);
        }
        url.query_pairs_mut().append_pair("api-version", &self.api_version);
        Ok(url.into())
    }
}

#[derive(Debug, Deserialize)]
struct AccountResource {
    name: String,
    #[serde(default)]
    location: String,
}

#[derive(Debug, Deserialize)]
struct ModuleResource {
    name: String,
    #[serde(default)]
    properties: ModuleProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleProperties {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    provisioning_state: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImportRequest<'a> {
    location: &'a str,
    properties: ImportProperties<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportProperties<'a> {
    content_link: ContentLink<'a>,
}

#[derive(Debug, Serialize)]
struct ContentLink<'a> {
    uri: &'a str,
}

fn decode<T: serde::de::DeserializeOwned>(url: &str, body: &str) -> Result<T, ServiceError> {
    serde_json::from_str(body).map_err(|e| ServiceError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn module_info(url: &str, resource: ModuleResource) -> Result<ImportedModuleInfo, ServiceError> {
    let version = match resource.properties.version.as_deref() {
        Some(text) if !text.trim().is_empty() => {
            Some(
                ModuleVersion::parse(text).map_err(|e| ServiceError::Decode {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?,
            )
        }
        _ => None,
    };
    let provisioning_state = resource
        .properties
        .provisioning_state
        .as_deref()
        .map(ProvisioningState::from_service)
        .unwrap_or(ProvisioningState::Pending);

    Ok(ImportedModuleInfo {
        name: resource.name,
        version,
        provisioning_state,
    })
}

/// `AutomationService` backed by the Azure management REST API.
#[derive(Debug, Clone)]
pub struct ArmClient {
    transport: Arc<HttpTransport>,
    settings: ArmSettings,
}

impl ArmClient {
    pub fn new(transport: Arc<HttpTransport>, settings: ArmSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &ArmSettings {
        &self.settings
    }

    fn fetch_module(
        &self,
        name: &str,
        account: &AccountHandle,
    ) -> Result<Option<ImportedModuleInfo>, ServiceError> {
        let url = self
            .settings
            .module_url(&account.resource_group, &account.name, name)?;
        let request = self
            .transport
            .client()
            .get(&url)
            .bearer_auth(self.settings.token.expose());
        let response = self.transport.execute("GET", &url, request)?;

        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status.is_success() {
            return Err(response.into_error("GET", &url));
        }
        let resource: ModuleResource = decode(&url, &response.body)?;
        module_info(&url, resource).map(Some)
    }
}

impl AutomationService for ArmClient {
    fn get_account(
        &self,
        name: &str,
        resource_group: &str,
    ) -> Result<Option<AccountHandle>, ServiceError> {
        let url = self.settings.account_url(resource_group, name)?;
        let request = self
            .transport
            .client()
            .get(&url)
            .bearer_auth(self.settings.token.expose());
        let response = self.transport.execute("GET", &url, request)?;

        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status.is_success() {
            return Err(response.into_error("GET", &url));
        }
        let resource: AccountResource = decode(&url, &response.body)?;
        Ok(Some(AccountHandle {
            name: resource.name,
            resource_group: resource_group.to_string(),
            location: resource.location,
        }))
    }

    fn get_imported_module(
        &self,
        name: &str,
        account: &AccountHandle,
    ) -> Result<Option<ImportedModuleInfo>, ServiceError> {
        self.fetch_module(name, account)
    }

    fn submit_import(
        &self,
        name: &str,
        content_uri: &str,
        account: &AccountHandle,
    ) -> Result<ImportJob, ServiceError> {
        let url = self
            .settings
            .module_url(&account.resource_group, &account.name, name)?;
        let body = ImportRequest {
            location: &account.location,
            properties: ImportProperties {
                content_link: ContentLink { uri: content_uri },
            },
        };
        let request = self
            .transport
            .client()
            .put(&url)
            .bearer_auth(self.settings.token.expose())
            .json(&body);
        let response = self.transport.execute("PUT", &url, request)?;
        if !response.status.is_success() {
            return Err(response.into_error("PUT", &url));
        }

        info!(module = name, account = %account.name, content_uri, "Import submitted");
        Ok(ImportJob {
            module_name: name.to_string(),
            account: account.clone(),
            submitted_at: Utc::now(),
        })
    }

    fn remove_module(
        &self,
        name: &str,
        account: &AccountHandle,
        force: bool,
    ) -> Result<(), ServiceError> {
        let url = self
            .settings
            .module_url(&account.resource_group, &account.name, name)?;
        debug!(module = name, account = %account.name, force, "Removing module");
        let request = self
            .transport
            .client()
            .delete(&url)
            .bearer_auth(self.settings.token.expose());
        let response = self.transport.execute("DELETE", &url, request)?;

        // Already gone is as good as removed.
        if response.status.is_success() || response.status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(response.into_error("DELETE", &url))
    }

    fn get_job_status(&self, job: &ImportJob) -> Result<ProvisioningState, ServiceError> {
        match self.fetch_module(&job.module_name, &job.account)? {
            Some(info) => Ok(info.provisioning_state),
            None => Err(ServiceError::Rejected(format!(
                "Module '{}' no longer exists in account '{}'",
                job.module_name, job.account.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ArmSettings {
        ArmSettings::new("sub-123", Credential::new("token"))
    }

    #[test]
    fn test_account_url() {
        assert_eq!(
            settings().account_url("rg-prod", "acct").unwrap(),
            "https://management.azure.com/subscriptions/sub-123/resourceGroups/rg-prod/providers/Microsoft.Automation/automationAccounts/acct?api-version=2023-11-01"
        );
    }

    #[test]
    fn test_module_url_trims_endpoint_slash() {
        let mut settings = settings();
        settings.endpoint = "https://arm.example/".to_string();
        assert_eq!(
            settings.module_url("rg", "acct", "MyModule").unwrap(),
            "https://arm.example/subscriptions/sub-123/resourceGroups/rg/providers/Microsoft.Automation/automationAccounts/acct/modules/MyModule?api-version=2023-11-01"
        );
    }

    #[test]
    fn test_resource_names_are_percent_encoded() {
        let url = settings()
            .module_url("rg/prod", "my acct", "My Module?")
            .unwrap();
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/sub-123/resourceGroups/rg%2Fprod/providers/Microsoft.Automation/automationAccounts/my%20acct/modules/My%20Module%3F?api-version=2023-11-01"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let mut settings = settings();
        settings.endpoint = "not a url".to_string();
        assert!(matches!(
            settings.account_url("rg", "acct"),
            Err(ServiceError::Rejected(_))
        ));
    }

    #[test]
    fn test_import_request_body() {
        let body = ImportRequest {
            location: "westeurope",
            properties: ImportProperties {
                content_link: ContentLink {
                    uri: "https://gallery.example/api/v2/package/MyModule/2.0.0/",
                },
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "location": "westeurope",
                "properties": {
                    "contentLink": {
                        "uri": "https://gallery.example/api/v2/package/MyModule/2.0.0/"
                    }
                }
            })
        );
    }

    #[test]
    fn test_decode_module_resource() {
        let body = r#"{
            "name": "MyModule",
            "properties": {"version": "2.0.0", "provisioningState": "Succeeded"}
        }"#;
        let resource: ModuleResource = decode("u", body).unwrap();
        let info = module_info("u", resource).unwrap();

        assert_eq!(info.name, "MyModule");
        assert_eq!(info.version, Some(ModuleVersion::parse("2.0.0").unwrap()));
        assert_eq!(info.provisioning_state, ProvisioningState::Succeeded);
    }

    #[test]
    fn test_decode_module_in_progress_without_version() {
        let body = r#"{"name": "MyModule", "properties": {"provisioningState": "Creating"}}"#;
        let resource: ModuleResource = decode("u", body).unwrap();
        let info = module_info("u", resource).unwrap();

        assert_eq!(info.version, None);
        assert_eq!(info.provisioning_state, ProvisioningState::Pending);
    }

    #[test]
    fn test_decode_rejects_bad_version() {
        let body = r#"{"name": "MyModule", "properties": {"version": "latest"}}"#;
        let resource: ModuleResource = decode("u", body).unwrap();
        assert!(matches!(
            module_info("u", resource),
            Err(ServiceError::Decode { .. })
        ));
    }
}
