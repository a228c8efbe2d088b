//! Automation account module lifecycle: lookup, import, removal and job status.

pub mod arm;

use tracing::debug;

use crate::error::ServiceError;
use crate::types::{AccountHandle, ImportJob, ImportedModuleInfo, ProvisioningState};

pub use arm::{ArmClient, ArmSettings};

/// Operations exposed by the service hosting imported modules.
///
/// Lookups return `Ok(None)` when the resource does not exist.
pub trait AutomationService {
    fn get_account(
        &self,
        name: &str,
        resource_group: &str,
    ) -> Result<Option<AccountHandle>, ServiceError>;

    fn get_imported_module(
        &self,
        name: &str,
        account: &AccountHandle,
    ) -> Result<Option<ImportedModuleInfo>, ServiceError>;

    fn submit_import(
        &self,
        name: &str,
        content_uri: &str,
        account: &AccountHandle,
    ) -> Result<ImportJob, ServiceError>;

    fn remove_module(
        &self,
        name: &str,
        account: &AccountHandle,
        force: bool,
    ) -> Result<(), ServiceError>;

    fn get_job_status(&self, job: &ImportJob) -> Result<ProvisioningState, ServiceError>;
}

/// Reads what is currently imported into an account.
pub struct TargetInspector<'a> {
    service: &'a dyn AutomationService,
}

impl<'a> TargetInspector<'a> {
    pub fn new(service: &'a dyn AutomationService) -> Self {
        Self { service }
    }

    pub fn lookup(
        &self,
        module_name: &str,
        account: &AccountHandle,
    ) -> Result<Option<ImportedModuleInfo>, ServiceError> {
        let info = self.service.get_imported_module(module_name, account)?;
        match &info {
            Some(info) => debug!(
                module = module_name,
                account = %account.name,
                version = ?info.version.as_ref().map(|v| v.as_str()),
                state = ?info.provisioning_state,
                "Module already imported"
            ),
            None => debug!(
                module = module_name,
                account = %account.name,
                "Module not imported"
            ),
        }
        Ok(info)
    }
}
