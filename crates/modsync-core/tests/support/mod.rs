//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::Utc;

use modsync_core::automation::AutomationService;
use modsync_core::config::{DeploymentDescriptor, DeploymentOptions};
use modsync_core::error::ServiceError;
use modsync_core::gallery::{ModuleGallery, PublishedModule};
use modsync_core::poll::{CancelToken, Sleeper};
use modsync_core::types::{
    AccountHandle, Credential, ImportJob, ImportedModuleInfo, ModuleVersion, ProvisioningState,
    RepositoryHandle,
};

pub const GALLERY: &str = "https://gallery.example/api/v2";

pub fn version(text: &str) -> ModuleVersion {
    ModuleVersion::parse(text).expect("valid version")
}

pub fn deployment(targets: &[&str]) -> DeploymentDescriptor {
    DeploymentDescriptor {
        name: "prod-modules".to_string(),
        source: GALLERY.to_string(),
        targets: targets.iter().map(|t| t.to_string()).collect(),
        options: DeploymentOptions {
            module: "MyModule".to_string(),
            version: None,
            resource_group: "rg-prod".to_string(),
            force: false,
            credential: None,
        },
    }
}

/// Gallery that serves a fixed set of versions per module.
#[derive(Default)]
pub struct FakeGallery {
    published: HashMap<String, Vec<ModuleVersion>>,
    pub queries: RefCell<Vec<(String, String, Option<String>)>>,
    pub credentials: RefCell<Vec<Option<Credential>>>,
}

impl FakeGallery {
    pub fn with_versions(module: &str, versions: &[&str]) -> Self {
        let mut published = HashMap::new();
        published.insert(
            module.to_ascii_lowercase(),
            versions.iter().map(|v| version(v)).collect(),
        );
        Self {
            published,
            ..Default::default()
        }
    }
}

impl ModuleGallery for FakeGallery {
    fn find_module(
        &self,
        name: &str,
        repository: &RepositoryHandle,
        required_version: Option<&ModuleVersion>,
        credential: Option<&Credential>,
    ) -> Result<Option<PublishedModule>, ServiceError> {
        self.queries.borrow_mut().push((
            name.to_string(),
            repository.name.clone(),
            required_version.map(|v| v.to_string()),
        ));
        self.credentials.borrow_mut().push(credential.cloned());

        let Some(versions) = self.published.get(&name.to_ascii_lowercase()) else {
            return Ok(None);
        };
        let found = match required_version {
            Some(required) => versions.iter().find(|v| *v == required).cloned(),
            None => versions.iter().max().cloned(),
        };
        Ok(found.map(|version| PublishedModule {
            name: name.to_string(),
            version,
        }))
    }
}

/// Every call the fake automation service received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetAccount(String),
    GetModule(String, String),
    Remove(String, String),
    Submit {
        module: String,
        account: String,
        content_uri: String,
    },
    Status(String),
}

/// Automation service with scripted accounts, modules and job states.
#[derive(Default)]
pub struct FakeAutomation {
    accounts: HashMap<String, AccountHandle>,
    modules: RefCell<HashMap<(String, String), ImportedModuleInfo>>,
    job_states: RefCell<VecDeque<ProvisioningState>>,
    reject_submit: Cell<bool>,
    reject_remove: Cell<bool>,
    pub calls: RefCell<Vec<Call>>,
}

impl FakeAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, name: &str, resource_group: &str) -> Self {
        self.accounts.insert(
            format!("{resource_group}/{name}"),
            AccountHandle {
                name: name.to_string(),
                resource_group: resource_group.to_string(),
                location: "westeurope".to_string(),
            },
        );
        self
    }

    pub fn with_module(self, account: &str, module: &str, version_text: &str) -> Self {
        self.modules.borrow_mut().insert(
            (account.to_string(), module.to_ascii_lowercase()),
            ImportedModuleInfo {
                name: module.to_string(),
                version: Some(version(version_text)),
                provisioning_state: ProvisioningState::Succeeded,
            },
        );
        self
    }

    /// States returned by successive status polls; the last one repeats.
    pub fn with_job_states(self, states: &[ProvisioningState]) -> Self {
        *self.job_states.borrow_mut() = states.iter().copied().collect();
        self
    }

    pub fn rejecting_submit(self) -> Self {
        self.reject_submit.set(true);
        self
    }

    pub fn rejecting_remove(self) -> Self {
        self.reject_remove.set(true);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn submissions(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Submit { .. }))
            .collect()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Submit { .. } | Call::Remove(..)))
            .collect()
    }
}

impl AutomationService for FakeAutomation {
    fn get_account(
        &self,
        name: &str,
        resource_group: &str,
    ) -> Result<Option<AccountHandle>, ServiceError> {
        self.calls
            .borrow_mut()
            .push(Call::GetAccount(name.to_string()));
        Ok(self.accounts.get(&format!("{resource_group}/{name}")).cloned())
    }

    fn get_imported_module(
        &self,
        name: &str,
        account: &AccountHandle,
    ) -> Result<Option<ImportedModuleInfo>, ServiceError> {
        self.calls
            .borrow_mut()
            .push(Call::GetModule(account.name.clone(), name.to_string()));
        Ok(self
            .modules
            .borrow()
            .get(&(account.name.clone(), name.to_ascii_lowercase()))
            .cloned())
    }

    fn submit_import(
        &self,
        name: &str,
        content_uri: &str,
        account: &AccountHandle,
    ) -> Result<ImportJob, ServiceError> {
        self.calls.borrow_mut().push(Call::Submit {
            module: name.to_string(),
            account: account.name.clone(),
            content_uri: content_uri.to_string(),
        });
        if self.reject_submit.get() {
            return Err(ServiceError::Rejected("account at capacity".to_string()));
        }
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
        _force: bool,
    ) -> Result<(), ServiceError> {
        self.calls
            .borrow_mut()
            .push(Call::Remove(account.name.clone(), name.to_string()));
        if self.reject_remove.get() {
            return Err(ServiceError::Rejected("module is locked".to_string()));
        }
        self.modules
            .borrow_mut()
            .remove(&(account.name.clone(), name.to_ascii_lowercase()));
        Ok(())
    }

    fn get_job_status(&self, job: &ImportJob) -> Result<ProvisioningState, ServiceError> {
        self.calls
            .borrow_mut()
            .push(Call::Status(job.account.name.clone()));
        let mut states = self.job_states.borrow_mut();
        let state = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().copied()
        };
        Ok(state.unwrap_or(ProvisioningState::Succeeded))
    }
}

/// Sleeper that returns immediately and counts how often it was called.
#[derive(Default)]
pub struct NoSleep {
    pub naps: Cell<u32>,
    pub cancel_on_nap: Option<u32>,
}

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration, cancel: &CancelToken) {
        self.naps.set(self.naps.get() + 1);
        if self.cancel_on_nap == Some(self.naps.get()) {
            cancel.cancel();
        }
    }
}
