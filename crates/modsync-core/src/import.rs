//! Submits imports (and removals for force-replace) to an automation account.

use tracing::info;

use crate::automation::AutomationService;
use crate::error::SyncError;
use crate::reconcile::Action;
use crate::types::{AccountHandle, ImportJob, ImportedModuleInfo, ModuleVersion, SourceModule};

/// URI the hosting service downloads a package from.
///
/// Format: `<source location>/package/<module name>/<module version>/`
pub fn content_uri(source_location: &str, module_name: &str, version: &ModuleVersion) -> String {
    format!("{source_location}/package/{module_name}/{version}/")
}

pub struct Importer<'a> {
    service: &'a dyn AutomationService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a dyn AutomationService) -> Self {
        Self { service }
    }

    /// Carry out `action`. Returns the submitted job, or `None` for `Skip`.
    pub fn apply(
        &self,
        action: Action,
        source: &SourceModule,
        target: Option<&ImportedModuleInfo>,
        account: &AccountHandle,
    ) -> Result<Option<ImportJob>, SyncError> {
        match action {
            Action::Skip => Ok(None),
            Action::Import => self.submit(source, account).map(Some),
            Action::ForceReplace => {
                let existing = target.map_or(source.name.as_str(), |t| t.name.as_str());
                info!(module = existing, account = %account.name, "Removing module before re-import");
                self.service
                    .remove_module(existing, account, true)
                    .map_err(|source_err| SyncError::ImportSubmission {
                        stage: "remove",
                        module: existing.to_string(),
                        account: account.name.clone(),
                        source: source_err,
                    })?;
                self.submit(source, account).map(Some)
            }
        }
    }

    fn submit(&self, source: &SourceModule, account: &AccountHandle) -> Result<ImportJob, SyncError> {
        info!(
            module = %source.name,
            version = %source.version,
            account = %account.name,
            content_uri = %source.content_location,
            "Submitting import"
        );
        self.service
            .submit_import(&source.name, &source.content_location, account)
            .map_err(|source_err| SyncError::ImportSubmission {
                stage: "import",
                module: source.name.clone(),
                account: account.name.clone(),
                source: source_err,
            })
    }
}
