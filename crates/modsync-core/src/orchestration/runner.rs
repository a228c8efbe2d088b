//! Runs the reconcile pipeline for every deployment target.
//!
//! Per target: resolve repository, find the source module, look up the
//! account, inspect what it has imported, decide, apply, and wait for the
//! import job. Targets run strictly one after another.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::automation::{AutomationService, TargetInspector};
use crate::config::DeploymentDescriptor;
use crate::error::SyncError;
use crate::gallery::{ModuleFinder, ModuleGallery};
use crate::import::Importer;
use crate::poll::{CancelToken, JobPoller, PollPolicy, Sleeper};
use crate::reconcile::{Action, decide};
use crate::repository::{RepositoryResolver, RepositoryStore};
use crate::types::{Credential, ModuleVersion, TerminalState};

use super::report::{SyncReport, TargetFailure, TargetOutcome};

/// What to do when a target fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the whole run at the first error.
    #[default]
    AbortAll,
    /// Record the error and move on to the next target.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOptions {
    pub failure_policy: FailurePolicy,
    /// Turn a `Failed` import job into `SyncError::ImportFailed`.
    pub fail_on_failed_import: bool,
    /// Decide only; never import, remove or poll.
    pub dry_run: bool,
    pub poll: PollPolicy,
}

/// Everything one target reconciliation needs.
#[derive(Debug, Clone, Copy)]
pub struct TargetContext<'d> {
    pub deployment: &'d str,
    pub source_location: &'d str,
    pub account: &'d str,
    pub resource_group: &'d str,
    pub module: &'d str,
    pub required_version: Option<&'d ModuleVersion>,
    pub force: bool,
    pub credential: Option<&'d Credential>,
}

impl<'d> TargetContext<'d> {
    pub fn for_target(deployment: &'d DeploymentDescriptor, account: &'d str) -> Self {
        Self {
            deployment: &deployment.name,
            source_location: &deployment.source,
            account,
            resource_group: &deployment.options.resource_group,
            module: &deployment.options.module,
            required_version: deployment.options.version.as_ref(),
            force: deployment.options.force,
            credential: deployment.options.credential.as_ref(),
        }
    }
}

pub struct SyncRunner<'a> {
    resolver: RepositoryResolver<'a>,
    finder: ModuleFinder<'a>,
    service: &'a dyn AutomationService,
    sleeper: &'a dyn Sleeper,
    options: SyncOptions,
    cancel: CancelToken,
}

impl<'a> SyncRunner<'a> {
    pub fn new(
        repositories: &'a dyn RepositoryStore,
        gallery: &'a dyn ModuleGallery,
        service: &'a dyn AutomationService,
        sleeper: &'a dyn Sleeper,
        options: SyncOptions,
    ) -> Self {
        Self {
            resolver: RepositoryResolver::new(repositories),
            finder: ModuleFinder::new(gallery),
            service,
            sleeper,
            options,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Reconcile every target of every deployment, in order.
    pub fn run(&mut self, deployments: &[DeploymentDescriptor]) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        for deployment in deployments {
            info!(
                deployment = %deployment.name,
                module = %deployment.options.module,
                targets = deployment.targets.len(),
                "Processing deployment"
            );
            if deployment.options.module.trim().is_empty() {
                let err = SyncError::InvalidDeployment {
                    deployment: deployment.name.clone(),
                    reason: "module name must not be empty".to_string(),
                };
                self.record_or_abort(&mut report, &deployment.name, "", err)?;
                continue;
            }

            for account in &deployment.targets {
                let ctx = TargetContext::for_target(deployment, account);
                match self.reconcile_target(&ctx) {
                    Ok(outcome) => report.outcomes.push(outcome),
                    Err(err) => self.record_or_abort(&mut report, ctx.deployment, ctx.account, err)?,
                }
            }
        }

        Ok(report)
    }

    fn record_or_abort(
        &self,
        report: &mut SyncReport,
        deployment: &str,
        account: &str,
        err: SyncError,
    ) -> Result<(), SyncError> {
        let cancelled = matches!(err, SyncError::Cancelled { .. });
        if cancelled || self.options.failure_policy == FailurePolicy::AbortAll {
            return Err(err);
        }
        warn!(deployment, account, "Target failed, continuing: {}", err);
        report.failures.push(TargetFailure {
            deployment: deployment.to_string(),
            account: account.to_string(),
            error: err.to_string(),
        });
        Ok(())
    }

    /// Run the full pipeline for one target.
    pub fn reconcile_target(&mut self, ctx: &TargetContext<'_>) -> Result<TargetOutcome, SyncError> {
        let repository = self
            .resolver
            .resolve(ctx.source_location, ctx.module, ctx.credential)?;

        let source = self
            .finder
            .find(ctx.module, &repository, ctx.required_version, ctx.credential)
            .map_err(|source| SyncError::Service {
                operation: format!(
                    "searching repository '{}' for module '{}'",
                    repository.name, ctx.module
                ),
                source,
            })?
            .ok_or_else(|| SyncError::ModuleNotFound {
                module: ctx.module.to_string(),
                version: ctx.required_version.cloned(),
                repository: repository.name.clone(),
            })?;

        let account = self
            .service
            .get_account(ctx.account, ctx.resource_group)
            .map_err(|source| SyncError::Service {
                operation: format!(
                    "looking up automation account '{}' in resource group '{}'",
                    ctx.account, ctx.resource_group
                ),
                source,
            })?
            .ok_or_else(|| SyncError::AccountNotFound {
                account: ctx.account.to_string(),
                resource_group: ctx.resource_group.to_string(),
            })?;

        let target = TargetInspector::new(self.service)
            .lookup(ctx.module, &account)
            .map_err(|source| SyncError::Service {
                operation: format!(
                    "looking up module '{}' in account '{}'",
                    ctx.module, account.name
                ),
                source,
            })?;

        let action = decide(&source, target.as_ref(), ctx.force);
        let previous_version = target.as_ref().and_then(|t| t.version.clone());
        info!(
            deployment = ctx.deployment,
            account = %account.name,
            module = %source.name,
            source_version = %source.version,
            imported_version = ?previous_version.as_ref().map(ModuleVersion::as_str),
            force = ctx.force,
            %action,
            "Reconciled module"
        );

        let mut outcome = TargetOutcome {
            deployment: ctx.deployment.to_string(),
            account: account.name.clone(),
            module: source.name.clone(),
            repository: repository.name.clone(),
            source_version: source.version.clone(),
            previous_version,
            action,
            terminal: None,
            submitted_at: None,
            completed_at: None,
        };

        if self.options.dry_run || action == Action::Skip {
            return Ok(outcome);
        }

        let Some(job) = Importer::new(self.service).apply(action, &source, target.as_ref(), &account)?
        else {
            return Ok(outcome);
        };
        outcome.submitted_at = Some(job.submitted_at);

        let terminal = JobPoller::new(self.service, self.sleeper, self.options.poll)
            .await_completion(&job, &self.cancel)?;
        outcome.terminal = Some(terminal);
        outcome.completed_at = Some(Utc::now());

        if terminal == TerminalState::Failed {
            warn!(module = %source.name, account = %account.name, "Import finished in state Failed");
            if self.options.fail_on_failed_import {
                return Err(SyncError::ImportFailed {
                    module: source.name,
                    account: account.name,
                });
            }
        }

        Ok(outcome)
    }
}
