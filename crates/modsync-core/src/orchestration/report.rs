//! Per-target outcomes and the run report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::reconcile::Action;
use crate::types::{ModuleVersion, TerminalState};

/// What happened for one deployment target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetOutcome {
    pub deployment: String,
    pub account: String,
    pub module: String,
    pub repository: String,
    pub source_version: ModuleVersion,
    pub previous_version: Option<ModuleVersion>,
    pub action: Action,
    /// `None` when nothing was submitted (skip or dry run).
    pub terminal: Option<TerminalState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A target that errored under `FailurePolicy::Continue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetFailure {
    pub deployment: String,
    pub account: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<TargetOutcome>,
    pub failures: Vec<TargetFailure>,
}

impl SyncReport {
    /// Targets whose import job ended `Failed`.
    pub fn failed_imports(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.terminal == Some(TerminalState::Failed))
    }

    /// True when every target reconciled and no import ended `Failed`.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.failed_imports().next().is_none()
    }

    pub fn count(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }
}
