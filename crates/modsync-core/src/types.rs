//! Shared core types used across the resolver, finder, inspector and importer.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a module version string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid module version '{input}': {reason}")]
pub struct VersionParseError {
    pub input: String,
    pub reason: String,
}

/// A comparable module version.
///
/// Accepts one to four numeric components (`2`, `2.1`, `2.1.0`, `2.1.0.7`)
/// with an optional pre-release or build suffix. Missing components are
/// padded with zero for ordering, and a fourth component orders after patch.
/// Build metadata is ignored when comparing.
/// The original text is kept for display so that content URIs reproduce the
/// version exactly as the repository publishes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleVersion {
    raw: String,
    parsed: semver::Version,
    revision: u64,
}

impl ModuleVersion {
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let raw = input.trim();
        let error = |reason: &str| VersionParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(error("version is empty"));
        }

        let suffix_at = raw.find(['-', '+']).unwrap_or(raw.len());
        let (core, suffix) = raw.split_at(suffix_at);

        let components: Vec<&str> = core.split('.').collect();
        if components.len() > 4 {
            return Err(error("expected at most four numeric components"));
        }
        let mut numbers = [0u64; 4];
        for (slot, component) in numbers.iter_mut().zip(&components) {
            *slot = component
                .parse::<u64>()
                .map_err(|_| error(&format!("'{component}' is not a number")))?;
        }

        let normalized = format!("{}.{}.{}{}", numbers[0], numbers[1], numbers[2], suffix);
        let parsed = semver::Version::parse(&normalized).map_err(|e| error(&e.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            parsed,
            revision: numbers[3],
        })
    }

    /// The version text as published.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn semver(&self) -> &semver::Version {
        &self.parsed
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_prerelease(&self) -> bool {
        !self.parsed.pre.is_empty()
    }
}

impl PartialEq for ModuleVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ModuleVersion {}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let core = |v: &Self| (v.parsed.major, v.parsed.minor, v.parsed.patch, v.revision);
        core(self)
            .cmp(&core(other))
            .then_with(|| self.parsed.pre.cmp(&other.parsed.pre))
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ModuleVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ModuleVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModuleVersion> for String {
    fn from(value: ModuleVersion) -> Self {
        value.raw
    }
}

/// Opaque credential passed through to external services unmodified.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A resolved package repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub name: String,
    pub source_location: String,
    pub credential: Option<Credential>,
}

/// A module version found in a source repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceModule {
    pub name: String,
    pub version: ModuleVersion,
    /// URI the hosting service fetches the package payload from.
    pub content_location: String,
}

/// Provisioning state of a module in an automation account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvisioningState {
    Pending,
    Succeeded,
    Failed,
}

impl ProvisioningState {
    /// Map a provisioning state reported by the hosting service.
    ///
    /// Every intermediate import stage (`Creating`, `ContentValidated`, ...)
    /// is `Pending`. A remotely cancelled import is final, so it maps to `Failed`.
    pub fn from_service(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" | "cancelled" | "canceled" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn terminal(self) -> Option<TerminalState> {
        match self {
            Self::Pending => None,
            Self::Succeeded => Some(TerminalState::Succeeded),
            Self::Failed => Some(TerminalState::Failed),
        }
    }

    pub fn is_terminal(self) -> bool {
        self.terminal().is_some()
    }
}

/// Final state of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalState {
    Succeeded,
    Failed,
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// State of a module already registered in a target account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedModuleInfo {
    pub name: String,
    /// `None` when the service reports no version, e.g. after a failed import.
    pub version: Option<ModuleVersion>,
    pub provisioning_state: ProvisioningState,
}

/// An automation account that hosts imported modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHandle {
    pub name: String,
    pub resource_group: String,
    pub location: String,
}

/// A submitted import operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJob {
    pub module_name: String,
    pub account: AccountHandle,
    pub submitted_at: DateTime<Utc>,
}
