//! Decides what to do with a module given what the repository publishes and
//! what the account already has.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ImportedModuleInfo, SourceModule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Nothing newer to import.
    Skip,
    /// Import the source version on top of whatever is there.
    Import,
    /// Remove the imported module, then import the source version.
    ForceReplace,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Import => f.write_str("import"),
            Self::ForceReplace => f.write_str("force-replace"),
        }
    }
}

/// Compare the source module against the imported one.
///
/// `force` replaces an imported module with the same or a lower version.
/// A target without a reported version has nothing usable imported and
/// always imports.
pub fn decide(source: &SourceModule, target: Option<&ImportedModuleInfo>, force: bool) -> Action {
    let Some(target_version) = target.and_then(|t| t.version.as_ref()) else {
        return Action::Import;
    };

    if source.version > *target_version {
        Action::Import
    } else if force {
        Action::ForceReplace
    } else {
        Action::Skip
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModuleVersion, ProvisioningState};

    fn source(version: &str) -> SourceModule {
        SourceModule {
            name: "MyModule".to_string(),
            version: ModuleVersion::parse(version).unwrap(),
            content_location: String::new(),
        }
    }

    fn imported(version: &str) -> ImportedModuleInfo {
        ImportedModuleInfo {
            name: "MyModule".to_string(),
            version: Some(ModuleVersion::parse(version).unwrap()),
            provisioning_state: ProvisioningState::Succeeded,
        }
    }

    #[test]
    fn absent_target_always_imports() {
        for force in [false, true] {
            for version in ["0.0.1", "1.0.0", "9.9.9"] {
                assert_eq!(decide(&source(version), None, force), Action::Import);
            }
        }
    }

    #[test]
    fn newer_source_imports_regardless_of_force() {
        for force in [false, true] {
            assert_eq!(
                decide(&source("2.0.0"), Some(&imported("1.9.9")), force),
                Action::Import
            );
            assert_eq!(
                decide(&source("1.10.0"), Some(&imported("1.9.0")), force),
                Action::Import
            );
        }
    }

    #[test]
    fn equal_versions() {
        assert_eq!(
            decide(&source("2.0.0"), Some(&imported("2.0.0")), false),
            Action::Skip
        );
        assert_eq!(
            decide(&source("2.0.0"), Some(&imported("2.0.0")), true),
            Action::ForceReplace
        );
    }

    #[test]
    fn build_metadata_counts_as_equal() {
        assert_eq!(
            decide(&source("2.0.0+build5"), Some(&imported("2.0.0")), false),
            Action::Skip
        );
        assert_eq!(
            decide(&source("2.0.0"), Some(&imported("2.0.0+build5")), true),
            Action::ForceReplace
        );
    }

    #[test]
    fn older_source() {
        assert_eq!(
            decide(&source("1.0.0"), Some(&imported("2.0.0")), false),
            Action::Skip
        );
        assert_eq!(
            decide(&source("1.0.0"), Some(&imported("2.0.0")), true),
            Action::ForceReplace
        );
    }

    #[test]
    fn target_without_version_imports() {
        let target = ImportedModuleInfo {
            name: "MyModule".to_string(),
            version: None,
            provisioning_state: ProvisioningState::Failed,
        };
        assert_eq!(decide(&source("1.0.0"), Some(&target), false), Action::Import);
    }
}
