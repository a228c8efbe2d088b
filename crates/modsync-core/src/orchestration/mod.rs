//! Reconciliation runs across deployments and their target accounts.

pub mod report;
pub mod runner;

pub use report::{SyncReport, TargetFailure, TargetOutcome};
pub use runner::{FailurePolicy, SyncOptions, SyncRunner, TargetContext};
