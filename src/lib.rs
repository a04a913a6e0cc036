//! dllift - lift-and-shift deployment for legacy ISAPI filter DLLs

pub mod checker;
pub mod cli;
pub mod core;
pub mod engine;
pub mod platform;
pub mod staging;

// Re-export commonly used types
pub use crate::checker::{CheckerError, DependencyChecker, SubprocessChecker};
pub use crate::core::{
    DeployError, DeployState, DeploymentOutcome, DeploymentRequest, PreflightFailure, RunStatus,
    Stage, StageState, ValidationResult, BINARY_PLACEHOLDER,
};
pub use crate::engine::{DeployEngine, DeployEvent};
pub use crate::platform::{
    AzCliClient, ClientConfig, ClientError, Identity, ManagementClient, Site,
};
