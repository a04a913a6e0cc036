//! Deployment error taxonomy

use thiserror::Error;

/// Reasons the environment preflight can fail
///
/// All three are fatal and non-retryable from within a run: the operator
/// has to fix the environment and re-invoke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreflightFailure {
    #[error("management CLI not found: {0}")]
    ClientMissing(String),

    #[error("not authenticated against the platform: {0}")]
    NotAuthenticated(String),

    #[error(
        "target '{name}' not found in resource group '{group}' - provision the hosting resources first"
    )]
    TargetNotFound { group: String, name: String },
}

/// Error for a deployment run
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("preflight failed: {0}")]
    Preflight(#[from] PreflightFailure),

    /// Artifact unsuitable. Fatal unless the run forces past it.
    #[error("artifact validation failed ({} issue(s))", .messages.len())]
    Validation { messages: Vec<String> },

    #[error("packaging failed: {0}")]
    Packaging(#[from] crate::staging::PackagingError),

    #[error("upload failed: {0}")]
    Upload(String),

    /// Transport-level failure talking to the platform outside the upload
    /// itself (timeouts, unexpected CLI errors)
    #[error("platform error: {0}")]
    Platform(String),
}

impl DeployError {
    /// Human-readable message lines for the final report
    pub fn report_lines(&self) -> Vec<String> {
        match self {
            DeployError::Validation { messages } => {
                let mut lines = vec!["artifact validation failed".to_string()];
                lines.extend(messages.iter().cloned());
                lines
            }
            other => vec![other.to_string()],
        }
    }
}
