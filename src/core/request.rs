//! Deployment request and outcome types

use crate::core::state::{DeployState, Stage, StageState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Operator-supplied parameters for a single deployment run
///
/// Built once from the manifest and CLI flags, then immutable for the
/// run's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// Resource group holding the target site
    pub resource_group: String,

    /// Name of the target site
    pub app_name: String,

    /// Path to the compiled filter binary
    pub artifact_path: PathBuf,

    /// Path to the configuration template to render into the package
    pub config_template_path: PathBuf,

    /// Proceed past validation failures and bounce the target around the upload
    pub force: bool,

    /// Run preflight and validation only, then exit
    pub validate_only: bool,

    /// Bypass the external dependency/architecture checker
    pub skip_validation: bool,
}

impl DeploymentRequest {
    /// File name of the artifact, as it will appear inside the package
    pub fn artifact_file_name(&self) -> Option<String> {
        self.artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Result of the external dependency/architecture check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the artifact is suitable for deployment
    pub passed: bool,

    /// Checker findings, in the order they were reported
    pub messages: Vec<String>,
}

impl ValidationResult {
    pub fn passed() -> Self {
        Self {
            passed: true,
            messages: Vec::new(),
        }
    }

    pub fn failed(messages: Vec<String>) -> Self {
        Self {
            passed: false,
            messages,
        }
    }
}

/// Final result of a deployment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    /// Unique run ID
    pub deployment_id: Uuid,

    /// Whether every executed stage succeeded
    pub succeeded: bool,

    /// Public endpoint of the target, when preflight resolved it
    pub endpoint_url: Option<String>,

    /// Non-fatal findings (forced-past validation messages, restart issues)
    pub warnings: Vec<String>,

    /// Fatal errors, in the order they were reported
    pub errors: Vec<String>,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run ended
    pub completed_at: Option<DateTime<Utc>>,

    /// Per-stage states, in pipeline order
    pub stages: Vec<(Stage, StageState)>,
}

impl DeploymentOutcome {
    /// Build an outcome from the run's final state
    pub fn from_state(
        state: &DeployState,
        endpoint_url: Option<String>,
        warnings: Vec<String>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            deployment_id: state.deployment_id,
            succeeded: errors.is_empty(),
            endpoint_url,
            warnings,
            errors,
            started_at: state.started_at,
            completed_at: state.completed_at,
            stages: state.stages.clone(),
        }
    }

    /// State of a single stage
    pub fn stage(&self, stage: Stage) -> &StageState {
        &self
            .stages
            .iter()
            .find(|(s, _)| *s == stage)
            .expect("all stages present")
            .1
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.succeeded {
            0
        } else {
            1
        }
    }
}

/// Placeholder binary name substituted in configuration templates
///
/// The token must match the template text exactly or the rendered
/// configuration will reference a non-existent binary.
pub const BINARY_PLACEHOLDER: &str = "ISAPI_FILTER.dll";

/// Check that a path points at an existing regular file
pub fn artifact_exists(path: &Path) -> bool {
    path.is_file()
}
