//! Deployment run state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Environment checks: CLI callable, authenticated, target exists
    Preflight,
    /// Artifact existence + external dependency/architecture check
    Validation,
    /// Staging directory assembly and archiving
    Packaging,
    /// Stop (optional), push package, restart (best effort)
    Upload,
    /// Final report and staging cleanup
    Report,
}

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; 5] = [
        Stage::Preflight,
        Stage::Validation,
        Stage::Packaging,
        Stage::Upload,
        Stage::Report,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::Validation => "validation",
            Stage::Packaging => "packaging",
            Stage::Upload => "upload",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// State of a single stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageState {
    /// Stage has not started
    Pending,
    /// Stage is currently running
    Running { started_at: DateTime<Utc> },
    /// Stage finished successfully
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Stage failed; the run stops here
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Stage was skipped (e.g. validate-only run, skipped checker)
    Skipped { reason: String },
}

impl StageState {
    /// Check if the stage is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageState::Completed { .. } | StageState::Failed { .. } | StageState::Skipped { .. }
        )
    }
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Bookkeeping for a single deployment run
///
/// Created at invocation, destroyed when the run ends. Nothing here is
/// persisted across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployState {
    /// Unique run ID
    pub deployment_id: Uuid,

    /// Current run status
    pub status: RunStatus,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Per-stage states, in pipeline order
    pub stages: Vec<(Stage, StageState)>,
}

impl DeployState {
    pub fn new() -> Self {
        Self {
            deployment_id: Uuid::new_v4(),
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            stages: Stage::ALL
                .iter()
                .map(|s| (*s, StageState::Pending))
                .collect(),
        }
    }

    /// Mark the run as started
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark the run as completed
    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the run as failed
    pub fn fail(&mut self) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// Get the state of a stage
    pub fn stage(&self, stage: Stage) -> &StageState {
        &self
            .stages
            .iter()
            .find(|(s, _)| *s == stage)
            .expect("all stages present")
            .1
    }

    /// Set the state of a stage
    pub fn set_stage(&mut self, stage: Stage, state: StageState) {
        if let Some(entry) = self.stages.iter_mut().find(|(s, _)| *s == stage) {
            entry.1 = state;
        }
    }

    /// Transition a stage to running and return its start time
    pub fn stage_running(&mut self, stage: Stage) -> DateTime<Utc> {
        let now = Utc::now();
        self.set_stage(stage, StageState::Running { started_at: now });
        now
    }

    /// Transition a running stage to completed
    pub fn stage_completed(&mut self, stage: Stage) {
        let started_at = match self.stage(stage) {
            StageState::Running { started_at } => *started_at,
            _ => Utc::now(),
        };
        self.set_stage(
            stage,
            StageState::Completed {
                started_at,
                completed_at: Utc::now(),
            },
        );
    }

    /// Transition a running stage to failed
    pub fn stage_failed(&mut self, stage: Stage, error: String) {
        let started_at = match self.stage(stage) {
            StageState::Running { started_at } => *started_at,
            _ => Utc::now(),
        };
        self.set_stage(
            stage,
            StageState::Failed {
                error,
                started_at,
                failed_at: Utc::now(),
            },
        );
    }

    /// Transition a stage to skipped
    pub fn stage_skipped(&mut self, stage: Stage, reason: impl Into<String>) {
        self.set_stage(
            stage,
            StageState::Skipped {
                reason: reason.into(),
            },
        );
    }

    /// Count of stages that reached a terminal state
    pub fn finished_stages(&self) -> usize {
        self.stages.iter().filter(|(_, s)| s.is_terminal()).count()
    }
}

impl Default for DeployState {
    fn default() -> Self {
        Self::new()
    }
}
