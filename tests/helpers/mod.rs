//! Test utility functions for dllift

use async_trait::async_trait;
use dllift::checker::{CheckerError, DependencyChecker};
use dllift::core::{
    DeploymentOutcome, DeploymentRequest, Stage, StageState, ValidationResult, BINARY_PLACEHOLDER,
};
use dllift::engine::{DeployEngine, DeployEvent};
use dllift::platform::{ClientError, Identity, ManagementClient, Site};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Operations recorded by the mock client, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Identity,
    Site,
    Stop,
    Start,
    Deploy,
    Logs,
}

/// Scripted management client that records every call
pub struct MockClient {
    cli_missing: bool,
    unauthenticated: bool,
    target_exists: bool,
    fail_upload: bool,
    fail_restart: bool,
    ops: Mutex<Vec<Op>>,
    archive_existed_at_upload: Mutex<Option<bool>>,
}

impl MockClient {
    /// Client for which everything succeeds and the target exists
    pub fn new() -> Self {
        Self {
            cli_missing: false,
            unauthenticated: false,
            target_exists: true,
            fail_upload: false,
            fail_restart: false,
            ops: Mutex::new(Vec::new()),
            archive_existed_at_upload: Mutex::new(None),
        }
    }

    pub fn with_cli_missing(mut self) -> Self {
        self.cli_missing = true;
        self
    }

    pub fn with_unauthenticated(mut self) -> Self {
        self.unauthenticated = true;
        self
    }

    pub fn with_missing_target(mut self) -> Self {
        self.target_exists = false;
        self
    }

    pub fn with_failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn with_failing_restart(mut self) -> Self {
        self.fail_restart = true;
        self
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    /// Whether the archive file existed on disk when the upload ran
    pub fn archive_existed_at_upload(&self) -> Option<bool> {
        *self.archive_existed_at_upload.lock().unwrap()
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<'a> ManagementClient for &'a MockClient {
    async fn identity(&self) -> Result<Identity, ClientError> {
        self.record(Op::Identity);
        if self.cli_missing {
            return Err(ClientError::CliMissing("az".to_string()));
        }
        if self.unauthenticated {
            return Err(ClientError::Unauthenticated(
                "Please run 'az login' to setup account.".to_string(),
            ));
        }
        Ok(Identity {
            user: "operator@contoso.com".to_string(),
            subscription_id: "00000000-0000-0000-0000-000000000000".to_string(),
            subscription_name: "Test Subscription".to_string(),
        })
    }

    async fn site(&self, _group: &str, name: &str) -> Result<Option<Site>, ClientError> {
        self.record(Op::Site);
        if !self.target_exists {
            return Ok(None);
        }
        Ok(Some(Site {
            name: name.to_string(),
            default_hostname: format!("{}.azurewebsites.net", name),
            state: "Running".to_string(),
        }))
    }

    async fn stop_site(&self, _group: &str, _name: &str) -> Result<(), ClientError> {
        self.record(Op::Stop);
        Ok(())
    }

    async fn start_site(&self, _group: &str, _name: &str) -> Result<(), ClientError> {
        self.record(Op::Start);
        if self.fail_restart {
            return Err(ClientError::Command {
                code: 1,
                stderr: "start failed".to_string(),
            });
        }
        Ok(())
    }

    async fn deploy_package(
        &self,
        _group: &str,
        _name: &str,
        archive: &Path,
    ) -> Result<(), ClientError> {
        self.record(Op::Deploy);
        *self.archive_existed_at_upload.lock().unwrap() = Some(archive.is_file());
        if self.fail_upload {
            return Err(ClientError::Command {
                code: 1,
                stderr: "deployment failed".to_string(),
            });
        }
        Ok(())
    }

    async fn tail_logs(&self, _group: &str, _name: &str) -> Result<(), ClientError> {
        self.record(Op::Logs);
        Ok(())
    }
}

/// Scripted checker behaviors
#[derive(Debug, Clone)]
pub enum CheckerScript {
    Pass,
    Fail(Vec<String>),
    Unavailable,
}

/// Mock dependency checker that counts invocations
pub struct MockChecker {
    script: CheckerScript,
    calls: Arc<Mutex<usize>>,
}

impl MockChecker {
    pub fn new(script: CheckerScript) -> (Self, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        (
            Self {
                script,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

#[async_trait]
impl DependencyChecker for MockChecker {
    async fn check(&self, _artifact: &Path) -> Result<ValidationResult, CheckerError> {
        *self.calls.lock().unwrap() += 1;
        match &self.script {
            CheckerScript::Pass => Ok(ValidationResult::passed()),
            CheckerScript::Fail(messages) => Ok(ValidationResult::failed(messages.clone())),
            CheckerScript::Unavailable => {
                Err(CheckerError::Unavailable("depcheck".to_string()))
            }
        }
    }
}

/// On-disk fixture for a deployment request
pub struct DeployFixture {
    _dir: TempDir,
    pub request: DeploymentRequest,
}

impl DeployFixture {
    /// Artifact and template both present on disk
    pub fn new() -> Self {
        Self::with_artifact_name("Filter.dll")
    }

    pub fn with_artifact_name(name: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join(name);
        std::fs::write(&artifact, b"MZfake-filter-binary").unwrap();
        let template = dir.path().join("web.config.template");
        std::fs::write(
            &template,
            format!("<filter image=\"bin\\{}\" />", BINARY_PLACEHOLDER),
        )
        .unwrap();

        let request = DeploymentRequest {
            resource_group: "rg-legacy-web".to_string(),
            app_name: "contoso-filter".to_string(),
            artifact_path: artifact,
            config_template_path: template,
            force: false,
            validate_only: false,
            skip_validation: false,
        };

        Self { _dir: dir, request }
    }

    /// Request pointing at an artifact that does not exist
    pub fn without_artifact() -> Self {
        let mut fixture = Self::new();
        std::fs::remove_file(&fixture.request.artifact_path).unwrap();
        fixture.request.artifact_path = fixture._dir.path().join("missing.dll");
        fixture
    }

    /// Request whose configuration template is missing
    pub fn without_template() -> Self {
        let fixture = Self::new();
        std::fs::remove_file(&fixture.request.config_template_path).unwrap();
        fixture
    }
}

/// Test result from running a deployment
pub struct DeployTestResult {
    pub outcome: DeploymentOutcome,
    pub ops: Vec<Op>,
    pub events: Vec<DeployEvent>,
    /// Staging directory observed during packaging, if the run got that far
    pub staging_dir: Option<PathBuf>,
    pub archive_existed_at_upload: Option<bool>,
}

impl DeployTestResult {
    pub fn is_success(&self) -> bool {
        self.outcome.succeeded
    }

    pub fn is_failed(&self) -> bool {
        !self.outcome.succeeded
    }
}

/// Run a deployment with a scripted client and optional scripted checker
pub async fn run_deploy(
    request: &DeploymentRequest,
    client: MockClient,
    checker: Option<MockChecker>,
) -> DeployTestResult {
    let client = Arc::new(client);
    let events: Arc<Mutex<Vec<DeployEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let mut engine = DeployEngine::new(&*client, checker);
    engine.on_event(move |event| sink.lock().unwrap().push(event));

    let outcome = engine.execute(request).await;

    let events = events.lock().unwrap().clone();
    let staging_dir = events.iter().find_map(|e| match e {
        DeployEvent::PackageAssembled { staging_dir, .. } => Some(staging_dir.clone()),
        _ => None,
    });

    DeployTestResult {
        outcome,
        ops: client.ops(),
        events,
        staging_dir,
        archive_existed_at_upload: client.archive_existed_at_upload(),
    }
}

/// Assert the run succeeded with exit code 0
pub fn assert_deploy_succeeded(result: &DeployTestResult) {
    assert!(
        result.is_success(),
        "expected success, got errors: {:?}",
        result.outcome.errors
    );
    assert_eq!(result.outcome.exit_code(), 0);
}

/// Assert the run failed with exit code 1
pub fn assert_deploy_failed(result: &DeployTestResult) {
    assert!(result.is_failed(), "expected failure, run succeeded");
    assert_eq!(result.outcome.exit_code(), 1);
}

/// Assert no upload was attempted
pub fn assert_no_upload(result: &DeployTestResult) {
    assert!(
        !result.ops.contains(&Op::Deploy),
        "unexpected upload, ops: {:?}",
        result.ops
    );
}

/// Assert a stage failed with an error containing `fragment`
pub fn assert_stage_failed(result: &DeployTestResult, stage: Stage, fragment: &str) {
    match result.outcome.stage(stage) {
        StageState::Failed { error, .. } => assert!(
            error.contains(fragment),
            "stage {} error '{}' missing '{}'",
            stage,
            error,
            fragment
        ),
        other => panic!("expected stage {} to be failed, got {:?}", stage, other),
    }
}

/// Assert a stage never ran
pub fn assert_stage_pending(result: &DeployTestResult, stage: Stage) {
    assert!(
        matches!(result.outcome.stage(stage), StageState::Pending),
        "expected stage {} to be pending, got {:?}",
        stage,
        result.outcome.stage(stage)
    );
}

/// Assert a stage was skipped
pub fn assert_stage_skipped(result: &DeployTestResult, stage: Stage) {
    assert!(
        matches!(result.outcome.stage(stage), StageState::Skipped { .. }),
        "expected stage {} to be skipped, got {:?}",
        stage,
        result.outcome.stage(stage)
    );
}
