//! Deployment engine - orchestrates the five-stage run

use crate::{
    checker::DependencyChecker,
    core::{
        artifact_exists, DeployError, DeployState, DeploymentOutcome, DeploymentRequest,
        PreflightFailure, Stage,
    },
    platform::{ClientError, ManagementClient, Site},
    staging,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events that can occur during a deployment run
#[derive(Debug, Clone)]
pub enum DeployEvent {
    RunStarted {
        deployment_id: Uuid,
        app_name: String,
    },
    StageStarted {
        stage: Stage,
    },
    StageCompleted {
        stage: Stage,
    },
    StageSkipped {
        stage: Stage,
        reason: String,
    },
    StageFailed {
        stage: Stage,
        error: String,
    },
    ValidationWarning {
        message: String,
    },
    PackageAssembled {
        staging_dir: PathBuf,
        archive: PathBuf,
    },
    TargetStopped {
        app_name: String,
    },
    TargetRestarted {
        app_name: String,
    },
    RunCompleted {
        deployment_id: Uuid,
        succeeded: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(DeployEvent) + Send + Sync>;

/// Runs the deployment pipeline against the two platform capabilities
///
/// Stages run strictly in order; the first fatal error stops the run. The
/// staging directory is released on every exit path, and a target the run
/// stopped is restarted even when the upload fails.
pub struct DeployEngine<C, V> {
    client: C,
    checker: Option<V>,
    event_handlers: Vec<EventHandler>,
}

impl<C, V> DeployEngine<C, V>
where
    C: ManagementClient,
    V: DependencyChecker,
{
    pub fn new(client: C, checker: Option<V>) -> Self {
        Self {
            client,
            checker,
            event_handlers: Vec::new(),
        }
    }

    /// Register an event handler
    pub fn on_event<F>(&mut self, handler: F)
    where
        F: Fn(DeployEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit(&self, event: DeployEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the pipeline for a request
    pub async fn execute(&self, request: &DeploymentRequest) -> DeploymentOutcome {
        let mut state = DeployState::new();
        state.start();

        info!(
            "Starting deployment {} -> {}/{}",
            state.deployment_id, request.resource_group, request.app_name
        );
        self.emit(DeployEvent::RunStarted {
            deployment_id: state.deployment_id,
            app_name: request.app_name.clone(),
        });

        let mut warnings = Vec::new();
        let mut endpoint_url = None;

        let result = self
            .run_stages(request, &mut state, &mut warnings, &mut endpoint_url)
            .await;

        let errors = match result {
            Ok(()) => {
                state.complete();
                Vec::new()
            }
            Err(e) => {
                state.fail();
                e.report_lines()
            }
        };

        let succeeded = errors.is_empty();
        info!(
            "Deployment {} finished: {}",
            state.deployment_id,
            if succeeded { "succeeded" } else { "failed" }
        );
        self.emit(DeployEvent::RunCompleted {
            deployment_id: state.deployment_id,
            succeeded,
        });

        DeploymentOutcome::from_state(&state, endpoint_url, warnings, errors)
    }

    async fn run_stages(
        &self,
        request: &DeploymentRequest,
        state: &mut DeployState,
        warnings: &mut Vec<String>,
        endpoint_url: &mut Option<String>,
    ) -> Result<(), DeployError> {
        // Stage 1: environment preflight
        self.emit(DeployEvent::StageStarted {
            stage: Stage::Preflight,
        });
        state.stage_running(Stage::Preflight);
        let site = match self.preflight(request).await {
            Ok(site) => {
                state.stage_completed(Stage::Preflight);
                self.emit(DeployEvent::StageCompleted {
                    stage: Stage::Preflight,
                });
                site
            }
            Err(e) => {
                state.stage_failed(Stage::Preflight, e.to_string());
                self.emit(DeployEvent::StageFailed {
                    stage: Stage::Preflight,
                    error: e.to_string(),
                });
                return Err(e);
            }
        };
        *endpoint_url = Some(site.endpoint_url());

        // Stage 2: artifact validation
        self.emit(DeployEvent::StageStarted {
            stage: Stage::Validation,
        });
        state.stage_running(Stage::Validation);
        match self.validate(request, warnings).await {
            Ok(()) => {
                state.stage_completed(Stage::Validation);
                self.emit(DeployEvent::StageCompleted {
                    stage: Stage::Validation,
                });
            }
            Err(e) => {
                state.stage_failed(Stage::Validation, e.to_string());
                self.emit(DeployEvent::StageFailed {
                    stage: Stage::Validation,
                    error: e.to_string(),
                });
                return Err(e);
            }
        }

        if request.validate_only {
            for stage in [Stage::Packaging, Stage::Upload] {
                state.stage_skipped(stage, "validate-only run");
                self.emit(DeployEvent::StageSkipped {
                    stage,
                    reason: "validate-only run".to_string(),
                });
            }
            state.stage_running(Stage::Report);
            state.stage_completed(Stage::Report);
            return Ok(());
        }

        // Stage 3: package assembly
        self.emit(DeployEvent::StageStarted {
            stage: Stage::Packaging,
        });
        state.stage_running(Stage::Packaging);
        let package = match staging::assemble(request).await {
            Ok(package) => {
                state.stage_completed(Stage::Packaging);
                self.emit(DeployEvent::PackageAssembled {
                    staging_dir: package.staging_path().to_path_buf(),
                    archive: package.archive_path.clone(),
                });
                self.emit(DeployEvent::StageCompleted {
                    stage: Stage::Packaging,
                });
                package
            }
            Err(e) => {
                state.stage_failed(Stage::Packaging, e.to_string());
                self.emit(DeployEvent::StageFailed {
                    stage: Stage::Packaging,
                    error: e.to_string(),
                });
                return Err(e.into());
            }
        };

        // Stage 4: upload & activate
        self.emit(DeployEvent::StageStarted {
            stage: Stage::Upload,
        });
        state.stage_running(Stage::Upload);
        let upload_result = self.upload(request, &package.archive_path, warnings).await;
        match &upload_result {
            Ok(()) => {
                state.stage_completed(Stage::Upload);
                self.emit(DeployEvent::StageCompleted {
                    stage: Stage::Upload,
                });
            }
            Err(e) => {
                state.stage_failed(Stage::Upload, e.to_string());
                self.emit(DeployEvent::StageFailed {
                    stage: Stage::Upload,
                    error: e.to_string(),
                });
            }
        }

        // Stage 5: report & cleanup. Runs whether or not the upload
        // succeeded; the staging directory is gone after this point.
        self.emit(DeployEvent::StageStarted {
            stage: Stage::Report,
        });
        state.stage_running(Stage::Report);
        if let Err(e) = package.close() {
            warnings.push(format!("failed to remove staging directory: {}", e));
        }
        state.stage_completed(Stage::Report);
        self.emit(DeployEvent::StageCompleted {
            stage: Stage::Report,
        });

        upload_result
    }

    /// Read-only environment checks: CLI callable, operator signed in,
    /// target present in the resource group
    async fn preflight(&self, request: &DeploymentRequest) -> Result<Site, DeployError> {
        let identity = self.client.identity().await.map_err(preflight_error)?;
        info!(
            "Authenticated as {} (subscription {})",
            identity.user, identity.subscription_name
        );

        let site = self
            .client
            .site(&request.resource_group, &request.app_name)
            .await
            .map_err(preflight_error)?;

        site.ok_or_else(|| {
            PreflightFailure::TargetNotFound {
                group: request.resource_group.clone(),
                name: request.app_name.clone(),
            }
            .into()
        })
    }

    /// Artifact existence check plus the external dependency/architecture
    /// check, applying the force/skip policies
    async fn validate(
        &self,
        request: &DeploymentRequest,
        warnings: &mut Vec<String>,
    ) -> Result<(), DeployError> {
        if !artifact_exists(&request.artifact_path) {
            return Err(DeployError::Validation {
                messages: vec![format!(
                    "artifact not found: {}",
                    request.artifact_path.display()
                )],
            });
        }

        if request.skip_validation {
            info!("External dependency check skipped by request");
            return Ok(());
        }

        let checker = match &self.checker {
            Some(checker) => checker,
            None => {
                let message = "no dependency checker configured; external check skipped";
                warn!("{}", message);
                warnings.push(message.to_string());
                self.emit(DeployEvent::ValidationWarning {
                    message: message.to_string(),
                });
                return Ok(());
            }
        };

        match checker.check(&request.artifact_path).await {
            Ok(result) if result.passed => {
                for message in &result.messages {
                    debug!("checker: {}", message);
                }
                Ok(())
            }
            Ok(result) => {
                if request.force {
                    warn!("Validation failed but --force is set; proceeding");
                    for message in &result.messages {
                        self.emit(DeployEvent::ValidationWarning {
                            message: message.clone(),
                        });
                    }
                    warnings.push("validation failed but --force was set".to_string());
                    warnings.extend(result.messages);
                    Ok(())
                } else {
                    Err(DeployError::Validation {
                        messages: result.messages,
                    })
                }
            }
            Err(e) => {
                // Tooling availability never blocks deployment.
                let message = format!("dependency check skipped: {}", e);
                warn!("{}", message);
                warnings.push(message.clone());
                self.emit(DeployEvent::ValidationWarning { message });
                Ok(())
            }
        }
    }

    /// Push the archive, bouncing the target around the upload when forced
    ///
    /// Stop/start is acquire/release: once the target has been stopped, the
    /// restart attempt runs no matter how the upload went.
    async fn upload(
        &self,
        request: &DeploymentRequest,
        archive: &std::path::Path,
        warnings: &mut Vec<String>,
    ) -> Result<(), DeployError> {
        let group = &request.resource_group;
        let name = &request.app_name;

        let stopped = if request.force {
            self.client
                .stop_site(group, name)
                .await
                .map_err(|e| DeployError::Upload(format!("failed to stop target: {}", e)))?;
            info!("Stopped {} for deployment", name);
            self.emit(DeployEvent::TargetStopped {
                app_name: name.clone(),
            });
            true
        } else {
            false
        };

        let upload_result = self
            .client
            .deploy_package(group, name, archive)
            .await
            .map_err(|e| DeployError::Upload(e.to_string()));

        if stopped {
            match self.client.start_site(group, name).await {
                Ok(()) => {
                    info!("Restarted {}", name);
                    self.emit(DeployEvent::TargetRestarted {
                        app_name: name.clone(),
                    });
                }
                Err(e) => {
                    warnings.push(format!("failed to restart target after upload: {}", e));
                }
            }
        }

        upload_result
    }
}

fn preflight_error(e: ClientError) -> DeployError {
    match e {
        ClientError::CliMissing(path) => PreflightFailure::ClientMissing(path).into(),
        ClientError::Unauthenticated(message) => {
            PreflightFailure::NotAuthenticated(message).into()
        }
        other => DeployError::Platform(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{CheckerError, SubprocessChecker};
    use crate::core::ValidationResult;
    use crate::platform::Identity;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    // Minimal scripted client; full scenario coverage lives in tests/.
    struct ScriptedClient {
        fail_upload: bool,
        ops: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(fail_upload: bool) -> Self {
            Self {
                fail_upload,
                ops: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, op: &str) {
            self.ops.lock().unwrap().push(op.to_string());
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<'a> ManagementClient for &'a ScriptedClient {
        async fn identity(&self) -> Result<Identity, ClientError> {
            self.record("identity");
            Ok(Identity {
                user: "operator@contoso.com".to_string(),
                subscription_id: "sub".to_string(),
                subscription_name: "test".to_string(),
            })
        }

        async fn site(&self, _group: &str, name: &str) -> Result<Option<Site>, ClientError> {
            self.record("site");
            Ok(Some(Site {
                name: name.to_string(),
                default_hostname: format!("{}.azurewebsites.net", name),
                state: "Running".to_string(),
            }))
        }

        async fn stop_site(&self, _group: &str, _name: &str) -> Result<(), ClientError> {
            self.record("stop");
            Ok(())
        }

        async fn start_site(&self, _group: &str, _name: &str) -> Result<(), ClientError> {
            self.record("start");
            Ok(())
        }

        async fn deploy_package(
            &self,
            _group: &str,
            _name: &str,
            _archive: &Path,
        ) -> Result<(), ClientError> {
            self.record("deploy");
            if self.fail_upload {
                Err(ClientError::Command {
                    code: 1,
                    stderr: "deployment failed".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn tail_logs(&self, _group: &str, _name: &str) -> Result<(), ClientError> {
            self.record("logs");
            Ok(())
        }
    }

    struct PassingChecker;

    #[async_trait]
    impl DependencyChecker for PassingChecker {
        async fn check(&self, _artifact: &Path) -> Result<ValidationResult, CheckerError> {
            Ok(ValidationResult::passed())
        }
    }

    fn request_in(dir: &Path, force: bool) -> DeploymentRequest {
        let artifact = dir.join("Filter.dll");
        std::fs::write(&artifact, b"MZfake").unwrap();
        let template = dir.join("web.config.template");
        std::fs::write(&template, crate::core::BINARY_PLACEHOLDER).unwrap();

        DeploymentRequest {
            resource_group: "rg".to_string(),
            app_name: "app".to_string(),
            artifact_path: artifact,
            config_template_path: template,
            force,
            validate_only: false,
            skip_validation: false,
        }
    }

    #[tokio::test]
    async fn test_execute_happy_path() {
        let fixture = tempfile::TempDir::new().unwrap();
        let client = ScriptedClient::new(false);
        let engine = DeployEngine::new(&client, Some(PassingChecker));

        let outcome = engine.execute(&request_in(fixture.path(), false)).await;

        assert!(outcome.succeeded);
        assert_eq!(
            outcome.endpoint_url.as_deref(),
            Some("https://app.azurewebsites.net")
        );
        assert_eq!(client.ops(), vec!["identity", "site", "deploy"]);
    }

    #[tokio::test]
    async fn test_forced_run_bounces_target() {
        let fixture = tempfile::TempDir::new().unwrap();
        let client = ScriptedClient::new(false);
        let engine = DeployEngine::new(&client, Some(PassingChecker));

        let outcome = engine.execute(&request_in(fixture.path(), true)).await;

        assert!(outcome.succeeded);
        assert_eq!(
            client.ops(),
            vec!["identity", "site", "stop", "deploy", "start"]
        );
    }

    #[tokio::test]
    async fn test_failed_upload_still_restarts_stopped_target() {
        let fixture = tempfile::TempDir::new().unwrap();
        let client = ScriptedClient::new(true);
        let engine =
            DeployEngine::<_, SubprocessChecker>::new(&client, None);

        let mut request = request_in(fixture.path(), true);
        request.skip_validation = true;
        let outcome = engine.execute(&request).await;

        assert!(!outcome.succeeded);
        assert_eq!(outcome.exit_code(), 1);
        // Restart attempt comes after the failed deploy.
        assert_eq!(
            client.ops(),
            vec!["identity", "site", "stop", "deploy", "start"]
        );
    }
}
