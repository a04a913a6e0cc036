//! CLI command definitions

use crate::core::manifest::{CheckerManifest, DeployManifest};
use crate::core::request::DeploymentRequest;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Run the deployment pipeline
#[derive(Debug, Args, Clone)]
pub struct DeployCommand {
    /// Path to a deployment manifest YAML file
    #[arg(short = 'f', long)]
    pub manifest: Option<String>,

    /// Resource group holding the target site
    #[arg(long)]
    pub resource_group: Option<String>,

    /// Name of the target site
    #[arg(long)]
    pub app: Option<String>,

    /// Path to the compiled filter binary
    #[arg(long)]
    pub artifact: Option<String>,

    /// Path to the configuration template
    #[arg(long)]
    pub config_template: Option<String>,

    /// Subscription to operate in
    #[arg(long)]
    pub subscription: Option<String>,

    /// Proceed past validation failures and bounce the target around the upload
    #[arg(long)]
    pub force: bool,

    /// Run preflight and validation only, then exit
    #[arg(long)]
    pub validate_only: bool,

    /// Bypass the external dependency checker
    #[arg(long)]
    pub skip_validation: bool,

    /// Output the final outcome in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Everything a deploy run needs, resolved from manifest + flags
#[derive(Debug, Clone)]
pub struct ResolvedDeploy {
    pub request: DeploymentRequest,
    pub checker: Option<CheckerManifest>,
    pub subscription: Option<String>,
}

impl DeployCommand {
    /// Resolve the manifest and flag overrides into a deployment request
    ///
    /// Flags win over manifest values; fields missing from both are errors.
    pub fn resolve(&self) -> Result<ResolvedDeploy> {
        let manifest = match &self.manifest {
            Some(path) => Some(
                DeployManifest::from_file(path)
                    .with_context(|| format!("Failed to load manifest {}", path))?,
            ),
            None => None,
        };

        let resource_group = self
            .resource_group
            .clone()
            .or_else(|| manifest.as_ref().map(|m| m.resource_group.clone()))
            .context("--resource-group is required when no manifest is given")?;

        let app_name = self
            .app
            .clone()
            .or_else(|| manifest.as_ref().map(|m| m.app_name.clone()))
            .context("--app is required when no manifest is given")?;

        let artifact = self
            .artifact
            .clone()
            .or_else(|| manifest.as_ref().map(|m| m.artifact.clone()))
            .context("--artifact is required when no manifest is given")?;

        let config_template = self
            .config_template
            .clone()
            .or_else(|| manifest.as_ref().map(|m| m.config_template.clone()))
            .context("--config-template is required when no manifest is given")?;

        let subscription = self
            .subscription
            .clone()
            .or_else(|| manifest.as_ref().and_then(|m| m.subscription.clone()));

        let checker = manifest.and_then(|m| m.checker);

        Ok(ResolvedDeploy {
            request: DeploymentRequest {
                resource_group,
                app_name,
                artifact_path: PathBuf::from(artifact),
                config_template_path: PathBuf::from(config_template),
                force: self.force,
                validate_only: self.validate_only,
                skip_validation: self.skip_validation,
            },
            checker,
            subscription,
        })
    }
}

/// Validate a deployment manifest
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the manifest YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Stream the target's log feed
#[derive(Debug, Args, Clone)]
pub struct LogsCommand {
    /// Resource group holding the target site
    #[arg(long)]
    pub resource_group: String,

    /// Name of the target site
    #[arg(long)]
    pub app: String,

    /// Subscription to operate in
    #[arg(long)]
    pub subscription: Option<String>,
}
