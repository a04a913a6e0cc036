//! Platform CLI subprocess client - shells out to `az`

use crate::platform::{ClientConfig, ClientError, Identity, ManagementClient, Site};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Management client that drives the platform CLI as a subprocess
#[derive(Debug, Clone)]
pub struct AzCliClient {
    /// Path to the CLI executable
    cli_path: String,

    /// Subscription pinned for every call
    subscription: Option<String>,

    /// Timeout for command execution in seconds
    timeout_secs: u64,
}

impl AzCliClient {
    /// Create a new client from configuration
    pub fn new(config: ClientConfig) -> Self {
        let cli_path = config.cli_path.unwrap_or_else(|| "az".to_string());
        Self {
            cli_path,
            subscription: config.subscription,
            timeout_secs: config.timeout_secs,
        }
    }

    #[cfg(test)]
    pub fn cli_path(&self) -> &str {
        &self.cli_path
    }

    /// Run a CLI command and capture stdout
    ///
    /// # Errors
    /// Returns `ClientError` if:
    /// - The CLI executable cannot be spawned
    /// - The command exits with a non-zero status
    /// - The output is not valid UTF-8
    /// - The command times out
    async fn run(&self, args: &[String]) -> Result<String, ClientError> {
        debug!("Running {} {}", self.cli_path, args.join(" "));

        let timeout_duration = Duration::from_secs(self.timeout_secs);

        let result = timeout(
            timeout_duration,
            Command::new(&self.cli_path)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ClientError::Timeout(self.timeout_secs))?;

        let output = result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ClientError::CliMissing(self.cli_path.clone())
            } else {
                ClientError::Internal(format!("Failed to spawn {}: {}", self.cli_path, e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", self.cli_path, code, stderr);
            return Err(classify_failure(code, stderr));
        }

        let content = String::from_utf8(output.stdout)
            .map_err(|e| ClientError::Internal(format!("Failed to decode CLI output: {}", e)))?;

        debug!("{} returned {} bytes of output", self.cli_path, content.len());

        Ok(content)
    }

    /// Run a CLI command and parse its stdout as JSON
    async fn run_json(&self, args: &[String]) -> Result<serde_json::Value, ClientError> {
        let stdout = self.run(args).await?;
        serde_json::from_str(&stdout)
            .map_err(|e| ClientError::Internal(format!("Failed to parse CLI JSON output: {}", e)))
    }

    fn subscription_args(&self) -> Vec<String> {
        match &self.subscription {
            Some(sub) => vec!["--subscription".to_string(), sub.clone()],
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl ManagementClient for AzCliClient {
    async fn identity(&self) -> Result<Identity, ClientError> {
        let mut args = string_args(&["account", "show", "--output", "json"]);
        args.extend(self.subscription_args());
        let json = self.run_json(&args).await?;
        parse_identity(&json)
    }

    async fn site(&self, group: &str, name: &str) -> Result<Option<Site>, ClientError> {
        let mut args = string_args(&[
            "webapp",
            "show",
            "--resource-group",
            group,
            "--name",
            name,
            "--output",
            "json",
        ]);
        args.extend(self.subscription_args());

        match self.run_json(&args).await {
            Ok(json) => parse_site(&json).map(Some),
            Err(ClientError::Command { stderr, .. }) if is_not_found(&stderr) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn stop_site(&self, group: &str, name: &str) -> Result<(), ClientError> {
        let mut args = string_args(&["webapp", "stop", "--resource-group", group, "--name", name]);
        args.extend(self.subscription_args());
        self.run(&args).await.map(|_| ())
    }

    async fn start_site(&self, group: &str, name: &str) -> Result<(), ClientError> {
        let mut args = string_args(&["webapp", "start", "--resource-group", group, "--name", name]);
        args.extend(self.subscription_args());
        self.run(&args).await.map(|_| ())
    }

    async fn deploy_package(
        &self,
        group: &str,
        name: &str,
        archive: &Path,
    ) -> Result<(), ClientError> {
        let mut args = string_args(&[
            "webapp",
            "deploy",
            "--resource-group",
            group,
            "--name",
            name,
            "--type",
            "zip",
            "--src-path",
        ]);
        args.push(archive.to_string_lossy().into_owned());
        args.extend(self.subscription_args());
        self.run(&args).await.map(|_| ())
    }

    async fn tail_logs(&self, group: &str, name: &str) -> Result<(), ClientError> {
        let mut args = string_args(&[
            "webapp", "log", "tail", "--resource-group", group, "--name", name,
        ]);
        args.extend(self.subscription_args());

        // Log tailing streams until the operator interrupts it, so it
        // inherits stdio and runs without the usual timeout.
        let status = Command::new(&self.cli_path)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClientError::CliMissing(self.cli_path.clone())
                } else {
                    ClientError::Internal(format!("Failed to spawn {}: {}", self.cli_path, e))
                }
            })?;

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            return Err(ClientError::Command {
                code,
                stderr: "log tail exited with an error".to_string(),
            });
        }

        Ok(())
    }
}

fn string_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Map a non-zero CLI exit to the right error variant
fn classify_failure(code: i32, stderr: String) -> ClientError {
    if is_unauthenticated(&stderr) {
        ClientError::Unauthenticated(stderr)
    } else {
        ClientError::Command { code, stderr }
    }
}

/// Check whether stderr indicates a missing login
fn is_unauthenticated(stderr: &str) -> bool {
    stderr.contains("az login")
        || stderr.contains("AADSTS")
        || stderr.contains("Please run 'az login'")
}

/// Check whether stderr indicates the resource does not exist
fn is_not_found(stderr: &str) -> bool {
    stderr.contains("ResourceNotFound")
        || stderr.contains("ResourceGroupNotFound")
        || stderr.contains("was not found")
}

fn parse_identity(json: &serde_json::Value) -> Result<Identity, ClientError> {
    let user = json["user"]["name"]
        .as_str()
        .ok_or_else(|| ClientError::Internal("account output missing user name".to_string()))?;
    let subscription_id = json["id"]
        .as_str()
        .ok_or_else(|| ClientError::Internal("account output missing id".to_string()))?;
    let subscription_name = json["name"].as_str().unwrap_or_default();

    Ok(Identity {
        user: user.to_string(),
        subscription_id: subscription_id.to_string(),
        subscription_name: subscription_name.to_string(),
    })
}

fn parse_site(json: &serde_json::Value) -> Result<Site, ClientError> {
    let name = json["name"]
        .as_str()
        .ok_or_else(|| ClientError::Internal("site output missing name".to_string()))?;
    let default_hostname = json["defaultHostName"]
        .as_str()
        .ok_or_else(|| ClientError::Internal("site output missing defaultHostName".to_string()))?;
    let state = json["state"].as_str().unwrap_or("Unknown");

    Ok(Site {
        name: name.to_string(),
        default_hostname: default_hostname.to_string(),
        state: state.to_string(),
    })
}
