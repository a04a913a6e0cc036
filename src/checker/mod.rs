//! External dependency/architecture checker

use crate::core::manifest::CheckerManifest;
use crate::core::request::ValidationResult;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Error types for checker operations
#[derive(Debug, Error)]
pub enum CheckerError {
    /// The checker tool itself cannot run. Non-fatal: validation degrades
    /// to skipped-with-warning rather than blocking deployment.
    #[error("checker not available: {0}")]
    Unavailable(String),

    #[error("checker timed out after {0} seconds")]
    Timeout(u64),

    #[error("checker error: {0}")]
    Internal(String),
}

/// Trait for artifact validation - allows for different implementations
#[async_trait]
pub trait DependencyChecker: Send + Sync {
    /// Inspect the artifact and report whether it is deployable
    async fn check(&self, artifact: &Path) -> Result<ValidationResult, CheckerError>;
}

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Checker that runs a configured command against the artifact
///
/// The command receives the artifact path as its last argument. Exit status
/// decides `passed`; stdout lines become the result messages. When an
/// expected machine type is configured, a reported machine line that
/// disagrees fails the check regardless of exit status.
#[derive(Debug, Clone)]
pub struct SubprocessChecker {
    command: String,
    args: Vec<String>,
    expected_machine: Option<String>,
    timeout_secs: u64,
}

impl SubprocessChecker {
    pub fn new(manifest: &CheckerManifest) -> Self {
        Self {
            command: manifest.command.clone(),
            args: manifest.args.clone(),
            expected_machine: manifest.expected_machine.clone(),
            timeout_secs: manifest.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[async_trait]
impl DependencyChecker for SubprocessChecker {
    async fn check(&self, artifact: &Path) -> Result<ValidationResult, CheckerError> {
        debug!("Running checker {} on {}", self.command, artifact.display());

        let timeout_duration = Duration::from_secs(self.timeout_secs);

        let result = timeout(
            timeout_duration,
            Command::new(&self.command)
                .args(&self.args)
                .arg(artifact)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| CheckerError::Timeout(self.timeout_secs))?;

        let output = result.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CheckerError::Unavailable(self.command.clone())
            } else {
                CheckerError::Internal(format!("Failed to spawn {}: {}", self.command, e))
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut report = parse_checker_output(&stdout, self.expected_machine.as_deref());

        if !output.status.success() {
            report.passed = false;
            let trimmed = stderr.trim();
            if !trimmed.is_empty() {
                report.messages.push(trimmed.to_string());
            }
            warn!(
                "Checker exited with code {}",
                output.status.code().unwrap_or(-1)
            );
        }

        Ok(report)
    }
}

/// Parse checker stdout into a validation result
///
/// Collects non-empty lines as messages and, when `expected_machine` is
/// given, compares it against a reported `Machine: <type>` line.
pub fn parse_checker_output(stdout: &str, expected_machine: Option<&str>) -> ValidationResult {
    let machine_re = Regex::new(r"(?im)^\s*machine\s*[:=]\s*([\w-]+)").expect("valid pattern");

    let messages: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    let mut passed = true;

    if let Some(expected) = expected_machine {
        match machine_re.captures(stdout) {
            Some(caps) => {
                let reported = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                if !reported.eq_ignore_ascii_case(expected) {
                    passed = false;
                    return ValidationResult {
                        passed,
                        messages: with_mismatch(messages, reported, expected),
                    };
                }
            }
            None => {
                // Checker never reported the machine type; treat as a failure
                // since the bit-width contract cannot be confirmed.
                passed = false;
                return ValidationResult {
                    passed,
                    messages: with_missing_machine(messages, expected),
                };
            }
        }
    }

    ValidationResult { passed, messages }
}

fn with_mismatch(mut messages: Vec<String>, reported: &str, expected: &str) -> Vec<String> {
    messages.push(format!(
        "machine type {} does not match expected {}",
        reported, expected
    ));
    messages
}

fn with_missing_machine(mut messages: Vec<String>, expected: &str) -> Vec<String> {
    messages.push(format!(
        "checker did not report a machine type (expected {})",
        expected
    ));
    messages
}
