//! Deployment manifest loaded from YAML

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Declarative description of a deployment, checked into the migration bundle
///
/// CLI flags override individual fields at invocation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployManifest {
    /// Human-readable migration name
    pub name: String,

    /// Resource group holding the target site
    pub resource_group: String,

    /// Name of the target site
    pub app_name: String,

    /// Subscription to operate in (optional)
    #[serde(default)]
    pub subscription: Option<String>,

    /// Path to the compiled filter binary
    pub artifact: String,

    /// Path to the configuration template
    pub config_template: String,

    /// External dependency/architecture checker (optional)
    #[serde(default)]
    pub checker: Option<CheckerManifest>,
}

/// Checker section of the manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerManifest {
    /// Command to run; the artifact path is appended as the last argument
    pub command: String,

    /// Extra arguments passed before the artifact path
    #[serde(default)]
    pub args: Vec<String>,

    /// Machine type the artifact must report (e.g. "x64")
    #[serde(default)]
    pub expected_machine: Option<String>,

    /// Timeout for the checker run (seconds)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl DeployManifest {
    /// Load a manifest from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a manifest from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let manifest: DeployManifest = serde_yaml::from_str(yaml)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("manifest name must not be empty");
        }
        if self.resource_group.trim().is_empty() {
            anyhow::bail!("resource_group must not be empty");
        }
        if self.app_name.trim().is_empty() {
            anyhow::bail!("app_name must not be empty");
        }
        if self.artifact.trim().is_empty() {
            anyhow::bail!("artifact must not be empty");
        }
        if self.config_template.trim().is_empty() {
            anyhow::bail!("config_template must not be empty");
        }

        if let Some(checker) = &self.checker {
            if checker.command.trim().is_empty() {
                anyhow::bail!("checker command must not be empty");
            }
            if let Some(timeout) = checker.timeout_secs {
                if timeout == 0 {
                    anyhow::bail!("checker timeout_secs must be greater than zero");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name: "contoso filter migration"
resource_group: "rg-legacy-web"
app_name: "contoso-filter"
subscription: "00000000-0000-0000-0000-000000000000"
artifact: "./build/Filter.dll"
config_template: "./templates/web.config"
checker:
  command: "./tools/depcheck"
  args: ["--verbose"]
  expected_machine: "x64"
  timeout_secs: 120
"#;

    #[test]
    fn test_parse_valid_manifest() {
        let manifest = DeployManifest::from_yaml(VALID).unwrap();
        assert_eq!(manifest.app_name, "contoso-filter");
        assert_eq!(manifest.resource_group, "rg-legacy-web");

        let checker = manifest.checker.unwrap();
        assert_eq!(checker.command, "./tools/depcheck");
        assert_eq!(checker.expected_machine.as_deref(), Some("x64"));
        assert_eq!(checker.timeout_secs, Some(120));
    }

    #[test]
    fn test_checker_section_is_optional() {
        let yaml = r#"
name: "minimal"
resource_group: "rg"
app_name: "app"
artifact: "Filter.dll"
config_template: "web.config"
"#;
        let manifest = DeployManifest::from_yaml(yaml).unwrap();
        assert!(manifest.checker.is_none());
        assert!(manifest.subscription.is_none());
    }

    #[test]
    fn test_empty_app_name_rejected() {
        let yaml = r#"
name: "broken"
resource_group: "rg"
app_name: ""
artifact: "Filter.dll"
config_template: "web.config"
"#;
        let err = DeployManifest::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("app_name"));
    }

    #[test]
    fn test_zero_checker_timeout_rejected() {
        let yaml = r#"
name: "broken"
resource_group: "rg"
app_name: "app"
artifact: "Filter.dll"
config_template: "web.config"
checker:
  command: "depcheck"
  timeout_secs: 0
"#;
        let err = DeployManifest::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }
}
