//! Management client for the remote hosting platform

pub mod az_cli;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use az_cli::AzCliClient;

/// Error types for management client operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("management CLI not found: {0}")]
    CliMissing(String),

    #[error("not logged in to the platform: {0}")]
    Unauthenticated(String),

    #[error("command failed with code {code}: {stderr}")]
    Command { code: i32, stderr: String },

    #[error("timeout after {0} seconds")]
    Timeout(u64),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Identity the operator is signed in as
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Signed-in user name
    pub user: String,

    /// Active subscription ID
    pub subscription_id: String,

    /// Active subscription display name
    pub subscription_name: String,
}

/// A remote hosting target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// Site name
    pub name: String,

    /// Public hostname assigned by the platform
    pub default_hostname: String,

    /// Platform-reported run state ("Running", "Stopped")
    pub state: String,
}

impl Site {
    /// Public endpoint URL of the site
    pub fn endpoint_url(&self) -> String {
        format!("https://{}", self.default_hostname)
    }
}

/// Configuration for the management client
///
/// The subscription is carried here explicitly rather than read from the
/// CLI's ambient account context, so every call pins the same subscription
/// and tests can substitute a fake client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Path to the platform CLI executable
    ///
    /// If not provided, defaults to "az" (assumes it's on PATH).
    pub cli_path: Option<String>,

    /// Subscription to operate in; the CLI's default account when absent
    pub subscription: Option<String>,

    /// Timeout for management calls in seconds
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cli_path: None,
            subscription: None,
            timeout_secs: 600,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_path(mut self, cli_path: String) -> Self {
        self.cli_path = Some(cli_path);
        self
    }

    pub fn with_subscription(mut self, subscription: String) -> Self {
        self.subscription = Some(subscription);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Trait for platform management operations - allows for different implementations
#[async_trait]
pub trait ManagementClient: Send + Sync {
    /// Identity of the signed-in operator
    async fn identity(&self) -> Result<Identity, ClientError>;

    /// Look up a site; `None` when the target does not exist
    async fn site(&self, group: &str, name: &str) -> Result<Option<Site>, ClientError>;

    /// Stop the target site
    async fn stop_site(&self, group: &str, name: &str) -> Result<(), ClientError>;

    /// Start the target site
    async fn start_site(&self, group: &str, name: &str) -> Result<(), ClientError>;

    /// Push a package archive to the target
    async fn deploy_package(
        &self,
        group: &str,
        name: &str,
        archive: &Path,
    ) -> Result<(), ClientError>;

    /// Stream the target's log feed until interrupted
    async fn tail_logs(&self, group: &str, name: &str) -> Result<(), ClientError>;
}
