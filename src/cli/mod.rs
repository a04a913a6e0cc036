//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{DeployCommand, LogsCommand, ValidateCommand};

/// Lift-and-shift deployment tool for legacy ISAPI filter DLLs
#[derive(Debug, Parser, Clone)]
#[command(name = "dllift")]
#[command(author = "dllift Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Deploy a legacy ISAPI filter DLL to managed cloud hosting", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the deployment pipeline
    Deploy(DeployCommand),

    /// Validate a deployment manifest
    Validate(ValidateCommand),

    /// Stream the target's log feed
    Logs(LogsCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;
