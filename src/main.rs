mod checker;
mod cli;
mod core;
mod engine;
mod platform;
mod staging;

use crate::checker::SubprocessChecker;
use crate::cli::commands::{DeployCommand, LogsCommand, ValidateCommand};
use crate::cli::output::*;
use crate::cli::{Cli, Command};
use crate::core::manifest::DeployManifest;
use crate::core::Stage;
use crate::engine::{DeployEngine, DeployEvent};
use crate::platform::{AzCliClient, ClientConfig, ManagementClient};
use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Deploy(cmd) => deploy(cmd).await?,
        Command::Validate(cmd) => validate_manifest(cmd)?,
        Command::Logs(cmd) => stream_logs(cmd).await?,
    }

    Ok(())
}

async fn deploy(cmd: &DeployCommand) -> Result<()> {
    let resolved = cmd.resolve()?;
    let request = resolved.request;

    println!(
        "{} Deploying {} to {}/{}",
        ROCKET,
        style(request.artifact_path.display()).bold(),
        style(&request.resource_group).cyan(),
        style(&request.app_name).cyan()
    );

    let mut config = ClientConfig::default();
    if let Some(subscription) = resolved.subscription {
        config = config.with_subscription(subscription);
    }
    let client = AzCliClient::new(config);
    let checker = resolved.checker.as_ref().map(SubprocessChecker::new);

    let mut engine = DeployEngine::new(client, checker);

    // Stage progress plus event lines through the bar, so they don't garble
    // each other
    let progress = create_progress_bar(Stage::ALL.len());
    let bar = progress.clone();
    let json = cmd.json;
    engine.on_event(move |event| {
        match &event {
            DeployEvent::StageStarted { stage } => bar.set_message(stage.to_string()),
            DeployEvent::StageCompleted { .. }
            | DeployEvent::StageSkipped { .. }
            | DeployEvent::StageFailed { .. } => bar.inc(1),
            _ => {}
        }
        if !json {
            bar.println(format_deploy_event(&event));
        }
    });

    let outcome = engine.execute(&request).await;
    progress.finish_and_clear();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("\n{}", format_outcome(&outcome));
        if outcome.succeeded && !request.validate_only {
            println!(
                "\n{} Stream logs with: dllift logs --resource-group {} --app {}",
                INFO, request.resource_group, request.app_name
            );
        }
    }

    if !outcome.succeeded {
        std::process::exit(1);
    }

    Ok(())
}

fn validate_manifest(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating manifest...", INFO);

    let result = DeployManifest::from_file(&cmd.file);

    match result {
        Ok(manifest) => {
            println!("{} Manifest is valid!", CHECK);
            println!("  Name: {}", style(&manifest.name).bold());
            println!(
                "  Target: {}/{}",
                style(&manifest.resource_group).cyan(),
                style(&manifest.app_name).cyan()
            );
            println!("  Artifact: {}", style(&manifest.artifact).dim());
            println!(
                "  Checker: {}",
                match &manifest.checker {
                    Some(checker) => style(&checker.command).dim().to_string(),
                    None => style("none").dim().to_string(),
                }
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(&manifest)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

async fn stream_logs(cmd: &LogsCommand) -> Result<()> {
    let mut config = ClientConfig::default();
    if let Some(subscription) = &cmd.subscription {
        config = config.with_subscription(subscription.clone());
    }
    let client = AzCliClient::new(config);

    println!(
        "{} Streaming logs from {}/{} (Ctrl-C to stop)",
        INFO,
        style(&cmd.resource_group).cyan(),
        style(&cmd.app).cyan()
    );

    client
        .tail_logs(&cmd.resource_group, &cmd.app)
        .await
        .context("Failed to stream logs")?;

    Ok(())
}
