//! CLI output formatting

use crate::{
    core::{DeploymentOutcome, RunStatus, StageState},
    engine::DeployEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over the pipeline stages
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a stage state for display
pub fn format_stage_state(state: &StageState) -> String {
    match state {
        StageState::Pending => style("PENDING").dim().to_string(),
        StageState::Running { .. } => style("RUNNING").yellow().to_string(),
        StageState::Completed { .. } => style("COMPLETED").green().to_string(),
        StageState::Failed { .. } => style("FAILED").red().to_string(),
        StageState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a deployment event for display
pub fn format_deploy_event(event: &DeployEvent) -> String {
    match event {
        DeployEvent::RunStarted {
            deployment_id,
            app_name,
        } => format!(
            "{} Deploying to {} ({})",
            ROCKET,
            style(app_name).bold(),
            style(&deployment_id.to_string()[..8]).dim()
        ),
        DeployEvent::StageStarted { stage } => {
            format!("{} {}", SPINNER, style(stage).cyan())
        }
        DeployEvent::StageCompleted { stage } => {
            format!("{} {}", CHECK, style(stage).green())
        }
        DeployEvent::StageSkipped { stage, reason } => {
            format!(
                "{} {} ({})",
                INFO,
                style(stage).dim(),
                style(reason).dim()
            )
        }
        DeployEvent::StageFailed { stage, error } => {
            format!("{} {}: {}", CROSS, style(stage).red(), style(error).dim())
        }
        DeployEvent::ValidationWarning { message } => {
            format!("{} {}", WARN, style(message).yellow())
        }
        DeployEvent::PackageAssembled { archive, .. } => {
            format!(
                "{} Package ready: {}",
                INFO,
                style(archive.display()).dim()
            )
        }
        DeployEvent::TargetStopped { app_name } => {
            format!("{} Stopped {}", INFO, style(app_name).yellow())
        }
        DeployEvent::TargetRestarted { app_name } => {
            format!("{} Restarted {}", INFO, style(app_name).green())
        }
        DeployEvent::RunCompleted {
            deployment_id,
            succeeded,
        } => {
            let status = if *succeeded {
                format!("{}", style("succeeded").green())
            } else {
                style("failed").red().to_string()
            };
            format!(
                "{} Deployment ({}) {}",
                INFO,
                style(&deployment_id.to_string()[..8]).dim(),
                status
            )
        }
    }
}

/// Format the final outcome summary
pub fn format_outcome(outcome: &DeploymentOutcome) -> String {
    let mut lines = Vec::new();

    let icon = if outcome.succeeded { CHECK } else { CROSS };
    lines.push(format!(
        "{} Deployment {} - {}",
        icon,
        style(&outcome.deployment_id.to_string()[..8]).dim(),
        if outcome.succeeded {
            style("succeeded").green().to_string()
        } else {
            style("failed").red().to_string()
        }
    ));

    for (stage, state) in &outcome.stages {
        lines.push(format!("  {:<12} {}", stage.name(), format_stage_state(state)));
    }

    if let Some(url) = &outcome.endpoint_url {
        lines.push(format!("  Endpoint: {}", style(url).cyan()));
    }

    for warning in &outcome.warnings {
        lines.push(format!("  {} {}", WARN, style(warning).yellow()));
    }

    for error in &outcome.errors {
        lines.push(format!("  {} {}", CROSS, style(error).red()));
    }

    lines.join("\n")
}
