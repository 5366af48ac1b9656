use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{Instrument, info, info_span, warn};

use launcher_core::process::spawn_detached;
use launcher_core::{
    Bootstrap, FailureKind, LaunchReadiness, LauncherConfig, LauncherError, PhaseError,
    UpdateCheck, UpdateCheckOutcome, UpdateStatus,
};
use launcher_cli::prompt::confirm_update;

use crate::cli::RunArgs;

/// Resolves the installation root and loads its configuration.
///
/// Without `--root` the root depends on `product_name`, so an explicit
/// config file is read first and `<root>/launcher.toml` only afterwards.
pub fn load_config(
    root: Option<&Path>,
    config: Option<&Path>,
) -> std::result::Result<(LauncherConfig, PathBuf), PhaseError> {
    let during = |e: LauncherError| e.during(FailureKind::Config);

    if let Some(root) = root {
        let loaded = LauncherConfig::load(config, root).map_err(during)?;
        return Ok((loaded, root.to_path_buf()));
    }

    let initial = match config {
        Some(path) => LauncherConfig::from_file(path).map_err(during)?,
        None => LauncherConfig::default(),
    };
    let root = initial.default_root().map_err(during)?;
    let loaded = if config.is_some() {
        initial
    } else {
        LauncherConfig::load(None, &root).map_err(during)?
    };
    Ok((loaded, root))
}

pub async fn run(flow: &Bootstrap, args: &RunArgs) -> Result<()> {
    let outcome = flow
        .run(
            |release| confirm_update(release, flow.running_version()),
            spawn_detached,
        )
        .instrument(info_span!("run", version = %flow.running_version()))
        .await?;

    if let Some(previous) = &outcome.prepared.previous_update {
        report_previous_update(previous);
    }
    if let UpdateCheckOutcome::Ignored(e) = &outcome.check {
        warn!("Update check skipped: {e}");
    }

    match outcome.readiness {
        LaunchReadiness::RestartForUpdate(handoff) => {
            eprintln!(
                "Installing {} and restarting (helper pid {})",
                handoff.version, handoff.helper_pid
            );
            Ok(())
        }
        LaunchReadiness::Ready { update_error } => {
            if let Some(e) = update_error {
                eprintln!("{}", e.to_json());
                eprintln!("Update failed; continuing with the installed version.");
            }
            if args.no_launch {
                info!("Launch skipped (--no-launch)");
                return Ok(());
            }
            launch(flow)
        }
    }
}

pub async fn prepare(flow: &Bootstrap) -> Result<()> {
    let report = flow.prepare().await?;
    if let Some(previous) = &report.previous_update {
        report_previous_update(previous);
    }
    println!("Runtime: {:?}", report.runtime);
    println!("Payload: {:?}", report.payload);
    println!("Environment: {}", flow.environment_state());
    Ok(())
}

pub async fn check(flow: &Bootstrap) -> Result<()> {
    match flow.check_latest().await? {
        UpdateCheck::UpToDate => println!("Up to date ({})", flow.running_version()),
        UpdateCheck::Available(release) => println!(
            "Update available: {} -> {}",
            flow.running_version(),
            release.tag
        ),
    }
    Ok(())
}

pub async fn update(flow: &Bootstrap) -> Result<()> {
    let release = match flow.check_latest().await? {
        UpdateCheck::UpToDate => {
            println!("Up to date ({})", flow.running_version());
            return Ok(());
        }
        UpdateCheck::Available(release) => release,
    };

    let handoff = flow.apply_update(&release, spawn_detached).await?;
    println!(
        "Installing {} and restarting (helper pid {})",
        handoff.version, handoff.helper_pid
    );
    Ok(())
}

pub fn launch(flow: &Bootstrap) -> Result<()> {
    let launched = flow.launch()?;
    info!("Payload started with pid {}", launched.pid);
    Ok(())
}

pub fn status(flow: &Bootstrap) -> Result<()> {
    let layout = flow.layout();
    println!("Version:     {}", flow.running_version());
    println!("Root:        {}", layout.root.display());
    println!("Launcher:    {}", layout.launcher_exe.display());
    println!("Payload:     {}", layout.payload_exe.display());
    println!("Environment: {}", flow.environment_state());
    println!("Updates:     {}", flow.config().updates.mode);

    match UpdateStatus::read(&layout.status_file) {
        Some(last) => println!("Last update:\n{}", format_update_status(&last)),
        None => println!("Last update: none recorded"),
    }
    if layout.staging_dir.exists() {
        println!("Staging:     {} (pending or failed swap)", layout.staging_dir.display());
    }
    Ok(())
}

fn format_update_status(status: &UpdateStatus) -> String {
    let mut lines = vec![
        format!("  result:   {}", if status.success { "success" } else { "failed" }),
        format!("  version:  {} -> {}", status.previous_version, status.version),
        format!("  at:       {}", status.timestamp.to_rfc3339()),
    ];
    if let Some(error) = &status.error {
        lines.push(format!("  error:    {error}"));
    }
    if let Some(log) = &status.log_file {
        lines.push(format!("  log:      {}", log.display()));
    }
    lines.join("\n")
}

fn report_previous_update(previous: &UpdateStatus) {
    if previous.success {
        eprintln!(
            "Updated from {} to {}",
            previous.previous_version, previous.version
        );
        return;
    }

    let error = previous.error.as_deref().unwrap_or("unknown error");
    eprintln!("The last update did not complete: {error}");
    if let Some(log) = &previous.log_file {
        eprintln!("Details: {}", log.display());
    }
}
