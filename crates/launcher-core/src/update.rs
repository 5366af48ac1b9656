//! Update orchestration: stage the new launcher and hand off to the helper.
//!
//! Steps 1 to 3 only write inside the staging directory and can be rerun
//! from scratch after a crash. Step 4 starts the helper; after that the
//! calling process must exit without touching the installation again.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use crate::config::LauncherConfig;
use crate::error::{LauncherError, Result};
use crate::layout::InstallationLayout;
use crate::release::ReleaseDescriptor;
use crate::status::StatusSender;
use crate::steps::download::{Downloader, ProgressBand};
use crate::steps::verify::{sha256_file, verify_file};
use crate::swap::HandoffPlan;

/// Issued once the helper is running; the caller must now exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffRequest {
    /// Process id of the started helper.
    pub helper_pid: u32,
    /// Plan the helper is executing.
    pub plan_path: PathBuf,
    /// Version being installed.
    pub version: String,
}

/// Downloads, stages and hands off one update.
#[derive(Debug, Clone)]
pub struct UpdateOrchestrator {
    layout: InstallationLayout,
    config: LauncherConfig,
    running_version: String,
    helper_source: PathBuf,
    relaunch_args: Vec<String>,
    status: StatusSender,
}

impl UpdateOrchestrator {
    /// Creates an orchestrator for the launcher in `layout`.
    pub fn new(
        layout: InstallationLayout,
        config: LauncherConfig,
        running_version: impl Into<String>,
        status: StatusSender,
    ) -> Self {
        Self {
            helper_source: layout.helper_exe.clone(),
            layout,
            config,
            running_version: running_version.into(),
            relaunch_args: Vec::new(),
            status,
        }
    }

    /// Uses the helper at `path` instead of the one in the installation root.
    #[must_use]
    pub fn with_helper_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.helper_source = path.into();
        self
    }

    /// Arguments the relaunched launcher receives.
    #[must_use]
    pub fn with_relaunch_args(mut self, args: Vec<String>) -> Self {
        self.relaunch_args = args;
        self
    }

    /// Stages `descriptor` and starts the helper through `spawn`.
    ///
    /// The existing launcher is never modified here. On error the staging
    /// directory may hold leftovers, which the next attempt overwrites.
    pub async fn perform_update(
        &self,
        descriptor: &ReleaseDescriptor,
        spawn: impl FnOnce(&mut Command) -> io::Result<u32>,
    ) -> Result<HandoffRequest> {
        tracing::info!(
            "Updating launcher {} -> {}",
            self.running_version,
            descriptor.tag
        );

        // 1. Staging
        self.status.progress("Preparing update...", 0);
        fs::create_dir_all(&self.layout.staging_dir).map_err(|e| {
            LauncherError::Io(format!(
                "failed to create staging directory {}: {e}",
                self.layout.staging_dir.display()
            ))
        })?;

        // 2. Download and verify
        let asset = descriptor.select_asset(self.config.updates.asset_name.as_deref())?;
        Downloader::new(self.config.updates.download_timeout())?
            .download_to_file(
                &asset.download_url,
                &self.layout.staged_binary,
                &self.status,
                ProgressBand { start: 5, end: 85 },
            )
            .await?;

        self.status.progress("Verifying download...", 90);
        let staged_sha256 =
            match verify_file(&self.layout.staged_binary, asset.digest.as_deref()) {
                Ok(Some(verified)) => verified,
                Ok(None) => sha256_file(&self.layout.staged_binary)?,
                Err(e) => {
                    if let Err(cleanup) = fs::remove_file(&self.layout.staged_binary) {
                        tracing::warn!(
                            "Failed to remove rejected download {}: {cleanup}",
                            self.layout.staged_binary.display()
                        );
                    }
                    return Err(e);
                }
            };
        make_executable(&self.layout.staged_binary)?;

        // 3. Plan and helper
        if !self.helper_source.is_file() {
            return Err(LauncherError::HelperNotFound(self.helper_source.clone()));
        }
        fs::copy(&self.helper_source, &self.layout.staged_helper).map_err(|e| {
            LauncherError::HelperFailed(format!(
                "failed to stage helper {}: {e}",
                self.helper_source.display()
            ))
        })?;

        let plan = HandoffPlan::new(
            &self.layout,
            &self.config.swap,
            descriptor.tag.as_str(),
            self.running_version.as_str(),
        )
        .with_relaunch_args(self.relaunch_args.clone())
        .with_staged_sha256(staged_sha256);
        plan.write(&self.layout.handoff_plan)?;

        // 4. Handoff
        self.status.progress("Restarting to apply update...", 100);
        let mut command = Command::new(&self.layout.staged_helper);
        command
            .arg(&self.layout.handoff_plan)
            .current_dir(&self.layout.staging_dir);
        let helper_pid = spawn(&mut command).map_err(|e| {
            LauncherError::HelperFailed(format!(
                "failed to start {}: {e}",
                self.layout.staged_helper.display()
            ))
        })?;

        tracing::info!("Handed off to helper (pid {})", helper_pid);
        Ok(HandoffRequest {
            helper_pid,
            plan_path: self.layout.handoff_plan.clone(),
            version: descriptor.tag.clone(),
        })
    }
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}
