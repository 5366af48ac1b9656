//! Startup flow: prepare the environment, look for an update, then either
//! hand off to the swap helper or make the payload launchable.
//!
//! Environment preparation is mandatory and its failures stop the flow.
//! Everything update-related is optional: its failures are reported but the
//! payload stays launchable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{LauncherConfig, UpdateMode};
use crate::error::{FailureKind, LauncherError, PhaseError, Result};
use crate::github::GitHubClient;
use crate::layout::{EnvironmentState, InstallationLayout};
use crate::release::ReleaseDescriptor;
use crate::status::StatusSender;
use crate::steps::check::{UpdateCheck, UpdateCheckOutcome, check_latest, check_silently};
use crate::steps::extract::{ExtractOutcome, ensure_payload};
use crate::steps::launch::{LaunchedPayload, launch_payload_with};
use crate::steps::runtime::{RuntimeOutcome, ensure_runtime};
use crate::update::{HandoffRequest, UpdateOrchestrator};
use crate::update_status::UpdateStatus;

/// What environment preparation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareReport {
    /// Outcome of the last swap, if the helper left one.
    pub previous_update: Option<UpdateStatus>,
    /// Runtime step.
    pub runtime: RuntimeOutcome,
    /// Payload step.
    pub payload: ExtractOutcome,
}

/// Where the startup flow ended.
#[derive(Debug)]
pub enum LaunchReadiness {
    /// The payload can be launched.
    Ready {
        /// A failed update attempt, reported but contained.
        update_error: Option<PhaseError>,
    },
    /// The helper is running; the process must exit now.
    RestartForUpdate(HandoffRequest),
}

impl LaunchReadiness {
    /// Whether the launch action is available.
    #[must_use]
    pub fn can_launch(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Result of [`Bootstrap::run`].
#[derive(Debug)]
pub struct RunOutcome {
    /// Environment preparation.
    pub prepared: PrepareReport,
    /// Update check result.
    pub check: UpdateCheckOutcome,
    /// Final state.
    pub readiness: LaunchReadiness,
}

/// The launcher's startup sequence for one installation.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    config: LauncherConfig,
    layout: InstallationLayout,
    running_version: String,
    payload_archive: PathBuf,
    helper_source: PathBuf,
    relaunch_args: Vec<String>,
    status: StatusSender,
}

impl Bootstrap {
    /// Creates the flow for the installation at `root`.
    ///
    /// The payload archive and helper default to files next to the running
    /// executable, falling back to the installation root.
    pub fn new(config: LauncherConfig, root: impl Into<PathBuf>, status: StatusSender) -> Self {
        let layout = InstallationLayout::new(root, &config);
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        let payload_archive = config.payload.archive.clone().unwrap_or_else(|| {
            let file = format!("{}.zip", config.payload.name);
            exe_dir
                .as_ref()
                .map(|dir| dir.join(&file))
                .filter(|path| path.is_file())
                .unwrap_or_else(|| layout.root.join(&file))
        });
        let helper_source = exe_dir
            .map(|dir| dir.join(&config.helper_file_name))
            .filter(|path| path.is_file())
            .unwrap_or_else(|| layout.helper_exe.clone());

        Self {
            config,
            layout,
            running_version: crate::VERSION.to_string(),
            payload_archive,
            helper_source,
            relaunch_args: Vec::new(),
            status,
        }
    }

    /// Overrides the version compared against the feed.
    #[must_use]
    pub fn with_running_version(mut self, version: impl Into<String>) -> Self {
        self.running_version = version.into();
        self
    }

    /// Overrides the payload archive location.
    #[must_use]
    pub fn with_payload_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.payload_archive = path.into();
        self
    }

    /// Overrides the helper executable copied into staging.
    #[must_use]
    pub fn with_helper_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.helper_source = path.into();
        self
    }

    /// Arguments the relaunched launcher receives after a swap.
    #[must_use]
    pub fn with_relaunch_args(mut self, args: Vec<String>) -> Self {
        self.relaunch_args = args;
        self
    }

    /// Installation paths.
    #[must_use]
    pub fn layout(&self) -> &InstallationLayout {
        &self.layout
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Version compared against the feed.
    #[must_use]
    pub fn running_version(&self) -> &str {
        &self.running_version
    }

    /// Payload archive extracted on first run.
    #[must_use]
    pub fn payload_archive(&self) -> &Path {
        &self.payload_archive
    }

    /// Current environment state.
    #[must_use]
    pub fn environment_state(&self) -> EnvironmentState {
        EnvironmentState::detect(&self.layout)
    }

    /// Prepares the environment. Safe to call repeatedly.
    pub async fn prepare(&self) -> std::result::Result<PrepareReport, PhaseError> {
        self.status.progress("Preparing environment...", 0);

        let previous_update = match UpdateStatus::take(&self.layout.status_file) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Could not consume update status: {e}");
                None
            }
        };
        if let Some(status) = &previous_update {
            if status.success {
                tracing::info!(
                    "Updated from {} to {}",
                    status.previous_version,
                    status.version
                );
            } else {
                tracing::warn!(
                    "Previous update to {} failed: {}",
                    status.version,
                    status.error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        let prep = |e: LauncherError| e.during(FailureKind::EnvironmentPrep);

        fs::create_dir_all(&self.layout.apps_dir)
            .map_err(|e| prep(LauncherError::from(e)))?;

        let runtime = ensure_runtime(
            &self.layout,
            &self.config.runtime,
            self.config.updates.download_timeout(),
            &self.status,
        )
        .await
        .map_err(prep)?;

        let payload = ensure_payload(&self.layout, &self.payload_archive, &self.status)
            .map_err(prep)?;

        self.status.progress("Environment ready", 100);
        Ok(PrepareReport {
            previous_update,
            runtime,
            payload,
        })
    }

    fn github_client(&self) -> Result<GitHubClient> {
        GitHubClient::new(
            self.config.updates.api_base.as_str(),
            self.config.updates.repository.as_str(),
            self.config.updates.check_timeout(),
        )
    }

    /// Queries the feed, surfacing failures.
    pub async fn check_latest(&self) -> std::result::Result<UpdateCheck, PhaseError> {
        let client = self
            .github_client()
            .map_err(|e| e.during(FailureKind::UpdateCheck))?;
        check_latest(
            &client,
            &self.running_version,
            self.config.updates.version_policy,
        )
        .await
        .map_err(|e| e.during(FailureKind::UpdateCheck))
    }

    /// Queries the feed, containing every failure.
    pub async fn check_updates(&self) -> UpdateCheckOutcome {
        self.status.status("Checking for updates...");
        let client = match self.github_client() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("Update check failed, continuing without update: {e}");
                return UpdateCheckOutcome::Ignored(e);
            }
        };
        check_silently(
            &client,
            &self.running_version,
            self.config.updates.version_policy,
        )
        .await
    }

    /// The orchestrator for this installation.
    #[must_use]
    pub fn orchestrator(&self) -> UpdateOrchestrator {
        UpdateOrchestrator::new(
            self.layout.clone(),
            self.config.clone(),
            self.running_version.as_str(),
            self.status.clone(),
        )
        .with_helper_source(self.helper_source.clone())
        .with_relaunch_args(self.relaunch_args.clone())
    }

    /// Stages `descriptor` and hands off to the helper.
    pub async fn apply_update(
        &self,
        descriptor: &ReleaseDescriptor,
        spawn: impl FnOnce(&mut Command) -> io::Result<u32>,
    ) -> std::result::Result<HandoffRequest, PhaseError> {
        self.orchestrator()
            .perform_update(descriptor, spawn)
            .await
            .map_err(|e| e.during(FailureKind::UpdateApply))
    }

    /// Runs the whole startup sequence.
    ///
    /// `confirm` is asked before applying an update in prompt mode; `spawn`
    /// starts the helper. Only environment preparation can fail this call.
    pub async fn run(
        &self,
        confirm: impl FnOnce(&ReleaseDescriptor) -> bool,
        spawn: impl FnOnce(&mut Command) -> io::Result<u32>,
    ) -> std::result::Result<RunOutcome, PhaseError> {
        let prepared = self.prepare().await?;

        let check = match self.config.updates.mode {
            UpdateMode::Off => {
                tracing::debug!("Update checks disabled");
                UpdateCheckOutcome::UpToDate
            }
            UpdateMode::Prompt | UpdateMode::Auto => self.check_updates().await,
        };

        let apply = match check.available() {
            Some(descriptor) => match self.config.updates.mode {
                UpdateMode::Auto => Some(descriptor),
                UpdateMode::Prompt => {
                    if confirm(descriptor) {
                        Some(descriptor)
                    } else {
                        tracing::info!("Update {} declined", descriptor.tag);
                        None
                    }
                }
                UpdateMode::Off => None,
            },
            None => None,
        };

        let readiness = match apply {
            Some(descriptor) => match self.apply_update(descriptor, spawn).await {
                Ok(handoff) => LaunchReadiness::RestartForUpdate(handoff),
                Err(e) => {
                    tracing::error!("Update failed, keeping current launcher: {e}");
                    LaunchReadiness::Ready {
                        update_error: Some(e),
                    }
                }
            },
            None => LaunchReadiness::Ready { update_error: None },
        };

        Ok(RunOutcome {
            prepared,
            check,
            readiness,
        })
    }

    /// Launches the payload through `spawn`.
    pub fn launch_with(
        &self,
        spawn: impl FnOnce(&mut Command) -> io::Result<u32>,
    ) -> std::result::Result<LaunchedPayload, PhaseError> {
        launch_payload_with(&self.layout.payload_exe, &self.config.payload.args, spawn).map_err(
            |e| {
                let kind = match e {
                    LauncherError::PayloadNotFound(_) => FailureKind::PayloadNotFound,
                    _ => FailureKind::Launch,
                };
                e.during(kind)
            },
        )
    }

    /// Launches the payload detached.
    pub fn launch(&self) -> std::result::Result<LaunchedPayload, PhaseError> {
        self.launch_with(crate::process::spawn_detached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootstrap(root: &Path) -> Bootstrap {
        let mut config = LauncherConfig::default();
        config.updates.mode = UpdateMode::Off;
        Bootstrap::new(config, root, StatusSender::disabled())
            .with_payload_archive(root.join("missing.zip"))
    }

    #[tokio::test]
    async fn test_missing_archive_is_environment_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = bootstrap(dir.path()).prepare().await.unwrap_err();
        assert_eq!(err.kind, FailureKind::EnvironmentPrep);
        assert!(!err.kind.keeps_launch_available());
    }

    #[tokio::test]
    async fn test_previous_failed_update_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let flow = bootstrap(dir.path());
        fs::create_dir_all(&flow.layout().payload_dir).unwrap();
        UpdateStatus::failure("2.0.0", "1.0.0", "locked", None)
            .write(&flow.layout().status_file)
            .unwrap();

        let first = flow.prepare().await.unwrap();
        assert_eq!(first.payload, ExtractOutcome::AlreadyPresent);
        assert!(!first.previous_update.unwrap().success);

        let second = flow.prepare().await.unwrap();
        assert!(second.previous_update.is_none());
    }

    #[tokio::test]
    async fn test_run_with_updates_off_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let flow = bootstrap(dir.path());
        fs::create_dir_all(&flow.layout().payload_dir).unwrap();

        let outcome = flow
            .run(|_| panic!("no prompt expected"), |_| panic!("no handoff expected"))
            .await
            .unwrap();

        assert!(outcome.readiness.can_launch());
        assert!(matches!(outcome.check, UpdateCheckOutcome::UpToDate));
    }

    #[test]
    fn test_launch_without_payload_is_payload_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = bootstrap(dir.path())
            .launch_with(|_| Ok(1))
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::PayloadNotFound);
        assert_eq!(err.exit_code(), 6);
    }
}
