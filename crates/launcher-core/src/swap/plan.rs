//! Handoff plan: everything the helper needs, persisted into staging.
//!
//! The launcher and the helper share no memory. The plan file is the only
//! message passed between them, so it carries absolute paths and every
//! tuning value the helper would otherwise have to rediscover.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetryPolicy;
use crate::config::SwapSettings;
use crate::error::{LauncherError, Result};
use crate::layout::InstallationLayout;
use crate::steps::verify::sha256_file;

/// Instructions for one swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffPlan {
    /// Process id of the launcher that started the helper.
    pub parent_pid: u32,
    /// File name of that launcher process, for diagnostics.
    #[serde(default)]
    pub parent_name: String,
    /// Downloaded binary waiting in staging.
    pub staged_binary: PathBuf,
    /// Stable launcher path the staged binary replaces.
    pub launcher_exe: PathBuf,
    /// Staging directory removed after a successful swap.
    pub staging_dir: PathBuf,
    /// Arguments for the relaunched launcher.
    #[serde(default)]
    pub relaunch_args: Vec<String>,
    /// How long to wait for the parent before killing it.
    pub grace_period_ms: u64,
    /// Maximum attempts to move the staged binary into place.
    pub move_attempts: u32,
    /// Delay after the first failed move; doubles each time.
    pub initial_backoff_ms: u64,
    /// Version being installed.
    #[serde(default)]
    pub version: String,
    /// Version being replaced.
    #[serde(default)]
    pub previous_version: String,
    /// Where the helper records the outcome.
    pub status_file: PathBuf,
    /// Where the helper writes its log.
    pub logs_dir: PathBuf,
    /// SHA256 of the staged binary, to recognise a move that already happened.
    #[serde(default)]
    pub staged_sha256: Option<String>,
}

impl HandoffPlan {
    /// Builds a plan for replacing the launcher in `layout` with its staged
    /// binary, on behalf of the current process.
    #[must_use]
    pub fn new(
        layout: &InstallationLayout,
        swap: &SwapSettings,
        version: impl Into<String>,
        previous_version: impl Into<String>,
    ) -> Self {
        let parent_name = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();

        Self {
            parent_pid: std::process::id(),
            parent_name,
            staged_binary: layout.staged_binary.clone(),
            launcher_exe: layout.launcher_exe.clone(),
            staging_dir: layout.staging_dir.clone(),
            relaunch_args: Vec::new(),
            grace_period_ms: swap.grace_period_ms,
            move_attempts: swap.move_attempts,
            initial_backoff_ms: swap.initial_backoff_ms,
            version: version.into(),
            previous_version: previous_version.into(),
            status_file: layout.status_file.clone(),
            logs_dir: layout.logs_dir.clone(),
            staged_sha256: None,
        }
    }

    /// Sets the arguments the relaunched launcher receives.
    #[must_use]
    pub fn with_relaunch_args(mut self, args: Vec<String>) -> Self {
        self.relaunch_args = args;
        self
    }

    /// Records the hash of the staged binary.
    #[must_use]
    pub fn with_staged_sha256(mut self, hash: impl Into<String>) -> Self {
        self.staged_sha256 = Some(hash.into());
        self
    }

    /// Whether an earlier run already moved the staged binary into place.
    ///
    /// Only provable with a recorded hash: the staged file must be gone and
    /// the launcher must hash to the staged value.
    #[must_use]
    pub fn already_replaced(&self) -> bool {
        let Some(expected) = &self.staged_sha256 else {
            return false;
        };
        if self.staged_binary.exists() {
            return false;
        }
        match sha256_file(&self.launcher_exe) {
            Ok(actual) => actual.eq_ignore_ascii_case(expected),
            Err(e) => {
                tracing::debug!("Cannot hash {}: {e}", self.launcher_exe.display());
                false
            }
        }
    }

    /// Grace period before the parent is force-terminated.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Retry policy for the move step.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.move_attempts,
            Duration::from_millis(self.initial_backoff_ms),
        )
    }

    /// Reads a plan file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LauncherError::Io(format!("failed to read handoff plan {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes the plan to `path`, replacing any earlier plan atomically.
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = path.parent().ok_or_else(|| {
            LauncherError::Io(format!("handoff plan {} has no parent", path.display()))
        })?;
        let content = serde_json::to_string_pretty(self)?;

        let mut file = tempfile::Builder::new()
            .prefix(".handoff-")
            .tempfile_in(dir)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path)
            .map_err(|e| LauncherError::Io(format!("failed to write handoff plan: {}", e.error)))?;

        tracing::debug!("Handoff plan written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LauncherConfig;

    #[test]
    fn test_plan_from_layout() {
        let config = LauncherConfig::default();
        let layout = InstallationLayout::new("/data/AppLauncher", &config);
        let plan = HandoffPlan::new(&layout, &config.swap, "2.0.0", "1.0.0");

        assert_eq!(plan.parent_pid, std::process::id());
        assert_eq!(plan.staged_binary, layout.staged_binary);
        assert_eq!(plan.launcher_exe, layout.launcher_exe);
        assert_eq!(plan.grace_period(), Duration::from_secs(3));
        assert_eq!(plan.retry_policy().attempts(), 8);
        assert!(plan.relaunch_args.is_empty());
    }

    #[test]
    fn test_plan_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let config = LauncherConfig::default();
        let layout = InstallationLayout::new(dir.path(), &config);
        let plan = HandoffPlan::new(&layout, &config.swap, "2.0.0", "1.0.0")
            .with_relaunch_args(vec!["--root".into(), dir.path().display().to_string()]);

        let path = dir.path().join("handoff.json");
        plan.write(&path).unwrap();
        assert_eq!(HandoffPlan::from_file(&path).unwrap(), plan);
    }

    #[test]
    fn test_plan_tolerates_missing_optional_fields() {
        let json = r#"{
            "parent_pid": 42,
            "staged_binary": "/r/Update/app-launcher_new",
            "launcher_exe": "/r/app-launcher",
            "staging_dir": "/r/Update",
            "grace_period_ms": 10,
            "move_attempts": 2,
            "initial_backoff_ms": 1,
            "status_file": "/r/update_status.json",
            "logs_dir": "/r/logs"
        }"#;
        let plan: HandoffPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.parent_pid, 42);
        assert!(plan.version.is_empty());
        assert!(plan.staged_sha256.is_none());
        assert!(!plan.already_replaced());
    }
}
