//! On-disk installation layout.
//!
//! ```text
//! <root>/
//!   app-launcher[.exe]          stable launcher path, replaced in place by updates
//!   app-launcher-helper[.exe]   swap helper shipped with the launcher
//!   launcher.toml               optional configuration
//!   update_status.json          outcome of the last swap, consumed on next start
//!   logs/                       helper logs
//!   Apps/<PayloadName>/...      extracted payload
//!   dotnet/                     optional runtime
//!   Update/                     staging: new binary, handoff plan, helper copy
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{LauncherConfig, executable_name};

/// Directory holding extracted applications.
pub const APPS_DIR: &str = "Apps";
/// Directory holding the optional runtime.
pub const RUNTIME_DIR: &str = "dotnet";
/// Staging directory for downloaded updates.
pub const STAGING_DIR: &str = "Update";
/// Handoff plan file name inside staging.
pub const HANDOFF_PLAN_FILE: &str = "handoff.json";
/// Update status file name inside the root.
pub const STATUS_FILE: &str = "update_status.json";
/// Helper log directory name inside the root.
pub const LOGS_DIR: &str = "logs";

/// Fixed set of paths rooted at the per-user application-data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationLayout {
    /// Installation root.
    pub root: PathBuf,
    /// Stable launcher executable path.
    pub launcher_exe: PathBuf,
    /// Swap helper shipped next to the launcher.
    pub helper_exe: PathBuf,
    /// Parent of all payload directories.
    pub apps_dir: PathBuf,
    /// Extracted payload directory.
    pub payload_dir: PathBuf,
    /// Payload executable.
    pub payload_exe: PathBuf,
    /// Optional runtime directory.
    pub runtime_dir: PathBuf,
    /// Update staging directory.
    pub staging_dir: PathBuf,
    /// Downloaded, not yet active launcher binary.
    pub staged_binary: PathBuf,
    /// Copy of the helper the swap runs from.
    pub staged_helper: PathBuf,
    /// Persisted handoff plan.
    pub handoff_plan: PathBuf,
    /// Outcome of the last swap.
    pub status_file: PathBuf,
    /// Helper log directory.
    pub logs_dir: PathBuf,
}

impl InstallationLayout {
    /// Derives every path from `root` and the configured names.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: &LauncherConfig) -> Self {
        let root = root.into();
        let apps_dir = root.join(APPS_DIR);
        let payload_dir = apps_dir.join(&config.payload.name);
        let payload_exe = payload_dir.join(&config.payload.executable);
        let staging_dir = root.join(STAGING_DIR);

        let launcher_stem = Path::new(&config.launcher_file_name)
            .file_stem()
            .map_or_else(|| "launcher".to_string(), |s| s.to_string_lossy().into_owned());
        let staged_binary = staging_dir.join(executable_name(&format!("{launcher_stem}_new")));
        let staged_helper = staging_dir.join(&config.helper_file_name);

        Self {
            launcher_exe: root.join(&config.launcher_file_name),
            helper_exe: root.join(&config.helper_file_name),
            apps_dir,
            payload_dir,
            payload_exe,
            runtime_dir: root.join(RUNTIME_DIR),
            handoff_plan: staging_dir.join(HANDOFF_PLAN_FILE),
            staged_binary,
            staged_helper,
            staging_dir,
            status_file: root.join(STATUS_FILE),
            logs_dir: root.join(LOGS_DIR),
            root,
        }
    }
}

/// Whether the environment has been prepared.
///
/// Tracked only through directory existence: a present payload directory
/// means extraction already happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentState {
    /// Payload directory absent.
    NotPrepared,
    /// Payload directory present.
    Prepared,
}

impl EnvironmentState {
    /// Inspects the filesystem.
    #[must_use]
    pub fn detect(layout: &InstallationLayout) -> Self {
        if layout.payload_dir.is_dir() {
            Self::Prepared
        } else {
            Self::NotPrepared
        }
    }
}

impl fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPrepared => f.write_str("not prepared"),
            Self::Prepared => f.write_str("prepared"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let config = LauncherConfig::default();
        let layout = InstallationLayout::new("/data/AppLauncher", &config);

        assert_eq!(
            layout.payload_exe,
            Path::new("/data/AppLauncher/Apps/PayloadApp").join(executable_name("PayloadApp"))
        );
        assert_eq!(layout.staging_dir, Path::new("/data/AppLauncher/Update"));
        assert_eq!(
            layout.staged_binary,
            Path::new("/data/AppLauncher/Update").join(executable_name("app-launcher_new"))
        );
        assert_eq!(
            layout.launcher_exe,
            Path::new("/data/AppLauncher").join(executable_name("app-launcher"))
        );
        assert!(layout.handoff_plan.starts_with(&layout.staging_dir));
    }

    #[test]
    fn test_launcher_path_is_stable_across_versions() {
        // Only the root and names feed the path; nothing version-specific.
        let a = InstallationLayout::new("/r", &LauncherConfig::default());
        let b = InstallationLayout::new("/r", &LauncherConfig::default());
        assert_eq!(a.launcher_exe, b.launcher_exe);
    }

    #[test]
    fn test_environment_state_detect() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallationLayout::new(dir.path(), &LauncherConfig::default());
        assert_eq!(EnvironmentState::detect(&layout), EnvironmentState::NotPrepared);

        std::fs::create_dir_all(&layout.payload_dir).unwrap();
        assert_eq!(EnvironmentState::detect(&layout), EnvironmentState::Prepared);
    }
}
