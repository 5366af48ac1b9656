//! Launcher configuration.
//!
//! Every field has a default, so a missing `launcher.toml` yields a working
//! launcher. Values are normally baked in by whoever ships the launcher and
//! only overridden for testing or portable installs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LauncherError, Result};
use crate::version::VersionPolicy;

/// File name looked up in the installation root when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "launcher.toml";

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Whether and how updates are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Ask before applying an available update.
    #[default]
    Prompt,
    /// Apply available updates without asking.
    Auto,
    /// Never check for updates.
    Off,
}

impl UpdateMode {
    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Auto => "auto",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Top-level launcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Product name; names the per-user data directory.
    pub product_name: String,
    /// File name of the launcher executable inside the installation root.
    pub launcher_file_name: String,
    /// File name of the swap helper shipped next to the launcher.
    pub helper_file_name: String,
    /// Bundled payload application.
    pub payload: PayloadSettings,
    /// Release feed and update behaviour.
    pub updates: UpdateSettings,
    /// Swap helper tuning.
    pub swap: SwapSettings,
    /// Optional runtime provisioning.
    pub runtime: RuntimeSettings,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            product_name: "AppLauncher".to_string(),
            launcher_file_name: executable_name("app-launcher"),
            helper_file_name: executable_name("app-launcher-helper"),
            payload: PayloadSettings::default(),
            updates: UpdateSettings::default(),
            swap: SwapSettings::default(),
            runtime: RuntimeSettings::default(),
        }
    }
}

impl LauncherConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LauncherError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist. Otherwise `launcher.toml` in `root` is
    /// used when present, and defaults when it is not.
    pub fn load(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!("Loading configuration from {}", candidate.display());
            Self::from_file(&candidate)
        } else {
            tracing::debug!("No {CONFIG_FILE_NAME} in {}, using defaults", root.display());
            Ok(Self::default())
        }
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        let plain_name = |field: &str, value: &str| {
            if value.is_empty() || value.contains(['/', '\\']) || value == "." || value == ".." {
                Err(LauncherError::Config(format!(
                    "{field} must be a plain file name, got {value:?}"
                )))
            } else {
                Ok(())
            }
        };
        plain_name("product_name", &self.product_name)?;
        plain_name("launcher_file_name", &self.launcher_file_name)?;
        plain_name("helper_file_name", &self.helper_file_name)?;
        plain_name("payload.name", &self.payload.name)?;

        let (owner, repo) = self
            .updates
            .repository
            .split_once('/')
            .ok_or_else(|| {
                LauncherError::Config(format!(
                    "updates.repository must be \"owner/name\", got {:?}",
                    self.updates.repository
                ))
            })?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(LauncherError::Config(format!(
                "updates.repository must be \"owner/name\", got {:?}",
                self.updates.repository
            )));
        }

        if self.swap.move_attempts == 0 {
            return Err(LauncherError::Config(
                "swap.move_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolves the per-user installation root (`<local data dir>/<product>`).
    pub fn default_root(&self) -> Result<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.data_local_dir().join(&self.product_name))
            .ok_or_else(|| {
                LauncherError::Config("could not determine the local data directory".to_string())
            })
    }
}

/// Bundled payload application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadSettings {
    /// Directory name under `Apps/`.
    pub name: String,
    /// Executable path relative to the payload directory.
    pub executable: PathBuf,
    /// Arguments marking launcher-managed mode.
    pub args: Vec<String>,
    /// Zip archive holding the payload. Defaults to `<name>.zip` next to the
    /// running launcher.
    pub archive: Option<PathBuf>,
}

impl Default for PayloadSettings {
    fn default() -> Self {
        Self {
            name: "PayloadApp".to_string(),
            executable: PathBuf::from(executable_name("PayloadApp")),
            args: vec!["--master".to_string()],
            archive: None,
        }
    }
}

/// Release feed and update behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    /// GitHub repository publishing launcher releases, as `owner/name`.
    pub repository: String,
    /// API base URL.
    pub api_base: String,
    /// Whether and how updates are applied.
    pub mode: UpdateMode,
    /// Tag comparison policy.
    pub version_policy: VersionPolicy,
    /// Asset file name to download. The first asset is used when unset.
    pub asset_name: Option<String>,
    /// Timeout for the release check, in seconds.
    pub check_timeout_secs: u64,
    /// Timeout for the whole binary download, in seconds.
    pub download_timeout_secs: u64,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            repository: "app-launcher/app-launcher".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            mode: UpdateMode::default(),
            version_policy: VersionPolicy::default(),
            asset_name: None,
            check_timeout_secs: 15,
            download_timeout_secs: 300,
        }
    }
}

impl UpdateSettings {
    /// Release check timeout.
    #[must_use]
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    /// Download timeout.
    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// Swap helper tuning, copied into each handoff plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapSettings {
    /// How long the helper waits for the launcher to exit before killing it.
    pub grace_period_ms: u64,
    /// Maximum attempts to move the new binary into place.
    pub move_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub initial_backoff_ms: u64,
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            grace_period_ms: 3_000,
            move_attempts: 8,
            initial_backoff_ms: 250,
        }
    }
}

/// Optional runtime provisioning, disabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Whether the runtime step runs at all.
    pub enabled: bool,
    /// Command that lists installed runtimes.
    pub detect_command: String,
    /// Arguments for `detect_command`.
    pub detect_args: Vec<String>,
    /// Text that must appear in the command output.
    pub required_marker: String,
    /// Seconds to wait for `detect_command` before treating the runtime as missing.
    pub detect_timeout_secs: u64,
    /// Local zip archive with the runtime; preferred over `download_url`.
    pub archive: Option<PathBuf>,
    /// Download URL of a zip archive with the runtime.
    pub download_url: Option<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            detect_command: "dotnet".to_string(),
            detect_args: vec!["--list-runtimes".to_string()],
            required_marker: "Microsoft.NETCore.App 6.".to_string(),
            detect_timeout_secs: 10,
            archive: None,
            download_url: None,
        }
    }
}

impl RuntimeSettings {
    /// How long `detect_command` may run.
    #[must_use]
    pub fn detect_timeout(&self) -> Duration {
        Duration::from_secs(self.detect_timeout_secs)
    }
}

/// Appends the platform executable suffix.
#[must_use]
pub fn executable_name(stem: &str) -> String {
    format!("{stem}{}", std::env::consts::EXE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LauncherConfig::default();
        config.validate().unwrap();
        assert_eq!(config.updates.mode, UpdateMode::Prompt);
        assert_eq!(config.updates.version_policy, VersionPolicy::Distinct);
        assert!(!config.runtime.enabled);
        assert_eq!(config.payload.args, vec!["--master".to_string()]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LauncherConfig::from_toml(
            r#"
            product_name = "Contoso"

            [updates]
            repository = "contoso/launcher"
            mode = "auto"
            version_policy = "newer"
            asset_name = "Launcher.exe"
            "#,
        )
        .unwrap();

        assert_eq!(config.product_name, "Contoso");
        assert_eq!(config.updates.mode, UpdateMode::Auto);
        assert_eq!(config.updates.version_policy, VersionPolicy::Newer);
        assert_eq!(config.updates.asset_name.as_deref(), Some("Launcher.exe"));
        assert_eq!(config.updates.api_base, DEFAULT_API_BASE);
        assert_eq!(config.swap.move_attempts, 8);
    }

    #[test]
    fn test_invalid_repository_rejected() {
        let err = LauncherConfig::from_toml("[updates]\nrepository = \"no-slash\"").unwrap_err();
        assert!(matches!(err, LauncherError::Config(_)));
    }

    #[test]
    fn test_path_like_names_rejected() {
        let err = LauncherConfig::from_toml("product_name = \"../evil\"").unwrap_err();
        assert!(matches!(err, LauncherError::Config(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LauncherConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.product_name, "AppLauncher");
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(LauncherConfig::load(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_load_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[payload]\nname = \"Other\"\nargs = []\n",
        )
        .unwrap();
        let config = LauncherConfig::load(None, dir.path()).unwrap();
        assert_eq!(config.payload.name, "Other");
        assert!(config.payload.args.is_empty());
    }
}
