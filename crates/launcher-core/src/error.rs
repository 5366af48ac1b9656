//! Error types for environment preparation, updates and payload launch.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur anywhere in the launcher.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LauncherError {
    /// Failed to parse a version string.
    #[error("invalid version format: {0}")]
    InvalidVersion(String),

    /// Network request failed (connection, timeout, non-success status).
    #[error("network error: {0}")]
    Network(String),

    /// Release API rate limit exceeded.
    #[error("GitHub API rate limit exceeded, retry after {retry_after} seconds")]
    RateLimited {
        /// Seconds until the rate limit resets.
        retry_after: u64,
    },

    /// Failed to parse a JSON document (release feed, handoff plan, status file).
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// The release lists no usable asset.
    #[error("no release asset found: {0}")]
    NoAssetFound(String),

    /// SHA256 checksum verification failed.
    #[error("checksum verification failed: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Expected SHA256 hash from the release feed.
        expected: String,
        /// Actual SHA256 hash of the downloaded file.
        actual: String,
    },

    /// Zip extraction failed.
    #[error("archive extraction error: {0}")]
    ArchiveExtraction(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Optional runtime could not be provisioned.
    #[error("runtime provisioning error: {0}")]
    RuntimeProvisioning(String),

    /// The swap helper executable is missing next to the launcher.
    #[error("update helper not found at {}", .0.display())]
    HelperNotFound(PathBuf),

    /// The swap helper could not be staged or started.
    #[error("update helper failed: {0}")]
    HelperFailed(String),

    /// Replacing the launcher binary failed.
    #[error("swap error: {0}")]
    Swap(String),

    /// The payload executable does not exist.
    #[error("payload executable not found at {}", .0.display())]
    PayloadNotFound(PathBuf),

    /// The payload executable exists but could not be started.
    #[error("failed to launch payload: {0}")]
    Launch(String),
}

impl LauncherError {
    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Network(_) => {
                "Could not reach the update server. Please check your internet connection."
            }
            Self::RateLimited { .. } => "Update server rate limit reached. Please try again later.",
            Self::ChecksumMismatch { .. } => {
                "Security verification failed. The download may have been tampered with."
            }
            Self::NoAssetFound(_) => "The latest release has no launcher download.",
            Self::ArchiveExtraction(_) => "Could not extract the application files.",
            Self::Config(_) => "The launcher configuration is invalid.",
            Self::RuntimeProvisioning(_) => "Could not install the required runtime.",
            Self::HelperNotFound(_) | Self::HelperFailed(_) | Self::Swap(_) => {
                "Could not install the update. Please try again."
            }
            Self::PayloadNotFound(_) => "Application not found.",
            Self::Launch(_) => "Failed to launch the application.",
            Self::InvalidVersion(_) | Self::Io(_) | Self::JsonParse(_) => {
                "An unexpected error occurred."
            }
        }
    }

    /// Returns whether this error is potentially recoverable with a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::Io(_)
        )
    }

    /// Tags this error with the phase it occurred in.
    #[must_use]
    pub fn during(self, kind: FailureKind) -> PhaseError {
        PhaseError { kind, error: self }
    }
}

impl From<reqwest::Error> for LauncherError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LauncherError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse(err.to_string())
    }
}

impl From<zip::result::ZipError> for LauncherError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::ArchiveExtraction(err.to_string())
    }
}

impl From<toml::de::Error> for LauncherError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for launcher operations.
pub type Result<T> = std::result::Result<T, LauncherError>;

/// The failure classes a user can observe.
///
/// Mandatory steps (configuration, environment preparation) halt the flow;
/// update failures are contained and never make the payload unlaunchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Configuration could not be loaded.
    Config,
    /// Extraction or runtime provisioning failed; launching is disabled.
    EnvironmentPrep,
    /// The release feed could not be queried or parsed.
    UpdateCheck,
    /// Download, staging or handoff failed; prior install stays launchable.
    UpdateApply,
    /// The payload executable is missing.
    PayloadNotFound,
    /// The payload executable could not be started.
    Launch,
}

impl FailureKind {
    /// Process exit code for this failure class.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Config => 2,
            Self::EnvironmentPrep => 3,
            Self::UpdateCheck => 4,
            Self::UpdateApply => 5,
            Self::PayloadNotFound => 6,
            Self::Launch => 7,
        }
    }

    /// Machine-readable tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::EnvironmentPrep => "environment_prep",
            Self::UpdateCheck => "update_check",
            Self::UpdateApply => "update_apply",
            Self::PayloadNotFound => "payload_not_found",
            Self::Launch => "launch",
        }
    }

    /// Whether the payload can still be launched after this failure.
    #[must_use]
    pub const fn keeps_launch_available(self) -> bool {
        matches!(self, Self::UpdateCheck | Self::UpdateApply)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error tagged with the failure class it belongs to.
#[derive(Debug, Error)]
#[error("{kind}: {error}")]
pub struct PhaseError {
    /// Failure class.
    pub kind: FailureKind,
    /// Underlying error.
    #[source]
    pub error: LauncherError,
}

impl PhaseError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// Single-line JSON report for standard error.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "error": self.kind.as_str(),
            "message": self.error.user_message(),
            "detail": self.error.to_string(),
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = LauncherError::Network("connection refused".to_string());
        assert!(err.user_message().contains("internet connection"));

        let err = LauncherError::PayloadNotFound(PathBuf::from("/tmp/x"));
        assert_eq!(err.user_message(), "Application not found.");
    }

    #[test]
    fn test_retryable() {
        assert!(LauncherError::Network("timeout".to_string()).is_retryable());
        assert!(LauncherError::RateLimited { retry_after: 60 }.is_retryable());
        assert!(!LauncherError::Swap("locked".to_string()).is_retryable());
    }

    #[test]
    fn test_exit_codes_are_distinct_and_nonzero() {
        let kinds = [
            FailureKind::Config,
            FailureKind::EnvironmentPrep,
            FailureKind::UpdateCheck,
            FailureKind::UpdateApply,
            FailureKind::PayloadNotFound,
            FailureKind::Launch,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(|k| k.exit_code()).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_phase_error_json() {
        let err = LauncherError::ArchiveExtraction("bad zip".to_string())
            .during(FailureKind::EnvironmentPrep);
        let json: serde_json::Value = serde_json::from_str(&err.to_json()).unwrap();
        assert_eq!(json["error"], "environment_prep");
        assert!(json["detail"].as_str().unwrap().contains("bad zip"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_update_failures_keep_launch_available() {
        assert!(FailureKind::UpdateCheck.keeps_launch_available());
        assert!(FailureKind::UpdateApply.keeps_launch_available());
        assert!(!FailureKind::EnvironmentPrep.keeps_launch_available());
    }
}
