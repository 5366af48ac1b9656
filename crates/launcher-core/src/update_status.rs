//! Update status file for post-update feedback.
//!
//! The helper outlives the launcher that started it, so the only way to tell
//! the user how a swap went is to leave a note for the next launcher start.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome of a swap, written by the helper and read by the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    /// Whether the new binary was moved into place.
    pub success: bool,
    /// Version that was installed (or attempted).
    pub version: String,
    /// Version that was running before.
    pub previous_version: String,
    /// When the helper finished.
    pub timestamp: DateTime<Utc>,
    /// Error message if failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Helper log file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl UpdateStatus {
    /// Creates a new successful status.
    pub fn success(
        version: impl Into<String>,
        previous_version: impl Into<String>,
        log_file: Option<PathBuf>,
    ) -> Self {
        Self {
            success: true,
            version: version.into(),
            previous_version: previous_version.into(),
            timestamp: Utc::now(),
            error: None,
            log_file,
        }
    }

    /// Creates a new failed status.
    pub fn failure(
        version: impl Into<String>,
        previous_version: impl Into<String>,
        error: impl Into<String>,
        log_file: Option<PathBuf>,
    ) -> Self {
        Self {
            success: false,
            version: version.into(),
            previous_version: previous_version.into(),
            timestamp: Utc::now(),
            error: Some(error.into()),
            log_file,
        }
    }

    /// Writes the status to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::info!("Update status written to {}", path.display());
        Ok(())
    }

    /// Reads the status at `path`, if any.
    ///
    /// An unreadable or malformed file counts as absent.
    #[must_use]
    pub fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!("Ignoring malformed update status {}: {e}", path.display());
                None
            }
        }
    }

    /// Reads and removes the status at `path`, so each outcome is reported once.
    pub fn take(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let status = Self::read(path);
        fs::remove_file(path)?;
        Ok(status)
    }
}
