//! Payload archive extraction.
//!
//! Extraction never writes into the final directory directly: entries go to
//! a sibling `.partial` directory which is renamed onto the target once every
//! entry is on disk. A crash leaves either the old state or a stray partial
//! directory, never a half-populated target.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use crate::error::{LauncherError, Result};
use crate::layout::{EnvironmentState, InstallationLayout};
use crate::status::StatusSender;

/// Outcome of the idempotent payload step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The payload directory already existed; nothing was touched.
    AlreadyPresent,
    /// The archive was extracted.
    Extracted {
        /// Number of files written.
        files: usize,
    },
}

/// Extracts a zip archive into `target_dir`, replacing whatever is there.
///
/// Returns the number of files written.
pub fn extract_zip(data: &[u8], target_dir: &Path) -> Result<usize> {
    let parent = target_dir.parent().ok_or_else(|| {
        LauncherError::ArchiveExtraction(format!(
            "target {} has no parent directory",
            target_dir.display()
        ))
    })?;
    let dir_name = target_dir
        .file_name()
        .map_or_else(|| "payload".into(), |n| n.to_string_lossy());
    fs::create_dir_all(parent)?;

    let partial = tempfile::Builder::new()
        .prefix(&format!(".{dir_name}.partial-"))
        .tempdir_in(parent)
        .map_err(|e| {
            LauncherError::ArchiveExtraction(format!("failed to create staging directory: {e}"))
        })?;

    let files = extract_entries(data, partial.path())?;

    if target_dir.exists() {
        tracing::debug!("Removing existing {}", target_dir.display());
        fs::remove_dir_all(target_dir)?;
    }

    // From here on the directory is moved by hand, not dropped.
    let partial = partial.keep();
    if let Err(e) = fs::rename(&partial, target_dir) {
        if let Err(cleanup) = fs::remove_dir_all(&partial) {
            tracing::warn!("Failed to remove {}: {cleanup}", partial.display());
        }
        return Err(LauncherError::ArchiveExtraction(format!(
            "failed to move extracted files into {}: {e}",
            target_dir.display()
        )));
    }

    tracing::info!("Extracted {} files into {}", files, target_dir.display());
    Ok(files)
}

fn extract_entries(data: &[u8], dest: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut files = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative: PathBuf = entry.enclosed_name().ok_or_else(|| {
            LauncherError::ArchiveExtraction(format!("unsafe entry path: {}", entry.name()))
        })?;
        let out_path = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out).map_err(|e| {
            LauncherError::ArchiveExtraction(format!("failed to write {}: {e}", relative.display()))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o777))?;
            }
        }

        files += 1;
    }

    Ok(files)
}

/// Ensures the payload is extracted.
///
/// A present payload directory means extraction already happened and
/// nothing is done.
pub fn ensure_payload(
    layout: &InstallationLayout,
    archive: &Path,
    status: &StatusSender,
) -> Result<ExtractOutcome> {
    if EnvironmentState::detect(layout) == EnvironmentState::Prepared {
        tracing::debug!("Payload already present at {}", layout.payload_dir.display());
        return Ok(ExtractOutcome::AlreadyPresent);
    }

    if !archive.is_file() {
        return Err(LauncherError::ArchiveExtraction(format!(
            "payload archive not found: {}",
            archive.display()
        )));
    }

    status.status("Extracting applications...");
    let data = fs::read(archive).map_err(|e| {
        LauncherError::ArchiveExtraction(format!(
            "payload archive {} unreadable: {e}",
            archive.display()
        ))
    })?;
    let files = extract_zip(&data, &layout.payload_dir)?;
    Ok(ExtractOutcome::Extracted { files })
}
