//! Optional runtime provisioning.

use std::fs;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::RuntimeSettings;
use crate::error::{LauncherError, Result};
use crate::layout::InstallationLayout;
use crate::status::StatusSender;
use crate::steps::download::{Downloader, ProgressBand};
use crate::steps::extract::extract_zip;

/// Outcome of the runtime step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeOutcome {
    /// Provisioning is turned off.
    Disabled,
    /// The runtime was found on the system or in the runtime directory.
    AlreadyInstalled,
    /// The runtime was extracted into the runtime directory.
    Provisioned {
        /// Number of files written.
        files: usize,
    },
}

/// Runs `detect_command` and looks for the required marker in its output.
///
/// A command that cannot be spawned, fails, or outlives
/// `detect_timeout_secs` means the runtime is not installed.
pub async fn detect_runtime(settings: &RuntimeSettings) -> bool {
    let mut command = Command::new(&settings.detect_command);
    command
        .args(&settings.detect_args)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(settings.detect_timeout(), command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::debug!("Runtime check {} failed: {e}", settings.detect_command);
            return false;
        }
        Err(_) => {
            tracing::warn!(
                "Runtime check {} gave no answer within {}s",
                settings.detect_command,
                settings.detect_timeout_secs
            );
            return false;
        }
    };

    output.status.success()
        && String::from_utf8_lossy(&output.stdout).contains(&settings.required_marker)
}

/// Ensures the runtime is available, looking for a system install with
/// [`detect_runtime`].
pub async fn ensure_runtime(
    layout: &InstallationLayout,
    settings: &RuntimeSettings,
    download_timeout: Duration,
    status: &StatusSender,
) -> Result<RuntimeOutcome> {
    ensure_runtime_with(
        layout,
        settings,
        download_timeout,
        status,
        detect_runtime(settings),
    )
    .await
}

/// Ensures the runtime is available, awaiting `system_install` only when
/// provisioning is enabled and the runtime directory is missing.
pub async fn ensure_runtime_with(
    layout: &InstallationLayout,
    settings: &RuntimeSettings,
    download_timeout: Duration,
    status: &StatusSender,
    system_install: impl Future<Output = bool>,
) -> Result<RuntimeOutcome> {
    if !settings.enabled {
        tracing::debug!("Runtime provisioning disabled");
        return Ok(RuntimeOutcome::Disabled);
    }
    if layout.runtime_dir.is_dir() {
        tracing::debug!("Runtime present at {}", layout.runtime_dir.display());
        return Ok(RuntimeOutcome::AlreadyInstalled);
    }
    if system_install.await {
        tracing::info!("Runtime {} found on system", settings.required_marker);
        return Ok(RuntimeOutcome::AlreadyInstalled);
    }

    status.status("Installing runtime...");
    let data = if let Some(archive) = &settings.archive {
        fs::read(archive).map_err(|e| {
            LauncherError::RuntimeProvisioning(format!(
                "runtime archive {} unreadable: {e}",
                archive.display()
            ))
        })?
    } else if let Some(url) = &settings.download_url {
        fs::create_dir_all(&layout.root)?;
        let scratch = tempfile::Builder::new()
            .prefix(".runtime-")
            .tempdir_in(&layout.root)?;
        let dest = scratch.path().join("runtime.zip");
        Downloader::new(download_timeout)?
            .download_to_file(url, &dest, status, ProgressBand { start: 0, end: 100 })
            .await?;
        fs::read(&dest)?
    } else {
        return Err(LauncherError::RuntimeProvisioning(
            "runtime missing and no archive or download URL configured".to_string(),
        ));
    };

    let files = extract_zip(&data, &layout.runtime_dir)?;
    tracing::info!("Runtime installed into {}", layout.runtime_dir.display());
    Ok(RuntimeOutcome::Provisioned { files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LauncherConfig;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn runtime_zip() -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            zip.start_file("dotnet.exe", SimpleFileOptions::default()).unwrap();
            zip.write_all(b"runtime").unwrap();
            zip.finish().unwrap();
        }
        buffer
    }

    fn enabled(archive: Option<std::path::PathBuf>) -> RuntimeSettings {
        RuntimeSettings {
            enabled: true,
            archive,
            ..RuntimeSettings::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallationLayout::new(dir.path(), &LauncherConfig::default());
        let outcome = ensure_runtime_with(
            &layout,
            &RuntimeSettings::default(),
            Duration::from_secs(1),
            &StatusSender::disabled(),
            async { true },
        )
        .await
        .unwrap();
        assert_eq!(outcome, RuntimeOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_system_runtime_skips_provisioning() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallationLayout::new(dir.path(), &LauncherConfig::default());
        let outcome = ensure_runtime_with(
            &layout,
            &enabled(None),
            Duration::from_secs(1),
            &StatusSender::disabled(),
            async { true },
        )
        .await
        .unwrap();
        assert_eq!(outcome, RuntimeOutcome::AlreadyInstalled);
        assert!(!layout.runtime_dir.exists());
    }

    #[tokio::test]
    async fn test_provisions_from_local_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("runtime.zip");
        fs::write(&archive, runtime_zip()).unwrap();
        let layout = InstallationLayout::new(dir.path().join("root"), &LauncherConfig::default());

        let outcome = ensure_runtime_with(
            &layout,
            &enabled(Some(archive)),
            Duration::from_secs(1),
            &StatusSender::disabled(),
            async { false },
        )
        .await
        .unwrap();

        assert_eq!(outcome, RuntimeOutcome::Provisioned { files: 1 });
        assert_eq!(fs::read(layout.runtime_dir.join("dotnet.exe")).unwrap(), b"runtime");
    }

    #[tokio::test]
    async fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallationLayout::new(dir.path(), &LauncherConfig::default());
        let result = ensure_runtime_with(
            &layout,
            &enabled(None),
            Duration::from_secs(1),
            &StatusSender::disabled(),
            async { false },
        )
        .await;
        assert!(matches!(result, Err(LauncherError::RuntimeProvisioning(_))));
    }

    #[tokio::test]
    async fn test_unspawnable_command_means_missing() {
        let settings = RuntimeSettings {
            detect_command: "definitely-not-a-real-runtime-command".to_string(),
            ..RuntimeSettings::default()
        };
        assert!(!detect_runtime(&settings).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_marker_in_output_means_installed() {
        let settings = RuntimeSettings {
            detect_command: "echo".to_string(),
            detect_args: vec!["Microsoft.NETCore.App 6.0.36 [/usr/share/dotnet]".to_string()],
            ..RuntimeSettings::default()
        };
        assert!(detect_runtime(&settings).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_command_is_cut_off() {
        let settings = RuntimeSettings {
            detect_command: "sleep".to_string(),
            detect_args: vec!["30".to_string()],
            detect_timeout_secs: 1,
            ..RuntimeSettings::default()
        };
        let started = std::time::Instant::now();
        assert!(!detect_runtime(&settings).await);
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
