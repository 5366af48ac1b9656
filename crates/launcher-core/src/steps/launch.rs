//! Payload launch.

use std::io;
use std::path::Path;
use std::process::Command;

use crate::error::{LauncherError, Result};
use crate::process::spawn_detached;

/// A started payload process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchedPayload {
    /// OS process id.
    pub pid: u32,
}

/// Starts the payload detached from the launcher.
pub fn launch_payload(exe: &Path, args: &[String]) -> Result<LaunchedPayload> {
    launch_payload_with(exe, args, spawn_detached)
}

/// Starts the payload through `spawn`, which receives the fully configured
/// command and returns the new process id.
pub fn launch_payload_with(
    exe: &Path,
    args: &[String],
    spawn: impl FnOnce(&mut Command) -> io::Result<u32>,
) -> Result<LaunchedPayload> {
    if !exe.is_file() {
        tracing::error!("Payload executable missing: {}", exe.display());
        return Err(LauncherError::PayloadNotFound(exe.to_path_buf()));
    }

    let mut command = Command::new(exe);
    command.args(args);
    if let Some(dir) = exe.parent() {
        command.current_dir(dir);
    }

    tracing::info!("Launching {} {:?}", exe.display(), args);
    let pid = spawn(&mut command)
        .map_err(|e| LauncherError::Launch(format!("{}: {e}", exe.display())))?;

    tracing::info!("Payload started (pid {})", pid);
    Ok(LaunchedPayload { pid })
}
