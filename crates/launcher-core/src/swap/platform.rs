//! The real operating system behind [`SwapPlatform`].

use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use sysinfo::{Pid, System};

use super::SwapPlatform;
use crate::process::spawn_detached;

/// Process table, filesystem and process spawning of the host.
pub struct SystemPlatform {
    system: System,
}

impl SystemPlatform {
    /// Creates a platform with an empty process snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SwapPlatform for SystemPlatform {
    fn is_running(&mut self, pid: u32) -> bool {
        self.system.refresh_process(Pid::from_u32(pid))
    }

    fn terminate(&mut self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        if !self.system.refresh_process(pid) {
            return true;
        }
        match self.system.process(pid) {
            Some(process) => {
                tracing::info!("Killing {} (pid {})", process.name(), pid);
                process.kill()
            }
            None => true,
        }
    }

    fn move_file(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                tracing::debug!("Rename crosses devices, copying instead");
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
            Err(e) => Err(e),
        }
    }

    fn launch(&mut self, exe: &Path, args: &[String]) -> io::Result<u32> {
        let mut command = Command::new(exe);
        command.args(args);
        if let Some(dir) = exe.parent() {
            command.current_dir(dir);
        }
        spawn_detached(&mut command)
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn delete_self(&mut self, staging_dir: &Path) -> io::Result<()> {
        self_replace::self_delete_outside_path(staging_dir)?;
        // On Windows the image is still mapped until exit; self-replace
        // removes it then, and this may leave the emptied directory behind.
        match fs::remove_dir_all(staging_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
