//! Detached process spawning.
//!
//! The payload, the swap helper and the relaunched launcher must all outlive
//! the process that starts them, so none of them is spawned as an ordinary
//! child: they get their own process group, no inherited stdio, and on
//! Windows no console tied to ours.

use std::io;
use std::process::{Command, Stdio};

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Configures `command` to run independently of the current process.
pub fn detach(command: &mut Command) -> &mut Command {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    command
}

/// Spawns `command` detached and returns its process id.
///
/// The child handle is dropped without waiting, which neither kills nor
/// reaps the child.
pub fn spawn_detached(command: &mut Command) -> io::Result<u32> {
    let child = detach(command).spawn()?;
    Ok(child.id())
}
