//! Delayed self-replacement.
//!
//! A running executable cannot overwrite its own image, so the final move is
//! done by a helper process after the launcher has exited:
//!
//! ```text
//! Staged -> WaitingForParentExit -> Replacing -> Relaunched -> SelfCleaned
//!                                       |
//!                                       +-> Failed (old binary kept, staging kept)
//! ```
//!
//! Every step only touches the filesystem and is safe to repeat, so a helper
//! that dies halfway can be rerun with the same plan.

mod plan;
mod platform;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use plan::HandoffPlan;
pub use platform::SystemPlatform;

use crate::error::{LauncherError, Result};
use crate::update_status::UpdateStatus;

/// Interval between checks for the parent process.
const PARENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for a single backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Progress of one swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapState {
    /// New binary downloaded, helper not yet acting.
    Staged,
    /// Waiting for the launcher to exit.
    WaitingForParentExit,
    /// Moving the new binary into place.
    Replacing,
    /// New launcher started.
    Relaunched,
    /// Helper and staging removed.
    SelfCleaned,
    /// Gave up; the previous launcher is still in place.
    Failed,
}

impl fmt::Display for SwapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Staged => "staged",
            Self::WaitingForParentExit => "waiting for parent exit",
            Self::Replacing => "replacing",
            Self::Relaunched => "relaunched",
            Self::SelfCleaned => "self-cleaned",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    /// At least one attempt is always made.
    #[must_use]
    pub fn new(attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            initial_backoff,
        }
    }

    /// Total number of attempts.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay after the `failed_attempt`-th failure (1-based).
    #[must_use]
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(failed_attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

/// How the wait for the parent ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentExit {
    /// The parent exited on its own.
    Exited,
    /// The parent was killed after the grace period.
    Terminated,
    /// The parent could not be killed; the move step may still succeed.
    StillRunning,
}

/// Summary of a completed swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReport {
    /// How the parent went away.
    pub parent_exit: ParentExit,
    /// Move attempts used, including the successful one. Zero when an
    /// earlier run had already moved the binary.
    pub move_attempts: u32,
    /// Process id of the relaunched launcher, if it started.
    pub relaunched_pid: Option<u32>,
}

/// Operating-system services the swap needs.
pub trait SwapPlatform {
    /// Whether `pid` is alive.
    fn is_running(&mut self, pid: u32) -> bool;

    /// Kills `pid`. Returns `true` when the process is gone afterwards.
    fn terminate(&mut self, pid: u32) -> bool;

    /// Moves `from` onto `to`, replacing `to`.
    fn move_file(&mut self, from: &Path, to: &Path) -> io::Result<()>;

    /// Starts `exe` detached and returns its pid.
    fn launch(&mut self, exe: &Path, args: &[String]) -> io::Result<u32>;

    /// Blocks for `duration`.
    fn sleep(&mut self, duration: Duration);

    /// Removes the running helper and `staging_dir`.
    fn delete_self(&mut self, staging_dir: &Path) -> io::Result<()>;
}

/// Drives one swap through its states.
#[derive(Debug)]
pub struct SwapExecutor<P> {
    platform: P,
    state: SwapState,
    log_file: Option<PathBuf>,
}

impl<P: SwapPlatform> SwapExecutor<P> {
    /// Creates an executor in the `Staged` state.
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            state: SwapState::Staged,
            log_file: None,
        }
    }

    /// Records `log_file` in the status file.
    #[must_use]
    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SwapState {
        self.state
    }

    /// The platform, for inspection after a run.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Runs the swap described by `plan`.
    ///
    /// On failure the previous launcher stays in place, staging is kept and
    /// a failure status is written for the next launcher start.
    pub fn run(&mut self, plan: &HandoffPlan) -> Result<SwapReport> {
        self.transition(SwapState::Staged);
        let replaced_earlier = plan.already_replaced();
        if !replaced_earlier && !plan.staged_binary.is_file() {
            let error = LauncherError::Swap(format!(
                "staged binary not found: {}",
                plan.staged_binary.display()
            ));
            return Err(self.fail(plan, error));
        }

        self.transition(SwapState::WaitingForParentExit);
        let parent_exit = self.wait_for_parent(plan);

        self.transition(SwapState::Replacing);
        let move_attempts = if replaced_earlier {
            tracing::info!(
                "{} already holds the staged binary, skipping move",
                plan.launcher_exe.display()
            );
            0
        } else {
            match self.replace(plan) {
                Ok(attempts) => attempts,
                Err(error) => return Err(self.fail(plan, error)),
            }
        };

        let status = UpdateStatus::success(
            plan.version.as_str(),
            plan.previous_version.as_str(),
            self.log_file.clone(),
        );
        if let Err(e) = status.write(&plan.status_file) {
            tracing::warn!("Failed to write update status: {e}");
        }

        let relaunched_pid = match self.platform.launch(&plan.launcher_exe, &plan.relaunch_args)
        {
            Ok(pid) => {
                tracing::info!("Relaunched {} (pid {})", plan.launcher_exe.display(), pid);
                Some(pid)
            }
            Err(e) => {
                tracing::error!("Relaunch failed, update is installed: {e}");
                None
            }
        };
        self.transition(SwapState::Relaunched);

        if let Err(e) = self.platform.delete_self(&plan.staging_dir) {
            tracing::warn!(
                "Failed to remove staging {}: {e}",
                plan.staging_dir.display()
            );
        }
        self.transition(SwapState::SelfCleaned);

        Ok(SwapReport {
            parent_exit,
            move_attempts,
            relaunched_pid,
        })
    }

    fn transition(&mut self, next: SwapState) {
        tracing::debug!("Swap state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn wait_for_parent(&mut self, plan: &HandoffPlan) -> ParentExit {
        let pid = plan.parent_pid;
        tracing::info!(
            "Waiting for parent {} ({}) to exit",
            pid,
            plan.parent_name
        );

        let polls = plan
            .grace_period()
            .as_millis()
            .div_ceil(PARENT_POLL_INTERVAL.as_millis())
            .max(1);
        for _ in 0..polls {
            if !self.platform.is_running(pid) {
                tracing::info!("Parent process exited");
                return ParentExit::Exited;
            }
            self.platform.sleep(PARENT_POLL_INTERVAL);
        }
        if !self.platform.is_running(pid) {
            tracing::info!("Parent process exited");
            return ParentExit::Exited;
        }

        tracing::warn!(
            "Parent {} still running after {:?}, terminating",
            pid,
            plan.grace_period()
        );
        if self.platform.terminate(pid) {
            ParentExit::Terminated
        } else {
            tracing::warn!("Could not terminate parent {}", pid);
            ParentExit::StillRunning
        }
    }

    fn replace(&mut self, plan: &HandoffPlan) -> Result<u32> {
        let policy = plan.retry_policy();
        let mut last_error = None;

        for attempt in 1..=policy.attempts() {
            match self
                .platform
                .move_file(&plan.staged_binary, &plan.launcher_exe)
            {
                Ok(()) => {
                    tracing::info!(
                        "Replaced {} (attempt {}/{})",
                        plan.launcher_exe.display(),
                        attempt,
                        policy.attempts()
                    );
                    return Ok(attempt);
                }
                Err(e) => {
                    tracing::warn!("Move attempt {}/{} failed: {e}", attempt, policy.attempts());
                    last_error = Some(e);
                    if attempt < policy.attempts() {
                        self.platform.sleep(policy.delay_after(attempt));
                    }
                }
            }
        }

        Err(LauncherError::Swap(format!(
            "could not replace {} after {} attempts: {}",
            plan.launcher_exe.display(),
            policy.attempts(),
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    fn fail(&mut self, plan: &HandoffPlan, error: LauncherError) -> LauncherError {
        tracing::error!("Swap failed: {error}");
        self.transition(SwapState::Failed);

        let status = UpdateStatus::failure(
            plan.version.as_str(),
            plan.previous_version.as_str(),
            error.to_string(),
            self.log_file.clone(),
        );
        if let Err(e) = status.write(&plan.status_file) {
            tracing::warn!("Failed to write update status: {e}");
        }
        error
    }
}
