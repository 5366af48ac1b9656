//! Update helper for app-launcher.
//!
//! A running executable cannot replace its own file, so the launcher copies
//! this helper into its staging directory and starts it detached:
//!
//! 1. Launcher downloads the new binary into `Update/`
//! 2. Launcher writes `Update/handoff.json` and spawns the staged helper
//! 3. Launcher exits
//! 4. Helper reads the plan and waits for the launcher to exit, killing it
//!    after the grace period
//! 5. Helper moves the new binary over the launcher, retrying with backoff
//!    while the file is locked
//! 6. Helper writes `update_status.json` for the next launcher start
//! 7. Helper relaunches the launcher
//! 8. Helper deletes itself and the staging directory
//!
//! If the move never succeeds the old launcher stays in place and the
//! failure is reported the next time the user starts it.

mod log;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use launcher_core::layout::{LOGS_DIR, STATUS_FILE};
use launcher_core::{HandoffPlan, SwapExecutor, SystemPlatform, UpdateStatus};

fn main() -> ExitCode {
    let Some(plan_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: app-launcher-helper <handoff-plan>");
        return ExitCode::FAILURE;
    };

    let plan = match HandoffPlan::from_file(&plan_path) {
        Ok(plan) => plan,
        Err(e) => {
            report_unreadable_plan(&plan_path, &e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let log_file = match log::init_logging(&plan.logs_dir) {
        Ok(path) => Some(path),
        Err(e) => {
            eprintln!("[helper] Failed to initialize logging: {e}");
            None
        }
    };
    tracing::info!("Plan: {}", plan_path.display());
    tracing::info!(
        "Replacing {} ({} -> {})",
        plan.launcher_exe.display(),
        plan.previous_version,
        plan.version
    );

    let mut executor = SwapExecutor::new(SystemPlatform::new()).with_log_file(log_file);
    match executor.run(&plan) {
        Ok(report) => {
            tracing::info!(
                "Update complete: parent {:?}, {} move attempt(s), relaunched pid {:?}",
                report.parent_exit,
                report.move_attempts,
                report.relaunched_pid
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Update failed in state {}: {e}", executor.state());
            ExitCode::FAILURE
        }
    }
}

/// Without a plan there is no status path, so fall back to the layout the
/// plan normally lives in: `<root>/Update/handoff.json`.
fn report_unreadable_plan(plan_path: &Path, error: &str) {
    let Some(root) = plan_path.parent().and_then(Path::parent) else {
        eprintln!("[helper] Unreadable plan {}: {error}", plan_path.display());
        return;
    };

    let log_file = log::init_logging(&root.join(LOGS_DIR)).ok();
    tracing::error!("Unreadable plan {}: {error}", plan_path.display());

    let status = UpdateStatus::failure("", "", format!("unreadable handoff plan: {error}"), log_file);
    if let Err(e) = status.write(&root.join(STATUS_FILE)) {
        tracing::error!("Failed to write failure status: {e}");
    }
}
