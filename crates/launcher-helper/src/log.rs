//! File-based logging for the update helper.
//!
//! The helper runs detached with no terminal, so everything goes to a
//! timestamped file that outlives both processes.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing::level_filters::LevelFilter;

/// Log file name for a helper started at `started`.
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("update-helper-{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Creates a fresh log file in `log_dir` and routes `tracing` output to it.
///
/// Returns the log file path.
pub fn init_logging(log_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    let started = Local::now();
    let log_path = log_dir.join(log_file_name(started));

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_max_level(LevelFilter::DEBUG)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!(
        "=== app-launcher update helper {} === started {}",
        launcher_core::VERSION,
        started.format("%Y-%m-%d %H:%M:%S")
    );
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name() {
        let started = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(log_file_name(started), "update-helper-20260304_050607.log");
    }
}
