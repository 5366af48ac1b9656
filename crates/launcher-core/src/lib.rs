//! Self-updating application launcher.
//!
//! On startup the launcher makes sure a bundled payload application is
//! extracted, asks a GitHub release feed whether a different launcher version
//! is published, and if so replaces itself before restarting. Otherwise the
//! payload is started with its launcher-mode arguments.
//!
//! # Overview
//!
//! - Zip extraction through a sibling staging directory and an atomic rename
//! - Release checks against `releases/latest` with forward-compatible parsing
//! - Raw tag inequality by default, semantic version ordering on request
//! - Streaming downloads with progress and optional SHA256 verification
//! - Self-replacement through a detached helper process coordinated only
//!   through files in the staging directory
//!
//! # Architecture
//!
//! - [`bootstrap::Bootstrap`] - the startup sequence (prepare, check, update or launch)
//! - [`steps`] - the individual steps, callable on their own
//! - [`update::UpdateOrchestrator`] - stage a release and hand off
//! - [`swap::SwapExecutor`] - the helper-side state machine
//! - [`status`] - the single channel all progress reporting goes through
//!
//! Failures carry a [`FailureKind`]. Only environment preparation is allowed
//! to make the payload unlaunchable.
//!
//! # Example
//!
//! ```no_run
//! use launcher_core::{Bootstrap, LaunchReadiness, LauncherConfig, StatusSender};
//! use launcher_core::process::spawn_detached;
//!
//! async fn start() -> Result<(), launcher_core::PhaseError> {
//!     let config = LauncherConfig::default();
//!     let root = config.default_root().map_err(|e| e.during(launcher_core::FailureKind::Config))?;
//!     let flow = Bootstrap::new(config, root, StatusSender::disabled());
//!
//!     let outcome = flow.run(|_| true, spawn_detached).await?;
//!     match outcome.readiness {
//!         LaunchReadiness::RestartForUpdate(_) => std::process::exit(0),
//!         LaunchReadiness::Ready { .. } => {
//!             flow.launch()?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod error;
pub mod layout;
pub mod process;
pub mod release;
pub mod status;
pub mod update_status;
pub mod version;

// Individual steps
pub mod steps;

// GitHub API
pub mod github;

// Orchestration
pub mod bootstrap;
pub mod swap;
pub mod update;

// Re-export main types for convenience
pub use bootstrap::{Bootstrap, LaunchReadiness, PrepareReport, RunOutcome};
pub use config::{LauncherConfig, UpdateMode};
pub use error::{FailureKind, LauncherError, PhaseError, Result};
pub use layout::{EnvironmentState, InstallationLayout};
pub use release::{DownloadAsset, ReleaseDescriptor};
pub use status::{StatusEvent, StatusReceiver, StatusSender, status_channel};
pub use steps::check::{UpdateCheck, UpdateCheckOutcome};
pub use swap::{HandoffPlan, SwapExecutor, SwapPlatform, SwapState, SystemPlatform};
pub use update::{HandoffRequest, UpdateOrchestrator};
pub use update_status::UpdateStatus;
pub use version::{Version, VersionPolicy};

/// Version of the running launcher, compared against release tags.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!VERSION.is_empty());
    }
}
