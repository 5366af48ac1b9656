//! Check for available updates.

use crate::error::{LauncherError, Result};
use crate::github::{GitHubClient, GitHubRelease};
use crate::release::ReleaseDescriptor;
use crate::version::VersionPolicy;

/// Result of a successful release check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    /// The running version matches the feed.
    UpToDate,
    /// The feed offers a different (or newer) version.
    Available(ReleaseDescriptor),
}

/// Outcome of a background check, where failures are contained.
///
/// `Ignored` carries the swallowed error so callers and tests can see that
/// the failure was deliberately dropped rather than lost.
#[derive(Debug)]
pub enum UpdateCheckOutcome {
    /// No update offered.
    UpToDate,
    /// An update is offered.
    Available(ReleaseDescriptor),
    /// The check failed; no update offered, launch proceeds.
    Ignored(LauncherError),
}

impl UpdateCheckOutcome {
    /// The offered release, if any.
    #[must_use]
    pub fn available(&self) -> Option<&ReleaseDescriptor> {
        match self {
            Self::Available(release) => Some(release),
            Self::UpToDate | Self::Ignored(_) => None,
        }
    }
}

impl From<Result<UpdateCheck>> for UpdateCheckOutcome {
    fn from(result: Result<UpdateCheck>) -> Self {
        match result {
            Ok(UpdateCheck::UpToDate) => Self::UpToDate,
            Ok(UpdateCheck::Available(release)) => Self::Available(release),
            Err(e) => Self::Ignored(e),
        }
    }
}

/// Decides whether `release` is an update over `running`.
#[must_use]
pub fn evaluate_release(release: GitHubRelease, running: &str, policy: VersionPolicy) -> UpdateCheck {
    if release.draft {
        tracing::debug!("Skipping draft release {}", release.tag_name);
        return UpdateCheck::UpToDate;
    }

    if !policy.offers_update(&release.tag_name, running) {
        tracing::info!(
            "No update available (current: {}, latest: {})",
            running,
            release.tag_name
        );
        return UpdateCheck::UpToDate;
    }

    tracing::info!("Update available: {} -> {}", running, release.tag_name);
    UpdateCheck::Available(ReleaseDescriptor::from(release))
}

/// Queries the release feed once.
pub async fn check_latest(
    client: &GitHubClient,
    running: &str,
    policy: VersionPolicy,
) -> Result<UpdateCheck> {
    tracing::info!("Checking for updates (current version: {})", running);
    let release = client.latest_release().await?;
    Ok(evaluate_release(release, running, policy))
}

/// Queries the release feed, containing every failure.
pub async fn check_silently(
    client: &GitHubClient,
    running: &str,
    policy: VersionPolicy,
) -> UpdateCheckOutcome {
    let outcome = UpdateCheckOutcome::from(check_latest(client, running, policy).await);
    if let UpdateCheckOutcome::Ignored(e) = &outcome {
        tracing::warn!("Update check failed, continuing without update: {e}");
    }
    outcome
}
