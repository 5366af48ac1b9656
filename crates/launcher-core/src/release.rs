//! Release descriptor: the parsed, immutable result of one update check.

use serde::{Deserialize, Serialize};

use crate::error::{LauncherError, Result};
use crate::github::GitHubRelease;

/// A downloadable asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAsset {
    /// Asset file name; may be empty when the feed omits it.
    pub name: String,
    /// Direct download URL.
    pub download_url: String,
    /// Size in bytes, 0 when unknown.
    pub size: u64,
    /// SHA256 digest (`sha256:<hex>`), when published.
    pub digest: Option<String>,
}

impl DownloadAsset {
    /// An asset known only by its URL.
    pub fn from_url(download_url: impl Into<String>) -> Self {
        let download_url = download_url.into();
        let name = download_url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            download_url,
            size: 0,
            digest: None,
        }
    }
}

/// Latest release as described by the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    /// Version tag, compared verbatim or semantically depending on policy.
    pub tag: String,
    /// Assets in feed order.
    pub assets: Vec<DownloadAsset>,
}

impl ReleaseDescriptor {
    /// Creates a descriptor.
    pub fn new(tag: impl Into<String>, assets: Vec<DownloadAsset>) -> Self {
        Self {
            tag: tag.into(),
            assets,
        }
    }

    /// Picks the launcher binary.
    ///
    /// With `asset_name` set, the asset with exactly that file name
    /// (case-insensitive) is required. Without it, the feed is expected to
    /// list the launcher binary first.
    pub fn select_asset(&self, asset_name: Option<&str>) -> Result<&DownloadAsset> {
        match asset_name {
            Some(wanted) => self
                .assets
                .iter()
                .find(|asset| asset.name.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| {
                    LauncherError::NoAssetFound(format!(
                        "release {} has no asset named {wanted}",
                        self.tag
                    ))
                }),
            None => self.assets.first().ok_or_else(|| {
                LauncherError::NoAssetFound(format!("release {} lists no assets", self.tag))
            }),
        }
    }
}

impl From<GitHubRelease> for ReleaseDescriptor {
    fn from(release: GitHubRelease) -> Self {
        let assets = release
            .assets
            .into_iter()
            .map(|asset| DownloadAsset {
                name: asset.name,
                download_url: asset.browser_download_url,
                size: asset.size,
                digest: asset.digest,
            })
            .collect();
        Self {
            tag: release.tag_name,
            assets,
        }
    }
}
