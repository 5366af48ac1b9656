//! GitHub API types.
//!
//! Only `tag_name` and each asset's `browser_download_url` are required.
//! Everything else is optional and unknown fields are ignored, so the feed
//! can grow without breaking older launchers.

use serde::Deserialize;

/// Raw release data from the GitHub API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    /// The release tag name (e.g., "v0.1.0").
    pub tag_name: String,

    /// The release title.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether this is a draft release.
    #[serde(default)]
    pub draft: bool,

    /// Whether this is a pre-release.
    #[serde(default)]
    pub prerelease: bool,

    /// Release assets, in the order the feed lists them.
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

/// Release asset data from the GitHub API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAsset {
    /// Direct download URL.
    pub browser_download_url: String,

    /// Asset filename.
    #[serde(default)]
    pub name: String,

    /// File size in bytes.
    #[serde(default)]
    pub size: u64,

    /// SHA256 digest (format: "sha256:..."), when GitHub has computed one.
    #[serde(default)]
    pub digest: Option<String>,
}
