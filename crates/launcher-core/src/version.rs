//! Version comparison for release tags.
//!
//! The launcher decides "update available" with a [`VersionPolicy`]. The
//! default policy is raw tag inequality; the semantic policy parses tags such
//! as `v1.2.0` or `1.2.0-beta.1` into [`Version`] and only offers upgrades.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LauncherError, Result};

/// How a release tag is compared against the running version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    /// Any tag that differs from the running version is an update,
    /// including downgrades and metadata-only changes.
    #[default]
    Distinct,
    /// Only tags that parse as a strictly newer semantic version are updates.
    Newer,
}

impl VersionPolicy {
    /// Returns whether `tag` should be offered as an update over `running`.
    #[must_use]
    pub fn offers_update(self, tag: &str, running: &str) -> bool {
        match self {
            Self::Distinct => tag.trim() != running.trim(),
            Self::Newer => match (Version::from_tag(tag), Version::from_tag(running)) {
                (Ok(latest), Ok(current)) => latest > current,
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!("Cannot compare versions semantically: {e}");
                    false
                }
            },
        }
    }
}

/// Pre-release identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreRelease {
    /// Alpha release (e.g., "alpha.1").
    Alpha(u32),
    /// Beta release (e.g., "beta.2").
    Beta(u32),
    /// Release candidate (e.g., "rc.1").
    ReleaseCandidate(u32),
}

impl PreRelease {
    fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        let (label, number) = match s.split_once('.') {
            Some((label, n)) => (label.to_string(), n.parse().ok()?),
            None => (s, 0),
        };
        match label.as_str() {
            "alpha" => Some(Self::Alpha(number)),
            "beta" => Some(Self::Beta(number)),
            "rc" => Some(Self::ReleaseCandidate(number)),
            _ => None,
        }
    }

    fn rank(&self) -> (u8, u32) {
        match self {
            Self::Alpha(n) => (0, *n),
            Self::Beta(n) => (1, *n),
            Self::ReleaseCandidate(n) => (2, *n),
        }
    }
}

impl PartialOrd for PreRelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PreRelease {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alpha(n) => write!(f, "alpha.{n}"),
            Self::Beta(n) => write!(f, "beta.{n}"),
            Self::ReleaseCandidate(n) => write!(f, "rc.{n}"),
        }
    }
}

/// A semantic version with optional pre-release tag.
///
/// Build metadata (`+build.5`) is accepted and ignored. A fourth numeric
/// component, as produced by some assembly versioning schemes (`1.0.0.0`),
/// is accepted when it is zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Version {
    /// Major version number.
    pub major: u32,
    /// Minor version number.
    pub minor: u32,
    /// Patch version number.
    pub patch: u32,
    /// Optional pre-release identifier.
    pub pre_release: Option<PreRelease>,
}

impl Version {
    /// Create a new stable version.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
        }
    }

    /// Check if this version is a stable release.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.pre_release.is_none()
    }

    /// Parse a version from a release tag (handles a "v" prefix).
    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::from_str(tag)
    }
}

impl FromStr for Version {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let stripped = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let without_build = stripped.split('+').next().unwrap_or(stripped);
        let invalid = || LauncherError::InvalidVersion(s.to_string());

        let (core, pre_release) = match without_build.split_once('-') {
            Some((core, pre)) => (core, Some(PreRelease::parse(pre).ok_or_else(invalid)?)),
            None => (without_build, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        let numbers = match parts.as_slice() {
            [major, minor, patch] => [*major, *minor, *patch],
            [major, minor, patch, "0"] => [*major, *minor, *patch],
            _ => return Err(invalid()),
        };

        let parse = |n: &str| n.parse::<u32>().map_err(|_| invalid());
        Ok(Self {
            major: parse(numbers[0])?,
            minor: parse(numbers[1])?,
            patch: parse(numbers[2])?,
            pre_release,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.pre_release {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            // 1.0.0-beta.1 < 1.0.0
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_stable_version() {
        let v = Version::from_str("1.2.3").unwrap();
        assert_eq!(v, Version::new(1, 2, 3));
        assert!(v.is_stable());
    }

    #[test]
    fn test_parse_tag_prefix_and_build_metadata() {
        assert_eq!(Version::from_tag("v2.0.0").unwrap(), Version::new(2, 0, 0));
        assert_eq!(
            Version::from_tag("2.0.0+build.7").unwrap(),
            Version::new(2, 0, 0)
        );
        assert_eq!(Version::from_tag("1.0.0.0").unwrap(), Version::new(1, 0, 0));
    }

    #[test]
    fn test_prerelease_ordering() {
        let alpha = Version::from_str("1.0.0-alpha.1").unwrap();
        let beta = Version::from_str("1.0.0-beta.1").unwrap();
        let beta10 = Version::from_str("1.0.0-beta.10").unwrap();
        let rc = Version::from_str("1.0.0-rc").unwrap();
        let stable = Version::from_str("1.0.0").unwrap();

        assert!(alpha < beta);
        assert!(beta < beta10);
        assert!(beta10 < rc);
        assert!(rc < stable);
        assert_eq!(rc.to_string(), "1.0.0-rc.0");
    }

    #[test]
    fn test_invalid_version() {
        assert!(Version::from_str("invalid").is_err());
        assert!(Version::from_str("1.2").is_err());
        assert!(Version::from_str("1.2.3.4").is_err());
        assert!(Version::from_str("1.2.3-nightly").is_err());
    }

    #[test]
    fn test_distinct_policy_flags_downgrades() {
        let policy = VersionPolicy::Distinct;
        assert!(policy.offers_update("2.0.0", "1.0.0"));
        assert!(policy.offers_update("0.9.0", "1.0.0"));
        assert!(policy.offers_update("v1.0.0", "1.0.0"));
        assert!(!policy.offers_update("1.0.0", "1.0.0"));
    }

    #[test]
    fn test_newer_policy_only_upgrades() {
        let policy = VersionPolicy::Newer;
        assert!(policy.offers_update("v2.0.0", "1.0.0"));
        assert!(!policy.offers_update("0.9.0", "1.0.0"));
        assert!(!policy.offers_update("v1.0.0", "1.0.0"));
        assert!(!policy.offers_update("1.0.0+meta", "1.0.0"));
        assert!(!policy.offers_update("latest", "1.0.0"));
    }

    proptest! {
        #[test]
        fn equal_tags_never_offer_update(tag in "[ -~]{0,24}") {
            prop_assert!(!VersionPolicy::Distinct.offers_update(&tag, &tag));
            prop_assert!(!VersionPolicy::Newer.offers_update(&tag, &tag));
        }

        #[test]
        fn distinct_tags_always_offer_update(a in "[0-9a-z.\\-]{1,16}", b in "[0-9a-z.\\-]{1,16}") {
            prop_assume!(a != b);
            prop_assert!(VersionPolicy::Distinct.offers_update(&a, &b));
        }
    }
}
