//! SHA256 verification for downloaded launcher binaries.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{LauncherError, Result};

/// Parses a feed digest (`sha256:<hex>` or bare hex) into lowercase hex.
///
/// Returns `None` for anything that is not a 64-character hex string, so
/// digests in other algorithms are treated as unavailable.
#[must_use]
pub fn parse_sha256_digest(digest: &str) -> Option<String> {
    let hash = digest
        .strip_prefix("sha256:")
        .unwrap_or(digest)
        .trim()
        .to_lowercase();
    (hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit())).then_some(hash)
}

/// Computes the SHA256 hash of a file.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Verifies a file against the expected digest.
///
/// Returns the verified hash, or `None` when no usable digest was published.
pub fn verify_file(path: &Path, digest: Option<&str>) -> Result<Option<String>> {
    let Some(expected) = digest.and_then(parse_sha256_digest) else {
        tracing::warn!("No SHA256 digest published, skipping verification");
        return Ok(None);
    };

    let actual = sha256_file(path)?;
    if actual != expected {
        return Err(LauncherError::ChecksumMismatch { expected, actual });
    }

    tracing::info!("SHA256 verification passed: {}", actual);
    Ok(Some(actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_SHA256: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";

    fn hello_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.bin");
        std::fs::write(&path, b"Hello, World!").unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_digest_formats() {
        assert_eq!(
            parse_sha256_digest(&format!("sha256:{}", HELLO_SHA256.to_uppercase())).as_deref(),
            Some(HELLO_SHA256)
        );
        assert_eq!(parse_sha256_digest(HELLO_SHA256).as_deref(), Some(HELLO_SHA256));
        assert!(parse_sha256_digest("").is_none());
        assert!(parse_sha256_digest("sha512:abcd").is_none());
    }

    #[test]
    fn test_verify_file_valid() {
        let (_dir, path) = hello_file();
        let verified = verify_file(&path, Some(&format!("sha256:{HELLO_SHA256}"))).unwrap();
        assert_eq!(verified.as_deref(), Some(HELLO_SHA256));
    }

    #[test]
    fn test_verify_file_mismatch() {
        let (_dir, path) = hello_file();
        let wrong = format!("sha256:{}", "0".repeat(64));
        assert!(matches!(
            verify_file(&path, Some(&wrong)),
            Err(LauncherError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_file_without_digest() {
        let (_dir, path) = hello_file();
        assert_eq!(verify_file(&path, None).unwrap(), None);
    }
}
