//! Streaming download of the new launcher binary.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::header::HeaderMap;

use crate::error::{LauncherError, Result};
use crate::github::client::build_http_client;
use crate::status::StatusSender;

/// Minimum interval between progress events.
const PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Range of the overall progress bar a download occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBand {
    /// Progress reported when the download starts.
    pub start: u8,
    /// Progress reported when the download completes.
    pub end: u8,
}

impl ProgressBand {
    /// Maps a download fraction onto the band.
    #[must_use]
    pub fn at(&self, downloaded: u64, total: u64) -> u8 {
        if total == 0 {
            return self.start;
        }
        let fraction = (downloaded as f64 / total as f64).min(1.0);
        let span = f64::from(self.end.saturating_sub(self.start));
        self.start + (fraction * span) as u8
    }
}

/// Downloads files with a bounded total duration.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    /// Creates a downloader whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout, HeaderMap::new())?,
        })
    }

    /// Streams `url` into `dest`.
    ///
    /// The body goes to a temporary file next to `dest` that is renamed into
    /// place only after the last byte arrived, so `dest` never holds a
    /// truncated download. Returns the number of bytes written.
    pub async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        status: &StatusSender,
        band: ProgressBand,
    ) -> Result<u64> {
        tracing::info!("Downloading {} to {}", url, dest.display());
        let dir = dest.parent().ok_or_else(|| {
            LauncherError::Io(format!("download target {} has no parent", dest.display()))
        })?;

        let response = self.client.get(url).send().await?;
        let http_status = response.status();
        if !http_status.is_success() {
            return Err(LauncherError::Network(format!(
                "download failed with status {http_status}"
            )));
        }

        let total = response.content_length().unwrap_or(0);
        let mut file = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(dir)?;
        let mut downloaded: u64 = 0;
        let mut last_emit = Instant::now();
        status.progress("Downloading update...", band.start);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LauncherError::Network(e.to_string()))?;
            file.write_all(&chunk)?;
            downloaded += chunk.len() as u64;

            if last_emit.elapsed() >= PROGRESS_UPDATE_INTERVAL {
                last_emit = Instant::now();
                status.progress(
                    format!(
                        "Downloading update... {} of {}",
                        format_bytes(downloaded),
                        format_bytes(total)
                    ),
                    band.at(downloaded, total),
                );
            }
        }

        if total != 0 && downloaded != total {
            return Err(LauncherError::Network(format!(
                "download truncated: expected {total} bytes, got {downloaded}"
            )));
        }

        file.as_file().sync_all()?;
        file.persist(dest)
            .map_err(|e| LauncherError::Io(format!("failed to persist download: {}", e.error)))?;

        status.progress("Download complete", band.end);
        tracing::info!("Download complete: {}", format_bytes(downloaded));
        Ok(downloaded)
    }
}

/// Format bytes as a human-readable string.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(52_428_800), "50.0 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_progress_band() {
        let band = ProgressBand { start: 10, end: 50 };
        assert_eq!(band.at(0, 0), 10);
        assert_eq!(band.at(0, 100), 10);
        assert_eq!(band.at(50, 100), 30);
        assert_eq!(band.at(100, 100), 50);
        assert_eq!(band.at(200, 100), 50);
    }
}
