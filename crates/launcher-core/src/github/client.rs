//! GitHub API client for fetching release information.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};

use super::types::GitHubRelease;
use crate::error::{LauncherError, Result};

/// User agent string for every request the launcher makes.
pub const USER_AGENT_VALUE: &str = concat!("app-launcher/", env!("CARGO_PKG_VERSION"));

/// Connect timeout shared by all clients.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client that identifies the launcher and bounds the whole
/// request, body included, by `timeout`.
pub fn build_http_client(timeout: Duration, headers: HeaderMap) -> Result<reqwest::Client> {
    let mut headers = headers;
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .map_err(|e| LauncherError::Network(format!("failed to create HTTP client: {e}")))
}

/// GitHub API client for one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    repository: String,
}

impl GitHubClient {
    /// Creates a client for `repository` (`owner/name`) against `api_base`.
    pub fn new(
        api_base: impl Into<String>,
        repository: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        Ok(Self {
            client: build_http_client(timeout, headers)?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
        })
    }

    /// URL of the latest-release endpoint.
    #[must_use]
    pub fn latest_release_url(&self) -> String {
        format!("{}/repos/{}/releases/latest", self.api_base, self.repository)
    }

    /// Fetches the latest published release.
    pub async fn latest_release(&self) -> Result<GitHubRelease> {
        let url = self.latest_release_url();
        tracing::debug!("Fetching latest release from {}", url);

        let response = self.client.get(&url).send().await?;
        Self::handle_response(response).await
    }

    /// Checks the HTTP status and parses the release JSON.
    async fn handle_response(response: reqwest::Response) -> Result<GitHubRelease> {
        let status = response.status();

        if status == reqwest::StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .is_some_and(|remaining| remaining.to_str().unwrap_or("1") == "0")
        {
            let retry_after = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|reset| {
                    let now = chrono::Utc::now().timestamp().max(0) as u64;
                    reset.saturating_sub(now)
                })
                .unwrap_or(60);

            return Err(LauncherError::RateLimited { retry_after });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LauncherError::Network(
                "no releases found for this repository".to_string(),
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LauncherError::Network(format!(
                "release API error ({status}): {body}"
            )));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GitHubClient::new(
            "https://api.github.com/",
            "owner/repo",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.latest_release_url(),
            "https://api.github.com/repos/owner/repo/releases/latest"
        );
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT_VALUE.starts_with("app-launcher/"));
    }
}
