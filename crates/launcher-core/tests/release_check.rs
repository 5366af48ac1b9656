//! Release feed checks against a mock GitHub API.

use std::path::Path;
use std::time::{Duration, Instant};

use launcher_core::github::GitHubClient;
use launcher_core::steps::check::{UpdateCheck, check_latest, check_silently};
use launcher_core::{
    Bootstrap, FailureKind, LauncherConfig, LauncherError, StatusSender, UpdateCheckOutcome,
    UpdateMode, VersionPolicy,
};
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LATEST: &str = "/repos/owner/app/releases/latest";

fn release_body(tag: &str, server: &MockServer) -> serde_json::Value {
    json!({
        "tag_name": tag,
        "name": format!("Launcher {tag}"),
        "draft": false,
        "prerelease": false,
        "html_url": "https://github.com/owner/app/releases/tag/2.0.0",
        "assets": [
            {
                "name": "Launcher_v2.exe",
                "browser_download_url": format!("{}/Launcher_v2.exe", server.uri()),
                "size": 4,
                "content_type": "application/octet-stream"
            }
        ]
    })
}

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(server.uri(), "owner/app", Duration::from_secs(5)).unwrap()
}

fn bootstrap(root: &Path, api_base: String) -> Bootstrap {
    bootstrap_with_timeout(root, api_base, 2)
}

fn bootstrap_with_timeout(root: &Path, api_base: String, check_timeout_secs: u64) -> Bootstrap {
    let mut config = LauncherConfig::default();
    config.updates.api_base = api_base;
    config.updates.repository = "owner/app".to_string();
    config.updates.mode = UpdateMode::Auto;
    config.updates.check_timeout_secs = check_timeout_secs;
    Bootstrap::new(config, root, StatusSender::disabled()).with_running_version("1.0.0")
}

#[tokio::test]
async fn test_request_identifies_launcher() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .and(header_exists("user-agent"))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_body("1.0.0", &server)))
        .expect(1)
        .mount(&server)
        .await;

    let check = check_latest(&client(&server), "1.0.0", VersionPolicy::Distinct)
        .await
        .unwrap();
    assert_eq!(check, UpdateCheck::UpToDate);
}

#[tokio::test]
async fn test_different_tag_offers_update_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_body("2.0.0", &server)))
        .expect(1)
        .mount(&server)
        .await;

    let check = check_latest(&client(&server), "1.0.0", VersionPolicy::Distinct)
        .await
        .unwrap();
    let UpdateCheck::Available(descriptor) = check else {
        panic!("expected an update");
    };
    assert_eq!(descriptor.tag, "2.0.0");
    assert_eq!(descriptor.assets.len(), 1);
    assert_eq!(
        descriptor.assets[0].download_url,
        format!("{}/Launcher_v2.exe", server.uri())
    );
}

#[tokio::test]
async fn test_downgrade_offered_only_under_distinct_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_body("0.9.0", &server)))
        .mount(&server)
        .await;

    let distinct = check_latest(&client(&server), "1.0.0", VersionPolicy::Distinct)
        .await
        .unwrap();
    let newer = check_latest(&client(&server), "1.0.0", VersionPolicy::Newer)
        .await
        .unwrap();

    assert!(matches!(distinct, UpdateCheck::Available(_)));
    assert_eq!(newer, UpdateCheck::UpToDate);
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = check_latest(&client(&server), "1.0.0", VersionPolicy::Distinct)
        .await
        .unwrap_err();
    assert!(matches!(err, LauncherError::JsonParse(_)));
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", "0"),
        )
        .mount(&server)
        .await;

    let err = check_latest(&client(&server), "1.0.0", VersionPolicy::Distinct)
        .await
        .unwrap_err();
    assert!(matches!(err, LauncherError::RateLimited { .. }));
}

#[tokio::test]
async fn test_server_error_is_ignored_silently() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let outcome = check_silently(&client(&server), "1.0.0", VersionPolicy::Distinct).await;
    assert!(matches!(
        outcome,
        UpdateCheckOutcome::Ignored(LauncherError::Network(_))
    ));
    assert!(outcome.available().is_none());
}

#[tokio::test]
async fn test_check_failure_keeps_payload_launchable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let flow = bootstrap(dir.path(), server.uri());
    std::fs::create_dir_all(&flow.layout().payload_dir).unwrap();
    std::fs::write(&flow.layout().payload_exe, b"MZ").unwrap();

    let outcome = flow
        .run(|_| panic!("no prompt in auto mode"), |_| panic!("no handoff expected"))
        .await
        .unwrap();

    assert!(matches!(outcome.check, UpdateCheckOutcome::Ignored(_)));
    assert!(outcome.readiness.can_launch());
    assert!(flow.launch_with(|_| Ok(1)).is_ok());
}

#[tokio::test]
async fn test_unreachable_feed_keeps_payload_launchable() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on the discard port.
    let flow = bootstrap(dir.path(), "http://127.0.0.1:9".to_string());
    std::fs::create_dir_all(&flow.layout().payload_dir).unwrap();

    let outcome = flow
        .run(|_| panic!("no prompt in auto mode"), |_| panic!("no handoff expected"))
        .await
        .unwrap();

    assert!(matches!(outcome.check, UpdateCheckOutcome::Ignored(_)));
    assert!(outcome.readiness.can_launch());
}

#[tokio::test]
async fn test_explicit_check_surfaces_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let err = bootstrap(dir.path(), server.uri())
        .check_latest()
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::UpdateCheck);
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test]
async fn test_hung_feed_is_cut_off_by_check_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(release_body("2.0.0", &server))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let flow = bootstrap_with_timeout(dir.path(), server.uri(), 1);

    let started = Instant::now();
    let outcome = flow.check_updates().await;

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(matches!(
        outcome,
        UpdateCheckOutcome::Ignored(LauncherError::Network(_))
    ));
}
