//! Forum detection against a mock server

use crate::{legacy_page, modern_page, recording_client};
use forum_harvest::detect::detect_with;
use forum_harvest::http::{ClientConfig, BLOCKED_REMEDIATION};
use forum_harvest::model::ForumFamily;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path("/thread"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_detects_modern_family() {
    let server = MockServer::start().await;
    serve(&server, 200, modern_page(&[("post-1", "2024-01-01T00:00:00Z", "hola")], 1)).await;

    let (mut client, _) = recording_client(ClientConfig::default());
    let detection = detect_with(&mut client, &format!("{}/thread", server.uri()))
        .await
        .unwrap();

    assert_eq!(detection.family, ForumFamily::Modern);
}

#[tokio::test]
async fn test_detects_legacy_family() {
    let server = MockServer::start().await;
    serve(&server, 200, legacy_page(&[("1", "Hoy, 10:00", "hola")], 1, 1)).await;

    let (mut client, _) = recording_client(ClientConfig::default());
    let detection = detect_with(&mut client, &format!("{}/thread", server.uri()))
        .await
        .unwrap();

    assert_eq!(detection.family, ForumFamily::Legacy);
}

#[tokio::test]
async fn test_strong_marker_wins_over_legacy_mentions() {
    let server = MockServer::start().await;
    let body = r#"<html data-app="public"><body>
        <div class="p-body">Imported from our old vBulletin board</div>
        <table class="tborder"><tr><td>archive</td></tr></table>
    </body></html>"#;
    serve(&server, 200, body.to_string()).await;

    let (mut client, _) = recording_client(ClientConfig::default());
    let detection = detect_with(&mut client, &format!("{}/thread", server.uri()))
        .await
        .unwrap();

    assert_eq!(detection.family, ForumFamily::Modern);
}

#[tokio::test]
async fn test_block_yields_unknown_with_remediation() {
    let server = MockServer::start().await;
    serve(&server, 403, "Attention Required".to_string()).await;

    let (mut client, sleeper) = recording_client(ClientConfig::default());
    let detection = detect_with(&mut client, &format!("{}/thread", server.uri()))
        .await
        .unwrap();

    assert_eq!(detection.family, ForumFamily::Unknown);
    assert_eq!(detection.message, BLOCKED_REMEDIATION);
    assert_eq!(sleeper.recorded().len(), 3);
}

#[tokio::test]
async fn test_unreachable_host_is_an_error() {
    let (mut client, _) = recording_client(ClientConfig::default());
    assert!(detect_with(&mut client, "http://127.0.0.1:1/thread").await.is_err());
}
