//! End-to-end crawls of mocked threads

use crate::{legacy_page, modern_page, recording_client};
use chrono::{TimeZone, Utc};
use forum_harvest::crawler::{crawl_topic_with, PaginationWalker};
use forum_harvest::extract::Extractor;
use forum_harvest::http::ClientConfig;
use forum_harvest::model::{CrawlEvent, CrawlRequest, ForumFamily, ForumType, Topic};
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const THREAD: &str = "/threads/topic.42/";

fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.into())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page_path: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(response)
        .mount(server)
        .await;
}

fn since_2020() -> CrawlRequest {
    CrawlRequest::new(
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        10,
        Duration::ZERO,
    )
}

fn modern_walker(server: &MockServer, request: CrawlRequest) -> (PaginationWalker, forum_harvest::http::RecordingSleeper) {
    let (client, sleeper) = recording_client(ClientConfig::default());
    let topic = Topic::new("topic-42", "Hilo", format!("{}{}", server.uri(), THREAD), ForumType::Modern);
    let extractor = Extractor::for_family(ForumFamily::Modern).expect("modern extractor");
    let walker = PaginationWalker::new(client, extractor, topic, request)
        .with_timeout(Duration::from_secs(5));
    (walker, sleeper)
}

fn post_ids(events: &[CrawlEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e.as_post())
        .map(|p| p.id.clone())
        .collect()
}

#[tokio::test]
async fn test_since_filter_walks_every_page() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        THREAD,
        html(modern_page(&[("post-1", "2023-01-01T10:00:00Z", "viejo")], 3)),
    )
    .await;
    mount_page(
        &server,
        "/threads/topic.42/page-2",
        html(modern_page(&[("post-2", "2023-06-01T10:00:00Z", "medio")], 3)),
    )
    .await;
    mount_page(
        &server,
        "/threads/topic.42/page-3",
        html(modern_page(
            &[
                ("post-3", "2024-01-09T10:00:00Z", "nuevo"),
                ("post-4", "2024-01-10T08:30:00+00:00", "más nuevo"),
            ],
            3,
        )),
    )
    .await;

    let request = CrawlRequest::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        10,
        Duration::ZERO,
    );
    let (walker, _) = modern_walker(&server, request);
    let events = walker.collect_events().await;

    assert_eq!(post_ids(&events), vec!["post-3", "post-4"]);
    assert!(events.iter().all(|e| !e.is_error()));

    let post = events[0].as_post().unwrap();
    assert_eq!(post.topic_id, "topic-42");
    assert_eq!(post.author, "autor-post-3");
    assert_eq!(post.content_original, "nuevo");
    assert_eq!(post.timestamp, Utc.with_ymd_and_hms(2024, 1, 9, 10, 0, 0).unwrap());
    assert_eq!(
        post.permalink.as_deref(),
        Some(format!("{}/threads/topic.42/post-3", server.uri()).as_str())
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_post_exactly_at_since_is_kept() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        THREAD,
        html(modern_page(
            &[
                ("post-1", "2023-12-31T23:59:59Z", "justo antes"),
                ("post-2", "2024-01-01T00:00:00Z", "justo a tiempo"),
            ],
            1,
        )),
    )
    .await;

    let request = CrawlRequest::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        10,
        Duration::ZERO,
    );
    let (mut walker, _) = modern_walker(&server, request);
    assert_eq!(walker.topic().id, "topic-42");
    assert!(!walker.is_finished());

    let mut events = Vec::new();
    while let Some(event) = walker.next_event().await {
        events.push(event);
    }

    assert!(walker.is_finished());
    assert_eq!(post_ids(&events), vec!["post-2"]);
}

#[tokio::test]
async fn test_blank_page_yields_one_error_and_continues() {
    let server = MockServer::start().await;

    mount_page(&server, THREAD, html(modern_page(&[("post-1", "2024-01-01T00:00:00Z", "uno")], 3))).await;
    mount_page(&server, "/threads/topic.42/page-2", html("")).await;
    mount_page(
        &server,
        "/threads/topic.42/page-3",
        html(modern_page(&[("post-3", "2024-01-03T00:00:00Z", "tres")], 3)),
    )
    .await;

    let (walker, _) = modern_walker(&server, since_2020());
    let events = walker.collect_events().await;

    assert_eq!(events.len(), 3);
    assert_eq!(events[0].as_post().map(|p| p.id.as_str()), Some("post-1"));
    assert_eq!(events[1].as_error().map(|e| e.page), Some(2));
    assert_eq!(events[2].as_post().map(|p| p.id.as_str()), Some("post-3"));
}

#[tokio::test]
async fn test_persistent_block_aborts_with_remediation() {
    let server = MockServer::start().await;

    mount_page(&server, THREAD, html(modern_page(&[("post-1", "2024-01-01T00:00:00Z", "uno")], 3))).await;
    Mock::given(method("GET"))
        .and(path("/threads/topic.42/page-2"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Just a moment..."))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/topic.42/page-3"))
        .respond_with(html(modern_page(&[], 3)))
        .expect(0)
        .mount(&server)
        .await;

    let (walker, sleeper) = modern_walker(&server, since_2020());
    let events = walker.collect_events().await;

    assert_eq!(events.len(), 2);
    let error = events[1].as_error().expect("error event");
    assert_eq!(error.page, 2);
    assert!(error.message.contains("403"));
    assert!(error.message.contains("cf_clearance"));

    assert_eq!(
        sleeper.recorded(),
        vec![
            Duration::from_secs(2),
            Duration::from_secs(5),
            Duration::from_secs(10)
        ]
    );
}

#[tokio::test]
async fn test_http_error_status_aborts() {
    let server = MockServer::start().await;

    mount_page(&server, THREAD, html(modern_page(&[("post-1", "2024-01-01T00:00:00Z", "uno")], 3))).await;
    mount_page(&server, "/threads/topic.42/page-2", ResponseTemplate::new(500)).await;
    Mock::given(method("GET"))
        .and(path("/threads/topic.42/page-3"))
        .respond_with(html(modern_page(&[], 3)))
        .expect(0)
        .mount(&server)
        .await;

    let (walker, sleeper) = modern_walker(&server, since_2020());
    let events = walker.collect_events().await;

    assert_eq!(events.len(), 2);
    let error = events[1].as_error().expect("error event");
    assert_eq!(error.page, 2);
    assert!(error.message.contains("HTTP 500"));
    assert!(sleeper.recorded().is_empty());
}

#[tokio::test]
async fn test_unreachable_host_aborts_with_one_error() {
    let (client, sleeper) = recording_client(ClientConfig::default());
    let topic = Topic::new("t", "T", "http://127.0.0.1:1/threads/t.1/", ForumType::Modern);
    let walker = PaginationWalker::new(
        client,
        Extractor::for_family(ForumFamily::Modern).unwrap(),
        topic,
        since_2020(),
    )
    .with_timeout(Duration::from_secs(2));

    let events = walker.collect_events().await;

    assert_eq!(events.len(), 1);
    let error = events[0].as_error().expect("error event");
    assert_eq!(error.page, 1);
    assert!(error.message.starts_with("Could not connect after several attempts"));
    assert_eq!(sleeper.recorded().len(), 3);
}

#[tokio::test]
async fn test_max_pages_caps_walk() {
    let server = MockServer::start().await;

    mount_page(&server, THREAD, html(modern_page(&[("post-1", "2024-01-01T00:00:00Z", "uno")], 3))).await;
    mount_page(
        &server,
        "/threads/topic.42/page-2",
        html(modern_page(&[("post-2", "2024-01-02T00:00:00Z", "dos")], 3)),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/threads/topic.42/page-3"))
        .respond_with(html(modern_page(&[("post-3", "2024-01-03T00:00:00Z", "tres")], 3)))
        .expect(0)
        .mount(&server)
        .await;

    let mut request = since_2020();
    request.max_pages = 2;
    let (walker, _) = modern_walker(&server, request);
    let events = walker.collect_events().await;

    assert_eq!(post_ids(&events), vec!["post-1", "post-2"]);
}

#[tokio::test]
async fn test_progress_reports_every_page() {
    let server = MockServer::start().await;

    mount_page(&server, THREAD, html(modern_page(&[("post-1", "2024-01-01T00:00:00Z", "uno")], 3))).await;
    mount_page(&server, "/threads/topic.42/page-2", html(modern_page(&[], 3))).await;
    mount_page(&server, "/threads/topic.42/page-3", html(modern_page(&[], 3))).await;

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let (walker, _) = modern_walker(&server, since_2020());
    let walker = walker.with_progress(move |page, total| sink.lock().unwrap().push((page, total)));

    walker.collect_events().await;

    assert_eq!(*calls.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_repeated_page_is_deduplicated() {
    let server = MockServer::start().await;

    // Some forums serve the last page again for out-of-range page numbers
    let body = modern_page(
        &[
            ("post-1", "2024-01-01T00:00:00Z", "uno"),
            ("post-2", "2024-01-02T00:00:00Z", "dos"),
        ],
        2,
    );
    mount_page(&server, THREAD, html(body.clone())).await;
    mount_page(&server, "/threads/topic.42/page-2", html(body)).await;

    let (walker, _) = modern_walker(&server, since_2020());
    let events = walker.collect_events().await;

    assert_eq!(post_ids(&events), vec!["post-1", "post-2"]);
}

#[tokio::test]
async fn test_delay_between_pages() {
    let server = MockServer::start().await;

    mount_page(&server, THREAD, html(modern_page(&[], 3))).await;
    mount_page(&server, "/threads/topic.42/page-2", html(modern_page(&[], 3))).await;
    mount_page(&server, "/threads/topic.42/page-3", html(modern_page(&[], 3))).await;

    let mut request = since_2020();
    request.delay = Duration::from_secs(1);
    let (walker, sleeper) = modern_walker(&server, request);
    let events = walker.collect_events().await;

    assert!(events.is_empty());
    assert_eq!(
        sleeper.recorded(),
        vec![Duration::from_secs(1), Duration::from_secs(1)]
    );
}

#[tokio::test]
async fn test_stream_fetches_lazily() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        THREAD,
        html(modern_page(
            &[
                ("post-1", "2024-01-01T00:00:00Z", "uno"),
                ("post-2", "2024-01-02T00:00:00Z", "dos"),
            ],
            2,
        )),
    )
    .await;
    mount_page(
        &server,
        "/threads/topic.42/page-2",
        html(modern_page(&[("post-3", "2024-01-03T00:00:00Z", "tres")], 2)),
    )
    .await;

    let (walker, _) = modern_walker(&server, since_2020());
    let stream = walker.into_stream();
    futures::pin_mut!(stream);

    let first = stream.next().await.expect("first event");
    assert_eq!(first.as_post().map(|p| p.id.as_str()), Some("post-1"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    let rest: Vec<CrawlEvent> = stream.collect().await;
    assert_eq!(post_ids(&rest), vec!["post-2", "post-3"]);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_legacy_query_pagination() {
    let server = MockServer::start().await;

    // Mounted first so it wins over the page-1 mock for page=2 requests
    Mock::given(method("GET"))
        .and(path("/showthread.php"))
        .and(query_param("page", "2"))
        .respond_with(html(legacy_page(
            &[("12", "11 de enero de 2024, 09:15", "segunda página")],
            2,
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/showthread.php"))
        .and(query_param("t", "42"))
        .respond_with(html(legacy_page(
            &[("11", "10 de enero de 2024, 22:10", "primera página")],
            1,
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = recording_client(ClientConfig::default());
    let topic = Topic::new(
        "vb-42",
        "Hilo clásico",
        format!("{}/showthread.php?t=42", server.uri()),
        ForumType::Legacy,
    );
    let walker = crawl_topic_with(client, topic, since_2020()).await;
    let events = walker.collect_events().await;

    assert_eq!(post_ids(&events), vec!["11", "12"]);

    let first = events[0].as_post().unwrap();
    assert_eq!(first.author, "usuario11");
    assert_eq!(first.content_original, "primera página");
    assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2024, 1, 10, 22, 10, 0).unwrap());
    assert_eq!(
        first.permalink.as_deref(),
        Some(format!("{}/showthread.php?t=42&p=11#post11", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_auto_topic_detects_then_crawls() {
    let server = MockServer::start().await;

    // One request for detection, one for the walk
    Mock::given(method("GET"))
        .and(path(THREAD))
        .respond_with(html(modern_page(&[("post-1", "2024-01-01T00:00:00Z", "uno")], 1)))
        .expect(2)
        .mount(&server)
        .await;

    let (client, _) = recording_client(ClientConfig::default());
    let topic = Topic::new("auto", "Auto", format!("{}{}", server.uri(), THREAD), ForumType::Auto);
    let walker = crawl_topic_with(client, topic, since_2020()).await;

    assert!(matches!(walker.extractor(), Extractor::Modern(_)));
    let events = walker.collect_events().await;
    assert_eq!(post_ids(&events), vec!["post-1"]);
}

#[tokio::test]
async fn test_auto_topic_falls_back_to_url_guess() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(THREAD))
        .respond_with(html("<html><body><p>Nothing recognisable</p></body></html>"))
        .mount(&server)
        .await;

    let (client, _) = recording_client(ClientConfig::default());
    let topic = Topic::new("auto", "Auto", format!("{}{}", server.uri(), THREAD), ForumType::Auto);
    let walker = crawl_topic_with(client, topic, since_2020()).await;

    assert!(matches!(walker.extractor(), Extractor::Modern(_)));
}
