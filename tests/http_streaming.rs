//! Integration tests for streaming over the reqwest transport.

use futures::StreamExt;
use pipeline_log_stream::{
    CancelReason, Frame, JobLogRef, LogStreamClient, LogStreamError, SessionState,
    SummaryCollector,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_PATH: &str = "/gitlab/pipelines/7/jobs/99/log/stream";

fn job() -> JobLogRef {
    JobLogRef::new(7, 99)
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

fn client_for(server: &MockServer) -> LogStreamClient {
    LogStreamClient::builder()
        .base_url(server.uri())
        .inactivity_timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build client")
}

#[tokio::test]
async fn test_stream_summary_end_to_end() {
    let server = MockServer::start().await;

    let body = concat!(
        "data: {\"type\": \"status\", \"message\": \"Fetching logs...\"}\n\n",
        "data: {\"type\": \"status\", \"message\": \"Processing logs...\"}\n\n",
        "data: {\"type\": \"token\", \"content\": \"## Log \"}\n\n",
        "data: {\"type\": \"token\", \"content\": \"Analysis\"}\n\n",
        "data: {\"type\": \"complete\", \"message\": \"Summary generation complete\"}\n\n",
    );

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .and(header("accept", "text/event-stream"))
        .and(header("cache-control", "no-cache"))
        .respond_with(sse(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let collector = SummaryCollector::new();
    let state = client.open_stream(job(), collector.clone()).wait().await;

    let snapshot = collector.snapshot();
    assert_eq!(state, SessionState::Completed);
    assert_eq!(snapshot.frames.len(), 5);
    assert_eq!(snapshot.text(), "## Log Analysis");
    assert_eq!(snapshot.last_status.as_deref(), Some("Processing logs..."));
    assert_eq!(client.metrics().sessions_completed, 1);
}

#[tokio::test]
async fn test_stream_as_futures_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .respond_with(sse(concat!(
            "data: {\"kind\":\"token\",\"content\":\"A\"}\n\n",
            "data: [DONE]\n\n",
        )))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let frames: Vec<_> = client.stream(job()).collect().await;

    assert_eq!(frames, vec![Ok(Frame::token("A")), Ok(Frame::complete())]);
}

#[tokio::test]
async fn test_trailing_record_without_delimiter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .respond_with(sse(concat!(
            "data: {\"kind\":\"token\",\"content\":\"A\"}\n\n",
            "data: {\"kind\":\"complete\",\"summary\":\"No logs found for this job.\"}",
        )))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let collector = SummaryCollector::new();
    let state = client.open_stream(job(), collector.clone()).wait().await;

    assert_eq!(state, SessionState::Completed);
    assert_eq!(collector.text(), "No logs found for this job.");
}

#[tokio::test]
async fn test_server_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let collector = SummaryCollector::new();
    let state = client.open_stream(job(), collector.clone()).wait().await;

    assert!(matches!(
        state,
        SessionState::Failed(LogStreamError::Http { status: 500, .. })
    ));
    assert_eq!(
        collector.snapshot().error_message.as_deref(),
        Some("Connection failed: HTTP 500: Internal Server Error")
    );
    let last_error = client.metrics().last_error.expect("last error recorded");
    assert_eq!(last_error.error.kind(), "http");
}

#[tokio::test]
async fn test_slow_headers_time_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(STREAM_PATH))
        .respond_with(sse("data: [DONE]\n\n").set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = LogStreamClient::builder()
        .base_url(server.uri())
        .inactivity_timeout(Duration::from_millis(50))
        .build()
        .expect("Failed to build client");
    let collector = SummaryCollector::new();
    let state = client.open_stream(job(), collector.clone()).wait().await;

    assert_eq!(
        state,
        SessionState::Cancelled(CancelReason::TimedOut {
            after: Duration::from_millis(50)
        })
    );
    assert!(collector.snapshot().frames.is_empty());
}

#[tokio::test]
async fn test_connection_refused() {
    let client = LogStreamClient::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .expect("Failed to build client");
    let collector = SummaryCollector::new();
    let state = client.open_stream(job(), collector.clone()).wait().await;

    assert!(matches!(
        state,
        SessionState::Failed(LogStreamError::Connection { .. })
    ));
    let snapshot = collector.snapshot();
    assert_eq!(snapshot.frames.len(), 1);
    assert!(snapshot.frames[0]
        .message
        .as_deref()
        .unwrap_or_default()
        .starts_with("Connection failed:"));
}

#[tokio::test]
async fn test_probe_uses_head() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path(STREAM_PATH))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.probe(job()).await.unwrap());
    assert!(!client.probe(JobLogRef::new(7, 100)).await.unwrap());
}
