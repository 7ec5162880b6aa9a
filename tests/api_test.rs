use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

use async_trait::async_trait;
use grabbox::api::build_router;
use grabbox::api::models::{AddUrlResponse, ErrorResponse, StatusReport};
use grabbox::api::state::AppState;
use grabbox::config::{ByteSize, Config};
use grabbox::ledger::StatusLedger;
use grabbox::observability::Metrics;
use grabbox::queue::{SubmissionQueue, TaskBroker};
use grabbox::worker::fetcher::{self, FetchError, Fetcher};
use grabbox::worker::WorkerRuntime;

/// Writes `<url tail>.mp3` into the output directory, fails on "broken"
struct FakeDownloader {
    output_dir: std::path::PathBuf,
}

#[async_trait]
impl Fetcher for FakeDownloader {
    async fn fetch(&self, url: &str) -> fetcher::Result<()> {
        if url.contains("broken") {
            return Err(FetchError::NonZeroExit {
                code: Some(1),
                diagnostics: "ERROR: [generic] Unsupported URL".to_string(),
            });
        }
        let name = url.rsplit('/').next().unwrap_or("track");
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(self.output_dir.join(format!("{name}.mp3")), b"ID3").await?;
        Ok(())
    }

    fn tool(&self) -> &str {
        "fake-downloader"
    }
}

struct TestApp {
    router: Router,
    ledger: Arc<StatusLedger>,
    runtime: WorkerRuntime,
    temp_dir: TempDir,
}

/// Builds a test app with isolated dependencies
fn build_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let static_dir = temp_dir.path().join("static");
    fs::create_dir_all(&static_dir).unwrap();
    fs::write(static_dir.join("index.html"), "<title>grabbox</title>").unwrap();

    let mut config = Config::default();
    config.server.static_dir = static_dir;
    config.server.max_payload_bytes = ByteSize(1024);
    config.fetcher.output_dir = temp_dir.path().join("downloads");
    config.workers.dequeue_timeout_ms = 20;

    let ledger = Arc::new(StatusLedger::new());
    let queue = Arc::new(SubmissionQueue::new());
    let metrics = Arc::new(Metrics::new());
    let fetcher = Arc::new(FakeDownloader {
        output_dir: config.fetcher.output_dir.clone(),
    });

    let runtime = WorkerRuntime::start(&config.workers, ledger.clone(), queue.clone(), fetcher, metrics.clone());
    let broker = TaskBroker::new(ledger.clone(), queue);
    let state = AppState::new(Arc::new(config), broker, runtime.pool(), metrics);

    TestApp {
        router: build_router(state),
        ledger,
        runtime,
        temp_dir,
    }
}

fn add_url_request(body: Value) -> Request<Body> {
    Request::builder()
        .uri("/api/add_url")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn settle(app: &TestApp) {
    tokio::time::timeout(Duration::from_secs(5), app.ledger.wait_settled())
        .await
        .expect("downloads did not settle");
}

#[tokio::test]
async fn test_add_url_success() {
    let app = build_test_app();

    let (status, body) = send(&app.router, add_url_request(json!({"url": "https://example.com/song"}))).await;
    assert_eq!(status, StatusCode::OK);

    let response: AddUrlResponse = serde_json::from_slice(&body).unwrap();
    assert!(response.success);
    assert_eq!(response.message, "URL added to queue.");

    settle(&app).await;
    let (_, body) = send(&app.router, get("/api/status")).await;
    let report: StatusReport = serde_json::from_slice(&body).unwrap();
    assert_eq!(report.completed, vec!["https://example.com/song"]);

    app.runtime.shutdown().await;
}

#[tokio::test]
async fn test_add_url_missing_or_blank() {
    let app = build_test_app();

    for payload in [json!({}), json!({"url": ""}), json!({"url": "   "}), json!({"url": null})] {
        let (status, body) = send(&app.router, add_url_request(payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");

        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(!error.success);
        assert_eq!(error.code, "URL_REQUIRED");
        assert_eq!(error.error, "URL is required.");
    }

    assert!(app.ledger.is_empty());
    app.runtime.shutdown().await;
}

#[tokio::test]
async fn test_add_url_rejects_bad_requests() {
    let app = build_test_app();

    let wrong_type = Request::builder()
        .uri("/api/add_url")
        .method("POST")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"url":"https://example.com/a"}"#))
        .unwrap();
    let (status, _) = send(&app.router, wrong_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .uri("/api/add_url")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app.router, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.code, "INVALID_PAYLOAD");

    let oversized = add_url_request(json!({"url": format!("https://example.com/{}", "a".repeat(2048))}));
    let (status, _) = send(&app.router, oversized).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    assert!(app.ledger.is_empty());
    app.runtime.shutdown().await;
}

#[tokio::test]
async fn test_failures_are_reported_in_status() {
    let app = build_test_app();

    send(&app.router, add_url_request(json!({"url": "not-a-url"}))).await;
    send(&app.router, add_url_request(json!({"url": "https://example.com/broken"}))).await;
    settle(&app).await;

    let (status, body) = send(&app.router, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);

    let report: Value = serde_json::from_slice(&body).unwrap();
    let failed = report["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0]["url"], "not-a-url");
    assert_eq!(failed[0]["code"], "INVALID_FORMAT");
    assert_eq!(failed[1]["code"], "EXIT_STATUS");
    assert!(failed[1]["error"].as_str().unwrap().contains("Unsupported URL"));

    app.runtime.shutdown().await;
}

#[tokio::test]
async fn test_downloaded_files_listing_and_delete() {
    let app = build_test_app();

    // Directory does not exist yet
    let (status, body) = send(&app.router, get("/api/downloaded_files")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Vec<String>>(&body).unwrap(), Vec::<String>::new());
    assert!(app.temp_dir.path().join("downloads").is_dir());

    for name in ["alpha", "charlie", "bravo"] {
        send(&app.router, add_url_request(json!({"url": format!("https://example.com/{name}")}))).await;
    }
    settle(&app).await;

    let (_, body) = send(&app.router, get("/api/downloaded_files")).await;
    assert_eq!(
        serde_json::from_slice::<Vec<String>>(&body).unwrap(),
        vec!["charlie.mp3", "bravo.mp3", "alpha.mp3"]
    );

    let delete = |uri: &str| {
        Request::builder()
            .uri(uri)
            .method("DELETE")
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app.router, delete("/api/downloaded_files/bravo.mp3")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, delete("/api/downloaded_files/bravo.mp3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    fs::write(app.temp_dir.path().join("secret.txt"), "keep").unwrap();
    let (status, body) = send(&app.router, delete("/api/downloaded_files/..%2Fsecret.txt")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(error.code, "INVALID_FILE_NAME");
    assert!(app.temp_dir.path().join("secret.txt").exists());

    app.runtime.shutdown().await;
}

#[tokio::test]
async fn test_health() {
    let app = build_test_app();
    send(&app.router, add_url_request(json!({"url": "https://example.com/one"}))).await;
    settle(&app).await;

    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"]["workers"], "healthy");
    assert_eq!(health["metrics"]["jobs_accepted"], 1);
    assert_eq!(health["metrics"]["jobs_succeeded"], 1);
    assert_eq!(health["workers"]["capacity"], 3);

    app.runtime.shutdown().await;
}

#[tokio::test]
async fn test_static_page_is_served() {
    let app = build_test_app();

    let (status, body) = send(&app.router, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("<title>grabbox</title>"));

    let (status, _) = send(&app.router, get("/missing.js")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.runtime.shutdown().await;
}
