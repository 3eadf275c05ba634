//! Integration tests for the HTTP archive fetcher against a local server.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use idx_xbrl_data::download::{DownloadConfig, HttpFetcher, ReportFetcher};
use idx_xbrl_data::{DataError, TickerEntry};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use zip::write::SimpleFileOptions;

fn zip_bytes() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file("instance.xbrl", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"<xbrl/>").unwrap();
    writer.finish().unwrap().into_inner()
}

async fn flaky(State(hits): State<Arc<AtomicUsize>>) -> (StatusCode, Vec<u8>) {
    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
        (StatusCode::SERVICE_UNAVAILABLE, Vec::new())
    } else {
        (StatusCode::OK, zip_bytes())
    }
}

async fn flaky_warmup(State(hits): State<Arc<AtomicUsize>>) -> Response {
    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    } else {
        ([(header::SET_COOKIE, "session=abc; Path=/")], "ok").into_response()
    }
}

async fn needs_cookie(headers: HeaderMap) -> (StatusCode, Vec<u8>) {
    let has_session = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("session=abc"));
    if has_session {
        (StatusCode::OK, zip_bytes())
    } else {
        (StatusCode::FORBIDDEN, Vec::new())
    }
}

async fn spawn_server(hits: Arc<AtomicUsize>) -> SocketAddr {
    let app = Router::new()
        .route(
            "/Portals/0/TW1/BBCA/instance.zip",
            get(|| async { zip_bytes() }),
        )
        .route("/empty.zip", get(|| async { Vec::<u8>::new() }))
        .route("/large.zip", get(|| async { vec![0u8; 4096] }))
        .route("/flaky.zip", get(flaky))
        .route(
            "/warmup",
            get(|| async { ([(header::SET_COOKIE, "session=abc; Path=/")], "ok") }),
        )
        .route("/flaky-warmup", get(flaky_warmup))
        .route("/protected/report.zip", get(needs_cookie))
        .with_state(hits);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn entry(addr: SocketAddr, ticker: &str, path: &str) -> TickerEntry {
    TickerEntry::new(ticker, Url::parse(&format!("http://{addr}{path}")).unwrap())
}

fn fast_config() -> DownloadConfig {
    DownloadConfig {
        timeout: Duration::from_secs(5),
        max_retries: 0,
        retry_backoff: Duration::from_millis(10),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetch_archive() {
    let addr = spawn_server(Arc::default()).await;
    let tmp = TempDir::new().unwrap();
    let fetcher = HttpFetcher::with_config(fast_config());

    let archive = fetcher
        .fetch(&entry(addr, "BBCA", "/Portals/0/TW1/BBCA/instance.zip"), tmp.path())
        .await
        .unwrap();

    assert_eq!(archive.ticker, "BBCA");
    assert_eq!(archive.path, tmp.path().join("instance.zip"));
    assert_eq!(archive.size_bytes, zip_bytes().len() as u64);
    assert_eq!(std::fs::read(&archive.path).unwrap(), zip_bytes());

    archive.discard().unwrap();
    assert!(!tmp.path().join("instance.zip").exists());
}

#[tokio::test]
async fn test_not_found() {
    let addr = spawn_server(Arc::default()).await;
    let tmp = TempDir::new().unwrap();
    let fetcher = HttpFetcher::with_config(fast_config());

    let err = fetcher
        .fetch(&entry(addr, "XYZ", "/missing/instance.zip"), tmp.path())
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::NotFound { .. }));
    assert_eq!(err.to_string(), "not found");
    assert!(!tmp.path().join("instance.zip").exists());
}

#[tokio::test]
async fn test_empty_body() {
    let addr = spawn_server(Arc::default()).await;
    let tmp = TempDir::new().unwrap();
    let fetcher = HttpFetcher::with_config(fast_config());

    let err = fetcher
        .fetch(&entry(addr, "BBCA", "/empty.zip"), tmp.path())
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::EmptyDownload(_)));
    assert!(!tmp.path().join("empty.zip").exists());
}

#[tokio::test]
async fn test_size_cap() {
    let addr = spawn_server(Arc::default()).await;
    let tmp = TempDir::new().unwrap();
    let fetcher = HttpFetcher::with_config(DownloadConfig {
        max_archive_bytes: 1024,
        ..fast_config()
    });

    let err = fetcher
        .fetch(&entry(addr, "BBCA", "/large.zip"), tmp.path())
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::TooLarge { limit: 1024 }));
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_server(Arc::clone(&hits)).await;
    let tmp = TempDir::new().unwrap();
    let fetcher = HttpFetcher::with_config(DownloadConfig {
        max_retries: 1,
        ..fast_config()
    });

    let archive = fetcher
        .fetch(&entry(addr, "BBCA", "/flaky.zip"), tmp.path())
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(archive.path.exists());
}

#[tokio::test]
async fn test_retries_exhausted() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_server(Arc::clone(&hits)).await;
    let tmp = TempDir::new().unwrap();
    let fetcher = HttpFetcher::with_config(fast_config());

    let err = fetcher
        .fetch(&entry(addr, "BBCA", "/flaky.zip"), tmp.path())
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::HttpStatus { status: 503, .. }));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_warmup_cookie_is_sent() {
    let addr = spawn_server(Arc::default()).await;
    let tmp = TempDir::new().unwrap();
    let target = entry(addr, "BBCA", "/protected/report.zip");

    let cold = HttpFetcher::with_config(DownloadConfig {
        max_retries: 2,
        ..fast_config()
    });
    let err = cold.fetch(&target, tmp.path()).await.unwrap_err();
    assert!(matches!(err, DataError::HttpStatus { status: 403, .. }));

    let warm = HttpFetcher::with_config(DownloadConfig {
        warmup_url: Some(Url::parse(&format!("http://{addr}/warmup")).unwrap()),
        ..fast_config()
    });
    let archive = warm.fetch(&target, tmp.path()).await.unwrap();
    assert_eq!(archive.path, tmp.path().join("report.zip"));
}

#[tokio::test]
async fn test_transient_warmup_failure_is_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_server(Arc::clone(&hits)).await;
    let tmp = TempDir::new().unwrap();
    let target = entry(addr, "BBCA", "/protected/report.zip");
    let warmup = Url::parse(&format!("http://{addr}/flaky-warmup")).unwrap();

    let no_retry = HttpFetcher::with_config(DownloadConfig {
        warmup_url: Some(warmup.clone()),
        ..fast_config()
    });
    let err = no_retry.fetch(&target, tmp.path()).await.unwrap_err();
    assert!(matches!(err, DataError::HttpStatus { status: 503, .. }));

    hits.store(0, Ordering::SeqCst);
    let retrying = HttpFetcher::with_config(DownloadConfig {
        warmup_url: Some(warmup),
        max_retries: 1,
        ..fast_config()
    });
    let archive = retrying.fetch(&target, tmp.path()).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(archive.path.exists());
}
