//! Integration tests for the `/metrics/{id}` endpoint.
//!
//! A mock RIPE Atlas API runs on a loopback port and counts how often it is
//! hit; the exporter router is driven either in-process or over TCP.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

use atlas_probe_exporter::config::Config;
use atlas_probe_exporter::error::INTERNAL_ERROR_BODY;
use atlas_probe_exporter::handlers;
use atlas_probe_exporter::state::{AppState, SharedState};
use atlas_probe_exporter::upstream::MAX_BODY_BYTES;

const MINIMAL_BODY: &str = r#"{"address_v4":"192.0.2.1","address_v6":"","status":{"id":1},"status_since":1700000000,"total_uptime":3600}"#;

#[derive(Default)]
struct MockUpstream {
    hits: AtomicUsize,
}

impl MockUpstream {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Full probe document the way the API returns it, values derived from `n`.
fn full_body(n: u64) -> String {
    format!(
        r#"{{"id":{n},"address_v4":"10.0.{a}.{b}","address_v6":"2001:db8::{n:x}","asn_v4":3333,"status":{{"id":{s},"name":"Connected","since":"2023-11-14T22:13:20Z"}},"status_since":{since},"total_uptime":{uptime},"first_connected":1500000000,"last_connected":{since},"is_public":true}}"#,
        a = (n / 256) % 256,
        b = n % 256,
        s = n % 3 + 1,
        since = 1_700_000_000 + n,
        uptime = n * 100,
    )
}

fn json(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

async fn mock_probe(State(mock): State<Arc<MockUpstream>>, Path(id): Path<String>) -> Response {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    match id.as_str() {
        "1" => json(MINIMAL_BODY.to_string()),
        "404" => (StatusCode::NOT_FOUND, r#"{"detail":"Not found."}"#).into_response(),
        "503" => (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response(),
        "777" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        "888" => json(r#"{"address_v4":null,"address_v6":null}"#.to_string()),
        "555" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            json(full_body(555))
        }
        "2222" => json(format!(
            r#"{{"status":{{"id":1}},"padding":"{}"}}"#,
            "x".repeat(MAX_BODY_BYTES)
        )),
        "999" => {
            tokio::time::sleep(Duration::from_millis(300)).await;
            json(full_body(999))
        }
        other => json(full_body(other.parse().unwrap_or(0))),
    }
}

async fn spawn_mock() -> (String, Arc<MockUpstream>) {
    let mock = Arc::new(MockUpstream::default());
    let app = Router::new()
        .route("/api/v2/probes/{id}/", get(mock_probe))
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), mock)
}

/// Upstream that promises a longer body than it sends, then hangs up.
async fn spawn_truncating_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 1000\r\n\r\n{\"status\":",
                    )
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

fn exporter(upstream_url: &str, coalesce: bool) -> (Router, SharedState) {
    let config = Config {
        upstream_url: Some(upstream_url.to_string()),
        upstream_timeout_secs: Some(1),
        coalesce_requests: Some(coalesce),
        ..Config::default()
    };
    let state = AppState::from_config(&config).unwrap().shared();
    (handlers::router(state.clone(), &config), state)
}

struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

async fn request(app: &Router, uri: &str) -> Reply {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    Reply {
        status,
        content_type,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

fn sample_lines(body: &str) -> Vec<&str> {
    body.lines().filter(|l| !l.starts_with('#')).collect()
}

#[tokio::test]
async fn test_full_probe_yields_six_series() {
    let (url, mock) = spawn_mock().await;
    let (app, _) = exporter(&url, false);

    let reply = request(&app, "/metrics/6001").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.content_type.unwrap().starts_with("text/plain"));

    let samples = sample_lines(&reply.body);
    assert_eq!(samples.len(), 6, "{}", reply.body);
    assert!(samples.contains(&"atlas_status 2"));
    assert!(samples.contains(&"atlas_status_since 1700006001"));
    assert!(samples.contains(&"atlas_total_uptime 600100"));
    assert!(samples.contains(&"atlas_first_connected 1500000000"));
    assert!(samples.contains(&"atlas_last_connected 1700006001"));
    assert!(samples.contains(&r#"atlas_info{address_v4="10.0.23.113",address_v6="2001:db8::1771"} 1"#));
    assert_eq!(mock.hits(), 1);
}

#[tokio::test]
async fn test_minimal_probe_body() {
    let (url, _) = spawn_mock().await;
    let (app, _) = exporter(&url, false);

    let reply = request(&app, "/metrics/1").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("atlas_status 1\n"));
    assert!(reply.body.contains("atlas_total_uptime 3600\n"));
    assert!(reply
        .body
        .contains("atlas_info{address_v4=\"192.0.2.1\",address_v6=\"\"} 1\n"));

    let samples = sample_lines(&reply.body);
    assert_eq!(samples.len(), 6, "{}", reply.body);
    assert!(samples.contains(&"atlas_first_connected 0"));
    assert!(samples.contains(&"atlas_last_connected 0"));
}

#[tokio::test]
async fn test_invalid_ids_never_reach_upstream() {
    let (url, mock) = spawn_mock().await;
    let (app, state) = exporter(&url, false);

    for uri in [
        "/metrics/abc",
        "/metrics/12a",
        "/metrics/-1",
        "/metrics/1.5",
        "/metrics/%20",
        "/metrics/",
        "/metrics/1/extra",
        "/probes/1",
    ] {
        let reply = request(&app, uri).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND, "{uri}");
    }

    assert_eq!(mock.hits(), 0);
    assert_eq!(state.health_stats.scrapes_total.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_upstream_errors_become_500() {
    let (url, mock) = spawn_mock().await;
    let (app, state) = exporter(&url, false);

    for id in ["404", "503", "777", "888"] {
        let reply = request(&app, &format!("/metrics/{id}")).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR, "probe {id}");
        assert_eq!(reply.body, INTERNAL_ERROR_BODY);
        assert!(!reply.body.contains("atlas_"));
    }

    assert_eq!(mock.hits(), 4);
    assert_eq!(
        state.health_stats.upstream_unavailable.load(Ordering::Relaxed),
        2
    );
    assert_eq!(state.health_stats.decode_errors.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn test_upstream_timeout_becomes_500() {
    let (url, _) = spawn_mock().await;
    let (app, state) = exporter(&url, false);

    let reply = request(&app, "/metrics/555").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        state.health_stats.upstream_timeouts.load(Ordering::Relaxed),
        1
    );
}

#[tokio::test]
async fn test_unreachable_upstream_becomes_500() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (app, state) = exporter(&format!("http://{addr}"), false);
    let reply = request(&app, "/metrics/6001").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        state.health_stats.upstream_unavailable.load(Ordering::Relaxed),
        1
    );
}

#[tokio::test]
async fn test_truncated_upstream_body_becomes_500() {
    let url = spawn_truncating_upstream().await;
    let (app, state) = exporter(&url, false);

    let reply = request(&app, "/metrics/6001").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, INTERNAL_ERROR_BODY);
    assert_eq!(state.health_stats.body_read_errors.load(Ordering::Relaxed), 1);
    assert_eq!(state.health_stats.decode_errors.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_oversized_upstream_body_becomes_500() {
    let (url, mock) = spawn_mock().await;
    let (app, state) = exporter(&url, false);

    let reply = request(&app, "/metrics/2222").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(mock.hits(), 1);
    assert_eq!(state.health_stats.body_read_errors.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_repeated_scrapes_refetch_and_match() {
    let (url, mock) = spawn_mock().await;
    let (app, _) = exporter(&url, false);

    let first = request(&app, "/metrics/6001").await;
    let second = request(&app, "/metrics/6001").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
    assert_eq!(mock.hits(), 2);
}

#[tokio::test]
async fn test_concurrent_scrapes_over_tcp_stay_separate() {
    let (url, mock) = spawn_mock().await;
    let (app, _) = exporter(&url, false);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let mut handles = Vec::new();
    for n in 1000..1016u64 {
        let client = client.clone();
        let uri = format!("http://{addr}/metrics/{n}");
        handles.push(tokio::spawn(async move {
            let response = client.get(uri).send().await.unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            (n, response.text().await.unwrap())
        }));
    }

    for handle in handles {
        let (n, body) = handle.await.unwrap();
        let samples = sample_lines(&body);
        assert_eq!(samples.len(), 6, "{body}");
        let uptime_line = format!("atlas_total_uptime {}", n * 100);
        let info_line = format!(
            r#"atlas_info{{address_v4="10.0.{}.{}",address_v6="2001:db8::{:x}"}} 1"#,
            (n / 256) % 256,
            n % 256,
            n
        );
        assert!(samples.contains(&uptime_line.as_str()), "{body}");
        assert!(samples.contains(&info_line.as_str()), "{body}");
    }
    assert_eq!(mock.hits(), 16);
}

#[tokio::test]
async fn test_coalescing_shares_one_upstream_request() {
    let (url, mock) = spawn_mock().await;
    let (app, state) = exporter(&url, true);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            request(&app, "/metrics/999").await
        }));
    }

    let mut bodies = Vec::new();
    for handle in handles {
        let reply = handle.await.unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        bodies.push(reply.body);
    }
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(mock.hits(), 1);
    assert!(state.inflight.as_ref().unwrap().is_empty());

    // A later scrape fetches again
    let reply = request(&app, "/metrics/999").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(mock.hits(), 2);
}

#[tokio::test]
async fn test_without_coalescing_every_scrape_fetches() {
    let (url, mock) = spawn_mock().await;
    let (app, _) = exporter(&url, false);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            request(&app, "/metrics/999").await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().status, StatusCode::OK);
    }
    assert_eq!(mock.hits(), 4);
}

#[tokio::test]
async fn test_exporter_telemetry_and_health() {
    let (url, _) = spawn_mock().await;
    let (app, _) = exporter(&url, false);

    request(&app, "/metrics/6001").await;
    request(&app, "/metrics/777").await;
    request(&app, "/metrics/abc").await;

    let telemetry = request(&app, "/metrics").await;
    assert_eq!(telemetry.status, StatusCode::OK);
    assert!(telemetry
        .body
        .contains(r#"atlas_exporter_scrapes_total{result="success"} 1"#));
    assert!(telemetry
        .body
        .contains(r#"atlas_exporter_scrapes_total{result="not_found"} 1"#));
    assert!(telemetry
        .body
        .contains(r#"atlas_exporter_errors_total{kind="decode_failure"} 1"#));
    assert!(!telemetry.body.contains("atlas_status "));

    let health = request(&app, "/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert!(health.body.starts_with("OK\n"));
    assert!(health.body.contains(&url));
    assert!(health.body.contains("scrapes_total"));

    let root = request(&app, "/").await;
    assert_eq!(root.status, StatusCode::OK);
    assert!(root.body.contains("/metrics/"));
}

#[tokio::test]
async fn test_optional_endpoints_can_be_disabled() {
    let (url, _) = spawn_mock().await;
    let config = Config {
        upstream_url: Some(url),
        enable_health: Some(false),
        enable_telemetry: Some(false),
        ..Config::default()
    };
    let state = AppState::from_config(&config).unwrap().shared();
    let app = handlers::router(state, &config);

    assert_eq!(request(&app, "/health").await.status, StatusCode::NOT_FOUND);
    assert_eq!(request(&app, "/metrics").await.status, StatusCode::NOT_FOUND);
    assert_eq!(request(&app, "/metrics/6001").await.status, StatusCode::OK);
}
