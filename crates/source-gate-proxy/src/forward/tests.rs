// crates/source-gate-proxy/src/forward/tests.rs
// ============================================================================
// Module: Backend Forwarder Tests
// Description: Unit tests for request relay and header hygiene.
// Purpose: Validate URI rewriting, body streaming, and failure mapping.
// Dependencies: source-gate-proxy, axum
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::Uri;
use reqwest::Client;
use tokio::sync::oneshot;

use super::BackendForwarder;
use super::strip_hop_by_hop;
use crate::chain::Forwarder;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Default, Clone)]
struct Seen {
    method: String,
    uri: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

async fn backend_handler(
    State(seen): State<Arc<Mutex<Seen>>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(&'static str, &'static str); 2], &'static str) {
    *seen.lock().expect("seen lock") = Seen {
        method: method.to_string(),
        uri: uri.to_string(),
        headers,
        body: body.to_vec(),
    };
    (StatusCode::ACCEPTED, [("x-backend", "yes"), ("keep-alive", "timeout=5")], "result")
}

async fn spawn_backend() -> (String, Arc<Mutex<Seen>>, oneshot::Sender<()>) {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let app = Router::new().fallback(backend_handler).with_state(Arc::clone(&seen));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    (format!("http://{addr}/"), seen, shutdown_tx)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn strips_static_and_connection_listed_headers() {
    let mut headers = HeaderMap::new();
    headers.insert("connection", HeaderValue::from_static("close, X-Private"));
    headers.insert("x-private", HeaderValue::from_static("1"));
    headers.insert("te", HeaderValue::from_static("trailers"));
    headers.insert("proxy-authorization", HeaderValue::from_static("Basic x"));
    headers.insert("authorization", HeaderValue::from_static("Bearer keep"));
    strip_hop_by_hop(&mut headers);
    assert_eq!(headers.len(), 1);
    assert_eq!(headers.get("authorization").unwrap(), "Bearer keep");
}

#[test]
fn base_url_trimmed_on_construction() {
    let forwarder = BackendForwarder::new("http://backend.local:8081/", Client::new());
    assert_eq!(forwarder.base_url(), "http://backend.local:8081");
}

#[tokio::test]
async fn relays_method_path_query_headers_and_body() {
    let (base_url, seen, shutdown_tx) = spawn_backend().await;
    let forwarder = BackendForwarder::new(&base_url, Client::new());
    let request = Request::builder()
        .method(Method::POST)
        .uri("https://proxy.local:8083/api/v1/query?query=up%7Bsource_id%3D%22a%22%7D")
        .header("authorization", "Bearer tok")
        .header("host", "proxy.local:8083")
        .header("connection", "x-private")
        .header("x-private", "drop me")
        .header("content-length", "7")
        .body(Body::from("payload"))
        .unwrap();
    let response = forwarder.forward(request).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.headers().get("x-backend").unwrap(), "yes");
    assert!(response.headers().get("keep-alive").is_none());
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"result");

    let seen = seen.lock().expect("seen lock").clone();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.uri, "/api/v1/query?query=up%7Bsource_id%3D%22a%22%7D");
    assert_eq!(seen.body, b"payload");
    assert_eq!(seen.headers.get("authorization").unwrap(), "Bearer tok");
    assert_ne!(seen.headers.get("host").unwrap(), "proxy.local:8083");
    assert!(seen.headers.get("x-private").is_none());
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn get_without_body_is_forwarded() {
    let (base_url, seen, shutdown_tx) = spawn_backend().await;
    let forwarder = BackendForwarder::new(&base_url, Client::new());
    let request = Request::builder().uri("/api/v1/labels").body(Body::empty()).unwrap();
    let response = forwarder.forward(request).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let seen = seen.lock().expect("seen lock").clone();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.uri, "/api/v1/labels");
    assert!(seen.body.is_empty());
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn unreachable_backend_is_bad_gateway() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let forwarder = BackendForwarder::new(&format!("http://{addr}"), Client::new());
    let request = Request::builder().uri("/api/v1/query").body(Body::empty()).unwrap();
    let response = forwarder.forward(request).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
