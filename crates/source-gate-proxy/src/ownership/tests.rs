// crates/source-gate-proxy/src/ownership/tests.rs
// ============================================================================
// Module: Resource Authorizer Tests
// Description: Unit tests for ownership service checks.
// Purpose: Validate template fallback, encoding, and status mapping.
// Dependencies: source-gate-proxy, axum
// ============================================================================

//! ## Overview
//! Runs the ownership authorizer against an in-memory HTTP server whose
//! per-route statuses are fixed by each test.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::AUTHORIZATION;
use reqwest::Client;
use source_gate_query::SourceId;
use tokio::sync::oneshot;

use super::OwnershipError;
use super::OwnershipServiceAuthorizer;
use super::ResourceAuthorizer;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

struct TestServerState {
    apps_status: StatusCode,
    instances_status: StatusCode,
    hits: Mutex<Vec<(String, Option<String>)>>,
}

async fn resource_handler(
    State(state): State<Arc<TestServerState>>,
    headers: HeaderMap,
    uri: Uri,
) -> StatusCode {
    let authorization =
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    let path = uri.path().to_string();
    let status = if path.starts_with("/v3/apps/") {
        state.apps_status
    } else if path.starts_with("/v2/service_instances/") {
        state.instances_status
    } else {
        StatusCode::IM_A_TEAPOT
    };
    state.hits.lock().expect("hits lock").push((path, authorization));
    status
}

async fn spawn_ownership_server(
    apps_status: StatusCode,
    instances_status: StatusCode,
) -> (String, Arc<TestServerState>, oneshot::Sender<()>) {
    let state = Arc::new(TestServerState {
        apps_status,
        instances_status,
        hits: Mutex::new(Vec::new()),
    });
    let app = Router::new().fallback(resource_handler).with_state(Arc::clone(&state));
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
    (format!("http://{addr}"), state, shutdown_tx)
}

fn default_templates() -> Vec<String> {
    vec!["/v3/apps/{source_id}".to_string(), "/v2/service_instances/{source_id}".to_string()]
}

fn authorizer(base_url: &str) -> OwnershipServiceAuthorizer {
    let client = Client::builder()
        .connect_timeout(Duration::from_millis(250))
        .timeout(Duration::from_millis(500))
        .build()
        .expect("client");
    OwnershipServiceAuthorizer::new(base_url, default_templates(), client).expect("authorizer")
}

fn source(raw: &str) -> SourceId {
    SourceId::new(raw).expect("source id")
}

// ============================================================================
// SECTION: Construction
// ============================================================================

#[test]
fn rejects_template_without_placeholder() {
    let err = OwnershipServiceAuthorizer::new(
        "http://capi.local",
        vec!["/v3/apps".to_string()],
        Client::new(),
    )
    .err()
    .expect("invalid template");
    assert!(matches!(err, OwnershipError::InvalidConfig(_)));
}

#[test]
fn rejects_non_hierarchical_base_url() {
    let err = OwnershipServiceAuthorizer::new("mailto:ops@example.com", default_templates(), Client::new())
        .err()
        .expect("invalid base");
    assert!(matches!(err, OwnershipError::InvalidConfig(_)));
}

#[test]
fn resource_url_encodes_source_as_one_segment() {
    let authorizer = OwnershipServiceAuthorizer::new(
        "https://capi.local/prefix/",
        default_templates(),
        Client::new(),
    )
    .expect("authorizer");
    let url = authorizer
        .resource_url("/v3/apps/{source_id}", &source("a/../b?c#d"))
        .unwrap()
        .expect("addressable source");
    assert_eq!(url.as_str(), "https://capi.local/prefix/v3/apps/a%2F..%2Fb%3Fc%23d");
}

#[test]
fn dot_segment_sources_have_no_resource_url() {
    let authorizer = OwnershipServiceAuthorizer::new(
        "https://capi.local/prefix/",
        default_templates(),
        Client::new(),
    )
    .expect("authorizer");
    for raw in [".", ".."] {
        assert_eq!(authorizer.resource_url("/v3/apps/{source_id}", &source(raw)), Ok(None));
    }
    let url = authorizer
        .resource_url("/v3/apps/{source_id}", &source("..a"))
        .unwrap()
        .expect("addressable source");
    assert_eq!(url.as_str(), "https://capi.local/prefix/v3/apps/..a");
}

// ============================================================================
// SECTION: Checks
// ============================================================================

#[tokio::test]
async fn app_endpoint_grant_stops_iteration() {
    let (base_url, state, shutdown_tx) =
        spawn_ownership_server(StatusCode::OK, StatusCode::OK).await;
    let allowed = authorizer(&base_url).is_authorized("bearer tok", &source("app-1")).await;
    assert_eq!(allowed, Ok(true));
    let hits = state.hits.lock().expect("hits lock").clone();
    assert_eq!(hits, vec![("/v3/apps/app-1".to_string(), Some("bearer tok".to_string()))]);
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn falls_back_to_service_instances() {
    let (base_url, state, shutdown_tx) =
        spawn_ownership_server(StatusCode::NOT_FOUND, StatusCode::OK).await;
    let allowed = authorizer(&base_url).is_authorized("bearer tok", &source("svc-1")).await;
    assert_eq!(allowed, Ok(true));
    assert_eq!(state.hits.lock().expect("hits lock").len(), 2);
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn exhausted_templates_deny() {
    for (apps, instances) in [
        (StatusCode::NOT_FOUND, StatusCode::NOT_FOUND),
        (StatusCode::FORBIDDEN, StatusCode::UNAUTHORIZED),
    ] {
        let (base_url, _state, shutdown_tx) = spawn_ownership_server(apps, instances).await;
        let allowed = authorizer(&base_url).is_authorized("bearer tok", &source("x")).await;
        assert_eq!(allowed, Ok(false));
        let _ = shutdown_tx.send(());
    }
}

#[tokio::test]
async fn dot_segment_sources_are_denied_without_requests() {
    let (base_url, state, shutdown_tx) =
        spawn_ownership_server(StatusCode::OK, StatusCode::OK).await;
    for raw in [".", ".."] {
        let allowed = authorizer(&base_url).is_authorized("bearer tok", &source(raw)).await;
        assert_eq!(allowed, Ok(false));
    }
    assert!(state.hits.lock().expect("hits lock").is_empty());
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn unexpected_status_is_unavailable() {
    let (base_url, state, shutdown_tx) =
        spawn_ownership_server(StatusCode::INTERNAL_SERVER_ERROR, StatusCode::OK).await;
    let err = authorizer(&base_url).is_authorized("bearer tok", &source("x")).await.unwrap_err();
    assert!(matches!(err, OwnershipError::Unavailable(_)));
    assert_eq!(state.hits.lock().expect("hits lock").len(), 1);
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let err = authorizer(&format!("http://{addr}"))
        .is_authorized("bearer tok", &source("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, OwnershipError::Unavailable(_)));
}
