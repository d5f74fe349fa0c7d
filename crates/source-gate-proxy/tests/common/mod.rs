// crates/source-gate-proxy/tests/common/mod.rs
// =============================================================================
// Module: Proxy Test Helpers
// Description: In-process identity, ownership, and backend fakes.
// Purpose: Drive the proxy end to end without external services.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use axum::Form;
use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde_json::json;
use tokio::sync::oneshot;

/// Token holding an admin scope.
pub const ADMIN_TOKEN: &str = "admin-token";
/// Token holding only ordinary scopes.
pub const USER_TOKEN: &str = "user-token";
/// Source owned as an application.
pub const OWNED_APP: &str = "app-1";
/// Source owned as a service instance.
pub const OWNED_SERVICE: &str = "svc-1";
/// Source the ownership service fails on.
pub const BROKEN_SOURCE: &str = "broken";

/// Running in-process HTTP server.
pub struct TestServer {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Stops the server when sent or dropped.
    shutdown_tx: oneshot::Sender<()>,
}

impl TestServer {
    /// Stops the server.
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Serves `app` on an ephemeral loopback port.
pub async fn spawn(app: Router) -> TestServer {
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
    TestServer {
        base_url: format!("http://{addr}"),
        shutdown_tx,
    }
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Fake token introspection endpoint at `/check_token`.
pub async fn spawn_identity() -> TestServer {
    async fn check_token(Form(form): Form<HashMap<String, String>>) -> Response {
        match form.get("token").map(String::as_str) {
            Some(ADMIN_TOKEN) => {
                Json(json!({ "user_id": "admin", "scope": ["openid", "logs.admin"] }))
                    .into_response()
            }
            Some(USER_TOKEN) => {
                Json(json!({ "user_id": "user-1", "client_id": "cf", "scope": ["openid"] }))
                    .into_response()
            }
            _ => (StatusCode::BAD_REQUEST, Json(json!({ "error": "invalid_token" })))
                .into_response(),
        }
    }
    spawn(Router::new().route("/check_token", post(check_token))).await
}

// ============================================================================
// SECTION: Ownership
// ============================================================================

/// Request counters for the fake ownership service.
#[derive(Default)]
pub struct OwnershipCalls {
    /// Paths requested, in arrival order.
    pub paths: Mutex<Vec<String>>,
}

impl OwnershipCalls {
    /// Returns the requested paths.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().expect("paths lock").clone()
    }
}

/// Fake ownership service answering the app and service instance paths.
pub async fn spawn_ownership() -> (TestServer, Arc<OwnershipCalls>) {
    async fn app(
        State(calls): State<Arc<OwnershipCalls>>,
        Path(id): Path<String>,
        headers: HeaderMap,
        uri: Uri,
    ) -> StatusCode {
        calls.paths.lock().expect("paths lock").push(uri.path().to_string());
        if headers.get("authorization").is_none_or(|value| value != "Bearer user-token") {
            return StatusCode::UNAUTHORIZED;
        }
        match id.as_str() {
            OWNED_APP => StatusCode::OK,
            BROKEN_SOURCE => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::NOT_FOUND,
        }
    }
    async fn service_instance(
        State(calls): State<Arc<OwnershipCalls>>,
        Path(id): Path<String>,
        uri: Uri,
    ) -> StatusCode {
        calls.paths.lock().expect("paths lock").push(uri.path().to_string());
        if id == OWNED_SERVICE { StatusCode::OK } else { StatusCode::FORBIDDEN }
    }
    let calls = Arc::new(OwnershipCalls::default());
    let router = Router::new()
        .route("/v3/apps/{id}", get(app))
        .route("/v2/service_instances/{id}", get(service_instance))
        .with_state(Arc::clone(&calls));
    (spawn(router).await, calls)
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Request counter for the fake backend.
#[derive(Default)]
pub struct BackendCalls {
    /// Number of requests received.
    pub count: AtomicUsize,
    /// Last request URI.
    pub last_uri: Mutex<Option<String>>,
}

impl BackendCalls {
    /// Number of requests received.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Fake metrics backend answering every path with a fixed JSON body.
pub async fn spawn_backend() -> (TestServer, Arc<BackendCalls>) {
    async fn answer(State(calls): State<Arc<BackendCalls>>, uri: Uri) -> Response {
        calls.count.fetch_add(1, Ordering::SeqCst);
        *calls.last_uri.lock().expect("uri lock") = Some(uri.to_string());
        Json(json!({ "status": "success", "data": { "result": [] } })).into_response()
    }
    let calls = Arc::new(BackendCalls::default());
    let router = Router::new().fallback(answer).with_state(Arc::clone(&calls));
    (spawn(router).await, calls)
}

/// Percent-encodes a query for the `query` URL parameter.
pub fn encode_query(query: &str) -> String {
    url::form_urlencoded::byte_serialize(query.as_bytes()).collect()
}
