// crates/source-gate-proxy/src/chain/tests.rs
// ============================================================================
// Module: Interceptor Chain Tests
// Description: Unit tests for chain ordering and short-circuiting.
// Purpose: Validate that stages run in order and denials stop the chain.
// Dependencies: source-gate-proxy
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;

use super::Forwarder;
use super::InterceptorChain;
use super::Next;
use super::RequestInterceptor;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

struct Recording {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    deny_with: Option<StatusCode>,
}

#[async_trait]
impl RequestInterceptor for Recording {
    async fn handle(&self, request: Request<Body>, next: Next<'_>) -> Response {
        self.log.lock().expect("log lock").push(format!("enter {}", self.name));
        let response = match self.deny_with {
            Some(status) => status.into_response(),
            None => next.run(request).await,
        };
        self.log
            .lock()
            .expect("log lock")
            .push(format!("exit {} {}", self.name, response.status().as_u16()));
        response
    }
}

#[derive(Default)]
struct CountingForwarder {
    calls: AtomicUsize,
}

#[async_trait]
impl Forwarder for CountingForwarder {
    async fn forward(&self, _request: Request<Body>) -> Response {
        self.calls.fetch_add(1, Ordering::SeqCst);
        StatusCode::OK.into_response()
    }
}

fn stage(
    name: &'static str,
    log: &Arc<Mutex<Vec<String>>>,
    deny_with: Option<StatusCode>,
) -> Arc<dyn RequestInterceptor> {
    Arc::new(Recording {
        name,
        log: Arc::clone(log),
        deny_with,
    })
}

fn request() -> Request<Body> {
    Request::builder().uri("/api/v1/query").body(Body::empty()).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn stages_wrap_forwarder_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let forwarder = Arc::new(CountingForwarder::default());
    let chain = InterceptorChain::new(
        vec![stage("outer", &log, None), stage("inner", &log, None)],
        Arc::clone(&forwarder) as Arc<dyn Forwarder>,
    );
    let response = chain.dispatch(request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(forwarder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        *log.lock().unwrap(),
        ["enter outer", "enter inner", "exit inner 200", "exit outer 200"]
    );
}

#[tokio::test]
async fn denial_short_circuits_and_outer_sees_status() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let forwarder = Arc::new(CountingForwarder::default());
    let chain = InterceptorChain::new(
        vec![
            stage("outer", &log, None),
            stage("deny", &log, Some(StatusCode::NOT_FOUND)),
            stage("never", &log, None),
        ],
        Arc::clone(&forwarder) as Arc<dyn Forwarder>,
    );
    let response = chain.dispatch(request()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(forwarder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        *log.lock().unwrap(),
        ["enter outer", "enter deny", "exit deny 404", "exit outer 404"]
    );
}

#[tokio::test]
async fn empty_chain_reaches_forwarder() {
    let forwarder = Arc::new(CountingForwarder::default());
    let chain = InterceptorChain::new(Vec::new(), Arc::clone(&forwarder) as Arc<dyn Forwarder>);
    assert!(chain.is_empty());
    let response = chain.dispatch(request()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(forwarder.calls.load(Ordering::SeqCst), 1);
}
