// crates/source-gate-proxy/src/audit/tests.rs
// ============================================================================
// Module: Access Audit Tests
// Description: Unit tests for audit sinks and the audit interceptor.
// Purpose: Validate one-record-per-request and failure isolation.
// Dependencies: source-gate-proxy, tempfile
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::io;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;

use super::AccessAuditSink;
use super::AccessLogEntry;
use super::AuditInterceptor;
use super::FileAccessAuditSink;
use crate::chain::Forwarder;
use crate::chain::InterceptorChain;
use crate::chain::Next;
use crate::chain::RequestInterceptor;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

#[derive(Default)]
struct MemorySink {
    entries: Mutex<Vec<AccessLogEntry>>,
}

impl AccessAuditSink for MemorySink {
    fn record(&self, entry: &AccessLogEntry) -> io::Result<()> {
        self.entries.lock().expect("entries lock").push(entry.clone());
        Ok(())
    }
}

struct FailingSink;

impl AccessAuditSink for FailingSink {
    fn record(&self, _entry: &AccessLogEntry) -> io::Result<()> {
        Err(io::Error::other("disk full"))
    }
}

struct StatusForwarder(StatusCode);

#[async_trait]
impl Forwarder for StatusForwarder {
    async fn forward(&self, _request: Request<Body>) -> Response {
        self.0.into_response()
    }
}

struct Deny;

#[async_trait]
impl RequestInterceptor for Deny {
    async fn handle(&self, _request: Request<Body>, _next: Next<'_>) -> Response {
        StatusCode::FORBIDDEN.into_response()
    }
}

fn request(path: &str) -> Request<Body> {
    Request::builder().method("GET").uri(path).body(Body::empty()).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn address_is_masked_with_internal_ip() {
    let sink = Arc::new(MemorySink::default());
    let v4 = AuditInterceptor::new(sink.clone(), IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8083);
    assert_eq!(v4.address(), "0.0.0.0:8083");
    let v6 = AuditInterceptor::new(sink, IpAddr::V6(Ipv6Addr::LOCALHOST), 443);
    assert_eq!(v6.address(), "[::1]:443");
}

#[tokio::test]
async fn records_forwarded_status_without_query() {
    let sink = Arc::new(MemorySink::default());
    let audit = AuditInterceptor::new(sink.clone(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 8083);
    let chain =
        InterceptorChain::new(vec![Arc::new(audit)], Arc::new(StatusForwarder(StatusCode::OK)));
    let response = chain.dispatch(request("/api/v1/query?query=secret")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].method, "GET");
    assert_eq!(entries[0].path, "/api/v1/query");
    assert_eq!(entries[0].address, "10.0.0.1:8083");
    assert_eq!(entries[0].status, 200);
    assert!(entries[0].timestamp_ms > 0);
}

#[tokio::test]
async fn records_denials_from_inner_stages() {
    let sink = Arc::new(MemorySink::default());
    let audit = AuditInterceptor::new(sink.clone(), IpAddr::V4(Ipv4Addr::UNSPECIFIED), 1);
    let chain = InterceptorChain::new(
        vec![Arc::new(audit), Arc::new(Deny)],
        Arc::new(StatusForwarder(StatusCode::OK)),
    );
    let response = chain.dispatch(request("/api/v1/query")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, 403);
}

#[tokio::test]
async fn sink_failure_keeps_response() {
    let audit = AuditInterceptor::new(Arc::new(FailingSink), IpAddr::V4(Ipv4Addr::UNSPECIFIED), 1);
    let chain = InterceptorChain::new(
        vec![Arc::new(audit)],
        Arc::new(StatusForwarder(StatusCode::NOT_FOUND)),
    );
    let response = chain.dispatch(request("/missing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn file_sink_appends_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access.log");
    let sink = FileAccessAuditSink::new(&path).unwrap();
    for status in [200, 403] {
        let entry = AccessLogEntry {
            timestamp_ms: 1,
            method: "GET".to_string(),
            path: "/api/v1/query".to_string(),
            address: "0.0.0.0:8083".to_string(),
            status,
        };
        sink.record(&entry).unwrap();
    }
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> =
        contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["status"], 403);
    assert_eq!(lines[0]["address"], "0.0.0.0:8083");
}
