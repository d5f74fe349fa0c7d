// crates/source-gate-proxy/src/audit.rs
// ============================================================================
// Module: Access Audit
// Description: Access log records and the outermost audit interceptor.
// Purpose: Record exactly one entry per completed request.
// Dependencies: serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`AuditInterceptor`] wraps the whole chain, so it observes the final
//! status of every request whether it was forwarded or denied. Records are
//! JSON lines written to an [`AccessAuditSink`]. The listener address in each
//! record is masked as `<internal_ip>:<port>` so host addresses do not leak
//! into shared log pipelines.
//!
//! Audit failures never change the response; they are reported through
//! `tracing` and dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use serde::Serialize;
use tracing::warn;

use crate::chain::Next;
use crate::chain::RequestInterceptor;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One access log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessLogEntry {
    /// Completion timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request method.
    pub method: String,
    /// Request path, without the query string.
    pub path: String,
    /// Masked listener address.
    pub address: String,
    /// Final response status.
    pub status: u16,
}

impl AccessLogEntry {
    /// Builds an entry stamped with the current time.
    #[must_use]
    pub fn new(method: String, path: String, address: String, status: u16) -> Self {
        Self {
            timestamp_ms: now_millis(),
            method,
            path,
            address,
            status,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for access log records.
pub trait AccessAuditSink: Send + Sync {
    /// Writes one record.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the record could not be written.
    fn record(&self, entry: &AccessLogEntry) -> io::Result<()>;
}

/// Writes JSON lines to stderr.
pub struct StderrAccessAuditSink;

impl AccessAuditSink for StderrAccessAuditSink {
    fn record(&self, entry: &AccessLogEntry) -> io::Result<()> {
        let payload = serde_json::to_string(entry).map_err(io::Error::other)?;
        writeln!(io::stderr(), "{payload}")
    }
}

/// Appends JSON lines to a file.
pub struct FileAccessAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAccessAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AccessAuditSink for FileAccessAuditSink {
    fn record(&self, entry: &AccessLogEntry) -> io::Result<()> {
        let payload = serde_json::to_string(entry).map_err(io::Error::other)?;
        let mut file =
            self.file.lock().map_err(|_| io::Error::other("audit file lock poisoned"))?;
        writeln!(file, "{payload}")?;
        file.flush()
    }
}

/// Discards records.
pub struct NoopAccessAuditSink;

impl AccessAuditSink for NoopAccessAuditSink {
    fn record(&self, _entry: &AccessLogEntry) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Interceptor
// ============================================================================

/// Outermost interceptor recording one access entry per request.
pub struct AuditInterceptor {
    /// Record destination.
    sink: Arc<dyn AccessAuditSink>,
    /// Masked listener address reported in every record.
    address: String,
}

impl AuditInterceptor {
    /// Builds an interceptor reporting `internal_ip:port` as the address.
    #[must_use]
    pub fn new(sink: Arc<dyn AccessAuditSink>, internal_ip: IpAddr, port: u16) -> Self {
        Self {
            sink,
            address: SocketAddr::new(internal_ip, port).to_string(),
        }
    }

    /// Returns the masked address reported in records.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl RequestInterceptor for AuditInterceptor {
    async fn handle(&self, request: Request<Body>, next: Next<'_>) -> Response {
        let method = request.method().to_string();
        let path = request.uri().path().to_string();
        let response = next.run(request).await;
        let entry =
            AccessLogEntry::new(method, path, self.address.clone(), response.status().as_u16());
        if let Err(err) = self.sink.record(&entry) {
            warn!(error = %err, "access audit write failed");
        }
        response
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current time in milliseconds since the epoch.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

#[cfg(test)]
mod tests;
