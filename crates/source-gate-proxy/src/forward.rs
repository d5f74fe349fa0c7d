// crates/source-gate-proxy/src/forward.rs
// ============================================================================
// Module: Backend Forwarder
// Description: Streaming reverse-proxy stage for allowed requests.
// Purpose: Relay requests to the fixed backend without buffering bodies.
// Dependencies: axum, reqwest, tracing
// ============================================================================

//! ## Overview
//! [`BackendForwarder`] is the innermost stage of the chain. It swaps the
//! scheme and authority of the inbound URI for the configured backend and
//! keeps method, path, query, end-to-end headers, and body. Request and
//! response bodies are streamed in both directions, so large query results
//! are never held in memory. A backend transport failure becomes `502`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use axum::body::Body;
use axum::body::HttpBody;
use axum::http::HeaderMap;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::CONNECTION;
use axum::http::header::HOST;
use axum::response::IntoResponse;
use axum::response::Response;
use reqwest::Client;
use tracing::warn;

use crate::chain::Forwarder;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Hop-by-hop headers that must not cross the proxy.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

// ============================================================================
// SECTION: Forwarder
// ============================================================================

/// Forwards requests to one fixed backend.
pub struct BackendForwarder {
    /// Backend base URL (no trailing slash).
    base_url: String,
    /// HTTP client for backend calls.
    client: Client,
}

impl BackendForwarder {
    /// Builds a forwarder targeting `base_url`.
    #[must_use]
    pub fn new(base_url: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Returns the backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Forwarder for BackendForwarder {
    async fn forward(&self, request: Request<Body>) -> Response {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path_and_query().map_or("/", |path| path.as_str());
        let url = format!("{}{path}", self.base_url);
        let has_body = body.size_hint().exact() != Some(0);
        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(HOST);

        let mut outbound = self.client.request(parts.method, url).headers(headers);
        if has_body {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }
        match outbound.send().await {
            Ok(upstream) => relay_response(upstream),
            Err(err) => {
                warn!(error = %err, "backend request failed");
                StatusCode::BAD_GATEWAY.into_response()
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a backend response into a streamed proxy response.
fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_hop_by_hop(&mut headers);
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Removes hop-by-hop headers, including any named by `Connection`.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

#[cfg(test)]
mod tests;
