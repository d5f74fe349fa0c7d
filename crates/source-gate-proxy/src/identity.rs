// crates/source-gate-proxy/src/identity.rs
// ============================================================================
// Module: Identity Validator
// Description: Bearer token validation via identity service introspection.
// Purpose: Resolve a caller's Authorization header into an identity.
// Dependencies: reqwest, serde
// ============================================================================

//! ## Overview
//! [`IdentityValidator`] turns the raw `Authorization` header into an
//! [`IdentityInfo`]. The production implementation, [`IntrospectionValidator`],
//! posts the bearer token to the identity service's introspection endpoint
//! using the proxy's own client credentials.
//!
//! Security posture: headers and introspection responses are untrusted. Any
//! malformed header, inactive token, expired token, or unexpected response
//! fails closed as [`IdentityError::Unauthenticated`]. Transport failures are
//! reported as [`IdentityError::Unavailable`] and also deny.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::telemetry::NoopMetrics;
use crate::telemetry::ProxyMetrics;
use crate::telemetry::Upstream;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted `Authorization` header size in bytes.
pub const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

/// Maximum accepted introspection response size in bytes.
const MAX_INTROSPECTION_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Identity resolved from a valid bearer token.
///
/// Lives for one request and is never stored beyond it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityInfo {
    /// Whether the identity service reported the token as active.
    pub active: bool,
    /// User or client identifier the token was issued to.
    pub subject: String,
    /// OAuth client that requested the token, when reported.
    pub client_id: Option<String>,
    /// Granted scopes.
    pub scopes: BTreeSet<String>,
    /// Token expiry, when reported.
    pub expires_at: Option<SystemTime>,
}

impl IdentityInfo {
    /// Returns true when any of `scopes` was granted.
    #[must_use]
    pub fn has_any_scope(&self, scopes: &[String]) -> bool {
        scopes.iter().any(|scope| self.scopes.contains(scope))
    }
}

/// Bearer token validation interface.
#[async_trait]
pub trait IdentityValidator: Send + Sync {
    /// Validates the raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the token is not acceptable.
    async fn validate(&self, authorization: &str) -> Result<IdentityInfo, IdentityError>;
}

// ============================================================================
// SECTION: Introspection Validator
// ============================================================================

/// Identity validator backed by an OAuth token introspection endpoint.
pub struct IntrospectionValidator {
    /// Full introspection endpoint URL.
    endpoint: String,
    /// Client id presented via HTTP basic auth.
    client_id: String,
    /// Client secret presented via HTTP basic auth.
    client_secret: String,
    /// HTTP client configured with timeouts and trust roots.
    client: Client,
    /// Latency sink.
    metrics: Arc<dyn ProxyMetrics>,
}

impl IntrospectionValidator {
    /// Builds a validator for `base_url` joined with `introspection_path`.
    #[must_use]
    pub fn new(
        base_url: &str,
        introspection_path: &str,
        client_id: String,
        client_secret: String,
        client: Client,
    ) -> Self {
        let endpoint = format!("{}{introspection_path}", base_url.trim_end_matches('/'));
        Self {
            endpoint,
            client_id,
            client_secret,
            client,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Reports introspection latency into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn ProxyMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Posts the token to the introspection endpoint and returns the body.
    async fn introspect(&self, token: &str) -> Result<Vec<u8>, IdentityError> {
        let started = Instant::now();
        let result = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", token)])
            .send()
            .await;
        self.metrics.record_upstream_latency(Upstream::Identity, started.elapsed());
        let response = result.map_err(|err| IdentityError::Unavailable(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Unauthenticated(format!(
                "introspection rejected token: status {status}"
            )));
        }
        if response
            .content_length()
            .is_some_and(|len| len > MAX_INTROSPECTION_BYTES as u64)
        {
            return Err(IdentityError::Unauthenticated(
                "introspection response too large".to_string(),
            ));
        }
        let body =
            response.bytes().await.map_err(|err| IdentityError::Unavailable(err.to_string()))?;
        if body.len() > MAX_INTROSPECTION_BYTES {
            return Err(IdentityError::Unauthenticated(
                "introspection response too large".to_string(),
            ));
        }
        Ok(body.to_vec())
    }
}

#[async_trait]
impl IdentityValidator for IntrospectionValidator {
    async fn validate(&self, authorization: &str) -> Result<IdentityInfo, IdentityError> {
        let token = parse_bearer_token(authorization)?;
        let body = self.introspect(token).await?;
        let response: IntrospectionResponse = serde_json::from_slice(&body).map_err(|_| {
            IdentityError::Unauthenticated("malformed introspection response".to_string())
        })?;
        response.into_identity(SystemTime::now())
    }
}

// ============================================================================
// SECTION: Introspection Payload
// ============================================================================

/// Introspection response fields consumed by the proxy.
///
/// Accepts both RFC 7662 responses and the `check_token` shape, which omits
/// `active` and reports scopes as an array.
#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    /// RFC 7662 activity flag; absent in `check_token` responses.
    #[serde(default)]
    active: Option<bool>,
    /// User identifier.
    #[serde(default)]
    user_id: Option<String>,
    /// Token subject.
    #[serde(default)]
    sub: Option<String>,
    /// OAuth client identifier.
    #[serde(default)]
    client_id: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    scope: Option<ScopeClaim>,
    /// Expiry in seconds since the epoch.
    #[serde(default)]
    exp: Option<u64>,
}

/// Scope claim encodings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScopeClaim {
    /// JSON array of scope strings.
    List(Vec<String>),
    /// Space-delimited scope string.
    Delimited(String),
}

impl IntrospectionResponse {
    /// Converts the payload into an identity, rejecting inactive or expired
    /// tokens as of `now`.
    fn into_identity(self, now: SystemTime) -> Result<IdentityInfo, IdentityError> {
        if self.active == Some(false) {
            return Err(IdentityError::Unauthenticated("token is not active".to_string()));
        }
        let expires_at = self.exp.map(|exp| UNIX_EPOCH + Duration::from_secs(exp));
        if expires_at.is_some_and(|expiry| expiry <= now) {
            return Err(IdentityError::Unauthenticated("token has expired".to_string()));
        }
        let subject = self
            .user_id
            .or(self.sub)
            .or_else(|| self.client_id.clone())
            .filter(|subject| !subject.is_empty())
            .ok_or_else(|| {
                IdentityError::Unauthenticated("introspection response lacks subject".to_string())
            })?;
        let scopes = match self.scope {
            Some(ScopeClaim::List(scopes)) => scopes.into_iter().collect(),
            Some(ScopeClaim::Delimited(scopes)) => {
                scopes.split_whitespace().map(str::to_string).collect()
            }
            None => BTreeSet::new(),
        };
        Ok(IdentityInfo {
            active: true,
            subject,
            client_id: self.client_id,
            scopes,
            expires_at,
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identity validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Token is missing, malformed, inactive, or expired.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Identity service could not be reached.
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the token from a `Bearer <token>` header value.
///
/// # Errors
///
/// Returns [`IdentityError::Unauthenticated`] for oversized headers, other
/// schemes, or empty tokens.
pub fn parse_bearer_token(header: &str) -> Result<&str, IdentityError> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(IdentityError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(IdentityError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token)
}
