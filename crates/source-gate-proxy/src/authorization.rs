// crates/source-gate-proxy/src/authorization.rs
// ============================================================================
// Module: Authorization Interceptor
// Description: Per-request identity, extraction, and ownership orchestration.
// Purpose: Allow a query only when the caller may read every source in it.
// Dependencies: source-gate-query, tokio, axum
// ============================================================================

//! ## Overview
//! The authorization interceptor runs a fixed sequence per request:
//!
//! 1. Validate the bearer token (missing or invalid: `401`).
//! 2. Callers holding an admin scope are forwarded without source checks.
//! 3. Extract source identifiers from every `query` parameter the backend
//!    could evaluate: URL-encoded form bodies are buffered (up to
//!    [`MAX_FORM_BODY_BYTES`]) and their `query` fields are checked together
//!    with the URL's. Parse errors, unpinned terms, and multipart bodies
//!    answer `400`.
//! 4. Check every distinct source concurrently. The first negative answer
//!    denies with `403`; the first upstream failure denies with `502`.
//!    Returning early drops the outstanding checks.
//! 5. Otherwise the request continues down the chain with the same body.
//!
//! Security posture: the pipeline fails closed. Every ambiguity, timeout, or
//! upstream error denies, and a denied request never reaches the backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::body::Body;
use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_LENGTH;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;
use source_gate_query::QueryParser;
use source_gate_query::SourceExtractor;
use source_gate_query::SourceId;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::warn;

use crate::cache::AuthorizationCache;
use crate::chain::Next;
use crate::chain::RequestInterceptor;
use crate::identity::IdentityError;
use crate::identity::IdentityInfo;
use crate::identity::IdentityValidator;
use crate::ownership::ResourceAuthorizer;
use crate::telemetry::DecisionOutcome;
use crate::telemetry::NoopMetrics;
use crate::telemetry::ProxyMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// URL and form parameter carrying the expression.
pub const QUERY_PARAM: &str = "query";
/// Largest URL-encoded form body buffered for authorization.
pub const MAX_FORM_BODY_BYTES: usize = 256 * 1024;
/// Media type of URL-encoded form bodies.
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// Media type of multipart form bodies.
const FORM_MULTIPART: &str = "multipart/form-data";

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of authorizing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    /// Request continues down the chain unchanged.
    Forwarded,
    /// Request is answered with `status` and an error body.
    Denied {
        /// Response status.
        status: StatusCode,
        /// Message returned to the caller.
        reason: String,
    },
}

impl AuthorizationDecision {
    /// Returns true when the request may continue.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Forwarded)
    }
}

// ============================================================================
// SECTION: Interceptor
// ============================================================================

/// Authorization stage of the interceptor chain.
pub struct AuthorizationInterceptor {
    /// Bearer token validator.
    identity: Arc<dyn IdentityValidator>,
    /// Per-source ownership checks.
    authorizer: Arc<dyn ResourceAuthorizer>,
    /// Source identifier extraction.
    extractor: Arc<dyn SourceExtractor>,
    /// Scopes that bypass source checks.
    admin_scopes: Vec<String>,
    /// Optional cache of positive per-source decisions.
    cache: Option<Arc<AuthorizationCache>>,
    /// Decision counters.
    metrics: Arc<dyn ProxyMetrics>,
}

impl AuthorizationInterceptor {
    /// Builds an interceptor with the default query parser, no cache, and no
    /// metrics.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityValidator>,
        authorizer: Arc<dyn ResourceAuthorizer>,
        admin_scopes: Vec<String>,
    ) -> Self {
        Self {
            identity,
            authorizer,
            extractor: Arc::new(QueryParser),
            admin_scopes,
            cache: None,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Replaces the source extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn SourceExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Enables the positive-decision cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<AuthorizationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Reports decisions into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn ProxyMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Decides whether a request with `headers` and `uri` may be forwarded.
    pub async fn decide(&self, headers: &HeaderMap, uri: &Uri) -> AuthorizationDecision {
        self.decide_form(headers, uri, None).await
    }

    /// Decides for a request whose URL-encoded form body, if any, is `form`.
    ///
    /// Every `query` value in the form and in the URL is authorized.
    pub async fn decide_form(
        &self,
        headers: &HeaderMap,
        uri: &Uri,
        form: Option<&[u8]>,
    ) -> AuthorizationDecision {
        let caller = match self.authenticate(headers).await {
            Ok(caller) => caller,
            Err(denied) => return denied,
        };
        if self.admin_bypass(&caller) {
            return AuthorizationDecision::Forwarded;
        }
        self.authorize_queries(&caller, &query_values(uri, form)).await
    }

    /// Validates the bearer token carried in `headers`.
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Caller, AuthorizationDecision> {
        let Some(authorization) =
            headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
        else {
            return Err(self.deny(
                DecisionOutcome::Unauthenticated,
                StatusCode::UNAUTHORIZED,
                "missing authorization".to_string(),
            ));
        };
        match self.identity.validate(authorization).await {
            Ok(identity) => Ok(Caller {
                authorization: authorization.to_string(),
                identity,
            }),
            Err(IdentityError::Unauthenticated(reason)) => {
                debug!(reason = %reason, "token rejected");
                Err(self.deny(
                    DecisionOutcome::Unauthenticated,
                    StatusCode::UNAUTHORIZED,
                    format!("unauthenticated: {reason}"),
                ))
            }
            Err(err @ IdentityError::Unavailable(_)) => {
                warn!(error = %err, "identity service unavailable");
                Err(self.deny(
                    DecisionOutcome::Unauthenticated,
                    StatusCode::UNAUTHORIZED,
                    "unable to validate token".to_string(),
                ))
            }
        }
    }

    /// Returns true, recording the bypass, when the caller holds an admin scope.
    fn admin_bypass(&self, caller: &Caller) -> bool {
        if !caller.identity.has_any_scope(&self.admin_scopes) {
            return false;
        }
        debug!(subject = %caller.identity.subject, "admin scope bypass");
        self.metrics.record_decision(DecisionOutcome::AdminBypass);
        true
    }

    /// Extracts sources from every candidate query and checks their union.
    ///
    /// No candidate at all is treated as one empty query.
    async fn authorize_queries(&self, caller: &Caller, queries: &[String]) -> AuthorizationDecision {
        let missing = [String::new()];
        let queries = if queries.is_empty() { &missing[..] } else { queries };
        let mut sources = BTreeSet::new();
        for query in queries {
            match self.extractor.extract(query) {
                Ok(found) => sources.extend(found),
                Err(err) => {
                    return self.deny(
                        DecisionOutcome::InvalidQuery,
                        StatusCode::BAD_REQUEST,
                        err.to_string(),
                    );
                }
            }
        }
        self.authorize_sources(&caller.authorization, &caller.identity, sources).await
    }

    /// Checks every source concurrently; any negative or failed check denies.
    async fn authorize_sources(
        &self,
        authorization: &str,
        identity: &IdentityInfo,
        sources: BTreeSet<SourceId>,
    ) -> AuthorizationDecision {
        let mut checks = JoinSet::new();
        for source_id in sources {
            if self.cache.as_ref().is_some_and(|cache| cache.is_allowed(authorization, &source_id)) {
                continue;
            }
            let authorizer = Arc::clone(&self.authorizer);
            let authorization = authorization.to_string();
            checks.spawn(async move {
                let outcome = authorizer.is_authorized(&authorization, &source_id).await;
                (source_id, outcome)
            });
        }
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok((source_id, Ok(true))) => {
                    if let Some(cache) = &self.cache {
                        cache.record_allowed(authorization, &source_id, identity.expires_at);
                    }
                }
                Ok((source_id, Ok(false))) => {
                    debug!(subject = %identity.subject, source_id = %source_id, "source denied");
                    return self.deny(
                        DecisionOutcome::Forbidden,
                        StatusCode::FORBIDDEN,
                        format!("not authorized to read source {source_id}"),
                    );
                }
                Ok((source_id, Err(err))) => {
                    warn!(source_id = %source_id, error = %err, "ownership check failed");
                    return self.deny(
                        DecisionOutcome::UpstreamUnavailable,
                        StatusCode::BAD_GATEWAY,
                        "unable to verify source access".to_string(),
                    );
                }
                Err(err) => {
                    warn!(error = %err, "ownership check task failed");
                    return self.deny(
                        DecisionOutcome::UpstreamUnavailable,
                        StatusCode::BAD_GATEWAY,
                        "unable to verify source access".to_string(),
                    );
                }
            }
        }
        self.metrics.record_decision(DecisionOutcome::Allowed);
        AuthorizationDecision::Forwarded
    }

    /// Records and returns a denial.
    fn deny(
        &self,
        outcome: DecisionOutcome,
        status: StatusCode,
        reason: String,
    ) -> AuthorizationDecision {
        self.metrics.record_decision(outcome);
        AuthorizationDecision::Denied {
            status,
            reason,
        }
    }
}

#[async_trait]
impl RequestInterceptor for AuthorizationInterceptor {
    async fn handle(&self, request: Request<Body>, next: Next<'_>) -> Response {
        let caller = match self.authenticate(request.headers()).await {
            Ok(caller) => caller,
            Err(denied) => return denied.into_response(),
        };
        if self.admin_bypass(&caller) {
            return next.run(request).await;
        }
        let (parts, body) = request.into_parts();
        let (body, form) = match buffer_form(&parts.headers, body).await {
            Ok(buffered) => buffered,
            Err((status, reason)) => {
                return self.deny(DecisionOutcome::InvalidQuery, status, reason).into_response();
            }
        };
        match self.authorize_queries(&caller, &query_values(&parts.uri, form.as_deref())).await {
            AuthorizationDecision::Forwarded => next.run(Request::from_parts(parts, body)).await,
            denied => denied.into_response(),
        }
    }
}

impl IntoResponse for AuthorizationDecision {
    /// Renders a denial as its JSON error; `Forwarded` renders as an empty
    /// `200` since interceptors forward instead of rendering it.
    fn into_response(self) -> Response {
        match self {
            Self::Forwarded => StatusCode::OK.into_response(),
            Self::Denied {
                status,
                reason,
            } => (status, Json(json!({ "error": reason }))).into_response(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Authenticated caller.
struct Caller {
    /// Raw `Authorization` header value, reused for ownership checks.
    authorization: String,
    /// Validated token details.
    identity: IdentityInfo,
}

/// Collects every `query` value from the form body and then the URL.
fn query_values(uri: &Uri, form: Option<&[u8]>) -> Vec<String> {
    form.into_iter()
        .chain(uri.query().map(str::as_bytes))
        .flat_map(url::form_urlencoded::parse)
        .filter(|(name, _)| name == QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .collect()
}

/// Buffers a URL-encoded form body so its fields can be authorized. Other
/// bodies pass through untouched as the returned [`Body`].
///
/// # Errors
///
/// Returns a status and reason for multipart bodies, oversized forms, and
/// unreadable bodies.
async fn buffer_form(
    headers: &HeaderMap,
    body: Body,
) -> Result<(Body, Option<Bytes>), (StatusCode, String)> {
    if !is_urlencoded_form(headers)? {
        return Ok((body, None));
    }
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared.is_some_and(|length| length > MAX_FORM_BODY_BYTES) {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("form body exceeds {MAX_FORM_BODY_BYTES} bytes"),
        ));
    }
    let form = axum::body::to_bytes(body, MAX_FORM_BODY_BYTES)
        .await
        .map_err(|err| (StatusCode::BAD_REQUEST, format!("unable to read form body: {err}")))?;
    Ok((Body::from(form.clone()), Some(form)))
}

/// Returns whether `headers` declare a URL-encoded form body.
///
/// # Errors
///
/// Rejects multipart bodies and content types that are not visible ASCII.
fn is_urlencoded_form(headers: &HeaderMap) -> Result<bool, (StatusCode, String)> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(false);
    };
    let Ok(value) = value.to_str() else {
        return Err((StatusCode::BAD_REQUEST, "content type is not valid text".to_string()));
    };
    let media_type = value.split(';').next().unwrap_or_default().trim();
    if media_type.eq_ignore_ascii_case(FORM_MULTIPART) {
        return Err((
            StatusCode::BAD_REQUEST,
            "multipart form bodies are not supported".to_string(),
        ));
    }
    Ok(media_type.eq_ignore_ascii_case(FORM_URLENCODED))
}
