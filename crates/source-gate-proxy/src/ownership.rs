// crates/source-gate-proxy/src/ownership.rs
// ============================================================================
// Module: Resource Authorizer
// Description: Per-source read checks against the ownership service.
// Purpose: Decide whether a caller may read one source identifier.
// Dependencies: reqwest, url, source-gate-query
// ============================================================================

//! ## Overview
//! [`ResourceAuthorizer`] answers one question: may the caller holding this
//! `Authorization` header read this source? [`OwnershipServiceAuthorizer`]
//! asks the ownership service by fetching the source's resource with the
//! caller's own token. Sources may be applications or service instances, so
//! resource path templates are tried in order until one grants access.
//!
//! Security posture: this is a trust boundary and it fails closed. Statuses
//! outside the known grant/deny set and transport failures are errors, never
//! grants.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use source_gate_config::SOURCE_ID_PLACEHOLDER;
use source_gate_query::SourceId;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::telemetry::NoopMetrics;
use crate::telemetry::ProxyMetrics;
use crate::telemetry::Upstream;

// ============================================================================
// SECTION: Public Types
// ============================================================================

/// Per-source read authorization interface.
#[async_trait]
pub trait ResourceAuthorizer: Send + Sync {
    /// Returns whether the caller may read `source_id`.
    ///
    /// # Errors
    ///
    /// Returns [`OwnershipError`] when no definitive answer was obtained.
    async fn is_authorized(
        &self,
        authorization: &str,
        source_id: &SourceId,
    ) -> Result<bool, OwnershipError>;
}

/// Ownership-service-backed resource authorizer.
pub struct OwnershipServiceAuthorizer {
    /// Ownership service base URL.
    base_url: Url,
    /// Resource path templates, each containing the source placeholder.
    templates: Vec<String>,
    /// HTTP client configured with timeouts and trust roots.
    client: Client,
    /// Latency sink.
    metrics: Arc<dyn ProxyMetrics>,
}

impl OwnershipServiceAuthorizer {
    /// Builds an authorizer for `base_url` trying `templates` in order.
    ///
    /// # Errors
    ///
    /// Returns [`OwnershipError::InvalidConfig`] when the base URL cannot
    /// carry a path or a template lacks the source placeholder.
    pub fn new(
        base_url: &str,
        templates: Vec<String>,
        client: Client,
    ) -> Result<Self, OwnershipError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| OwnershipError::InvalidConfig(format!("base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(OwnershipError::InvalidConfig("base url cannot carry a path".to_string()));
        }
        if templates.is_empty() {
            return Err(OwnershipError::InvalidConfig("no resource paths".to_string()));
        }
        if let Some(template) =
            templates.iter().find(|template| !template.contains(SOURCE_ID_PLACEHOLDER))
        {
            return Err(OwnershipError::InvalidConfig(format!(
                "resource path {template} lacks {SOURCE_ID_PLACEHOLDER}"
            )));
        }
        Ok(Self {
            base_url,
            templates,
            client,
            metrics: Arc::new(NoopMetrics),
        })
    }

    /// Reports ownership latency into `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn ProxyMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Expands `template` for `source_id`, percent-encoding the identifier as
    /// path segment content.
    ///
    /// Returns `None` when an expanded segment is `.` or `..`, which URL
    /// normalization would drop and so address a different resource.
    fn resource_url(
        &self,
        template: &str,
        source_id: &SourceId,
    ) -> Result<Option<Url>, OwnershipError> {
        let expanded: Vec<String> = template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.replace(SOURCE_ID_PLACEHOLDER, source_id.as_str()))
            .collect();
        if expanded.iter().any(|segment| segment == "." || segment == "..") {
            return Ok(None);
        }
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                OwnershipError::InvalidConfig("base url cannot carry a path".to_string())
            })?;
            segments.pop_if_empty();
            segments.extend(&expanded);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(Some(url))
    }
}

#[async_trait]
impl ResourceAuthorizer for OwnershipServiceAuthorizer {
    async fn is_authorized(
        &self,
        authorization: &str,
        source_id: &SourceId,
    ) -> Result<bool, OwnershipError> {
        for template in &self.templates {
            let Some(url) = self.resource_url(template, source_id)? else {
                debug!(source_id = %source_id, "source is not addressable as a path segment");
                continue;
            };
            let started = Instant::now();
            let result = self.client.get(url).header(AUTHORIZATION, authorization).send().await;
            self.metrics.record_upstream_latency(Upstream::Ownership, started.elapsed());
            let response = result.map_err(|err| OwnershipError::Unavailable(err.to_string()))?;
            match response.status() {
                StatusCode::OK => return Ok(true),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {}
                status => {
                    return Err(OwnershipError::Unavailable(format!(
                        "ownership service error: status {status}"
                    )));
                }
            }
        }
        Ok(false)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Resource authorizer failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OwnershipError {
    /// Authorizer construction input is invalid.
    #[error("invalid ownership config: {0}")]
    InvalidConfig(String),
    /// Ownership service did not give a definitive answer.
    #[error("ownership service unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests;
