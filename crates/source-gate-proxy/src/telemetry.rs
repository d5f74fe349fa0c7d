// crates/source-gate-proxy/src/telemetry.rs
// ============================================================================
// Module: Proxy Telemetry
// Description: Metric registry and authorization metric hooks.
// Purpose: Count decisions and track upstream latency for scraping.
// Dependencies: prometheus
// ============================================================================

//! ## Overview
//! Telemetry is split in two layers. [`MetricsRegistry`] is a thin wrapper
//! over a `prometheus` registry that hands out counters and gauges and renders
//! the text exposition format. [`ProxyMetrics`] is the narrow interface the
//! authorization pipeline reports into, so tests and embedders can swap in
//! [`NoopMetrics`]. Labels are fixed enums; request data never becomes a label.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use prometheus::Counter;
use prometheus::Encoder;
use prometheus::Gauge;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use thiserror::Error;

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Terminal outcome of one authorization decision.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionOutcome {
    /// Every referenced source was authorized.
    Allowed,
    /// Caller carried an admin scope; source checks skipped.
    AdminBypass,
    /// Token missing, invalid, or identity service unreachable.
    Unauthenticated,
    /// Query failed to parse or left a term unpinned.
    InvalidQuery,
    /// At least one source was not authorized.
    Forbidden,
    /// Ownership service failed to answer.
    UpstreamUnavailable,
}

impl DecisionOutcome {
    /// Every outcome, in label order.
    pub const ALL: [Self; 6] = [
        Self::Allowed,
        Self::AdminBypass,
        Self::Unauthenticated,
        Self::InvalidQuery,
        Self::Forbidden,
        Self::UpstreamUnavailable,
    ];

    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::AdminBypass => "admin_bypass",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidQuery => "invalid_query",
            Self::Forbidden => "forbidden",
            Self::UpstreamUnavailable => "upstream_unavailable",
        }
    }
}

/// Upstream service classification for latency reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upstream {
    /// Token introspection endpoint.
    Identity,
    /// Resource ownership endpoint.
    Ownership,
}

impl Upstream {
    /// Returns a stable label for the upstream.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Ownership => "ownership",
        }
    }
}

// ============================================================================
// SECTION: Metrics Interface
// ============================================================================

/// Metrics sink for the authorization pipeline.
///
/// Implementations must tolerate concurrent calls from many requests.
pub trait ProxyMetrics: Send + Sync {
    /// Records one authorization decision.
    fn record_decision(&self, outcome: DecisionOutcome);
    /// Records the latency of one upstream call.
    fn record_upstream_latency(&self, upstream: Upstream, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
pub struct NoopMetrics;

impl ProxyMetrics for NoopMetrics {
    fn record_decision(&self, _outcome: DecisionOutcome) {}

    fn record_upstream_latency(&self, _upstream: Upstream, _latency: Duration) {}
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Shared metric registry rendered by the metrics endpoint.
///
/// Cloning is cheap; clones share the same underlying registry.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    /// Underlying prometheus registry.
    registry: Registry,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers and returns a monotonic counter.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Register`] when the name is invalid or taken.
    pub fn counter(&self, name: &str, help: &str) -> Result<Counter, MetricsError> {
        let counter = Counter::with_opts(Opts::new(name, help))
            .map_err(|err| MetricsError::Register(err.to_string()))?;
        self.register(counter.clone())?;
        Ok(counter)
    }

    /// Registers and returns a labeled integer counter family.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Register`] when the name is invalid or taken.
    pub fn counter_vec(
        &self,
        name: &str,
        help: &str,
        labels: &[&str],
    ) -> Result<IntCounterVec, MetricsError> {
        let family = IntCounterVec::new(Opts::new(name, help), labels)
            .map_err(|err| MetricsError::Register(err.to_string()))?;
        self.register(family.clone())?;
        Ok(family)
    }

    /// Registers and returns a gauge carrying a constant `unit` label.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Register`] when the name is invalid or taken.
    pub fn gauge(&self, name: &str, help: &str, unit: &str) -> Result<Gauge, MetricsError> {
        let gauge = Gauge::with_opts(Opts::new(name, help).const_label("unit", unit))
            .map_err(|err| MetricsError::Register(err.to_string()))?;
        self.register(gauge.clone())?;
        Ok(gauge)
    }

    /// Renders every registered metric in the text exposition format.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Encode`] when encoding fails.
    pub fn render(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|err| MetricsError::Encode(err.to_string()))?;
        String::from_utf8(buffer).map_err(|err| MetricsError::Encode(err.to_string()))
    }

    /// Registers a collector with the underlying registry.
    fn register<C>(&self, collector: C) -> Result<(), MetricsError>
    where
        C: prometheus::core::Collector + 'static,
    {
        self.registry
            .register(Box::new(collector))
            .map_err(|err| MetricsError::Register(err.to_string()))
    }
}

// ============================================================================
// SECTION: Prometheus Metrics
// ============================================================================

/// [`ProxyMetrics`] backed by a [`MetricsRegistry`].
pub struct PrometheusMetrics {
    /// Decision counts by outcome.
    decisions: IntCounterVec,
    /// Most recent identity introspection latency.
    identity_latency: Gauge,
    /// Most recent ownership check latency.
    ownership_latency: Gauge,
}

impl PrometheusMetrics {
    /// Registers the proxy metric families.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] when registration fails.
    pub fn new(registry: &MetricsRegistry) -> Result<Self, MetricsError> {
        let decisions = registry.counter_vec(
            "source_gate_authorization_decisions_total",
            "Authorization decisions by outcome.",
            &["outcome"],
        )?;
        for outcome in DecisionOutcome::ALL {
            let _ = decisions.with_label_values(&[outcome.as_str()]);
        }
        let identity_latency = registry.gauge(
            "source_gate_last_identity_latency",
            "Latency of the most recent token introspection call.",
            "seconds",
        )?;
        let ownership_latency = registry.gauge(
            "source_gate_last_ownership_latency",
            "Latency of the most recent ownership check.",
            "seconds",
        )?;
        Ok(Self {
            decisions,
            identity_latency,
            ownership_latency,
        })
    }
}

impl ProxyMetrics for PrometheusMetrics {
    fn record_decision(&self, outcome: DecisionOutcome) {
        self.decisions.with_label_values(&[outcome.as_str()]).inc();
    }

    fn record_upstream_latency(&self, upstream: Upstream, latency: Duration) {
        let gauge = match upstream {
            Upstream::Identity => &self.identity_latency,
            Upstream::Ownership => &self.ownership_latency,
        };
        gauge.set(latency.as_secs_f64());
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Metric registration or rendering failures.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Metric could not be created or registered.
    #[error("metric registration failed: {0}")]
    Register(String),
    /// Registry could not be rendered.
    #[error("metric encoding failed: {0}")]
    Encode(String),
}
