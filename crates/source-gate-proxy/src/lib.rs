// crates/source-gate-proxy/src/lib.rs
// ============================================================================
// Module: Source Gate Proxy
// Description: Authorizing reverse proxy for a metrics query backend.
// Purpose: Forward a query only when the caller may read every source in it.
// Dependencies: axum, axum-server, reqwest, rustls, prometheus, tokio
// ============================================================================

//! ## Overview
//! Every request passes through an interceptor chain built once at startup:
//!
//! 1. [`audit::AuditInterceptor`] records one access entry per request.
//! 2. [`authorization::AuthorizationInterceptor`] validates the bearer token,
//!    extracts the `source_id` values the query reads, and checks ownership
//!    of each one.
//! 3. [`forward::BackendForwarder`] streams the request to the backend and
//!    the response back.
//!
//! Denied requests never reach the backend. [`gate::SourceGate`] wires the
//! whole pipeline from [`source_gate_config::SourceGateConfig`].

pub mod audit;
pub mod authorization;
pub mod cache;
pub mod chain;
pub mod forward;
pub mod gate;
pub mod identity;
pub mod ownership;
pub mod server;
pub mod telemetry;
pub mod tls;
pub mod upstream;

pub use audit::AccessAuditSink;
pub use audit::AccessLogEntry;
pub use audit::AuditInterceptor;
pub use audit::FileAccessAuditSink;
pub use audit::NoopAccessAuditSink;
pub use audit::StderrAccessAuditSink;
pub use authorization::AuthorizationDecision;
pub use authorization::AuthorizationInterceptor;
pub use authorization::MAX_FORM_BODY_BYTES;
pub use cache::AuthorizationCache;
pub use chain::Forwarder;
pub use chain::InterceptorChain;
pub use chain::Next;
pub use chain::RequestInterceptor;
pub use forward::BackendForwarder;
pub use gate::GateError;
pub use gate::RunningGate;
pub use gate::SourceGate;
pub use identity::IdentityError;
pub use identity::IdentityInfo;
pub use identity::IdentityValidator;
pub use identity::IntrospectionValidator;
pub use ownership::OwnershipError;
pub use ownership::OwnershipServiceAuthorizer;
pub use ownership::ResourceAuthorizer;
pub use server::ProxyServer;
pub use server::ProxyServerBuilder;
pub use server::ProxyServerError;
pub use server::RunningServer;
pub use server::start_metrics_server;
pub use telemetry::DecisionOutcome;
pub use telemetry::MetricsRegistry;
pub use telemetry::NoopMetrics;
pub use telemetry::PrometheusMetrics;
pub use telemetry::ProxyMetrics;
pub use tls::TlsError;
