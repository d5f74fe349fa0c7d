// crates/source-gate-proxy/src/gate.rs
// ============================================================================
// Module: Source Gate Assembly
// Description: Builds the full proxy from validated configuration.
// Purpose: Wire clients, authorization, audit, TLS, and metrics in one place.
// Dependencies: source-gate-config
// ============================================================================

//! ## Overview
//! [`SourceGate::from_config`] performs every startup-fatal step (CA and
//! certificate loading, client construction, audit file opening) before any
//! listener is bound. [`SourceGate::start`] then binds the metrics listener
//! (when configured) and the proxy listener.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use source_gate_config::ConfigError;
use source_gate_config::SourceGateConfig;
use thiserror::Error;
use tracing::info;

use crate::audit::AccessAuditSink;
use crate::audit::AuditInterceptor;
use crate::audit::FileAccessAuditSink;
use crate::audit::NoopAccessAuditSink;
use crate::audit::StderrAccessAuditSink;
use crate::authorization::AuthorizationInterceptor;
use crate::cache::AuthorizationCache;
use crate::chain::InterceptorChain;
use crate::forward::BackendForwarder;
use crate::identity::IntrospectionValidator;
use crate::ownership::OwnershipError;
use crate::ownership::OwnershipServiceAuthorizer;
use crate::server::ProxyServer;
use crate::server::ProxyServerBuilder;
use crate::server::ProxyServerError;
use crate::server::RunningServer;
use crate::server::start_metrics_server;
use crate::telemetry::MetricsError;
use crate::telemetry::MetricsRegistry;
use crate::telemetry::PrometheusMetrics;
use crate::telemetry::ProxyMetrics;
use crate::tls::TlsError;
use crate::tls::load_server_tls;
use crate::upstream::authorization_client;
use crate::upstream::backend_client;
use crate::upstream::pin_server_name;

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Fully wired proxy, ready to bind.
pub struct SourceGate {
    /// Proxy listener and chain.
    proxy: ProxyServer,
    /// Registry exposed on the metrics listener.
    registry: MetricsRegistry,
    /// Metrics listen address, when enabled.
    metrics_bind: Option<SocketAddr>,
}

impl SourceGate {
    /// Builds every component described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] when configuration is invalid or TLS material,
    /// CA bundles, or the audit log cannot be loaded.
    pub fn from_config(config: &SourceGateConfig) -> Result<Self, GateError> {
        config.validate()?;
        let registry = MetricsRegistry::new();
        let metrics: Arc<dyn ProxyMetrics> = Arc::new(PrometheusMetrics::new(&registry)?);

        let identity_client = authorization_client(
            config.identity.ca_path.as_deref().map(Path::new),
            &config.upstream,
            None,
        )?;
        let validator = IntrospectionValidator::new(
            &config.identity.url,
            &config.identity.introspection_path,
            config.identity.client_id.clone(),
            config.identity.client_secret.clone(),
            identity_client,
        )
        .with_metrics(Arc::clone(&metrics));

        let ownership_pin = config
            .ownership
            .server_name
            .as_deref()
            .map(|name| pin_server_name(&config.ownership.url, name))
            .transpose()?;
        let ownership_client = authorization_client(
            config.ownership.ca_path.as_deref().map(Path::new),
            &config.upstream,
            ownership_pin.as_ref(),
        )?;
        let ownership_url =
            ownership_pin.as_ref().map_or(config.ownership.url.as_str(), |pin| pin.base_url.as_str());
        let authorizer = OwnershipServiceAuthorizer::new(
            ownership_url,
            config.ownership.resource_paths.clone(),
            ownership_client,
        )?
        .with_metrics(Arc::clone(&metrics));

        let mut authorization = AuthorizationInterceptor::new(
            Arc::new(validator),
            Arc::new(authorizer),
            config.identity.admin_scopes.clone(),
        )
        .with_metrics(metrics);
        if let Some(ttl) = config.ownership.cache_ttl() {
            let cache = AuthorizationCache::new(ttl, config.ownership.cache_max_entries);
            authorization = authorization.with_cache(Arc::new(cache));
        }

        let bind = config.server.bind_addr()?;
        let forwarder =
            BackendForwarder::new(&config.server.backend_url, backend_client(&config.upstream)?);
        let mut builder = ProxyServerBuilder::new(bind, Arc::new(forwarder))
            .audit(Arc::new(audit_interceptor(config, bind.port())?))
            .authorization(Arc::new(authorization));
        if let Some(tls) = &config.server.tls {
            builder =
                builder.tls(load_server_tls(Path::new(&tls.cert_path), Path::new(&tls.key_path))?);
        }

        Ok(Self {
            proxy: builder.build(),
            registry,
            metrics_bind: config.server.metrics_addr()?,
        })
    }

    /// Returns the chain every proxied request passes through.
    #[must_use]
    pub fn chain(&self) -> &InterceptorChain {
        self.proxy.chain()
    }

    /// Returns the registry the proxy reports into.
    #[must_use]
    pub const fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Binds the metrics listener (when enabled) and the proxy listener.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Server`] when a listener cannot be bound.
    pub async fn start(self) -> Result<RunningGate, GateError> {
        let metrics = match self.metrics_bind {
            Some(bind) => Some(start_metrics_server(bind, self.registry).await?),
            None => None,
        };
        let proxy = match self.proxy.start().await {
            Ok(proxy) => proxy,
            Err(err) => {
                if let Some(metrics) = metrics {
                    let _ = metrics.shutdown().await;
                }
                return Err(err.into());
            }
        };
        Ok(RunningGate {
            proxy,
            metrics,
        })
    }
}

/// Builds the audit stage; a disabled audit log records into a no-op sink.
fn audit_interceptor(config: &SourceGateConfig, port: u16) -> Result<AuditInterceptor, GateError> {
    if !config.audit.enabled {
        return Ok(AuditInterceptor::new(
            Arc::new(NoopAccessAuditSink),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
        ));
    }
    let internal_ip: IpAddr = config.audit.internal_ip.parse().map_err(|_| {
        GateError::Config(ConfigError::Invalid("audit.internal_ip must be an IP address".to_string()))
    })?;
    let sink: Arc<dyn AccessAuditSink> = match &config.audit.path {
        Some(path) => Arc::new(
            FileAccessAuditSink::new(Path::new(path))
                .map_err(|err| GateError::Audit(format!("{path}: {err}")))?,
        ),
        None => Arc::new(StderrAccessAuditSink),
    };
    Ok(AuditInterceptor::new(sink, internal_ip, port))
}

/// Listeners of a started [`SourceGate`].
pub struct RunningGate {
    /// Proxy listener.
    proxy: RunningServer,
    /// Metrics listener, when enabled.
    metrics: Option<RunningServer>,
}

impl RunningGate {
    /// Returns the bound proxy address.
    #[must_use]
    pub const fn proxy_addr(&self) -> SocketAddr {
        self.proxy.addr()
    }

    /// Returns the bound metrics address, when enabled.
    #[must_use]
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics.as_ref().map(RunningServer::addr)
    }

    /// Drains and stops every listener.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Server`] when a listener ended with an error.
    pub async fn shutdown(self) -> Result<(), GateError> {
        let proxy = self.proxy.shutdown().await;
        if let Some(metrics) = self.metrics {
            metrics.shutdown().await?;
        }
        info!("source gate stopped");
        Ok(proxy?)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Startup errors.
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// TLS material or CA bundles are unusable.
    #[error(transparent)]
    Tls(#[from] TlsError),
    /// Ownership client settings are unusable.
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
    /// Metrics could not be registered.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    /// Audit log could not be opened.
    #[error("audit log error: {0}")]
    Audit(String),
    /// Listener failure.
    #[error(transparent)]
    Server(#[from] ProxyServerError),
}
