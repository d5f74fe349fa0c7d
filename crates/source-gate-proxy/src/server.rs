// crates/source-gate-proxy/src/server.rs
// ============================================================================
// Module: Proxy Server
// Description: Listener setup, chain assembly, and the metrics endpoint.
// Purpose: Serve every request through the interceptor chain.
// Dependencies: axum, axum-server, rustls, tokio
// ============================================================================

//! ## Overview
//! [`ProxyServerBuilder`] assembles the interceptor chain in a fixed order:
//! audit outermost, then authorization, then any extra interceptors, then
//! the forwarder. The order does not depend on the order builder methods are
//! called in. [`ProxyServer::start`] binds the listener (plaintext or TLS),
//! spawns serving on the runtime, and returns a [`RunningServer`] handle.
//!
//! The metrics endpoint is a separate plaintext listener serving `/metrics`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;
use tracing::warn;

use crate::chain::Forwarder;
use crate::chain::InterceptorChain;
use crate::chain::RequestInterceptor;
use crate::telemetry::MetricsRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Time allowed for in-flight requests to finish on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
/// Path served by the metrics listener.
pub const METRICS_PATH: &str = "/metrics";
/// Content type of the Prometheus text exposition format.
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Assembles a [`ProxyServer`].
pub struct ProxyServerBuilder {
    /// Listen address; port `0` picks an ephemeral port.
    bind: SocketAddr,
    /// Terminal stage of the chain.
    forwarder: Arc<dyn Forwarder>,
    /// Outermost stage.
    audit: Option<Arc<dyn RequestInterceptor>>,
    /// Stage after audit.
    authorization: Option<Arc<dyn RequestInterceptor>>,
    /// Stages after authorization, in insertion order.
    extra: Vec<Arc<dyn RequestInterceptor>>,
    /// TLS listener configuration; plaintext when absent.
    tls: Option<Arc<rustls::ServerConfig>>,
    /// Graceful shutdown window.
    shutdown_grace: Duration,
}

impl ProxyServerBuilder {
    /// Starts a builder listening on `bind` and forwarding through `forwarder`.
    #[must_use]
    pub fn new(bind: SocketAddr, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            bind,
            forwarder,
            audit: None,
            authorization: None,
            extra: Vec::new(),
            tls: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Sets the audit stage, always placed outermost.
    #[must_use]
    pub fn audit(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.audit = Some(interceptor);
        self
    }

    /// Sets the authorization stage, always placed directly inside audit.
    #[must_use]
    pub fn authorization(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.authorization = Some(interceptor);
        self
    }

    /// Appends a stage that runs after authorization.
    #[must_use]
    pub fn interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.extra.push(interceptor);
        self
    }

    /// Terminates TLS on the listener with `config`.
    #[must_use]
    pub fn tls(mut self, config: Arc<rustls::ServerConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    /// Overrides the graceful shutdown window.
    #[must_use]
    pub const fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Returns the chain in its fixed execution order.
    #[must_use]
    pub fn build_chain(&self) -> InterceptorChain {
        let interceptors = self
            .audit
            .iter()
            .chain(self.authorization.iter())
            .chain(self.extra.iter())
            .map(Arc::clone)
            .collect();
        InterceptorChain::new(interceptors, Arc::clone(&self.forwarder))
    }

    /// Finalizes the server.
    #[must_use]
    pub fn build(self) -> ProxyServer {
        ProxyServer {
            bind: self.bind,
            chain: Arc::new(self.build_chain()),
            tls: self.tls,
            shutdown_grace: self.shutdown_grace,
        }
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Configured proxy listener, not yet bound.
pub struct ProxyServer {
    /// Listen address.
    bind: SocketAddr,
    /// Shared request pipeline.
    chain: Arc<InterceptorChain>,
    /// TLS listener configuration.
    tls: Option<Arc<rustls::ServerConfig>>,
    /// Graceful shutdown window.
    shutdown_grace: Duration,
}

impl ProxyServer {
    /// Returns the chain every request passes through.
    #[must_use]
    pub fn chain(&self) -> &InterceptorChain {
        &self.chain
    }

    /// Binds the listener and starts serving in the background.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyServerError::Bind`] when the listener cannot be bound.
    pub async fn start(self) -> Result<RunningServer, ProxyServerError> {
        let app = Router::new().fallback(proxy_request).with_state(self.chain);
        let tls = self.tls.is_some();
        let running = serve(self.bind, app, self.tls, self.shutdown_grace).await?;
        info!(addr = %running.addr(), tls, "proxy listening");
        Ok(running)
    }
}

/// Starts the plaintext metrics listener serving [`METRICS_PATH`].
///
/// # Errors
///
/// Returns [`ProxyServerError::Bind`] when the listener cannot be bound.
pub async fn start_metrics_server(
    bind: SocketAddr,
    registry: MetricsRegistry,
) -> Result<RunningServer, ProxyServerError> {
    let app = Router::new().route(METRICS_PATH, get(render_metrics)).with_state(registry);
    let running = serve(bind, app, None, DEFAULT_SHUTDOWN_GRACE).await?;
    info!(addr = %running.addr(), "metrics listening");
    Ok(running)
}

// ============================================================================
// SECTION: Running Server
// ============================================================================

/// Handle to a listener serving in the background.
pub struct RunningServer {
    /// Bound address.
    addr: SocketAddr,
    /// Signals the listener to drain and stop.
    shutdown_tx: oneshot::Sender<()>,
    /// Serving task.
    task: JoinHandle<io::Result<()>>,
}

impl RunningServer {
    /// Returns the bound address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting connections and waits for in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyServerError::Serve`] when serving ended with an error.
    pub async fn shutdown(self) -> Result<(), ProxyServerError> {
        let _ = self.shutdown_tx.send(());
        join_server(self.task).await
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Listener lifecycle errors.
#[derive(Debug, Error)]
pub enum ProxyServerError {
    /// Listener could not be bound.
    #[error("bind failed: {0}")]
    Bind(String),
    /// Serving terminated with an error.
    #[error("server error: {0}")]
    Serve(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Spawns `app` on `bind` and waits until the listener is bound.
async fn serve(
    bind: SocketAddr,
    app: Router,
    tls: Option<Arc<rustls::ServerConfig>>,
    shutdown_grace: Duration,
) -> Result<RunningServer, ProxyServerError> {
    let handle = Handle::new();
    let server_handle = handle.clone();
    let service = app.into_make_service();
    let task = match tls {
        Some(config) => {
            let config = RustlsConfig::from_config(config);
            tokio::spawn(async move {
                axum_server::bind_rustls(bind, config).handle(server_handle).serve(service).await
            })
        }
        None => tokio::spawn(async move {
            axum_server::bind(bind).handle(server_handle).serve(service).await
        }),
    };
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let control = handle.clone();
    tokio::spawn(async move {
        if shutdown_rx.await.is_ok() {
            control.graceful_shutdown(Some(shutdown_grace));
        }
    });
    let Some(addr) = handle.listening().await else {
        let reason = match task.await {
            Ok(Err(err)) => err.to_string(),
            Ok(Ok(())) => "listener exited before binding".to_string(),
            Err(err) => err.to_string(),
        };
        return Err(ProxyServerError::Bind(format!("{bind}: {reason}")));
    };
    Ok(RunningServer {
        addr,
        shutdown_tx,
        task,
    })
}

/// Awaits the serving task and maps its outcome.
async fn join_server(task: JoinHandle<io::Result<()>>) -> Result<(), ProxyServerError> {
    match task.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(ProxyServerError::Serve(err.to_string())),
        Err(err) => Err(ProxyServerError::Serve(err.to_string())),
    }
}

/// Routes every proxied request through the chain.
async fn proxy_request(
    State(chain): State<Arc<InterceptorChain>>,
    request: Request<Body>,
) -> Response {
    chain.dispatch(request).await
}

/// Renders the registry in Prometheus text format.
async fn render_metrics(State(registry): State<MetricsRegistry>) -> Response {
    match registry.render() {
        Ok(body) => ([(CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response(),
        Err(err) => {
            warn!(error = %err, "metrics render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
