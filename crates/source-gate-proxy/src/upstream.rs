// crates/source-gate-proxy/src/upstream.rs
// ============================================================================
// Module: Upstream Clients
// Description: HTTP client construction for identity and ownership calls.
// Purpose: Apply one timeout and trust policy to every authorization call.
// Dependencies: reqwest, source-gate-config
// ============================================================================

//! ## Overview
//! Authorization calls share one client policy: explicit connect and total
//! timeouts, trust roots from a configured CA bundle, no idle connection
//! reuse, and no redirect following. A timeout surfaces as a transport error
//! and becomes a per-request deny upstream of this module.
//!
//! A [`ServerNamePin`] lets the ownership service be dialed at its configured
//! address while its certificate is verified against a different name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::path::Path;

use reqwest::Client;
use reqwest::redirect::Policy;
use source_gate_config::UpstreamConfig;
use url::Host;
use url::Url;

use crate::tls::TlsError;
use crate::tls::load_ca_bundle;

// ============================================================================
// SECTION: Client Builder
// ============================================================================

/// Builds a client for identity or ownership calls.
///
/// # Errors
///
/// Returns [`TlsError`] when the CA bundle is unusable or the client fails to
/// build.
pub fn authorization_client(
    ca_path: Option<&Path>,
    upstream: &UpstreamConfig,
    pin: Option<&ServerNamePin>,
) -> Result<Client, TlsError> {
    let mut builder = Client::builder()
        .connect_timeout(upstream.connect_timeout())
        .timeout(upstream.request_timeout())
        .pool_max_idle_per_host(0)
        .redirect(Policy::none())
        .danger_accept_invalid_certs(upstream.skip_cert_verify);
    if let Some(pin) = pin {
        builder = builder.resolve_to_addrs(&pin.server_name, &pin.addrs);
    }
    if let Some(path) = ca_path {
        for cert in load_ca_bundle(path)? {
            builder = builder.add_root_certificate(cert);
        }
    }
    builder.build().map_err(|err| TlsError::Config(err.to_string()))
}

// ============================================================================
// SECTION: Server Name Override
// ============================================================================

/// Endpoint whose certificate name differs from the address it is dialed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNamePin {
    /// Base URL with its host replaced by `server_name`.
    pub base_url: String,
    /// Name presented for SNI and certificate verification.
    pub server_name: String,
    /// Addresses `server_name` resolves to, taken from the original URL.
    pub addrs: Vec<SocketAddr>,
}

/// Rewrites `base_url` to use `server_name` as its host and records the
/// addresses the original host resolved to.
///
/// # Errors
///
/// Returns [`TlsError::Config`] when the URL has no host or port, the
/// server name is not a valid host, or the original host does not resolve.
pub fn pin_server_name(base_url: &str, server_name: &str) -> Result<ServerNamePin, TlsError> {
    let mut url =
        Url::parse(base_url).map_err(|err| TlsError::Config(format!("{base_url}: {err}")))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| TlsError::Config(format!("{base_url}: no port for scheme")))?;
    let addrs: Vec<SocketAddr> = match url.host() {
        Some(Host::Ipv4(ip)) => vec![SocketAddr::new(ip.into(), port)],
        Some(Host::Ipv6(ip)) => vec![SocketAddr::new(ip.into(), port)],
        Some(Host::Domain(domain)) => (domain, port)
            .to_socket_addrs()
            .map_err(|err| TlsError::Config(format!("{domain}: {err}")))?
            .collect(),
        None => return Err(TlsError::Config(format!("{base_url}: no host"))),
    };
    if addrs.is_empty() {
        return Err(TlsError::Config(format!("{base_url}: host resolved to no addresses")));
    }
    url.set_host(Some(server_name))
        .map_err(|err| TlsError::Config(format!("server name {server_name}: {err}")))?;
    Ok(ServerNamePin {
        base_url: url.to_string(),
        server_name: server_name.to_string(),
        addrs,
    })
}

/// Builds the client used to forward allowed requests to the backend.
///
/// Only the connect phase is bounded; responses stream for as long as the
/// backend keeps them open.
///
/// # Errors
///
/// Returns [`TlsError::Config`] when the client fails to build.
pub fn backend_client(upstream: &UpstreamConfig) -> Result<Client, TlsError> {
    Client::builder()
        .connect_timeout(upstream.connect_timeout())
        .redirect(Policy::none())
        .danger_accept_invalid_certs(upstream.skip_cert_verify)
        .build()
        .map_err(|err| TlsError::Config(err.to_string()))
}
