// crates/source-gate-proxy/src/tls.rs
// ============================================================================
// Module: TLS Material
// Description: Listener TLS configuration and CA bundle loading.
// Purpose: Build immutable TLS settings once at startup.
// Dependencies: rustls, rustls-pki-types, reqwest
// ============================================================================

//! ## Overview
//! The proxy listener terminates TLS with a fixed policy: TLS 1.2 or newer and
//! only ECDHE key exchange with AES-GCM ciphers. The resulting
//! [`rustls::ServerConfig`] is built once and shared read-only by every
//! connection. CA bundles for upstream clients are parsed here as well so a
//! bad certificate file fails startup rather than the first request.
//! Security posture: certificate and key files are untrusted input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rustls::CipherSuite;
use rustls::ServerConfig;
use rustls_pki_types::CertificateDer;
use rustls_pki_types::PrivateKeyDer;
use rustls_pki_types::pem::PemObject;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Cipher suites accepted by the listener.
const ALLOWED_CIPHER_SUITES: [CipherSuite; 6] = [
    CipherSuite::TLS13_AES_128_GCM_SHA256,
    CipherSuite::TLS13_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
];

/// Maximum size of a certificate, key, or CA bundle file.
const MAX_PEM_FILE_BYTES: u64 = 1024 * 1024;

// ============================================================================
// SECTION: Listener TLS
// ============================================================================

/// Loads the listener certificate chain and key from PEM files.
///
/// # Errors
///
/// Returns [`TlsError`] when a file is unreadable or the material is invalid.
pub fn load_server_tls(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>, TlsError> {
    let cert_pem = read_pem_file(cert_path)?;
    let key_pem = read_pem_file(key_path)?;
    server_tls_from_pem(&cert_pem, &key_pem)
}

/// Builds the listener TLS configuration from in-memory PEM data.
///
/// # Errors
///
/// Returns [`TlsError`] when the chain or key cannot be parsed or do not match.
pub fn server_tls_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Arc<ServerConfig>, TlsError> {
    let chain = CertificateDer::pem_slice_iter(cert_pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| TlsError::InvalidCertificate(err.to_string()))?;
    if chain.is_empty() {
        return Err(TlsError::InvalidCertificate("no certificates found".to_string()));
    }
    let key = PrivateKeyDer::from_pem_slice(key_pem)
        .map_err(|err| TlsError::InvalidKey(err.to_string()))?;

    let mut provider = rustls::crypto::aws_lc_rs::default_provider();
    provider.cipher_suites.retain(|suite| ALLOWED_CIPHER_SUITES.contains(&suite.suite()));
    let mut config = ServerConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&[&rustls::version::TLS13, &rustls::version::TLS12])
        .map_err(|err| TlsError::Config(err.to_string()))?
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .map_err(|err| TlsError::Config(err.to_string()))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

// ============================================================================
// SECTION: Certificate Authorities
// ============================================================================

/// Loads a PEM CA bundle for upstream client verification.
///
/// # Errors
///
/// Returns [`TlsError`] when the file is unreadable or holds no certificates.
pub fn load_ca_bundle(path: &Path) -> Result<Vec<reqwest::Certificate>, TlsError> {
    let pem = read_pem_file(path)?;
    let certs = reqwest::Certificate::from_pem_bundle(&pem)
        .map_err(|err| TlsError::InvalidCertificate(format!("{}: {err}", path.display())))?;
    if certs.is_empty() {
        return Err(TlsError::InvalidCertificate(format!(
            "{}: no certificates found",
            path.display()
        )));
    }
    Ok(certs)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// TLS material errors.
#[derive(Debug, Error)]
pub enum TlsError {
    /// File could not be read.
    #[error("tls io error: {0}")]
    Io(String),
    /// Certificate data is malformed or missing.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),
    /// Private key data is malformed or missing.
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    /// TLS configuration was rejected.
    #[error("tls config error: {0}")]
    Config(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a PEM file, enforcing the size limit.
fn read_pem_file(path: &Path) -> Result<Vec<u8>, TlsError> {
    let metadata =
        fs::metadata(path).map_err(|err| TlsError::Io(format!("{}: {err}", path.display())))?;
    if metadata.len() > MAX_PEM_FILE_BYTES {
        return Err(TlsError::Io(format!("{}: file exceeds size limit", path.display())));
    }
    fs::read(path).map_err(|err| TlsError::Io(format!("{}: {err}", path.display())))
}
