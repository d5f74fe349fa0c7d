// crates/source-gate-config/src/config.rs
// ============================================================================
// Module: Source Gate Configuration
// Description: Configuration loading and validation for the Source Gate proxy.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: the proxy never starts with
//! a partially understood config.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "source-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SOURCE_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a service URL.
pub(crate) const MAX_URL_LENGTH: usize = 2048;
/// Maximum DNS host name length.
pub(crate) const MAX_SERVER_NAME_LENGTH: usize = 253;
/// Maximum number of admin scopes.
pub(crate) const MAX_ADMIN_SCOPES: usize = 64;
/// Maximum number of ownership resource path templates.
pub(crate) const MAX_RESOURCE_PATHS: usize = 16;
/// Placeholder substituted with the source id in resource paths.
pub const SOURCE_ID_PLACEHOLDER: &str = "{source_id}";
/// Minimum upstream connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum upstream connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 60_000;
/// Minimum upstream request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 100;
/// Maximum upstream request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 120_000;
/// Maximum authorization cache TTL in milliseconds.
pub(crate) const MAX_CACHE_TTL_MS: u64 = 3_600_000;
/// Maximum authorization cache entry count.
pub(crate) const MAX_CACHE_ENTRIES: usize = 1_000_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Source Gate proxy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceGateConfig {
    /// Listener and backend configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Identity service (token introspection) configuration.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Resource ownership service configuration.
    #[serde(default)]
    pub ownership: OwnershipConfig,
    /// Outbound HTTP client policy shared by upstream services.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Access audit log configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl SourceGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order is the explicit path, then [`CONFIG_ENV_VAR`], then
    /// `source-gate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.identity.validate()?;
        self.ownership.validate()?;
        self.upstream.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// Listener and backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Proxy listen address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Backend query service base URL.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Plaintext metrics listen address; `None` disables the endpoint.
    #[serde(default = "default_metrics_bind")]
    pub metrics_bind: Option<String>,
    /// TLS material; plaintext when absent.
    #[serde(default)]
    pub tls: Option<ServerTlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            backend_url: default_backend_url(),
            metrics_bind: default_metrics_bind(),
            tls: None,
        }
    }
}

impl ServerConfig {
    /// Validates listener configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.metrics_addr()?;
        validate_service_url("server.backend_url", &self.backend_url)?;
        if let Some(tls) = &self.tls {
            tls.validate()?;
        }
        Ok(())
    }

    /// Returns the parsed proxy listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_socket_addr("server.bind", &self.bind)
    }

    /// Returns the parsed metrics listen address, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.metrics_bind
            .as_deref()
            .map(|bind| parse_socket_addr("server.metrics_bind", bind))
            .transpose()
    }
}

/// TLS configuration for the proxy listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerTlsConfig {
    /// Server certificate chain (PEM).
    pub cert_path: String,
    /// Server private key (PEM).
    pub key_path: String,
}

impl ServerTlsConfig {
    /// Validates TLS configuration paths.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("server.tls.cert_path", &self.cert_path)?;
        validate_path_string("server.tls.key_path", &self.key_path)?;
        Ok(())
    }
}

/// Identity service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Identity service base URL.
    #[serde(default)]
    pub url: String,
    /// Client id used to authenticate introspection calls.
    #[serde(default)]
    pub client_id: String,
    /// Client secret used to authenticate introspection calls.
    #[serde(default)]
    pub client_secret: String,
    /// Optional CA bundle (PEM) for the identity service.
    #[serde(default)]
    pub ca_path: Option<String>,
    /// Introspection endpoint path.
    #[serde(default = "default_introspection_path")]
    pub introspection_path: String,
    /// Scopes that bypass per-source authorization.
    #[serde(default = "default_admin_scopes")]
    pub admin_scopes: Vec<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            ca_path: None,
            introspection_path: default_introspection_path(),
            admin_scopes: default_admin_scopes(),
        }
    }
}

impl IdentityConfig {
    /// Validates identity service configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_service_url("identity.url", &self.url)?;
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("identity.client_id is required".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::Invalid("identity.client_secret is required".to_string()));
        }
        if let Some(path) = &self.ca_path {
            validate_path_string("identity.ca_path", path)?;
        }
        if !self.introspection_path.starts_with('/') {
            return Err(ConfigError::Invalid(
                "identity.introspection_path must start with /".to_string(),
            ));
        }
        if self.admin_scopes.len() > MAX_ADMIN_SCOPES {
            return Err(ConfigError::Invalid("identity.admin_scopes has too many entries".to_string()));
        }
        if self.admin_scopes.iter().any(|scope| scope.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "identity.admin_scopes entries must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resource ownership service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OwnershipConfig {
    /// Ownership service base URL.
    #[serde(default)]
    pub url: String,
    /// Optional CA bundle (PEM) for the ownership service.
    #[serde(default)]
    pub ca_path: Option<String>,
    /// Name the ownership service certificate is verified against when it
    /// differs from the host in `url`; `url` still names the address dialed.
    #[serde(default)]
    pub server_name: Option<String>,
    /// Resource path templates tried in order; each contains `{source_id}`.
    #[serde(default = "default_resource_paths")]
    pub resource_paths: Vec<String>,
    /// Positive decision cache TTL in milliseconds; `0` disables caching.
    #[serde(default)]
    pub cache_ttl_ms: u64,
    /// Maximum cached decisions.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

impl Default for OwnershipConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            ca_path: None,
            server_name: None,
            resource_paths: default_resource_paths(),
            cache_ttl_ms: 0,
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

impl OwnershipConfig {
    /// Validates ownership service configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_service_url("ownership.url", &self.url)?;
        if let Some(path) = &self.ca_path {
            validate_path_string("ownership.ca_path", path)?;
        }
        if let Some(name) = &self.server_name {
            validate_server_name("ownership.server_name", name)?;
        }
        if self.resource_paths.is_empty() {
            return Err(ConfigError::Invalid(
                "ownership.resource_paths must list at least one path".to_string(),
            ));
        }
        if self.resource_paths.len() > MAX_RESOURCE_PATHS {
            return Err(ConfigError::Invalid(
                "ownership.resource_paths has too many entries".to_string(),
            ));
        }
        for template in &self.resource_paths {
            if !template.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "ownership.resource_paths entry {template} must start with /"
                )));
            }
            if template.matches(SOURCE_ID_PLACEHOLDER).count() != 1 {
                return Err(ConfigError::Invalid(format!(
                    "ownership.resource_paths entry {template} must contain {SOURCE_ID_PLACEHOLDER} \
                     exactly once"
                )));
            }
        }
        if self.cache_ttl_ms > MAX_CACHE_TTL_MS {
            return Err(ConfigError::Invalid(format!(
                "ownership.cache_ttl_ms must be at most {MAX_CACHE_TTL_MS}"
            )));
        }
        if self.cache_ttl_ms > 0
            && (self.cache_max_entries == 0 || self.cache_max_entries > MAX_CACHE_ENTRIES)
        {
            return Err(ConfigError::Invalid(format!(
                "ownership.cache_max_entries must be between 1 and {MAX_CACHE_ENTRIES}"
            )));
        }
        Ok(())
    }

    /// Returns the cache TTL, or `None` when caching is disabled.
    #[must_use]
    pub const fn cache_ttl(&self) -> Option<Duration> {
        if self.cache_ttl_ms == 0 { None } else { Some(Duration::from_millis(self.cache_ttl_ms)) }
    }
}

/// Outbound HTTP client policy for identity and ownership calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Connect and TLS handshake timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Total request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Disable upstream certificate verification (non-production only).
    #[serde(default)]
    pub skip_cert_verify: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            skip_cert_verify: false,
        }
    }
}

impl UpstreamConfig {
    /// Validates upstream timeouts.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_timeout_range(
            "upstream.connect_timeout_ms",
            self.connect_timeout_ms,
            MIN_CONNECT_TIMEOUT_MS,
            MAX_CONNECT_TIMEOUT_MS,
        )?;
        validate_timeout_range(
            "upstream.request_timeout_ms",
            self.request_timeout_ms,
            MIN_REQUEST_TIMEOUT_MS,
            MAX_REQUEST_TIMEOUT_MS,
        )?;
        if self.connect_timeout_ms > self.request_timeout_ms {
            return Err(ConfigError::Invalid(
                "upstream.connect_timeout_ms must not exceed upstream.request_timeout_ms"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the total request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Access audit log configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Enable access audit records.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when absent.
    #[serde(default)]
    pub path: Option<String>,
    /// Address reported in audit records in place of the real listener host.
    #[serde(default = "default_internal_ip")]
    pub internal_ip: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
            internal_ip: default_internal_ip(),
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        self.internal_ip
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::Invalid("audit.internal_ip must be an IP address".to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a DNS host name: dot-separated labels of ASCII letters, digits,
/// and inner hyphens.
fn validate_server_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.len() > MAX_SERVER_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} must be 1 to {MAX_SERVER_NAME_LENGTH} characters"
        )));
    }
    let valid_label = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    };
    if !value.split('.').all(valid_label) {
        return Err(ConfigError::Invalid(format!("{field} must be a DNS host name")));
    }
    Ok(())
}

/// Validates that a service URL is present and uses http or https.
fn validate_service_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} is required")));
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| ConfigError::Invalid(format!("{field} must include http:// or https://")))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    if rest.contains(['?', '#']) {
        return Err(ConfigError::Invalid(format!("{field} must not include a query or fragment")));
    }
    Ok(())
}

/// Parses a socket address field.
fn parse_socket_addr(field: &str, value: &str) -> Result<SocketAddr, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{field} must be a socket address (ip:port)")))
}

/// Validates a timeout value against bounds.
fn validate_timeout_range(
    field: &str,
    value_ms: u64,
    min_ms: u64,
    max_ms: u64,
) -> Result<(), ConfigError> {
    if value_ms < min_ms || value_ms > max_ms {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between {min_ms} and {max_ms} milliseconds",
        )));
    }
    Ok(())
}

/// Default proxy listen address.
fn default_bind() -> String {
    "0.0.0.0:8083".to_string()
}

/// Default backend URL.
fn default_backend_url() -> String {
    "http://localhost:8081".to_string()
}

/// Default metrics listen address.
#[allow(clippy::unnecessary_wraps, reason = "Serde default must match the field type.")]
fn default_metrics_bind() -> Option<String> {
    Some("127.0.0.1:6065".to_string())
}

/// Default token introspection path.
fn default_introspection_path() -> String {
    "/check_token".to_string()
}

/// Default admin scopes.
fn default_admin_scopes() -> Vec<String> {
    vec!["doppler.firehose".to_string(), "logs.admin".to_string()]
}

/// Default ownership resource path templates.
fn default_resource_paths() -> Vec<String> {
    vec!["/v3/apps/{source_id}".to_string(), "/v2/service_instances/{source_id}".to_string()]
}

/// Default authorization cache capacity.
const fn default_cache_max_entries() -> usize {
    10_000
}

/// Default upstream connect timeout in milliseconds.
const fn default_connect_timeout_ms() -> u64 {
    10_000
}

/// Default upstream request timeout in milliseconds.
const fn default_request_timeout_ms() -> u64 {
    20_000
}

/// Default audit toggle.
const fn default_audit_enabled() -> bool {
    true
}

/// Default masked address for audit records.
fn default_internal_ip() -> String {
    "0.0.0.0".to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap/expect for clarity."
    )]

    use super::*;

    #[test]
    fn validate_timeout_range_accepts_bounds() {
        assert!(validate_timeout_range("t", 100, 100, 200).is_ok());
        assert!(validate_timeout_range("t", 200, 100, 200).is_ok());
    }

    #[test]
    fn validate_timeout_range_error_includes_field_name() {
        let err = validate_timeout_range("upstream.x", 0, 100, 200).unwrap_err();
        assert_eq!(err.to_string(), "invalid config: upstream.x must be between 100 and 200 milliseconds");
    }

    #[test]
    fn validate_service_url_requires_scheme_and_host() {
        assert!(validate_service_url("f", "https://uaa.example.com").is_ok());
        assert!(validate_service_url("f", "http://127.0.0.1:8080").is_ok());
        assert!(validate_service_url("f", "uaa.example.com").is_err());
        assert!(validate_service_url("f", "https://").is_err());
        assert!(validate_service_url("f", "https:///path").is_err());
        assert!(validate_service_url("f", "https://h?x=1").is_err());
    }

    #[test]
    fn validate_path_string_rejects_long_component() {
        let long = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        assert!(validate_path_string("p", &long).is_err());
        assert!(validate_path_string("p", "  ").is_err());
        assert!(validate_path_string("p", "/etc/certs/ca.pem").is_ok());
    }

    #[test]
    fn cache_ttl_is_none_when_zero() {
        let mut ownership = OwnershipConfig::default();
        assert_eq!(ownership.cache_ttl(), None);
        ownership.cache_ttl_ms = 1_500;
        assert_eq!(ownership.cache_ttl(), Some(Duration::from_millis(1_500)));
    }

    #[test]
    fn resource_path_requires_single_placeholder() {
        let mut ownership = OwnershipConfig {
            url: "https://capi".to_string(),
            ..OwnershipConfig::default()
        };
        assert!(ownership.validate().is_ok());
        ownership.resource_paths = vec!["/v3/apps".to_string()];
        assert!(ownership.validate().is_err());
        ownership.resource_paths = vec!["/v3/{source_id}/{source_id}".to_string()];
        assert!(ownership.validate().is_err());
        ownership.resource_paths = vec!["v3/apps/{source_id}".to_string()];
        assert!(ownership.validate().is_err());
    }
}
