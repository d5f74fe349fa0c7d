//! Config load validation tests for source-gate-config.
// crates/source-gate-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards (path, size, encoding).
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

mod common;

use std::io::Write;
use std::path::Path;

use source_gate_config::ConfigError;
use source_gate_config::SourceGateConfig;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_load_invalid(result: Result<SourceGateConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    assert_load_invalid(
        SourceGateConfig::load(Some(Path::new(&long_path))),
        "config path exceeds max length",
    )
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    assert_load_invalid(
        SourceGateConfig::load(Some(Path::new(&long_component))),
        "config path component too long",
    )
}

#[test]
fn load_rejects_missing_file() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    assert_load_invalid(SourceGateConfig::load(Some(&path)), "config io error")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_load_invalid(SourceGateConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_load_invalid(SourceGateConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn load_rejects_malformed_toml() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(b"[identity\nurl = ").map_err(|err| err.to_string())?;
    assert_load_invalid(SourceGateConfig::load(Some(file.path())), "config parse error")
}

#[test]
fn load_rejects_unknown_fields() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let content = format!("{}\n[server]\nlisten = \"x\"\n", common::MINIMAL_TOML);
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    assert_load_invalid(SourceGateConfig::load(Some(file.path())), "config parse error")
}

#[test]
fn load_accepts_minimal_file_with_defaults() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(common::MINIMAL_TOML.as_bytes()).map_err(|err| err.to_string())?;
    let config = SourceGateConfig::load(Some(file.path())).map_err(|err| err.to_string())?;
    if config.server.bind != "0.0.0.0:8083" {
        return Err(format!("unexpected default bind {}", config.server.bind));
    }
    if config.identity.introspection_path != "/check_token" {
        return Err("unexpected introspection path default".to_string());
    }
    if config.identity.admin_scopes != ["doppler.firehose", "logs.admin"] {
        return Err("unexpected admin scope defaults".to_string());
    }
    if config.ownership.resource_paths
        != ["/v3/apps/{source_id}", "/v2/service_instances/{source_id}"]
    {
        return Err("unexpected resource path defaults".to_string());
    }
    if config.upstream.connect_timeout_ms != 10_000 || config.upstream.request_timeout_ms != 20_000
    {
        return Err("unexpected upstream timeout defaults".to_string());
    }
    if config.audit.internal_ip != "0.0.0.0" || !config.audit.enabled {
        return Err("unexpected audit defaults".to_string());
    }
    if config.ownership.cache_ttl().is_some() {
        return Err("cache should be disabled by default".to_string());
    }
    Ok(())
}
