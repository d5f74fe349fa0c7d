// crates/source-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for source-gate-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use source_gate_config::SourceGateConfig;

/// Minimal config that passes validation.
pub const MINIMAL_TOML: &str = r#"
[identity]
url = "https://uaa.example.com"
client_id = "proxy"
client_secret = "secret"

[ownership]
url = "https://api.example.com"
"#;

/// Parses a TOML string into a `SourceGateConfig` without validation.
pub fn config_from_toml(toml_str: &str) -> Result<SourceGateConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns the minimal valid config.
pub fn minimal_config() -> Result<SourceGateConfig, toml::de::Error> {
    config_from_toml(MINIMAL_TOML)
}

/// Asserts that validation fails with a message containing `needle`.
pub fn assert_invalid(config: &SourceGateConfig, needle: &str) -> Result<(), String> {
    match config.validate() {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err(format!("expected validation failure containing {needle}")),
    }
}
