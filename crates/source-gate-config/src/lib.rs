// crates/source-gate-config/src/lib.rs
// ============================================================================
// Module: Source Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for source-gate.toml semantics.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! `source-gate-config` defines the configuration model for the Source Gate
//! proxy. It provides strict, fail-closed validation; config inputs are
//! untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
