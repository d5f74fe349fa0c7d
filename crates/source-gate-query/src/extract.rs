// crates/source-gate-query/src/extract.rs
// ============================================================================
// Module: Source Extraction
// Description: Collects `source_id` values referenced by a query.
// Purpose: Tell the authorization layer which sources a query reads.
// Dependencies: crate::ast, crate::error, crate::parser
// ============================================================================

//! ## Overview
//! Every selector in a query must pin itself to at least one source with a
//! non-empty `source_id` equality matcher. A single unpinned selector rejects
//! the whole query; partial extraction is never returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use crate::ast::Expr;
use crate::error::ExtractError;
use crate::parser::parse_query;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Label that identifies the owning source of a series.
pub const SOURCE_ID_LABEL: &str = "source_id";

// ============================================================================
// SECTION: Source Identifier
// ============================================================================

/// Non-empty identifier of a metric source (application or component).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(String);

impl SourceId {
    /// Creates a source identifier, returning `None` for empty input.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for SourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts the set of source identifiers referenced by `query`.
///
/// A query without any selector (for example `1 + 1`) yields an empty set.
///
/// # Errors
/// Returns [`ExtractError::Parse`] for syntax errors and
/// [`ExtractError::MissingSourceId`] when any selector lacks a non-empty
/// `source_id` equality matcher.
pub fn extract_source_ids(query: &str) -> Result<BTreeSet<SourceId>, ExtractError> {
    let expr = parse_query(query)?;
    source_ids_in(&expr)
}

/// Collects source identifiers from an already parsed expression.
///
/// # Errors
/// Returns [`ExtractError::MissingSourceId`] when any selector is unpinned.
pub fn source_ids_in(expr: &Expr) -> Result<BTreeSet<SourceId>, ExtractError> {
    let mut ids = BTreeSet::new();
    for selector in expr.selectors() {
        let mut pinned = false;
        for value in selector.equality_values(SOURCE_ID_LABEL) {
            let id = SourceId::new(value).ok_or(ExtractError::MissingSourceId)?;
            ids.insert(id);
            pinned = true;
        }
        if !pinned {
            return Err(ExtractError::MissingSourceId);
        }
    }
    Ok(ids)
}

/// Pluggable source extraction used by the authorization layer.
pub trait SourceExtractor: Send + Sync {
    /// Returns every source identifier the query references.
    ///
    /// # Errors
    /// Returns [`ExtractError`] when the query is invalid or unpinned.
    fn extract(&self, query: &str) -> Result<BTreeSet<SourceId>, ExtractError>;
}

/// Default extractor backed by [`parse_query`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParser;

impl SourceExtractor for QueryParser {
    fn extract(&self, query: &str) -> Result<BTreeSet<SourceId>, ExtractError> {
        extract_source_ids(query)
    }
}
