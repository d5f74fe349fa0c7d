// crates/source-gate-query/src/lib.rs
// ============================================================================
// Module: Source Gate Query
// Description: PromQL-style query parsing and source identifier extraction.
// Purpose: Determine which metric sources a query reads before it is proxied.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! `source-gate-query` parses the query subset accepted by the metrics backend
//! and extracts the `source_id` values each selector is pinned to. It performs
//! no I/O and holds no state, so it can be called from any request task.
//!
//! ```
//! use source_gate_query::extract_source_ids;
//!
//! let ids = extract_source_ids(r#"cpu{source_id="a"} + mem{source_id="b"}"#)?;
//! let names: Vec<_> = ids.iter().map(|id| id.as_str()).collect();
//! assert_eq!(names, ["a", "b"]);
//! # Ok::<(), source_gate_query::ExtractError>(())
//! ```

pub mod ast;
pub mod error;
pub mod extract;
mod lexer;
pub mod parser;

pub use ast::Expr;
pub use ast::LabelMatcher;
pub use ast::MatchOp;
pub use ast::VectorSelector;
pub use error::ExtractError;
pub use error::ParseError;
pub use extract::QueryParser;
pub use extract::SOURCE_ID_LABEL;
pub use extract::SourceExtractor;
pub use extract::SourceId;
pub use extract::extract_source_ids;
pub use extract::source_ids_in;
pub use parser::MAX_QUERY_BYTES;
pub use parser::MAX_QUERY_NESTING;
pub use parser::parse_query;
