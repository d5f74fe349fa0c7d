// crates/source-gate-query/src/error.rs
// ============================================================================
// Module: Query Errors
// Description: Parse and extraction failures for query text.
// Purpose: Give callers structured errors with byte positions.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ParseError`] carries byte positions into the query text.
//! [`ExtractError`] wraps it and adds the unpinned-term failure raised when a
//! selector does not name a `source_id`.

use thiserror::Error;

/// Errors raised while lexing or parsing a query.
///
/// # Invariants
/// - Positions are byte offsets into the original input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input was empty or contained only whitespace and comments.
    #[error("query is empty")]
    EmptyInput,
    /// Input exceeded the size limit.
    #[error("query exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual input length in bytes.
        actual_bytes: usize,
    },
    /// Input exceeded the nesting limit.
    #[error("query nesting exceeds limit: depth {actual_depth} (max {max_depth}) at {position}")]
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max_depth: usize,
        /// Depth reached when the error occurred.
        actual_depth: usize,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Unexpected token encountered.
    #[error("unexpected token `{found}` at {position}, expected {expected}")]
    UnexpectedToken {
        /// Human-friendly expectation summary.
        expected: &'static str,
        /// The token that was actually seen.
        found: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// String literal was not closed before end of line or input.
    #[error("unterminated string literal at {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },
    /// Unknown escape sequence inside a string literal.
    #[error("invalid escape `\\{escape}` at {position}")]
    InvalidEscape {
        /// Escaped character.
        escape: char,
        /// Byte offset of the escaped character.
        position: usize,
    },
    /// Numeric or duration literal failed to parse.
    #[error("invalid number `{raw}` at {position}")]
    InvalidNumber {
        /// The raw literal text.
        raw: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Selector is structurally valid but semantically rejected.
    #[error("invalid selector at {position}: {reason}")]
    InvalidSelector {
        /// Rejection reason.
        reason: &'static str,
        /// Byte offset of the selector.
        position: usize,
    },
    /// Aggregation received the wrong number of arguments.
    #[error("aggregation `{name}` at {position} expects {expected} argument(s), got {actual}")]
    WrongArgumentCount {
        /// Aggregation operator name.
        name: String,
        /// Expected argument count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
        /// Byte offset of the operator.
        position: usize,
    },
    /// Trailing input after a complete expression.
    #[error("unexpected trailing input at {position}")]
    TrailingInput {
        /// Byte offset where unexpected input begins.
        position: usize,
    },
}

/// Errors raised while extracting source identifiers from a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Query text is not a valid expression.
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// At least one selector has no usable `source_id` equality matcher.
    #[error("one or more terms lack a sourceId")]
    MissingSourceId,
}
