// crates/source-gate-query/src/parser.rs
// ============================================================================
// Module: Query Parser
// Description: Recursive-descent parser for the PromQL-style query subset.
// Purpose: Build an `Expr` tree from untrusted query text.
// Dependencies: crate::ast, crate::error, crate::lexer
// ============================================================================

//! ## Overview
//! Precedence climbing over binary operators, with postfix handling for
//! ranges, subqueries, `offset`, and `@`. Query text arrives from the network,
//! so input size and nesting depth are bounded.
//!
//! ### Grammar (informal)
//! - **Selectors**: `metric`, `metric{label="v"}`, `{label=~"re"}`
//! - **Postfix**: `[5m]`, `[1h:1m]`, `offset 5m`, `@ 1700000000`, `@ end()`
//! - **Binary**: `or` < `and`/`unless` < comparisons < `+ -` < `* / % atan2` < `^`
//! - **Calls and aggregations**: `rate(x[5m])`, `sum by (job) (x)`, `topk(3, x)`
//!
//! ### Example
//!
//! ```
//! use source_gate_query::parse_query;
//!
//! let expr = parse_query(r#"sum by (job) (rate(http_requests{source_id="a"}[5m]))"#)?;
//! assert_eq!(expr.selectors().len(), 1);
//! # Ok::<(), source_gate_query::ParseError>(())
//! ```

use crate::ast::AggregateOp;
use crate::ast::AtModifier;
use crate::ast::BinaryModifiers;
use crate::ast::BinaryOp;
use crate::ast::Expr;
use crate::ast::GroupModifier;
use crate::ast::Grouping;
use crate::ast::LabelMatcher;
use crate::ast::MatchOp;
use crate::ast::UnaryOp;
use crate::ast::VectorMatching;
use crate::ast::VectorSelector;
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::lexer::SpannedToken;
use crate::lexer::Token;
use crate::lexer::duration_seconds;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted query size in bytes.
pub const MAX_QUERY_BYTES: usize = 64 * 1024;
/// Maximum expression tree depth: parentheses, calls, operands, operator
/// chains, and stacked subqueries each count one level.
pub const MAX_QUERY_NESTING: usize = 64;

/// Precedence used for the operand of a unary operator.
const UNARY_OPERAND_PRECEDENCE: u8 = 6;

/// Words that cannot start an expression.
const RESERVED_WORDS: &[&str] = &[
    "and",
    "or",
    "unless",
    "atan2",
    "by",
    "without",
    "on",
    "ignoring",
    "group_left",
    "group_right",
    "bool",
    "offset",
];

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Parses query text into an expression tree.
///
/// # Errors
/// Returns [`ParseError`] for empty or oversized input, lexical errors,
/// unexpected tokens, excessive nesting, or invalid selectors.
pub fn parse_query(input: &str) -> Result<Expr, ParseError> {
    if input.len() > MAX_QUERY_BYTES {
        return Err(ParseError::InputTooLarge {
            max_bytes: MAX_QUERY_BYTES,
            actual_bytes: input.len(),
        });
    }
    let tokens = Lexer::new(input).lex()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_binary(1)?;
    parser.expect_eof()?;
    Ok(expr)
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Recursive-descent parser state.
struct Parser<'input> {
    /// Token stream ending with [`Token::Eof`].
    tokens: Vec<SpannedToken<'input>>,
    /// Index of the current token.
    index: usize,
    /// Current nesting depth.
    nesting: usize,
}

impl<'input> Parser<'input> {
    /// Creates a parser over a lexed token stream.
    const fn new(tokens: Vec<SpannedToken<'input>>) -> Self {
        Self {
            tokens,
            index: 0,
            nesting: 0,
        }
    }

    /// Parses binary operators binding at least as tight as `min_precedence`.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        self.scoped(|parser| parser.parse_binary_chain(min_precedence))
    }

    /// Folds a left-associative operator chain; every fold deepens the tree
    /// and counts against the nesting limit.
    fn parse_binary_chain(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek_binary_op() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            let position = self.current().position;
            self.descend(position)?;
            self.advance();
            let modifiers = self.parse_binary_modifiers(op)?;
            let next_min = if op.is_right_associative() { precedence } else { precedence + 1 };
            let rhs = self.with_nesting(position, |parser| parser.parse_binary(next_min))?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                modifiers,
            };
        }
        Ok(lhs)
    }

    /// Parses an optional unary sign followed by a postfix expression.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.current().token {
            Token::Sub => UnaryOp::Neg,
            Token::Add => UnaryOp::Pos,
            _ => return self.parse_postfix(),
        };
        let position = self.current().position;
        self.advance();
        let expr = self
            .with_nesting(position, |parser| parser.parse_binary(UNARY_OPERAND_PRECEDENCE))?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    /// Parses a primary expression and any trailing range/offset/`@`.
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        self.scoped(Self::parse_postfix_chain)
    }

    /// Applies postfix modifiers; each bracket counts against the nesting
    /// limit since stacked subqueries deepen the tree.
    fn parse_postfix_chain(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match &self.current().token {
                Token::LBracket => {
                    self.descend(self.current().position)?;
                    expr = self.parse_range(expr)?;
                }
                Token::At => expr = self.parse_at(expr)?,
                Token::Ident(word) if word.eq_ignore_ascii_case("offset") => {
                    expr = self.parse_offset(expr)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parses literals, selectors, calls, aggregations, and parentheses.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let SpannedToken {
            token,
            position,
        } = self.current().clone();
        match token {
            Token::Number(raw) => {
                self.advance();
                parse_number(raw, position).map(Expr::Number)
            }
            Token::Str(value) => {
                self.advance();
                Ok(Expr::String(value))
            }
            Token::LParen => {
                self.advance();
                let inner = self.with_nesting(position, |parser| parser.parse_binary(1))?;
                self.expect(Token::RParen, "`)` to close expression")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            Token::LBrace => self.parse_selector(None, position),
            Token::Ident(name) => self.parse_identifier(name, position),
            _ => Err(ParseError::UnexpectedToken {
                expected: "expression",
                found: self.describe_current(),
                position,
            }),
        }
    }

    /// Dispatches an identifier to a number, aggregation, call, or selector.
    fn parse_identifier(&mut self, name: &'input str, position: usize) -> Result<Expr, ParseError> {
        let lower = name.to_ascii_lowercase();
        if RESERVED_WORDS.contains(&lower.as_str()) {
            return Err(ParseError::UnexpectedToken {
                expected: "expression",
                found: name.to_string(),
                position,
            });
        }
        if lower == "inf" {
            self.advance();
            return Ok(Expr::Number(f64::INFINITY));
        }
        if lower == "nan" {
            self.advance();
            return Ok(Expr::Number(f64::NAN));
        }
        if let Some(op) = AggregateOp::from_name(&lower) {
            return self.with_nesting(position, |parser| parser.parse_aggregate(op, name, position));
        }
        self.advance();
        if matches!(self.current().token, Token::LParen) {
            return self.with_nesting(position, |parser| {
                let args = parser.parse_argument_list()?;
                Ok(Expr::Call {
                    name: name.to_string(),
                    args,
                })
            });
        }
        self.parse_selector(Some(name.to_string()), position)
    }

    /// Parses the optional braces of a selector and validates it.
    fn parse_selector(
        &mut self,
        metric: Option<String>,
        position: usize,
    ) -> Result<Expr, ParseError> {
        let matchers = if self.matches(Token::LBrace) {
            self.parse_matchers()?
        } else {
            Vec::new()
        };
        if metric.is_none() && matchers.iter().all(LabelMatcher::matches_empty) {
            return Err(ParseError::InvalidSelector {
                reason: "selector needs a metric name or a matcher that rejects empty values",
                position,
            });
        }
        Ok(Expr::Selector(VectorSelector {
            metric,
            matchers,
            range: None,
            offset: None,
            at: None,
            position,
        }))
    }

    /// Parses matchers after `{` through the closing `}`.
    fn parse_matchers(&mut self) -> Result<Vec<LabelMatcher>, ParseError> {
        let mut matchers = Vec::new();
        loop {
            if self.matches(Token::RBrace) {
                return Ok(matchers);
            }
            let name = self.expect_ident("label name")?;
            let op = match self.current().token {
                Token::Assign => MatchOp::Equal,
                Token::Neq => MatchOp::NotEqual,
                Token::RegexMatch => MatchOp::Regex,
                Token::RegexNoMatch => MatchOp::NotRegex,
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "label match operator",
                        found: self.describe_current(),
                        position: self.current().position,
                    });
                }
            };
            self.advance();
            let value = self.expect_string("label value string")?;
            matchers.push(LabelMatcher {
                name,
                op,
                value,
            });
            if self.matches(Token::Comma) {
                continue;
            }
            self.expect(Token::RBrace, "`,` or `}` after label matcher")?;
            return Ok(matchers);
        }
    }

    /// Parses an aggregation with grouping before or after the arguments.
    fn parse_aggregate(
        &mut self,
        op: AggregateOp,
        name: &str,
        position: usize,
    ) -> Result<Expr, ParseError> {
        self.advance();
        let mut grouping = self.parse_grouping()?;
        if !matches!(self.current().token, Token::LParen) {
            return Err(ParseError::UnexpectedToken {
                expected: "`(` after aggregation",
                found: self.describe_current(),
                position: self.current().position,
            });
        }
        let mut args = self.parse_argument_list()?;
        if grouping.is_none() {
            grouping = self.parse_grouping()?;
        }
        let expected = if op.takes_parameter() { 2 } else { 1 };
        if args.len() != expected {
            return Err(ParseError::WrongArgumentCount {
                name: name.to_string(),
                expected,
                actual: args.len(),
                position,
            });
        }
        let expr = args.pop().map(Box::new);
        let param = args.pop().map(Box::new);
        let Some(expr) = expr else {
            return Err(ParseError::WrongArgumentCount {
                name: name.to_string(),
                expected,
                actual: 0,
                position,
            });
        };
        Ok(Expr::Aggregate {
            op,
            grouping,
            param,
            expr,
        })
    }

    /// Parses `by (...)` or `without (...)` when present.
    fn parse_grouping(&mut self) -> Result<Option<Grouping>, ParseError> {
        if self.matches_keyword("by") {
            return Ok(Some(Grouping::By(self.parse_label_list()?)));
        }
        if self.matches_keyword("without") {
            return Ok(Some(Grouping::Without(self.parse_label_list()?)));
        }
        Ok(None)
    }

    /// Parses `( label, ... )`, allowing a trailing comma.
    fn parse_label_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(Token::LParen, "`(` before label list")?;
        let mut labels = Vec::new();
        loop {
            if self.matches(Token::RParen) {
                return Ok(labels);
            }
            labels.push(self.expect_ident("label name")?);
            if self.matches(Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "`,` or `)` in label list")?;
            return Ok(labels);
        }
    }

    /// Parses `( expr, ... )` for calls and aggregations.
    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LParen, "`(` before arguments")?;
        let mut args = Vec::new();
        if self.matches(Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_binary(1)?);
            if self.matches(Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "`,` or `)` after argument")?;
            return Ok(args);
        }
    }

    /// Parses `bool`, `on`/`ignoring`, and `group_left`/`group_right`.
    fn parse_binary_modifiers(&mut self, op: BinaryOp) -> Result<BinaryModifiers, ParseError> {
        let mut modifiers = BinaryModifiers::default();
        if op.is_comparison() && self.matches_keyword("bool") {
            modifiers.return_bool = true;
        }
        if self.matches_keyword("on") {
            modifiers.matching = Some(VectorMatching::On(self.parse_label_list()?));
        } else if self.matches_keyword("ignoring") {
            modifiers.matching = Some(VectorMatching::Ignoring(self.parse_label_list()?));
        }
        let position = self.current().position;
        let group_left = self.matches_keyword("group_left");
        if group_left || self.matches_keyword("group_right") {
            if modifiers.matching.is_none() || op.is_set_operator() {
                return Err(ParseError::UnexpectedToken {
                    expected: "`on` or `ignoring` before grouping modifier",
                    found: if group_left { "group_left" } else { "group_right" }.to_string(),
                    position,
                });
            }
            let labels = if matches!(self.current().token, Token::LParen) {
                self.parse_label_list()?
            } else {
                Vec::new()
            };
            modifiers.group =
                Some(if group_left { GroupModifier::Left(labels) } else { GroupModifier::Right(labels) });
        }
        Ok(modifiers)
    }

    /// Parses `[range]` on a selector or `[range:step]` as a subquery.
    fn parse_range(&mut self, expr: Expr) -> Result<Expr, ParseError> {
        let position = self.current().position;
        self.advance();
        let range = self.expect_duration()?;
        if self.matches(Token::Colon) {
            let step = if matches!(self.current().token, Token::RBracket) {
                None
            } else {
                Some(self.expect_duration()?)
            };
            self.expect(Token::RBracket, "`]` to close subquery")?;
            return Ok(Expr::Subquery {
                expr: Box::new(expr),
                range,
                step,
                offset: None,
                at: None,
            });
        }
        self.expect(Token::RBracket, "`]` to close range")?;
        match expr {
            Expr::Selector(mut selector)
                if selector.range.is_none() && selector.offset.is_none() && selector.at.is_none() =>
            {
                selector.range = Some(range);
                Ok(Expr::Selector(selector))
            }
            _ => Err(ParseError::InvalidSelector {
                reason: "range is only allowed directly after a vector selector",
                position,
            }),
        }
    }

    /// Parses `offset [-]duration`.
    fn parse_offset(&mut self, expr: Expr) -> Result<Expr, ParseError> {
        let position = self.current().position;
        self.advance();
        let negative = self.matches(Token::Sub);
        let amount = self.expect_duration()?;
        let value = if negative { -amount } else { amount };
        match expr {
            Expr::Selector(mut selector) if selector.offset.is_none() => {
                selector.offset = Some(value);
                Ok(Expr::Selector(selector))
            }
            Expr::Subquery {
                expr,
                range,
                step,
                offset: None,
                at,
            } => Ok(Expr::Subquery {
                expr,
                range,
                step,
                offset: Some(value),
                at,
            }),
            _ => Err(ParseError::InvalidSelector {
                reason: "offset is only allowed once after a selector or subquery",
                position,
            }),
        }
    }

    /// Parses `@ timestamp`, `@ start()`, or `@ end()`.
    fn parse_at(&mut self, expr: Expr) -> Result<Expr, ParseError> {
        let position = self.current().position;
        self.advance();
        let at = self.parse_at_value()?;
        match expr {
            Expr::Selector(mut selector) if selector.at.is_none() => {
                selector.at = Some(at);
                Ok(Expr::Selector(selector))
            }
            Expr::Subquery {
                expr,
                range,
                step,
                offset,
                at: None,
            } => Ok(Expr::Subquery {
                expr,
                range,
                step,
                offset,
                at: Some(at),
            }),
            _ => Err(ParseError::InvalidSelector {
                reason: "`@` is only allowed once after a selector or subquery",
                position,
            }),
        }
    }

    /// Parses the operand of `@`.
    fn parse_at_value(&mut self) -> Result<AtModifier, ParseError> {
        let SpannedToken {
            token,
            position,
        } = self.current().clone();
        match token {
            Token::Ident(word)
                if word.eq_ignore_ascii_case("start") || word.eq_ignore_ascii_case("end") =>
            {
                self.advance();
                self.expect(Token::LParen, "`(` after `@` function")?;
                self.expect(Token::RParen, "`)` after `@` function")?;
                if word.eq_ignore_ascii_case("start") {
                    Ok(AtModifier::Start)
                } else {
                    Ok(AtModifier::End)
                }
            }
            Token::Sub | Token::Add => {
                let negative = matches!(token, Token::Sub);
                self.advance();
                let value = self.expect_number()?;
                Ok(AtModifier::Timestamp(if negative { -value } else { value }))
            }
            Token::Number(_) => self.expect_number().map(AtModifier::Timestamp),
            _ => Err(ParseError::UnexpectedToken {
                expected: "timestamp, `start()`, or `end()` after `@`",
                found: self.describe_current(),
                position,
            }),
        }
    }

    /// Returns the binary operator at the cursor, if any.
    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let op = match &self.current().token {
            Token::Add => BinaryOp::Add,
            Token::Sub => BinaryOp::Sub,
            Token::Mul => BinaryOp::Mul,
            Token::Div => BinaryOp::Div,
            Token::Mod => BinaryOp::Mod,
            Token::Pow => BinaryOp::Pow,
            Token::EqlCmp => BinaryOp::Eql,
            Token::Neq => BinaryOp::Neq,
            Token::Gt => BinaryOp::Gt,
            Token::Gte => BinaryOp::Gte,
            Token::Lt => BinaryOp::Lt,
            Token::Lte => BinaryOp::Lte,
            Token::Ident(word) => match word.to_ascii_lowercase().as_str() {
                "and" => BinaryOp::And,
                "or" => BinaryOp::Or,
                "unless" => BinaryOp::Unless,
                "atan2" => BinaryOp::Atan2,
                _ => return None,
            },
            _ => return None,
        };
        Some(op)
    }

    /// Runs a parser step while enforcing the nesting limit.
    fn with_nesting<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.scoped(|parser| {
            parser.descend(position)?;
            f(parser)
        })
    }

    /// Runs a parser step and restores the nesting depth afterwards.
    fn scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let depth = self.nesting;
        let result = f(self);
        self.nesting = depth;
        result
    }

    /// Enters one nesting level, failing past [`MAX_QUERY_NESTING`].
    const fn descend(&mut self, position: usize) -> Result<(), ParseError> {
        let next_depth = self.nesting + 1;
        if next_depth > MAX_QUERY_NESTING {
            return Err(ParseError::NestingTooDeep {
                max_depth: MAX_QUERY_NESTING,
                actual_depth: next_depth,
                position,
            });
        }
        self.nesting = next_depth;
        Ok(())
    }

    /// Consumes an identifier or returns an error.
    fn expect_ident(&mut self, expected: &'static str) -> Result<String, ParseError> {
        if let Token::Ident(name) = self.current().token {
            self.advance();
            return Ok(name.to_string());
        }
        Err(ParseError::UnexpectedToken {
            expected,
            found: self.describe_current(),
            position: self.current().position,
        })
    }

    /// Consumes a string literal or returns an error.
    fn expect_string(&mut self, expected: &'static str) -> Result<String, ParseError> {
        if let Token::Str(value) = &self.current().token {
            let value = value.clone();
            self.advance();
            return Ok(value);
        }
        Err(ParseError::UnexpectedToken {
            expected,
            found: self.describe_current(),
            position: self.current().position,
        })
    }

    /// Consumes a duration (or bare seconds) literal.
    fn expect_duration(&mut self) -> Result<f64, ParseError> {
        let position = self.current().position;
        let seconds = match self.current().token {
            Token::Duration(raw) => duration_seconds(raw).ok_or_else(|| {
                ParseError::InvalidNumber {
                    raw: raw.to_string(),
                    position,
                }
            })?,
            Token::Number(raw) => parse_number(raw, position)?,
            _ => {
                return Err(ParseError::UnexpectedToken {
                    expected: "duration",
                    found: self.describe_current(),
                    position,
                });
            }
        };
        self.advance();
        Ok(seconds)
    }

    /// Consumes a numeric literal.
    fn expect_number(&mut self) -> Result<f64, ParseError> {
        let position = self.current().position;
        if let Token::Number(raw) = self.current().token {
            let value = parse_number(raw, position)?;
            self.advance();
            return Ok(value);
        }
        Err(ParseError::UnexpectedToken {
            expected: "number",
            found: self.describe_current(),
            position,
        })
    }

    /// Consumes the expected token or returns an error.
    fn expect(&mut self, token: Token<'_>, expected: &'static str) -> Result<(), ParseError> {
        if self.matches(token) {
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected,
                found: self.describe_current(),
                position: self.current().position,
            })
        }
    }

    /// Ensures the parser is at end-of-input.
    fn expect_eof(&self) -> Result<(), ParseError> {
        if matches!(self.current().token, Token::Eof) {
            Ok(())
        } else {
            Err(ParseError::TrailingInput {
                position: self.current().position,
            })
        }
    }

    /// Consumes the token if it matches the expected kind.
    fn matches(&mut self, kind: Token<'_>) -> bool {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes an identifier equal (case-insensitively) to `keyword`.
    fn matches_keyword(&mut self, keyword: &str) -> bool {
        if let Token::Ident(word) = self.current().token
            && word.eq_ignore_ascii_case(keyword)
        {
            self.advance();
            return true;
        }
        false
    }

    /// Returns the current token.
    fn current(&self) -> &SpannedToken<'input> {
        debug_assert!(self.index < self.tokens.len(), "parser index out of bounds");
        &self.tokens[self.index]
    }

    /// Advances to the next token.
    const fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    /// Formats the current token for diagnostics.
    fn describe_current(&self) -> String {
        self.current().token.describe()
    }
}

/// Parses a numeric literal, including hexadecimal.
fn parse_number(raw: &str, position: usize) -> Result<f64, ParseError> {
    let hex = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"));
    let parsed = match hex {
        Some(digits) if !digits.is_empty() => digits
            .chars()
            .try_fold(0.0_f64, |acc, c| c.to_digit(16).map(|d| acc.mul_add(16.0, f64::from(d)))),
        Some(_) => None,
        None => raw.parse::<f64>().ok(),
    };
    parsed.ok_or_else(|| ParseError::InvalidNumber {
        raw: raw.to_string(),
        position,
    })
}
