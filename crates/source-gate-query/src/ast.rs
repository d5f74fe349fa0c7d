// crates/source-gate-query/src/ast.rs
// ============================================================================
// Module: Query AST
// Description: Expression tree produced by the query parser.
// Purpose: Represent parsed queries so callers can inspect selectors.
// Dependencies: None
// ============================================================================

//! ## Overview
//! The tree is deliberately evaluation-free: it records enough structure to
//! walk every selector ("term") in a query, nothing more. Durations are kept
//! in seconds as `f64`.

// ============================================================================
// SECTION: Matchers and Selectors
// ============================================================================

/// Label matcher operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `=~`
    Regex,
    /// `!~`
    NotRegex,
}

/// Single label matcher inside a selector's braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    /// Label name.
    pub name: String,
    /// Match operator.
    pub op: MatchOp,
    /// Literal value or regular expression source.
    pub value: String,
}

impl LabelMatcher {
    /// Returns true when this matcher accepts a series lacking the label.
    ///
    /// Regex matchers are treated conservatively: only the empty pattern and
    /// obvious match-anything patterns count as matching empty.
    #[must_use]
    pub fn matches_empty(&self) -> bool {
        match self.op {
            MatchOp::Equal => self.value.is_empty(),
            MatchOp::NotEqual => !self.value.is_empty(),
            MatchOp::Regex => matches!(self.value.as_str(), "" | ".*" | "^.*$" | "(.*)"),
            MatchOp::NotRegex => !matches!(self.value.as_str(), "" | ".*" | "^.*$" | "(.*)"),
        }
    }
}

/// Time anchor for the `@` modifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AtModifier {
    /// Unix timestamp in seconds.
    Timestamp(f64),
    /// `start()`
    Start,
    /// `end()`
    End,
}

/// Instant or range vector selector.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSelector {
    /// Metric name, when given before the braces.
    pub metric: Option<String>,
    /// Label matchers from the braces.
    pub matchers: Vec<LabelMatcher>,
    /// Range in seconds for matrix selectors (`metric[5m]`).
    pub range: Option<f64>,
    /// Offset in seconds; negative values look forward.
    pub offset: Option<f64>,
    /// `@` modifier.
    pub at: Option<AtModifier>,
    /// Byte offset of the selector start.
    pub position: usize,
}

impl VectorSelector {
    /// Returns every value of an equality matcher on `label`.
    pub fn equality_values<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.matchers
            .iter()
            .filter(move |m| m.op == MatchOp::Equal && m.name == label)
            .map(|m| m.value.as_str())
    }
}

// ============================================================================
// SECTION: Operators
// ============================================================================

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `+`
    Pos,
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `^`
    Pow,
    /// `atan2`
    Atan2,
    /// `==`
    Eql,
    /// `!=`
    Neq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `and`
    And,
    /// `or`
    Or,
    /// `unless`
    Unless,
}

impl BinaryOp {
    /// Binding power; higher binds tighter.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And | Self::Unless => 2,
            Self::Eql | Self::Neq | Self::Gt | Self::Gte | Self::Lt | Self::Lte => 3,
            Self::Add | Self::Sub => 4,
            Self::Mul | Self::Div | Self::Mod | Self::Atan2 => 5,
            Self::Pow => 6,
        }
    }

    /// Returns true for `^`.
    #[must_use]
    pub const fn is_right_associative(self) -> bool {
        matches!(self, Self::Pow)
    }

    /// Returns true for comparison operators, which accept `bool`.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Eql | Self::Neq | Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }

    /// Returns true for `and`, `or`, and `unless`.
    #[must_use]
    pub const fn is_set_operator(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Unless)
    }
}

/// Label list used by `on(...)` and `ignoring(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorMatching {
    /// `on(labels)`
    On(Vec<String>),
    /// `ignoring(labels)`
    Ignoring(Vec<String>),
}

/// Many-to-one grouping modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupModifier {
    /// `group_left(labels)`
    Left(Vec<String>),
    /// `group_right(labels)`
    Right(Vec<String>),
}

/// Modifiers attached to a binary operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryModifiers {
    /// `bool` on comparisons.
    pub return_bool: bool,
    /// `on` / `ignoring`.
    pub matching: Option<VectorMatching>,
    /// `group_left` / `group_right`.
    pub group: Option<GroupModifier>,
}

/// Aggregation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    /// `sum`
    Sum,
    /// `avg`
    Avg,
    /// `count`
    Count,
    /// `min`
    Min,
    /// `max`
    Max,
    /// `group`
    Group,
    /// `stddev`
    Stddev,
    /// `stdvar`
    Stdvar,
    /// `topk`
    Topk,
    /// `bottomk`
    Bottomk,
    /// `quantile`
    Quantile,
    /// `count_values`
    CountValues,
    /// `limitk`
    Limitk,
    /// `limit_ratio`
    LimitRatio,
}

impl AggregateOp {
    /// Resolves an identifier to an aggregation operator.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "sum" => Self::Sum,
            "avg" => Self::Avg,
            "count" => Self::Count,
            "min" => Self::Min,
            "max" => Self::Max,
            "group" => Self::Group,
            "stddev" => Self::Stddev,
            "stdvar" => Self::Stdvar,
            "topk" => Self::Topk,
            "bottomk" => Self::Bottomk,
            "quantile" => Self::Quantile,
            "count_values" => Self::CountValues,
            "limitk" => Self::Limitk,
            "limit_ratio" => Self::LimitRatio,
            _ => return None,
        };
        Some(op)
    }

    /// Returns true when the operator takes a leading parameter.
    #[must_use]
    pub const fn takes_parameter(self) -> bool {
        matches!(
            self,
            Self::Topk
                | Self::Bottomk
                | Self::Quantile
                | Self::CountValues
                | Self::Limitk
                | Self::LimitRatio
        )
    }
}

/// `by(...)` / `without(...)` clause of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// `by(labels)`
    By(Vec<String>),
    /// `without(labels)`
    Without(Vec<String>),
}

// ============================================================================
// SECTION: Expressions
// ============================================================================

/// Parsed query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// String literal.
    String(String),
    /// Vector or matrix selector.
    Selector(VectorSelector),
    /// Unary expression.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        expr: Box<Self>,
    },
    /// Binary expression.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Self>,
        /// Right operand.
        rhs: Box<Self>,
        /// Matching modifiers.
        modifiers: BinaryModifiers,
    },
    /// Function call.
    Call {
        /// Function name.
        name: String,
        /// Arguments in order.
        args: Vec<Self>,
    },
    /// Aggregation.
    Aggregate {
        /// Operator.
        op: AggregateOp,
        /// Optional grouping clause.
        grouping: Option<Grouping>,
        /// Leading parameter for parameterized operators.
        param: Option<Box<Self>>,
        /// Aggregated expression.
        expr: Box<Self>,
    },
    /// Parenthesized expression.
    Paren(Box<Self>),
    /// Subquery `expr[range:step]`.
    Subquery {
        /// Inner expression.
        expr: Box<Self>,
        /// Range in seconds.
        range: f64,
        /// Resolution step in seconds, when given.
        step: Option<f64>,
        /// Offset in seconds.
        offset: Option<f64>,
        /// `@` modifier.
        at: Option<AtModifier>,
    },
}

impl Expr {
    /// Collects every selector in the tree, left to right.
    #[must_use]
    pub fn selectors(&self) -> Vec<&VectorSelector> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Self::Number(_) | Self::String(_) => {}
                Self::Selector(selector) => out.push(selector),
                Self::Unary {
                    expr, ..
                }
                | Self::Paren(expr)
                | Self::Subquery {
                    expr, ..
                } => stack.push(expr),
                Self::Binary {
                    lhs,
                    rhs,
                    ..
                } => {
                    stack.push(rhs);
                    stack.push(lhs);
                }
                Self::Call {
                    args, ..
                } => stack.extend(args.iter().rev()),
                Self::Aggregate {
                    param,
                    expr,
                    ..
                } => {
                    stack.push(expr);
                    if let Some(param) = param {
                        stack.push(param);
                    }
                }
            }
        }
        out
    }
}
