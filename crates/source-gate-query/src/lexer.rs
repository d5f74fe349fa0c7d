// crates/source-gate-query/src/lexer.rs
// ============================================================================
// Module: Query Lexer
// Description: Tokenizer for the PromQL-style query language.
// Purpose: Turn raw query text into spanned tokens for the parser.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! The lexer is byte-oriented for ASCII syntax and character-oriented inside
//! string literals so label values may carry arbitrary UTF-8. Keywords such as
//! `by`, `on`, or `and` are emitted as identifiers; the parser interprets them
//! by position because the same words are valid label names.

use crate::error::ParseError;

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Lexer token produced from query input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token<'a> {
    /// Identifier, metric name, or contextual keyword.
    Ident(&'a str),
    /// Numeric literal (decimal, float, exponent, or hex).
    Number(&'a str),
    /// Duration literal such as `5m` or `1h30m`.
    Duration(&'a str),
    /// Unescaped string literal.
    Str(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `@`
    At,
    /// `=`
    Assign,
    /// `==`
    EqlCmp,
    /// `!=`
    Neq,
    /// `=~`
    RegexMatch,
    /// `!~`
    RegexNoMatch,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
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
    /// End-of-input marker.
    Eof,
}

impl Token<'_> {
    /// Formats the token for diagnostics.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Ident(raw) | Self::Number(raw) | Self::Duration(raw) => (*raw).to_string(),
            Self::Str(value) => format!("{value:?}"),
            Self::LParen => "(".to_string(),
            Self::RParen => ")".to_string(),
            Self::LBrace => "{".to_string(),
            Self::RBrace => "}".to_string(),
            Self::LBracket => "[".to_string(),
            Self::RBracket => "]".to_string(),
            Self::Comma => ",".to_string(),
            Self::Colon => ":".to_string(),
            Self::At => "@".to_string(),
            Self::Assign => "=".to_string(),
            Self::EqlCmp => "==".to_string(),
            Self::Neq => "!=".to_string(),
            Self::RegexMatch => "=~".to_string(),
            Self::RegexNoMatch => "!~".to_string(),
            Self::Gt => ">".to_string(),
            Self::Gte => ">=".to_string(),
            Self::Lt => "<".to_string(),
            Self::Lte => "<=".to_string(),
            Self::Add => "+".to_string(),
            Self::Sub => "-".to_string(),
            Self::Mul => "*".to_string(),
            Self::Div => "/".to_string(),
            Self::Mod => "%".to_string(),
            Self::Pow => "^".to_string(),
            Self::Eof => "end of input".to_string(),
        }
    }
}

/// Token paired with its byte offset.
#[derive(Debug, Clone)]
pub(crate) struct SpannedToken<'a> {
    /// Token value.
    pub(crate) token: Token<'a>,
    /// Byte offset into the input.
    pub(crate) position: usize,
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Lexer for query text.
pub(crate) struct Lexer<'a> {
    /// Source input being tokenized.
    input: &'a str,
    /// Current byte offset into the input.
    offset: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    pub(crate) const fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
        }
    }

    /// Lexes the input into a sequence of tokens terminated by [`Token::Eof`].
    pub(crate) fn lex(&mut self) -> Result<Vec<SpannedToken<'a>>, ParseError> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while self.offset < bytes.len() {
            let ch = bytes[self.offset];
            match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.offset += 1;
                }
                b'#' => {
                    self.consume_while(bytes, |b| b != b'\n');
                }
                b'(' => tokens.push(self.single(Token::LParen)),
                b')' => tokens.push(self.single(Token::RParen)),
                b'{' => tokens.push(self.single(Token::LBrace)),
                b'}' => tokens.push(self.single(Token::RBrace)),
                b'[' => tokens.push(self.single(Token::LBracket)),
                b']' => tokens.push(self.single(Token::RBracket)),
                b',' => tokens.push(self.single(Token::Comma)),
                b':' => tokens.push(self.single(Token::Colon)),
                b'@' => tokens.push(self.single(Token::At)),
                b'+' => tokens.push(self.single(Token::Add)),
                b'-' => tokens.push(self.single(Token::Sub)),
                b'*' => tokens.push(self.single(Token::Mul)),
                b'/' => tokens.push(self.single(Token::Div)),
                b'%' => tokens.push(self.single(Token::Mod)),
                b'^' => tokens.push(self.single(Token::Pow)),
                b'=' => match self.peek_byte(bytes) {
                    Some(b'=') => tokens.push(self.double(Token::EqlCmp)),
                    Some(b'~') => tokens.push(self.double(Token::RegexMatch)),
                    _ => tokens.push(self.single(Token::Assign)),
                },
                b'!' => match self.peek_byte(bytes) {
                    Some(b'=') => tokens.push(self.double(Token::Neq)),
                    Some(b'~') => tokens.push(self.double(Token::RegexNoMatch)),
                    _ => {
                        return Err(ParseError::UnexpectedToken {
                            expected: "`!=` or `!~`",
                            found: "!".to_string(),
                            position: self.offset,
                        });
                    }
                },
                b'>' => {
                    if self.peek_byte(bytes) == Some(b'=') {
                        tokens.push(self.double(Token::Gte));
                    } else {
                        tokens.push(self.single(Token::Gt));
                    }
                }
                b'<' => {
                    if self.peek_byte(bytes) == Some(b'=') {
                        tokens.push(self.double(Token::Lte));
                    } else {
                        tokens.push(self.single(Token::Lt));
                    }
                }
                b'"' | b'\'' => tokens.push(self.lex_quoted(char::from(ch))?),
                b'`' => tokens.push(self.lex_raw()?),
                b'0' ..= b'9' => tokens.push(self.lex_number(bytes)?),
                b'.' if self.peek_byte(bytes).is_some_and(|b| b.is_ascii_digit()) => {
                    tokens.push(self.lex_number(bytes)?);
                }
                b'a' ..= b'z' | b'A' ..= b'Z' | b'_' => {
                    let start = self.offset;
                    self.consume_while(bytes, |b| b.is_ascii_alphanumeric() || b == b'_' || b == b':');
                    tokens.push(SpannedToken {
                        token: Token::Ident(&self.input[start .. self.offset]),
                        position: start,
                    });
                }
                _ => {
                    let found = self.input[self.offset ..].chars().next().unwrap_or_default();
                    return Err(ParseError::UnexpectedToken {
                        expected: "identifier, literal, or operator",
                        found: found.to_string(),
                        position: self.offset,
                    });
                }
            }
        }

        if tokens.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    /// Emits a one-byte token and advances.
    fn single(&mut self, token: Token<'a>) -> SpannedToken<'a> {
        let position = self.offset;
        self.offset += 1;
        SpannedToken {
            token,
            position,
        }
    }

    /// Emits a two-byte token and advances.
    fn double(&mut self, token: Token<'a>) -> SpannedToken<'a> {
        let position = self.offset;
        self.offset += 2;
        SpannedToken {
            token,
            position,
        }
    }

    /// Returns the byte after the current one without advancing.
    fn peek_byte(&self, bytes: &[u8]) -> Option<u8> {
        bytes.get(self.offset + 1).copied()
    }

    /// Advances while the condition matches the current byte.
    fn consume_while<F>(&mut self, bytes: &[u8], condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = bytes.get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    /// Lexes a single- or double-quoted string with escapes.
    fn lex_quoted(&mut self, quote: char) -> Result<SpannedToken<'a>, ParseError> {
        let start = self.offset;
        let body = &self.input[start + 1 ..];
        let mut value = String::new();
        let mut chars = body.char_indices();
        while let Some((idx, ch)) = chars.next() {
            if ch == quote {
                self.offset = start + 1 + idx + ch.len_utf8();
                return Ok(SpannedToken {
                    token: Token::Str(value),
                    position: start,
                });
            }
            match ch {
                '\n' => break,
                '\\' => {
                    let Some((esc_idx, esc)) = chars.next() else {
                        break;
                    };
                    let decoded = match esc {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\\' => '\\',
                        '"' => '"',
                        '\'' => '\'',
                        _ => {
                            return Err(ParseError::InvalidEscape {
                                escape: esc,
                                position: start + 1 + esc_idx,
                            });
                        }
                    };
                    value.push(decoded);
                }
                other => value.push(other),
            }
        }
        Err(ParseError::UnterminatedString {
            position: start,
        })
    }

    /// Lexes a backtick raw string (no escapes).
    fn lex_raw(&mut self) -> Result<SpannedToken<'a>, ParseError> {
        let start = self.offset;
        let body = &self.input[start + 1 ..];
        match body.find('`') {
            Some(end) => {
                self.offset = start + 1 + end + 1;
                Ok(SpannedToken {
                    token: Token::Str(body[.. end].to_string()),
                    position: start,
                })
            }
            None => Err(ParseError::UnterminatedString {
                position: start,
            }),
        }
    }

    /// Lexes a numeric or duration literal.
    fn lex_number(&mut self, bytes: &[u8]) -> Result<SpannedToken<'a>, ParseError> {
        let start = self.offset;

        if bytes[start] == b'0' && matches!(self.peek_byte(bytes), Some(b'x' | b'X')) {
            self.offset += 2;
            self.consume_while(bytes, |b| b.is_ascii_hexdigit());
            return self.finish_literal(bytes, start, Token::Number(&self.input[start .. self.offset]));
        }

        self.consume_while(bytes, |b| b.is_ascii_digit());
        if self.offset > start && duration_unit_len(bytes, self.offset).is_some() {
            loop {
                let Some(unit_len) = duration_unit_len(bytes, self.offset) else {
                    return Err(ParseError::InvalidNumber {
                        raw: self.input[start .. self.offset].to_string(),
                        position: start,
                    });
                };
                self.offset += unit_len;
                if !bytes.get(self.offset).is_some_and(u8::is_ascii_digit) {
                    break;
                }
                self.consume_while(bytes, |b| b.is_ascii_digit());
            }
            return self
                .finish_literal(bytes, start, Token::Duration(&self.input[start .. self.offset]));
        }

        if bytes.get(self.offset) == Some(&b'.') {
            self.offset += 1;
            self.consume_while(bytes, |b| b.is_ascii_digit());
        }
        if matches!(bytes.get(self.offset), Some(b'e' | b'E')) {
            let mut probe = self.offset + 1;
            if matches!(bytes.get(probe), Some(b'+' | b'-')) {
                probe += 1;
            }
            if bytes.get(probe).is_some_and(u8::is_ascii_digit) {
                self.offset = probe;
                self.consume_while(bytes, |b| b.is_ascii_digit());
            }
        }
        self.finish_literal(bytes, start, Token::Number(&self.input[start .. self.offset]))
    }

    /// Rejects literals glued to identifier characters (e.g. `5mx`).
    fn finish_literal(
        &self,
        bytes: &[u8],
        start: usize,
        token: Token<'a>,
    ) -> Result<SpannedToken<'a>, ParseError> {
        if bytes.get(self.offset).is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_') {
            let end = self.input[self.offset ..]
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .map_or(self.input.len(), |len| self.offset + len);
            return Err(ParseError::InvalidNumber {
                raw: self.input[start .. end].to_string(),
                position: start,
            });
        }
        Ok(SpannedToken {
            token,
            position: start,
        })
    }
}

/// Returns the byte length of a duration unit starting at `offset`.
fn duration_unit_len(bytes: &[u8], offset: usize) -> Option<usize> {
    match bytes.get(offset)? {
        b'm' if bytes.get(offset + 1) == Some(&b's') => Some(2),
        b's' | b'm' | b'h' | b'd' | b'w' | b'y' => Some(1),
        _ => None,
    }
}

/// Converts a lexed duration literal into seconds.
pub(crate) fn duration_seconds(raw: &str) -> Option<f64> {
    let bytes = raw.as_bytes();
    let mut offset = 0;
    let mut total = 0.0;
    while offset < bytes.len() {
        let digits_start = offset;
        while bytes.get(offset).is_some_and(u8::is_ascii_digit) {
            offset += 1;
        }
        let amount: f64 = raw.get(digits_start .. offset)?.parse().ok()?;
        let unit_len = duration_unit_len(bytes, offset)?;
        let scale = match raw.get(offset .. offset + unit_len)? {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            "d" => 86_400.0,
            "w" => 604_800.0,
            "y" => 31_536_000.0,
            _ => return None,
        };
        total += amount * scale;
        offset += unit_len;
    }
    Some(total)
}
