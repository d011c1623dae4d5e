//! Byte-level JSON tokenizer.

use alloc::borrow::Cow;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use lexical_parse_float::FromLexical as _;
use lexical_parse_integer::FromLexical as _;

use crate::span::{Span, Spanned};

/// A JSON token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// A string literal, borrowed when it contains no escapes
    String(Cow<'input, str>),
    /// A negative integer
    I64(i64),
    /// A non-negative integer
    U64(u64),
    /// Any other number
    F64(f64),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// End of input
    Eof,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Colon => write!(f, "':'"),
            Token::Comma => write!(f, "','"),
            Token::String(s) => write!(f, "string {s:?}"),
            Token::I64(n) => write!(f, "number {n}"),
            Token::U64(n) => write!(f, "number {n}"),
            Token::F64(n) => write!(f, "number {n}"),
            Token::True => write!(f, "'true'"),
            Token::False => write!(f, "'false'"),
            Token::Null => write!(f, "'null'"),
            Token::Eof => write!(f, "end of input"),
        }
    }
}

/// A tokenizer failure and where it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenError {
    /// What went wrong
    pub kind: TokenErrorKind,
    /// Where it went wrong
    pub span: Span,
}

/// Kinds of tokenizer failures.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenErrorKind {
    /// A character that cannot start or continue a token
    UnexpectedCharacter(char),
    /// Input ended in the middle of a token
    UnexpectedEof(&'static str),
    /// String contents are not valid UTF-8
    InvalidUtf8(String),
    /// A number that does not parse or does not fit an `f64`
    InvalidNumber(&'static str),
    /// A malformed escape sequence inside a string
    InvalidEscape(&'static str),
}

impl fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenErrorKind::UnexpectedCharacter(c) => write!(f, "unexpected character {c:?}"),
            TokenErrorKind::UnexpectedEof(ctx) => write!(f, "unexpected end of input {ctx}"),
            TokenErrorKind::InvalidUtf8(msg) => write!(f, "invalid UTF-8: {msg}"),
            TokenErrorKind::InvalidNumber(msg) => write!(f, "invalid number: {msg}"),
            TokenErrorKind::InvalidEscape(msg) => write!(f, "invalid escape: {msg}"),
        }
    }
}

type Result<T> = core::result::Result<T, TokenError>;

/// Splits JSON input into spanned tokens.
pub struct Tokenizer<'input> {
    input: &'input [u8],
    pos: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer positioned at the start of `input`.
    pub fn new(input: &'input [u8]) -> Self {
        Tokenizer { input, pos: 0 }
    }

    /// Produce the next token. Once the input is exhausted this keeps
    /// returning [`Token::Eof`].
    pub fn next_token(&mut self) -> Result<Spanned<Token<'input>>> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(&byte) = self.input.get(start) else {
            return Ok(Spanned {
                node: Token::Eof,
                span: Span::new(start, 0),
            });
        };

        let node = match byte {
            b'{' => self.single(Token::LBrace),
            b'}' => self.single(Token::RBrace),
            b'[' => self.single(Token::LBracket),
            b']' => self.single(Token::RBracket),
            b':' => self.single(Token::Colon),
            b',' => self.single(Token::Comma),
            b'"' => self.read_string()?,
            b'-' | b'0'..=b'9' => self.read_number()?,
            b't' => self.read_literal(b"true", Token::True)?,
            b'f' => self.read_literal(b"false", Token::False)?,
            b'n' => self.read_literal(b"null", Token::Null)?,
            _ => return Err(self.unexpected_character(start)),
        };

        Ok(Spanned {
            node,
            span: Span::between(start, self.pos),
        })
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.input.get(self.pos) {
            self.pos += 1;
        }
    }

    fn single(&mut self, token: Token<'input>) -> Token<'input> {
        self.pos += 1;
        token
    }

    fn eof(&self, start: usize, context: &'static str) -> TokenError {
        TokenError {
            kind: TokenErrorKind::UnexpectedEof(context),
            span: Span::between(start, self.input.len()),
        }
    }

    /// Error for the (possibly multi-byte) character at `at`.
    fn unexpected_character(&self, at: usize) -> TokenError {
        let tail = &self.input[at..self.input.len().min(at + 4)];
        let c = (1..=tail.len())
            .find_map(|n| core::str::from_utf8(&tail[..n]).ok())
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        TokenError {
            kind: TokenErrorKind::UnexpectedCharacter(c),
            span: Span::new(at, c.len_utf8().min(tail.len()).max(1)),
        }
    }

    fn read_literal(&mut self, expected: &'static [u8], token: Token<'input>) -> Result<Token<'input>> {
        let start = self.pos;
        for (offset, &want) in expected.iter().enumerate() {
            match self.input.get(start + offset) {
                Some(&got) if got == want => {}
                Some(_) => return Err(self.unexpected_character(start + offset)),
                None => return Err(self.eof(start, "in literal")),
            }
        }
        self.pos += expected.len();
        Ok(token)
    }

    fn read_string(&mut self) -> Result<Token<'input>> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;

        loop {
            match self.input.get(self.pos) {
                None => return Err(self.eof(start, "in string")),
                Some(b'"') => {
                    let raw = &self.input[content_start..self.pos];
                    self.pos += 1;
                    let text = core::str::from_utf8(raw).map_err(|e| TokenError {
                        kind: TokenErrorKind::InvalidUtf8(e.to_string()),
                        span: Span::new(content_start + e.valid_up_to(), 1),
                    })?;
                    return Ok(Token::String(Cow::Borrowed(text)));
                }
                Some(b'\\') => return self.read_escaped_string(start, content_start),
                Some(&b) if b < 0x20 => return Err(self.unexpected_character(self.pos)),
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Slow path once the first backslash is seen: decode into an owned buffer.
    fn read_escaped_string(&mut self, start: usize, content_start: usize) -> Result<Token<'input>> {
        let mut out: Vec<u8> = self.input[content_start..self.pos].to_vec();

        loop {
            match self.input.get(self.pos) {
                None => return Err(self.eof(start, "in string")),
                Some(b'"') => {
                    self.pos += 1;
                    let text = String::from_utf8(out).map_err(|e| TokenError {
                        kind: TokenErrorKind::InvalidUtf8(e.utf8_error().to_string()),
                        span: Span::between(start, self.pos),
                    })?;
                    return Ok(Token::String(Cow::Owned(text)));
                }
                Some(b'\\') => {
                    let escape_start = self.pos;
                    self.pos += 1;
                    let decoded = match self.input.get(self.pos) {
                        None => return Err(self.eof(start, "in string")),
                        Some(b'"') => b'"',
                        Some(b'\\') => b'\\',
                        Some(b'/') => b'/',
                        Some(b'b') => 0x08,
                        Some(b'f') => 0x0c,
                        Some(b'n') => b'\n',
                        Some(b'r') => b'\r',
                        Some(b't') => b'\t',
                        Some(b'u') => {
                            self.pos += 1;
                            let c = self.read_unicode_escape(escape_start)?;
                            let mut buf = [0u8; 4];
                            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                            continue;
                        }
                        Some(_) => {
                            return Err(TokenError {
                                kind: TokenErrorKind::InvalidEscape("unknown escape character"),
                                span: Span::new(escape_start, 2),
                            });
                        }
                    };
                    out.push(decoded);
                    self.pos += 1;
                }
                Some(&b) if b < 0x20 => return Err(self.unexpected_character(self.pos)),
                Some(&b) => {
                    out.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    /// Decode the digits after `\u`, combining surrogate pairs.
    fn read_unicode_escape(&mut self, escape_start: usize) -> Result<char> {
        let high = self.read_hex4(escape_start)?;
        let code = match high {
            0xD800..=0xDBFF => {
                if self.input.get(self.pos..self.pos + 2) != Some(b"\\u".as_slice()) {
                    return Err(self.bad_escape(escape_start, "unpaired high surrogate"));
                }
                self.pos += 2;
                let low = self.read_hex4(escape_start)?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(self.bad_escape(escape_start, "invalid low surrogate"));
                }
                0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(low) - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(self.bad_escape(escape_start, "unpaired low surrogate")),
            other => u32::from(other),
        };
        char::from_u32(code).ok_or_else(|| self.bad_escape(escape_start, "invalid code point"))
    }

    fn read_hex4(&mut self, escape_start: usize) -> Result<u16> {
        let Some(digits) = self.input.get(self.pos..self.pos + 4) else {
            return Err(self.eof(escape_start, "in unicode escape"));
        };
        let mut value: u16 = 0;
        for &d in digits {
            let nibble = match d {
                b'0'..=b'9' => d - b'0',
                b'a'..=b'f' => d - b'a' + 10,
                b'A'..=b'F' => d - b'A' + 10,
                _ => return Err(self.bad_escape(escape_start, "expected four hex digits")),
            };
            value = (value << 4) | u16::from(nibble);
        }
        self.pos += 4;
        Ok(value)
    }

    fn bad_escape(&self, escape_start: usize, msg: &'static str) -> TokenError {
        TokenError {
            kind: TokenErrorKind::InvalidEscape(msg),
            span: Span::between(escape_start, self.pos.max(escape_start + 1)),
        }
    }

    fn read_number(&mut self) -> Result<Token<'input>> {
        let start = self.pos;
        if self.input.get(self.pos) == Some(&b'-') {
            self.pos += 1;
        }

        match self.input.get(self.pos) {
            Some(b'0') => {
                self.pos += 1;
                if let Some(b'0'..=b'9') = self.input.get(self.pos) {
                    return Err(self.unexpected_character(self.pos));
                }
            }
            Some(b'1'..=b'9') => self.skip_digits(),
            Some(_) => return Err(self.unexpected_character(self.pos)),
            None => return Err(self.eof(start, "in number")),
        }

        let mut integral = true;
        if self.input.get(self.pos) == Some(&b'.') {
            integral = false;
            self.pos += 1;
            self.expect_digit(start)?;
            self.skip_digits();
        }
        if let Some(b'e' | b'E') = self.input.get(self.pos) {
            integral = false;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.input.get(self.pos) {
                self.pos += 1;
            }
            self.expect_digit(start)?;
            self.skip_digits();
        }

        let text = &self.input[start..self.pos];
        if integral {
            // Integers that overflow 64 bits fall through to f64.
            if text[0] == b'-' {
                if let Ok(n) = i64::from_lexical(text) {
                    return Ok(Token::I64(n));
                }
            } else if let Ok(n) = u64::from_lexical(text) {
                return Ok(Token::U64(n));
            }
        }

        let span = Span::between(start, self.pos);
        match f64::from_lexical(text) {
            Ok(n) if n.is_finite() => Ok(Token::F64(n)),
            Ok(_) => Err(TokenError {
                kind: TokenErrorKind::InvalidNumber("out of range for f64"),
                span,
            }),
            Err(_) => Err(TokenError {
                kind: TokenErrorKind::InvalidNumber("malformed number"),
                span,
            }),
        }
    }

    fn skip_digits(&mut self) {
        while let Some(b'0'..=b'9') = self.input.get(self.pos) {
            self.pos += 1;
        }
    }

    fn expect_digit(&self, start: usize) -> Result<()> {
        match self.input.get(self.pos) {
            Some(b'0'..=b'9') => Ok(()),
            Some(_) => Err(self.unexpected_character(self.pos)),
            None => Err(self.eof(start, "in number")),
        }
    }
}
