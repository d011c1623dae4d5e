//! The generic JSON value tree and the parser that produces it.

use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::error::{BindError, BindErrorKind, Result};
use crate::span::{Position, Span, Spanned};
use crate::tokenizer::{Token, TokenError, Tokenizer};

/// Members of a JSON object, in document order.
pub type Members<'input> = Vec<(Cow<'input, str>, Value<'input>)>;

/// A parsed JSON value. Strings borrow from the input when they contain no
/// escape sequences.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'input> {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// Any JSON number
    Number(Number),
    /// A string
    String(Cow<'input, str>),
    /// An ordered sequence
    Array(Vec<Value<'input>>),
    /// An ordered mapping; duplicate keys are kept
    Object(Members<'input>),
}

impl<'input> Value<'input> {
    /// Name of this value's JSON kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Look up the last member named `key` of an object.
    pub fn get(&self, key: &str) -> Option<&Value<'input>> {
        match self {
            Value::Object(members) => members
                .iter()
                .rev()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Detach the value from the input it borrows from.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(b),
            Value::Number(n) => Value::Number(n),
            Value::String(s) => Value::String(Cow::Owned(s.into_owned())),
            Value::Array(items) => Value::Array(items.into_iter().map(Value::into_owned).collect()),
            Value::Object(members) => Value::Object(
                members
                    .into_iter()
                    .map(|(k, v)| (Cow::Owned(k.into_owned()), v.into_owned()))
                    .collect(),
            ),
        }
    }
}

/// A JSON number, kept in the narrowest representation that holds it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Non-negative integer
    U64(u64),
    /// Negative integer
    I64(i64),
    /// Fractional, exponent-form, or out-of-range integer
    F64(f64),
}

impl Number {
    /// The value as an integer, or `None` when it has a fractional part.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Number::U64(n) => Some(i128::from(n)),
            Number::I64(n) => Some(i128::from(n)),
            Number::F64(n) if n.is_finite() && n.fract() == 0.0 => Some(n as i128),
            Number::F64(_) => None,
        }
    }

    /// The value as a float.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::U64(n) => n as f64,
            Number::I64(n) => n as f64,
            Number::F64(n) => n,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::U64(n) => write!(f, "{n}"),
            Number::I64(n) => write!(f, "{n}"),
            Number::F64(n) if n.is_finite() => f.write_str(ryu::Buffer::new().format_finite(*n)),
            Number::F64(n) => write!(f, "{n}"),
        }
    }
}

/// Parse `input` into a [`Value`] tree, refusing nesting deeper than
/// `max_depth` arrays/objects.
pub fn parse(input: &[u8], max_depth: usize) -> Result<Value<'_>> {
    let mut parser = Parser {
        input,
        tokenizer: Tokenizer::new(input),
        peeked: None,
        depth: 0,
        max_depth,
    };
    let value = parser.parse_value()?;

    let trailing = parser.next()?;
    if !matches!(trailing.node, Token::Eof) {
        return Err(parser.malformed(
            format!("unexpected {} after the document, expected end of input", trailing.node),
            trailing.span,
        ));
    }
    Ok(value)
}

fn malformed(input: &[u8], message: String, span: Span) -> BindError {
    BindError::new(
        BindErrorKind::MalformedInput {
            message,
            position: Position::locate(input, span.start),
        },
        span,
    )
}

struct Parser<'input> {
    input: &'input [u8],
    tokenizer: Tokenizer<'input>,
    /// Peeked token (for lookahead)
    peeked: Option<Spanned<Token<'input>>>,
    depth: usize,
    max_depth: usize,
}

impl<'input> Parser<'input> {
    /// Peek at the next token without consuming it.
    fn peek(&mut self) -> Result<&Spanned<Token<'input>>> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.read()?,
        };
        Ok(self.peeked.insert(token))
    }

    /// Consume and return the next token.
    fn next(&mut self) -> Result<Spanned<Token<'input>>> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.read(),
        }
    }

    fn read(&mut self) -> Result<Spanned<Token<'input>>> {
        let input = self.input;
        self.tokenizer
            .next_token()
            .map_err(|TokenError { kind, span }| malformed(input, kind.to_string(), span))
    }

    fn malformed(&self, message: String, span: Span) -> BindError {
        malformed(self.input, message, span)
    }

    fn unexpected(&self, token: &Spanned<Token<'input>>, expected: &str) -> BindError {
        self.malformed(
            format!("unexpected {}, expected {expected}", token.node),
            token.span,
        )
    }

    fn enter(&mut self, span: Span) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(BindError::new(
                BindErrorKind::DepthLimitExceeded {
                    limit: self.max_depth,
                },
                span,
            ));
        }
        Ok(())
    }

    fn parse_value(&mut self) -> Result<Value<'input>> {
        let token = self.next()?;
        match token.node {
            Token::LBrace => {
                self.enter(token.span)?;
                let object = self.parse_object()?;
                self.depth -= 1;
                Ok(object)
            }
            Token::LBracket => {
                self.enter(token.span)?;
                let array = self.parse_array()?;
                self.depth -= 1;
                Ok(array)
            }
            Token::String(s) => Ok(Value::String(s)),
            Token::U64(n) => Ok(Value::Number(Number::U64(n))),
            Token::I64(n) => Ok(Value::Number(Number::I64(n))),
            Token::F64(n) => Ok(Value::Number(Number::F64(n))),
            Token::True => Ok(Value::Bool(true)),
            Token::False => Ok(Value::Bool(false)),
            Token::Null => Ok(Value::Null),
            _ => Err(self.unexpected(&token, "a value")),
        }
    }

    /// Parse object members after the opening brace.
    fn parse_object(&mut self) -> Result<Value<'input>> {
        let mut members = Members::new();
        let mut token = self.next()?;
        if matches!(token.node, Token::RBrace) {
            return Ok(Value::Object(members));
        }

        loop {
            let key = match token.node {
                Token::String(key) => key,
                _ => return Err(self.unexpected(&token, "a string key")),
            };

            let colon = self.next()?;
            if !matches!(colon.node, Token::Colon) {
                return Err(self.unexpected(&colon, "':'"));
            }

            let value = self.parse_value()?;
            members.push((key, value));

            let separator = self.next()?;
            match separator.node {
                Token::Comma => token = self.next()?,
                Token::RBrace => return Ok(Value::Object(members)),
                _ => return Err(self.unexpected(&separator, "',' or '}'")),
            }
        }
    }

    /// Parse array elements after the opening bracket.
    fn parse_array(&mut self) -> Result<Value<'input>> {
        let mut items = Vec::new();
        if matches!(self.peek()?.node, Token::RBracket) {
            self.next()?;
            return Ok(Value::Array(items));
        }

        loop {
            items.push(self.parse_value()?);
            let separator = self.next()?;
            match separator.node {
                Token::Comma => {}
                Token::RBracket => return Ok(Value::Array(items)),
                _ => return Err(self.unexpected(&separator, "',' or ']'")),
            }
        }
    }
}
