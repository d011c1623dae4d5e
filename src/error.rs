//! Error types for rule construction, parsing and binding.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use core::fmt::{self, Display};

use crate::span::{Position, Span};

/// Error returned by rule construction, deserialization and serialization.
#[derive(Debug)]
pub struct BindError {
    /// The specific kind of error
    pub kind: BindErrorKind,
    /// Source span where the error occurred
    pub span: Option<Span>,
    /// The source input (for diagnostics)
    pub source_code: Option<String>,
}

impl Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for BindError {}

impl miette::Diagnostic for BindError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.kind.help().map(|h| Box::new(h) as Box<dyn Display>)
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_code
            .as_ref()
            .map(|s| s as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(core::iter::once(miette::LabeledSpan::new(
            Some(self.kind.label()),
            span.start,
            span.len,
        ))))
    }
}

impl BindError {
    /// Create a new error with span information
    pub fn new(kind: BindErrorKind, span: Span) -> Self {
        BindError {
            kind,
            span: Some(span),
            source_code: None,
        }
    }

    /// Create an error without span information
    pub fn without_span(kind: BindErrorKind) -> Self {
        BindError {
            kind,
            span: None,
            source_code: None,
        }
    }

    /// Attach source code for rich diagnostics
    pub fn with_source(mut self, source: &str) -> Self {
        self.source_code = Some(source.to_string());
        self
    }

    pub(crate) fn invalid_rule(path: &str, reason: impl Into<String>) -> Self {
        BindError::without_span(BindErrorKind::InvalidRule {
            path: path.to_string(),
            reason: reason.into(),
            suggestion: None,
        })
    }
}

/// Specific error kinds
#[derive(Debug, Clone, PartialEq)]
pub enum BindErrorKind {
    /// The input is not well-formed JSON
    MalformedInput {
        /// What the parser expected or rejected
        message: String,
        /// Line and column of the offending token
        position: Position,
    },
    /// The input nests arrays/objects deeper than the configured limit
    DepthLimitExceeded {
        /// The configured limit
        limit: usize,
    },
    /// A rule is ill-formed or inconsistent with the rest of the rule set
    InvalidRule {
        /// The rule's path
        path: String,
        /// Why the rule was rejected
        reason: String,
        /// A field name close to the unknown one, if any
        suggestion: Option<&'static str>,
    },
    /// No rule binds a type to the root path
    MissingRootRule,
    /// Two rules claim the same path (and field) for different targets
    AmbiguousRule {
        /// The contested path
        path: String,
        /// The contested field, for field rules
        field: Option<String>,
        /// Target of the rule registered first
        first: &'static str,
        /// Target of the rule registered later
        second: &'static str,
    },
    /// A JSON value's kind does not fit the destination
    TypeMismatch {
        /// Location of the value in the document
        path: String,
        /// The destination's type
        expected: String,
        /// The JSON kind (or type) found
        got: &'static str,
    },
    /// A JSON number does not fit the destination's integer width
    NumberOutOfRange {
        /// Location of the value in the document
        path: String,
        /// The number as written
        value: String,
        /// The destination's numeric type
        target: String,
    },
    /// The typed entry point was asked for a type other than the root rule's
    RootTypeMismatch {
        /// The type the caller asked for
        requested: &'static str,
        /// The type the root rule binds
        bound: &'static str,
    },
}

/// Render a path for messages; the root has no text of its own.
pub(crate) fn display_path(path: &str) -> &str {
    if path.is_empty() { "(root)" } else { path }
}

impl Display for BindErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindErrorKind::MalformedInput { message, position } => {
                write!(f, "malformed JSON at {position}: {message}")
            }
            BindErrorKind::DepthLimitExceeded { limit } => {
                write!(f, "input nests deeper than {limit} levels")
            }
            BindErrorKind::InvalidRule { path, reason, .. } => {
                write!(f, "invalid rule at `{}`: {reason}", display_path(path))
            }
            BindErrorKind::MissingRootRule => write!(f, "no rule binds a type to the root path"),
            BindErrorKind::AmbiguousRule {
                path,
                field,
                first,
                second,
            } => {
                write!(f, "conflicting rules at `{}`", display_path(path))?;
                if let Some(field) = field {
                    write!(f, " for field `{field}`")?;
                }
                write!(f, ": `{first}` and `{second}`")
            }
            BindErrorKind::TypeMismatch {
                path,
                expected,
                got,
            } => {
                write!(
                    f,
                    "type mismatch at `{}`: expected {expected}, got {got}",
                    display_path(path)
                )
            }
            BindErrorKind::NumberOutOfRange {
                path,
                value,
                target,
            } => {
                write!(
                    f,
                    "number `{value}` out of range for {target} at `{}`",
                    display_path(path)
                )
            }
            BindErrorKind::RootTypeMismatch { requested, bound } => {
                write!(f, "requested `{requested}`, but the root rule binds `{bound}`")
            }
        }
    }
}

impl BindErrorKind {
    /// Get an error code for this kind of error.
    pub fn code(&self) -> &'static str {
        match self {
            BindErrorKind::MalformedInput { .. } => "bind::malformed_input",
            BindErrorKind::DepthLimitExceeded { .. } => "bind::depth_limit",
            BindErrorKind::InvalidRule { .. } => "bind::invalid_rule",
            BindErrorKind::MissingRootRule => "bind::missing_root_rule",
            BindErrorKind::AmbiguousRule { .. } => "bind::ambiguous_rule",
            BindErrorKind::TypeMismatch { .. } => "bind::type_mismatch",
            BindErrorKind::NumberOutOfRange { .. } => "bind::number_out_of_range",
            BindErrorKind::RootTypeMismatch { .. } => "bind::root_type_mismatch",
        }
    }

    /// Get a label describing where/what the error points to.
    pub fn label(&self) -> String {
        match self {
            BindErrorKind::MalformedInput { message, .. } => message.clone(),
            BindErrorKind::DepthLimitExceeded { limit } => {
                format!("nesting passes {limit} levels here")
            }
            BindErrorKind::TypeMismatch { expected, got, .. } => {
                format!("expected {expected}, got {got}")
            }
            BindErrorKind::NumberOutOfRange { target, .. } => format!("out of range for {target}"),
            other => other.code().into(),
        }
    }

    /// Advice for fixing the error, when there is any.
    pub fn help(&self) -> Option<String> {
        match self {
            BindErrorKind::InvalidRule {
                suggestion: Some(suggested),
                ..
            } => Some(format!("did you mean `{suggested}`?")),
            BindErrorKind::MissingRootRule => {
                Some("register `Rule::bind_type::<T>(\"\")` for the document's root type".into())
            }
            BindErrorKind::AmbiguousRule { .. } => Some(
                "drop one of the rules, or build the set with `DuplicatePolicy::LastWins`".into(),
            ),
            _ => None,
        }
    }
}

/// Result type for binding operations
pub type Result<T> = core::result::Result<T, BindError>;
