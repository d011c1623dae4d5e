//! Knobs shared by rule-set construction and deserialization.

/// Nesting limit applied when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What to do when two rules claim the same destination.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with [`BindErrorKind::AmbiguousRule`](crate::BindErrorKind::AmbiguousRule).
    #[default]
    Reject,
    /// The rule registered later replaces the earlier one.
    LastWins,
}

/// Options for building rule sets and deserializing documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Deepest array/object nesting the parser accepts
    pub max_depth: usize,
    /// How conflicting rules are resolved
    pub duplicates: DuplicatePolicy,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_depth: DEFAULT_MAX_DEPTH,
            duplicates: DuplicatePolicy::default(),
        }
    }
}

impl Options {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the duplicate-rule policy.
    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }
}
