//! Rule-driven deserializer: walks the parsed value tree and builds the
//! object graph the rules describe.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write as _;

use crate::error::{BindError, BindErrorKind, Result, display_path};
use crate::options::{DEFAULT_MAX_DEPTH, Options};
use crate::path::{push_each, push_key};
use crate::reflect::{Bind, Instance, Mismatch, Slot};
use crate::rule::{Construct, RuleSet};
use crate::value::{self, Value};

const BOM: &[u8] = &[0xef, 0xbb, 0xbf];

/// Binds JSON documents with one rule set.
#[derive(Debug, Clone)]
pub struct Deserializer<'rules> {
    rules: &'rules RuleSet,
    max_depth: usize,
}

impl<'rules> Deserializer<'rules> {
    /// A deserializer with default options.
    pub fn new(rules: &'rules RuleSet) -> Self {
        Deserializer {
            rules,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Apply `options` (the nesting limit; the duplicate policy only matters
    /// when building the rule set).
    pub fn with_options(mut self, options: &Options) -> Self {
        self.max_depth = options.max_depth;
        self
    }

    /// Bind a document, returning the root instance.
    ///
    /// Note: For rich error diagnostics with source code display, prefer
    /// [`Deserializer::deserialize_str`] which can attach the source string
    /// to errors.
    pub fn deserialize(&self, input: &[u8]) -> Result<Box<dyn Instance>> {
        self.deserialize_inner(input, None)
    }

    /// Bind a document given as text.
    ///
    /// Errors from this function include source code context for rich
    /// diagnostic display when using [`miette`]'s reporting features.
    pub fn deserialize_str(&self, input: &str) -> Result<Box<dyn Instance>> {
        self.deserialize_inner(input.as_bytes(), Some(input))
    }

    /// Bind a document whose root rule binds `T`.
    pub fn deserialize_as<T: Bind>(&self, input: &[u8]) -> Result<T> {
        self.check_root::<T>()?;
        let root = self.deserialize(input)?;
        downcast_root(root)
    }

    fn check_root<T: Bind>(&self) -> Result<()> {
        let root = self
            .rules
            .root()
            .ok_or_else(|| BindError::without_span(BindErrorKind::MissingRootRule))?;
        if !root.is::<T>() {
            return Err(BindError::without_span(BindErrorKind::RootTypeMismatch {
                requested: T::SHAPE.type_identifier,
                bound: root.type_identifier(),
            }));
        }
        Ok(())
    }

    fn deserialize_inner(&self, input: &[u8], source: Option<&str>) -> Result<Box<dyn Instance>> {
        let root = self
            .rules
            .root()
            .ok_or_else(|| BindError::without_span(BindErrorKind::MissingRootRule))?;

        // Handle BOM
        let (input, source) = match input.strip_prefix(BOM) {
            Some(rest) => (rest, source.map(|s| &s[BOM.len()..])),
            None => (input, source),
        };

        let value = value::parse(input, self.max_depth).map_err(|e| match source {
            Some(src) => e.with_source(src),
            None => e.with_source(&String::from_utf8_lossy(input)),
        })?;

        let mut instance = root.instantiate();
        log::trace!("binding document into `{}`", root.type_identifier());
        Walker::new(self.rules).walk_root(&value, instance.as_mut())?;
        Ok(instance)
    }
}

fn downcast_root<T: Bind>(root: Box<dyn Instance>) -> Result<T> {
    let bound = root.shape().type_identifier;
    root.downcast::<T>().ok_or_else(|| {
        BindError::without_span(BindErrorKind::RootTypeMismatch {
            requested: T::SHAPE.type_identifier,
            bound,
        })
    })
}

/// One step from the root to the value being visited.
#[derive(Debug, Clone, Copy)]
enum Step<'v> {
    Key(&'v str),
    Index(usize),
}

struct Walker<'r, 'v> {
    rules: &'r RuleSet,
    /// Canonical rule path of the current value
    path: String,
    /// Concrete location of the current value, for error messages
    trail: Vec<Step<'v>>,
    /// Per enclosing instance, the sequence fields already emptied
    cleared: Vec<BTreeSet<&'r str>>,
}

impl<'r, 'v> Walker<'r, 'v> {
    fn new(rules: &'r RuleSet) -> Self {
        Walker {
            rules,
            path: String::new(),
            trail: Vec::new(),
            cleared: alloc::vec![BTreeSet::new()],
        }
    }

    fn walk_root(&mut self, value: &'v Value<'_>, root: &mut dyn Instance) -> Result<()> {
        match value {
            Value::Object(members) => self.walk_members(members, root),
            Value::Array(items) => self.walk_sequence(items, root),
            other => Err(BindError::without_span(BindErrorKind::TypeMismatch {
                path: String::new(),
                expected: root.shape().type_identifier.to_string(),
                got: other.kind_name(),
            })),
        }
    }

    fn walk_members(
        &mut self,
        members: &'v [(Cow<'_, str>, Value<'_>)],
        enclosing: &mut dyn Instance,
    ) -> Result<()> {
        for (key, value) in members {
            if key.contains(['.', '[', ']']) {
                log::trace!(
                    "skipping key {key:?} at `{}`: no rule can address it",
                    display_path(&self.path)
                );
                continue;
            }
            let len = self.path.len();
            push_key(&mut self.path, key);
            self.trail.push(Step::Key(key));
            self.visit(value, enclosing)?;
            self.trail.pop();
            self.path.truncate(len);
        }
        Ok(())
    }

    fn walk_sequence(&mut self, items: &'v [Value<'_>], enclosing: &mut dyn Instance) -> Result<()> {
        let len = self.path.len();
        push_each(&mut self.path);

        if self.rules.entry(&self.path).is_none() {
            log::trace!("skipping unmapped array at `{}`", self.location());
            self.path.truncate(len);
            return Ok(());
        }
        self.clear_destinations(enclosing)?;

        for (index, item) in items.iter().enumerate() {
            self.trail.push(Step::Index(index));
            self.visit(item, enclosing)?;
            self.trail.pop();
        }

        self.path.truncate(len);
        Ok(())
    }

    /// Empty the sequences the elements at the current `[]` path go into,
    /// so the document replaces their default contents. Each field is
    /// emptied once per enclosing instance: arrays nested under arrays
    /// without a construction rule keep appending to the same sequence.
    fn clear_destinations(&mut self, enclosing: &mut dyn Instance) -> Result<()> {
        let rules = self.rules;
        let Some(entry) = rules.entry(&self.path) else {
            return Ok(());
        };
        let link = entry.construct.as_ref().and_then(|c| c.link.as_deref());
        for field in link.into_iter().chain(entry.assign.iter().map(String::as_str)) {
            let first = match self.cleared.last_mut() {
                Some(frame) => frame.insert(field),
                None => true,
            };
            if first {
                self.slot(enclosing, field)?.clear();
            }
        }
        Ok(())
    }

    fn visit(&mut self, value: &'v Value<'_>, enclosing: &mut dyn Instance) -> Result<()> {
        let rules = self.rules;
        let Some(entry) = rules.entry(&self.path) else {
            log::trace!("skipping unmapped value at `{}`", self.location());
            return Ok(());
        };

        if let Some(construct) = &entry.construct {
            return self.construct(construct, value, enclosing);
        }

        if !entry.assign.is_empty() {
            let each = self.path.ends_with("[]");
            for field in &entry.assign {
                log::trace!("assigning `{}` from `{}`", field, self.location());
                let slot = self.slot(enclosing, field)?;
                let assigned = if each {
                    slot.push(value)
                } else {
                    slot.assign(value)
                };
                assigned.map_err(|m| self.mismatch(m))?;
            }
            return Ok(());
        }

        match value {
            Value::Object(members) => self.walk_members(members, enclosing),
            Value::Array(items) => self.walk_sequence(items, enclosing),
            _ => {
                log::trace!("skipping {} at `{}`", value.kind_name(), self.location());
                Ok(())
            }
        }
    }

    fn construct(
        &mut self,
        construct: &Construct,
        value: &'v Value<'_>,
        enclosing: &mut dyn Instance,
    ) -> Result<()> {
        let Some(link) = construct.link.as_deref() else {
            return Ok(());
        };
        match value {
            Value::Object(members) => {
                log::trace!(
                    "constructing `{}` at `{}`",
                    construct.target.type_identifier(),
                    self.location()
                );
                let mut child = construct.target.instantiate();
                self.cleared.push(BTreeSet::new());
                let walked = self.walk_members(members, child.as_mut());
                self.cleared.pop();
                walked?;
                self.slot(enclosing, link)?
                    .link(child)
                    .map_err(|m| self.mismatch(m))
            }
            Value::Null if !self.path.ends_with("[]") => {
                self.slot(enclosing, link)?.clear();
                Ok(())
            }
            other => Err(BindError::without_span(BindErrorKind::TypeMismatch {
                path: self.location(),
                expected: construct.target.type_identifier().to_string(),
                got: other.kind_name(),
            })),
        }
    }

    fn slot<'i>(&self, instance: &'i mut dyn Instance, field: &str) -> Result<&'i mut dyn Slot> {
        let type_identifier = instance.shape().type_identifier;
        instance.slot_mut(field).ok_or_else(|| {
            BindError::invalid_rule(
                &self.path,
                format!("`{type_identifier}` has no field `{field}`"),
            )
        })
    }

    fn mismatch(&self, mismatch: Mismatch) -> BindError {
        let path = self.location();
        BindError::without_span(match mismatch {
            Mismatch::Type { expected, got } => BindErrorKind::TypeMismatch {
                path,
                expected: expected.to_string(),
                got,
            },
            Mismatch::OutOfRange { expected, value } => BindErrorKind::NumberOutOfRange {
                path,
                value,
                target: expected.repr.to_string(),
            },
        })
    }

    /// The current location with concrete indices, like `people[1].age`.
    fn location(&self) -> String {
        let mut location = String::new();
        for step in &self.trail {
            match step {
                Step::Key(key) => push_key(&mut location, key),
                Step::Index(index) => {
                    let _ = write!(location, "[{index}]");
                }
            }
        }
        location
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Bind a document with `rules`, returning the root instance.
pub fn deserialize(input: &[u8], rules: &RuleSet) -> Result<Box<dyn Instance>> {
    Deserializer::new(rules).deserialize(input)
}

/// Bind a document whose root rule binds `T`.
///
/// Note: For rich error diagnostics with source code display, prefer
/// [`from_str`] which can attach the source string to errors.
pub fn from_slice<T: Bind>(input: &[u8], rules: &RuleSet) -> Result<T> {
    Deserializer::new(rules).deserialize_as(input)
}

/// Bind a document given as text whose root rule binds `T`.
///
/// Errors from this function include source code context for rich diagnostic
/// display when using [`miette`]'s reporting features.
pub fn from_str<T: Bind>(input: &str, rules: &RuleSet) -> Result<T> {
    let deserializer = Deserializer::new(rules);
    deserializer.check_root::<T>()?;
    let root = deserializer.deserialize_str(input)?;
    downcast_root(root)
}
