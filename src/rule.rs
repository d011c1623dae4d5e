//! Binding rules and the rule table the engine consults.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::TypeId;
use core::fmt;

use crate::error::{BindError, BindErrorKind, Result};
use crate::options::{DuplicatePolicy, Options};
use crate::path::{Path, Segment};
use crate::reflect::{Bind, Instance, Shape, construct};

/// Find the best matching field name from a list of expected fields.
/// Returns Some(suggestion) if a match with similarity >= 0.6 is found.
fn find_similar_field(unknown: &str, expected: &[&'static str]) -> Option<&'static str> {
    let mut best_match: Option<(&'static str, f64)> = None;

    for &candidate in expected {
        let similarity = strsim::jaro_winkler(unknown, candidate);
        if similarity >= 0.6 && best_match.is_none_or(|(_, best_sim)| similarity > best_sim) {
            best_match = Some((candidate, similarity));
        }
    }

    best_match.map(|(name, _)| name)
}

/// A bindable type a rule instantiates or assigns into.
#[derive(Clone, Copy)]
pub struct Target {
    shape: &'static Shape,
    type_id: TypeId,
    construct: fn() -> Box<dyn Instance>,
}

impl Target {
    /// The target for `T`.
    pub fn of<T: Bind>() -> Target {
        Target {
            shape: T::SHAPE,
            type_id: TypeId::of::<T>(),
            construct: construct::<T>,
        }
    }

    /// The type's name.
    pub fn type_identifier(&self) -> &'static str {
        self.shape.type_identifier
    }

    /// The type's static description.
    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    /// A default-constructed instance of the type.
    pub fn instantiate(&self) -> Box<dyn Instance> {
        (self.construct)()
    }

    /// Returns `true` if this is the target for `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for Target {}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Target")
            .field(&self.shape.type_identifier)
            .finish()
    }
}

/// The two forms a rule takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Instantiate the target for the value at the path.
    Construct,
    /// Coerce the value at the path into a field of the target.
    Assign,
}

/// An immutable binding descriptor: a path plus what to do there.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    path: Path,
    field: Option<String>,
    target: Target,
    kind: RuleKind,
}

fn parse_path(path: &str) -> Result<Path> {
    Path::parse(path).map_err(|e| BindError::invalid_rule(path, e.to_string()))
}

fn check_field_name(path: &str, field: &str) -> Result<()> {
    if field.is_empty() {
        return Err(BindError::invalid_rule(path, "the field name is empty"));
    }
    Ok(())
}

impl Rule {
    /// Instantiate `T` for the value at `path`. The empty path makes this
    /// the root rule.
    pub fn bind_type<T: Bind>(path: &str) -> Result<Rule> {
        Ok(Rule {
            path: parse_path(path)?,
            field: None,
            target: Target::of::<T>(),
            kind: RuleKind::Construct,
        })
    }

    /// Instantiate `T` for the value at `path` and store it in `field` of
    /// the enclosing instance.
    pub fn bind_type_into<T: Bind>(path: &str, field: &str) -> Result<Rule> {
        let parsed = parse_path(path)?;
        if parsed.is_root() {
            return Err(BindError::invalid_rule(
                path,
                "the root rule cannot name a field",
            ));
        }
        check_field_name(path, field)?;
        Ok(Rule {
            path: parsed,
            field: Some(field.to_owned()),
            target: Target::of::<T>(),
            kind: RuleKind::Construct,
        })
    }

    /// Coerce the value at `path` into `field` of `T`, the enclosing type.
    ///
    /// The field is resolved right away; an unknown name fails with a
    /// suggestion when a similar field exists.
    ///
    /// When the field holds a bindable type and no construction rule shares
    /// the path, the rule constructs that type for each value there:
    /// `bind_field::<Bag>("items[]", "items")` fills `Bag.items: Vec<Item>`
    /// with one `Item` per array element.
    pub fn bind_field<T: Bind>(path: &str, field: &str) -> Result<Rule> {
        let parsed = parse_path(path)?;
        if parsed.is_root() {
            return Err(BindError::invalid_rule(
                path,
                "a field rule needs a non-empty path",
            ));
        }
        check_field_name(path, field)?;
        if T::SHAPE.field(field).is_none() {
            let suggestion = find_similar_field(field, &T::SHAPE.field_names());
            return Err(BindError::without_span(BindErrorKind::InvalidRule {
                path: path.to_owned(),
                reason: format!("`{}` has no field `{field}`", T::SHAPE.type_identifier),
                suggestion,
            }));
        }
        Ok(Rule {
            path: parsed,
            field: Some(field.to_owned()),
            target: Target::of::<T>(),
            kind: RuleKind::Assign,
        })
    }

    /// Where the rule applies.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The field named by the rule, if any.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// The type instantiated, or the type owning the field.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Which form the rule takes.
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Returns `true` for object-construction rules.
    pub fn is_construct(&self) -> bool {
        self.kind == RuleKind::Construct
    }

    fn same_slot(&self, other: &Rule) -> bool {
        if self.kind != other.kind || self.path != other.path {
            return false;
        }
        match self.kind {
            RuleKind::Construct => true,
            RuleKind::Assign => self.field == other.field,
        }
    }
}

/// A construction rule as the engine sees it.
#[derive(Debug, Clone)]
pub(crate) struct Construct {
    pub(crate) target: Target,
    /// Field of the enclosing instance that receives the new instance.
    /// `None` for the root, and everywhere when the set has no root rule.
    pub(crate) link: Option<String>,
}

/// Everything bound at one path.
#[derive(Debug, Clone, Default)]
pub(crate) struct Entry {
    pub(crate) construct: Option<Construct>,
    /// Fields of the enclosing instance assigned from the value here.
    pub(crate) assign: Vec<String>,
}

/// One member the serializer writes for an instance.
#[derive(Debug, Clone)]
pub(crate) enum Emit {
    /// A scalar field, written at `keys` below the instance's object.
    Field { keys: Vec<String>, field: String },
    /// A child instance (or sequence of them) built at `path`.
    Child {
        keys: Vec<String>,
        field: String,
        path: String,
    },
}

/// A validated, indexed collection of rules.
///
/// Lookup is by canonical path string. Every prefix of every rule path is
/// present in the index, so the engine can tell "nothing below here" from
/// "keep descending" with a single lookup.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    table: BTreeMap<String, Entry>,
    root: Option<Target>,
    emitters: BTreeMap<String, Vec<Emit>>,
}

impl RuleSet {
    /// Build a rule set with default [`Options`].
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Result<RuleSet> {
        Self::with_options(rules, &Options::default())
    }

    /// Build a rule set, resolving duplicates per `options.duplicates`.
    pub fn with_options(rules: impl IntoIterator<Item = Rule>, options: &Options) -> Result<RuleSet> {
        let rules = dedupe(rules, options.duplicates)?;
        let root = rules
            .iter()
            .find(|rule| rule.is_construct() && rule.path.is_root())
            .map(|rule| rule.target);

        let mut builder = Builder {
            rules: &rules,
            root,
            constructs: BTreeMap::new(),
            roles: alloc::vec![Role::Plain; rules.len()],
        };
        builder.resolve_links()?;
        if root.is_some() {
            builder.validate()?;
        }
        let (table, emitters) = builder.finish();

        log::debug!(
            "built rule set: {} rules, {} indexed paths",
            rules.len(),
            table.len()
        );
        Ok(RuleSet {
            rules,
            table,
            root,
            emitters,
        })
    }

    /// The type bound at the root, if any.
    pub fn root(&self) -> Option<Target> {
        self.root
    }

    /// The rules in effect, in registration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules in effect.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn entry(&self, path: &str) -> Option<&Entry> {
        self.table.get(path)
    }

    pub(crate) fn emitters(&self, path: &str) -> &[Emit] {
        self.emitters.get(path).map_or(&[], Vec::as_slice)
    }
}

fn dedupe(rules: impl IntoIterator<Item = Rule>, policy: DuplicatePolicy) -> Result<Vec<Rule>> {
    let mut kept: Vec<Rule> = Vec::new();
    for rule in rules {
        let Some(existing) = kept.iter_mut().find(|kept| kept.same_slot(&rule)) else {
            kept.push(rule);
            continue;
        };
        if *existing == rule {
            log::trace!("ignoring repeated rule at `{}`", rule.path);
            continue;
        }
        match policy {
            DuplicatePolicy::Reject => {
                return Err(BindError::without_span(BindErrorKind::AmbiguousRule {
                    path: rule.path.to_string(),
                    field: rule.field.clone(),
                    first: existing.target.type_identifier(),
                    second: rule.target.type_identifier(),
                }));
            }
            DuplicatePolicy::LastWins => {
                log::debug!(
                    "rule for `{}` at `{}` replaces the earlier one for `{}`",
                    rule.target.type_identifier(),
                    rule.path,
                    existing.target.type_identifier()
                );
                *existing = rule;
            }
        }
    }
    Ok(kept)
}

/// What a field rule turned out to be once the whole set is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Assigns scalars (or is a construction rule)
    Plain,
    /// Names the destination of a construction rule
    Consumed,
    /// Holds a bindable type with no construction rule at its path, so it
    /// constructs the values itself
    Constructs,
}

struct Builder<'a> {
    rules: &'a [Rule],
    root: Option<Target>,
    /// Construction paths with the type built there and its destination field.
    constructs: BTreeMap<&'a Path, (Target, Option<String>)>,
    roles: Vec<Role>,
}

impl<'a> Builder<'a> {
    fn resolve_links(&mut self) -> Result<()> {
        let rules = self.rules;
        for rule in rules {
            if !rule.is_construct() {
                continue;
            }
            let link = if rule.path.is_root() {
                None
            } else if let Some(field) = &rule.field {
                Some(field.clone())
            } else {
                self.destination_rule(rule).map(|field_rule| {
                    self.roles[field_rule] = Role::Consumed;
                    rules[field_rule].field.clone().unwrap_or_default()
                })
            };
            if link.is_none() && !rule.path.is_root() && self.root.is_some() {
                return Err(BindError::invalid_rule(
                    &rule.path.to_string(),
                    format!(
                        "no field receives the constructed `{}`; name one with `bind_type_into` or a field rule",
                        rule.target.type_identifier()
                    ),
                ));
            }
            self.constructs.insert(&rule.path, (rule.target, link));
        }

        for (index, rule) in rules.iter().enumerate() {
            if rule.is_construct()
                || self.roles[index] != Role::Plain
                || self.constructs.contains_key(&rule.path)
            {
                continue;
            }
            let Some(field) = rule.field.as_deref() else {
                continue;
            };
            let Some(element) = rule
                .target
                .shape()
                .field(field)
                .and_then(|shape| shape.element_target())
            else {
                continue;
            };
            log::debug!(
                "field rule at `{}` constructs `{}` for `{}.{field}`",
                rule.path,
                element.type_identifier(),
                rule.target.type_identifier()
            );
            self.roles[index] = Role::Constructs;
            self.constructs
                .insert(&rule.path, (element, Some(field.to_owned())));
        }
        Ok(())
    }

    /// The field rule naming where the instance built by `rule` goes: one at
    /// the same path, or for `x[]` one at `x`, whose field holds the type.
    fn destination_rule(&self, rule: &Rule) -> Option<usize> {
        let parent = rule.path.parent().filter(|_| rule.path.ends_with_each());
        let candidates = [Some(&rule.path), parent.as_ref()];
        candidates.into_iter().flatten().find_map(|path| {
            self.rules.iter().position(|candidate| {
                candidate.kind == RuleKind::Assign
                    && &candidate.path == path
                    && candidate
                        .field
                        .as_deref()
                        .and_then(|field| candidate.target.shape().field(field))
                        .and_then(|field| field.kind.object_type())
                        == Some(rule.target.type_identifier())
            })
        })
    }

    /// The type enclosing a value at `path`: the nearest construction rule
    /// strictly above it.
    fn enclosing(&self, path: &Path) -> Option<Target> {
        path.prefixes()
            .find_map(|prefix| self.constructs.get(&prefix).map(|&(target, _)| target))
    }

    fn validate(&self) -> Result<()> {
        for (&path, (target, link)) in &self.constructs {
            let (Some(link), Some(enclosing)) = (link, self.enclosing(path)) else {
                continue;
            };
            let at = path.to_string();
            let Some(field) = enclosing.shape().field(link) else {
                let suggestion =
                    find_similar_field(link, &enclosing.shape().field_names());
                return Err(BindError::without_span(BindErrorKind::InvalidRule {
                    path: at,
                    reason: format!(
                        "`{}` has no field `{link}`",
                        enclosing.type_identifier()
                    ),
                    suggestion,
                }));
            };
            if field.kind.object_type() != Some(target.type_identifier()) {
                return Err(BindError::invalid_rule(
                    &at,
                    format!(
                        "field `{}.{link}` holds `{}`, not `{}`",
                        enclosing.type_identifier(),
                        field.kind,
                        target.type_identifier()
                    ),
                ));
            }
            if field.kind.is_sequence() != path.ends_with_each() {
                let reason = if path.ends_with_each() {
                    format!(
                        "`[]` paths append to a sequence, but `{}.{link}` is `{}`",
                        enclosing.type_identifier(),
                        field.kind
                    )
                } else {
                    format!(
                        "`{}.{link}` is a sequence; bind its elements at `{path}[]`",
                        enclosing.type_identifier()
                    )
                };
                return Err(BindError::invalid_rule(&at, reason));
            }
        }

        for rule in self.rules.iter().filter(|rule| !rule.is_construct()) {
            let at = rule.path.to_string();
            let Some(enclosing) = self.enclosing(&rule.path) else {
                continue;
            };
            if enclosing != rule.target {
                return Err(BindError::invalid_rule(
                    &at,
                    format!(
                        "field rule for `{}` applies inside `{}`",
                        rule.target.type_identifier(),
                        enclosing.type_identifier()
                    ),
                ));
            }
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.is_construct() || self.roles[index] != Role::Plain {
                continue;
            }
            let name = rule.field.as_deref().unwrap_or_default();
            let Some(field) = rule.target.shape().field(name) else {
                continue;
            };
            let at = rule.path.to_string();
            if let Some(object) = field.kind.object_type() {
                return Err(BindError::invalid_rule(
                    &at,
                    format!(
                        "field `{}.{name}` holds `{object}`; bind `{object}` with a construction rule",
                        rule.target.type_identifier()
                    ),
                ));
            }
            if rule.path.ends_with_each() && !field.kind.is_sequence() {
                return Err(BindError::invalid_rule(
                    &at,
                    format!(
                        "`[]` paths append to a sequence, but `{}.{name}` is `{}`",
                        rule.target.type_identifier(),
                        field.kind
                    ),
                ));
            }
        }
        Ok(())
    }

    fn finish(self) -> (BTreeMap<String, Entry>, BTreeMap<String, Vec<Emit>>) {
        let mut table: BTreeMap<String, Entry> = BTreeMap::new();
        let mut emitters: BTreeMap<String, Vec<Emit>> = BTreeMap::new();

        for (path, (target, link)) in &self.constructs {
            table.entry(path.to_string()).or_default().construct = Some(Construct {
                target: *target,
                link: link.clone(),
            });
        }

        for (index, rule) in self.rules.iter().enumerate() {
            for prefix in rule.path.prefixes() {
                table.entry(prefix.to_string()).or_default();
            }
            if rule.is_construct() {
                continue;
            }
            let field = rule.field.clone().unwrap_or_default();
            if self.roles[index] == Role::Plain {
                table
                    .entry(rule.path.to_string())
                    .or_default()
                    .assign
                    .push(field);
            }
        }

        if self.root.is_some() {
            for (index, rule) in self.rules.iter().enumerate() {
                if self.roles[index] == Role::Consumed || rule.path.is_root() {
                    continue;
                }
                let constructs = rule.is_construct() || self.roles[index] == Role::Constructs;
                let field = match (constructs, &rule.field) {
                    (false, Some(field)) => field.clone(),
                    _ => match self.constructs.get(&rule.path) {
                        Some((_, Some(link))) => link.clone(),
                        _ => continue,
                    },
                };
                let Some((owner, keys)) = self.relative_keys(&rule.path) else {
                    log::debug!(
                        "rule at `{}` is not reversible: it reaches into an array without a construction rule",
                        rule.path
                    );
                    continue;
                };
                let emit = if constructs {
                    Emit::Child {
                        keys,
                        field,
                        path: rule.path.to_string(),
                    }
                } else {
                    Emit::Field { keys, field }
                };
                emitters.entry(owner).or_default().push(emit);
            }
        }

        (table, emitters)
    }

    /// The enclosing construction path of `path` and the member keys leading
    /// from it to `path`, ignoring a trailing `[]`.
    fn relative_keys(&self, path: &Path) -> Option<(String, Vec<String>)> {
        let owner = path
            .prefixes()
            .find(|prefix| self.constructs.contains_key(prefix))?;
        let mut below = path.strip_prefix(&owner)?;
        if let [rest @ .., Segment::Each] = below {
            below = rest;
        }
        let keys = below
            .iter()
            .map(|segment| match segment {
                Segment::Key(key) => Some(key.clone()),
                Segment::Each => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some((owner.to_string(), keys))
    }
}
