//! Template trees: values extended with matching mechanisms.

use super::value::Literal;
use crate::graph::{Identifier, LengthRange, Location, Stamp};

/// How strictly a named-field template has to list the fields of its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Completeness {
    /// Every field has to be present.
    MustComplete,
    /// Missing fields are allowed and field order is not enforced.
    MayIncomplete,
    /// Missing fields are taken from the base template at the same position.
    Partial,
}

/// Lifecycle of a template node within one checking pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateState {
    Unchecked,
    Classified(Completeness),
    Valid(Stamp),
    Erroneous(Stamp),
}

impl TemplateState {
    /// The stamp of the last completed check, if any.
    pub fn checked_at(&self) -> Option<Stamp> {
        match self {
            TemplateState::Valid(s) | TemplateState::Erroneous(s) => Some(*s),
            TemplateState::Unchecked | TemplateState::Classified(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedTemplate {
    pub name: Identifier,
    pub template: Template,
    pub location: Location,
    pub implicit: bool,
}

impl NamedTemplate {
    pub fn new(name: &str, template: Template) -> Self {
        let location = template.location;
        Self { name: name.into(), template, location, implicit: false }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTemplate {
    pub index: i64,
    pub template: Template,
    pub location: Location,
}

impl IndexedTemplate {
    pub fn new(index: i64, template: Template) -> Self {
        let location = template.location;
        Self { index, template, location }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateKind {
    NamedList(Vec<NamedTemplate>),
    IndexedList(Vec<IndexedTemplate>),
    PositionalList(Vec<Template>),
    Specific(Literal),
    Omit,
    NotUsed,
    Reference(Identifier),
    /// `?`
    AnyValue,
    /// `*`
    AnyOrOmit,
    ValueList(Vec<Template>),
    ComplementedList(Vec<Template>),
    Subset(Vec<Template>),
    Superset(Vec<Template>),
    Permutation(Vec<Template>),
}

impl TemplateKind {
    pub fn describe(&self) -> &'static str {
        match self {
            TemplateKind::NamedList(_) => "assignment notation",
            TemplateKind::IndexedList(_) => "indexed list notation",
            TemplateKind::PositionalList(_) => "value list notation",
            TemplateKind::Specific(_) => "specific value",
            TemplateKind::Omit => "omit",
            TemplateKind::NotUsed => "not used symbol",
            TemplateKind::Reference(_) => "reference",
            TemplateKind::AnyValue => "any value",
            TemplateKind::AnyOrOmit => "any or omit",
            TemplateKind::ValueList(_) => "value list match",
            TemplateKind::ComplementedList(_) => "complemented list match",
            TemplateKind::Subset(_) => "subset match",
            TemplateKind::Superset(_) => "superset match",
            TemplateKind::Permutation(_) => "permutation match",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub kind: TemplateKind,
    pub location: Location,
    pub length: Option<LengthRange>,
    /// Name of the template definition this one modifies.
    pub base: Option<Identifier>,
    pub is_modified: bool,
    pub(crate) state: TemplateState,
    pub(crate) completeness: Option<Completeness>,
}

impl Template {
    pub fn new(kind: TemplateKind) -> Self {
        Self {
            kind,
            location: Location::default(),
            length: None,
            base: None,
            is_modified: false,
            state: TemplateState::Unchecked,
            completeness: None,
        }
    }

    pub fn integer(v: i64) -> Self { Self::new(TemplateKind::Specific(Literal::Integer(v))) }
    pub fn boolean(v: bool) -> Self { Self::new(TemplateKind::Specific(Literal::Boolean(v))) }
    pub fn charstring(s: &str) -> Self { Self::new(TemplateKind::Specific(Literal::Charstring(s.into()))) }
    pub fn literal(lit: Literal) -> Self { Self::new(TemplateKind::Specific(lit)) }
    pub fn any_value() -> Self { Self::new(TemplateKind::AnyValue) }
    pub fn any_or_omit() -> Self { Self::new(TemplateKind::AnyOrOmit) }
    pub fn omit() -> Self { Self::new(TemplateKind::Omit) }
    pub fn not_used() -> Self { Self::new(TemplateKind::NotUsed) }
    pub fn reference(name: &str) -> Self { Self::new(TemplateKind::Reference(name.into())) }
    pub fn value_list(items: Vec<Template>) -> Self { Self::new(TemplateKind::ValueList(items)) }
    pub fn complement(items: Vec<Template>) -> Self { Self::new(TemplateKind::ComplementedList(items)) }
    pub fn subset(items: Vec<Template>) -> Self { Self::new(TemplateKind::Subset(items)) }
    pub fn superset(items: Vec<Template>) -> Self { Self::new(TemplateKind::Superset(items)) }
    pub fn permutation(items: Vec<Template>) -> Self { Self::new(TemplateKind::Permutation(items)) }
    pub fn positional(items: Vec<Template>) -> Self { Self::new(TemplateKind::PositionalList(items)) }

    pub fn named<'n>(entries: impl IntoIterator<Item = (&'n str, Template)>) -> Self {
        Self::new(TemplateKind::NamedList(
            entries.into_iter().map(|(name, t)| NamedTemplate::new(name, t)).collect(),
        ))
    }

    pub fn named_list(entries: Vec<NamedTemplate>) -> Self {
        Self::new(TemplateKind::NamedList(entries))
    }

    pub fn indexed(entries: impl IntoIterator<Item = (i64, Template)>) -> Self {
        Self::new(TemplateKind::IndexedList(
            entries.into_iter().map(|(index, t)| IndexedTemplate::new(index, t)).collect(),
        ))
    }

    /// Marks this template as a modification of the template definition `base`.
    pub fn modifies(mut self, base: &str) -> Self {
        self.base = Some(base.into());
        self.is_modified = true;
        self
    }

    pub fn with_length(mut self, range: LengthRange) -> Self {
        self.length = Some(range);
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn state(&self) -> TemplateState { self.state }
    pub fn completeness(&self) -> Option<Completeness> { self.completeness }

    pub fn is_erroneous(&self) -> bool {
        matches!(self.state, TemplateState::Erroneous(_))
    }

    pub fn named_entries(&self) -> &[NamedTemplate] {
        match &self.kind {
            TemplateKind::NamedList(entries) => entries,
            _ => &[],
        }
    }

    pub fn entry(&self, name: &str) -> Option<&NamedTemplate> {
        self.named_entries().iter().find(|e| e.name.as_str() == name)
    }
}
