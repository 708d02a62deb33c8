//! Literal value trees checked against a governing type.

use crate::graph::{Identifier, Location, Stamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    None,
    Pass,
    Inconc,
    Fail,
    Error,
}

/// A specific literal. String forms hold the source digits or characters.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Charstring(String),
    UniversalCharstring(String),
    Bitstring(String),
    Hexstring(String),
    Octetstring(String),
    Verdict(Verdict),
}

impl Literal {
    pub fn describe(&self) -> &'static str {
        match self {
            Literal::Integer(_) => "integer",
            Literal::Float(_) => "float",
            Literal::Boolean(_) => "boolean",
            Literal::Charstring(_) => "charstring",
            Literal::UniversalCharstring(_) => "universal charstring",
            Literal::Bitstring(_) => "bitstring",
            Literal::Hexstring(_) => "hexstring",
            Literal::Octetstring(_) => "octetstring",
            Literal::Verdict(_) => "verdict",
        }
    }

    /// Length in the unit of the string kind (characters, bits, nibbles, octets).
    pub fn string_len(&self) -> Option<u64> {
        match self {
            Literal::Charstring(s) | Literal::UniversalCharstring(s) => Some(s.chars().count() as u64),
            Literal::Bitstring(s) | Literal::Hexstring(s) => Some(s.len() as u64),
            Literal::Octetstring(s) => Some(s.len() as u64 / 2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedValue {
    pub name: Identifier,
    pub value: Value,
    pub location: Location,
    /// Appended by implicit omit rather than written in the source.
    pub implicit: bool,
}

impl NamedValue {
    pub fn new(name: &str, value: Value) -> Self {
        let location = value.location;
        Self { name: name.into(), value, location, implicit: false }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedValue {
    pub index: i64,
    pub value: Value,
    pub location: Location,
}

impl IndexedValue {
    pub fn new(index: i64, value: Value) -> Self {
        let location = value.location;
        Self { index, value, location }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    NamedList(Vec<NamedValue>),
    IndexedList(Vec<IndexedValue>),
    /// `{a, b, c}`: positional, its meaning depends on the governing type.
    PositionalList(Vec<Value>),
    Specific(Literal),
    Omit,
    /// The `-` symbol.
    NotUsed,
    /// A bare identifier: a definition or an enumeration item.
    Reference(Identifier),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub location: Location,
    pub(crate) last_checked: Option<Stamp>,
    pub(crate) erroneous: bool,
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self { kind, location: Location::default(), last_checked: None, erroneous: false }
    }

    pub fn integer(v: i64) -> Self { Self::new(ValueKind::Specific(Literal::Integer(v))) }
    pub fn float(v: f64) -> Self { Self::new(ValueKind::Specific(Literal::Float(v))) }
    pub fn boolean(v: bool) -> Self { Self::new(ValueKind::Specific(Literal::Boolean(v))) }
    pub fn charstring(s: &str) -> Self { Self::new(ValueKind::Specific(Literal::Charstring(s.into()))) }
    pub fn literal(lit: Literal) -> Self { Self::new(ValueKind::Specific(lit)) }
    pub fn omit() -> Self { Self::new(ValueKind::Omit) }
    pub fn not_used() -> Self { Self::new(ValueKind::NotUsed) }
    pub fn reference(name: &str) -> Self { Self::new(ValueKind::Reference(name.into())) }

    pub fn named<'n>(entries: impl IntoIterator<Item = (&'n str, Value)>) -> Self {
        Self::new(ValueKind::NamedList(
            entries.into_iter().map(|(name, value)| NamedValue::new(name, value)).collect(),
        ))
    }

    pub fn named_list(entries: Vec<NamedValue>) -> Self {
        Self::new(ValueKind::NamedList(entries))
    }

    pub fn positional(items: Vec<Value>) -> Self {
        Self::new(ValueKind::PositionalList(items))
    }

    pub fn indexed(entries: impl IntoIterator<Item = (i64, Value)>) -> Self {
        Self::new(ValueKind::IndexedList(
            entries.into_iter().map(|(index, value)| IndexedValue::new(index, value)).collect(),
        ))
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn is_erroneous(&self) -> bool { self.erroneous }
    pub fn last_checked(&self) -> Option<Stamp> { self.last_checked }

    pub fn named_entries(&self) -> &[NamedValue] {
        match &self.kind {
            ValueKind::NamedList(entries) => entries,
            _ => &[],
        }
    }

    pub fn entry(&self, name: &str) -> Option<&NamedValue> {
        self.named_entries().iter().find(|e| e.name.as_str() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Literal::Charstring("abc".into()), Some(3))]
    #[case(Literal::UniversalCharstring("äö".into()), Some(2))]
    #[case(Literal::Bitstring("0101".into()), Some(4))]
    #[case(Literal::Octetstring("A0FF".into()), Some(2))]
    #[case(Literal::Integer(7), None)]
    fn test_string_lengths(#[case] lit: Literal, #[case] expected: Option<u64>) {
        assert_eq!(lit.string_len(), expected);
    }

    #[test]
    fn test_named_entries_keep_source_order() {
        let v = Value::named([("b", Value::integer(2)), ("a", Value::integer(1))]);
        let names: Vec<_> = v.named_entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert!(v.entry("a").is_some());
    }
}
