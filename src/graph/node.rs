//! Defines the type nodes of the graph and the small value types they carry.

use super::storage::TypeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque source position. The checker only forwards it to diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Location {
    pub file: u32,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { file: 0, line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A field, alternative, enumeration item or definition name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Integer,
    Float,
    Boolean,
    Charstring,
    UniversalCharstring,
    Bitstring,
    Hexstring,
    Octetstring,
    Verdict,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Charstring => "charstring",
            PrimitiveKind::UniversalCharstring => "universal charstring",
            PrimitiveKind::Bitstring => "bitstring",
            PrimitiveKind::Hexstring => "hexstring",
            PrimitiveKind::Octetstring => "octetstring",
            PrimitiveKind::Verdict => "verdicttype",
        }
    }

    /// String kinds accept length subtyping and length-restricted templates.
    pub fn is_string(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Charstring
                | PrimitiveKind::UniversalCharstring
                | PrimitiveKind::Bitstring
                | PrimitiveKind::Hexstring
                | PrimitiveKind::Octetstring
        )
    }
}

/// An inclusive length range; `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LengthRange {
    pub min: u64,
    pub max: Option<u64>,
}

impl LengthRange {
    pub fn exactly(n: u64) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub fn between(min: u64, max: u64) -> Self {
        Self { min, max: Some(max) }
    }

    pub fn at_least(min: u64) -> Self {
        Self { min, max: None }
    }

    pub fn contains(&self, n: u64) -> bool {
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }

    pub fn is_valid(&self) -> bool {
        self.max.map_or(true, |max| self.min <= max)
    }

    pub fn intersects(&self, other: &LengthRange) -> bool {
        let low = self.min.max(other.min);
        match (self.max, other.max) {
            (Some(a), Some(b)) => low <= a.min(b),
            (Some(a), None) => low <= a,
            (None, Some(b)) => low <= b,
            (None, None) => true,
        }
    }
}

impl fmt::Display for LengthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "length({})", self.min),
            Some(max) => write!(f, "length({}..{})", self.min, max),
            None => write!(f, "length({}..infinity)", self.min),
        }
    }
}

/// Subtype restriction attached to a type. Only the length part is
/// interpreted here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtypeConstraint {
    pub length: Option<LengthRange>,
}

impl SubtypeConstraint {
    pub fn length(range: LengthRange) -> Self {
        Self { length: Some(range) }
    }
}

/// Encoding hints carried through for encoder-specific validation.
///
/// The checker reads them only as "has a fixed length" and "has a default value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingAttributes {
    pub length_in_bits: Option<u32>,
    pub default_text: Option<String>,
}

impl EncodingAttributes {
    pub fn has_length(&self) -> bool {
        self.length_in_bits.is_some()
    }

    pub fn has_default_value(&self) -> bool {
        self.default_text.is_some()
    }
}

/// A component of a record, set, union or anytype, or a procedure parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Identifier,
    pub ty: TypeId,
    pub optional: bool,
    pub location: Location,
}

impl Field {
    pub fn mandatory(name: &str, ty: TypeId) -> Self {
        Self { name: name.into(), ty, optional: false, location: Location::default() }
    }

    pub fn optional(name: &str, ty: TypeId) -> Self {
        Self { name: name.into(), ty, optional: true, location: Location::default() }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumItem {
    pub name: Identifier,
    /// Explicitly assigned value; items without one are numbered during checking.
    pub value: Option<i64>,
    pub location: Location,
}

impl EnumItem {
    pub fn new(name: &str) -> Self {
        Self { name: name.into(), value: None, location: Location::default() }
    }

    pub fn with_value(name: &str, value: i64) -> Self {
        Self { name: name.into(), value: Some(value), location: Location::default() }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcedureKind {
    Function,
    Altstep,
    Testcase,
    Signature,
}

impl ProcedureKind {
    pub fn name(self) -> &'static str {
        match self {
            ProcedureKind::Function => "function",
            ProcedureKind::Altstep => "altstep",
            ProcedureKind::Testcase => "testcase",
            ProcedureKind::Signature => "signature",
        }
    }
}

/// The closed set of type kinds. Child types are arena ids, so cycles only
/// ever pass through `Reference` nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Sequence(Vec<Field>),
    Set(Vec<Field>),
    Choice(Vec<Field>),
    Anytype(Vec<Field>),
    SequenceOf(TypeId),
    SetOf(TypeId),
    Array { element: TypeId, size: u64 },
    Enumerated(Vec<EnumItem>),
    /// An alias to a named definition, resolved lazily.
    Reference(Identifier),
    Procedure {
        kind: ProcedureKind,
        params: Vec<Field>,
        returns: Option<TypeId>,
    },
    Primitive(PrimitiveKind),
}

impl TypeKind {
    /// Keyword used when describing an anonymous type in messages.
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeKind::Sequence(_) => "record",
            TypeKind::Set(_) => "set",
            TypeKind::Choice(_) => "union",
            TypeKind::Anytype(_) => "anytype",
            TypeKind::SequenceOf(_) => "record of",
            TypeKind::SetOf(_) => "set of",
            TypeKind::Array { .. } => "array",
            TypeKind::Enumerated(_) => "enumerated",
            TypeKind::Reference(_) => "reference",
            TypeKind::Procedure { kind, .. } => kind.name(),
            TypeKind::Primitive(p) => p.name(),
        }
    }

    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            TypeKind::Sequence(f) | TypeKind::Set(f) | TypeKind::Choice(f) | TypeKind::Anytype(f) => {
                Some(f)
            }
            TypeKind::Procedure { params, .. } => Some(params),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<TypeId> {
        match self {
            TypeKind::SequenceOf(e) | TypeKind::SetOf(e) => Some(*e),
            TypeKind::Array { element, .. } => Some(*element),
            _ => None,
        }
    }

    /// Types directly declared by or referenced from this node, in declaration order.
    pub fn children(&self) -> Vec<TypeId> {
        match self {
            TypeKind::Sequence(f) | TypeKind::Set(f) | TypeKind::Choice(f) | TypeKind::Anytype(f) => {
                f.iter().map(|field| field.ty).collect()
            }
            TypeKind::SequenceOf(e) | TypeKind::SetOf(e) => vec![*e],
            TypeKind::Array { element, .. } => vec![*element],
            TypeKind::Procedure { params, returns, .. } => {
                params.iter().map(|p| p.ty).chain(returns.iter().copied()).collect()
            }
            TypeKind::Enumerated(_) | TypeKind::Reference(_) | TypeKind::Primitive(_) => Vec::new(),
        }
    }

    /// Whether templates of this type may carry a length restriction, and
    /// whether the type itself may carry length subtyping.
    pub fn is_length_restrictable(&self) -> bool {
        match self {
            TypeKind::SequenceOf(_) | TypeKind::SetOf(_) | TypeKind::Array { .. } => true,
            TypeKind::Primitive(p) => p.is_string(),
            _ => false,
        }
    }

    pub fn is_procedure(&self) -> bool {
        matches!(self, TypeKind::Procedure { .. })
    }
}
