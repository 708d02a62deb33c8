//! Defines the diagnostic records produced by the checkers and the sink
//! they are reported to.
use crate::graph::Location;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    /// A broken invariant of an upstream phase, not a user mistake.
    Internal,
}

/// The specific category of a diagnostic, for programmatic inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// Two types are not compatible, or a literal does not fit its type.
    TypeMismatch,
    /// A type reference does not lead to a type definition.
    TypeReference,
    /// Alias chain, modifies chain or value that refers back to itself.
    CircularReference,
    /// A record type that contains itself through mandatory fields.
    Recursion,
    MissingField,
    DuplicateField,
    UnknownField,
    FieldOrder,
    /// Union values and templates need exactly one alternative.
    UnionArity,
    BadIndex,
    DuplicateIndex,
    IndexHole,
    /// `omit` or `-` used where the context does not allow it.
    InvalidOmit,
    NotUsed,
    LengthRestriction,
    ElementCount,
    DuplicateEnumeration,
    BadReference,
    MatchingMechanism,
    General,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::TypeMismatch => "type_mismatch",
            Category::TypeReference => "type_reference",
            Category::CircularReference => "circular_reference",
            Category::Recursion => "recursion",
            Category::MissingField => "missing_field",
            Category::DuplicateField => "duplicate_field",
            Category::UnknownField => "unknown_field",
            Category::FieldOrder => "field_order",
            Category::UnionArity => "union_arity",
            Category::BadIndex => "bad_index",
            Category::DuplicateIndex => "duplicate_index",
            Category::IndexHole => "index_hole",
            Category::InvalidOmit => "invalid_omit",
            Category::NotUsed => "not_used",
            Category::LengthRestriction => "length_restriction",
            Category::ElementCount => "element_count",
            Category::DuplicateEnumeration => "duplicate_enumeration",
            Category::BadReference => "bad_reference",
            Category::MatchingMechanism => "matching_mechanism",
            Category::General => "general",
        }
    }
}

/// A structured report from the checkers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub location: Location,
    /// A second location the message refers to, such as a first occurrence.
    pub related: Option<Location>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: Category, location: Location, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, category, location, related: None, message: message.into() }
    }

    pub fn warning(category: Category, location: Location, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, category, location, related: None, message: message.into() }
    }

    pub fn internal(location: Location, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Internal,
            category: Category::General,
            location,
            related: None,
            message: format!("INTERNAL ERROR: {}", message.into()),
        }
    }

    pub fn with_related(mut self, related: Location) -> Self {
        self.related = Some(related);
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error | Severity::Internal)
    }
}

/// Receives diagnostics. Checking never stops at the first report.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);

    fn report_error(&mut self, location: Location, message: String) {
        self.report(Diagnostic::error(Category::General, location, message));
    }

    fn report_warning(&mut self, location: Location, message: String) {
        self.report(Diagnostic::warning(Category::General, location, message));
    }
}

/// A sink that keeps every diagnostic in report order.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self { Self::default() }

    pub fn all(&self) -> &[Diagnostic] { &self.items }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn count(&self, category: Category) -> usize {
        self.items.iter().filter(|d| d.category == category).count()
    }

    pub fn of(&self, category: Category) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.category == category)
    }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn clear(&mut self) { self.items.clear() }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.items)
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }
}

/// Forwards to the caller's sink while counting errors, so the checker can
/// tell whether a sub-check failed.
pub(crate) struct Reporter<'s> {
    sink: &'s mut dyn DiagnosticSink,
    errors: usize,
}

impl<'s> Reporter<'s> {
    pub fn new(sink: &'s mut dyn DiagnosticSink) -> Self {
        Self { sink, errors: 0 }
    }

    pub fn errors(&self) -> usize { self.errors }
}

impl DiagnosticSink for Reporter<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.errors += 1;
        }
        self.sink.report(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporter_counts_errors_but_not_warnings() {
        let mut diags = Diagnostics::new();
        {
            let mut reporter = Reporter::new(&mut diags);
            reporter.report_error(Location::new(1, 1), "bad".into());
            reporter.report_warning(Location::new(2, 1), "odd".into());
            reporter.report(Diagnostic::internal(Location::new(3, 1), "broken"));
            assert_eq!(reporter.errors(), 2);
        }
        assert_eq!(diags.all().len(), 3);
        assert_eq!(diags.warnings().count(), 1);
        assert!(diags.all()[2].message.starts_with("INTERNAL ERROR"));
    }

    #[test]
    fn test_diagnostics_export_as_json() {
        let mut diags = Diagnostics::new();
        diags.report(
            Diagnostic::error(Category::DuplicateField, Location::new(4, 9), "Duplicate field `x'")
                .with_related(Location::new(4, 2)),
        );

        let json = diags.to_json().unwrap();
        assert!(json.contains("DuplicateField"));
        assert!(json.contains("\"line\": 4"));
    }
}
