//! Value conformance: a value tree against its governing type.
use super::super::checker::TypeChecker;
use super::super::compat::CompatibilityInfo;
use super::super::error::{Category, Diagnostic, DiagnosticSink};
use super::fields::declaration_slot;
use crate::graph::{Definition, Field, Identifier, LengthRange, Location, TypeId, TypeKind};
use crate::tree::{NamedValue, Value, ValueKind};
use tracing::trace;

/// What a reference inside the checked tree may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedKind {
    /// Constants only. Indexed lists must not have holes.
    #[default]
    Constant,
    /// Also variables and module parameters.
    Dynamic,
    /// Also templates.
    Template,
}

impl ExpectedKind {
    fn describe(self) -> &'static str {
        match self {
            ExpectedKind::Constant => "constant",
            ExpectedKind::Dynamic => "value",
            ExpectedKind::Template => "value or template",
        }
    }

    fn accepts(self, definition: &Definition) -> bool {
        match definition {
            Definition::Constant(_) => true,
            Definition::ModulePar(_) | Definition::Variable(_) => self != ExpectedKind::Constant,
            Definition::Template(_) => self == ExpectedKind::Template,
            Definition::Type(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValueCheckOptions {
    pub expected: ExpectedKind,
    /// Missing fields and `-` are accepted, and record field order is free.
    pub incomplete_allowed: bool,
    pub omit_allowed: bool,
    /// Missing optional fields are completed with `omit`.
    pub implicit_omit: bool,
    /// The value is a single element of a string.
    pub string_element: bool,
}

impl<'a> TypeChecker<'a> {
    /// Checks `value` against `governing`. `lhs` names the definition being
    /// checked; a reference back to it is not an error here but is returned
    /// as `true` so the caller can decide.
    pub fn check_value(
        &mut self,
        governing: TypeId,
        value: &mut Value,
        lhs: Option<&Identifier>,
        options: ValueCheckOptions,
    ) -> bool {
        if value.last_checked.map_or(false, |s| s >= self.stamp) {
            trace!(location = %value.location, "value already checked in this pass");
            return false;
        }
        value.last_checked = Some(self.stamp);

        let before = self.sink.errors();
        let self_reference = self.check_value_body(governing, value, lhs, options);
        value.erroneous = self.sink.errors() > before;
        self_reference
    }

    fn check_value_body(
        &mut self,
        governing: TypeId,
        value: &mut Value,
        lhs: Option<&Identifier>,
        options: ValueCheckOptions,
    ) -> bool {
        let graph = self.graph;
        let last = self.last_type(governing);
        if graph.is_erroneous(last) {
            return false;
        }
        let location = value.location;

        match &value.kind {
            ValueKind::Omit => {
                if !options.omit_allowed {
                    self.sink.report(Diagnostic::error(
                        Category::InvalidOmit,
                        location,
                        "`omit' value is not allowed in this context",
                    ));
                }
                return false;
            }
            ValueKind::NotUsed => {
                if !options.incomplete_allowed {
                    self.sink.report(Diagnostic::error(
                        Category::NotUsed,
                        location,
                        "Not used symbol (`-') is not allowed in this context",
                    ));
                }
                return false;
            }
            ValueKind::Reference(name) => {
                let name = name.clone();
                return self.check_reference(governing, &name, location, lhs, options.expected);
            }
            _ => {}
        }

        let length = graph.effective_length_constraint(governing);
        match graph.kind(last) {
            TypeKind::Sequence(fields) => self.check_record_value(last, fields, value, lhs, options, true),
            TypeKind::Set(fields) => self.check_record_value(last, fields, value, lhs, options, false),
            TypeKind::Choice(fields) | TypeKind::Anytype(fields) => {
                self.check_union_value(last, fields, value, lhs, options)
            }
            TypeKind::SequenceOf(element) | TypeKind::SetOf(element) => {
                self.check_list_value(last, *element, None, length, value, lhs, options)
            }
            TypeKind::Array { element, size } => {
                self.check_list_value(last, *element, Some(*size), length, value, lhs, options)
            }
            TypeKind::Enumerated(_) => {
                self.sink.report(Diagnostic::error(
                    Category::TypeMismatch,
                    location,
                    format!("Enumerated value was expected for type `{}'", graph.type_name(last)),
                ));
                false
            }
            TypeKind::Primitive(kind) => {
                match &value.kind {
                    ValueKind::Specific(literal) => {
                        self.check_literal(*kind, literal, length, options.string_element, location)
                    }
                    _ => self.sink.report(Diagnostic::error(
                        Category::TypeMismatch,
                        location,
                        format!("{} value was expected", kind.name()),
                    )),
                }
                false
            }
            TypeKind::Procedure { kind, .. } => {
                self.sink.report(Diagnostic::error(
                    Category::TypeMismatch,
                    location,
                    format!("Reference to a {} was expected", kind.name()),
                ));
                false
            }
            TypeKind::Reference(_) => {
                // `last_type` never stops on a healthy reference.
                self.sink.report(Diagnostic::internal(
                    location,
                    format!("unresolved type reference `{}' in value check", graph.type_name(last)),
                ));
                false
            }
        }
    }

    /// A bare identifier in a value or template: an enumeration item, or a
    /// definition whose type has to be compatible with `governing`.
    pub(crate) fn check_reference(
        &mut self,
        governing: TypeId,
        name: &Identifier,
        location: Location,
        lhs: Option<&Identifier>,
        expected: ExpectedKind,
    ) -> bool {
        let graph = self.graph;
        let last = self.last_type(governing);
        let enumerated = match graph.kind(last) {
            TypeKind::Enumerated(items) => {
                if items.iter().any(|item| &item.name == name) {
                    return false;
                }
                true
            }
            _ => false,
        };
        if lhs == Some(name) {
            return true;
        }

        let Some(definition) = graph.resolve(name) else {
            let message = if enumerated {
                format!("Enumerated value was expected: `{}' is not an item of type `{}'", name, graph.type_name(last))
            } else {
                format!("There is no definition named `{}'", name)
            };
            self.sink.report(Diagnostic::error(Category::BadReference, location, message));
            return false;
        };
        if !expected.accepts(definition) {
            self.sink.report(Diagnostic::error(
                Category::BadReference,
                location,
                format!(
                    "Reference to a {} was expected instead of {} `{}'",
                    expected.describe(),
                    definition.describe(),
                    name
                ),
            ));
            return false;
        }

        let self_reference = match definition {
            Definition::Constant(constant) => self.check_referenced_constant(name, constant),
            Definition::Template(_) => self.check_template_definition(name),
            _ => false,
        };
        if let Some(source) = definition.governing() {
            self.check_reference_compatibility(source, governing, location);
        }
        self_reference
    }

    /// Data types are compared structurally and a needed conversion is
    /// recorded; procedure types must be identical.
    fn check_reference_compatibility(&mut self, source: TypeId, target: TypeId, location: Location) {
        let graph = self.graph;
        let from = self.last_type(source);
        let to = self.last_type(target);

        if graph.kind(from).is_procedure() || graph.kind(to).is_procedure() {
            if !self.is_compatible(source, target, None) {
                self.sink.report(Diagnostic::error(
                    Category::TypeMismatch,
                    location,
                    format!(
                        "Type mismatch: a value of type `{}' was expected instead of `{}'",
                        graph.type_name(to),
                        graph.type_name(from)
                    ),
                ));
            }
            return;
        }

        let mut info = CompatibilityInfo::new();
        if self.is_compatible(source, target, Some(&mut info)) {
            // Primitives of the same kind share their runtime representation.
            if info.needs_conversion && !matches!(graph.kind(from), TypeKind::Primitive(_)) {
                graph.register_conversion(from, to);
            }
            return;
        }
        let mut message = format!(
            "Type mismatch: a value of type `{}' was expected instead of `{}'",
            graph.type_name(to),
            graph.type_name(from)
        );
        if let Some(reason) = info.error {
            message.push_str(&format!(
                ": `{}{}' and `{}{}' are not compatible: {}",
                graph.type_name(from),
                info.left_path,
                graph.type_name(to),
                info.right_path,
                reason
            ));
        }
        self.sink.report(Diagnostic::error(Category::TypeMismatch, location, message));
    }

    fn check_record_value(
        &mut self,
        record: TypeId,
        fields: &'a [Field],
        value: &mut Value,
        lhs: Option<&Identifier>,
        options: ValueCheckOptions,
        ordered: bool,
    ) -> bool {
        let graph = self.graph;
        let location = value.location;

        if let ValueKind::PositionalList(items) = &mut value.kind {
            if !ordered {
                self.sink.report(Diagnostic::error(
                    Category::TypeMismatch,
                    location,
                    format!("Value list notation cannot be used for set type `{}'", graph.type_name(record)),
                ));
                return false;
            }
            if items.len() > fields.len() {
                self.sink.report(Diagnostic::error(
                    Category::ElementCount,
                    location,
                    format!(
                        "Too many elements in value list notation for type `{}': {} was expected instead of {}",
                        graph.type_name(record),
                        fields.len(),
                        items.len()
                    ),
                ));
            }
            let named = std::mem::take(items)
                .into_iter()
                .zip(fields)
                .map(|(item, field)| NamedValue::new(field.name.as_str(), item))
                .collect();
            value.kind = ValueKind::NamedList(named);
        }

        let ValueKind::NamedList(entries) = &mut value.kind else {
            self.sink.report(Diagnostic::error(
                Category::TypeMismatch,
                location,
                format!("{} value was expected for type `{}'", graph.kind(record).keyword(), graph.type_name(record)),
            ));
            return false;
        };

        let scan = self.scan_named_entries(
            record,
            fields,
            entries.iter().map(|e| (&e.name, e.location)),
            ordered && !options.incomplete_allowed,
            "value",
        );

        let mut self_reference = false;
        for (entry, matched) in entries.iter_mut().zip(&scan.matched) {
            let Some(index) = matched else {
                continue;
            };
            let field = &fields[*index];
            let sub = ValueCheckOptions { omit_allowed: field.optional, string_element: false, ..options };
            self_reference |= self.check_value(field.ty, &mut entry.value, lhs, sub);
        }

        for (index, field) in fields.iter().enumerate() {
            if scan.present[index] {
                continue;
            }
            if options.implicit_omit && field.optional {
                trace!(field = %field.name, "implicit omit");
                let mut omit = Value::omit().at(location);
                omit.last_checked = Some(self.stamp);
                let mut entry = NamedValue::new(field.name.as_str(), omit);
                entry.implicit = true;
                let slot = declaration_slot(fields, entries.iter().map(|e| &e.name), index);
                entries.insert(slot, entry);
            } else if !options.incomplete_allowed {
                self.sink.report(Diagnostic::error(
                    Category::MissingField,
                    location,
                    format!(
                        "Field `{}' is missing from {} value of type `{}'",
                        field.name,
                        graph.kind(record).keyword(),
                        graph.type_name(record)
                    ),
                ));
            }
        }
        self_reference
    }

    fn check_union_value(
        &mut self,
        union: TypeId,
        fields: &'a [Field],
        value: &mut Value,
        lhs: Option<&Identifier>,
        options: ValueCheckOptions,
    ) -> bool {
        let graph = self.graph;
        let location = value.location;
        let keyword = graph.kind(union).keyword();

        let ValueKind::NamedList(entries) = &mut value.kind else {
            self.sink.report(Diagnostic::error(
                Category::TypeMismatch,
                location,
                format!("{} value was expected for type `{}'", keyword, graph.type_name(union)),
            ));
            return false;
        };
        if entries.len() != 1 {
            let message = if entries.is_empty() {
                format!("Value of {} type `{}' must have one active field", keyword, graph.type_name(union))
            } else {
                format!("Only one field was expected in {} value instead of {}", keyword, entries.len())
            };
            self.sink.report(Diagnostic::error(Category::UnionArity, location, message));
            return false;
        }

        let entry = &mut entries[0];
        let Some(field) = fields.iter().find(|f| f.name == entry.name) else {
            self.sink.report(Diagnostic::error(
                Category::UnknownField,
                entry.location,
                format!(
                    "Reference to non-existent field `{}' in {} value for type `{}'",
                    entry.name,
                    keyword,
                    graph.type_name(union)
                ),
            ));
            return false;
        };
        let sub = ValueCheckOptions { omit_allowed: false, string_element: false, ..options };
        self.check_value(field.ty, &mut entry.value, lhs, sub)
    }

    #[allow(clippy::too_many_arguments)]
    fn check_list_value(
        &mut self,
        list: TypeId,
        element: TypeId,
        size: Option<u64>,
        length: Option<LengthRange>,
        value: &mut Value,
        lhs: Option<&Identifier>,
        options: ValueCheckOptions,
    ) -> bool {
        let graph = self.graph;
        let location = value.location;

        // `{}` is parsed as an empty assignment list.
        if matches!(&value.kind, ValueKind::NamedList(entries) if entries.is_empty()) {
            value.kind = ValueKind::PositionalList(Vec::new());
        }

        let sub = ValueCheckOptions { omit_allowed: false, string_element: false, ..options };
        let mut self_reference = false;
        match &mut value.kind {
            ValueKind::PositionalList(items) => {
                let count = items.len() as u64;
                match size {
                    Some(size) => self.check_array_count(list, size, count, options.incomplete_allowed, location),
                    None => self.check_element_count(list, count, length, location),
                }
                for item in items.iter_mut() {
                    self_reference |= self.check_value(element, item, lhs, sub);
                }
            }
            ValueKind::IndexedList(entries) => {
                let indices: Vec<(i64, Location)> = entries.iter().map(|e| (e.index, e.location)).collect();
                self.check_indices(
                    list,
                    size,
                    &indices,
                    options.expected == ExpectedKind::Constant,
                    location,
                );
                for entry in entries.iter_mut() {
                    self_reference |= self.check_value(element, &mut entry.value, lhs, sub);
                }
            }
            _ => {
                self.sink.report(Diagnostic::error(
                    Category::TypeMismatch,
                    location,
                    format!(
                        "{} value was expected for type `{}'",
                        graph.kind(list).keyword(),
                        graph.type_name(list)
                    ),
                ));
            }
        }
        self_reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EnumItem, PrimitiveKind, SubtypeConstraint, TypeGraph};
    use crate::type_system::Diagnostics;
    use rstest::rstest;

    fn record_xy(g: &mut TypeGraph) -> TypeId {
        let int = g.primitive(PrimitiveKind::Integer);
        let rec = g.sequence(vec![Field::mandatory("x", int), Field::optional("y", int)]);
        g.define_type("R", rec).unwrap()
    }

    fn check(g: &TypeGraph, ty: TypeId, value: &mut Value, options: ValueCheckOptions) -> Diagnostics {
        let mut diags = Diagnostics::new();
        TypeChecker::new(g, &mut diags).check_value(ty, value, None, options);
        diags
    }

    fn constant() -> ValueCheckOptions {
        ValueCheckOptions::default()
    }

    fn dynamic() -> ValueCheckOptions {
        ValueCheckOptions { expected: ExpectedKind::Dynamic, ..Default::default() }
    }

    #[test]
    fn test_duplicate_field_reports_first_occurrence() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let rec = g.sequence(vec![Field::mandatory("x", int)]);
        let mut value = Value::named_list(vec![
            NamedValue::new("x", Value::integer(1)).at(Location::new(3, 2)),
            NamedValue::new("x", Value::integer(2)).at(Location::new(3, 10)),
        ]);

        let diags = check(&g, rec, &mut value, constant());
        let dup: Vec<_> = diags.of(Category::DuplicateField).collect();
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].location, Location::new(3, 10));
        assert_eq!(dup[0].related, Some(Location::new(3, 2)));
        assert_eq!(diags.errors().count(), 1);
        assert!(value.is_erroneous());
    }

    #[test]
    fn test_unknown_field_and_wrong_order() {
        let mut g = TypeGraph::new();
        let rec = record_xy(&mut g);
        let mut value = Value::named([("y", Value::omit()), ("x", Value::integer(1)), ("z", Value::integer(0))]);

        let diags = check(&g, rec, &mut value, constant());
        assert_eq!(diags.count(Category::FieldOrder), 1);
        assert_eq!(diags.count(Category::UnknownField), 1);
        assert_eq!(diags.count(Category::MissingField), 0);
    }

    #[test]
    fn test_missing_fields_and_implicit_omit() {
        let mut g = TypeGraph::new();
        let rec = record_xy(&mut g);

        let mut strict = Value::named([("x", Value::integer(1))]);
        let diags = check(&g, rec, &mut strict, constant());
        assert_eq!(diags.count(Category::MissingField), 1);

        let mut missing_mandatory = Value::named([("y", Value::omit())]);
        let options = ValueCheckOptions { implicit_omit: true, ..constant() };
        let diags = check(&g, rec, &mut missing_mandatory, options);
        assert_eq!(diags.count(Category::MissingField), 1);
    }

    #[test]
    fn test_implicit_omit_is_idempotent() {
        let mut g = TypeGraph::new();
        let rec = record_xy(&mut g);
        let mut value = Value::named([("x", Value::integer(1))]);
        let options = ValueCheckOptions { implicit_omit: true, ..constant() };

        for _ in 0..3 {
            let diags = check(&g, rec, &mut value, options);
            assert!(diags.is_empty());
        }
        let omitted: Vec<_> = value.named_entries().iter().filter(|e| e.name.as_str() == "y").collect();
        assert_eq!(omitted.len(), 1);
        assert!(omitted[0].implicit);
        assert_eq!(omitted[0].value.kind, ValueKind::Omit);
    }

    #[test]
    fn test_implicit_omit_in_the_middle_keeps_field_order() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let rec = g.sequence(vec![
            Field::mandatory("x", int),
            Field::optional("y", int),
            Field::mandatory("z", int),
        ]);
        let mut value = Value::named([("x", Value::integer(1)), ("z", Value::integer(2))]);
        let options = ValueCheckOptions { implicit_omit: true, ..constant() };

        for _ in 0..2 {
            let diags = check(&g, rec, &mut value, options);
            assert!(diags.is_empty(), "{:?}", diags.all());
        }
        let names: Vec<_> = value.named_entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["x", "y", "z"]);
    }

    #[test]
    fn test_positional_record_is_rewritten_to_named() {
        let mut g = TypeGraph::new();
        let rec = record_xy(&mut g);
        let mut value = Value::positional(vec![Value::integer(1), Value::omit()]);

        let diags = check(&g, rec, &mut value, constant());
        assert!(diags.is_empty());
        assert!(matches!(value.kind, ValueKind::NamedList(_)));
        assert!(value.entry("y").is_some());
    }

    #[test]
    fn test_set_rejects_value_list_notation() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let set = g.set(vec![Field::mandatory("a", int)]);
        let mut value = Value::positional(vec![Value::integer(1)]);

        let diags = check(&g, set, &mut value, constant());
        assert!(diags.all()[0].message.contains("Value list notation"));
    }

    #[test]
    fn test_omit_only_for_optional_fields() {
        let mut g = TypeGraph::new();
        let rec = record_xy(&mut g);
        let mut value = Value::named([("x", Value::omit()), ("y", Value::omit())]);

        let diags = check(&g, rec, &mut value, constant());
        assert_eq!(diags.count(Category::InvalidOmit), 1);
    }

    #[rstest]
    #[case(0)]
    #[case(2)]
    fn test_union_needs_exactly_one_alternative(#[case] count: usize) {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let u = g.choice(vec![Field::mandatory("a", int), Field::mandatory("b", int)]);
        let entries = [("a", Value::integer(1)), ("b", Value::integer(2))];
        let mut value = Value::named(entries.into_iter().take(count));

        let diags = check(&g, u, &mut value, constant());
        assert_eq!(diags.count(Category::UnionArity), 1);
    }

    #[test]
    fn test_union_alternative_is_checked() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let u = g.choice(vec![Field::mandatory("a", int)]);
        let mut good = Value::named([("a", Value::integer(1))]);
        let mut bad = Value::named([("a", Value::boolean(true))]);

        assert!(check(&g, u, &mut good, constant()).is_empty());
        assert_eq!(check(&g, u, &mut bad, constant()).count(Category::TypeMismatch), 1);
    }

    #[test]
    fn test_index_hole_only_for_constants() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let list = g.set_of(int);

        let mut constant_value = Value::indexed([(0, Value::integer(1)), (2, Value::integer(3))]);
        assert_eq!(check(&g, list, &mut constant_value, constant()).count(Category::IndexHole), 1);

        let mut dynamic_value = Value::indexed([(0, Value::integer(1)), (2, Value::integer(3))]);
        assert!(check(&g, list, &mut dynamic_value, dynamic()).is_empty());
    }

    #[rstest]
    #[case(-1, "non-negative")]
    #[case(1 << 31, "too big")]
    fn test_bad_indices(#[case] index: i64, #[case] fragment: &str) {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let list = g.sequence_of(int);
        let mut value = Value::indexed([(index, Value::integer(1))]);

        let diags = check(&g, list, &mut value, dynamic());
        assert_eq!(diags.count(Category::BadIndex), 1);
        assert!(diags.all()[0].message.contains(fragment));
    }

    #[test]
    fn test_duplicate_index_names_both_components() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let list = g.sequence_of(int);
        let mut value = Value::indexed([(1, Value::integer(1)), (1, Value::integer(2))]);

        let diags = check(&g, list, &mut value, dynamic());
        let dup: Vec<_> = diags.of(Category::DuplicateIndex).collect();
        assert_eq!(dup.len(), 1);
        assert!(dup[0].message.contains("components 1 and 2"));
    }

    #[test]
    fn test_array_and_length_counts() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let arr = g.array(int, 2);
        let list = g.sequence_of(int);
        g.set_constraint(list, SubtypeConstraint::length(LengthRange::at_least(2))).unwrap();

        let mut short = Value::positional(vec![Value::integer(1)]);
        assert_eq!(check(&g, arr, &mut short, constant()).count(Category::ElementCount), 1);
        let mut overflow = Value::indexed([(2, Value::integer(1))]);
        assert_eq!(check(&g, arr, &mut overflow, dynamic()).count(Category::BadIndex), 1);
        let mut too_few = Value::positional(vec![Value::integer(1)]);
        assert_eq!(check(&g, list, &mut too_few, constant()).count(Category::ElementCount), 1);
        let mut empty = Value::named_list(Vec::new());
        assert_eq!(check(&g, arr, &mut empty, constant()).count(Category::ElementCount), 1);
        assert!(matches!(empty.kind, ValueKind::PositionalList(_)));
    }

    #[test]
    fn test_enumerated_values() {
        let mut g = TypeGraph::new();
        let e = g.enumerated(vec![EnumItem::new("red"), EnumItem::new("blue")]);
        g.define_type("Color", e).unwrap();

        let mut good = Value::reference("red");
        assert!(check(&g, e, &mut good, constant()).is_empty());
        let mut unknown = Value::reference("green");
        assert!(check(&g, e, &mut unknown, constant()).all()[0].message.contains("Enumerated value was expected"));
        let mut literal = Value::integer(0);
        assert_eq!(check(&g, e, &mut literal, constant()).count(Category::TypeMismatch), 1);
    }

    #[test]
    fn test_references_follow_context_and_register_conversions() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let left = g.sequence(vec![Field::mandatory("a", int)]);
        g.define_type("L", left).unwrap();
        let right = g.sequence(vec![Field::mandatory("b", int)]);
        g.define_type("Rt", right).unwrap();
        g.define_constant("c", left, Value::named([("a", Value::integer(1))])).unwrap();
        g.define_variable("v", left).unwrap();

        let mut by_constant = Value::reference("c");
        assert!(check(&g, right, &mut by_constant, constant()).is_empty());
        assert!(g.has_conversion(left, right));

        let mut by_variable = Value::reference("v");
        let diags = check(&g, right, &mut by_variable, constant());
        assert_eq!(diags.count(Category::BadReference), 1);
        let mut by_variable = Value::reference("v");
        assert!(check(&g, right, &mut by_variable, dynamic()).is_empty());

        let mut by_type = Value::reference("L");
        assert!(check(&g, right, &mut by_type, dynamic()).all()[0].message.contains("instead of type `L'"));
    }

    #[test]
    fn test_primitive_aliases_need_no_conversion() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let other_int = g.primitive(PrimitiveKind::Integer);
        g.define_constant("n", int, Value::integer(7)).unwrap();

        let mut value = Value::reference("n");
        assert!(check(&g, other_int, &mut value, constant()).is_empty());
        assert!(!g.has_conversion(int, other_int));
        assert!(g.conversions().is_empty());
    }

    #[test]
    fn test_incompatible_reference_explains_path() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let text = g.primitive(PrimitiveKind::Charstring);
        let left = g.sequence(vec![Field::mandatory("a", text)]);
        g.define_type("L", left).unwrap();
        let right = g.sequence(vec![Field::mandatory("b", int)]);
        g.define_type("Rt", right).unwrap();
        g.define_constant("c", left, Value::named([("a", Value::charstring("x"))])).unwrap();

        let mut value = Value::reference("c");
        let diags = check(&g, right, &mut value, constant());
        assert_eq!(diags.count(Category::TypeMismatch), 1);
        assert!(diags.all()[0].message.contains("`L.a' and `Rt.b'"));
    }

    #[test]
    fn test_value_is_not_rechecked_within_a_pass() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let mut value = Value::boolean(true);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let options = ValueCheckOptions::default();
        checker.check_value(int, &mut value, None, options);
        checker.check_value(int, &mut value, None, options);
        assert_eq!(checker.error_count(), 1);
        assert_eq!(value.last_checked(), Some(checker.stamp()));
    }
}
