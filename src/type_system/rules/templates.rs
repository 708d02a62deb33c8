//! Template conformance: templates against their governing type.
//!
//! Templates follow the value rules with three differences: matching
//! mechanisms are allowed, indexed lists may have holes, and a modified
//! template may leave out fields its base template already provides.
use super::super::checker::TypeChecker;
use super::super::error::{Category, Diagnostic, DiagnosticSink};
use super::fields::declaration_slot;
use super::values::ExpectedKind;
use crate::graph::{Definition, Field, Identifier, LengthRange, Location, TypeId, TypeKind};
use crate::tree::{Completeness, NamedTemplate, Template, TemplateKind, TemplateState};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy)]
struct TemplateContext<'b> {
    is_modified: bool,
    implicit_omit: bool,
    omit_allowed: bool,
    mandatory_field: bool,
    /// The part of the base template at the same position, if any.
    base: Option<&'b Template>,
}

impl<'b> TemplateContext<'b> {
    fn field(self, field: &Field, base: Option<&'b Template>) -> Self {
        Self { omit_allowed: field.optional, mandatory_field: !field.optional, base, ..self }
    }

    fn element(self, base: Option<&'b Template>) -> Self {
        Self { omit_allowed: false, mandatory_field: false, base, ..self }
    }
}

impl<'a> TypeChecker<'a> {
    /// Checks a template against `governing`. If the template names a base
    /// template, the base is checked and resolved first.
    pub fn check_template(
        &mut self,
        governing: TypeId,
        template: &mut Template,
        is_modified: bool,
        implicit_omit: bool,
        lhs: Option<&Identifier>,
    ) -> bool {
        if template.state.checked_at().map_or(false, |s| s >= self.stamp) {
            return false;
        }
        let base = match template.base.clone() {
            Some(name) => self.resolve_base_template(governing, &name, template.location),
            None => None,
        };
        self.check_template_with_base(governing, template, is_modified, implicit_omit, lhs, base.as_ref())
    }

    /// Checks the body of the template definition `name` once per pass.
    /// Returns `true` when the template depends on itself through references.
    pub fn check_template_definition(&mut self, name: &Identifier) -> bool {
        let graph = self.graph;
        let Some(Definition::Template(definition)) = graph.resolve(name) else {
            self.sink.report(Diagnostic::internal(
                Location::default(),
                format!("`{}' is not a template definition", name),
            ));
            return false;
        };

        if self.modifies_chain.contains(name) {
            let chain: Vec<String> = self
                .modifies_chain
                .iter()
                .skip_while(|n| *n != name)
                .chain(std::iter::once(name))
                .map(Identifier::to_string)
                .collect();
            debug!(chain = %chain.join(" -> "), "circular modifies chain");
            self.sink.report(Diagnostic::error(
                Category::CircularReference,
                definition.location,
                format!("Circular modifies chain: {}", chain.join(" -> ")),
            ));
            return false;
        }

        let Ok(mut body) = definition.body.try_borrow_mut() else {
            return true;
        };
        if body.state.checked_at().map_or(false, |s| s >= self.stamp) {
            return false;
        }

        self.modifies_chain.push(name.clone());
        let base = match body.base.clone() {
            Some(base_name) => self.resolve_base_template(definition.governing, &base_name, body.location),
            None => None,
        };
        self.modifies_chain.pop();

        let is_modified = body.is_modified;
        self.check_template_with_base(
            definition.governing,
            &mut body,
            is_modified,
            definition.implicit_omit,
            Some(name),
            base.as_ref(),
        )
    }

    fn check_template_with_base(
        &mut self,
        governing: TypeId,
        template: &mut Template,
        is_modified: bool,
        implicit_omit: bool,
        lhs: Option<&Identifier>,
        base: Option<&Template>,
    ) -> bool {
        let context = TemplateContext {
            is_modified,
            implicit_omit: implicit_omit && !is_modified,
            omit_allowed: false,
            mandatory_field: false,
            base,
        };
        self.check_template_node(governing, template, lhs, context)
    }

    /// Checks the base definition and returns a copy of the template it
    /// finally stands for, with inherited fields filled in.
    fn resolve_base_template(&mut self, governing: TypeId, base_name: &Identifier, location: Location) -> Option<Template> {
        let graph = self.graph;
        match graph.resolve(base_name) {
            Some(Definition::Template(base)) => {
                self.check_template_definition(base_name);
                let mine = self.last_type(governing);
                let theirs = self.last_type(base.governing);
                if mine != theirs && !graph.is_erroneous(mine) && !graph.is_erroneous(theirs) {
                    self.sink.report(Diagnostic::error(
                        Category::TypeMismatch,
                        location,
                        format!(
                            "The modified template has different type than base template `{}': `{}' was expected instead of `{}'",
                            base_name,
                            graph.type_name(theirs),
                            graph.type_name(mine)
                        ),
                    ));
                    return None;
                }
                self.last_template(base_name, &mut Vec::new())
            }
            Some(other) => {
                self.sink.report(Diagnostic::error(
                    Category::BadReference,
                    location,
                    format!(
                        "Reference to a template was expected in the `modifies' definition instead of {} `{}'",
                        other.describe(),
                        base_name
                    ),
                ));
                None
            }
            None => {
                self.sink.report(Diagnostic::error(
                    Category::BadReference,
                    location,
                    format!("There is no template named `{}'", base_name),
                ));
                None
            }
        }
    }

    fn last_template(&self, name: &Identifier, visited: &mut Vec<Identifier>) -> Option<Template> {
        if visited.contains(name) {
            return None;
        }
        visited.push(name.clone());

        let graph = self.graph;
        let Some(Definition::Template(definition)) = graph.resolve(name) else {
            return None;
        };
        // Fails while the definition is being checked further up the stack.
        let mut template = definition.body.try_borrow().ok()?.clone();

        if let TemplateKind::Reference(next) = &template.kind {
            if matches!(graph.resolve(next), Some(Definition::Template(_))) {
                let next = next.clone();
                return self.last_template(&next, visited);
            }
        }
        if let Some(grand) = template.base.clone() {
            if let (Some(inherited), TemplateKind::NamedList(entries)) =
                (self.last_template(&grand, visited), &mut template.kind)
            {
                for entry in inherited.named_entries() {
                    if !entries.iter().any(|e| e.name == entry.name) {
                        entries.push(entry.clone());
                    }
                }
            }
        }
        Some(template)
    }

    fn check_template_node(
        &mut self,
        governing: TypeId,
        template: &mut Template,
        lhs: Option<&Identifier>,
        context: TemplateContext<'_>,
    ) -> bool {
        if template.state.checked_at().map_or(false, |s| s >= self.stamp) {
            trace!(location = %template.location, "template already checked in this pass");
            return false;
        }
        let before = self.sink.errors();
        let self_reference = self.check_template_body(governing, template, lhs, context);
        template.state = if self.sink.errors() > before {
            TemplateState::Erroneous(self.stamp)
        } else {
            TemplateState::Valid(self.stamp)
        };
        self_reference
    }

    fn check_template_body(
        &mut self,
        governing: TypeId,
        template: &mut Template,
        lhs: Option<&Identifier>,
        context: TemplateContext<'_>,
    ) -> bool {
        let graph = self.graph;
        let last = self.last_type(governing);
        if graph.is_erroneous(last) {
            return false;
        }
        if let Some(range) = template.length {
            self.check_template_length(governing, last, range, template.location);
        }

        if !matches!(
            template.kind,
            TemplateKind::NamedList(_) | TemplateKind::PositionalList(_) | TemplateKind::IndexedList(_)
        ) {
            return self.check_matching_mechanism(governing, last, template, lhs, context);
        }

        let length = graph.effective_length_constraint(governing);
        match graph.kind(last) {
            TypeKind::Sequence(fields) => self.check_record_template(last, fields, template, lhs, context, true),
            TypeKind::Set(fields) => self.check_record_template(last, fields, template, lhs, context, false),
            TypeKind::Choice(fields) | TypeKind::Anytype(fields) => {
                self.check_union_template(last, fields, template, lhs, context)
            }
            TypeKind::SequenceOf(element) | TypeKind::SetOf(element) => {
                self.check_list_template(last, *element, None, length, template, lhs, context)
            }
            TypeKind::Array { element, size } => {
                self.check_list_template(last, *element, Some(*size), length, template, lhs, context)
            }
            _ => {
                self.sink.report(Diagnostic::error(
                    Category::TypeMismatch,
                    template.location,
                    format!("{} cannot be used for type `{}'", template.kind.describe(), graph.type_name(last)),
                ));
                false
            }
        }
    }

    fn check_template_length(&mut self, governing: TypeId, last: TypeId, range: LengthRange, location: Location) {
        let graph = self.graph;
        let kind = graph.kind(last);
        if !kind.is_length_restrictable() {
            self.sink.report(Diagnostic::error(
                Category::LengthRestriction,
                location,
                format!("Length restriction cannot be used in a template of type `{}'", graph.type_name(last)),
            ));
            return;
        }
        if !range.is_valid() {
            self.sink.report(Diagnostic::error(
                Category::LengthRestriction,
                location,
                format!(
                    "The upper boundary of the length restriction cannot be smaller than the lower boundary: {}",
                    range
                ),
            ));
            return;
        }
        if let TypeKind::Array { size, .. } = kind {
            if !range.contains(*size) {
                self.sink.report(Diagnostic::error(
                    Category::LengthRestriction,
                    location,
                    format!("The {} restriction contradicts the array size {}", range, size),
                ));
            }
        } else if let Some(declared) = graph.effective_length_constraint(governing) {
            if !declared.intersects(&range) {
                self.sink.report(Diagnostic::error(
                    Category::LengthRestriction,
                    location,
                    format!(
                        "The {} restriction is outside of the subtype restriction {} of type `{}'",
                        range,
                        declared,
                        graph.type_name(governing)
                    ),
                ));
            }
        }
    }

    fn check_matching_mechanism(
        &mut self,
        governing: TypeId,
        last: TypeId,
        template: &mut Template,
        lhs: Option<&Identifier>,
        context: TemplateContext<'_>,
    ) -> bool {
        let graph = self.graph;
        let location = template.location;
        let mechanism = template.kind.describe();

        match &mut template.kind {
            TemplateKind::Omit => {
                if !context.omit_allowed {
                    self.sink.report(Diagnostic::error(
                        Category::InvalidOmit,
                        location,
                        "`omit' is not allowed in this context",
                    ));
                }
                false
            }
            TemplateKind::AnyOrOmit => {
                if context.mandatory_field && self.config.warn_any_or_omit_in_mandatory_field {
                    self.sink.report(Diagnostic::warning(
                        Category::MatchingMechanism,
                        location,
                        "Using `*' for mandatory field",
                    ));
                }
                false
            }
            TemplateKind::AnyValue => false,
            TemplateKind::NotUsed => {
                if !context.is_modified {
                    self.sink.report(Diagnostic::error(
                        Category::NotUsed,
                        location,
                        "Not used symbol (`-') is allowed only in modified templates",
                    ));
                }
                false
            }
            TemplateKind::Specific(literal) => {
                match graph.kind(last) {
                    TypeKind::Primitive(kind) => {
                        let length = graph.effective_length_constraint(governing);
                        self.check_literal(*kind, literal, length, false, location);
                    }
                    other => self.sink.report(Diagnostic::error(
                        Category::TypeMismatch,
                        location,
                        format!(
                            "{} value was expected for type `{}' instead of {}",
                            other.keyword(),
                            graph.type_name(last),
                            literal.describe()
                        ),
                    )),
                }
                false
            }
            TemplateKind::Reference(name) => {
                let name = name.clone();
                self.check_reference(governing, &name, location, lhs, ExpectedKind::Template)
            }
            TemplateKind::ValueList(items) | TemplateKind::ComplementedList(items) => {
                let sub = TemplateContext { mandatory_field: false, base: None, ..context };
                let mut self_reference = false;
                for item in items.iter_mut() {
                    self_reference |= self.check_template_node(governing, item, lhs, sub);
                }
                self_reference
            }
            TemplateKind::Subset(items) | TemplateKind::Superset(items) => {
                let TypeKind::SetOf(element) = graph.kind(last) else {
                    self.sink.report(Diagnostic::error(
                        Category::MatchingMechanism,
                        location,
                        format!("{} can be used only for set of types, not for `{}'", mechanism, graph.type_name(last)),
                    ));
                    return false;
                };
                let mut self_reference = false;
                for item in items.iter_mut() {
                    if matches!(item.kind, TemplateKind::AnyOrOmit) && self.config.warn_any_or_omit_in_subset {
                        self.sink.report(Diagnostic::warning(
                            Category::MatchingMechanism,
                            item.location,
                            format!("`*' inside {} has no discriminating effect", mechanism),
                        ));
                    }
                    self_reference |= self.check_template_node(*element, item, lhs, context.element(None));
                }
                self_reference
            }
            TemplateKind::Permutation(_) => {
                self.sink.report(Diagnostic::error(
                    Category::MatchingMechanism,
                    location,
                    "Permutation match can be used only inside a value list of a record of or array template",
                ));
                false
            }
            TemplateKind::NamedList(_) | TemplateKind::PositionalList(_) | TemplateKind::IndexedList(_) => {
                self.sink.report(Diagnostic::internal(location, format!("{} reached the mechanism check", mechanism)));
                false
            }
        }
    }

    fn check_record_template(
        &mut self,
        record: TypeId,
        fields: &'a [Field],
        template: &mut Template,
        lhs: Option<&Identifier>,
        context: TemplateContext<'_>,
        ordered: bool,
    ) -> bool {
        let graph = self.graph;
        let location = template.location;
        let keyword = graph.kind(record).keyword();

        let completeness = match (context.is_modified, context.base.map(|b| &b.kind)) {
            (false, _) | (true, None) => Completeness::MustComplete,
            (true, Some(TemplateKind::NamedList(_))) => Completeness::Partial,
            (true, Some(_)) => Completeness::MayIncomplete,
        };
        template.completeness = Some(completeness);
        template.state = TemplateState::Classified(completeness);

        if let TemplateKind::PositionalList(items) = &mut template.kind {
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
                .map(|(item, field)| NamedTemplate::new(field.name.as_str(), item))
                .collect();
            template.kind = TemplateKind::NamedList(named);
        }

        let TemplateKind::NamedList(entries) = &mut template.kind else {
            self.sink.report(Diagnostic::error(
                Category::TypeMismatch,
                location,
                format!("Indexed list notation cannot be used for {} type `{}'", keyword, graph.type_name(record)),
            ));
            return false;
        };

        let scan = self.scan_named_entries(
            record,
            fields,
            entries.iter().map(|e| (&e.name, e.location)),
            ordered && completeness != Completeness::MayIncomplete,
            "template",
        );

        let mut self_reference = false;
        for (entry, matched) in entries.iter_mut().zip(&scan.matched) {
            let Some(index) = matched else {
                continue;
            };
            let field = &fields[*index];
            let base = context.base.and_then(|b| b.entry(field.name.as_str())).map(|e| &e.template);
            self_reference |= self.check_template_node(field.ty, &mut entry.template, lhs, context.field(field, base));
        }

        for (index, field) in fields.iter().enumerate() {
            if scan.present[index] {
                continue;
            }
            let inherited = context.base.map_or(false, |b| b.entry(field.name.as_str()).is_some());
            match completeness {
                Completeness::MayIncomplete => continue,
                Completeness::Partial if inherited => continue,
                _ => {}
            }
            if context.implicit_omit && !context.is_modified && field.optional {
                trace!(field = %field.name, "implicit omit");
                let mut omit = Template::omit().at(location);
                omit.state = TemplateState::Valid(self.stamp);
                let mut entry = NamedTemplate::new(field.name.as_str(), omit);
                entry.implicit = true;
                let slot = declaration_slot(fields, entries.iter().map(|e| &e.name), index);
                entries.insert(slot, entry);
            } else {
                self.sink.report(Diagnostic::error(
                    Category::MissingField,
                    location,
                    format!(
                        "Field `{}' is missing from template for {} type `{}'",
                        field.name,
                        keyword,
                        graph.type_name(record)
                    ),
                ));
            }
        }
        self_reference
    }

    fn check_union_template(
        &mut self,
        union: TypeId,
        fields: &'a [Field],
        template: &mut Template,
        lhs: Option<&Identifier>,
        context: TemplateContext<'_>,
    ) -> bool {
        let graph = self.graph;
        let location = template.location;
        let keyword = graph.kind(union).keyword();
        let notation = template.kind.describe();

        let TemplateKind::NamedList(entries) = &mut template.kind else {
            self.sink.report(Diagnostic::error(
                Category::TypeMismatch,
                location,
                format!("{} cannot be used for {} type `{}'", notation, keyword, graph.type_name(union)),
            ));
            return false;
        };
        if entries.len() != 1 {
            self.sink.report(Diagnostic::error(
                Category::UnionArity,
                location,
                format!(
                    "A template for {} type `{}' must have exactly one active field instead of {}",
                    keyword,
                    graph.type_name(union),
                    entries.len()
                ),
            ));
            return false;
        }

        let entry = &mut entries[0];
        let Some(field) = fields.iter().find(|f| f.name == entry.name) else {
            self.sink.report(Diagnostic::error(
                Category::UnknownField,
                entry.location,
                format!(
                    "Reference to non-existent field `{}' in {} template for type `{}'",
                    entry.name,
                    keyword,
                    graph.type_name(union)
                ),
            ));
            return false;
        };
        let base = context.base.and_then(|b| b.entry(field.name.as_str())).map(|e| &e.template);
        self.check_template_node(field.ty, &mut entry.template, lhs, context.element(base))
    }

    #[allow(clippy::too_many_arguments)]
    fn check_list_template(
        &mut self,
        list: TypeId,
        element: TypeId,
        size: Option<u64>,
        length: Option<LengthRange>,
        template: &mut Template,
        lhs: Option<&Identifier>,
        context: TemplateContext<'_>,
    ) -> bool {
        let graph = self.graph;
        let location = template.location;

        if matches!(&template.kind, TemplateKind::NamedList(entries) if entries.is_empty()) {
            template.kind = TemplateKind::PositionalList(Vec::new());
        }

        let mut self_reference = false;
        match &mut template.kind {
            TemplateKind::PositionalList(items) => {
                if let Some(count) = definite_count(items) {
                    match size {
                        Some(size) => self.check_array_count(list, size, count, context.is_modified, location),
                        None => self.check_element_count(list, count, length, location),
                    }
                }
                for (i, item) in items.iter_mut().enumerate() {
                    let base = context.base.and_then(|b| match &b.kind {
                        TemplateKind::PositionalList(base_items) => base_items.get(i),
                        _ => None,
                    });
                    let sub = context.element(base);
                    self_reference |= if matches!(item.kind, TemplateKind::Permutation(_)) {
                        self.check_permutation(element, item, lhs, sub)
                    } else {
                        self.check_template_node(element, item, lhs, sub)
                    };
                }
            }
            TemplateKind::IndexedList(entries) => {
                let indices: Vec<(i64, Location)> = entries.iter().map(|e| (e.index, e.location)).collect();
                self.check_indices(list, size, &indices, false, location);
                for entry in entries.iter_mut() {
                    self_reference |= self.check_template_node(element, &mut entry.template, lhs, context.element(None));
                }
            }
            other => {
                self.sink.report(Diagnostic::error(
                    Category::TypeMismatch,
                    location,
                    format!(
                        "{} cannot be used for {} type `{}'",
                        other.describe(),
                        graph.kind(list).keyword(),
                        graph.type_name(list)
                    ),
                ));
            }
        }
        self_reference
    }

    fn check_permutation(
        &mut self,
        element: TypeId,
        item: &mut Template,
        lhs: Option<&Identifier>,
        context: TemplateContext<'_>,
    ) -> bool {
        if item.state.checked_at().map_or(false, |s| s >= self.stamp) {
            return false;
        }
        let before = self.sink.errors();
        let mut self_reference = false;
        if let TemplateKind::Permutation(inner) = &mut item.kind {
            for t in inner.iter_mut() {
                self_reference |= self.check_template_node(element, t, lhs, context.element(None));
            }
        }
        item.state = if self.sink.errors() > before {
            TemplateState::Erroneous(self.stamp)
        } else {
            TemplateState::Valid(self.stamp)
        };
        self_reference
    }
}

/// Number of elements a positional list template matches, unless `*` makes it open-ended.
fn definite_count(items: &[Template]) -> Option<u64> {
    let mut count = 0u64;
    for item in items {
        match &item.kind {
            TemplateKind::AnyOrOmit => return None,
            TemplateKind::Permutation(inner) => {
                if inner.iter().any(|t| matches!(t.kind, TemplateKind::AnyOrOmit)) {
                    return None;
                }
                count += inner.len() as u64;
            }
            _ => count += 1,
        }
    }
    Some(count)
}
