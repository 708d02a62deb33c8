//! The central checker: one instance is one checking pass over a graph.
use super::chain::Chain;
use super::error::{Category, Diagnostic, DiagnosticSink, Reporter};
use super::rules::values::{ExpectedKind, ValueCheckOptions};
use crate::config::CheckerConfig;
use crate::graph::{
    Definition, EnumItem, Field, Identifier, Location, Stamp, TypeGraph, TypeId, TypeKind,
    ValueDefinition,
};
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

/// Runs the type, value and template checks of one pass.
///
/// Every diagnostic goes to the caller's sink; nothing is returned early.
/// Results are memoized on the graph and on the checked trees with the
/// stamp of this pass, so asking twice for the same node is cheap.
pub struct TypeChecker<'a> {
    pub(super) graph: &'a TypeGraph,
    pub(super) config: CheckerConfig,
    pub(super) sink: Reporter<'a>,
    pub(super) stamp: Stamp,
    /// Template definitions whose `modifies` base is being resolved.
    pub(super) modifies_chain: Vec<Identifier>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(graph: &'a TypeGraph, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self::with_config(graph, sink, CheckerConfig::default())
    }

    pub fn with_config(graph: &'a TypeGraph, sink: &'a mut dyn DiagnosticSink, config: CheckerConfig) -> Self {
        Self {
            graph,
            config,
            sink: Reporter::new(sink),
            stamp: graph.begin_pass(),
            modifies_chain: Vec::new(),
        }
    }

    pub fn stamp(&self) -> Stamp { self.stamp }

    pub fn config(&self) -> &CheckerConfig { &self.config }

    /// Errors (including internal errors) reported by this checker so far.
    pub fn error_count(&self) -> usize { self.sink.errors() }

    /// Checks every type node, constant and template definition of the graph.
    /// Returns `true` when the pass reported no errors.
    pub fn check_all(&mut self) -> bool {
        let graph = self.graph;
        debug!(stamp = self.stamp.0, types = graph.type_count(), "check pass started");

        for id in graph.type_ids() {
            self.check_type(id);
        }

        for (name, definition) in graph.definitions() {
            match definition {
                Definition::Constant(constant) => self.check_constant(name, constant),
                Definition::Template(template) => {
                    if self.check_template_definition(name) {
                        self.sink.report(Diagnostic::error(
                            Category::CircularReference,
                            template.location,
                            format!("Circular reference: template `{}' refers to itself", name),
                        ));
                    }
                }
                Definition::Type(_) | Definition::ModulePar(_) | Definition::Variable(_) => {}
            }
        }

        debug!(stamp = self.stamp.0, errors = self.sink.errors(), "check pass finished");
        self.sink.errors() == 0
    }

    /// Checks `id` and returns the type at the end of its alias chain.
    pub fn last_type(&mut self, id: TypeId) -> TypeId {
        self.check_type(id);
        self.graph.dereference_last(id, &mut self.sink)
    }

    /// Checks one type node and everything reachable from it.
    ///
    /// The node is stamped before its children are visited, which is what
    /// stops the walk on recursive types.
    pub fn check_type(&mut self, id: TypeId) {
        let graph = self.graph;
        if graph.last_checked(id).map_or(false, |s| s >= self.stamp) {
            trace!(ty = id.0, "type already checked in this pass");
            return;
        }
        graph.set_checked(id, self.stamp);

        let before = self.sink.errors();
        let kind = graph.kind(id);
        match kind {
            TypeKind::Sequence(fields)
            | TypeKind::Set(fields)
            | TypeKind::Choice(fields)
            | TypeKind::Anytype(fields) => self.check_field_names(id, fields),
            TypeKind::Procedure { params, .. } => self.check_field_names(id, params),
            TypeKind::Array { size: 0, .. } => {
                self.sink.report(Diagnostic::error(
                    Category::General,
                    graph.location(id),
                    "A positive integer value was expected as array size instead of 0",
                ));
            }
            TypeKind::Enumerated(items) => self.check_enumeration(id, items),
            TypeKind::Reference(_) => {
                graph.dereference_last(id, &mut self.sink);
            }
            _ => {}
        }
        self.check_length_subtype(id);
        if self.sink.errors() > before {
            graph.mark_erroneous(id);
        }

        // Children report their own errors and keep their own flags.
        match kind {
            TypeKind::Reference(_) => {
                let last = graph.dereference_last(id, &mut self.sink);
                if last != id {
                    self.check_type(last);
                    if graph.is_erroneous(last) {
                        graph.mark_erroneous(id);
                    }
                }
            }
            other => {
                for child in other.children() {
                    self.check_type(child);
                }
            }
        }

        if matches!(kind, TypeKind::Sequence(_) | TypeKind::Set(_)) && !graph.is_erroneous(id) {
            self.check_recursion(id);
        }
    }

    fn check_field_names(&mut self, id: TypeId, fields: &[Field]) {
        let graph = self.graph;
        let mut first_seen: HashMap<&Identifier, Location> = HashMap::new();
        for field in fields {
            if let Some(first) = first_seen.get(&field.name) {
                self.sink.report(
                    Diagnostic::error(
                        Category::DuplicateField,
                        field.location,
                        format!(
                            "Duplicate field name `{}' in type `{}'",
                            field.name,
                            graph.type_name(id)
                        ),
                    )
                    .with_related(*first),
                );
            } else {
                first_seen.insert(&field.name, field.location);
            }
        }
    }

    /// Reports duplicate items and numbers the items without an explicit value.
    fn check_enumeration(&mut self, id: TypeId, items: &[EnumItem]) {
        let mut names: HashMap<&Identifier, Location> = HashMap::new();
        let mut used: BTreeSet<i64> = BTreeSet::new();

        for item in items {
            if let Some(first) = names.get(&item.name) {
                self.sink.report(
                    Diagnostic::error(
                        Category::DuplicateEnumeration,
                        item.location,
                        format!("Duplicate enumeration identifier `{}'", item.name),
                    )
                    .with_related(*first),
                );
            } else {
                names.insert(&item.name, item.location);
            }
            if let Some(value) = item.value {
                if !used.insert(value) {
                    self.sink.report(Diagnostic::error(
                        Category::DuplicateEnumeration,
                        item.location,
                        format!("Duplicate numeric value {} for enumeration `{}'", value, item.name),
                    ));
                }
            }
        }

        let mut next = 0i64;
        let values = items
            .iter()
            .map(|item| match item.value {
                Some(value) => value,
                None => {
                    while used.contains(&next) {
                        next += 1;
                    }
                    used.insert(next);
                    next
                }
            })
            .collect();
        self.graph.assign_enum_values(id, values);
    }

    fn check_length_subtype(&mut self, id: TypeId) {
        let graph = self.graph;
        let Some(range) = graph.length_constraint(id) else {
            return;
        };
        if !graph.kind(id).is_length_restrictable() {
            self.sink.report(Diagnostic::error(
                Category::LengthRestriction,
                graph.location(id),
                format!("Length subtyping is not allowed for type `{}'", graph.type_name(id)),
            ));
        } else if !range.is_valid() {
            self.sink.report(Diagnostic::error(
                Category::LengthRestriction,
                graph.location(id),
                format!(
                    "The upper boundary of the length restriction cannot be smaller than the lower boundary: {}",
                    range
                ),
            ));
        }
    }

    /// A record or set that contains itself through mandatory members can
    /// never have a finite value.
    fn check_recursion(&mut self, start: TypeId) {
        let mut chain = Chain::new();
        chain.add(start);
        let mut exhausted = HashSet::new();
        if self.reaches(start, start, &mut chain, &mut exhausted) {
            let graph = self.graph;
            self.sink.report(Diagnostic::error(
                Category::Recursion,
                graph.location(start),
                format!("Type `{}' is infinitely recursive", graph.type_name(start)),
            ));
            graph.mark_erroneous(start);
        }
    }

    /// `exhausted` holds nodes already walked without reaching `start`.
    fn reaches(&self, start: TypeId, current: TypeId, chain: &mut Chain, exhausted: &mut HashSet<TypeId>) -> bool {
        let graph = self.graph;
        let members: SmallVec<[TypeId; 8]> = match graph.kind(current) {
            TypeKind::Sequence(fields) | TypeKind::Set(fields) => {
                fields.iter().filter(|f| !f.optional).map(|f| f.ty).collect()
            }
            TypeKind::Choice(fields) if fields.len() == 1 => fields.iter().map(|f| f.ty).collect(),
            TypeKind::Array { element, size } if *size > 0 => SmallVec::from_slice(&[*element]),
            _ => SmallVec::new(),
        };

        // Members were checked before this walk, so their aliases are cached.
        for member in members {
            let next = graph.peek_last(member);
            if next == start {
                return true;
            }
            if exhausted.contains(&next) {
                continue;
            }
            let mark = chain.mark();
            if !chain.add(next) {
                trace!(ty = next.0, "recursion cut off");
                chain.restore(mark);
                continue;
            }
            let found = self.reaches(start, next, chain, exhausted);
            chain.restore(mark);
            if found {
                return true;
            }
        }
        exhausted.insert(current);
        false
    }

    fn check_constant(&mut self, name: &Identifier, constant: &ValueDefinition) {
        if self.check_referenced_constant(name, constant) {
            self.sink.report(Diagnostic::error(
                Category::CircularReference,
                constant.location,
                format!("Circular reference: constant `{}' refers to itself", name),
            ));
        }
    }

    /// Checks the value of a constant definition once per pass. Returns `true`
    /// when the constant turns out to depend on itself.
    pub(super) fn check_referenced_constant(&mut self, name: &Identifier, constant: &ValueDefinition) -> bool {
        let Ok(mut value) = constant.value.try_borrow_mut() else {
            // Already being checked further up the stack.
            return true;
        };
        let options = ValueCheckOptions {
            expected: ExpectedKind::Constant,
            implicit_omit: constant.implicit_omit,
            ..ValueCheckOptions::default()
        };
        self.check_value(constant.governing, &mut value, Some(name), options)
    }
}
