//! type_graph.rs
//! Wraps the low-level TypeRegistry with builders, accessors and the
//! write-once caches the checker relies on.

use super::node::{
    EnumItem, Field, Identifier, LengthRange, Location, PrimitiveKind, ProcedureKind,
    SubtypeConstraint, TypeKind,
};
use super::storage::{
    Definition, GraphError, NodeMetadata, Stamp, TemplateDefinition, TypeId, TypeRegistry,
    ValueDefinition, VariableDefinition,
};
use crate::tree::{Template, Value};
use std::cell::RefCell;

#[derive(Debug, Default)]
pub struct TypeGraph {
    pub(crate) store: TypeRegistry,
}

impl TypeGraph {
    pub fn new() -> Self { Self::default() }

    pub fn add_type(&mut self, kind: TypeKind) -> TypeId {
        self.store.push_node(kind, NodeMetadata::default())
    }

    pub fn primitive(&mut self, kind: PrimitiveKind) -> TypeId {
        self.add_type(TypeKind::Primitive(kind))
    }

    pub fn sequence(&mut self, fields: Vec<Field>) -> TypeId {
        self.add_type(TypeKind::Sequence(fields))
    }

    pub fn set(&mut self, fields: Vec<Field>) -> TypeId {
        self.add_type(TypeKind::Set(fields))
    }

    pub fn choice(&mut self, fields: Vec<Field>) -> TypeId {
        self.add_type(TypeKind::Choice(fields))
    }

    pub fn anytype(&mut self, fields: Vec<Field>) -> TypeId {
        self.add_type(TypeKind::Anytype(fields))
    }

    pub fn sequence_of(&mut self, element: TypeId) -> TypeId {
        self.add_type(TypeKind::SequenceOf(element))
    }

    pub fn set_of(&mut self, element: TypeId) -> TypeId {
        self.add_type(TypeKind::SetOf(element))
    }

    pub fn array(&mut self, element: TypeId, size: u64) -> TypeId {
        self.add_type(TypeKind::Array { element, size })
    }

    pub fn enumerated(&mut self, items: Vec<EnumItem>) -> TypeId {
        self.add_type(TypeKind::Enumerated(items))
    }

    /// An alias to the type definition called `target`.
    pub fn reference(&mut self, target: &str) -> TypeId {
        self.add_type(TypeKind::Reference(target.into()))
    }

    pub fn procedure(&mut self, kind: ProcedureKind, params: Vec<Field>, returns: Option<TypeId>) -> TypeId {
        self.add_type(TypeKind::Procedure { kind, params, returns })
    }

    pub fn set_constraint(&mut self, id: TypeId, constraint: SubtypeConstraint) -> Result<(), GraphError> {
        self.meta_mut(id)?.constraint = Some(constraint);
        Ok(())
    }

    pub fn set_location(&mut self, id: TypeId, location: Location) -> Result<(), GraphError> {
        self.meta_mut(id)?.location = location;
        Ok(())
    }

    pub fn meta_mut(&mut self, id: TypeId) -> Result<&mut NodeMetadata, GraphError> {
        self.store.meta.get_mut(id.index()).ok_or(GraphError::UnknownType(id))
    }

    // --- Definitions ---

    /// Registers `id` as the named type definition `name`.
    pub fn define_type(&mut self, name: &str, id: TypeId) -> Result<TypeId, GraphError> {
        let meta = self.meta_mut(id)?;
        let name = Identifier::new(name);
        if meta.name.is_none() {
            meta.name = Some(name.clone());
        }
        self.store.add_definition(name, Definition::Type(id))?;
        Ok(id)
    }

    pub fn define_constant(&mut self, name: &str, governing: TypeId, value: Value) -> Result<(), GraphError> {
        let location = value.location;
        self.store.add_definition(
            name.into(),
            Definition::Constant(ValueDefinition {
                governing,
                value: RefCell::new(value),
                implicit_omit: false,
                location,
            }),
        )
    }

    pub fn define_template(&mut self, name: &str, governing: TypeId, body: Template) -> Result<(), GraphError> {
        let location = body.location;
        self.store.add_definition(
            name.into(),
            Definition::Template(TemplateDefinition {
                governing,
                body: RefCell::new(body),
                implicit_omit: false,
                location,
            }),
        )
    }

    pub fn define_variable(&mut self, name: &str, governing: TypeId) -> Result<(), GraphError> {
        self.store.add_definition(
            name.into(),
            Definition::Variable(VariableDefinition { governing, location: Location::default() }),
        )
    }

    pub fn define_module_par(&mut self, name: &str, governing: TypeId) -> Result<(), GraphError> {
        self.store.add_definition(
            name.into(),
            Definition::ModulePar(VariableDefinition { governing, location: Location::default() }),
        )
    }

    /// Turns on implicit omit for a constant or template definition.
    pub fn enable_implicit_omit(&mut self, name: &str) -> Result<(), GraphError> {
        let name = Identifier::new(name);
        match self.store.resolve_mut(&name) {
            Some(Definition::Constant(c)) => c.implicit_omit = true,
            Some(Definition::Template(t)) => t.implicit_omit = true,
            _ => return Err(GraphError::UnknownDefinition(name)),
        }
        Ok(())
    }

    pub fn resolve(&self, name: &Identifier) -> Option<&Definition> {
        self.store.resolve(name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&Identifier, &Definition)> {
        self.store.definitions.iter().map(|(name, def)| (name, def))
    }

    // --- Accessors ---
    pub fn type_count(&self) -> usize { self.store.count() }
    pub fn type_ids(&self) -> impl Iterator<Item = TypeId> { (0..self.store.count()).map(TypeId::new) }
    pub fn kind(&self, id: TypeId) -> &TypeKind { &self.store.kinds[id.index()] }
    pub fn meta(&self, id: TypeId) -> &NodeMetadata { &self.store.meta[id.index()] }
    pub fn location(&self, id: TypeId) -> Location { self.store.meta[id.index()].location }

    pub fn length_constraint(&self, id: TypeId) -> Option<LengthRange> {
        self.meta(id).constraint.and_then(|c| c.length)
    }

    /// The nearest length constraint along the already resolved alias chain.
    pub fn effective_length_constraint(&self, id: TypeId) -> Option<LengthRange> {
        let mut current = id;
        for _ in 0..=self.store.count() {
            if let Some(range) = self.length_constraint(current) {
                return Some(range);
            }
            match self.resolved_target(current) {
                Some(next) if next != current => current = next,
                _ => return None,
            }
        }
        None
    }

    /// A human-readable name for messages: the definition name, or a
    /// description of an anonymous type.
    pub fn type_name(&self, id: TypeId) -> String {
        if let Some(name) = &self.meta(id).name {
            return name.to_string();
        }
        match self.kind(id) {
            TypeKind::SequenceOf(e) => format!("record of {}", self.type_name(*e)),
            TypeKind::SetOf(e) => format!("set of {}", self.type_name(*e)),
            TypeKind::Array { element, size } => format!("{}[{}]", self.type_name(*element), size),
            TypeKind::Reference(target) => target.to_string(),
            other => other.keyword().to_string(),
        }
    }

    // --- Checker state ---

    pub fn begin_pass(&self) -> Stamp { self.store.next_stamp() }

    pub fn is_erroneous(&self, id: TypeId) -> bool { self.store.state(id).erroneous.get() }

    pub(crate) fn mark_erroneous(&self, id: TypeId) { self.store.state(id).erroneous.set(true) }

    pub fn last_checked(&self, id: TypeId) -> Option<Stamp> { self.store.state(id).last_checked.get() }

    pub(crate) fn set_checked(&self, id: TypeId, stamp: Stamp) {
        self.store.state(id).last_checked.set(Some(stamp))
    }

    /// The alias target cached by a previous dereference, if any.
    pub fn resolved_target(&self, id: TypeId) -> Option<TypeId> {
        self.store.state(id).resolved.get().copied()
    }

    pub(crate) fn cache_resolved(&self, id: TypeId, target: TypeId) {
        let _ = self.store.state(id).resolved.set(target);
    }

    /// Values assigned to the items of an enumerated type by the check pass.
    pub fn enum_values(&self, id: TypeId) -> Option<&[i64]> {
        self.store.state(id).enum_values.get().map(Vec::as_slice)
    }

    pub(crate) fn assign_enum_values(&self, id: TypeId, values: Vec<i64>) {
        let _ = self.store.state(id).enum_values.set(values);
    }

    /// Follows cached alias targets only; never resolves or reports.
    pub fn peek_last(&self, id: TypeId) -> TypeId {
        let mut current = id;
        for _ in 0..self.store.count() {
            match self.resolved_target(current) {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }

    pub(crate) fn register_conversion(&self, from: TypeId, to: TypeId) {
        self.store.conversions.borrow_mut().insert((from, to));
    }

    pub fn conversions(&self) -> Vec<(TypeId, TypeId)> {
        self.store.conversions.borrow().iter().copied().collect()
    }

    pub fn has_conversion(&self, from: TypeId, to: TypeId) -> bool {
        self.store.conversions.borrow().contains(&(from, to))
    }
}
