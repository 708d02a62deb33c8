//! storage.rs
//! Columnar arena of type nodes plus the global definition table.

use super::node::{EncodingAttributes, Identifier, Location, SubtypeConstraint, TypeKind};
use crate::tree::{Template, Value};
use std::cell::{Cell, OnceCell, RefCell};
use std::collections::{BTreeSet, HashMap};

pub use self::error::GraphError;
mod error {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum GraphError {
        #[error("Definition '{0}' already exists")]
        DuplicateDefinition(Identifier),
        #[error("Type id {0:?} does not exist in this graph")]
        UnknownType(TypeId),
        #[error("Definition '{0}' does not exist")]
        UnknownDefinition(Identifier),
    }
}

/// A stable handle to a node in the type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TypeId(pub u32);

impl TypeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// Identifies one checking pass. Stamps only grow within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Stamp(pub u64);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMetadata {
    /// Set for named type definitions; anonymous inline types have none.
    pub name: Option<Identifier>,
    /// The composite node that declared this one inline.
    pub owner: Option<TypeId>,
    pub constraint: Option<SubtypeConstraint>,
    pub attributes: EncodingAttributes,
    pub location: Location,
}

/// Per-node caches written by the checker. Every write is idempotent.
#[derive(Debug, Default)]
pub(crate) struct NodeState {
    pub resolved: OnceCell<TypeId>,
    pub erroneous: Cell<bool>,
    pub last_checked: Cell<Option<Stamp>>,
    pub enum_values: OnceCell<Vec<i64>>,
}

#[derive(Debug)]
pub struct ValueDefinition {
    pub governing: TypeId,
    pub value: RefCell<Value>,
    pub implicit_omit: bool,
    pub location: Location,
}

#[derive(Debug)]
pub struct VariableDefinition {
    pub governing: TypeId,
    pub location: Location,
}

#[derive(Debug)]
pub struct TemplateDefinition {
    pub governing: TypeId,
    pub body: RefCell<Template>,
    pub implicit_omit: bool,
    pub location: Location,
}

/// An entry of the global definition table.
#[derive(Debug)]
pub enum Definition {
    Type(TypeId),
    Constant(ValueDefinition),
    ModulePar(VariableDefinition),
    Variable(VariableDefinition),
    Template(TemplateDefinition),
}

impl Definition {
    pub fn describe(&self) -> &'static str {
        match self {
            Definition::Type(_) => "type",
            Definition::Constant(_) => "constant",
            Definition::ModulePar(_) => "module parameter",
            Definition::Variable(_) => "variable",
            Definition::Template(_) => "template",
        }
    }

    /// The type a value-like definition is declared with.
    pub fn governing(&self) -> Option<TypeId> {
        match self {
            Definition::Type(_) => None,
            Definition::Constant(c) => Some(c.governing),
            Definition::ModulePar(v) | Definition::Variable(v) => Some(v.governing),
            Definition::Template(t) => Some(t.governing),
        }
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    pub kinds: Vec<TypeKind>,
    pub meta: Vec<NodeMetadata>,
    pub(crate) state: Vec<NodeState>,

    // Definition table, in declaration order
    pub(crate) definitions: Vec<(Identifier, Definition)>,
    pub(crate) by_name: HashMap<Identifier, usize>,

    // Conversions the code generator has to emit, as (from, to) pairs
    pub(crate) conversions: RefCell<BTreeSet<(TypeId, TypeId)>>,
    pub(crate) stamp: Cell<u64>,
}

impl TypeRegistry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.kinds.len() }

    pub fn push_node(&mut self, kind: TypeKind, meta: NodeMetadata) -> TypeId {
        let id = TypeId(self.kinds.len() as u32);

        // Inline children declared by a composite are owned by it.
        for child in kind.children() {
            if let Some(child_meta) = self.meta.get_mut(child.index()) {
                if child_meta.owner.is_none() && child_meta.name.is_none() {
                    child_meta.owner = Some(id);
                }
            }
        }

        self.kinds.push(kind);
        self.meta.push(meta);
        self.state.push(NodeState::default());
        id
    }

    pub fn contains(&self, id: TypeId) -> bool {
        id.index() < self.kinds.len()
    }

    #[inline(always)]
    pub(crate) fn state(&self, id: TypeId) -> &NodeState {
        &self.state[id.index()]
    }

    pub fn add_definition(&mut self, name: Identifier, definition: Definition) -> Result<(), GraphError> {
        if self.by_name.contains_key(&name) {
            return Err(GraphError::DuplicateDefinition(name));
        }
        if let Some(ty) = definition.governing() {
            if !self.contains(ty) {
                return Err(GraphError::UnknownType(ty));
            }
        }
        self.by_name.insert(name.clone(), self.definitions.len());
        self.definitions.push((name, definition));
        Ok(())
    }

    pub fn resolve(&self, name: &Identifier) -> Option<&Definition> {
        self.by_name.get(name).map(|&idx| &self.definitions[idx].1)
    }

    pub fn resolve_mut(&mut self, name: &Identifier) -> Option<&mut Definition> {
        let idx = *self.by_name.get(name)?;
        Some(&mut self.definitions[idx].1)
    }

    pub fn next_stamp(&self) -> Stamp {
        let next = self.stamp.get() + 1;
        self.stamp.set(next);
        Stamp(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Field, PrimitiveKind};

    #[test]
    fn test_inline_children_are_owned_by_their_composite() {
        let mut reg = TypeRegistry::new();
        let int = reg.push_node(TypeKind::Primitive(PrimitiveKind::Integer), NodeMetadata::default());
        let named = reg.push_node(
            TypeKind::Primitive(PrimitiveKind::Boolean),
            NodeMetadata { name: Some("Flag".into()), ..Default::default() },
        );
        let rec = reg.push_node(
            TypeKind::Sequence(vec![Field::mandatory("a", int), Field::mandatory("b", named)]),
            NodeMetadata::default(),
        );

        assert_eq!(reg.meta[int.index()].owner, Some(rec));
        assert_eq!(reg.meta[named.index()].owner, None);
    }

    #[test]
    fn test_duplicate_definition_is_rejected() {
        let mut reg = TypeRegistry::new();
        let int = reg.push_node(TypeKind::Primitive(PrimitiveKind::Integer), NodeMetadata::default());
        reg.add_definition("T".into(), Definition::Type(int)).unwrap();

        let err = reg.add_definition("T".into(), Definition::Type(int)).unwrap_err();
        assert_eq!(err, GraphError::DuplicateDefinition("T".into()));
    }

    #[test]
    fn test_stamps_increase() {
        let reg = TypeRegistry::new();
        let first = reg.next_stamp();
        let second = reg.next_stamp();
        assert!(first < second);
    }
}
