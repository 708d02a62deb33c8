//! Read-only view of a checked graph for code generation.
//!
//! Everything here reads state a `TypeChecker` pass left behind; nothing
//! triggers checking or reports diagnostics.

use crate::analysis::topology;
use crate::graph::{EncodingAttributes, Field, TypeGraph, TypeId, TypeKind};
use crate::tree::{Template, TemplateState, Value};
use std::collections::HashSet;

pub use self::error::QueryError;
mod error {
    use crate::graph::TypeId;
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum QueryError {
        #[error("Type {0:?} has not been checked yet")]
        NotChecked(TypeId),
        #[error("Type {0:?} is erroneous")]
        Erroneous(TypeId),
        #[error("Type {0:?} has no components")]
        NotComposite(TypeId),
        #[error("Type {0:?} is not a collection")]
        NotCollection(TypeId),
        #[error("Type {0:?} is not an enumerated type")]
        NotEnumerated(TypeId),
    }
}

pub struct CodegenView<'g> {
    graph: &'g TypeGraph,
    recursive: HashSet<TypeId>,
}

impl<'g> CodegenView<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self { graph, recursive: topology::recursive_types(graph) }
    }

    /// The end of the alias chain of a checked, well-formed type.
    pub fn last_type(&self, id: TypeId) -> Result<TypeId, QueryError> {
        let graph = self.graph;
        if graph.last_checked(id).is_none() {
            return Err(QueryError::NotChecked(id));
        }
        let last = graph.peek_last(id);
        if graph.is_erroneous(id) || graph.is_erroneous(last) {
            return Err(QueryError::Erroneous(id));
        }
        Ok(last)
    }

    /// Fields of a record, set, union or anytype, in declaration order.
    pub fn components(&self, id: TypeId) -> Result<&'g [Field], QueryError> {
        match self.graph.kind(self.last_type(id)?) {
            TypeKind::Sequence(fields)
            | TypeKind::Set(fields)
            | TypeKind::Choice(fields)
            | TypeKind::Anytype(fields) => Ok(fields),
            _ => Err(QueryError::NotComposite(id)),
        }
    }

    pub fn element_type(&self, id: TypeId) -> Result<TypeId, QueryError> {
        self.graph.kind(self.last_type(id)?).element().ok_or(QueryError::NotCollection(id))
    }

    /// Numeric values of the items, explicit or assigned by the check pass.
    pub fn enum_values(&self, id: TypeId) -> Result<&'g [i64], QueryError> {
        let last = self.last_type(id)?;
        if !matches!(self.graph.kind(last), TypeKind::Enumerated(_)) {
            return Err(QueryError::NotEnumerated(id));
        }
        self.graph.enum_values(last).ok_or(QueryError::NotChecked(id))
    }

    pub fn attributes(&self, id: TypeId) -> &'g EncodingAttributes {
        &self.graph.meta(id).attributes
    }

    pub fn has_fixed_length(&self, id: TypeId) -> bool {
        self.attributes(id).has_length()
    }

    /// Fixed encoded length in bits, if the type declares one.
    pub fn encoded_length(&self, id: TypeId) -> Option<u32> {
        self.attributes(id).length_in_bits
    }

    pub fn has_default_value(&self, id: TypeId) -> bool {
        self.attributes(id).has_default_value()
    }

    /// Whether a value of `from` was accepted where `to` is expected and
    /// needs a generated conversion function.
    pub fn needs_conversion(&self, from: TypeId, to: TypeId) -> bool {
        self.graph.has_conversion(self.graph.peek_last(from), self.graph.peek_last(to))
    }

    /// Whether the type takes part in a containment cycle.
    pub fn is_recursive(&self, id: TypeId) -> bool {
        self.recursive.contains(&id) || self.recursive.contains(&self.graph.peek_last(id))
    }

    pub fn is_well_formed_value(&self, value: &Value) -> bool {
        value.last_checked().is_some() && !value.is_erroneous()
    }

    pub fn is_well_formed_template(&self, template: &Template) -> bool {
        matches!(template.state(), TemplateState::Valid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Definition, EnumItem, PrimitiveKind};
    use crate::type_system::{Diagnostics, TypeChecker};

    fn checked(g: &TypeGraph) -> Diagnostics {
        let mut diags = Diagnostics::new();
        TypeChecker::new(g, &mut diags).check_all();
        diags
    }

    #[test]
    fn test_queries_need_a_check_pass() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let rec = g.sequence(vec![Field::mandatory("n", int)]);

        assert_eq!(CodegenView::new(&g).components(rec), Err(QueryError::NotChecked(rec)));
        checked(&g);
        let view = CodegenView::new(&g);
        assert_eq!(view.components(rec).unwrap().len(), 1);
        assert_eq!(view.element_type(rec), Err(QueryError::NotCollection(rec)));
    }

    #[test]
    fn test_aliases_resolve_to_their_target() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let list = g.sequence_of(int);
        let alias = g.reference("List");
        g.define_type("List", list).unwrap();
        let colour = g.enumerated(vec![EnumItem::with_value("red", 2), EnumItem::new("blue")]);
        checked(&g);

        let view = CodegenView::new(&g);
        assert_eq!(view.element_type(alias), Ok(int));
        assert_eq!(view.enum_values(colour).unwrap(), &[2, 0]);
        assert_eq!(view.enum_values(list), Err(QueryError::NotEnumerated(list)));
    }

    #[test]
    fn test_erroneous_types_are_refused() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let bad = g.sequence(vec![Field::mandatory("x", int), Field::mandatory("x", int)]);
        checked(&g);

        assert_eq!(CodegenView::new(&g).components(bad), Err(QueryError::Erroneous(bad)));
    }

    #[test]
    fn test_conversion_and_well_formedness() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let a = g.sequence(vec![Field::mandatory("x", int)]);
        let b = g.sequence(vec![Field::mandatory("y", int)]);
        g.define_type("A", a).unwrap();
        g.define_type("B", b).unwrap();
        g.define_constant("ca", a, Value::named([("x", Value::integer(1))])).unwrap();
        g.define_constant("cb", b, Value::reference("ca")).unwrap();
        g.define_template("t", a, Template::named([("x", Template::any_value())])).unwrap();
        let diags = checked(&g);
        assert!(diags.is_empty(), "{:?}", diags.all());

        let view = CodegenView::new(&g);
        assert!(view.needs_conversion(a, b));
        assert!(!view.needs_conversion(b, a));
        assert!(!view.is_recursive(a));
        let Some(Definition::Constant(cb)) = g.resolve(&"cb".into()) else { panic!("cb missing") };
        assert!(view.is_well_formed_value(&cb.value.borrow()));
        let Some(Definition::Template(t)) = g.resolve(&"t".into()) else { panic!("t missing") };
        assert!(view.is_well_formed_template(&t.body.borrow()));
        assert!(!view.is_well_formed_template(&Template::any_value()));
    }

    #[test]
    fn test_encoding_attributes_are_read_through() {
        let mut g = TypeGraph::new();
        let octets = g.primitive(PrimitiveKind::Octetstring);
        let plain = g.primitive(PrimitiveKind::Integer);
        let meta = g.meta_mut(octets).unwrap();
        meta.attributes.length_in_bits = Some(32);
        meta.attributes.default_text = Some("'00'O".into());

        let view = CodegenView::new(&g);
        assert!(view.has_fixed_length(octets));
        assert_eq!(view.encoded_length(octets), Some(32));
        assert!(view.has_default_value(octets));
        assert!(!view.has_fixed_length(plain));
        assert_eq!(view.encoded_length(plain), None);
        assert!(!view.has_default_value(plain));
    }

    #[test]
    fn test_recursive_types_are_flagged() {
        let mut g = TypeGraph::new();
        let me = g.reference("Tree");
        let children = g.sequence_of(me);
        let tree = g.sequence(vec![Field::mandatory("children", children)]);
        g.define_type("Tree", tree).unwrap();
        checked(&g);

        let view = CodegenView::new(&g);
        assert!(view.is_recursive(tree));
        assert!(view.is_recursive(me));
    }
}
