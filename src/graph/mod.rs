//! Defines the type graph: an arena of type nodes addressed by `TypeId`,
//! the definition table that owns named types, and alias resolution.
pub mod deref;
pub mod node;
pub mod storage;
pub mod type_graph;

// Re-export key types for convenient access
pub use node::{
    EncodingAttributes, EnumItem, Field, Identifier, LengthRange, Location, PrimitiveKind,
    ProcedureKind, SubtypeConstraint, TypeKind,
};
pub use storage::{
    Definition, GraphError, NodeMetadata, Stamp, TemplateDefinition, TypeId, TypeRegistry,
    ValueDefinition, VariableDefinition,
};
pub use type_graph::TypeGraph;
