//! Semantic core for structured test-data types.
//!
//! The crate holds a graph of user-defined types (records, sets, unions,
//! lists, arrays, enumerations, aliases, procedure types and primitives)
//! and checks it: type definitions are validated, structural compatibility
//! between types is decided, and value and template trees are checked
//! against their governing types. Findings are reported to a
//! `DiagnosticSink`; the checked graph is then read through `CodegenView`.

pub mod analysis;
pub mod config;
pub mod graph;
pub mod query;
pub mod tree;
pub mod type_system;

pub use config::CheckerConfig;
pub use graph::{Definition, Field, Identifier, Location, TypeGraph, TypeId, TypeKind};
pub use query::CodegenView;
pub use tree::{Template, Value};
pub use type_system::{CompatibilityInfo, Diagnostic, DiagnosticSink, Diagnostics, TypeChecker};
