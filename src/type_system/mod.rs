//! The semantic checker for the type graph.
//!
//! This module provides the `TypeChecker`, which validates type definitions,
//! decides structural compatibility between types, and checks value and
//! template trees against their governing types. All findings go to a
//! `DiagnosticSink`; checking never stops at the first error.

// Publicly export the primary components for use by other modules.
pub use self::chain::Chain;
pub use self::checker::TypeChecker;
pub use self::compat::CompatibilityInfo;
pub use self::error::{Category, Diagnostic, DiagnosticSink, Diagnostics, Severity};
pub use self::rules::values::{ExpectedKind, ValueCheckOptions};

// --- MODULE DECLARATIONS ---
mod chain;
mod checker;
mod compat;
mod error;
mod rules {
    pub mod fields;
    pub mod indexed;
    pub mod literal;
    pub mod templates;
    pub mod values;
}
