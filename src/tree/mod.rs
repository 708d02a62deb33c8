//! Value and template trees owned by their use-sites.
//!
//! Trees are checked through `&mut` so the checker can record stamps and
//! reinterpret ambiguous notations in place once the governing type is known.
pub mod template;
pub mod value;

pub use template::{Completeness, IndexedTemplate, NamedTemplate, Template, TemplateKind, TemplateState};
pub use value::{IndexedValue, Literal, NamedValue, Value, ValueKind, Verdict};
