//! Alias resolution over the type arena.
//!
//! A `Reference` node is resolved through the definition table at most once;
//! the target is cached on the node. Following a whole alias chain uses a
//! visited set local to the call, so a circular chain is reported instead of
//! looping, and every node on the cycle is marked erroneous.

use super::node::TypeKind;
use super::storage::{Definition, TypeId};
use super::type_graph::TypeGraph;
use crate::type_system::{Category, Diagnostic, DiagnosticSink};
use smallvec::SmallVec;
use tracing::debug;

impl TypeGraph {
    /// Resolves one alias hop. Non-reference types resolve to themselves, and
    /// so does a reference whose target is missing or is not a type.
    pub fn dereference_once(&self, id: TypeId, sink: &mut dyn DiagnosticSink) -> TypeId {
        let TypeKind::Reference(target) = self.kind(id) else {
            return id;
        };
        if let Some(resolved) = self.resolved_target(id) {
            return resolved;
        }
        if self.is_erroneous(id) {
            return id;
        }

        match self.resolve(target) {
            Some(Definition::Type(resolved)) => {
                self.cache_resolved(id, *resolved);
                *resolved
            }
            Some(other) => {
                sink.report(Diagnostic::error(
                    Category::TypeReference,
                    self.location(id),
                    format!(
                        "Type reference expected: `{}' refers to a {}",
                        target,
                        other.describe()
                    ),
                ));
                self.mark_erroneous(id);
                id
            }
            None => {
                sink.report(Diagnostic::error(
                    Category::TypeReference,
                    self.location(id),
                    format!("Type reference expected: there is no type named `{}'", target),
                ));
                self.mark_erroneous(id);
                id
            }
        }
    }

    /// Follows the alias chain to the first non-reference type.
    ///
    /// An erroneous start node, a broken hop or a circular chain all return
    /// `id` itself, so callers can compare identities to detect failure.
    pub fn dereference_last(&self, id: TypeId, sink: &mut dyn DiagnosticSink) -> TypeId {
        if self.is_erroneous(id) || !matches!(self.kind(id), TypeKind::Reference(_)) {
            return id;
        }

        let mut visited: SmallVec<[TypeId; 8]> = SmallVec::new();
        visited.push(id);
        let mut current = id;

        loop {
            let next = self.dereference_once(current, sink);
            if next == current {
                // Either the hop failed (already reported) or the alias names itself.
                if !self.is_erroneous(current) {
                    sink.report(Diagnostic::error(
                        Category::CircularReference,
                        self.location(id),
                        format!("Circular type reference chain: `{}' refers to itself", self.type_name(current)),
                    ));
                    self.mark_erroneous(current);
                }
                self.mark_erroneous(id);
                return id;
            }
            if self.is_erroneous(next) && matches!(self.kind(next), TypeKind::Reference(_)) {
                self.mark_erroneous(id);
                return id;
            }
            if visited.contains(&next) {
                let chain: Vec<String> = visited
                    .iter()
                    .chain(std::iter::once(&next))
                    .map(|t| self.type_name(*t))
                    .collect();
                debug!(start = id.0, chain = %chain.join(" -> "), "circular alias chain");
                sink.report(Diagnostic::error(
                    Category::CircularReference,
                    self.location(id),
                    format!("Circular type reference chain: {}", chain.join(" -> ")),
                ));
                for node in &visited {
                    self.mark_erroneous(*node);
                }
                return id;
            }
            if !matches!(self.kind(next), TypeKind::Reference(_)) {
                return next;
            }
            visited.push(next);
            current = next;
        }
    }
}
