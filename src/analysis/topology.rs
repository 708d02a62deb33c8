//! Containment topology of the type graph.
//!
//! An edge `A -> B` means a value of `A` directly holds (or aliases) a value
//! of `B`. Code generation uses this to order type declarations and to find
//! the groups of mutually recursive types that need forward declarations.

use crate::graph::{Definition, TypeGraph, TypeId, TypeKind};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::{HashSet, VecDeque};

/// Builds the containment graph over every node of `graph`.
///
/// References are followed through the definition table, so the graph is
/// usable before any checking pass. Unresolvable references get no edge.
pub fn dependency_graph(graph: &TypeGraph) -> DiGraphMap<TypeId, ()> {
    let mut deps = DiGraphMap::with_capacity(graph.type_count(), graph.type_count());
    for id in graph.type_ids() {
        deps.add_node(id);
        match graph.kind(id) {
            TypeKind::Reference(name) => {
                if let Some(Definition::Type(target)) = graph.resolve(name) {
                    deps.add_edge(id, *target, ());
                }
            }
            kind => {
                for child in kind.children() {
                    deps.add_edge(id, child, ());
                }
            }
        }
    }
    deps
}

/// Groups of types that reach themselves through containment.
///
/// Each group is a strongly connected component with more than one member,
/// or a single type with an edge to itself. Groups come out in reverse
/// topological order, as `tarjan_scc` yields them.
pub fn recursive_groups(graph: &TypeGraph) -> Vec<Vec<TypeId>> {
    let deps = dependency_graph(graph);
    tarjan_scc(&deps)
        .into_iter()
        .filter(|group| group.len() > 1 || deps.contains_edge(group[0], group[0]))
        .map(|mut group| {
            group.sort();
            group
        })
        .collect()
}

/// Every type that belongs to some recursive group.
pub fn recursive_types(graph: &TypeGraph) -> HashSet<TypeId> {
    recursive_groups(graph).into_iter().flatten().collect()
}

/// Orders types so every type appears after the types it contains.
///
/// Uses a DFS post-order. Edges that close a cycle are skipped, so types of
/// a recursive group come out in discovery order.
pub fn declaration_order(graph: &TypeGraph) -> Vec<TypeId> {
    let deps = dependency_graph(graph);
    let count = graph.type_count();
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::None; count];

    for id in graph.type_ids() {
        if state[id.index()] == VisitState::None {
            visit(id, &deps, &mut state, &mut order);
        }
    }
    order
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting,
    Visited,
}

fn visit(node: TypeId, deps: &DiGraphMap<TypeId, ()>, state: &mut [VisitState], order: &mut Vec<TypeId>) {
    state[node.index()] = VisitState::Visiting;
    for child in deps.neighbors_directed(node, Direction::Outgoing) {
        // A `Visiting` child is a back edge into the current cycle.
        if state[child.index()] == VisitState::None {
            visit(child, deps, state, order);
        }
    }
    state[node.index()] = VisitState::Visited;
    order.push(node);
}

/// All types that contain `start` directly or indirectly, `start` included.
/// These are the types whose generated code changes when `start` does.
pub fn dependents_of(graph: &TypeGraph, start: TypeId) -> HashSet<TypeId> {
    let deps = dependency_graph(graph);
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        if seen.insert(node) {
            queue.extend(deps.neighbors_directed(node, Direction::Incoming));
        }
    }
    seen
}
