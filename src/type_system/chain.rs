//! Ordered visited-sets used to cut recursion while descending a type graph.
//!
//! A chain lives for one query. Callers take a `mark()` before adding and
//! `restore()` on the way back, so sibling branches never see each other's links.

use crate::graph::TypeId;
use smallvec::SmallVec;

#[derive(Debug, Clone, Default)]
pub struct Chain {
    links: SmallVec<[TypeId; 8]>,
    /// Length of the chain when the first repeated link was added.
    first_repeat: Option<usize>,
}

impl Chain {
    pub fn new() -> Self { Self::default() }

    /// Appends `id`. Returns `false` if it was already on the chain, which
    /// records a recursion until the chain is restored below that point.
    pub fn add(&mut self, id: TypeId) -> bool {
        let fresh = !self.links.contains(&id);
        if !fresh && self.first_repeat.is_none() {
            self.first_repeat = Some(self.links.len());
        }
        self.links.push(id);
        fresh
    }

    pub fn has_recursion(&self) -> bool {
        self.first_repeat.is_some()
    }

    pub fn mark(&self) -> usize {
        self.links.len()
    }

    pub fn restore(&mut self, mark: usize) {
        self.links.truncate(mark);
        if self.first_repeat.map_or(false, |at| at >= mark) {
            self.first_repeat = None;
        }
    }

    pub fn links(&self) -> &[TypeId] {
        &self.links
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.links.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_is_recorded_and_cleared_by_restore() {
        let mut chain = Chain::new();
        assert!(chain.add(TypeId(1)));
        assert!(chain.add(TypeId(2)));
        let mark = chain.mark();
        assert!(!chain.add(TypeId(1)));
        assert!(chain.has_recursion());

        chain.restore(mark);
        assert!(!chain.has_recursion());
        assert_eq!(chain.links(), &[TypeId(1), TypeId(2)]);
    }

    #[test]
    fn test_restore_above_repeat_keeps_recursion() {
        let mut chain = Chain::new();
        chain.add(TypeId(5));
        chain.add(TypeId(5));
        let mark = chain.mark();
        chain.add(TypeId(6));
        chain.restore(mark);
        assert!(chain.has_recursion());
    }
}
