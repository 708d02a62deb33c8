//! Index and element count rules for list values and templates.
use super::super::checker::TypeChecker;
use super::super::error::{Category, Diagnostic, DiagnosticSink};
use crate::graph::{LengthRange, Location, TypeId};
use std::collections::BTreeMap;

impl<'a> TypeChecker<'a> {
    /// Checks the indices of an indexed list. `size` is the dimension of an
    /// array type; holes below the highest index are reported only when
    /// `forbid_holes` is set.
    pub(crate) fn check_indices(
        &mut self,
        list: TypeId,
        size: Option<u64>,
        indices: &[(i64, Location)],
        forbid_holes: bool,
        location: Location,
    ) {
        let graph = self.graph;
        let max_index = self.config.max_index;
        let mut seen: BTreeMap<i64, usize> = BTreeMap::new();

        for (position, &(index, at)) in indices.iter().enumerate() {
            if index < 0 {
                self.sink.report(Diagnostic::error(
                    Category::BadIndex,
                    at,
                    format!(
                        "A non-negative integer value was expected for indexing type `{}' instead of {}",
                        graph.type_name(list),
                        index
                    ),
                ));
                continue;
            }
            if index > max_index {
                self.sink.report(Diagnostic::error(
                    Category::BadIndex,
                    at,
                    format!("Integer value `{}' is too big for indexing type `{}'", index, graph.type_name(list)),
                ));
                continue;
            }
            if let Some(size) = size {
                if index as u64 >= size {
                    self.sink.report(Diagnostic::error(
                        Category::BadIndex,
                        at,
                        format!(
                            "Index overflow in a value for array type `{}': the index is {}, but the array has only {} elements",
                            graph.type_name(list),
                            index,
                            size
                        ),
                    ));
                    continue;
                }
            }
            if let Some(&first) = seen.get(&index) {
                self.sink.report(
                    Diagnostic::error(
                        Category::DuplicateIndex,
                        at,
                        format!(
                            "Duplicate index value `{}' for components {} and {}",
                            index,
                            first + 1,
                            position + 1
                        ),
                    )
                    .with_related(indices[first].1),
                );
                continue;
            }
            seen.insert(index, position);
        }

        if forbid_holes {
            if let Some((&highest, _)) = seen.last_key_value() {
                if (seen.len() as i64) <= highest {
                    self.sink.report(Diagnostic::error(
                        Category::IndexHole,
                        location,
                        "It's not allowed to create hole(s) in constant values",
                    ));
                }
            }
        }
    }

    pub(crate) fn check_element_count(
        &mut self,
        list: TypeId,
        count: u64,
        length: Option<LengthRange>,
        location: Location,
    ) {
        let Some(range) = length else {
            return;
        };
        if !range.contains(count) {
            let name = self.graph.type_name(list);
            self.sink.report(Diagnostic::error(
                Category::ElementCount,
                location,
                format!(
                    "The number of elements ({}) violates the length restriction {} of type `{}'",
                    count, range, name
                ),
            ));
        }
    }

    pub(crate) fn check_array_count(
        &mut self,
        list: TypeId,
        size: u64,
        count: u64,
        incomplete_allowed: bool,
        location: Location,
    ) {
        let name = self.graph.type_name(list);
        if count > size {
            self.sink.report(Diagnostic::error(
                Category::ElementCount,
                location,
                format!("Too many elements in the array value of type `{}': {} was expected instead of {}", name, size, count),
            ));
        } else if count < size && !incomplete_allowed {
            self.sink.report(Diagnostic::error(
                Category::ElementCount,
                location,
                format!("Too few elements in the array value of type `{}': {} was expected instead of {}", name, size, count),
            ));
        }
    }
}
