//! Field lookup shared by named value and template lists.
use super::super::checker::TypeChecker;
use super::super::error::{Category, Diagnostic, DiagnosticSink};
use crate::graph::{Field, Identifier, Location, TypeId};
use std::collections::HashMap;

/// Result of matching the entries of a named list against the fields of its type.
pub(crate) struct FieldScan {
    /// Per entry, the index of the field it sets. `None` for unknown and
    /// duplicate entries, which are not checked any further.
    pub matched: Vec<Option<usize>>,
    /// Per field, whether some entry sets it.
    pub present: Vec<bool>,
}

impl<'a> TypeChecker<'a> {
    pub(crate) fn scan_named_entries<'n>(
        &mut self,
        ty: TypeId,
        fields: &[Field],
        entries: impl IntoIterator<Item = (&'n Identifier, Location)>,
        enforce_order: bool,
        what: &str,
    ) -> FieldScan {
        let graph = self.graph;
        let keyword = graph.kind(ty).keyword();
        let mut scan = FieldScan { matched: Vec::new(), present: vec![false; fields.len()] };
        let mut first_seen: HashMap<usize, Location> = HashMap::new();
        let mut last_matched: Option<usize> = None;

        for (name, location) in entries {
            let Some(index) = fields.iter().position(|f| &f.name == name) else {
                self.sink.report(Diagnostic::error(
                    Category::UnknownField,
                    location,
                    format!(
                        "Reference to non-existent field `{}' in {} {} for type `{}'",
                        name,
                        keyword,
                        what,
                        graph.type_name(ty)
                    ),
                ));
                scan.matched.push(None);
                continue;
            };

            if let Some(first) = first_seen.get(&index) {
                self.sink.report(
                    Diagnostic::error(
                        Category::DuplicateField,
                        location,
                        format!("Duplicate {} field `{}'", keyword, name),
                    )
                    .with_related(*first),
                );
                scan.matched.push(None);
                continue;
            }
            first_seen.insert(index, location);

            if let Some(previous) = last_matched {
                if enforce_order && index < previous {
                    self.sink.report(Diagnostic::error(
                        Category::FieldOrder,
                        location,
                        format!(
                            "Field `{}' cannot appear after field `{}' in {} {}",
                            name, fields[previous].name, keyword, what
                        ),
                    ));
                }
            }
            last_matched = Some(last_matched.map_or(index, |previous| previous.max(index)));
            scan.present[index] = true;
            scan.matched.push(Some(index));
        }
        scan
    }
}

/// Position at which a synthesized entry for `fields[index]` keeps a named
/// list in declaration order: before the first entry of a later field.
pub(crate) fn declaration_slot<'n>(
    fields: &[Field],
    names: impl IntoIterator<Item = &'n Identifier>,
    index: usize,
) -> usize {
    let mut slot = 0;
    for (position, name) in names.into_iter().enumerate() {
        if fields.iter().position(|f| &f.name == name).map_or(false, |i| i > index) {
            return position;
        }
        slot = position + 1;
    }
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeId;
    use rstest::rstest;

    #[rstest]
    #[case(&["x", "z"], 1, 1)]
    #[case(&["x"], 1, 1)]
    #[case(&["z"], 0, 0)]
    #[case(&[], 2, 0)]
    fn test_declaration_slot(#[case] present: &[&str], #[case] index: usize, #[case] slot: usize) {
        let ty = TypeId::new(0);
        let fields = [Field::mandatory("x", ty), Field::optional("y", ty), Field::mandatory("z", ty)];
        let names: Vec<Identifier> = present.iter().map(|n| Identifier::from(*n)).collect();
        assert_eq!(declaration_slot(&fields, &names, index), slot);
    }
}
