//! Structural compatibility between two types.
//!
//! Two distinct type definitions are compatible when their structure lines
//! up: the same field count and optionality position by position for records
//! and sets, at least one shared alternative for unions, compatible elements
//! for list types. Recursion is cut with a pair of chains that live for one
//! query; a sub-pair seen again on both chains counts as compatible. That
//! rule guarantees termination but is not proven sound for every pair of
//! mutually recursive, structurally different graphs.

use super::chain::Chain;
use super::checker::TypeChecker;
use crate::graph::{Field, TypeId, TypeKind};
use tracing::{debug, trace};

/// Working state of one top-level compatibility query.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityInfo {
    pub left_chain: Chain,
    pub right_chain: Chain,
    /// First failure reason; later failures never overwrite it.
    pub error: Option<String>,
    /// Field path of the mismatch on the left side, e.g. `.inner.count`.
    pub left_path: String,
    pub right_path: String,
    pub needs_conversion: bool,
}

impl CompatibilityInfo {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
        false
    }

    pub(crate) fn prepend(&mut self, left: &str, right: &str) {
        self.left_path.insert_str(0, left);
        self.right_path.insert_str(0, right);
    }
}

impl<'a> TypeChecker<'a> {
    /// Whether values of `a` may be used where `b` is expected.
    ///
    /// With `info == None` only identity counts, which is how procedure
    /// types are compared.
    pub fn is_compatible(&mut self, a: TypeId, b: TypeId, info: Option<&mut CompatibilityInfo>) -> bool {
        let la = self.last_type(a);
        let lb = self.last_type(b);
        let graph = self.graph;

        let verdict = if graph.is_erroneous(la) || graph.is_erroneous(lb) || la == lb {
            true
        } else {
            match info {
                None => false,
                Some(info) => {
                    let (left_mark, right_mark) = (info.left_chain.mark(), info.right_chain.mark());
                    info.left_chain.add(la);
                    info.right_chain.add(lb);
                    let ok = self.compare(la, lb, info);
                    info.left_chain.restore(left_mark);
                    info.right_chain.restore(right_mark);
                    if ok {
                        info.needs_conversion = true;
                    }
                    ok
                }
            }
        };

        if self.config.log_compatibility_queries {
            debug!(left = %graph.type_name(la), right = %graph.type_name(lb), compatible = verdict, "compatibility query");
        } else {
            trace!(left = la.0, right = lb.0, compatible = verdict, "compatibility query");
        }
        verdict
    }

    /// Compares one sub-pair, prefixing the failure path with the given segments.
    fn compare_pair(&mut self, ta: TypeId, tb: TypeId, left: &str, right: &str, info: &mut CompatibilityInfo) -> bool {
        let la = self.last_type(ta);
        let lb = self.last_type(tb);
        let graph = self.graph;
        if graph.is_erroneous(la) || graph.is_erroneous(lb) || la == lb {
            return true;
        }

        let (left_mark, right_mark) = (info.left_chain.mark(), info.right_chain.mark());
        info.left_chain.add(la);
        info.right_chain.add(lb);
        let ok = if info.left_chain.has_recursion() && info.right_chain.has_recursion() {
            trace!(left = la.0, right = lb.0, "recursive pair treated as compatible");
            true
        } else {
            self.compare(la, lb, info)
        };
        info.left_chain.restore(left_mark);
        info.right_chain.restore(right_mark);

        if !ok {
            info.prepend(left, right);
        }
        ok
    }

    /// Dispatches on the kinds of two distinct, dereferenced types.
    fn compare(&mut self, a: TypeId, b: TypeId, info: &mut CompatibilityInfo) -> bool {
        let graph = self.graph;
        match (graph.kind(a), graph.kind(b)) {
            (TypeKind::Sequence(fa), TypeKind::Sequence(fb)) | (TypeKind::Set(fa), TypeKind::Set(fb)) => {
                self.compare_positional(fa, fb, info)
            }
            (TypeKind::Sequence(fields), TypeKind::SequenceOf(_) | TypeKind::Array { .. })
            | (TypeKind::Set(fields), TypeKind::SetOf(_)) => self.compare_fields_with_list(fields, b, true, info),
            (TypeKind::SequenceOf(_) | TypeKind::Array { .. }, TypeKind::Sequence(fields))
            | (TypeKind::SetOf(_), TypeKind::Set(fields)) => self.compare_fields_with_list(fields, a, false, info),
            (TypeKind::Choice(fa), TypeKind::Choice(fb)) | (TypeKind::Anytype(fa), TypeKind::Anytype(fb)) => {
                self.compare_by_name(fa, fb, info)
            }
            (TypeKind::SequenceOf(ea), TypeKind::SequenceOf(eb))
            | (TypeKind::SetOf(ea), TypeKind::SetOf(eb))
            | (TypeKind::SequenceOf(ea), TypeKind::Array { element: eb, .. })
            | (TypeKind::Array { element: ea, .. }, TypeKind::SequenceOf(eb)) => {
                if !self.list_lengths_agree(a, b) {
                    let what = if matches!(graph.kind(a), TypeKind::SetOf(_)) { "set of/SET OF" } else { "record of/SEQUENCE OF" };
                    return info.fail(format!("Incompatible {} subtypes", what));
                }
                self.compare_pair(*ea, *eb, "[]", "[]", info)
            }
            (TypeKind::Array { element: ea, size: sa }, TypeKind::Array { element: eb, size: sb }) => {
                if sa != sb {
                    return info.fail(format!("The dimensions of the arrays must be the same: {} and {}", sa, sb));
                }
                self.compare_pair(*ea, *eb, "[]", "[]", info)
            }
            (TypeKind::Primitive(pa), TypeKind::Primitive(pb)) => {
                if pa != pb {
                    return info.fail(format!("Type `{}' is not compatible with type `{}'", pa.name(), pb.name()));
                }
                match (graph.length_constraint(a), graph.length_constraint(b)) {
                    (Some(ra), Some(rb)) if !ra.intersects(&rb) => {
                        info.fail(format!("Incompatible length restrictions: {} and {}", ra, rb))
                    }
                    _ => true,
                }
            }
            (TypeKind::Enumerated(_), _) | (_, TypeKind::Enumerated(_)) => {
                info.fail("Enumerated types are compatible only with themselves")
            }
            (TypeKind::Procedure { kind, .. }, _) | (_, TypeKind::Procedure { kind, .. }) => {
                info.fail(format!("Types of {} references are compatible only when they are identical", kind.name()))
            }
            (ka, kb) => info.fail(cross_category_message(ka, kb)),
        }
    }

    fn compare_positional(&mut self, fa: &[Field], fb: &[Field], info: &mut CompatibilityInfo) -> bool {
        if fa.len() != fb.len() {
            return info.fail(format!("The number of fields must be the same: {} and {}", fa.len(), fb.len()));
        }
        for (x, y) in fa.iter().zip(fb) {
            let (left, right) = (format!(".{}", x.name), format!(".{}", y.name));
            if x.optional != y.optional {
                info.fail(format!("The optionality of fields `{}' and `{}' must be the same", x.name, y.name));
                info.prepend(&left, &right);
                return false;
            }
            if !self.compare_pair(x.ty, y.ty, &left, &right, info) {
                return false;
            }
        }
        true
    }

    /// A record or set against a list type whose elements stand in for the fields.
    fn compare_fields_with_list(
        &mut self,
        fields: &[Field],
        list: TypeId,
        record_on_left: bool,
        info: &mut CompatibilityInfo,
    ) -> bool {
        let graph = self.graph;
        let list_kind = graph.kind(list);
        let Some(element) = list_kind.element() else {
            return info.fail("A list type was expected");
        };
        if let TypeKind::Array { size, .. } = list_kind {
            if *size != fields.len() as u64 {
                return info.fail(format!(
                    "The number of fields and the array dimension must be the same: {} and {}",
                    fields.len(),
                    size
                ));
            }
        }
        if let Some(range) = graph.length_constraint(list) {
            if !range.contains(fields.len() as u64) {
                return info.fail(format!(
                    "The number of fields ({}) violates the length restriction {} of type `{}'",
                    fields.len(),
                    range,
                    graph.type_name(list)
                ));
            }
        }

        for (i, field) in fields.iter().enumerate() {
            let (field_seg, element_seg) = (format!(".{}", field.name), format!("[{}]", i));
            if field.optional {
                info.fail(format!("The optional field `{}' cannot be matched by a list element", field.name));
                if record_on_left {
                    info.prepend(&field_seg, &element_seg);
                } else {
                    info.prepend(&element_seg, &field_seg);
                }
                return false;
            }
            let ok = if record_on_left {
                self.compare_pair(field.ty, element, &field_seg, &element_seg, info)
            } else {
                self.compare_pair(element, field.ty, &element_seg, &field_seg, info)
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Loose match: one shared alternative with compatible types is enough.
    fn compare_by_name(&mut self, fa: &[Field], fb: &[Field], info: &mut CompatibilityInfo) -> bool {
        let saved = (info.error.clone(), info.left_path.clone(), info.right_path.clone());
        for x in fa {
            let Some(y) = fb.iter().find(|y| y.name == x.name) else {
                continue;
            };
            let segment = format!(".{}", x.name);
            let ok = self.compare_pair(x.ty, y.ty, &segment, &segment, info);
            (info.error, info.left_path, info.right_path) = saved.clone();
            if ok {
                return true;
            }
        }
        info.fail("No compatible field found")
    }

    fn list_lengths_agree(&self, a: TypeId, b: TypeId) -> bool {
        let graph = self.graph;
        let fixed = |id: TypeId| match graph.kind(id) {
            TypeKind::Array { size, .. } => Some(*size),
            _ => None,
        };
        match (fixed(a), fixed(b)) {
            (Some(size), None) => graph.length_constraint(b).map_or(true, |r| r.contains(size)),
            (None, Some(size)) => graph.length_constraint(a).map_or(true, |r| r.contains(size)),
            _ => match (graph.length_constraint(a), graph.length_constraint(b)) {
                (Some(ra), Some(rb)) => ra.intersects(&rb),
                _ => true,
            },
        }
    }
}

fn cross_category_message(a: &TypeKind, b: &TypeKind) -> String {
    let union_like = |k: &TypeKind| matches!(k, TypeKind::Choice(_) | TypeKind::Anytype(_));
    let set_like = |k: &TypeKind| matches!(k, TypeKind::Set(_) | TypeKind::SetOf(_));
    let record_like = |k: &TypeKind| {
        matches!(k, TypeKind::Sequence(_) | TypeKind::SequenceOf(_) | TypeKind::Array { .. })
    };

    if union_like(a) || union_like(b) {
        "union/anytype types are compatible only with other union/anytype types".to_string()
    } else if (set_like(a) && record_like(b)) || (record_like(a) && set_like(b)) {
        "set/set of types are compatible only with other set/set of types".to_string()
    } else {
        format!("Type `{}' is not compatible with type `{}'", a.keyword(), b.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LengthRange, PrimitiveKind, ProcedureKind, SubtypeConstraint, TypeGraph};
    use crate::type_system::{Category, Diagnostics};
    use rstest::rstest;

    fn int_record(g: &mut TypeGraph, names: &[&str]) -> TypeId {
        let fields = names
            .iter()
            .map(|n| {
                let int = g.primitive(PrimitiveKind::Integer);
                Field::mandatory(n, int)
            })
            .collect();
        g.sequence(fields)
    }

    #[test]
    fn test_every_type_is_compatible_with_itself() {
        let mut g = TypeGraph::new();
        let rec = int_record(&mut g, &["a", "b"]);
        let list = g.set_of(rec);
        let func = g.procedure(ProcedureKind::Function, vec![], None);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        for id in [rec, list, func] {
            assert!(checker.is_compatible(id, id, Some(&mut CompatibilityInfo::new())));
            assert!(checker.is_compatible(id, id, None));
        }
    }

    #[test]
    fn test_erroneous_type_absorbs() {
        let mut g = TypeGraph::new();
        let broken = g.reference("Missing");
        let choice = {
            let b = g.primitive(PrimitiveKind::Boolean);
            g.choice(vec![Field::mandatory("x", b)])
        };
        let rec = int_record(&mut g, &["a"]);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        assert!(checker.is_compatible(broken, choice, Some(&mut CompatibilityInfo::new())));
        assert!(checker.is_compatible(rec, broken, None));
        assert!(g.is_erroneous(broken));
    }

    #[test]
    fn test_field_count_mismatch() {
        let mut g = TypeGraph::new();
        let one = int_record(&mut g, &["a"]);
        let two = int_record(&mut g, &["a", "b"]);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let mut info = CompatibilityInfo::new();
        assert!(!checker.is_compatible(one, two, Some(&mut info)));
        assert!(info.error.unwrap().contains("number of fields"));
        assert!(!info.needs_conversion);
    }

    #[test]
    fn test_structural_match_needs_conversion_and_ignores_names() {
        let mut g = TypeGraph::new();
        let left = int_record(&mut g, &["a", "b"]);
        let right = int_record(&mut g, &["x", "y"]);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let mut info = CompatibilityInfo::new();
        assert!(checker.is_compatible(left, right, Some(&mut info)));
        assert!(info.needs_conversion);
        assert!(info.left_chain.is_empty() && info.right_chain.is_empty());
    }

    #[test]
    fn test_mismatch_path_points_at_the_field() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let float = g.primitive(PrimitiveKind::Float);
        let inner_l = g.sequence(vec![Field::mandatory("n", int)]);
        let inner_r = g.sequence(vec![Field::mandatory("m", float)]);
        let left = g.sequence(vec![Field::mandatory("inner", inner_l)]);
        let right = g.sequence(vec![Field::mandatory("other", inner_r)]);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let mut info = CompatibilityInfo::new();
        assert!(!checker.is_compatible(left, right, Some(&mut info)));
        assert_eq!(info.left_path, ".inner.n");
        assert_eq!(info.right_path, ".other.m");
    }

    #[test]
    fn test_optionality_must_line_up() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let left = g.sequence(vec![Field::mandatory("a", int)]);
        let right = g.sequence(vec![Field::optional("a", int)]);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let mut info = CompatibilityInfo::new();
        assert!(!checker.is_compatible(left, right, Some(&mut info)));
        assert!(info.error.unwrap().contains("optionality"));
        assert_eq!(info.left_path, ".a");
    }

    #[test]
    fn test_mutually_recursive_records_terminate() {
        let mut g = TypeGraph::new();
        let to_b = g.reference("B");
        let a = g.sequence(vec![Field::optional("f", to_b)]);
        g.define_type("A", a).unwrap();
        let to_a = g.reference("A");
        let b = g.sequence(vec![Field::optional("f", to_a)]);
        g.define_type("B", b).unwrap();

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let mut info = CompatibilityInfo::new();
        assert!(checker.is_compatible(a, b, Some(&mut info)));
        assert!(info.needs_conversion);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_mandatory_mutual_recursion_is_absorbed_as_erroneous() {
        let mut g = TypeGraph::new();
        let to_b = g.reference("B");
        let a = g.sequence(vec![Field::mandatory("f", to_b)]);
        g.define_type("A", a).unwrap();
        let to_a = g.reference("A");
        let b = g.sequence(vec![Field::mandatory("f", to_a)]);
        g.define_type("B", b).unwrap();

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let mut info = CompatibilityInfo::new();
        assert!(checker.is_compatible(a, b, Some(&mut info)));
        assert!(!info.needs_conversion);
        assert!(info.left_chain.is_empty() && info.right_chain.is_empty());
        assert!(g.is_erroneous(a) && g.is_erroneous(b));
        assert_eq!(diags.count(Category::Recursion), 2);
    }

    #[test]
    fn test_union_needs_one_shared_alternative() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let text = g.primitive(PrimitiveKind::Charstring);
        let left = g.choice(vec![Field::mandatory("a", text), Field::mandatory("n", int)]);
        let right = g.choice(vec![Field::mandatory("n", int), Field::mandatory("z", text)]);
        let other = g.choice(vec![Field::mandatory("a", int)]);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let mut info = CompatibilityInfo::new();
        assert!(checker.is_compatible(left, right, Some(&mut info)));
        assert!(info.error.is_none());

        let mut info = CompatibilityInfo::new();
        assert!(!checker.is_compatible(right, other, Some(&mut info)));
        assert_eq!(info.error.as_deref(), Some("No compatible field found"));
    }

    #[rstest]
    #[case(3, 3, true)]
    #[case(3, 4, false)]
    fn test_record_against_array(#[case] fields: usize, #[case] size: u64, #[case] expected: bool) {
        let mut g = TypeGraph::new();
        let names: Vec<String> = (0..fields).map(|i| format!("f{}", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let rec = int_record(&mut g, &names);
        let int = g.primitive(PrimitiveKind::Integer);
        let arr = g.array(int, size);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        assert_eq!(checker.is_compatible(rec, arr, Some(&mut CompatibilityInfo::new())), expected);
        assert_eq!(checker.is_compatible(arr, rec, Some(&mut CompatibilityInfo::new())), expected);
    }

    #[test]
    fn test_list_length_subtypes_must_overlap() {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let short = g.sequence_of(int);
        g.set_constraint(short, SubtypeConstraint::length(LengthRange::between(1, 3))).unwrap();
        let long = g.sequence_of(int);
        g.set_constraint(long, SubtypeConstraint::length(LengthRange::at_least(5))).unwrap();
        let arr = g.array(int, 2);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let mut info = CompatibilityInfo::new();
        assert!(!checker.is_compatible(short, long, Some(&mut info)));
        assert!(info.error.unwrap().contains("record of"));
        assert!(checker.is_compatible(arr, short, Some(&mut CompatibilityInfo::new())));
        assert!(!checker.is_compatible(arr, long, Some(&mut CompatibilityInfo::new())));
    }

    #[rstest]
    #[case(true, "union/anytype")]
    #[case(false, "set/set of")]
    fn test_cross_category_messages(#[case] use_union: bool, #[case] fragment: &str) {
        let mut g = TypeGraph::new();
        let int = g.primitive(PrimitiveKind::Integer);
        let rec = g.sequence(vec![Field::mandatory("a", int)]);
        let other = if use_union {
            g.choice(vec![Field::mandatory("a", int)])
        } else {
            g.set(vec![Field::mandatory("a", int)])
        };

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        let mut info = CompatibilityInfo::new();
        assert!(!checker.is_compatible(rec, other, Some(&mut info)));
        assert!(info.error.unwrap().contains(fragment));
    }

    #[test]
    fn test_distinct_procedure_types_are_nominal() {
        let mut g = TypeGraph::new();
        let f = g.procedure(ProcedureKind::Function, vec![], None);
        let h = g.procedure(ProcedureKind::Function, vec![], None);

        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        assert!(!checker.is_compatible(f, h, None));
        assert!(!checker.is_compatible(f, h, Some(&mut CompatibilityInfo::new())));
    }
}
