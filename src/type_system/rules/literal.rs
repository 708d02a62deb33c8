//! Specific literals against primitive types.
use super::super::checker::TypeChecker;
use super::super::error::{Category, Diagnostic, DiagnosticSink};
use crate::graph::{LengthRange, Location, PrimitiveKind};
use crate::tree::Literal;

fn kind_accepts(kind: PrimitiveKind, literal: &Literal) -> bool {
    matches!(
        (kind, literal),
        (PrimitiveKind::Integer, Literal::Integer(_))
            | (PrimitiveKind::Float, Literal::Float(_))
            | (PrimitiveKind::Boolean, Literal::Boolean(_))
            | (PrimitiveKind::Charstring, Literal::Charstring(_))
            | (PrimitiveKind::UniversalCharstring, Literal::Charstring(_) | Literal::UniversalCharstring(_))
            | (PrimitiveKind::Bitstring, Literal::Bitstring(_))
            | (PrimitiveKind::Hexstring, Literal::Hexstring(_))
            | (PrimitiveKind::Octetstring, Literal::Octetstring(_))
            | (PrimitiveKind::Verdict, Literal::Verdict(_))
    )
}

fn malformed_digits(literal: &Literal) -> Option<String> {
    match literal {
        Literal::Bitstring(s) if !s.chars().all(|c| c == '0' || c == '1') => {
            Some(format!("Bitstring literal `'{}'B' contains invalid characters", s))
        }
        Literal::Hexstring(s) if !s.chars().all(|c| c.is_ascii_hexdigit()) => {
            Some(format!("Hexstring literal `'{}'H' contains invalid characters", s))
        }
        Literal::Octetstring(s) if !s.chars().all(|c| c.is_ascii_hexdigit()) => {
            Some(format!("Octetstring literal `'{}'O' contains invalid characters", s))
        }
        Literal::Octetstring(s) if s.len() % 2 != 0 => Some(format!(
            "Octetstring literal `'{}'O' must contain an even number of hexadecimal digits",
            s
        )),
        _ => None,
    }
}

impl<'a> TypeChecker<'a> {
    /// `length` is the constraint of the governing type, if any.
    pub(crate) fn check_literal(
        &mut self,
        kind: PrimitiveKind,
        literal: &Literal,
        length: Option<LengthRange>,
        string_element: bool,
        location: Location,
    ) {
        if !kind_accepts(kind, literal) {
            self.sink.report(Diagnostic::error(
                Category::TypeMismatch,
                location,
                format!("{} value was expected instead of {}", kind.name(), literal.describe()),
            ));
            return;
        }
        if let Some(message) = malformed_digits(literal) {
            self.sink.report(Diagnostic::error(Category::TypeMismatch, location, message));
            return;
        }

        let Some(len) = literal.string_len() else {
            return;
        };
        if string_element && len != 1 {
            self.sink.report(Diagnostic::error(
                Category::LengthRestriction,
                location,
                format!("The length of a string element must be exactly 1 instead of {}", len),
            ));
        }
        if let Some(range) = length {
            if !range.contains(len) {
                self.sink.report(Diagnostic::error(
                    Category::LengthRestriction,
                    location,
                    format!("The length of the {} value ({}) violates the subtype restriction {}", kind.name(), len, range),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeGraph;
    use crate::type_system::Diagnostics;
    use rstest::rstest;

    #[rstest]
    #[case(PrimitiveKind::Integer, Literal::Integer(3), None, false, 0)]
    #[case(PrimitiveKind::Integer, Literal::Float(3.0), None, false, 1)]
    #[case(PrimitiveKind::UniversalCharstring, Literal::Charstring("ab".into()), None, false, 0)]
    #[case(PrimitiveKind::Bitstring, Literal::Bitstring("0120".into()), None, false, 1)]
    #[case(PrimitiveKind::Octetstring, Literal::Octetstring("ABC".into()), None, false, 1)]
    #[case(PrimitiveKind::Charstring, Literal::Charstring("abcd".into()), Some(LengthRange::between(1, 3)), false, 1)]
    #[case(PrimitiveKind::Charstring, Literal::Charstring("ab".into()), None, true, 1)]
    #[case(PrimitiveKind::Hexstring, Literal::Hexstring("F".into()), Some(LengthRange::exactly(1)), true, 0)]
    fn test_literals(
        #[case] kind: PrimitiveKind,
        #[case] literal: Literal,
        #[case] length: Option<LengthRange>,
        #[case] string_element: bool,
        #[case] errors: usize,
    ) {
        let g = TypeGraph::new();
        let mut diags = Diagnostics::new();
        let mut checker = TypeChecker::new(&g, &mut diags);
        checker.check_literal(kind, &literal, length, string_element, Location::default());
        assert_eq!(checker.error_count(), errors);
    }
}
