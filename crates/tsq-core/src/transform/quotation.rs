//! Per-method quotation: the `func` and `body` templates of one method.

use serde::{Deserialize, Serialize};

use crate::errors::QuoteResult;
use crate::models::SpanKind;
use crate::transform::segmenter::{extract, MethodExtraction, MethodSource};
use crate::transform::template::{synthesize, Template};

/// The pair of templates quoting one method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotation {
    /// Reconstructs the full method declaration.
    pub func: Template,
    /// Reconstructs the body statements only.
    pub body: Template,
}

impl Quotation {
    pub fn template(&self, kind: SpanKind) -> &Template {
        match kind {
            SpanKind::FullDeclaration => &self.func,
            SpanKind::BodyOnly => &self.body,
        }
    }

    pub fn arity(&self) -> usize {
        self.func.arity()
    }
}

/// Build both templates from an extraction.
pub fn quote_extraction(extraction: MethodExtraction) -> Quotation {
    Quotation {
        func: synthesize(&extraction.parameters, extraction.full_declaration),
        body: synthesize(&extraction.parameters, extraction.body_only),
    }
}

/// Segment and synthesize `method` for both span kinds.
pub fn quote(method: &MethodSource<'_>) -> QuoteResult<Quotation> {
    extract(method).map(quote_extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QuoteError;
    use crate::transform::segmenter::tests::{methods, parse};

    #[test]
    fn test_quote_scenarios() {
        let unit = parse("class Hello {\n  add(a: number, b: number) {\n    return a + b;\n  }\n}\n");
        let quotation = quote(&methods(&unit)[0]).unwrap();
        assert_eq!(quotation.arity(), 2);
        assert_eq!(quotation.body.render_str(&["x", "y"]).unwrap(), "return x + y;");
        assert_eq!(
            quotation.func.render_str(&["x", "y"]).unwrap(),
            "add(x: number, y: number) {\n    return x + y;\n  }"
        );
    }

    #[test]
    fn test_identity_substitution_reproduces_source() {
        let unit = parse(
            "class A {\n  greet(name: string, times = 2) {\n    const s = `hi ${name}`;\n    return s.repeat(times);\n  }\n}\n",
        );
        let method = &methods(&unit)[0];
        let quotation = quote(method).unwrap();
        let original: Vec<&str> = method.parameters.iter().map(String::as_str).collect();
        for kind in SpanKind::ALL {
            assert_eq!(
                quotation.template(kind).render_str(&original).unwrap(),
                method.text(kind).unwrap()
            );
        }
    }

    #[test]
    fn test_quote_surfaces_empty_body() {
        let unit = parse("class A {\n  noop(a) {}\n}\n");
        let err = quote(&methods(&unit)[0]).unwrap_err();
        assert!(matches!(err, QuoteError::EmptyBody { .. }));
    }

    #[test]
    fn test_shadowing_binding_is_substituted_by_text() {
        let unit = parse(
            "class A {\n  f(a) {\n    const g = (a) => a * 2;\n    return g(a);\n  }\n}\n",
        );
        let quotation = quote(&methods(&unit)[0]).unwrap();
        assert_eq!(
            quotation.body.render_str(&["x"]).unwrap(),
            "const g = (x) => x * 2;\n    return g(x);"
        );
    }

    #[test]
    fn test_zero_parameter_method() {
        let unit = parse("class A {\n  now() { return Date.now(); }\n}\n");
        let quotation = quote(&methods(&unit)[0]).unwrap();
        assert_eq!(quotation.arity(), 0);
        assert_eq!(quotation.body.render_str(&[]).unwrap(), "return Date.now();");
    }
}
