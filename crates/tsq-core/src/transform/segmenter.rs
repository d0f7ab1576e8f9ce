//! Splits a method's source text into literal and identifier segments.
//!
//! The walk visits the method's syntax subtree in source order and cuts the
//! requested text window at every identifier leaf. Identifiers are matched by
//! text only, never by scope: a local binding that shadows a parameter is cut
//! (and later substituted) exactly like the parameter itself.

use std::ops::Range;

use tree_sitter::Node;

use crate::errors::{QuoteError, QuoteResult};
use crate::models::{Segment, SpanKind};
use crate::transform::parser::node_text;

/// Leaf node kinds treated as identifier references.
const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "property_identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
    "statement_identifier",
    "type_identifier",
];

fn is_identifier_kind(kind: &str) -> bool {
    IDENTIFIER_KINDS.contains(&kind)
}

// ---------------------------------------------------------------------------
// Method view
// ---------------------------------------------------------------------------

/// A `method_definition` node together with the text it was parsed from.
#[derive(Clone, Debug)]
pub struct MethodSource<'t> {
    node: Node<'t>,
    /// First node of the declaration: the earliest leading decorator, or
    /// `node` itself.
    first: Node<'t>,
    source: &'t str,
    pub name: String,
    /// Declared parameter names in declaration order.
    pub parameters: Vec<String>,
}

impl<'t> MethodSource<'t> {
    pub fn from_node(node: Node<'t>, source: &'t str) -> QuoteResult<Self> {
        if node.kind() != "method_definition" {
            return Err(QuoteError::Parse(format!(
                "expected method_definition, got {}",
                node.kind()
            )));
        }
        let name = node
            .child_by_field_name("name")
            .map(|n| method_name(n, source))
            .ok_or_else(|| QuoteError::Parse("method without a name".to_string()))?;
        let parameters = declared_parameters(node, source, &name)?;
        Ok(Self {
            node,
            first: first_decorator(node),
            source,
            name,
            parameters,
        })
    }

    /// Byte window of the requested span kind.
    pub fn span(&self, kind: SpanKind) -> QuoteResult<Range<usize>> {
        match kind {
            SpanKind::FullDeclaration => Ok(self.first.start_byte()..self.node.end_byte()),
            SpanKind::BodyOnly => {
                let statements = self.body_statements();
                match (statements.first(), statements.last()) {
                    (Some(first), Some(last)) => Ok(first.start_byte()..last.end_byte()),
                    _ => Err(QuoteError::EmptyBody {
                        method: self.name.clone(),
                    }),
                }
            }
        }
    }

    /// Original source text of the requested span kind.
    pub fn text(&self, kind: SpanKind) -> QuoteResult<&'t str> {
        let window = self.span(kind)?;
        Ok(&self.source[window])
    }

    fn body_statements(&self) -> Vec<Node<'t>> {
        let Some(body) = self.node.child_by_field_name("body") else {
            return Vec::new();
        };
        let mut cursor = body.walk();
        body.named_children(&mut cursor)
            .filter(|child| child.kind() != "comment")
            .collect()
    }
}

/// Method decorators are `class_body` children preceding the method. Comments
/// between them belong to the declaration.
fn first_decorator(node: Node<'_>) -> Node<'_> {
    let mut first = node;
    let mut previous = node.prev_sibling();
    while let Some(sibling) = previous {
        match sibling.kind() {
            "decorator" => first = sibling,
            "comment" => {}
            _ => break,
        }
        previous = sibling.prev_sibling();
    }
    first
}

/// Whether `node` is an ordinary method: not an accessor and not a constructor.
pub fn is_ordinary_method(node: Node<'_>, source: &str) -> bool {
    if node.kind() != "method_definition" {
        return false;
    }
    let name = node
        .child_by_field_name("name")
        .map(|n| method_name(n, source))
        .unwrap_or_default();
    if name == "constructor" {
        return false;
    }
    let mut cursor = node.walk();
    let is_accessor = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && matches!(child.kind(), "get" | "set"));
    !is_accessor
}

/// Method name as written, with the quotes of string-literal names removed.
fn method_name(name: Node<'_>, source: &str) -> String {
    let text = node_text(name, source);
    if name.kind() == "string" && text.len() >= 2 {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

/// Whether the method's name is computed (`[expr]() {}`) and so has no
/// static key.
pub fn has_computed_name(node: Node<'_>) -> bool {
    node.child_by_field_name("name")
        .is_some_and(|n| n.kind() == "computed_property_name")
}

fn declared_parameters(node: Node<'_>, source: &str, method: &str) -> QuoteResult<Vec<String>> {
    let Some(params) = node.child_by_field_name("parameters") else {
        return Ok(Vec::new());
    };
    let mut names = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        if !matches!(param.kind(), "required_parameter" | "optional_parameter") {
            continue;
        }
        let Some(pattern) = param.child_by_field_name("pattern") else {
            continue;
        };
        match pattern.kind() {
            "identifier" => names.push(node_text(pattern, source).to_string()),
            // `this: Foo` only types the receiver
            "this" => {}
            "rest_pattern" => {
                let inner = pattern
                    .named_child(0)
                    .filter(|n| n.kind() == "identifier")
                    .ok_or_else(|| QuoteError::UnsupportedParameter {
                        method: method.to_string(),
                        parameter: node_text(pattern, source).to_string(),
                    })?;
                names.push(node_text(inner, source).to_string());
            }
            _ => {
                return Err(QuoteError::UnsupportedParameter {
                    method: method.to_string(),
                    parameter: node_text(pattern, source).to_string(),
                })
            }
        }
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

struct Walker<'a> {
    source: &'a str,
    method_name: &'a str,
    window: Range<usize>,
    cursor: usize,
    segments: Vec<Segment>,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node<'_>) {
        if node.end_byte() <= self.window.start || node.start_byte() >= self.window.end {
            return;
        }
        if node.child_count() == 0 {
            self.leaf(node);
            return;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn leaf(&mut self, node: Node<'_>) {
        if !is_identifier_kind(node.kind())
            || node.start_byte() < self.window.start
            || node.end_byte() > self.window.end
        {
            return;
        }
        let text = node_text(node, self.source);
        if text.is_empty() || text == self.method_name {
            return;
        }
        self.flush(node.start_byte());
        self.segments.push(Segment::IdentifierRef(text.to_string()));
        self.cursor = node.end_byte();
    }

    fn flush(&mut self, until: usize) {
        if until > self.cursor {
            self.segments
                .push(Segment::Literal(self.source[self.cursor..until].to_string()));
        }
    }
}

/// Cut the `kind` span of `method` into ordered segments.
pub fn segment(method: &MethodSource<'_>, kind: SpanKind) -> QuoteResult<Vec<Segment>> {
    let window = method.span(kind)?;
    let mut walker = Walker {
        source: method.source,
        method_name: &method.name,
        cursor: window.start,
        window: window.clone(),
        segments: Vec::new(),
    };
    let mut current = Some(method.first);
    while let Some(node) = current {
        walker.visit(node);
        if node.id() == method.node.id() {
            break;
        }
        current = node.next_sibling();
    }
    walker.flush(window.end);
    Ok(walker.segments)
}

/// Everything the synthesizers need to know about one method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodExtraction {
    pub name: String,
    pub parameters: Vec<String>,
    pub full_declaration: Vec<Segment>,
    pub body_only: Vec<Segment>,
}

impl MethodExtraction {
    pub fn segments(&self, kind: SpanKind) -> &[Segment] {
        match kind {
            SpanKind::FullDeclaration => &self.full_declaration,
            SpanKind::BodyOnly => &self.body_only,
        }
    }
}

/// Segment both span kinds of `method`.
pub fn extract(method: &MethodSource<'_>) -> QuoteResult<MethodExtraction> {
    Ok(MethodExtraction {
        name: method.name.clone(),
        parameters: method.parameters.clone(),
        full_declaration: segment(method, SpanKind::FullDeclaration)?,
        body_only: segment(method, SpanKind::BodyOnly)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::reconstruct;
    use crate::transform::parser::{parse_source, Dialect, ParsedUnit};

    pub(crate) fn parse(source: &str) -> ParsedUnit {
        parse_source("test.ts", source.to_string(), Dialect::TypeScript).unwrap()
    }

    /// Collect every method_definition in source order.
    pub(crate) fn methods(unit: &ParsedUnit) -> Vec<MethodSource<'_>> {
        fn collect<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
            if node.kind() == "method_definition" {
                out.push(node);
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                collect(child, out);
            }
        }
        let mut nodes = Vec::new();
        collect(unit.tree.root_node(), &mut nodes);
        nodes
            .into_iter()
            .map(|n| MethodSource::from_node(n, &unit.source).unwrap())
            .collect()
    }

    const ADD: &str = "class Hello {\n  add(a: number, b: number) {\n    return a + b;\n  }\n}\n";

    #[test]
    fn test_body_segments_scenario() {
        let unit = parse(ADD);
        let method = &methods(&unit)[0];
        let segments = segment(method, SpanKind::BodyOnly).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("return ".into()),
                Segment::IdentifierRef("a".into()),
                Segment::Literal(" + ".into()),
                Segment::IdentifierRef("b".into()),
                Segment::Literal(";".into()),
            ]
        );
    }

    #[test]
    fn test_full_declaration_excludes_method_name() {
        let unit = parse(ADD);
        let method = &methods(&unit)[0];
        let segments = segment(method, SpanKind::FullDeclaration).unwrap();
        assert_eq!(segments[0], Segment::Literal("add(".into()));
        assert!(!segments.contains(&Segment::IdentifierRef("add".into())));
        assert_eq!(
            reconstruct(&segments),
            "add(a: number, b: number) {\n    return a + b;\n  }"
        );
    }

    #[test]
    fn test_full_declaration_includes_method_decorators() {
        let unit = parse(
            "class A {\n  other() { return 1; }\n  @memo\n  @trace('f')\n  f(a: number) { return a; }\n}\n",
        );
        let method = &methods(&unit)[1];
        assert_eq!(
            method.text(SpanKind::FullDeclaration).unwrap(),
            "@memo\n  @trace('f')\n  f(a: number) { return a; }"
        );
        let segments = segment(method, SpanKind::FullDeclaration).unwrap();
        assert_eq!(segments[0], Segment::Literal("@".into()));
        assert_eq!(segments[1], Segment::IdentifierRef("memo".into()));
        assert_eq!(
            reconstruct(&segments),
            "@memo\n  @trace('f')\n  f(a: number) { return a; }"
        );
        assert_eq!(
            segment(method, SpanKind::BodyOnly).unwrap(),
            vec![
                Segment::Literal("return ".into()),
                Segment::IdentifierRef("a".into()),
                Segment::Literal(";".into()),
            ]
        );
    }

    #[test]
    fn test_reconstruction_invariant_nested_expressions() {
        let source = r#"
class Calc {
  // leading comment
  fold(items: number[], seed: number): number {
    let acc = seed; // running total
    for (const item of items) {
      if (item > limits.max) { continue; }
      acc = Math.max(acc, helper({ item, seed }).value);
    }
    return this.fold([], acc) + `${seed}`;
  }
}
"#;
        let unit = parse(source);
        let method = &methods(&unit)[0];
        for kind in SpanKind::ALL {
            let segments = segment(method, kind).unwrap();
            assert_eq!(reconstruct(&segments), method.text(kind).unwrap());
        }
        let body = segment(method, SpanKind::BodyOnly).unwrap();
        let names: Vec<&str> = body
            .iter()
            .filter_map(|s| match s {
                Segment::IdentifierRef(n) => Some(n.as_str()),
                Segment::Literal(_) => None,
            })
            .collect();
        assert!(names.contains(&"limits"));
        assert!(names.contains(&"max"));
        assert!(names.contains(&"helper"));
        assert!(!names.contains(&"fold"));
    }

    #[test]
    fn test_body_span_excludes_braces_and_comments() {
        let source = "class A {\n  f(x) {\n    // note\n    x++;\n    return x; // done\n  }\n}\n";
        let unit = parse(source);
        let method = &methods(&unit)[0];
        assert_eq!(method.text(SpanKind::BodyOnly).unwrap(), "x++;\n    return x;");
    }

    #[test]
    fn test_segments_may_start_and_end_with_identifier() {
        let source = "class A {\n  f(x) {\n    x\n  }\n}\n";
        let unit = parse(source);
        let method = &methods(&unit)[0];
        let segments = segment(method, SpanKind::BodyOnly).unwrap();
        assert_eq!(segments, vec![Segment::IdentifierRef("x".into())]);
    }

    #[test]
    fn test_empty_body_fails_for_body_only() {
        let unit = parse("class A {\n  noop() {}\n}\n");
        let method = &methods(&unit)[0];
        let err = segment(method, SpanKind::BodyOnly).unwrap_err();
        assert!(matches!(err, QuoteError::EmptyBody { ref method } if method == "noop"));
        assert!(segment(method, SpanKind::FullDeclaration).is_ok());
    }

    #[test]
    fn test_declared_parameters() {
        let unit = parse("class A {\n  f(this: A, a: string, b?: number, ...rest: string[]) { return a; }\n}\n");
        let method = &methods(&unit)[0];
        assert_eq!(method.parameters, vec!["a", "b", "rest"]);
    }

    #[test]
    fn test_destructured_parameter_rejected() {
        let unit = parse("class A {\n  f({ a }: { a: number }) { return a; }\n}\n");
        let mut cursor = unit.tree.root_node().walk();
        let class = unit.tree.root_node().named_children(&mut cursor).next().unwrap();
        let body = class.child_by_field_name("body").unwrap();
        let node = body.named_child(0).unwrap();
        let err = MethodSource::from_node(node, &unit.source).unwrap_err();
        assert!(matches!(err, QuoteError::UnsupportedParameter { .. }));
    }

    #[test]
    fn test_ordinary_method_detection() {
        let source = "class A {\n  constructor() { this.v = 1; }\n  get value() { return 1; }\n  set value(v) { }\n  run() { return 2; }\n}\n";
        let unit = parse(source);
        let mut cursor = unit.tree.root_node().walk();
        let class = unit.tree.root_node().named_children(&mut cursor).next().unwrap();
        let body = class.child_by_field_name("body").unwrap();
        let mut body_cursor = body.walk();
        let ordinary: Vec<&str> = body
            .named_children(&mut body_cursor)
            .filter(|m| is_ordinary_method(*m, &unit.source))
            .map(|m| node_text(m.child_by_field_name("name").unwrap(), &unit.source))
            .collect();
        assert_eq!(ordinary, vec!["run"]);
    }

    #[test]
    fn test_extract_pairs_both_spans() {
        let unit = parse(ADD);
        let extraction = extract(&methods(&unit)[0]).unwrap();
        assert_eq!(extraction.name, "add");
        assert_eq!(extraction.parameters, vec!["a", "b"]);
        assert_eq!(
            reconstruct(extraction.segments(SpanKind::BodyOnly)),
            "return a + b;"
        );
    }
}
