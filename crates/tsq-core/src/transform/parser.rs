//! Language parsing wrapper used by the quotation pass.
//!
//! Every supported dialect is parsed with the native tree-sitter TypeScript
//! grammars. Plain JavaScript goes through the TSX grammar, which accepts
//! JSX and has no `<T>expr` casts to misread; it only differs in how
//! generated code is annotated.

use std::path::Path;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::errors::{QuoteError, QuoteResult};

/// Source dialect, decided by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    TypeScript,
    Tsx,
    JavaScript,
}

const DIALECT_BY_EXTENSION: &[(&str, Dialect)] = &[
    (".ts", Dialect::TypeScript),
    (".mts", Dialect::TypeScript),
    (".cts", Dialect::TypeScript),
    (".tsx", Dialect::Tsx),
    (".js", Dialect::JavaScript),
    (".mjs", Dialect::JavaScript),
];

impl Dialect {
    fn language(self) -> Language {
        match self {
            Dialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Dialect::Tsx | Dialect::JavaScript => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    /// Whether generated functions should carry type annotations.
    pub fn is_typed(self) -> bool {
        !matches!(self, Dialect::JavaScript)
    }
}

/// Detect the dialect of `path`. Declaration files (`.d.ts`) have no method
/// bodies to quote and yield `None`.
pub fn detect_dialect(path: &str) -> Option<Dialect> {
    let lower = path.to_lowercase();
    if lower.ends_with(".d.ts") || lower.ends_with(".d.mts") || lower.ends_with(".d.cts") {
        return None;
    }
    let ext = Path::new(&lower)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))?;
    DIALECT_BY_EXTENSION
        .iter()
        .find(|(e, _)| *e == ext.as_str())
        .map(|(_, dialect)| *dialect)
}

/// Parsed source unit: raw text plus its tree-sitter tree.
pub struct ParsedUnit {
    pub path: String,
    pub dialect: Dialect,
    pub source: String,
    pub tree: Tree,
}

impl std::fmt::Debug for ParsedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedUnit")
            .field("path", &self.path)
            .field("dialect", &self.dialect)
            .field("len", &self.source.len())
            .finish()
    }
}

/// Parse `source` as `dialect`. Sources containing syntax errors are rejected
/// with the position of the first error node.
pub fn parse_source(path: &str, source: String, dialect: Dialect) -> QuoteResult<ParsedUnit> {
    let mut parser = Parser::new();
    parser
        .set_language(&dialect.language())
        .map_err(|e| QuoteError::Parse(format!("failed to set language: {e}")))?;

    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| QuoteError::Parse(format!("failed to parse {path}")))?;

    if tree.root_node().has_error() {
        let location = first_error(tree.root_node())
            .map(|node| {
                let point = node.start_position();
                format!("{}:{}", point.row + 1, point.column + 1)
            })
            .unwrap_or_else(|| "?".to_string());
        return Err(QuoteError::Parse(format!(
            "syntax error in {path} at {location}"
        )));
    }

    Ok(ParsedUnit {
        path: path.to_string(),
        dialect,
        source,
        tree,
    })
}

/// Read and parse the file at `path`, detecting its dialect.
pub fn parse_file(path: &Path) -> QuoteResult<ParsedUnit> {
    let display = path.to_string_lossy().replace('\\', "/");
    let dialect = detect_dialect(&display)
        .ok_or_else(|| QuoteError::Parse(format!("unsupported file type: {display}")))?;
    let source = std::fs::read_to_string(path)?;
    parse_source(&display, source, dialect)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error())
        .find_map(first_error)
}

pub(crate) fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}
