//! Quotation pass over one source file.
//!
//! Scans the top-level statements of a parsed file. Every class carrying the
//! marker decorator has the decorator removed and its repository registration
//! inserted right after the class statement. All other text is copied through
//! unchanged, so a file without marked classes comes out byte-identical.

use tracing::{debug, warn};
use tree_sitter::Node;

use crate::errors::{QuoteError, QuoteResult};
use crate::models::{is_identifier, ClassId, DEFAULT_MARKER, DEFAULT_REGISTER_CALL};
use crate::transform::parser::{node_text, parse_source, Dialect, ParsedUnit};
use crate::transform::quotation::quote;
use crate::transform::repository::{build_registration, Repository};
use crate::transform::segmenter::{has_computed_name, is_ordinary_method, MethodSource};

const CLASS_KINDS: &[&str] = &["class_declaration", "abstract_class_declaration", "class"];

/// Knobs of the pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassOptions {
    /// Decorator expression text that marks a class.
    pub marker: String,
    /// Callee of the emitted registration statement.
    pub register_call: String,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            register_call: DEFAULT_REGISTER_CALL.to_string(),
        }
    }
}

/// Result of running the pass on one file.
#[derive(Clone, Debug)]
pub struct TransformOutput {
    pub source: String,
    pub repositories: Vec<Repository>,
}

impl TransformOutput {
    pub fn is_changed(&self) -> bool {
        !self.repositories.is_empty()
    }

    pub fn methods_quoted(&self) -> usize {
        self.repositories.iter().map(Repository::len).sum()
    }
}

struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Parse and transform `source`.
pub fn transform_source(
    path: &str,
    source: &str,
    dialect: Dialect,
    options: &PassOptions,
) -> QuoteResult<TransformOutput> {
    let unit = parse_source(path, source.to_string(), dialect)?;
    transform(&unit, options)
}

/// Run the pass on a parsed unit.
pub fn transform(unit: &ParsedUnit, options: &PassOptions) -> QuoteResult<TransformOutput> {
    let source = unit.source.as_str();
    let root = unit.tree.root_node();
    let mut edits: Vec<Edit> = Vec::new();
    let mut repositories = Vec::new();

    let newline = line_ending(source);

    let mut cursor = root.walk();
    for statement in root.named_children(&mut cursor) {
        let Some(class) = class_of(statement) else {
            continue;
        };
        let markers = marker_decorators(statement, class, source, &options.marker);
        if markers.is_empty() {
            continue;
        }

        let name_node = class
            .child_by_field_name("name")
            .ok_or(QuoteError::AnonymousClass {
                offset: class.start_byte(),
            })?;
        let class_name = node_text(name_node, source);
        let class_id = ClassId::for_path(&unit.path, class_name);
        debug!(class = %class_id, "quoting marked class");

        let repository = extract_class(class, source, class_id)?;

        for marker in markers {
            let end = marker
                .next_sibling()
                .map(|next| next.start_byte())
                .unwrap_or(marker.end_byte());
            edits.push(Edit {
                start: marker.start_byte(),
                end,
                text: String::new(),
            });
        }
        let registration = build_registration(
            class_name,
            &repository,
            &options.register_call,
            unit.dialect.is_typed(),
            newline,
        );
        edits.push(Edit {
            start: statement.end_byte(),
            end: statement.end_byte(),
            text: format!("{newline}{registration}"),
        });
        repositories.push(repository);
    }

    Ok(TransformOutput {
        source: apply_edits(source, edits),
        repositories,
    })
}

/// Collect the quotations of every ordinary method of `class`.
pub fn extract_class(class: Node<'_>, source: &str, class_id: ClassId) -> QuoteResult<Repository> {
    let mut repository = Repository::new(class_id);
    let Some(body) = class.child_by_field_name("body") else {
        return Ok(repository);
    };

    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        if !is_ordinary_method(member, source) {
            continue;
        }
        if has_computed_name(member) {
            warn!(
                class = %repository.class,
                member = node_text(member, source).lines().next().unwrap_or(""),
                "skipping method with computed name"
            );
            continue;
        }
        let method = MethodSource::from_node(member, source)?;
        let quotation = quote(&method)?;
        debug!(
            class = %repository.class,
            method = %method.name,
            arity = method.parameters.len(),
            "quoted method"
        );
        if repository.insert(method.name.clone(), quotation).is_some() {
            warn!(
                class = %repository.class,
                method = %method.name,
                "duplicate method name, keeping the last definition"
            );
        }
    }
    Ok(repository)
}

/// Extract the repository of the top-level class `name`, marked or not,
/// without rewriting anything.
pub fn extract_named_class(unit: &ParsedUnit, name: &str) -> QuoteResult<Option<Repository>> {
    let source = unit.source.as_str();
    let root = unit.tree.root_node();
    let mut cursor = root.walk();
    let found = root
        .named_children(&mut cursor)
        .filter_map(class_of)
        .find(|class| {
            class
                .child_by_field_name("name")
                .is_some_and(|n| node_text(n, source) == name)
        });
    match found {
        Some(class) => extract_class(class, source, ClassId::for_path(&unit.path, name)).map(Some),
        None => Ok(None),
    }
}

/// The class declared by a top-level statement, if any.
fn class_of(statement: Node<'_>) -> Option<Node<'_>> {
    if CLASS_KINDS.contains(&statement.kind()) {
        return Some(statement);
    }
    if statement.kind() == "export_statement" {
        return statement
            .child_by_field_name("declaration")
            .or_else(|| statement.child_by_field_name("value"))
            .filter(|decl| CLASS_KINDS.contains(&decl.kind()));
    }
    None
}

/// Marker decorators on the statement and, when exported, on the class itself.
fn marker_decorators<'t>(
    statement: Node<'t>,
    class: Node<'t>,
    source: &str,
    marker: &str,
) -> Vec<Node<'t>> {
    let mut hosts = vec![statement];
    if class.id() != statement.id() {
        hosts.push(class);
    }
    let mut found = Vec::new();
    for host in hosts {
        let mut cursor = host.walk();
        for decorator in host.children_by_field_name("decorator", &mut cursor) {
            if is_marker(decorator, source, marker) {
                found.push(decorator);
            }
        }
    }
    found
}

fn is_marker(decorator: Node<'_>, source: &str, marker: &str) -> bool {
    decorator
        .named_child(0)
        .is_some_and(|expr| node_text(expr, source) == marker)
}

/// Line ending of the first line of `source`; `\n` when there is none.
fn line_ending(source: &str) -> &'static str {
    match source.find('\n') {
        Some(i) if source[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    if edits.is_empty() {
        return source.to_string();
    }
    edits.sort_by_key(|e| (e.start, e.end));
    let mut out = String::with_capacity(source.len() + edits.iter().map(|e| e.text.len()).sum::<usize>());
    let mut last = 0;
    for edit in edits {
        out.push_str(&source[last..edit.start]);
        out.push_str(&edit.text);
        last = edit.end;
    }
    out.push_str(&source[last..]);
    out
}

/// Validate pass options against the identifier shape they must have.
pub fn validate_options(options: &PassOptions) -> QuoteResult<()> {
    if !is_identifier(&options.marker) {
        return Err(QuoteError::Config(format!(
            "marker `{}` is not an identifier",
            options.marker
        )));
    }
    if options.register_call.split('.').any(|part| !is_identifier(part)) {
        return Err(QuoteError::Config(format!(
            "register call `{}` is not a dotted identifier path",
            options.register_call
        )));
    }
    Ok(())
}
