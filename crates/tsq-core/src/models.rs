//! Shared typed models used across the transform, runtime, and driver layers.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{QuoteError, QuoteResult};

// ---------------------------------------------------------------------------
// Marker / runtime contract constants
// ---------------------------------------------------------------------------

/// Decorator name that selects a class for quotation.
pub const DEFAULT_MARKER: &str = "quoted";

/// Call emitted after every marked class to register its repository.
pub const DEFAULT_REGISTER_CALL: &str = "quoted.saveRepo";

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Whether `text` has the lexical shape of an identifier.
pub fn is_identifier(text: &str) -> bool {
    IDENT_RE.is_match(text)
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One contiguous piece of quoted source text.
///
/// Concatenating `Literal` text and `IdentifierRef` names in order gives back
/// the exact span the segments were cut from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Segment {
    Literal(String),
    IdentifierRef(String),
}

impl Segment {
    /// The source text this segment was cut from.
    pub fn text(&self) -> &str {
        match self {
            Segment::Literal(text) | Segment::IdentifierRef(text) => text,
        }
    }
}

/// Concatenate segment texts, identifier references by their original name.
pub fn reconstruct(segments: &[Segment]) -> String {
    segments.iter().map(Segment::text).collect()
}

// ---------------------------------------------------------------------------
// SpanKind
// ---------------------------------------------------------------------------

/// Which textual region of a method a quotation covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// The whole method declaration, signature included.
    FullDeclaration,
    /// First body statement through last body statement, braces excluded.
    BodyOnly,
}

impl SpanKind {
    pub const ALL: [SpanKind; 2] = [SpanKind::FullDeclaration, SpanKind::BodyOnly];

    pub fn as_str(self) -> &'static str {
        match self {
            SpanKind::FullDeclaration => "func",
            SpanKind::BodyOnly => "body",
        }
    }
}

impl FromStr for SpanKind {
    type Err = QuoteError;

    fn from_str(s: &str) -> QuoteResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "func" | "full" | "declaration" | "full_declaration" => Ok(SpanKind::FullDeclaration),
            "body" | "body_only" => Ok(SpanKind::BodyOnly),
            _ => Err(QuoteError::UnsupportedSpanKind(s.to_string())),
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ident
// ---------------------------------------------------------------------------

/// A string known to match `^[A-Za-z_$][A-Za-z0-9_$]*$`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(text: impl Into<String>) -> QuoteResult<Self> {
        let text = text.into();
        if is_identifier(&text) {
            Ok(Self(text))
        } else {
            Err(QuoteError::InvalidIdentifier(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Ident {
    type Err = QuoteError;

    fn from_str(s: &str) -> QuoteResult<Self> {
        Ident::new(s)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ClassId
// ---------------------------------------------------------------------------

/// Stable identity of a marked class: the dotted module path plus class name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId {
    pub module: String,
    pub name: String,
}

impl ClassId {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Identity of `name` declared in the file at `path`.
    pub fn for_path(path: &str, name: impl Into<String>) -> Self {
        Self::new(to_module_name(path), name)
    }

    pub fn qualified_name(&self) -> String {
        if self.module.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.module, self.name)
        }
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Convert a file path to a dotted module name.
///
/// Strips the file extension and joins the normal path components with dots.
pub fn to_module_name(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let without_ext = Path::new(&normalized).with_extension("");
    let parts: Vec<&str> = without_ext
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(os) => os.to_str(),
            _ => None,
        })
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    parts.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_shape() {
        assert!(is_identifier("a"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("$el"));
        assert!(is_identifier("camelCase9"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("a b"));
    }

    #[test]
    fn test_ident_rejects_bad_shape() {
        assert!(Ident::new("x").is_ok());
        let err = Ident::new("x y").unwrap_err();
        assert!(matches!(err, QuoteError::InvalidIdentifier(ref s) if s == "x y"));
    }

    #[test]
    fn test_span_kind_parse() {
        assert_eq!("func".parse::<SpanKind>().unwrap(), SpanKind::FullDeclaration);
        assert_eq!("Body".parse::<SpanKind>().unwrap(), SpanKind::BodyOnly);
        let err = "signature".parse::<SpanKind>().unwrap_err();
        assert!(matches!(err, QuoteError::UnsupportedSpanKind(ref s) if s == "signature"));
    }

    #[test]
    fn test_reconstruct_concatenates_in_order() {
        let segments = vec![
            Segment::IdentifierRef("a".into()),
            Segment::Literal(" + ".into()),
            Segment::IdentifierRef("b".into()),
        ];
        assert_eq!(reconstruct(&segments), "a + b");
    }

    #[test]
    fn test_class_id_from_path() {
        let id = ClassId::for_path("src/greeting/hello.ts", "Hello");
        assert_eq!(id.module, "src.greeting.hello");
        assert_eq!(id.qualified_name(), "src.greeting.hello.Hello");
    }

    #[test]
    fn test_to_module_name_no_extension() {
        assert_eq!(to_module_name("foo/bar/baz"), "foo.bar.baz");
        assert_eq!(to_module_name("./foo.mts"), "foo");
    }
}
