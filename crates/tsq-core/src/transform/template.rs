//! Template synthesis: turns a segment list into a parameterised callable.
//!
//! A [`Template`] is interpreted at call time: each identifier reference is
//! looked up in the declared parameter list by linear scan (method arities are
//! small) and replaced by the argument at the matching position. The same
//! template can also be rendered as a TypeScript arrow function with the
//! substitution unrolled into a template literal, which is what the
//! registration statement embeds.

use serde::{Deserialize, Serialize};

use crate::errors::{QuoteError, QuoteResult};
use crate::models::{Ident, Segment};

/// A quotation callable over `parameters.len()` identifier arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    parameters: Vec<String>,
    segments: Vec<Segment>,
}

/// Build a template whose parameter contract is `parameters`.
pub fn synthesize(parameters: &[String], segments: Vec<Segment>) -> Template {
    Template {
        parameters: parameters.to_vec(),
        segments,
    }
}

impl Template {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p == name)
    }

    /// Reconstruct the quoted text with `args[i]` standing in for parameter `i`.
    pub fn render(&self, args: &[Ident]) -> QuoteResult<String> {
        if args.len() != self.arity() {
            return Err(QuoteError::ArityMismatch {
                expected: self.arity(),
                got: args.len(),
            });
        }
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::IdentifierRef(name) => match self.position(name) {
                    Some(i) => out.push_str(args[i].as_str()),
                    None => out.push_str(name),
                },
            }
        }
        Ok(out)
    }

    /// Like [`Template::render`], validating identifier shape first.
    pub fn render_str(&self, args: &[&str]) -> QuoteResult<String> {
        if args.len() != self.arity() {
            return Err(QuoteError::ArityMismatch {
                expected: self.arity(),
                got: args.len(),
            });
        }
        let idents = args
            .iter()
            .map(|a| Ident::new(*a))
            .collect::<QuoteResult<Vec<_>>>()?;
        self.render(&idents)
    }

    /// The original text, every parameter substituted by itself.
    pub fn render_original(&self) -> String {
        self.segments.iter().map(Segment::text).collect()
    }

    /// Render as a TypeScript arrow function over the original parameter
    /// names, returning a template literal.
    pub fn to_typescript(&self, typed: bool) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                if typed {
                    format!("{p}: string")
                } else {
                    p.clone()
                }
            })
            .collect();
        let ret = if typed { ": string" } else { "" };

        let mut literal = String::from("`");
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => escape_template_text(text, &mut literal),
                Segment::IdentifierRef(name) => match self.position(name) {
                    Some(i) => {
                        literal.push_str("${");
                        literal.push_str(&self.parameters[i]);
                        literal.push('}');
                    }
                    None => escape_template_text(name, &mut literal),
                },
            }
        }
        literal.push('`');

        format!("({}){ret} => {literal}", params.join(", "))
    }
}

/// Escape raw text for a JavaScript template literal. Template literals read
/// a raw `\r` or `\r\n` as `\n`, so carriage returns are escaped too.
fn escape_template_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' => out.push_str("\\$"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
}
