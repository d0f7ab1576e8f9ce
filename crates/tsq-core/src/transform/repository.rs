//! Per-class repository of quotations and the registration statement that
//! attaches it to the class at module-load time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{is_identifier, ClassId};
use crate::transform::quotation::Quotation;

/// Every quotation of one marked class, keyed by method name in declaration
/// order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub class: ClassId,
    pub quotations: IndexMap<String, Quotation>,
}

impl Repository {
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            quotations: IndexMap::new(),
        }
    }

    /// Add a quotation, returning the one it replaced.
    pub fn insert(&mut self, method: impl Into<String>, quotation: Quotation) -> Option<Quotation> {
        self.quotations.insert(method.into(), quotation)
    }

    pub fn get(&self, method: &str) -> Option<&Quotation> {
        self.quotations.get(method)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.quotations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.quotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotations.is_empty()
    }
}

/// Render the registration statement for `repository`.
///
/// `class_ref` is the expression naming the class in the emitting module and
/// `register_call` the callee, e.g. `quoted.saveRepo`. Each template becomes
/// an arrow function with its substitution unrolled. Lines of the statement
/// are joined with `newline`.
pub fn build_registration(
    class_ref: &str,
    repository: &Repository,
    register_call: &str,
    typed: bool,
    newline: &str,
) -> String {
    if repository.is_empty() {
        return format!("{register_call}({class_ref}, {{}});");
    }
    let mut out = format!("{register_call}({class_ref}, {{{newline}");
    for (method, quotation) in &repository.quotations {
        out.push_str(&format!("  {}: {{{newline}", object_key(method)));
        out.push_str(&format!("    func: {},{newline}", quotation.func.to_typescript(typed)));
        out.push_str(&format!("    body: {},{newline}", quotation.body.to_typescript(typed)));
        out.push_str(&format!("  }},{newline}"));
    }
    out.push_str("});");
    out
}

fn object_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        serde_json::Value::String(name.to_string()).to_string()
    }
}
