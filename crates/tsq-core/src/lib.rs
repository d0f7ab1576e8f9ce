//! tsq core library: build-time source quotation for TypeScript classes.
//!
//! Classes decorated with `@quoted` have every ordinary method cut into
//! literal and identifier segments. The pass erases the decorator and
//! appends a `quoted.saveRepo(Class, { method: { func, body } })` statement
//! whose functions rebuild the method text with caller-chosen identifier
//! names. The same repositories are available to Rust callers through
//! [`runtime::registry`].
//!
//! Layers:
//! - [`transform`]: parsing, segmentation, template synthesis, the pass.
//! - [`runtime`]: class-keyed repository registry and build manifest.
//! - [`driver`]: configuration, file discovery, incremental parallel build.

pub mod driver;
pub mod errors;
pub mod logging;
pub mod models;
pub mod runtime;
pub mod transform;

pub use errors::{QuoteError, QuoteResult};
pub use models::{ClassId, Ident, Segment, SpanKind};
pub use runtime::registry::{lookup, register, QuotationRegistry};
pub use transform::pass::{transform, transform_source, PassOptions, TransformOutput};
pub use transform::quotation::Quotation;
pub use transform::repository::Repository;
pub use transform::template::Template;
