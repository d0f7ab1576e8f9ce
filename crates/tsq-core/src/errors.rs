//! Error types for the tsq core library.

/// Top-level error enum for the tsq core library.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("unsupported span kind: {0:?}")]
    UnsupportedSpanKind(String),

    #[error("method `{method}` has an empty body")]
    EmptyBody { method: String },

    #[error("no quotation repository registered for class `{0}`")]
    NoRepositoryRegistered(String),

    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("template expects {expected} argument(s), got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("method `{method}` declares unsupported parameter `{parameter}`")]
    UnsupportedParameter { method: String, parameter: String },

    #[error("marked class at byte {offset} has no name")]
    AnonymousClass { offset: usize },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Build error: {0}")]
    Build(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type QuoteResult<T> = Result<T, QuoteError>;
