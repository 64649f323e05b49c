//! Error types for rule evaluation.

use thiserror::Error;

use tablecheck_core::error::CodecError;

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that abort a single rule's evaluation.
///
/// These are hard errors, distinct from a rule failing: a failed rule is a
/// [`tablecheck_core::result::TestResult`], an `EvalError` means no
/// trustworthy result could be produced. Nothing at this layer retries.
#[derive(Error, Debug)]
pub enum EvalError {
    /// The runtime datasource map has no implementation under the rule's
    /// datasource name
    #[error("a datasource implementation named '{0}' was not provided")]
    DatasourceNotFound(String),

    /// A result cell could not be decoded into the rule's declared domain
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An aggregate query (`COUNT(*)`, `SUM`) came back with no rows at all
    #[error("expected exactly one aggregate row, but the query returned none")]
    MissingAggregateRow,

    /// The execution collaborator failed; the underlying store error
    /// surfaces opaquely
    #[error("query execution failed: {0}")]
    Execution(anyhow::Error),
}

impl From<anyhow::Error> for EvalError {
    fn from(error: anyhow::Error) -> Self {
        Self::Execution(error)
    }
}
