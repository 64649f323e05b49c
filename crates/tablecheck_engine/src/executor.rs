//! The execution collaborator seam.
//!
//! The engine never talks to a database driver directly; it hands compiled
//! SQL to a [`QueryExecutor`] and decodes whatever raw rows come back.

use std::collections::HashMap;

use tablecheck_core::value::RawRow;

/// Executes one query against one datasource.
///
/// Implementations must run the statement inside a single transaction at
/// serializable isolation, effectively read-only, with zero automatic
/// retries: a failed transaction surfaces as an error rather than being
/// retried. The returned rows preserve the store's ordering. Connection
/// acquisition belongs inside `execute`, so the engine's timing includes it.
pub trait QueryExecutor: Send + Sync {
    /// Runs `sql` and returns the raw result rows. Underlying store errors
    /// surface opaquely.
    fn execute(&self, sql: &str) -> anyhow::Result<Vec<RawRow>>;
}

/// The runtime map from datasource name to implementation. A rule whose
/// datasource name is missing from this map fails evaluation with
/// [`crate::EvalError::DatasourceNotFound`].
pub type DatasourceMap = HashMap<String, Box<dyn QueryExecutor>>;
