//! Pre-classification raw query output.
//!
//! The engine separates fetching from classifying: a fetch produces one of
//! these shapes (decoded first-column values plus the measured execution
//! time), and classification turns it into a
//! [`tablecheck_core::result::TestResult`]. Single-table rules always see
//! [`Single`]; cross-source rules always see [`Multiple`], so each shape is
//! its own type rather than a runtime-dispatched union.

/// Output of a single-table rule's one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Single<V> {
    pub values: Vec<V>,
    pub execution_time_millis: u64,
}

/// Output of a cross-source rule's two queries, source then destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Multiple<V> {
    pub source_values: Vec<V>,
    pub destination_values: Vec<V>,
    pub execution_time_millis: u64,
}
