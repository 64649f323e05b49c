//! The closed taxonomy of evaluation outcomes.
//!
//! Every shape echoes the rule's description, the resolved identifiers, the
//! compiled SQL, the declared tolerance, and the measured execution time, so
//! a failure explains itself without re-querying. Failure shapes are a
//! shared-context struct plus a kind enum per family; `error_message()`
//! renders each kind's fixed template from its own fields.

use serde::{Deserialize, Serialize};

use crate::rule::Tolerance;
use crate::value::Value;

/// The outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestResult {
    Passed(Passed),
    Failed(Failed),
}

impl TestResult {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed(_))
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Passed(p) => p.description(),
            Self::Failed(f) => f.description(),
        }
    }

    pub fn execution_time_millis(&self) -> u64 {
        match self {
            Self::Passed(p) => p.execution_time_millis(),
            Self::Failed(f) => f.execution_time_millis(),
        }
    }

    pub fn tolerance(&self) -> &Tolerance {
        match self {
            Self::Passed(p) => p.tolerance(),
            Self::Failed(f) => f.tolerance(),
        }
    }
}

/// One passing shape per rule family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Passed {
    RowsOk(RowsOk),
    ValuesOk(ValuesOk),
    RowComparisonOk(RowComparisonOk),
    ValueComparisonOk(ValueComparisonOk),
}

impl Passed {
    pub fn description(&self) -> &str {
        match self {
            Self::RowsOk(r) => &r.test_description,
            Self::ValuesOk(r) => &r.test_description,
            Self::RowComparisonOk(r) => &r.test_description,
            Self::ValueComparisonOk(r) => &r.test_description,
        }
    }

    pub fn execution_time_millis(&self) -> u64 {
        match self {
            Self::RowsOk(r) => r.execution_time_millis,
            Self::ValuesOk(r) => r.execution_time_millis,
            Self::RowComparisonOk(r) => r.execution_time_millis,
            Self::ValueComparisonOk(r) => r.execution_time_millis,
        }
    }

    pub fn tolerance(&self) -> &Tolerance {
        match self {
            Self::RowsOk(r) => &r.tolerance,
            Self::ValuesOk(r) => &r.tolerance,
            Self::RowComparisonOk(r) => &r.tolerance,
            Self::ValueComparisonOk(r) => &r.tolerance,
        }
    }
}

/// A row-count rule held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowsOk {
    pub test_description: String,
    pub datasource_name: String,
    pub table_name: String,
    pub sql: String,
    pub tolerance: Tolerance,
    pub execution_time_millis: u64,
}

/// A column rule held: the falsifying query returned nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuesOk {
    pub test_description: String,
    pub datasource_name: String,
    pub table_name: String,
    pub field_name: String,
    pub sql: String,
    pub tolerance: Tolerance,
    pub execution_time_millis: u64,
}

/// A cross-source row-count comparison held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowComparisonOk {
    pub test_description: String,
    pub source_datasource_name: String,
    pub source_table_name: String,
    pub source_sql: String,
    pub destination_datasource_name: String,
    pub destination_table_name: String,
    pub destination_sql: String,
    pub tolerance: Tolerance,
    pub execution_time_millis: u64,
}

/// A cross-source column-total comparison held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueComparisonOk {
    pub test_description: String,
    pub source_datasource_name: String,
    pub source_table_name: String,
    pub source_field_name: String,
    pub source_sql: String,
    pub destination_datasource_name: String,
    pub destination_table_name: String,
    pub destination_field_name: String,
    pub destination_sql: String,
    pub tolerance: Tolerance,
    pub execution_time_millis: u64,
}

/// One failing family per rule family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Failed {
    RowCount(RowCountFailure),
    RowCounts(RowCountsDoNotMatch),
    InvalidValues(InvalidValuesFailure),
    ValuesDontMatch(TotalsDoNotMatch),
}

impl Failed {
    pub fn description(&self) -> &str {
        match self {
            Self::RowCount(f) => &f.test_description,
            Self::RowCounts(f) => &f.test_description,
            Self::InvalidValues(f) => &f.test_description,
            Self::ValuesDontMatch(f) => &f.test_description,
        }
    }

    pub fn execution_time_millis(&self) -> u64 {
        match self {
            Self::RowCount(f) => f.execution_time_millis,
            Self::RowCounts(f) => f.execution_time_millis,
            Self::InvalidValues(f) => f.execution_time_millis,
            Self::ValuesDontMatch(f) => f.execution_time_millis,
        }
    }

    pub fn tolerance(&self) -> &Tolerance {
        match self {
            Self::RowCount(f) => &f.tolerance,
            Self::RowCounts(f) => &f.tolerance,
            Self::InvalidValues(f) => &f.tolerance,
            Self::ValuesDontMatch(f) => &f.tolerance,
        }
    }

    /// The fixed message template for the concrete failure kind.
    pub fn error_message(&self) -> String {
        match self {
            Self::RowCount(f) => f.error_message(),
            Self::RowCounts(f) => f.error_message(),
            Self::InvalidValues(f) => f.error_message(),
            Self::ValuesDontMatch(f) => f.error_message(),
        }
    }
}

/// A single table's row count missed its bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowCountFailure {
    pub test_description: String,
    pub datasource_name: String,
    pub table_name: String,
    pub sql: String,
    pub actual_row_count: i64,
    pub tolerance: Tolerance,
    pub execution_time_millis: u64,
    pub kind: RowCountFailureKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowCountFailureKind {
    DoesNotEqual { expected_row_count: i64 },
    OutOfBounds { min_expected_rows: i64, max_expected_rows: i64 },
    TooFewRows { min_expected_rows: i64 },
    TooManyRows { max_expected_rows: i64 },
}

impl RowCountFailure {
    pub fn error_message(&self) -> String {
        let actual = self.actual_row_count;
        match &self.kind {
            RowCountFailureKind::DoesNotEqual { expected_row_count } => {
                format!("Expected {expected_row_count} rows, but got {actual}")
            }
            RowCountFailureKind::OutOfBounds {
                min_expected_rows,
                max_expected_rows,
            } => format!(
                "Expected rows to be between {min_expected_rows} and {max_expected_rows} rows, \
                 but got {actual} rows"
            ),
            RowCountFailureKind::TooFewRows { min_expected_rows } => {
                format!("Expected at least {min_expected_rows} rows, but got {actual} rows")
            }
            RowCountFailureKind::TooManyRows { max_expected_rows } => {
                format!("Expected at most {max_expected_rows} rows, but got {actual} rows")
            }
        }
    }
}

/// Source and destination row counts differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowCountsDoNotMatch {
    pub test_description: String,
    pub source_datasource_name: String,
    pub source_table_name: String,
    pub source_sql: String,
    pub destination_datasource_name: String,
    pub destination_table_name: String,
    pub destination_sql: String,
    pub source_rows: i64,
    pub destination_rows: i64,
    pub tolerance: Tolerance,
    pub execution_time_millis: u64,
}

impl RowCountsDoNotMatch {
    pub fn error_message(&self) -> String {
        format!(
            "{} rows do not match {} rows.",
            self.source_table_name, self.destination_table_name
        )
    }
}

/// A column rule surfaced offending values.
///
/// `falsifying_examples` is deduplicated, sorted ascending, and capped at
/// the rule's example budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidValuesFailure {
    pub test_description: String,
    pub datasource_name: String,
    pub table_name: String,
    pub field_name: String,
    pub sql: String,
    pub falsifying_examples: Vec<Value>,
    pub tolerance: Tolerance,
    pub execution_time_millis: u64,
    pub kind: InvalidValuesKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidValuesKind {
    MissingPrefix { prefix: String, case_sensitive: bool },
    MissingSuffix { suffix: String, case_sensitive: bool },
    NotLike { fragment: String, case_sensitive: bool },
    NotOneOf { expected_values: Vec<Value>, case_sensitive: bool },
    OutOfBounds { min_expected_value: Value, max_expected_value: Value },
    TooLarge { max_expected_value: Value },
    TooSmall { min_expected_value: Value },
    TooShortOrTooLong { min_length: i64, max_length: i64 },
}

impl InvalidValuesFailure {
    pub fn error_message(&self) -> String {
        match &self.kind {
            InvalidValuesKind::MissingPrefix { prefix, .. } => {
                format!("One or more values were missing the prefix '{prefix}'.")
            }
            InvalidValuesKind::MissingSuffix { suffix, .. } => {
                format!("One or more values were missing the suffix '{suffix}'.")
            }
            InvalidValuesKind::NotLike { fragment, .. } => {
                format!("One or more values did not contain the fragment '{fragment}'.")
            }
            InvalidValuesKind::NotOneOf { .. } | InvalidValuesKind::OutOfBounds { .. } => {
                "The test returned unexpected values.".to_string()
            }
            InvalidValuesKind::TooLarge { max_expected_value } => {
                format!("One or more values were larger than {max_expected_value}.")
            }
            InvalidValuesKind::TooSmall { min_expected_value } => {
                format!("One or more values were smaller than {min_expected_value}.")
            }
            InvalidValuesKind::TooShortOrTooLong {
                min_length,
                max_length,
            } => format!(
                "One or more values had lengths less than {min_length} or more than \
                 {max_length} characters."
            ),
        }
    }
}

/// Source and destination aggregate totals differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsDoNotMatch {
    pub test_description: String,
    pub source_datasource_name: String,
    pub source_table_name: String,
    pub source_field_name: String,
    pub source_sql: String,
    pub destination_datasource_name: String,
    pub destination_table_name: String,
    pub destination_field_name: String,
    pub destination_sql: String,
    pub source_total: Value,
    pub destination_total: Value,
    pub tolerance: Tolerance,
    pub execution_time_millis: u64,
}

impl TotalsDoNotMatch {
    pub fn error_message(&self) -> String {
        format!(
            "{}.{} = {}, but {}.{} = {}.",
            self.source_table_name,
            self.source_field_name,
            self.source_total,
            self.destination_table_name,
            self.destination_field_name,
            self.destination_total
        )
    }
}
