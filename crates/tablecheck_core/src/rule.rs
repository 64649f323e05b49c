//! The rule data model.
//!
//! Rules are closed tagged unions: one enum per family, matched exhaustively
//! everywhere. A rule is immutable after construction; its description,
//! predicate, and query text are pure functions of its own fields (see the
//! `sql` module for the latter two). Extending the algebra means adding a
//! union member, never subtyping.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::dialect::SqlDialect;
use crate::validate::{RuleValidationResult, validate_column, validate_table};
use crate::value::{DataType, Value, format_timestamp};

/// Tolerance parameters declared on every rule.
///
/// These are captured and echoed into every result but are never consulted
/// by pass/fail classification; the engine classifies strictly. Callers that
/// want bounded deviation read them back off the result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub flex: f32,
    pub flex_percent: f32,
    pub mostly: f32,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            flex: 0.0,
            flex_percent: 0.0,
            mostly: 1.0,
        }
    }
}

/// A table reference as embedded in a rule: everything needed to compile
/// a query against it, nothing more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    pub datasource_name: String,
    pub table_name: String,
    pub subquery: Option<String>,
    pub dialect: SqlDialect,
}

/// A column reference as embedded in a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRef {
    pub datasource_name: String,
    pub table_name: String,
    pub field_name: String,
    pub subquery: Option<String>,
    pub dialect: SqlDialect,
    pub data_type: DataType,
    pub max_falsifying_examples: i64,
}

/// Asserts on a single table's `COUNT(*)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowCountRule {
    pub table: TableRef,
    pub check: RowCountCheck,
    #[serde(default)]
    pub tolerance: Tolerance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowCountCheck {
    Equal { rows: i64 },
    AtLeast { min_rows: i64 },
    AtMost { max_rows: i64 },
    Between { min_rows: i64, max_rows: i64 },
}

impl RowCountRule {
    pub fn description(&self) -> String {
        let table = &self.table.table_name;
        match &self.check {
            RowCountCheck::Equal { rows } => format!("{table} rows should equal {rows}."),
            RowCountCheck::AtLeast { min_rows } => {
                format!("{table} rows should be at least {min_rows} rows.")
            }
            RowCountCheck::AtMost { max_rows } => {
                format!("{table} rows should be at most {max_rows} rows.")
            }
            RowCountCheck::Between { min_rows, max_rows } => {
                format!("{table} rows should be between {min_rows} and {max_rows}.")
            }
        }
    }

    pub fn validate(&self) -> RuleValidationResult {
        let base = validate_table(&self.table.datasource_name, &self.table.table_name);
        match &self.check {
            RowCountCheck::Equal { rows } => {
                base.and("The rows argument must be >= 0.", || *rows < 0)
            }
            RowCountCheck::AtLeast { min_rows } => {
                base.and("The minimum rows argument must be >= 0.", || *min_rows < 0)
            }
            RowCountCheck::AtMost { max_rows } => {
                base.and("The maximum rows argument must be >= 0.", || *max_rows < 0)
            }
            RowCountCheck::Between { min_rows, max_rows } => base
                .and("The minimum rows argument must be >= 0.", || *min_rows < 0)
                .and("The max_rows cannot be less than the min_rows.", || {
                    max_rows < min_rows
                }),
        }
    }
}

/// Asserts on the values of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub field: FieldRef,
    pub check: ColumnCheck,
    #[serde(default)]
    pub tolerance: Tolerance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnCheck {
    // Temporal domains; a DATE parameter is its midnight.
    DateAfter { date: NaiveDateTime },
    DateOnOrAfter { date: NaiveDateTime },
    DateBefore { date: NaiveDateTime },
    DateOnOrBefore { date: NaiveDateTime },
    DateBetween { min_date: NaiveDateTime, max_date: NaiveDateTime },

    // Text domain. Case sensitivity is recorded from the field declaration
    // and echoed into failure shapes.
    Like { fragment: String, case_sensitive: bool },
    StartsWith { prefix: String, case_sensitive: bool },
    EndsWith { suffix: String, case_sensitive: bool },
    TextOneOf { values: BTreeSet<String>, case_sensitive: bool },
    LengthBetween { min_length: i64, max_length: i64 },

    // Numeric domains; values are already cast to the field's canonical kind.
    AtLeast { min_value: Value },
    AtMost { max_value: Value },
    Between { min_value: Value, max_value: Value },
    NumberOneOf { values: BTreeSet<Value> },
}

impl ColumnRule {
    pub fn description(&self) -> String {
        let field = &self.field.field_name;
        match &self.check {
            ColumnCheck::DateAfter { date } => {
                format!("{field} should be after {}.", format_timestamp(date))
            }
            ColumnCheck::DateOnOrAfter { date } => {
                format!("{field} should be on or after {}.", format_timestamp(date))
            }
            ColumnCheck::DateBefore { date } => {
                format!("{field} should be before {}.", format_timestamp(date))
            }
            ColumnCheck::DateOnOrBefore { date } => {
                format!("{field} should be on or before {}.", format_timestamp(date))
            }
            ColumnCheck::DateBetween { min_date, max_date } => format!(
                "{field} should be between {} and {}.",
                format_timestamp(min_date),
                format_timestamp(max_date)
            ),
            ColumnCheck::Like { fragment, .. } => {
                format!("{field} should contain '{fragment}'.")
            }
            ColumnCheck::StartsWith { prefix, .. } => {
                format!("{field} should start with '{prefix}'.")
            }
            ColumnCheck::EndsWith { suffix, .. } => {
                format!("{field} should end with '{suffix}'.")
            }
            ColumnCheck::TextOneOf { values, .. } => {
                format!("{field} values should be one of {}.", join(values.iter()))
            }
            ColumnCheck::LengthBetween { min_length, max_length } => {
                format!("{field} length should be between {min_length} and {max_length}.")
            }
            ColumnCheck::AtLeast { min_value } => {
                format!("{field} should be at least {min_value}.")
            }
            ColumnCheck::AtMost { max_value } => {
                format!("{field} should be at most {max_value}.")
            }
            ColumnCheck::Between { min_value, max_value } => {
                format!("{field} should be between {min_value} and {max_value}.")
            }
            ColumnCheck::NumberOneOf { values } => {
                format!("{field} should be one of {}.", join(values.iter()))
            }
        }
    }

    pub fn validate(&self) -> RuleValidationResult {
        let base = validate_column(
            &self.field.datasource_name,
            &self.field.table_name,
            &self.field.field_name,
            self.field.max_falsifying_examples,
        );
        match &self.check {
            ColumnCheck::DateAfter { .. }
            | ColumnCheck::DateOnOrAfter { .. }
            | ColumnCheck::DateBefore { .. }
            | ColumnCheck::DateOnOrBefore { .. } => base,
            ColumnCheck::DateBetween { min_date, max_date } => base
                .and("The min_date cannot be greater than the max_date.", || {
                    min_date > max_date
                }),
            ColumnCheck::Like { fragment, .. } => {
                base.and("The text fragment cannot be blank.", || {
                    fragment.trim().is_empty()
                })
            }
            ColumnCheck::StartsWith { prefix, .. } => {
                base.and("The prefix cannot be blank.", || prefix.trim().is_empty())
            }
            ColumnCheck::EndsWith { suffix, .. } => {
                base.and("The suffix cannot be blank.", || suffix.trim().is_empty())
            }
            ColumnCheck::TextOneOf { values, .. } => {
                base.and("The list of values cannot be empty.", || values.is_empty())
            }
            ColumnCheck::LengthBetween { min_length, max_length } => base
                .and("The max_length cannot be less than the min_length.", || {
                    max_length < min_length
                }),
            ColumnCheck::AtLeast { .. } | ColumnCheck::AtMost { .. } => base,
            ColumnCheck::Between { min_value, max_value } => base
                .and("The max_value cannot be less than the min_value.", || {
                    max_value < min_value
                }),
            ColumnCheck::NumberOneOf { values } => {
                base.and("No values were provided.", || values.is_empty())
            }
        }
    }

    /// The allowed set for membership checks, or `None` for every other
    /// check shape. Classification verifies the materialized values are a
    /// subset of this set rather than relying on the predicate alone.
    pub fn allowed_values(&self) -> Option<Vec<Value>> {
        match &self.check {
            ColumnCheck::TextOneOf { values, .. } => Some(
                values.iter().cloned().map(Value::Text).collect(),
            ),
            ColumnCheck::NumberOneOf { values } => Some(values.iter().cloned().collect()),
            _ => None,
        }
    }
}

/// Source and destination row counts must be equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowsMatchRule {
    pub source_table: TableRef,
    pub destination_table: TableRef,
    #[serde(default)]
    pub tolerance: Tolerance,
}

impl RowsMatchRule {
    pub fn description(&self) -> String {
        format!(
            "{} rows should match {} rows.",
            self.source_table.table_name, self.destination_table.table_name
        )
    }

    pub fn validate(&self) -> RuleValidationResult {
        let source = validate_table(
            &self.source_table.datasource_name,
            &self.source_table.table_name,
        );
        let destination = validate_table(
            &self.destination_table.datasource_name,
            &self.destination_table.table_name,
        );
        source.combine(destination)
    }
}

/// Source and destination `SUM(field)` aggregates must be equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsMatchRule {
    pub source_field: FieldRef,
    pub destination_field: FieldRef,
    #[serde(default)]
    pub tolerance: Tolerance,
}

impl TotalsMatchRule {
    pub fn description(&self) -> String {
        "Column totals should match.".to_string()
    }

    pub fn validate(&self) -> RuleValidationResult {
        let source = validate_column(
            &self.source_field.datasource_name,
            &self.source_field.table_name,
            &self.source_field.field_name,
            self.source_field.max_falsifying_examples,
        );
        let destination = validate_column(
            &self.destination_field.datasource_name,
            &self.destination_field.table_name,
            &self.destination_field.field_name,
            self.destination_field.max_falsifying_examples,
        );
        source.combine(destination)
    }
}

/// Rules that span two tables, owned by the suite rather than a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiTableRule {
    RowsMatch(RowsMatchRule),
    TotalsMatch(TotalsMatchRule),
}

/// Any rule, in the shape the evaluation engine consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Rows(RowCountRule),
    Column(ColumnRule),
    RowsMatch(RowsMatchRule),
    TotalsMatch(TotalsMatchRule),
}

impl Rule {
    pub fn description(&self) -> String {
        match self {
            Self::Rows(rule) => rule.description(),
            Self::Column(rule) => rule.description(),
            Self::RowsMatch(rule) => rule.description(),
            Self::TotalsMatch(rule) => rule.description(),
        }
    }

    pub fn validate(&self) -> RuleValidationResult {
        match self {
            Self::Rows(rule) => rule.validate(),
            Self::Column(rule) => rule.validate(),
            Self::RowsMatch(rule) => rule.validate(),
            Self::TotalsMatch(rule) => rule.validate(),
        }
    }
}

impl From<MultiTableRule> for Rule {
    fn from(rule: MultiTableRule) -> Self {
        match rule {
            MultiTableRule::RowsMatch(rule) => Self::RowsMatch(rule),
            MultiTableRule::TotalsMatch(rule) => Self::TotalsMatch(rule),
        }
    }
}

fn join<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
