//! The execution and classification engine.
//!
//! [`RuleEvaluator`] resolves a rule's datasource(s) against the runtime
//! map, runs the compiled query through the execution collaborator, and
//! decodes each row's first cell through the value codec into a
//! [`db_result`](crate::db_result) shape. Classification then turns that
//! shape into the result taxonomy. Evaluation is synchronous; the engine
//! holds no mutable state, so independent rules can be evaluated
//! concurrently as long as the executors themselves are thread-safe.

use std::time::Instant;

use tracing::debug;

use tablecheck_core::catalog::TestSuite;
use tablecheck_core::codec::decode_cell;
use tablecheck_core::dialect::SqlDialect;
use tablecheck_core::error::CodecError;
use tablecheck_core::result::{
    Failed, InvalidValuesFailure, InvalidValuesKind, Passed, RowComparisonOk, RowCountFailure,
    RowCountFailureKind, RowCountsDoNotMatch, RowsOk, TestResult, TotalsDoNotMatch,
    ValueComparisonOk, ValuesOk,
};
use tablecheck_core::rule::{
    ColumnCheck, ColumnRule, RowCountCheck, RowCountRule, RowsMatchRule, Rule, TotalsMatchRule,
};
use tablecheck_core::value::{DataType, RawCell, RawRow, Value};

use crate::db_result::{Multiple, Single};
use crate::error::{EvalError, Result};
use crate::executor::{DatasourceMap, QueryExecutor};

/// Evaluates rules against a runtime map of datasource implementations.
///
/// # Example
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use tablecheck_engine::{DatasourceMap, RuleEvaluator};
/// # fn suite() -> tablecheck_core::catalog::TestSuite { unimplemented!() }
/// # fn open_warehouse() -> Box<dyn tablecheck_engine::QueryExecutor> { unimplemented!() }
///
/// let mut datasources: DatasourceMap = HashMap::new();
/// datasources.insert("dw".to_string(), open_warehouse());
///
/// let evaluator = RuleEvaluator::new();
/// for result in evaluator.run_suite(&suite(), &datasources).unwrap() {
///     println!("{}: {}", result.description(), result.passed());
/// }
/// ```
#[derive(Debug, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates one rule, producing a fresh [`TestResult`].
    pub fn evaluate(&self, rule: &Rule, datasources: &DatasourceMap) -> Result<TestResult> {
        match rule {
            Rule::Rows(rule) => {
                let result = fetch_count(rule, datasources)?;
                check_row_count(rule, result)
            }
            Rule::Column(rule) => {
                let result = fetch_falsifying_values(rule, datasources)?;
                Ok(check_column(rule, result))
            }
            Rule::RowsMatch(rule) => {
                let result = fetch_count_pair(rule, datasources)?;
                check_rows_match(rule, result)
            }
            Rule::TotalsMatch(rule) => {
                let result = fetch_total_pair(rule, datasources)?;
                check_totals_match(rule, result)
            }
        }
    }

    /// Evaluates every rule in the suite's declared order, returning
    /// results in that order.
    ///
    /// The first hard error (a missing datasource, a store failure, an
    /// undecodable cell) aborts the whole batch. Callers that want
    /// per-rule isolation call [`RuleEvaluator::evaluate`] rule by rule.
    pub fn run_suite(
        &self,
        suite: &TestSuite,
        datasources: &DatasourceMap,
    ) -> Result<Vec<TestResult>> {
        suite
            .rules()
            .iter()
            .map(|rule| self.evaluate(rule, datasources))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Fetching: run the compiled query, decode, measure.

fn fetch_count(rule: &RowCountRule, datasources: &DatasourceMap) -> Result<Single<i64>> {
    let sql = rule.sql();
    let start = Instant::now();
    let executor = resolve(datasources, &rule.table.datasource_name)?;
    debug!(sql = %sql, "executing row-count query");
    let values = decode_counts(executor.execute(&sql)?, rule.table.dialect)?;
    Ok(Single {
        values,
        execution_time_millis: elapsed_millis(start),
    })
}

fn fetch_falsifying_values(
    rule: &ColumnRule,
    datasources: &DatasourceMap,
) -> Result<Single<Value>> {
    let sql = rule.sql();
    let start = Instant::now();
    let executor = resolve(datasources, &rule.field.datasource_name)?;
    debug!(sql = %sql, "executing falsifying-value query");
    let values = decode_column(executor.execute(&sql)?, rule.field.data_type, rule.field.dialect)?;
    Ok(Single {
        values,
        execution_time_millis: elapsed_millis(start),
    })
}

fn fetch_count_pair(rule: &RowsMatchRule, datasources: &DatasourceMap) -> Result<Multiple<i64>> {
    let source_sql = rule.source_sql();
    let destination_sql = rule.destination_sql();
    let start = Instant::now();
    let source = resolve(datasources, &rule.source_table.datasource_name)?;
    let destination = resolve(datasources, &rule.destination_table.datasource_name)?;
    debug!(sql = %source_sql, "executing source row-count query");
    let source_values = decode_counts(source.execute(&source_sql)?, rule.source_table.dialect)?;
    debug!(sql = %destination_sql, "executing destination row-count query");
    let destination_values = decode_counts(
        destination.execute(&destination_sql)?,
        rule.destination_table.dialect,
    )?;
    Ok(Multiple {
        source_values,
        destination_values,
        execution_time_millis: elapsed_millis(start),
    })
}

fn fetch_total_pair(rule: &TotalsMatchRule, datasources: &DatasourceMap) -> Result<Multiple<Value>> {
    let source_sql = rule.source_sql();
    let destination_sql = rule.destination_sql();
    let start = Instant::now();
    let source = resolve(datasources, &rule.source_field.datasource_name)?;
    let destination = resolve(datasources, &rule.destination_field.datasource_name)?;
    debug!(sql = %source_sql, "executing source total query");
    let source_values = decode_column(
        source.execute(&source_sql)?,
        rule.source_field.data_type,
        rule.source_field.dialect,
    )?;
    debug!(sql = %destination_sql, "executing destination total query");
    let destination_values = decode_column(
        destination.execute(&destination_sql)?,
        rule.destination_field.data_type,
        rule.destination_field.dialect,
    )?;
    Ok(Multiple {
        source_values,
        destination_values,
        execution_time_millis: elapsed_millis(start),
    })
}

fn resolve<'a>(datasources: &'a DatasourceMap, name: &str) -> Result<&'a dyn QueryExecutor> {
    datasources
        .get(name)
        .map(|executor| executor.as_ref())
        .ok_or_else(|| EvalError::DatasourceNotFound(name.to_string()))
}

fn elapsed_millis(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Each row's first cell; a row with no cells decodes as NULL.
fn first_cells(rows: Vec<RawRow>) -> impl Iterator<Item = RawCell> {
    rows.into_iter()
        .map(|row| row.into_iter().next().unwrap_or(RawCell::Null))
}

fn decode_counts(rows: Vec<RawRow>, dialect: SqlDialect) -> Result<Vec<i64>> {
    first_cells(rows)
        .map(|cell| match decode_cell(&cell, DataType::Integer, dialect)? {
            Value::Integer(count) => Ok(count),
            other => Err(EvalError::Codec(CodecError::IncompatibleDomain(format!(
                "expected an integer row count, got a {} value",
                other.kind_name()
            )))),
        })
        .collect()
}

fn decode_column(rows: Vec<RawRow>, data_type: DataType, dialect: SqlDialect) -> Result<Vec<Value>> {
    first_cells(rows)
        .map(|cell| Ok(decode_cell(&cell, data_type, dialect)?))
        .collect()
}

// ---------------------------------------------------------------------------
// Classification: turn a fetched shape into the result taxonomy.

fn check_row_count(rule: &RowCountRule, result: Single<i64>) -> Result<TestResult> {
    let actual_row_count = result
        .values
        .first()
        .copied()
        .ok_or(EvalError::MissingAggregateRow)?;
    let execution_time_millis = result.execution_time_millis;

    let holds = match rule.check {
        RowCountCheck::Equal { rows } => actual_row_count == rows,
        RowCountCheck::AtLeast { min_rows } => actual_row_count >= min_rows,
        RowCountCheck::AtMost { max_rows } => actual_row_count <= max_rows,
        RowCountCheck::Between { min_rows, max_rows } => {
            (min_rows..=max_rows).contains(&actual_row_count)
        }
    };

    if holds {
        return Ok(TestResult::Passed(Passed::RowsOk(RowsOk {
            test_description: rule.description(),
            datasource_name: rule.table.datasource_name.clone(),
            table_name: rule.table.table_name.clone(),
            sql: rule.sql(),
            tolerance: rule.tolerance,
            execution_time_millis,
        })));
    }

    let kind = match rule.check {
        RowCountCheck::Equal { rows } => RowCountFailureKind::DoesNotEqual {
            expected_row_count: rows,
        },
        RowCountCheck::AtLeast { min_rows } => RowCountFailureKind::TooFewRows {
            min_expected_rows: min_rows,
        },
        RowCountCheck::AtMost { max_rows } => RowCountFailureKind::TooManyRows {
            max_expected_rows: max_rows,
        },
        RowCountCheck::Between { min_rows, max_rows } => RowCountFailureKind::OutOfBounds {
            min_expected_rows: min_rows,
            max_expected_rows: max_rows,
        },
    };
    Ok(TestResult::Failed(Failed::RowCount(RowCountFailure {
        test_description: rule.description(),
        datasource_name: rule.table.datasource_name.clone(),
        table_name: rule.table.table_name.clone(),
        sql: rule.sql(),
        actual_row_count,
        tolerance: rule.tolerance,
        execution_time_millis,
        kind,
    })))
}

fn check_column(rule: &ColumnRule, result: Single<Value>) -> TestResult {
    let Single {
        values,
        execution_time_millis,
    } = result;

    // The query is already predicate-filtered, so anything returned is a
    // violation. Membership rules additionally verify the materialized
    // values against the allowed set rather than trusting the predicate.
    let holds = match rule.allowed_values() {
        Some(allowed) => values.iter().all(|value| allowed.contains(value)),
        None => values.is_empty(),
    };

    if holds {
        return TestResult::Passed(Passed::ValuesOk(ValuesOk {
            test_description: rule.description(),
            datasource_name: rule.field.datasource_name.clone(),
            table_name: rule.field.table_name.clone(),
            field_name: rule.field.field_name.clone(),
            sql: rule.sql(),
            tolerance: rule.tolerance,
            execution_time_millis,
        }));
    }

    TestResult::Failed(Failed::InvalidValues(InvalidValuesFailure {
        test_description: rule.description(),
        datasource_name: rule.field.datasource_name.clone(),
        table_name: rule.field.table_name.clone(),
        field_name: rule.field.field_name.clone(),
        sql: rule.sql(),
        falsifying_examples: falsifying_examples(values, rule.field.max_falsifying_examples),
        tolerance: rule.tolerance,
        execution_time_millis,
        kind: invalid_values_kind(&rule.check),
    }))
}

fn check_rows_match(rule: &RowsMatchRule, result: Multiple<i64>) -> Result<TestResult> {
    if result.source_values == result.destination_values {
        return Ok(TestResult::Passed(Passed::RowComparisonOk(RowComparisonOk {
            test_description: rule.description(),
            source_datasource_name: rule.source_table.datasource_name.clone(),
            source_table_name: rule.source_table.table_name.clone(),
            source_sql: rule.source_sql(),
            destination_datasource_name: rule.destination_table.datasource_name.clone(),
            destination_table_name: rule.destination_table.table_name.clone(),
            destination_sql: rule.destination_sql(),
            tolerance: rule.tolerance,
            execution_time_millis: result.execution_time_millis,
        })));
    }

    let source_rows = result
        .source_values
        .first()
        .copied()
        .ok_or(EvalError::MissingAggregateRow)?;
    let destination_rows = result
        .destination_values
        .first()
        .copied()
        .ok_or(EvalError::MissingAggregateRow)?;
    Ok(TestResult::Failed(Failed::RowCounts(RowCountsDoNotMatch {
        test_description: rule.description(),
        source_datasource_name: rule.source_table.datasource_name.clone(),
        source_table_name: rule.source_table.table_name.clone(),
        source_sql: rule.source_sql(),
        destination_datasource_name: rule.destination_table.datasource_name.clone(),
        destination_table_name: rule.destination_table.table_name.clone(),
        destination_sql: rule.destination_sql(),
        source_rows,
        destination_rows,
        tolerance: rule.tolerance,
        execution_time_millis: result.execution_time_millis,
    })))
}

fn check_totals_match(rule: &TotalsMatchRule, result: Multiple<Value>) -> Result<TestResult> {
    if result.source_values == result.destination_values {
        return Ok(TestResult::Passed(Passed::ValueComparisonOk(ValueComparisonOk {
            test_description: rule.description(),
            source_datasource_name: rule.source_field.datasource_name.clone(),
            source_table_name: rule.source_field.table_name.clone(),
            source_field_name: rule.source_field.field_name.clone(),
            source_sql: rule.source_sql(),
            destination_datasource_name: rule.destination_field.datasource_name.clone(),
            destination_table_name: rule.destination_field.table_name.clone(),
            destination_field_name: rule.destination_field.field_name.clone(),
            destination_sql: rule.destination_sql(),
            tolerance: rule.tolerance,
            execution_time_millis: result.execution_time_millis,
        })));
    }

    let source_total = result
        .source_values
        .first()
        .cloned()
        .ok_or(EvalError::MissingAggregateRow)?;
    let destination_total = result
        .destination_values
        .first()
        .cloned()
        .ok_or(EvalError::MissingAggregateRow)?;
    Ok(TestResult::Failed(Failed::ValuesDontMatch(TotalsDoNotMatch {
        test_description: rule.description(),
        source_datasource_name: rule.source_field.datasource_name.clone(),
        source_table_name: rule.source_field.table_name.clone(),
        source_field_name: rule.source_field.field_name.clone(),
        source_sql: rule.source_sql(),
        destination_datasource_name: rule.destination_field.datasource_name.clone(),
        destination_table_name: rule.destination_field.table_name.clone(),
        destination_field_name: rule.destination_field.field_name.clone(),
        destination_sql: rule.destination_sql(),
        source_total,
        destination_total,
        tolerance: rule.tolerance,
        execution_time_millis: result.execution_time_millis,
    })))
}

/// Deduplicates, sorts ascending, and caps the offending values carried in
/// a failure report.
fn falsifying_examples(mut values: Vec<Value>, max: i64) -> Vec<Value> {
    values.sort();
    values.dedup();
    values.truncate(max.max(0) as usize);
    values
}

fn invalid_values_kind(check: &ColumnCheck) -> InvalidValuesKind {
    match check {
        ColumnCheck::DateAfter { date } | ColumnCheck::DateOnOrAfter { date } => {
            InvalidValuesKind::TooSmall {
                min_expected_value: Value::Timestamp(*date),
            }
        }
        ColumnCheck::DateBefore { date } | ColumnCheck::DateOnOrBefore { date } => {
            InvalidValuesKind::TooLarge {
                max_expected_value: Value::Timestamp(*date),
            }
        }
        ColumnCheck::DateBetween { min_date, max_date } => InvalidValuesKind::OutOfBounds {
            min_expected_value: Value::Timestamp(*min_date),
            max_expected_value: Value::Timestamp(*max_date),
        },
        ColumnCheck::Like {
            fragment,
            case_sensitive,
        } => InvalidValuesKind::NotLike {
            fragment: fragment.clone(),
            case_sensitive: *case_sensitive,
        },
        ColumnCheck::StartsWith {
            prefix,
            case_sensitive,
        } => InvalidValuesKind::MissingPrefix {
            prefix: prefix.clone(),
            case_sensitive: *case_sensitive,
        },
        ColumnCheck::EndsWith {
            suffix,
            case_sensitive,
        } => InvalidValuesKind::MissingSuffix {
            suffix: suffix.clone(),
            case_sensitive: *case_sensitive,
        },
        ColumnCheck::TextOneOf {
            values,
            case_sensitive,
        } => InvalidValuesKind::NotOneOf {
            expected_values: values.iter().cloned().map(Value::Text).collect(),
            case_sensitive: *case_sensitive,
        },
        ColumnCheck::LengthBetween {
            min_length,
            max_length,
        } => InvalidValuesKind::TooShortOrTooLong {
            min_length: *min_length,
            max_length: *max_length,
        },
        ColumnCheck::AtLeast { min_value } => InvalidValuesKind::TooSmall {
            min_expected_value: min_value.clone(),
        },
        ColumnCheck::AtMost { max_value } => InvalidValuesKind::TooLarge {
            max_expected_value: max_value.clone(),
        },
        ColumnCheck::Between {
            min_value,
            max_value,
        } => InvalidValuesKind::OutOfBounds {
            min_expected_value: min_value.clone(),
            max_expected_value: max_value.clone(),
        },
        ColumnCheck::NumberOneOf { values } => InvalidValuesKind::NotOneOf {
            expected_values: values.iter().cloned().collect(),
            case_sensitive: false,
        },
    }
}
