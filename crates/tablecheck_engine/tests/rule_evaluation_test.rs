//! Per-rule evaluation and classification behavior.

mod common;

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;

use common::{CannedDatasource, int_rows, single_datasource, text_rows};
use tablecheck_core::dialect::SqlDialect;
use tablecheck_core::result::{
    Failed, InvalidValuesKind, Passed, RowCountFailureKind, TestResult,
};
use tablecheck_core::rule::{
    ColumnCheck, ColumnRule, FieldRef, RowCountCheck, RowCountRule, RowsMatchRule, Rule, TableRef,
    Tolerance, TotalsMatchRule,
};
use tablecheck_core::value::{DataType, RawCell, Value};
use tablecheck_engine::{EvalError, RuleEvaluator};

fn customer_table() -> TableRef {
    TableRef {
        datasource_name: "dw".into(),
        table_name: "customer".into(),
        subquery: None,
        dialect: SqlDialect::Sqlite,
    }
}

fn sale_table() -> TableRef {
    TableRef {
        table_name: "sale".into(),
        ..customer_table()
    }
}

fn field(name: &str, data_type: DataType) -> FieldRef {
    FieldRef {
        datasource_name: "dw".into(),
        table_name: "customer".into(),
        field_name: name.into(),
        subquery: None,
        dialect: SqlDialect::Sqlite,
        data_type,
        max_falsifying_examples: 3,
    }
}

fn row_rule(check: RowCountCheck) -> RowCountRule {
    RowCountRule {
        table: customer_table(),
        check,
        tolerance: Tolerance::default(),
    }
}

fn column_rule(name: &str, data_type: DataType, check: ColumnCheck) -> ColumnRule {
    ColumnRule {
        field: field(name, data_type),
        check,
        tolerance: Tolerance::default(),
    }
}

#[test]
fn row_count_within_bounds_passes() {
    let rule = row_rule(RowCountCheck::Between {
        min_rows: 1,
        max_rows: 100,
    });
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new().on(rule.sql(), int_rows(&[4])),
    );

    let result = RuleEvaluator::new()
        .evaluate(&Rule::Rows(rule), &datasources)
        .unwrap();

    let TestResult::Passed(Passed::RowsOk(ok)) = result else {
        panic!("expected RowsOk, got {result:?}");
    };
    assert_eq!(ok.test_description, "customer rows should be between 1 and 100.");
    assert_eq!(ok.datasource_name, "dw");
    assert_eq!(ok.sql, "SELECT COUNT(*) AS row_ct FROM customer");
}

#[test]
fn row_count_equality_miss_reports_expected_and_actual() {
    let rule = row_rule(RowCountCheck::Equal { rows: 4000 });
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new().on(rule.sql(), int_rows(&[4])),
    );

    let result = RuleEvaluator::new()
        .evaluate(&Rule::Rows(rule), &datasources)
        .unwrap();

    let TestResult::Failed(Failed::RowCount(failure)) = result else {
        panic!("expected a RowCount failure, got {result:?}");
    };
    assert_eq!(
        failure.kind,
        RowCountFailureKind::DoesNotEqual {
            expected_row_count: 4000
        }
    );
    assert_eq!(failure.actual_row_count, 4);
    assert_eq!(failure.error_message(), "Expected 4000 rows, but got 4");
}

#[test]
fn missing_prefix_failure_carries_sorted_falsifying_examples() {
    // customer.name holds Mark, Steve, Mary, Bill; the falsifying query
    // returns the two names not starting with 'M'.
    let rule = column_rule(
        "name",
        DataType::Text,
        ColumnCheck::StartsWith {
            prefix: "M".into(),
            case_sensitive: false,
        },
    );
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new().on(rule.sql(), text_rows(&["Steve", "Bill"])),
    );

    let result = RuleEvaluator::new()
        .evaluate(&Rule::Column(rule), &datasources)
        .unwrap();

    let TestResult::Failed(Failed::InvalidValues(failure)) = result else {
        panic!("expected an InvalidValues failure, got {result:?}");
    };
    assert_eq!(
        failure.kind,
        InvalidValuesKind::MissingPrefix {
            prefix: "M".into(),
            case_sensitive: false
        }
    );
    assert_eq!(
        failure.falsifying_examples,
        vec![Value::Text("Bill".into()), Value::Text("Steve".into())]
    );
    assert_eq!(
        failure.error_message(),
        "One or more values were missing the prefix 'M'."
    );
}

#[test]
fn membership_rule_passes_when_no_values_escape_the_allowed_set() {
    let rule = column_rule(
        "id",
        DataType::Integer,
        ColumnCheck::NumberOneOf {
            values: BTreeSet::from([Value::Integer(1), Value::Integer(3)]),
        },
    );
    let datasources = single_datasource("dw", CannedDatasource::new().on(rule.sql(), vec![]));

    let result = RuleEvaluator::new()
        .evaluate(&Rule::Column(rule), &datasources)
        .unwrap();
    assert!(matches!(result, TestResult::Passed(Passed::ValuesOk(_))));
}

#[test]
fn membership_rule_rejects_values_outside_the_allowed_set() {
    let rule = column_rule(
        "id",
        DataType::Integer,
        ColumnCheck::NumberOneOf {
            values: BTreeSet::from([Value::Integer(1), Value::Integer(3)]),
        },
    );
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new().on(rule.sql(), int_rows(&[7, 7, 2])),
    );

    let result = RuleEvaluator::new()
        .evaluate(&Rule::Column(rule), &datasources)
        .unwrap();

    let TestResult::Failed(Failed::InvalidValues(failure)) = result else {
        panic!("expected an InvalidValues failure, got {result:?}");
    };
    assert_eq!(
        failure.falsifying_examples,
        vec![Value::Integer(2), Value::Integer(7)]
    );
    assert_eq!(
        failure.kind,
        InvalidValuesKind::NotOneOf {
            expected_values: vec![Value::Integer(1), Value::Integer(3)],
            case_sensitive: false
        }
    );
}

#[test]
fn falsifying_examples_respect_the_rule_budget() {
    let mut rule = column_rule(
        "name",
        DataType::Text,
        ColumnCheck::EndsWith {
            suffix: "a".into(),
            case_sensitive: false,
        },
    );
    rule.field.max_falsifying_examples = 2;
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new().on(rule.sql(), text_rows(&["Zoe", "Bill", "Mark", "Bill"])),
    );

    let result = RuleEvaluator::new()
        .evaluate(&Rule::Column(rule), &datasources)
        .unwrap();

    let TestResult::Failed(Failed::InvalidValues(failure)) = result else {
        panic!("expected an InvalidValues failure, got {result:?}");
    };
    assert_eq!(
        failure.falsifying_examples,
        vec![Value::Text("Bill".into()), Value::Text("Mark".into())]
    );
}

#[test]
fn sqlite_temporal_cells_decode_through_the_text_fallback() {
    let date = tablecheck_core::codec::parse_temporal_literal("2099-01-01", DataType::Datetime)
        .unwrap();
    let rule = column_rule(
        "date_added",
        DataType::Datetime,
        ColumnCheck::DateAfter { date },
    );
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new().on(
            rule.sql(),
            text_rows(&["2020-01-02", "2020-02-01T03:12:02.321"]),
        ),
    );

    let result = RuleEvaluator::new()
        .evaluate(&Rule::Column(rule), &datasources)
        .unwrap();

    let TestResult::Failed(Failed::InvalidValues(failure)) = result else {
        panic!("expected an InvalidValues failure, got {result:?}");
    };
    assert_eq!(failure.falsifying_examples.len(), 2);
    assert!(matches!(
        failure.kind,
        InvalidValuesKind::TooSmall { .. }
    ));
}

#[test]
fn matching_row_counts_pass_and_mismatches_report_both_sides() {
    let rule = RowsMatchRule {
        source_table: customer_table(),
        destination_table: sale_table(),
        tolerance: Tolerance::default(),
    };

    let datasources = single_datasource(
        "dw",
        CannedDatasource::new()
            .on(rule.source_sql(), int_rows(&[4]))
            .on(rule.destination_sql(), int_rows(&[4])),
    );
    let result = RuleEvaluator::new()
        .evaluate(&Rule::RowsMatch(rule.clone()), &datasources)
        .unwrap();
    assert!(matches!(
        result,
        TestResult::Passed(Passed::RowComparisonOk(_))
    ));

    let datasources = single_datasource(
        "dw",
        CannedDatasource::new()
            .on(rule.source_sql(), int_rows(&[4]))
            .on(rule.destination_sql(), int_rows(&[5])),
    );
    let result = RuleEvaluator::new()
        .evaluate(&Rule::RowsMatch(rule), &datasources)
        .unwrap();

    let TestResult::Failed(Failed::RowCounts(failure)) = result else {
        panic!("expected a RowCounts failure, got {result:?}");
    };
    assert_eq!(failure.source_rows, 4);
    assert_eq!(failure.destination_rows, 5);
    assert_eq!(
        failure.error_message(),
        "customer rows do not match sale rows."
    );
}

#[test]
fn mismatched_totals_report_both_aggregates() {
    let rule = TotalsMatchRule {
        source_field: field("id", DataType::Integer),
        destination_field: FieldRef {
            table_name: "sale".into(),
            field_name: "customer_id".into(),
            ..field("id", DataType::Integer)
        },
        tolerance: Tolerance::default(),
    };
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new()
            .on(rule.source_sql(), int_rows(&[10]))
            .on(rule.destination_sql(), int_rows(&[9])),
    );

    let result = RuleEvaluator::new()
        .evaluate(&Rule::TotalsMatch(rule), &datasources)
        .unwrap();

    let TestResult::Failed(Failed::ValuesDontMatch(failure)) = result else {
        panic!("expected a ValuesDontMatch failure, got {result:?}");
    };
    assert_eq!(failure.source_total, Value::Integer(10));
    assert_eq!(failure.destination_total, Value::Integer(9));
    assert_eq!(
        failure.error_message(),
        "customer.id = 10, but sale.customer_id = 9."
    );
}

#[test]
fn a_null_aggregate_is_an_explicit_empty_result() {
    // SUM over an empty table comes back as a NULL cell; that is a hard
    // error, never a silent zero.
    let rule = TotalsMatchRule {
        source_field: field("id", DataType::Integer),
        destination_field: FieldRef {
            table_name: "sale".into(),
            ..field("id", DataType::Integer)
        },
        tolerance: Tolerance::default(),
    };
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new()
            .on(rule.source_sql(), vec![vec![RawCell::Null]])
            .on(rule.destination_sql(), int_rows(&[9])),
    );

    let error = RuleEvaluator::new()
        .evaluate(&Rule::TotalsMatch(rule), &datasources)
        .unwrap_err();
    assert!(matches!(error, EvalError::Codec(_)));
}

#[test]
fn unresolvable_datasource_names_fail_evaluation() {
    let rule = row_rule(RowCountCheck::Equal { rows: 4 });
    let datasources = single_datasource("other", CannedDatasource::new());

    let error = RuleEvaluator::new()
        .evaluate(&Rule::Rows(rule), &datasources)
        .unwrap_err();
    let EvalError::DatasourceNotFound(name) = error else {
        panic!("expected DatasourceNotFound, got {error:?}");
    };
    assert_eq!(name, "dw");
}

#[test]
fn store_errors_surface_opaquely() {
    let rule = row_rule(RowCountCheck::Equal { rows: 4 });
    // No canned response registered: the executor fails.
    let datasources = single_datasource("dw", CannedDatasource::new());

    let error = RuleEvaluator::new()
        .evaluate(&Rule::Rows(rule), &datasources)
        .unwrap_err();
    assert!(matches!(error, EvalError::Execution(_)));
}

#[test]
fn tolerance_is_echoed_not_enforced() {
    // A wide tolerance does not loosen classification; it only rides along
    // into the result.
    let tolerance = Tolerance {
        flex: 10.0,
        flex_percent: 50.0,
        mostly: 0.5,
    };
    let rule = RowCountRule {
        table: customer_table(),
        check: RowCountCheck::Equal { rows: 5 },
        tolerance,
    };
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new().on(rule.sql(), int_rows(&[4])),
    );

    let result = RuleEvaluator::new()
        .evaluate(&Rule::Rows(rule), &datasources)
        .unwrap();
    assert!(!result.passed());
    assert_eq!(result.tolerance(), &tolerance);
}

#[test]
fn results_round_trip_through_json() {
    let rule = row_rule(RowCountCheck::Equal { rows: 4000 });
    let datasources = single_datasource(
        "dw",
        CannedDatasource::new().on(rule.sql(), int_rows(&[4])),
    );
    let result = RuleEvaluator::new()
        .evaluate(&Rule::Rows(rule), &datasources)
        .unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let decoded: TestResult = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, result);
}
