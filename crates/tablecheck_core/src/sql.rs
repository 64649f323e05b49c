//! The rule-to-predicate compiler.
//!
//! Rules compile to templated SQL fragments rather than going through a
//! general query builder: the rule shapes are closed, and the compiled text
//! is echoed verbatim into failure reports, so it has to stay human-auditable.
//!
//! Text literals are interpolated without escaping: an embedded quote in a
//! fragment, prefix, suffix, or membership set passes through into the
//! generated SQL as-is. Known limitation of the templated approach; rule
//! parameters come from suite authors, not from the data under test.

use std::fmt::Write;

use crate::rule::{ColumnCheck, ColumnRule, FieldRef, RowCountRule, RowsMatchRule, TableRef, TotalsMatchRule};
use crate::value::{Value, format_timestamp};
use crate::dialect::SqlDialect;

/// A subquery override is wrapped and aliased; otherwise the raw table name
/// is used.
fn table_or_subquery(table_name: &str, subquery: Option<&str>) -> String {
    match subquery {
        Some(sql) => format!("({sql}) AS t"),
        None => table_name.to_string(),
    }
}

impl TableRef {
    fn from_clause(&self) -> String {
        table_or_subquery(&self.table_name, self.subquery.as_deref())
    }

    /// The row-count query for this table.
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) AS row_ct FROM {}", self.from_clause())
    }
}

impl FieldRef {
    fn from_clause(&self) -> String {
        table_or_subquery(&self.table_name, self.subquery.as_deref())
    }

    /// The field name wrapped in the dialect's identifier quoting.
    pub fn wrapped_field_name(&self) -> String {
        self.dialect.quote_identifier(&self.field_name)
    }

    /// The column-total query for this field.
    pub fn sum_sql(&self) -> String {
        format!(
            "SELECT SUM({}) AS total FROM {}",
            self.wrapped_field_name(),
            self.from_clause()
        )
    }
}

impl RowCountRule {
    /// The compiled query; always returns exactly one aggregate row.
    pub fn sql(&self) -> String {
        self.table.count_sql()
    }
}

impl RowsMatchRule {
    pub fn source_sql(&self) -> String {
        self.source_table.count_sql()
    }

    pub fn destination_sql(&self) -> String {
        self.destination_table.count_sql()
    }
}

impl TotalsMatchRule {
    pub fn source_sql(&self) -> String {
        self.source_field.sum_sql()
    }

    pub fn destination_sql(&self) -> String {
        self.destination_field.sum_sql()
    }
}

impl ColumnRule {
    /// The boolean fragment true exactly for rows violating the rule.
    pub fn predicate_to_falsify(&self) -> String {
        let field = self.field.wrapped_field_name();
        match &self.check {
            ColumnCheck::DateAfter { date } => {
                format!("{field} <= {}", date_literal(date))
            }
            ColumnCheck::DateOnOrAfter { date } => {
                format!("{field} < {}", date_literal(date))
            }
            ColumnCheck::DateBefore { date } => {
                format!("{field} >= {}", date_literal(date))
            }
            ColumnCheck::DateOnOrBefore { date } => {
                format!("{field} > {}", date_literal(date))
            }
            ColumnCheck::DateBetween { min_date, max_date } => format!(
                "{field} NOT BETWEEN {} AND {}",
                date_literal(min_date),
                date_literal(max_date)
            ),
            ColumnCheck::Like { fragment, .. } => {
                format!("{field} NOT LIKE '%{fragment}%'")
            }
            ColumnCheck::StartsWith { prefix, .. } => {
                format!("{field} NOT LIKE '{prefix}%'")
            }
            ColumnCheck::EndsWith { suffix, .. } => {
                format!("{field} NOT LIKE '%{suffix}'")
            }
            ColumnCheck::TextOneOf { values, .. } => {
                let list = join_literals(values.iter().map(|v| format!("'{v}'")));
                format!("{field} NOT IN ({list})")
            }
            ColumnCheck::LengthBetween { min_length, max_length } => {
                format!("LENGTH({field}) NOT BETWEEN {min_length} AND {max_length}")
            }
            ColumnCheck::AtLeast { min_value } => {
                format!("{field} < {}", min_value.to_sql_literal())
            }
            ColumnCheck::AtMost { max_value } => {
                format!("{field} > {}", max_value.to_sql_literal())
            }
            ColumnCheck::Between { min_value, max_value } => format!(
                "{field} NOT BETWEEN {} AND {}",
                min_value.to_sql_literal(),
                max_value.to_sql_literal()
            ),
            ColumnCheck::NumberOneOf { values } => {
                let list = join_literals(values.iter().map(Value::to_sql_literal));
                format!("{field} NOT IN ({list})")
            }
        }
    }

    /// The compiled query: the wrapped field from the resolved table (or
    /// subquery), filtered to violating rows, capped to the rule's example
    /// budget with the dialect's row-limit clause.
    pub fn sql(&self) -> String {
        let field = self.field.wrapped_field_name();
        let from = self.field.from_clause();
        let predicate = self.predicate_to_falsify();
        let cap = self.field.max_falsifying_examples;
        match self.field.dialect {
            SqlDialect::Mssql => {
                format!("SELECT TOP ({cap}) {field} FROM {from} WHERE {predicate}")
            }
            _ => format!("SELECT {field} FROM {from} WHERE {predicate} LIMIT ({cap})"),
        }
    }
}

fn date_literal(date: &chrono::NaiveDateTime) -> String {
    format!("'{}'", format_timestamp(date))
}

fn join_literals(literals: impl Iterator<Item = String>) -> String {
    let mut out = String::new();
    for (i, literal) in literals.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{literal}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RowCountCheck, Tolerance};
    use crate::value::DataType;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn field(name: &str, data_type: DataType, dialect: SqlDialect) -> FieldRef {
        FieldRef {
            datasource_name: "dw".into(),
            table_name: "dummy_table".into(),
            field_name: name.into(),
            subquery: None,
            dialect,
            data_type,
            max_falsifying_examples: 3,
        }
    }

    fn column(check: ColumnCheck, dialect: SqlDialect) -> ColumnRule {
        let data_type = match &check {
            ColumnCheck::AtLeast { .. }
            | ColumnCheck::AtMost { .. }
            | ColumnCheck::Between { .. }
            | ColumnCheck::NumberOneOf { .. } => DataType::Integer,
            ColumnCheck::DateAfter { .. }
            | ColumnCheck::DateOnOrAfter { .. }
            | ColumnCheck::DateBefore { .. }
            | ColumnCheck::DateOnOrBefore { .. }
            | ColumnCheck::DateBetween { .. } => DataType::Datetime,
            _ => DataType::Text,
        };
        ColumnRule {
            field: field("dummy_field", data_type, dialect),
            check,
            tolerance: Tolerance::default(),
        }
    }

    #[test]
    fn length_predicate_under_a_double_quote_dialect() {
        let rule = column(
            ColumnCheck::LengthBetween {
                min_length: 3,
                max_length: 40,
            },
            SqlDialect::Sqlite,
        );
        assert_eq!(
            rule.predicate_to_falsify(),
            "LENGTH(\"dummy_field\") NOT BETWEEN 3 AND 40"
        );
    }

    #[test]
    fn mssql_brackets_and_top_prefix() {
        let rule = column(
            ColumnCheck::StartsWith {
                prefix: "M".into(),
                case_sensitive: false,
            },
            SqlDialect::Mssql,
        );
        assert_eq!(
            rule.sql(),
            "SELECT TOP (3) [dummy_field] FROM dummy_table WHERE [dummy_field] NOT LIKE 'M%'"
        );
    }

    #[test]
    fn limit_suffix_under_non_mssql_dialects() {
        let rule = column(
            ColumnCheck::Like {
                fragment: "ar".into(),
                case_sensitive: false,
            },
            SqlDialect::Sqlite,
        );
        assert_eq!(
            rule.sql(),
            "SELECT \"dummy_field\" FROM dummy_table WHERE \"dummy_field\" NOT LIKE '%ar%' LIMIT (3)"
        );
    }

    #[test]
    fn membership_predicates_list_sql_literals() {
        let rule = column(
            ColumnCheck::NumberOneOf {
                values: BTreeSet::from([Value::Integer(724), Value::Integer(421)]),
            },
            SqlDialect::Sqlite,
        );
        assert_eq!(
            rule.predicate_to_falsify(),
            "\"dummy_field\" NOT IN (421, 724)"
        );

        let rule = column(
            ColumnCheck::TextOneOf {
                values: BTreeSet::from(["Mark".to_string(), "Steve".to_string()]),
                case_sensitive: false,
            },
            SqlDialect::Sqlite,
        );
        assert_eq!(
            rule.predicate_to_falsify(),
            "\"dummy_field\" NOT IN ('Mark', 'Steve')"
        );
    }

    #[test]
    fn date_predicates_quote_iso_literals() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let rule = column(ColumnCheck::DateAfter { date }, SqlDialect::Sqlite);
        assert_eq!(
            rule.predicate_to_falsify(),
            "\"dummy_field\" <= '2020-01-01T00:00:00'"
        );
    }

    #[test]
    fn subquery_overrides_are_wrapped_and_aliased() {
        let mut rule = column(
            ColumnCheck::EndsWith {
                suffix: "Z".into(),
                case_sensitive: true,
            },
            SqlDialect::Sqlite,
        );
        rule.field.subquery = Some("SELECT * FROM customer WHERE active = 1".into());
        assert_eq!(
            rule.sql(),
            "SELECT \"dummy_field\" FROM (SELECT * FROM customer WHERE active = 1) AS t \
             WHERE \"dummy_field\" NOT LIKE '%Z' LIMIT (3)"
        );
    }

    #[test]
    fn row_count_queries_select_count_star() {
        let rule = RowCountRule {
            table: TableRef {
                datasource_name: "dw".into(),
                table_name: "customer".into(),
                subquery: None,
                dialect: SqlDialect::Sqlite,
            },
            check: RowCountCheck::Equal { rows: 4 },
            tolerance: Tolerance::default(),
        };
        assert_eq!(rule.sql(), "SELECT COUNT(*) AS row_ct FROM customer");
    }

    #[test]
    fn totals_queries_select_sum_per_side() {
        let rule = TotalsMatchRule {
            source_field: field("id", DataType::Integer, SqlDialect::Sqlite),
            destination_field: field("id", DataType::Integer, SqlDialect::Mssql),
            tolerance: Tolerance::default(),
        };
        assert_eq!(rule.source_sql(), "SELECT SUM(\"id\") AS total FROM dummy_table");
        assert_eq!(rule.destination_sql(), "SELECT SUM([id]) AS total FROM dummy_table");
    }

    #[test]
    fn compiling_twice_yields_identical_text() {
        let rule = column(
            ColumnCheck::Between {
                min_value: Value::Integer(0),
                max_value: Value::Integer(9999),
            },
            SqlDialect::Sqlite,
        );
        assert_eq!(rule.sql(), rule.sql());
        assert_eq!(rule.predicate_to_falsify(), rule.predicate_to_falsify());
    }

    #[test]
    fn text_literals_are_not_escaped() {
        // Embedded quotes flow into the SQL verbatim; the limitation is
        // pinned here so a change to literal handling is a conscious one.
        let rule = column(
            ColumnCheck::StartsWith {
                prefix: "O'Brien".into(),
                case_sensitive: true,
            },
            SqlDialect::Sqlite,
        );
        assert_eq!(
            rule.predicate_to_falsify(),
            "\"dummy_field\" NOT LIKE 'O'Brien%'"
        );
    }
}
