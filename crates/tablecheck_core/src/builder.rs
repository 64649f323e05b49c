//! Fluent builders for assembling a catalog.
//!
//! Builders collect rule parameters in their raw, author-supplied form and
//! resolve them when the suite is built: the datasource's dialect, each
//! table's subquery, and the suite's falsifying-example budget thread down
//! to every rule; numeric literals are cast into the field's declared
//! domain and temporal strings are parsed domain-first. A literal that
//! cannot be represented makes [`TestSuiteBuilder::build`] fail; rules are
//! never constructed half-typed.

use std::collections::BTreeSet;

use crate::catalog::{Datasource, Field, Table, TestSuite};
use crate::codec::{cast_literal, parse_temporal_literal};
use crate::dialect::SqlDialect;
use crate::error::CatalogError;
use crate::rule::{
    ColumnCheck, ColumnRule, FieldRef, MultiTableRule, RowCountCheck, RowCountRule, RowsMatchRule,
    TableRef, Tolerance, TotalsMatchRule,
};
use crate::value::{DataType, Value};

const DEFAULT_MAX_FALSIFYING_EXAMPLES: i64 = 3;

/// Builder for a [`TestSuite`].
///
/// # Example
///
/// ```rust
/// use tablecheck_core::builder::{DatasourceBuilder, TableBuilder, TestSuiteBuilder, text_field};
/// use tablecheck_core::dialect::SqlDialect;
///
/// let suite = TestSuiteBuilder::new()
///     .datasource(
///         DatasourceBuilder::new("dw", SqlDialect::Sqlite).table(
///             TableBuilder::new("customer")
///                 .rows_should_be_between(1, 100)
///                 .field(text_field("name").should_start_with("M")),
///         ),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(suite.rules().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct TestSuiteBuilder {
    max_falsifying_examples: Option<i64>,
    datasources: Vec<DatasourceBuilder>,
    tolerance: Tolerance,
    rows_match: Vec<(TableSelector, TableSelector, Tolerance)>,
    totals_match: Vec<(FieldSelector, FieldSelector, Tolerance)>,
}

#[derive(Debug)]
struct TableSelector {
    datasource_name: String,
    table_name: String,
}

#[derive(Debug)]
struct FieldSelector {
    datasource_name: String,
    table_name: String,
    field_name: String,
}

impl TestSuiteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the suite-wide falsifying-example budget (default 3).
    pub fn max_falsifying_examples(mut self, max: i64) -> Self {
        self.max_falsifying_examples = Some(max);
        self
    }

    /// Sets the tolerance stamped on cross-source rules added after this
    /// call.
    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn datasource(mut self, datasource: DatasourceBuilder) -> Self {
        self.datasources.push(datasource);
        self
    }

    /// Declares that two tables' row counts must match. The tables are
    /// referenced as `(datasource, table)` and resolved when the suite is
    /// built.
    pub fn rows_should_match(
        mut self,
        source: (&str, &str),
        destination: (&str, &str),
    ) -> Self {
        let tolerance = self.tolerance;
        self.rows_match.push((
            TableSelector {
                datasource_name: source.0.into(),
                table_name: source.1.into(),
            },
            TableSelector {
                datasource_name: destination.0.into(),
                table_name: destination.1.into(),
            },
            tolerance,
        ));
        self
    }

    /// Declares that two numeric columns' totals must match. The fields are
    /// referenced as `(datasource, table, field)` and resolved when the
    /// suite is built.
    pub fn totals_should_match(
        mut self,
        source: (&str, &str, &str),
        destination: (&str, &str, &str),
    ) -> Self {
        let tolerance = self.tolerance;
        self.totals_match.push((
            FieldSelector {
                datasource_name: source.0.into(),
                table_name: source.1.into(),
                field_name: source.2.into(),
            },
            FieldSelector {
                datasource_name: destination.0.into(),
                table_name: destination.1.into(),
                field_name: destination.2.into(),
            },
            tolerance,
        ));
        self
    }

    pub fn build(self) -> Result<TestSuite, CatalogError> {
        let max = self
            .max_falsifying_examples
            .unwrap_or(DEFAULT_MAX_FALSIFYING_EXAMPLES);

        let datasources = self
            .datasources
            .into_iter()
            .map(|ds| ds.build(max))
            .collect::<Result<Vec<_>, _>>()?;

        let mut multi_table_rules = Vec::new();
        for (source, destination, tolerance) in &self.rows_match {
            multi_table_rules.push(MultiTableRule::RowsMatch(RowsMatchRule {
                source_table: resolve_table(&datasources, source)?,
                destination_table: resolve_table(&datasources, destination)?,
                tolerance: *tolerance,
            }));
        }
        for (source, destination, tolerance) in &self.totals_match {
            multi_table_rules.push(MultiTableRule::TotalsMatch(TotalsMatchRule {
                source_field: resolve_field(&datasources, source)?,
                destination_field: resolve_field(&datasources, destination)?,
                tolerance: *tolerance,
            }));
        }

        Ok(TestSuite {
            datasources,
            multi_table_rules,
        })
    }
}

fn resolve_table(datasources: &[Datasource], selector: &TableSelector) -> Result<TableRef, CatalogError> {
    let datasource = datasources
        .iter()
        .find(|ds| ds.name == selector.datasource_name)
        .ok_or_else(|| CatalogError::UnknownDatasource(selector.datasource_name.clone()))?;
    let table = datasource
        .table(&selector.table_name)
        .ok_or_else(|| CatalogError::TableNotFound {
            datasource_name: selector.datasource_name.clone(),
            table_name: selector.table_name.clone(),
        })?;
    Ok(table.to_ref())
}

fn resolve_field(datasources: &[Datasource], selector: &FieldSelector) -> Result<FieldRef, CatalogError> {
    let datasource = datasources
        .iter()
        .find(|ds| ds.name == selector.datasource_name)
        .ok_or_else(|| CatalogError::UnknownDatasource(selector.datasource_name.clone()))?;
    let table = datasource
        .table(&selector.table_name)
        .ok_or_else(|| CatalogError::TableNotFound {
            datasource_name: selector.datasource_name.clone(),
            table_name: selector.table_name.clone(),
        })?;
    let field = table
        .field(&selector.field_name)
        .ok_or_else(|| CatalogError::FieldNotFound {
            table_name: selector.table_name.clone(),
            field_name: selector.field_name.clone(),
        })?;
    if !field.data_type.is_numeric() {
        return Err(CatalogError::Codec(crate::error::CodecError::IncompatibleDomain(
            format!(
                "column totals require a numeric field, but '{}' is {}",
                field.field_name, field.data_type
            ),
        )));
    }
    Ok(field.to_ref())
}

/// Builder for a [`Datasource`].
#[derive(Debug)]
pub struct DatasourceBuilder {
    name: String,
    dialect: SqlDialect,
    tables: Vec<TableBuilder>,
}

impl DatasourceBuilder {
    pub fn new(name: impl Into<String>, dialect: SqlDialect) -> Self {
        Self {
            name: name.into(),
            dialect,
            tables: Vec::new(),
        }
    }

    /// Creates a datasource builder from a textual dialect tag, failing on
    /// an unrecognized tag.
    pub fn with_dialect_name(name: impl Into<String>, dialect: &str) -> Result<Self, CatalogError> {
        Ok(Self::new(name, dialect.parse()?))
    }

    pub fn table(mut self, table: TableBuilder) -> Self {
        self.tables.push(table);
        self
    }

    fn build(self, max_falsifying_examples: i64) -> Result<Datasource, CatalogError> {
        let tables = self
            .tables
            .into_iter()
            .map(|t| t.build(&self.name, self.dialect, max_falsifying_examples))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Datasource {
            name: self.name,
            dialect: self.dialect,
            tables,
            max_falsifying_examples,
        })
    }
}

/// Builder for a [`Table`] and its row rules.
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    subquery: Option<String>,
    tolerance: Tolerance,
    row_checks: Vec<(RowCountCheck, Tolerance)>,
    fields: Vec<FieldSpec>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subquery: None,
            tolerance: Tolerance::default(),
            row_checks: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Replaces the raw table with a subquery; queries compile against
    /// `(subquery) AS t`.
    pub fn subquery(mut self, sql: impl Into<String>) -> Self {
        self.subquery = Some(sql.into());
        self
    }

    /// Sets the tolerance stamped on row rules added after this call.
    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn rows_should_equal(mut self, rows: i64) -> Self {
        self.row_checks.push((RowCountCheck::Equal { rows }, self.tolerance));
        self
    }

    pub fn rows_should_be_at_least(mut self, min_rows: i64) -> Self {
        self.row_checks
            .push((RowCountCheck::AtLeast { min_rows }, self.tolerance));
        self
    }

    pub fn rows_should_be_at_most(mut self, max_rows: i64) -> Self {
        self.row_checks
            .push((RowCountCheck::AtMost { max_rows }, self.tolerance));
        self
    }

    pub fn rows_should_be_between(mut self, min_rows: i64, max_rows: i64) -> Self {
        self.row_checks
            .push((RowCountCheck::Between { min_rows, max_rows }, self.tolerance));
        self
    }

    pub fn field(mut self, field: impl Into<FieldSpec>) -> Self {
        self.fields.push(field.into());
        self
    }

    fn build(
        self,
        datasource_name: &str,
        dialect: SqlDialect,
        max_falsifying_examples: i64,
    ) -> Result<Table, CatalogError> {
        let table_ref = TableRef {
            datasource_name: datasource_name.to_string(),
            table_name: self.name.clone(),
            subquery: self.subquery.clone(),
            dialect,
        };
        let rules = self
            .row_checks
            .into_iter()
            .map(|(check, tolerance)| RowCountRule {
                table: table_ref.clone(),
                check,
                tolerance,
            })
            .collect();
        let fields = self
            .fields
            .into_iter()
            .map(|f| {
                f.build(
                    datasource_name,
                    &self.name,
                    self.subquery.as_deref(),
                    dialect,
                    max_falsifying_examples,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Table {
            datasource_name: datasource_name.to_string(),
            table_name: self.name,
            subquery: self.subquery,
            dialect,
            fields,
            rules,
            max_falsifying_examples,
        })
    }
}

/// A field builder of any domain, as accepted by [`TableBuilder::field`].
#[derive(Debug)]
pub enum FieldSpec {
    Date(DateFieldBuilder),
    Number(NumberFieldBuilder),
    Text(TextFieldBuilder),
}

impl From<DateFieldBuilder> for FieldSpec {
    fn from(builder: DateFieldBuilder) -> Self {
        Self::Date(builder)
    }
}

impl From<NumberFieldBuilder> for FieldSpec {
    fn from(builder: NumberFieldBuilder) -> Self {
        Self::Number(builder)
    }
}

impl From<TextFieldBuilder> for FieldSpec {
    fn from(builder: TextFieldBuilder) -> Self {
        Self::Text(builder)
    }
}

impl FieldSpec {
    fn build(
        self,
        datasource_name: &str,
        table_name: &str,
        subquery: Option<&str>,
        dialect: SqlDialect,
        max_falsifying_examples: i64,
    ) -> Result<Field, CatalogError> {
        let ctx = FieldContext {
            datasource_name,
            table_name,
            subquery,
            dialect,
            max_falsifying_examples,
        };
        match self {
            Self::Date(builder) => builder.build(&ctx),
            Self::Number(builder) => builder.build(&ctx),
            Self::Text(builder) => builder.build(&ctx),
        }
    }
}

struct FieldContext<'a> {
    datasource_name: &'a str,
    table_name: &'a str,
    subquery: Option<&'a str>,
    dialect: SqlDialect,
    max_falsifying_examples: i64,
}

impl FieldContext<'_> {
    fn field_ref(&self, field_name: &str, data_type: DataType) -> FieldRef {
        FieldRef {
            datasource_name: self.datasource_name.to_string(),
            table_name: self.table_name.to_string(),
            field_name: field_name.to_string(),
            subquery: self.subquery.map(str::to_string),
            dialect: self.dialect,
            data_type,
            max_falsifying_examples: self.max_falsifying_examples,
        }
    }

    fn field(
        &self,
        field_name: String,
        data_type: DataType,
        case_sensitive: bool,
        rules: Vec<ColumnRule>,
    ) -> Field {
        Field {
            datasource_name: self.datasource_name.to_string(),
            table_name: self.table_name.to_string(),
            field_name,
            subquery: self.subquery.map(str::to_string),
            dialect: self.dialect,
            data_type,
            case_sensitive,
            rules,
            max_falsifying_examples: self.max_falsifying_examples,
        }
    }
}

/// A DATE field. Rule parameters accept `%Y-%m-%d` first, falling back to
/// `%Y-%m-%dT%H:%M:%S`.
pub fn date_field(name: impl Into<String>) -> DateFieldBuilder {
    DateFieldBuilder::new(name, DataType::Date)
}

/// A DATETIME field. Rule parameters accept `%Y-%m-%dT%H:%M:%S` first,
/// falling back to `%Y-%m-%d`.
pub fn datetime_field(name: impl Into<String>) -> DateFieldBuilder {
    DateFieldBuilder::new(name, DataType::Datetime)
}

/// A DECIMAL field.
pub fn decimal_field(name: impl Into<String>) -> NumberFieldBuilder {
    NumberFieldBuilder::new(name, DataType::Decimal)
}

/// A FLOAT field.
pub fn float_field(name: impl Into<String>) -> NumberFieldBuilder {
    NumberFieldBuilder::new(name, DataType::Float)
}

/// An INTEGER field.
pub fn integer_field(name: impl Into<String>) -> NumberFieldBuilder {
    NumberFieldBuilder::new(name, DataType::Integer)
}

/// A TEXT field; case-insensitive unless [`TextFieldBuilder::case_sensitive`]
/// says otherwise.
pub fn text_field(name: impl Into<String>) -> TextFieldBuilder {
    TextFieldBuilder::new(name)
}

#[derive(Debug)]
enum DateCheckSpec {
    After(String),
    OnOrAfter(String),
    Before(String),
    OnOrBefore(String),
    Between(String, String),
}

/// Builder for a temporal field and its rules.
#[derive(Debug)]
pub struct DateFieldBuilder {
    name: String,
    data_type: DataType,
    tolerance: Tolerance,
    checks: Vec<(DateCheckSpec, Tolerance)>,
}

impl DateFieldBuilder {
    fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            tolerance: Tolerance::default(),
            checks: Vec::new(),
        }
    }

    /// Sets the tolerance stamped on rules added after this call.
    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn should_be_after(mut self, date: impl Into<String>) -> Self {
        self.checks
            .push((DateCheckSpec::After(date.into()), self.tolerance));
        self
    }

    pub fn should_be_on_or_after(mut self, date: impl Into<String>) -> Self {
        self.checks
            .push((DateCheckSpec::OnOrAfter(date.into()), self.tolerance));
        self
    }

    pub fn should_be_before(mut self, date: impl Into<String>) -> Self {
        self.checks
            .push((DateCheckSpec::Before(date.into()), self.tolerance));
        self
    }

    pub fn should_be_on_or_before(mut self, date: impl Into<String>) -> Self {
        self.checks
            .push((DateCheckSpec::OnOrBefore(date.into()), self.tolerance));
        self
    }

    pub fn should_be_between(
        mut self,
        min_date: impl Into<String>,
        max_date: impl Into<String>,
    ) -> Self {
        self.checks.push((
            DateCheckSpec::Between(min_date.into(), max_date.into()),
            self.tolerance,
        ));
        self
    }

    fn build(self, ctx: &FieldContext<'_>) -> Result<Field, CatalogError> {
        let field_ref = ctx.field_ref(&self.name, self.data_type);
        let mut rules = Vec::new();
        for (spec, tolerance) in self.checks {
            let check = match spec {
                DateCheckSpec::After(date) => ColumnCheck::DateAfter {
                    date: parse_temporal_literal(&date, self.data_type)?,
                },
                DateCheckSpec::OnOrAfter(date) => ColumnCheck::DateOnOrAfter {
                    date: parse_temporal_literal(&date, self.data_type)?,
                },
                DateCheckSpec::Before(date) => ColumnCheck::DateBefore {
                    date: parse_temporal_literal(&date, self.data_type)?,
                },
                DateCheckSpec::OnOrBefore(date) => ColumnCheck::DateOnOrBefore {
                    date: parse_temporal_literal(&date, self.data_type)?,
                },
                DateCheckSpec::Between(min_date, max_date) => ColumnCheck::DateBetween {
                    min_date: parse_temporal_literal(&min_date, self.data_type)?,
                    max_date: parse_temporal_literal(&max_date, self.data_type)?,
                },
            };
            rules.push(ColumnRule {
                field: field_ref.clone(),
                check,
                tolerance,
            });
        }
        Ok(ctx.field(self.name, self.data_type, false, rules))
    }
}

#[derive(Debug)]
enum NumberCheckSpec {
    AtLeast(Value),
    AtMost(Value),
    Between(Value, Value),
    OneOf(Vec<Value>),
}

/// Builder for a numeric field and its rules. Literals are cast into the
/// field's declared kind when the suite is built.
#[derive(Debug)]
pub struct NumberFieldBuilder {
    name: String,
    data_type: DataType,
    tolerance: Tolerance,
    checks: Vec<(NumberCheckSpec, Tolerance)>,
}

impl NumberFieldBuilder {
    fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            tolerance: Tolerance::default(),
            checks: Vec::new(),
        }
    }

    /// Sets the tolerance stamped on rules added after this call.
    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn should_be_at_least(mut self, min_value: impl Into<Value>) -> Self {
        self.checks
            .push((NumberCheckSpec::AtLeast(min_value.into()), self.tolerance));
        self
    }

    pub fn should_be_at_most(mut self, max_value: impl Into<Value>) -> Self {
        self.checks
            .push((NumberCheckSpec::AtMost(max_value.into()), self.tolerance));
        self
    }

    pub fn should_be_between(
        mut self,
        min_value: impl Into<Value>,
        max_value: impl Into<Value>,
    ) -> Self {
        self.checks.push((
            NumberCheckSpec::Between(min_value.into(), max_value.into()),
            self.tolerance,
        ));
        self
    }

    pub fn should_be_one_of<V: Into<Value>>(
        mut self,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.checks.push((
            NumberCheckSpec::OneOf(values.into_iter().map(Into::into).collect()),
            self.tolerance,
        ));
        self
    }

    fn build(self, ctx: &FieldContext<'_>) -> Result<Field, CatalogError> {
        let field_ref = ctx.field_ref(&self.name, self.data_type);
        let mut rules = Vec::new();
        for (spec, tolerance) in self.checks {
            let check = match spec {
                NumberCheckSpec::AtLeast(min_value) => ColumnCheck::AtLeast {
                    min_value: cast_literal(&min_value, self.data_type)?,
                },
                NumberCheckSpec::AtMost(max_value) => ColumnCheck::AtMost {
                    max_value: cast_literal(&max_value, self.data_type)?,
                },
                NumberCheckSpec::Between(min_value, max_value) => ColumnCheck::Between {
                    min_value: cast_literal(&min_value, self.data_type)?,
                    max_value: cast_literal(&max_value, self.data_type)?,
                },
                NumberCheckSpec::OneOf(values) => {
                    let cast = values
                        .iter()
                        .map(|v| cast_literal(v, self.data_type))
                        .collect::<Result<BTreeSet<_>, _>>()?;
                    ColumnCheck::NumberOneOf { values: cast }
                }
            };
            rules.push(ColumnRule {
                field: field_ref.clone(),
                check,
                tolerance,
            });
        }
        Ok(ctx.field(self.name, self.data_type, false, rules))
    }
}

#[derive(Debug)]
enum TextCheckSpec {
    Like(String),
    StartsWith(String),
    EndsWith(String),
    OneOf(Vec<String>),
    LengthBetween(i64, i64),
}

/// Builder for a text field and its rules.
#[derive(Debug)]
pub struct TextFieldBuilder {
    name: String,
    case_sensitive: bool,
    tolerance: Tolerance,
    checks: Vec<(TextCheckSpec, Tolerance)>,
}

impl TextFieldBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            case_sensitive: false,
            tolerance: Tolerance::default(),
            checks: Vec::new(),
        }
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Sets the tolerance stamped on rules added after this call.
    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn should_be_like(mut self, fragment: impl Into<String>) -> Self {
        self.checks
            .push((TextCheckSpec::Like(fragment.into()), self.tolerance));
        self
    }

    pub fn should_start_with(mut self, prefix: impl Into<String>) -> Self {
        self.checks
            .push((TextCheckSpec::StartsWith(prefix.into()), self.tolerance));
        self
    }

    pub fn should_end_with(mut self, suffix: impl Into<String>) -> Self {
        self.checks
            .push((TextCheckSpec::EndsWith(suffix.into()), self.tolerance));
        self
    }

    pub fn should_be_one_of<S: Into<String>>(
        mut self,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        self.checks.push((
            TextCheckSpec::OneOf(values.into_iter().map(Into::into).collect()),
            self.tolerance,
        ));
        self
    }

    pub fn lengths_should_be_between(mut self, min_length: i64, max_length: i64) -> Self {
        self.checks.push((
            TextCheckSpec::LengthBetween(min_length, max_length),
            self.tolerance,
        ));
        self
    }

    fn build(self, ctx: &FieldContext<'_>) -> Result<Field, CatalogError> {
        let field_ref = ctx.field_ref(&self.name, DataType::Text);
        let case_sensitive = self.case_sensitive;
        let rules = self
            .checks
            .into_iter()
            .map(|(spec, tolerance)| {
                let check = match spec {
                    TextCheckSpec::Like(fragment) => ColumnCheck::Like {
                        fragment,
                        case_sensitive,
                    },
                    TextCheckSpec::StartsWith(prefix) => ColumnCheck::StartsWith {
                        prefix,
                        case_sensitive,
                    },
                    TextCheckSpec::EndsWith(suffix) => ColumnCheck::EndsWith {
                        suffix,
                        case_sensitive,
                    },
                    TextCheckSpec::OneOf(values) => ColumnCheck::TextOneOf {
                        values: values.into_iter().collect(),
                        case_sensitive,
                    },
                    TextCheckSpec::LengthBetween(min_length, max_length) => {
                        ColumnCheck::LengthBetween {
                            min_length,
                            max_length,
                        }
                    }
                };
                ColumnRule {
                    field: field_ref.clone(),
                    check,
                    tolerance,
                }
            })
            .collect();
        Ok(ctx.field(self.name, DataType::Text, case_sensitive, rules))
    }
}
