//! The catalog hierarchy: datasources own tables, tables own fields and
//! row rules, fields own column rules. A [`TestSuite`] flattens the whole
//! hierarchy into one ordered rule sequence for the engine.

use serde::{Deserialize, Serialize};

use crate::dialect::SqlDialect;
use crate::error::CatalogError;
use crate::rule::{ColumnRule, FieldRef, MultiTableRule, RowCountRule, Rule, TableRef};
use crate::validate::RuleValidationResult;
use crate::value::DataType;

/// A named, connectable relational store referenced by rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datasource {
    pub name: String,
    pub dialect: SqlDialect,
    pub tables: Vec<Table>,
    pub max_falsifying_examples: i64,
}

impl Datasource {
    /// Looks up a table by name.
    pub fn table(&self, table_name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.table_name == table_name)
    }
}

/// A table (or named subquery) and the rules declared against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub datasource_name: String,
    pub table_name: String,
    pub subquery: Option<String>,
    pub dialect: SqlDialect,
    pub fields: Vec<Field>,
    pub rules: Vec<RowCountRule>,
    pub max_falsifying_examples: i64,
}

impl Table {
    /// Looks up a field by name.
    pub fn field(&self, field_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.field_name == field_name)
    }

    pub fn to_ref(&self) -> TableRef {
        TableRef {
            datasource_name: self.datasource_name.clone(),
            table_name: self.table_name.clone(),
            subquery: self.subquery.clone(),
            dialect: self.dialect,
        }
    }
}

/// A column with a declared value domain and the rules declared against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub datasource_name: String,
    pub table_name: String,
    pub field_name: String,
    pub subquery: Option<String>,
    pub dialect: SqlDialect,
    pub data_type: DataType,
    /// Recorded for text fields and echoed into text-rule failures.
    pub case_sensitive: bool,
    pub rules: Vec<ColumnRule>,
    pub max_falsifying_examples: i64,
}

impl Field {
    pub fn to_ref(&self) -> FieldRef {
        FieldRef {
            datasource_name: self.datasource_name.clone(),
            table_name: self.table_name.clone(),
            field_name: self.field_name.clone(),
            subquery: self.subquery.clone(),
            dialect: self.dialect,
            data_type: self.data_type,
            max_falsifying_examples: self.max_falsifying_examples,
        }
    }
}

/// The full catalog: datasources plus suite-level cross-source rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub datasources: Vec<Datasource>,
    pub multi_table_rules: Vec<MultiTableRule>,
}

impl TestSuite {
    /// Looks up a datasource by name.
    pub fn datasource(&self, name: &str) -> Option<&Datasource> {
        self.datasources.iter().find(|ds| ds.name == name)
    }

    /// Flattens the catalog into one ordered rule sequence: per datasource,
    /// per table (row rules first, then each field's column rules in
    /// declaration order), with the suite-level cross-source rules once at
    /// the end. Evaluation results come back in this order.
    pub fn rules(&self) -> Vec<Rule> {
        let mut rules = Vec::new();
        for datasource in &self.datasources {
            for table in &datasource.tables {
                rules.extend(table.rules.iter().cloned().map(Rule::Rows));
                for field in &table.fields {
                    rules.extend(field.rules.iter().cloned().map(Rule::Column));
                }
            }
        }
        rules.extend(self.multi_table_rules.iter().cloned().map(Rule::from));
        rules
    }

    /// Folds structural validation over every rule in the catalog.
    pub fn validate_rules(&self) -> RuleValidationResult {
        self.rules()
            .iter()
            .fold(RuleValidationResult::IsValid, |status, rule| {
                status.combine(rule.validate())
            })
    }

    /// Encodes the suite to its interchange form.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decodes a suite from its interchange form.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }
}
