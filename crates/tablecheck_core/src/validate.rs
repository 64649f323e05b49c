//! Structural rule validation.
//!
//! Validation is pure: it never touches a datasource and never fails; the
//! outcome is always a [`RuleValidationResult`] value. Results combine as an
//! error-accumulating monoid, which is how a whole catalog folds down to one
//! result and how the two sides of a cross-source rule are unioned.

use serde::{Deserialize, Serialize};

/// The outcome of structurally validating one or more rules.
///
/// `IsValid` is the monoid identity; combining two invalid results
/// concatenates their error lists in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleValidationResult {
    IsValid,
    IsInvalid { validation_errors: Vec<String> },
}

impl RuleValidationResult {
    /// A failed result carrying a single error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::IsInvalid {
            validation_errors: vec![message.into()],
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::IsValid)
    }

    /// Monoid combine: `IsValid` is identity, errors concatenate in order.
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::IsValid, other) => other,
            (this, Self::IsValid) => this,
            (
                Self::IsInvalid {
                    validation_errors: mut left,
                },
                Self::IsInvalid {
                    validation_errors: right,
                },
            ) => {
                left.extend(right);
                Self::IsInvalid {
                    validation_errors: left,
                }
            }
        }
    }

    /// Appends `error_message` when the falsification predicate holds.
    pub fn and(self, error_message: &str, falsified: impl FnOnce() -> bool) -> Self {
        let step = if falsified() {
            Self::invalid(error_message)
        } else {
            Self::IsValid
        };
        self.combine(step)
    }
}

/// Checks shared by every single-table rule.
pub fn validate_table(datasource_name: &str, table_name: &str) -> RuleValidationResult {
    RuleValidationResult::IsValid
        .and("Datasource names cannot be blank.", || {
            datasource_name.trim().is_empty()
        })
        .and("Table names cannot be blank.", || {
            table_name.trim().is_empty()
        })
}

/// Checks shared by every column rule.
pub fn validate_column(
    datasource_name: &str,
    table_name: &str,
    field_name: &str,
    max_falsifying_examples: i64,
) -> RuleValidationResult {
    validate_table(datasource_name, table_name)
        .and("Field names cannot be blank.", || {
            field_name.trim().is_empty()
        })
        .and("The max_falsifying_examples argument cannot be negative.", || {
            max_falsifying_examples < 0
        })
}
