//! Error types for catalog construction and value conversion.

use thiserror::Error;

use crate::value::DataType;

/// Result type for catalog construction operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors raised while assembling a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Dialect tag not in the recognized set
    #[error(
        "'{0}' is not a recognized dialect name. Available options include 'db2', 'mssql', \
         'mysql', 'oracle', 'postgres', and 'sqlite'."
    )]
    UnknownDialect(String),

    /// Cross-source rule references a datasource that was never declared
    #[error("A datasource named '{0}' was not found in the suite.")]
    UnknownDatasource(String),

    /// Cross-source rule references a table that was never declared
    #[error("A table named '{table_name}' was not found in the '{datasource_name}' datasource.")]
    TableNotFound {
        datasource_name: String,
        table_name: String,
    },

    /// Cross-source rule references a field that was never declared
    #[error("A field named '{field_name}' was not found on the '{table_name}' table.")]
    FieldNotFound {
        table_name: String,
        field_name: String,
    },

    /// A rule literal could not be converted into its field's declared domain
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the value codec.
///
/// These are terminal for the value (and therefore the rule evaluation)
/// being decoded; `validate()` never raises them.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A NULL cell arrived where a value was expected. Distinct from a query
    /// returning zero rows.
    #[error("the query returned a NULL cell where a {data_type} value was expected")]
    EmptyResult { data_type: DataType },

    /// A textual cell failed every parse format accepted for its domain
    #[error("could not parse '{value}' as a {data_type} using {formats}")]
    Format {
        value: String,
        data_type: DataType,
        formats: &'static str,
    },

    /// The declared value domain is incompatible with the operation or the
    /// shape of the decoded cell
    #[error("{0}")]
    IncompatibleDomain(String),
}

impl CodecError {
    pub(crate) fn empty(data_type: DataType) -> Self {
        Self::EmptyResult { data_type }
    }

    pub(crate) fn format(value: impl Into<String>, data_type: DataType, formats: &'static str) -> Self {
        Self::Format {
            value: value.into(),
            data_type,
            formats,
        }
    }

    pub(crate) fn incompatible(message: impl Into<String>) -> Self {
        Self::IncompatibleDomain(message.into())
    }
}
