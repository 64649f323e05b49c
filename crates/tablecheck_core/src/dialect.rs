//! SQL dialect tags.
//!
//! A dialect affects three things: how identifiers are quoted, where the
//! row-limit clause goes, and whether temporal columns are native or stored
//! as text.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// The closed set of recognized SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    Db2,
    Mssql,
    Mysql,
    Oracle,
    Postgres,
    Sqlite,
}

impl SqlDialect {
    /// Wraps a column identifier in the dialect's quoting characters:
    /// brackets under MSSQL, double quotes everywhere else.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Self::Mssql => format!("[{name}]"),
            _ => format!("\"{name}\""),
        }
    }

    /// Whether DATE/DATETIME columns hold native temporal values.
    ///
    /// SQLite stores temporal values as text, so cells in those domains are
    /// decoded through the codec's textual parse fallback instead.
    pub fn has_native_temporal_types(&self) -> bool {
        !matches!(self, Self::Sqlite)
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Db2 => "db2",
            Self::Mssql => "mssql",
            Self::Mysql => "mysql",
            Self::Oracle => "oracle",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

impl FromStr for SqlDialect {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "db2" => Ok(Self::Db2),
            "mssql" => Ok(Self::Mssql),
            "mysql" => Ok(Self::Mysql),
            "oracle" => Ok(Self::Oracle),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(CatalogError::UnknownDialect(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognized_dialect_names() {
        assert_eq!("sqlite".parse::<SqlDialect>().unwrap(), SqlDialect::Sqlite);
        assert_eq!("MSSQL".parse::<SqlDialect>().unwrap(), SqlDialect::Mssql);
        assert_eq!(" postgres ".parse::<SqlDialect>().unwrap(), SqlDialect::Postgres);
        assert_eq!("postgresql".parse::<SqlDialect>().unwrap(), SqlDialect::Postgres);
    }

    #[test]
    fn rejects_unrecognized_dialect_names() {
        let err = "access".parse::<SqlDialect>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'access' is not a recognized dialect name"));
        assert!(message.contains("'postgres'"));
        assert!(message.contains("'sqlite'"));
    }

    #[test]
    fn quotes_identifiers_per_dialect() {
        assert_eq!(SqlDialect::Mssql.quote_identifier("name"), "[name]");
        assert_eq!(SqlDialect::Sqlite.quote_identifier("name"), "\"name\"");
        assert_eq!(SqlDialect::Postgres.quote_identifier("name"), "\"name\"");
    }

    #[test]
    fn only_sqlite_lacks_native_temporal_types() {
        assert!(!SqlDialect::Sqlite.has_native_temporal_types());
        assert!(SqlDialect::Mssql.has_native_temporal_types());
        assert!(SqlDialect::Postgres.has_native_temporal_types());
    }
}
