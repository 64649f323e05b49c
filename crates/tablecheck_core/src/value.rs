//! Typed values and value domains.
//!
//! Rules declare a [`DataType`] for each column; the codec turns raw result
//! cells and author literals into [`Value`]s of the matching kind. `Value`
//! carries a total ordering (floats compare via `f64::total_cmp`) so that
//! falsifying examples can be deduplicated and sorted deterministically.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Temporal values format and parse as ISO-8601-extended with no offset.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// The closed set of value domains a column rule can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Date,
    Datetime,
    Decimal,
    Float,
    Integer,
    Text,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Decimal | Self::Float | Self::Integer)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Datetime)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Integer => "integer",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// A typed value: a rule parameter or a decoded result cell.
///
/// Both DATE and DATETIME domains decode to the `Timestamp` kind (a date is
/// its midnight), matching the single temporal representation the rest of
/// the rule algebra works with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Timestamp(NaiveDateTime),
    Decimal(Decimal),
    Float(f64),
    Integer(i64),
    Text(String),
}

impl Value {
    /// Human-readable kind name, used in conversion error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Timestamp(_) => "timestamp",
            Self::Decimal(_) => "decimal",
            Self::Float(_) => "float",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Decimal(_) | Self::Float(_) | Self::Integer(_))
    }

    /// Renders the value as a SQL literal: temporal values are quoted
    /// ISO-8601 strings, numerics are unquoted, text is single-quoted.
    ///
    /// Text literals are not escaped; an embedded quote passes through
    /// verbatim into the generated SQL. See the compiler module docs.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Timestamp(ts) => format!("'{}'", format_timestamp(ts)),
            Self::Text(s) => format!("'{s}'"),
            Self::Decimal(_) | Self::Float(_) | Self::Integer(_) => self.to_string(),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Self::Timestamp(_) => 0,
            Self::Decimal(_) => 1,
            Self::Float(_) => 2,
            Self::Integer(_) => 3,
            Self::Text(_) => 4,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(ts) => f.write_str(&format_timestamp(ts)),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Decimal(a), Self::Decimal(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One raw cell as returned by a query executor, before the codec types it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawCell {
    Null,
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(chrono::NaiveDate),
    Timestamp(NaiveDateTime),
}

impl RawCell {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

/// One raw result row.
pub type RawRow = Vec<RawCell>;

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
