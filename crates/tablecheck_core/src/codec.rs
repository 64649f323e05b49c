//! Type-directed value conversion.
//!
//! Two directions through the same domain tags: author-supplied literals in
//! ([`cast_literal`], [`parse_temporal_literal`]) and raw result cells out
//! ([`decode_cell`]). Every conversion is explicit and keyed by the declared
//! [`DataType`]; a cell never reaches the classification engine through an
//! unchecked cast.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::dialect::SqlDialect;
use crate::error::CodecError;
use crate::value::{DATE_FORMAT, DataType, RawCell, TIMESTAMP_FORMAT, Value};

const TEMPORAL_FORMATS: &str = "'%Y-%m-%d' or '%Y-%m-%dT%H:%M:%S'";

/// Converts an author-supplied numeric literal into the canonical
/// representation of a numeric domain.
///
/// Fails when the domain is non-numeric (a configuration mistake in the
/// rule) or when the literal cannot be represented in the target kind.
pub fn cast_literal(value: &Value, data_type: DataType) -> Result<Value, CodecError> {
    if !data_type.is_numeric() {
        return Err(CodecError::incompatible(format!(
            "the data type for a number rule should be one of integer, float, or decimal, \
             but {data_type} was provided"
        )));
    }
    if !value.is_numeric() {
        return Err(CodecError::incompatible(format!(
            "a {} literal cannot be used where a {data_type} value is required",
            value.kind_name()
        )));
    }
    match data_type {
        DataType::Decimal => to_decimal(value).map(Value::Decimal),
        DataType::Float => to_float(value).map(Value::Float),
        DataType::Integer => to_integer(value).map(Value::Integer),
        _ => unreachable!("is_numeric() covers the remaining domains"),
    }
}

/// Parses a temporal rule literal, trying the domain's preferred format
/// first: date-only then date+time for DATE, the reverse for DATETIME.
/// A date-only parse yields the date's midnight.
pub fn parse_temporal_literal(text: &str, data_type: DataType) -> Result<NaiveDateTime, CodecError> {
    let parsed = match data_type {
        DataType::Date => parse_date(text).or_else(|| parse_datetime(text)),
        DataType::Datetime => parse_datetime(text).or_else(|| parse_date(text)),
        other => {
            return Err(CodecError::incompatible(format!(
                "cannot parse '{text}' as a {other}"
            )));
        }
    };
    parsed.ok_or_else(|| CodecError::format(text, data_type, TEMPORAL_FORMATS))
}

/// Decodes one raw result cell into the declared domain.
///
/// Under a dialect without native temporal column types (SQLite), temporal
/// cells arrive as text and go through the same domain-ordered parse
/// fallback as literals. A NULL cell is an explicit [`CodecError::EmptyResult`],
/// never a silent default.
pub fn decode_cell(
    cell: &RawCell,
    data_type: DataType,
    dialect: SqlDialect,
) -> Result<Value, CodecError> {
    if matches!(cell, RawCell::Null) {
        return Err(CodecError::empty(data_type));
    }
    match data_type {
        DataType::Date | DataType::Datetime => decode_temporal(cell, data_type, dialect),
        DataType::Decimal => match cell {
            RawCell::Decimal(d) => Ok(Value::Decimal(*d)),
            RawCell::Integer(i) => Ok(Value::Decimal(Decimal::from(*i))),
            RawCell::Float(f) => Decimal::from_f64(*f).map(Value::Decimal).ok_or_else(|| {
                CodecError::incompatible(format!("the value {f} could not be converted to a decimal"))
            }),
            other => Err(mismatch(other, data_type)),
        },
        DataType::Float => match cell {
            RawCell::Float(f) => Ok(Value::Float(*f)),
            RawCell::Integer(i) => Ok(Value::Float(*i as f64)),
            other => Err(mismatch(other, data_type)),
        },
        DataType::Integer => match cell {
            RawCell::Integer(i) => Ok(Value::Integer(*i)),
            other => Err(mismatch(other, data_type)),
        },
        DataType::Text => match cell {
            RawCell::Text(s) => Ok(Value::Text(s.clone())),
            other => Err(mismatch(other, data_type)),
        },
    }
}

fn decode_temporal(
    cell: &RawCell,
    data_type: DataType,
    dialect: SqlDialect,
) -> Result<Value, CodecError> {
    if dialect.has_native_temporal_types() {
        match cell {
            RawCell::Date(d) => Ok(Value::Timestamp(midnight(*d))),
            RawCell::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
            other => Err(mismatch(other, data_type)),
        }
    } else {
        match cell {
            RawCell::Text(s) => parse_temporal_literal(s, data_type).map(Value::Timestamp),
            other => Err(mismatch(other, data_type)),
        }
    }
}

fn mismatch(cell: &RawCell, data_type: DataType) -> CodecError {
    CodecError::incompatible(format!(
        "a {} cell cannot be decoded into the {data_type} domain",
        cell.kind_name()
    ))
}

fn parse_date(text: &str) -> Option<NaiveDateTime> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok().map(midnight)
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight is always a valid time")
}

fn to_decimal(value: &Value) -> Result<Decimal, CodecError> {
    match value {
        Value::Decimal(d) => Ok(*d),
        Value::Integer(i) => Ok(Decimal::from(*i)),
        Value::Float(f) => Decimal::from_f64(*f).ok_or_else(|| {
            CodecError::incompatible(format!("the value {f} could not be converted to a decimal"))
        }),
        _ => unreachable!("caller checked is_numeric()"),
    }
}

fn to_float(value: &Value) -> Result<f64, CodecError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        Value::Decimal(d) => d.to_f64().ok_or_else(|| {
            CodecError::incompatible(format!("the value {d} could not be converted to a float"))
        }),
        _ => unreachable!("caller checked is_numeric()"),
    }
}

fn to_integer(value: &Value) -> Result<i64, CodecError> {
    match value {
        Value::Integer(i) => Ok(*i),
        // Truncation matches SQL's CAST(x AS INTEGER) behavior.
        Value::Float(f) => Ok(*f as i64),
        Value::Decimal(d) => d.trunc().to_i64().ok_or_else(|| {
            CodecError::incompatible(format!("the value {d} could not be converted to an integer"))
        }),
        _ => unreachable!("caller checked is_numeric()"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casts_literals_into_the_declared_numeric_kind() {
        assert_eq!(
            cast_literal(&Value::Integer(9999), DataType::Decimal).unwrap(),
            Value::Decimal(Decimal::from(9999))
        );
        assert_eq!(
            cast_literal(&Value::Integer(3), DataType::Float).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            cast_literal(&Value::Float(12.9), DataType::Integer).unwrap(),
            Value::Integer(12)
        );
    }

    #[test]
    fn rejects_numeric_literals_for_non_numeric_domains() {
        let err = cast_literal(&Value::Integer(1), DataType::Text).unwrap_err();
        assert!(err.to_string().contains("integer, float, or decimal"));
        assert!(cast_literal(&Value::Integer(1), DataType::Date).is_err());
    }

    #[test]
    fn rejects_non_numeric_literals() {
        assert!(cast_literal(&Value::Text("a".into()), DataType::Integer).is_err());
    }

    #[test]
    fn date_literals_parse_date_first_with_datetime_fallback() {
        let d = parse_temporal_literal("2020-01-02", DataType::Date).unwrap();
        assert_eq!(format!("{d}"), "2020-01-02 00:00:00");
        let dt = parse_temporal_literal("2020-02-01T03:12:02.321", DataType::Date).unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "03:12");
    }

    #[test]
    fn datetime_literals_parse_datetime_first_with_date_fallback() {
        let dt = parse_temporal_literal("2020-02-01T03:12:02", DataType::Datetime).unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "03:12:02");
        let d = parse_temporal_literal("2020-01-02", DataType::Datetime).unwrap();
        assert_eq!(d.format("%H:%M:%S").to_string(), "00:00:00");
    }

    #[test]
    fn unparseable_temporal_literals_name_the_accepted_formats() {
        let err = parse_temporal_literal("last tuesday", DataType::Date).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("last tuesday"));
        assert!(message.contains("%Y-%m-%d"));
    }

    #[test]
    fn sqlite_temporal_cells_decode_from_text() {
        let v = decode_cell(
            &RawCell::Text("2020-01-02".into()),
            DataType::Date,
            SqlDialect::Sqlite,
        )
        .unwrap();
        assert_eq!(v, Value::Timestamp(parse_temporal_literal("2020-01-02", DataType::Date).unwrap()));

        // A DATE-domain cell holding a full timestamp still decodes.
        let v = decode_cell(
            &RawCell::Text("2020-02-01T03:12:02.321".into()),
            DataType::Date,
            SqlDialect::Sqlite,
        )
        .unwrap();
        assert!(matches!(v, Value::Timestamp(_)));
    }

    #[test]
    fn native_dialects_decode_temporal_cells_directly() {
        let date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let v = decode_cell(&RawCell::Date(date), DataType::Date, SqlDialect::Mssql).unwrap();
        assert_eq!(v, Value::Timestamp(date.and_hms_opt(0, 0, 0).unwrap()));

        // Text where a native temporal is expected is a domain mismatch.
        let err = decode_cell(
            &RawCell::Text("2020-01-02".into()),
            DataType::Date,
            SqlDialect::Mssql,
        )
        .unwrap_err();
        assert!(err.to_string().contains("text cell"));
    }

    #[test]
    fn null_cells_are_an_explicit_empty_result() {
        let err = decode_cell(&RawCell::Null, DataType::Integer, SqlDialect::Sqlite).unwrap_err();
        assert!(matches!(err, CodecError::EmptyResult { .. }));
    }

    #[test]
    fn integer_cells_widen_into_float_and_decimal_domains() {
        assert_eq!(
            decode_cell(&RawCell::Integer(4), DataType::Float, SqlDialect::Sqlite).unwrap(),
            Value::Float(4.0)
        );
        assert_eq!(
            decode_cell(&RawCell::Integer(4), DataType::Decimal, SqlDialect::Sqlite).unwrap(),
            Value::Decimal(Decimal::from(4))
        );
        // The reverse narrowing is refused.
        assert!(decode_cell(&RawCell::Float(1.5), DataType::Integer, SqlDialect::Sqlite).is_err());
    }
}
