//! Typed values and the Rust ↔ column type mapping.
//!
//! [`Value`] is the closed set of values that can be bound as parameters or read
//! back from a row. [`FieldValue`] connects Rust field types to a [`FieldType`] and
//! converts in both directions; `#[derive(Record)]` relies on it, so a field whose
//! type does not implement it is rejected at compile time.

use crate::schema::FieldType;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt;

/// A typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The semantic type of this value, `None` for NULL.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(FieldType::Integer),
            Value::Float(_) => Some(FieldType::Float),
            Value::Decimal(_) => Some(FieldType::Decimal),
            Value::Text(_) => Some(FieldType::Text),
            Value::Boolean(_) => Some(FieldType::Boolean),
            Value::Timestamp(_) => Some(FieldType::Timestamp),
        }
    }

    /// Short type label used in error messages.
    pub fn type_label(&self) -> &'static str {
        match self.field_type() {
            Some(ty) => ty.label(),
            None => "null",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Render as a SQL literal.
    ///
    /// Only used for DDL (column defaults), where bind parameters are not allowed.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Value::Boolean(true) => "TRUE".to_string(),
            Value::Boolean(false) => "FALSE".to_string(),
            Value::Timestamp(ts) => format!("TIMESTAMP '{}'", ts.format(TIMESTAMP_FORMAT)),
        }
    }

    /// Timestamp in the textual form storage engines accept for binding.
    pub fn timestamp_text(ts: &NaiveDateTime) -> String {
        ts.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Parse a declared literal (e.g. a `default = "true"` option) as the given type.
    pub fn parse_literal(ty: FieldType, literal: &str) -> Result<Value, String> {
        let s = literal.trim();
        if s.eq_ignore_ascii_case("null") {
            return Ok(Value::Null);
        }
        match ty {
            FieldType::Integer => s
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| format!("'{s}' is not an integer: {e}")),
            FieldType::Float => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("'{s}' is not a float: {e}")),
            FieldType::Decimal => s
                .parse::<Decimal>()
                .map(Value::Decimal)
                .map_err(|e| format!("'{s}' is not a decimal: {e}")),
            FieldType::Boolean => match s.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(Value::Boolean(true)),
                "false" | "f" | "0" => Ok(Value::Boolean(false)),
                _ => Err(format!("'{s}' is not a boolean")),
            },
            FieldType::Timestamp => NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
                .map(Value::Timestamp)
                .map_err(|e| format!("'{s}' is not a timestamp: {e}")),
            FieldType::Text => {
                let unquoted = s
                    .strip_prefix('\'')
                    .and_then(|rest| rest.strip_suffix('\''))
                    .unwrap_or(literal);
                Ok(Value::Text(unquoted.to_string()))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(i64::from(v))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Value::Timestamp(v.naive_utc())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A Rust type that can be stored in a record field.
///
/// Implemented for the integer family, floats, [`Decimal`], `String`, `bool`,
/// [`NaiveDateTime`], and `Option<T>` of those.
pub trait FieldValue: Sized {
    /// Semantic column type.
    const FIELD_TYPE: FieldType;
    /// Whether the Rust type can hold NULL.
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    /// Convert a value read from storage. `Err` carries a human readable reason.
    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, got: &Value) -> String {
    match got {
        Value::Null => format!("unexpected NULL for non-nullable {expected} field"),
        other => format!("expected {expected}, got {} ({other})", other.type_label()),
    }
}

macro_rules! int_field_value {
    ($($t:ty),*) => {
        $(impl FieldValue for $t {
            const FIELD_TYPE: FieldType = FieldType::Integer;

            fn to_value(&self) -> Value {
                Value::Integer(i64::from(*self))
            }

            fn from_value(value: Value) -> Result<Self, String> {
                match value {
                    Value::Integer(v) => <$t>::try_from(v)
                        .map_err(|_| format!("{v} out of range for {}", stringify!($t))),
                    Value::Decimal(d) if d.fract().is_zero() => d
                        .to_i64()
                        .and_then(|v| <$t>::try_from(v).ok())
                        .ok_or_else(|| format!("{d} out of range for {}", stringify!($t))),
                    other => Err(mismatch("integer", &other)),
                }
            }
        })*
    };
}

int_field_value!(i8, i16, i32, i64, u8, u16, u32);

impl FieldValue for f64 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            Value::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| format!("decimal {d} not representable as f64")),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl FieldValue for f32 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FieldValue for Decimal {
    const FIELD_TYPE: FieldType = FieldType::Decimal;

    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Decimal(d) => Ok(d),
            Value::Integer(v) => Ok(Decimal::from(v)),
            Value::Float(v) => Decimal::try_from(v).map_err(|e| e.to_string()),
            other => Err(mismatch("decimal", &other)),
        }
    }
}

impl FieldValue for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FieldValue for bool {
    const FIELD_TYPE: FieldType = FieldType::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(mismatch("boolean", &other)),
        }
    }
}

impl FieldValue for NaiveDateTime {
    const FIELD_TYPE: FieldType = FieldType::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_null_both_ways() {
        assert_eq!(Option::<i64>::None.to_value(), Value::Null);
        assert_eq!(Option::<i64>::from_value(Value::Null), Ok(None));
        assert_eq!(Option::<i64>::from_value(Value::Integer(7)), Ok(Some(7)));
    }

    #[test]
    fn null_into_non_nullable_is_rejected() {
        let err = i64::from_value(Value::Null).unwrap_err();
        assert!(err.contains("NULL"));
    }

    #[test]
    fn narrow_integer_out_of_range() {
        assert!(u8::from_value(Value::Integer(300)).is_err());
        assert_eq!(u32::from_value(Value::Integer(1200)), Ok(1200));
    }

    #[test]
    fn text_literal_is_escaped() {
        assert_eq!(Value::from("it's").to_sql_literal(), "'it''s'");
        assert_eq!(Value::Boolean(true).to_sql_literal(), "TRUE");
    }

    #[test]
    fn parse_literal_by_type() {
        assert_eq!(
            Value::parse_literal(FieldType::Boolean, "true"),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            Value::parse_literal(FieldType::Integer, " 42 "),
            Ok(Value::Integer(42))
        );
        assert_eq!(
            Value::parse_literal(FieldType::Text, "'draft'"),
            Ok(Value::Text("draft".into()))
        );
        assert!(Value::parse_literal(FieldType::Integer, "abc").is_err());
        assert!(Value::parse_literal(FieldType::Boolean, "maybe").is_err());
    }

    #[test]
    fn decimal_reads_from_integer() {
        assert_eq!(Decimal::from_value(Value::Integer(3)), Ok(Decimal::from(3)));
    }
}
