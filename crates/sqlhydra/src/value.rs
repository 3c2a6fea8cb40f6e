//! Dynamic scalar values used as statement arguments and row cells.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// A single SQL value.
///
/// Arguments are bound as `Value`s and every backend decodes its rows into `Value`s, so
/// statements and records are independent of the driver that runs them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

/// Hashable projection of a [`Value`], used to group rows by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ValueKey {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    Float(u64),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `true` for NULL and for the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Integer view of this value, if it is (or losslessly holds) an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrow the text of a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
        }
    }

    /// Grouping key. NULL has none. Numeric text folds into the integer key so that a
    /// key decoded as text still matches the integer it spells.
    pub(crate) fn key(&self) -> Option<ValueKey> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(ValueKey::Int(i64::from(*b))),
            Value::Int(i) => Some(ValueKey::Int(*i)),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(ValueKey::Int(*f as i64)),
            Value::Float(f) => Some(ValueKey::Float(f.to_bits())),
            Value::Text(s) => match s.parse::<i64>() {
                Ok(i) => Some(ValueKey::Int(i)),
                Err(_) => Some(ValueKey::Text(s.clone())),
            },
            Value::Bytes(b) => Some(ValueKey::Bytes(b.clone())),
            Value::Timestamp(t) => Some(ValueKey::Text(t.to_rfc3339())),
            Value::Json(j) => Some(ValueKey::Text(j.to_string())),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

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

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a [`Value`] into a Rust type.
///
/// When the source arrives as text, integers, floats, booleans and RFC3339 timestamps are
/// parsed from it.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch<T>(value: &Value, target: &str) -> Result<T, String> {
    Err(format!("cannot convert {} to {target}", value.type_name()))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(i) => Ok(i),
            Value::Bool(b) => Ok(i64::from(b)),
            Value::Float(f) if f.fract() == 0.0 => Ok(f as i64),
            Value::Text(ref s) => s
                .trim()
                .parse()
                .map_err(|e| format!("invalid integer {s:?}: {e}")),
            other => mismatch(&other, "i64"),
        }
    }
}

macro_rules! impl_from_value_narrow {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, String> {
                    let wide = i64::from_value(value)?;
                    <$ty>::try_from(wide).map_err(|e| format!("{wide} out of range: {e}"))
                }
            }
        )*
    };
}

impl_from_value_narrow!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Text(ref s) => s
                .trim()
                .parse()
                .map_err(|e| format!("invalid float {s:?}: {e}")),
            other => mismatch(&other, "f64"),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            Value::Text(ref s) => match s.trim() {
                "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
                "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
                other => Err(format!("invalid boolean {other:?}")),
            },
            other => mismatch(&other, "bool"),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Timestamp(t) => Ok(t.to_rfc3339()),
            Value::Json(j) => Ok(j.to_string()),
            Value::Bytes(b) => String::from_utf8(b).map_err(|e| e.to_string()),
            Value::Null => mismatch(&Value::Null, "String"),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => mismatch(&other, "bytes"),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(t) => Ok(t),
            Value::Text(ref s) => parse_timestamp(s),
            other => mismatch(&other, "timestamp"),
        }
    }
}

/// RFC3339 first, then the `YYYY-MM-DD HH:MM:SS[.f]` form SQLite's `CURRENT_TIMESTAMP` uses.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(ref s) => serde_json::from_str(s).map_err(|e| e.to_string()),
            other => serde_json::to_value(&other).map_err(|e| e.to_string()),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
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
    use chrono::TimeZone;

    #[test]
    fn text_coercion() {
        assert_eq!(i64::from_value(Value::from("42")).unwrap(), 42);
        assert_eq!(i32::from_value(Value::from(" 7 ")).unwrap(), 7);
        assert_eq!(f64::from_value(Value::from("2.5")).unwrap(), 2.5);
        assert!(bool::from_value(Value::from("true")).unwrap());
        assert!(!bool::from_value(Value::from("0")).unwrap());
        assert!(bool::from_value(Value::from("yes")).is_err());

        let t = DateTime::<Utc>::from_value(Value::from("2024-03-01T10:00:00Z")).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        let t = DateTime::<Utc>::from_value(Value::from("2024-03-01 10:00:00")).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn sqlite_booleans_are_integers() {
        assert!(bool::from_value(Value::Int(1)).unwrap());
        assert!(bool::from_value(Value::Int(2)).is_err());
    }

    #[test]
    fn options_map_null() {
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(Value::Int(3)).unwrap(), Some(3));
        assert!(i64::from_value(Value::Null).is_err());
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn numeric_text_groups_with_integers() {
        assert_eq!(Value::from("12").key(), Value::Int(12).key());
        assert_ne!(Value::from("a").key(), Value::Int(12).key());
        assert_eq!(Value::Null.key(), None);
    }

    #[test]
    fn serializes_untagged() {
        let json = serde_json::to_string(&vec![Value::Null, Value::Int(1), Value::from("a")]).unwrap();
        assert_eq!(json, r#"[null,1,"a"]"#);
    }
}
