//! Typed right hand sides, and coercion of raw strings into them.
//!
//! Coercion is driven by a [`FieldType`]: one decoding function per
//! type, chosen from the resolved field's declared type or, for
//! untyped fields, from the type of a reference value.

use std::cmp::Ordering;
use std::fmt::Display;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::datetime::to_aware_datetime;
use crate::filtering::QueryError;
use crate::schema::FieldType;

/// A typed value, either decoded from a query or stored in a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(DateTime<FixedOffset>),
    List(Vec<Value>),
}

impl Value {
    /// The [`FieldType`] this value would be coerced as, if used as a
    /// reference value.
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Bool(_) => Some(FieldType::Boolean),
            Value::Int(_) => Some(FieldType::Integer),
            Value::Float(_) => Some(FieldType::Float),
            Value::Str(_) => Some(FieldType::Text),
            Value::DateTime(_) => Some(FieldType::DateTime),
            Value::Null | Value::List(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Integers and floats compare with each other; any other mix of
    /// types, and nulls, are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// A total order for sorting: nulls first, then values of like
    /// types by [`compare`](Value::compare), then by variant.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::List(a), Value::List(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.sort_cmp(y))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (a, b) => a
                .compare(b)
                .unwrap_or_else(|| a.rank().cmp(&b.rank())),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::DateTime(_) => 4,
            Value::List(_) => 5,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Value::DateTime(dt)
    }
}

// The patterns below are constants, so compiling them cannot fail.

fn int_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+$").unwrap())
}

fn float_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+\.?\d*$").unwrap())
}

fn list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^\[.*\]$").unwrap())
}

/// Decode `true`, `True`, `false` or `False`.
pub fn str_to_bool(s: &str) -> Result<bool, QueryError> {
    match s {
        "true" | "True" => Ok(true),
        "false" | "False" => Ok(false),
        _ => Err(QueryError::InvalidBooleanLiteral(s.to_string())),
    }
}

pub fn str_to_int(s: &str) -> Result<i64, QueryError> {
    if !int_regex().is_match(s) {
        return Err(QueryError::InvalidNumericLiteral(s.to_string()));
    }
    s.parse()
        .map_err(|_| QueryError::InvalidNumericLiteral(s.to_string()))
}

pub fn str_to_float(s: &str) -> Result<f64, QueryError> {
    if !float_regex().is_match(s) {
        return Err(QueryError::InvalidNumericLiteral(s.to_string()));
    }
    s.parse()
        .map_err(|_| QueryError::InvalidNumericLiteral(s.to_string()))
}

/// Where coercion gets its target type from.
#[derive(Debug, Clone, Copy, Default)]
pub struct Coercion<'a> {
    /// The declared type of the resolved field, if any.
    pub field_type: Option<FieldType>,
    /// A value whose runtime type is used when `field_type` is `None`.
    pub reference: Option<&'a Value>,
}

impl<'a> Coercion<'a> {
    pub fn new(field_type: Option<FieldType>) -> Self {
        Self {
            field_type,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Option<&'a Value>) -> Self {
        self.reference = reference;
        self
    }

    /// The type to coerce to; `None` leaves strings untouched.
    pub fn target(&self) -> Option<FieldType> {
        self.field_type
            .or_else(|| self.reference.and_then(Value::field_type))
    }

    /// Decode a single raw string.
    ///
    /// The literal `null` decodes to [`Value::Null`] whatever the
    /// target type.
    ///
    /// ```rust
    /// use chrono::FixedOffset;
    /// use queryset_cmd::schema::FieldType;
    /// use queryset_cmd::value::{Coercion, Value};
    ///
    /// let utc = FixedOffset::east_opt(0).unwrap();
    /// let c = Coercion::new(Some(FieldType::Integer));
    /// assert_eq!(c.scalar("42", &utc).unwrap(), Value::Int(42));
    /// assert_eq!(c.scalar("null", &utc).unwrap(), Value::Null);
    /// assert!(c.scalar("4x2", &utc).is_err());
    /// ```
    pub fn scalar(&self, raw: &str, tz: &FixedOffset) -> Result<Value, QueryError> {
        if raw == "null" {
            return Ok(Value::Null);
        }
        self.convert(raw, tz)
    }

    /// Decode a raw string into a list.
    ///
    /// A bracketed JSON array literal is parsed as JSON, otherwise the
    /// string is split on commas. Each element is converted on its own.
    pub fn iterable(&self, raw: &str, tz: &FixedOffset) -> Result<Vec<Value>, QueryError> {
        let target = self.target();
        if target == Some(FieldType::Boolean) {
            return Err(QueryError::BooleanNotIterable(raw.to_string()));
        }

        if let Some(items) = json_list(raw) {
            // '["a", "b", "c"]'
            items
                .iter()
                .map(|item| match item {
                    serde_json::Value::Null => Ok(Value::Null),
                    serde_json::Value::String(s) => self.convert(s, tz),
                    other => self.convert(&other.to_string(), tz),
                })
                .collect()
        } else {
            // 'a, b, c': only text keeps the surrounding whitespace.
            raw.split(',')
                .map(|item| match self.target() {
                    Some(FieldType::Text) | None => self.convert(item, tz),
                    Some(_) => self.convert(item.trim(), tz),
                })
                .collect()
        }
    }

    fn convert(&self, raw: &str, tz: &FixedOffset) -> Result<Value, QueryError> {
        Ok(match self.target() {
            Some(FieldType::DateTime) => Value::DateTime(to_aware_datetime(raw, tz)?),
            Some(FieldType::Boolean) => Value::Bool(str_to_bool(raw)?),
            Some(FieldType::Integer) => Value::Int(str_to_int(raw)?),
            Some(FieldType::Float) => Value::Float(str_to_float(raw)?),
            Some(FieldType::Text) | None => Value::Str(raw.to_string()),
        })
    }
}

fn json_list(raw: &str) -> Option<Vec<serde_json::Value>> {
    if !list_regex().is_match(raw) {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(serde_json::Value::Array(items)) => Some(items),
        _ => None,
    }
}
