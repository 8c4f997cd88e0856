//! Logical column types, bound parameter values and decoded result rows.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, StorageError, StorageResult};

/// Text encoding used for timestamps on engines without a native timestamp type.
///
/// Fixed-width and UTC, so lexicographic comparison matches chronological order.
pub const TIMESTAMP_TEXT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Logical column type, mapped to a physical type by each dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    /// Short, indexable string (keys and identifiers).
    Identifier,
    /// Unbounded text.
    Text,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit float.
    Float64,
    /// Boolean.
    Boolean,
    /// UTC timestamp with microsecond precision.
    Timestamp,
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SqlType::Identifier => "identifier",
            SqlType::Text => "text",
            SqlType::BigInt => "bigint",
            SqlType::Float64 => "float64",
            SqlType::Boolean => "boolean",
            SqlType::Timestamp => "timestamp",
        };
        write!(f, "{}", name)
    }
}

/// A bound SQL parameter value.
///
/// Nulls carry their logical type so strictly typed drivers can bind them.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// String value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// Timestamp value.
    Timestamp(DateTime<Utc>),
    /// Typed null.
    Null(SqlType),
}

impl SqlValue {
    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        SqlValue::Text(s.into())
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Returns the logical type of this value.
    pub fn sql_type(&self) -> SqlType {
        match self {
            SqlValue::Text(_) => SqlType::Text,
            SqlValue::Integer(_) => SqlType::BigInt,
            SqlValue::Float(_) => SqlType::Float64,
            SqlValue::Bool(_) => SqlType::Boolean,
            SqlValue::Timestamp(_) => SqlType::Timestamp,
            SqlValue::Null(ty) => *ty,
        }
    }

    /// Wraps an optional float, mapping `None` to a typed null.
    pub fn opt_float(value: Option<f64>) -> Self {
        value.map_or(SqlValue::Null(SqlType::Float64), SqlValue::Float)
    }

    /// Wraps an optional timestamp, mapping `None` to a typed null.
    pub fn opt_timestamp(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(SqlValue::Null(SqlType::Timestamp), SqlValue::Timestamp)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Float(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(dt: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(dt)
    }
}

/// Formats a timestamp with [`TIMESTAMP_TEXT_FORMAT`].
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_TEXT_FORMAT).to_string()
}

/// Parses a timestamp stored as text.
///
/// Accepts [`TIMESTAMP_TEXT_FORMAT`] as well as any RFC 3339 string.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.fZ")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A decoded result row.
///
/// Backends decode each column according to the projection's declared
/// [`SqlType`], so getters only need to check the variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlRow {
    values: Vec<SqlValue>,
}

impl SqlRow {
    /// Creates a row from decoded values.
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw values.
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    fn value(&self, index: usize) -> StorageResult<&SqlValue> {
        self.values
            .get(index)
            .ok_or_else(|| decode_error(index, "column", "index out of range"))
    }

    /// Reads a non-null string column.
    pub fn get_text(&self, index: usize) -> StorageResult<String> {
        self.get_opt_text(index)?
            .ok_or_else(|| decode_error(index, "text", "unexpected null"))
    }

    /// Reads a nullable string column.
    pub fn get_opt_text(&self, index: usize) -> StorageResult<Option<String>> {
        match self.value(index)? {
            SqlValue::Text(s) => Ok(Some(s.clone())),
            SqlValue::Null(_) => Ok(None),
            other => Err(decode_error(index, "text", &format!("{:?}", other))),
        }
    }

    /// Reads a non-null integer column.
    pub fn get_i64(&self, index: usize) -> StorageResult<i64> {
        match self.value(index)? {
            SqlValue::Integer(i) => Ok(*i),
            other => Err(decode_error(index, "bigint", &format!("{:?}", other))),
        }
    }

    /// Reads a nullable float column.
    pub fn get_opt_f64(&self, index: usize) -> StorageResult<Option<f64>> {
        match self.value(index)? {
            SqlValue::Float(f) => Ok(Some(*f)),
            SqlValue::Integer(i) => Ok(Some(*i as f64)),
            SqlValue::Null(_) => Ok(None),
            other => Err(decode_error(index, "float64", &format!("{:?}", other))),
        }
    }

    /// Reads a non-null timestamp column.
    pub fn get_timestamp(&self, index: usize) -> StorageResult<DateTime<Utc>> {
        self.get_opt_timestamp(index)?
            .ok_or_else(|| decode_error(index, "timestamp", "unexpected null"))
    }

    /// Reads a nullable timestamp column.
    pub fn get_opt_timestamp(&self, index: usize) -> StorageResult<Option<DateTime<Utc>>> {
        match self.value(index)? {
            SqlValue::Timestamp(dt) => Ok(Some(*dt)),
            SqlValue::Null(_) => Ok(None),
            other => Err(decode_error(index, "timestamp", &format!("{:?}", other))),
        }
    }
}

fn decode_error(column: usize, expected: &str, message: &str) -> StorageError {
    StorageError::Backend(BackendError::Decode {
        column,
        expected: expected.to_string(),
        message: message.to_string(),
    })
}
