use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::DbcError;

/// Values that can be bound as statement parameters or read back from a row.
///
/// ```rust
/// use pg_dbc::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::from("alice"),
///     RowValues::from(Some(true)),
///     RowValues::from(None::<i64>),
/// ];
/// assert!(params[3].is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let RowValues::JSON(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<i16> for RowValues {
    fn from(value: i16) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<f32> for RowValues {
    fn from(value: f32) -> Self {
        RowValues::Float(f64::from(value))
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<&[u8]> for RowValues {
    fn from(value: &[u8]) -> Self {
        RowValues::Blob(value.to_vec())
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Sort direction for `ORDER BY` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum SortDirection {
    #[value(name = "ASC")]
    Asc,
    #[value(name = "DESC")]
    Desc,
}

impl SortDirection {
    /// Parse a direction case-insensitively; anything but `asc`/`desc` is rejected.
    ///
    /// # Errors
    /// Returns `DbcError::InvalidArgument` for any other input.
    pub fn parse(direction: &str) -> Result<Self, DbcError> {
        <SortDirection as ValueEnum>::from_str(direction, true).map_err(|_| {
            DbcError::invalid(format!(
                "order by direction must be ASC or DESC, got {direction:?}"
            ))
        })
    }

    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl std::str::FromStr for SortDirection {
    type Err = DbcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortDirection::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_direction_is_case_insensitive() {
        assert_eq!(SortDirection::parse("asc").unwrap(), SortDirection::Asc);
        assert_eq!(SortDirection::parse("Desc").unwrap(), SortDirection::Desc);
        assert_eq!(SortDirection::parse("DESC").unwrap().as_sql(), "DESC");
    }

    #[test]
    fn sort_direction_rejects_unknown() {
        let err = SortDirection::parse("sideways").unwrap_err();
        assert!(matches!(err, DbcError::InvalidArgument(_)));
        assert!(SortDirection::parse("").is_err());
    }

    #[test]
    fn option_none_becomes_null() {
        assert_eq!(RowValues::from(None::<&str>), RowValues::Null);
        assert_eq!(RowValues::from(Some(5_i32)), RowValues::Int(5));
    }

    #[test]
    fn timestamp_parses_from_text() {
        let v = RowValues::from("2024-03-01 12:30:00.250");
        let ts = v.as_timestamp().unwrap();
        assert_eq!(ts.format("%H:%M:%S%.3f").to_string(), "12:30:00.250");
    }
}
