//! Statement builder with positional parameter binding.
//!
//! Every builder returns a [`PreparedStatement`]: SQL text that references
//! values only through `$n` placeholders, plus the owned parameter list bound
//! to them (`params[i]` is `$i+1`).
//!
//! # Identifier trust boundary
//!
//! Table names, field names and order-by fields are embedded into the SQL
//! text as-is (fields wrapped in double quotes, with no escaping of embedded
//! quotes). Only pass compile-time constants or allow-listed identifiers in
//! those positions, never end-user input. Values are always parameterized.

use std::fmt::Write as _;

use crate::types::RowValues;

mod dml;
mod filter;
mod select;

pub use dml::{build_delete, build_insert, build_update};
pub use filter::{FilterCondition, FilterValue, bind_filter, bind_filter_from};
pub use select::{SelectQuery, build_select};

/// SQL text plus the parameters bound to its placeholders, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    pub sql: String,
    pub params: Vec<RowValues>,
}

impl PreparedStatement {
    #[must_use]
    pub fn new(sql: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Split into SQL text and parameters.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<RowValues>) {
        (self.sql, self.params)
    }
}

/// Ordered field → value pairs used for INSERT rows and UPDATE assignments.
///
/// ```rust
/// use pg_dbc::prelude::*;
///
/// let row = ColumnValues::new().set("id", 7).set("name", "alice");
/// assert_eq!(row.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValues {
    entries: Vec<(String, RowValues)>,
}

impl ColumnValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Insertion order is the column and parameter order.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.push(field, value);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<RowValues>) {
        self.entries.push((field.into(), value.into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.entries.iter().map(|(f, v)| (f.as_str(), v))
    }
}

impl<F: Into<String>, V: Into<RowValues>> FromIterator<(F, V)> for ColumnValues {
    fn from_iter<I: IntoIterator<Item = (F, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(f, v)| (f.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for ColumnValues {
    type Item = (String, RowValues);
    type IntoIter = std::vec::IntoIter<(String, RowValues)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Append `"field"` to `out`. No escaping is applied; see the module docs.
pub(crate) fn push_quoted_ident(out: &mut String, field: &str) {
    out.push('"');
    out.push_str(field);
    out.push('"');
}

/// Append `$n` to `out`.
pub(crate) fn push_placeholder(out: &mut String, n: usize) {
    // Writing into a String cannot fail.
    let _ = write!(out, "${n}");
}

/// Comma-joined quoted identifiers: `"a", "b"`.
pub(crate) fn quoted_field_list<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_quoted_ident(&mut out, field);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_field_list_preserves_order() {
        assert_eq!(quoted_field_list(["b", "a", "c"]), r#""b", "a", "c""#);
        assert_eq!(quoted_field_list(Vec::<&str>::new()), "");
    }

    #[test]
    fn column_values_collects_from_pairs() {
        let row: ColumnValues = vec![("a", 1_i64), ("b", 2_i64)].into_iter().collect();
        let fields: Vec<&str> = row.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, ["a", "b"]);
    }
}
